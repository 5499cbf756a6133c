use std::io::{BufRead, Write};

/// Source of interactive answers
///
/// Messages and questions go through the prompter so confirmation flows can be driven by a script
/// in tests instead of a terminal.
pub trait Prompter {
    /// Show an informational line.
    fn notice(&mut self, message: &str);

    /// Show `question` and read one line of input, without the trailing newline.
    ///
    /// End of input is returned as an empty answer.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the answer fails.
    fn ask(&mut self, question: &str) -> std::io::Result<String>;
}

/// Prompter on the process's stdin and stdout
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn notice(&mut self, message: &str) {
        println!("{message}");
    }

    fn ask(&mut self, question: &str) -> std::io::Result<String> {
        let mut stdout = std::io::stdout();
        write!(stdout, "{question}")?;
        stdout.flush()?;
        read_answer(&mut std::io::stdin().lock())
    }
}

fn read_answer(reader: &mut impl BufRead) -> std::io::Result<String> {
    let mut answer = String::new();
    reader.read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_answer_trims() {
        let mut input = std::io::Cursor::new("  YES \nignored\n");
        assert_eq!(read_answer(&mut input).unwrap(), "YES");
    }

    #[test]
    fn test_read_answer_eof() {
        let mut input = std::io::Cursor::new("");
        assert_eq!(read_answer(&mut input).unwrap(), "");
    }
}
