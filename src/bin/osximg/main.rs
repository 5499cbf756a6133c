mod clone;
mod list;
mod write;

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};

use osximg::config_file::load_config;
use osximg::diskutil::SystemTools;
use osximg::image::Outcome;

const EXIT_SUCCESS: u8 = 0;
const EXIT_FAILURE: u8 = 1;

#[derive(Parser, Debug)]
#[command(name = "osximg", about = "List disks, clone devices to images and write images back")]
struct Cli {
    /// Path to config file (auto-detected if not specified)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Also write log messages to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show attached disks, partitions and APFS volumes as a tree
    List,
    /// Copy a device into an image file
    Clone(clone::CloneArgs),
    /// Write an image file onto a device
    Write(write::WriteArgs),
    /// Print the version
    Version,
}

fn main() -> ExitCode {
    let code = dispatch(
        std::env::args_os(),
        &mut std::io::stdout(),
        &mut std::io::stderr(),
    );
    ExitCode::from(code)
}

/// Parse `args`, run the chosen subcommand and return the process exit code.
fn dispatch<I, T>(args: I, out: &mut dyn Write, err: &mut dyn Write) -> u8
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => return report_usage_error(&e, out, err),
    };
    let Some(command) = cli.command else {
        let _ = writeln!(out, "{}", osximg::USAGE);
        return EXIT_FAILURE;
    };
    if matches!(command, Commands::Version) {
        let _ = writeln!(out, "{}", osximg::VERSION);
        return EXIT_SUCCESS;
    }

    let result = run(command, cli.config, cli.log_file, cli.verbose);
    report_outcome(result, out, err)
}

fn report_usage_error(e: &clap::Error, out: &mut dyn Write, err: &mut dyn Write) -> u8 {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = write!(out, "{}", e.render());
            EXIT_SUCCESS
        }
        ErrorKind::InvalidSubcommand => {
            let _ = writeln!(out, "{}", osximg::USAGE);
            EXIT_FAILURE
        }
        _ => {
            let _ = write!(err, "{}", e.render());
            EXIT_FAILURE
        }
    }
}

/// Map an operation result to its final message and exit code. Aborting is not a failure.
fn report_outcome(
    result: Result<Outcome, Box<dyn std::error::Error>>,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> u8 {
    match result {
        Ok(Outcome::Completed) => EXIT_SUCCESS,
        Ok(Outcome::Aborted) => {
            let _ = writeln!(out, "Aborted.");
            EXIT_SUCCESS
        }
        Err(e) => {
            let _ = writeln!(err, "Error: {e}");
            EXIT_FAILURE
        }
    }
}

fn run(
    command: Commands,
    config: Option<PathBuf>,
    log_file: Option<PathBuf>,
    verbose: bool,
) -> Result<Outcome, Box<dyn std::error::Error>> {
    let log_file = log_file.map(std::fs::File::create).transpose()?;
    osximg::logger::init(verbose, log_file);

    let tools = SystemTools::new(load_config(config.as_deref())?);

    match command {
        Commands::List => list::run(&tools),
        Commands::Clone(ref args) => clone::run(args, &tools),
        Commands::Write(ref args) => write::run(args, &tools),
        Commands::Version => Ok(Outcome::Completed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use osximg::config_file::ToolConfig;
    use osximg::diskutil::{DiskTools, DiskutilError};
    use osximg::pipeline::PipelineError;
    use osximg::prompt::Prompter;
    use serde_json::{Value, json};

    fn dispatch_capture(args: &[&str]) -> (u8, String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = dispatch(args.iter().copied(), &mut out, &mut err);
        (
            code,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    struct ExternalDisk {
        config: ToolConfig,
    }

    impl DiskTools for ExternalDisk {
        fn list(&self) -> Result<Value, DiskutilError> {
            Ok(json!({"AllDisksAndPartitions": []}))
        }

        fn info(&self, _device: &str) -> Result<Value, DiskutilError> {
            Ok(json!({"TotalSize": 31_914_983_424_u64, "Internal": false}))
        }

        fn copy(&self, pipeline: &str) -> Result<(), PipelineError> {
            panic!("copy must not run: {pipeline}")
        }

        fn config(&self) -> &ToolConfig {
            &self.config
        }
    }

    struct Answers(VecDeque<&'static str>);

    impl Prompter for Answers {
        fn notice(&mut self, _message: &str) {}

        fn ask(&mut self, _question: &str) -> std::io::Result<String> {
            Ok(self.0.pop_front().unwrap_or_default().to_string())
        }
    }

    #[test]
    fn test_no_arguments_prints_usage() {
        let (code, out, err) = dispatch_capture(&["osximg"]);
        assert_eq!(code, EXIT_FAILURE);
        assert_eq!(out, format!("{}\n", osximg::USAGE));
        assert!(err.is_empty());
    }

    #[test]
    fn test_unknown_subcommand_prints_usage() {
        let (code, out, _) = dispatch_capture(&["osximg", "frobnicate"]);
        assert_eq!(code, EXIT_FAILURE);
        assert_eq!(out, format!("{}\n", osximg::USAGE));
    }

    #[test]
    fn test_wrong_arity_fails() {
        for args in [
            &["osximg", "clone", "/dev/disk4"][..],
            &["osximg", "write", "a.img", "/dev/disk4", "extra"][..],
            &["osximg", "list", "extra"][..],
        ] {
            let (code, out, err) = dispatch_capture(args);
            assert_eq!(code, EXIT_FAILURE, "{args:?}");
            assert!(out.is_empty(), "{args:?}");
            assert!(!err.is_empty(), "{args:?}");
        }
    }

    #[test]
    fn test_version() {
        let (code, out, err) = dispatch_capture(&["osximg", "version"]);
        assert_eq!(code, EXIT_SUCCESS);
        assert_eq!(out, "v0.1.4\n");
        assert!(err.is_empty());
    }

    #[test]
    fn test_help_succeeds() {
        let (code, out, _) = dispatch_capture(&["osximg", "--help"]);
        assert_eq!(code, EXIT_SUCCESS);
        assert!(out.contains("clone"));
    }

    #[test]
    fn test_declined_write_prints_aborted_and_succeeds() {
        let image = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(image.path(), [0u8; 64]).unwrap();
        let tools = ExternalDisk {
            config: ToolConfig::default(),
        };
        let mut answers = Answers(VecDeque::from(["no"]));
        let result = osximg::image::write(
            &image.path().to_string_lossy(),
            "/dev/rdisk4",
            &tools,
            &mut answers,
        )
        .map_err(Into::into);

        let mut out = Vec::new();
        let mut err = Vec::new();
        assert_eq!(report_outcome(result, &mut out, &mut err), EXIT_SUCCESS);
        assert_eq!(String::from_utf8(out).unwrap(), "Aborted.\n");
        assert!(err.is_empty());
    }

    #[test]
    fn test_completed_prints_nothing() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        assert_eq!(
            report_outcome(Ok(Outcome::Completed), &mut out, &mut err),
            EXIT_SUCCESS
        );
        assert!(out.is_empty() && err.is_empty());
    }

    #[test]
    fn test_failure_prints_error_and_fails() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = report_outcome(
            Err("unexpected plist structure".into()),
            &mut out,
            &mut err,
        );
        assert_eq!(code, EXIT_FAILURE);
        assert!(out.is_empty());
        assert_eq!(
            String::from_utf8(err).unwrap(),
            "Error: unexpected plist structure\n"
        );
    }
}
