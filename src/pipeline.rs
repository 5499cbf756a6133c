//! Copy pipelines built from `dd` and `pv`
//!
//! The bytes are moved by the external tools. This module only assembles the shell pipeline and
//! runs it under `sudo`, with the terminal's stdio passed straight through so `pv` can draw its
//! progress bar and `sudo` can ask for a password.

use std::process::{Command as ProcessCommand, ExitStatus};

use log::debug;
use thiserror::Error;

use crate::config_file::ToolConfig;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("copy pipeline exited with {0}")]
    Failed(ExitStatus),
}

/// Quote a word for `sh`/`bash`, leaving plain paths untouched.
#[must_use]
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._+,:@%=-".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Pipeline reading a device into an image file: `dd | pv | dd`.
#[must_use]
pub fn clone_pipeline(config: &ToolConfig, source: &str, dest: &str, size: u64) -> String {
    format!(
        "{dd} if={src} bs={bs} | {pv} -s {size} | {dd} of={dst} bs={bs}",
        dd = config.dd,
        pv = config.pv,
        bs = config.block_size,
        src = shell_quote(source),
        dst = shell_quote(dest),
    )
}

/// Pipeline streaming an image file onto a device: `pv | dd`.
#[must_use]
pub fn write_pipeline(config: &ToolConfig, source: &str, dest: &str, size: u64) -> String {
    format!(
        "{pv} -s {size} {src} | {dd} of={dst} bs={bs}",
        dd = config.dd,
        pv = config.pv,
        bs = config.block_size,
        src = shell_quote(source),
        dst = shell_quote(dest),
    )
}

/// Run `pipeline` as `sudo <shell> -c <pipeline>` and wait for it.
///
/// # Errors
///
/// Returns `PipelineError::Spawn` if `sudo` cannot be started, or `PipelineError::Failed` if the
/// pipeline exits unsuccessfully.
pub fn run(config: &ToolConfig, pipeline: &str) -> Result<(), PipelineError> {
    debug!("Running {} {} -c {pipeline}", config.sudo, config.shell);
    let status = ProcessCommand::new(&config.sudo)
        .arg(&config.shell)
        .arg("-c")
        .arg(pipeline)
        .status()
        .map_err(|source| PipelineError::Spawn {
            program: config.sudo.clone(),
            source,
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(PipelineError::Failed(status))
    }
}
