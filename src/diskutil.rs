//! Disk enumeration and device queries through `diskutil`
//!
//! `diskutil` emits XML property lists. They are piped through `plutil -convert json` and decoded
//! with `serde_json`, so the rest of the crate only ever sees generic JSON values.

use std::io::Write;
use std::process::{Command as ProcessCommand, ExitStatus, Stdio};

use log::debug;
use serde_json::Value;
use thiserror::Error;

use crate::config_file::ToolConfig;
use crate::disks::node::{ALL_DISKS_KEY, DeviceInfo, DiskNode, parse_disk_list};
use crate::pipeline::{self, PipelineError};

#[derive(Error, Debug)]
pub enum DiskutilError {
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("unable to decode {tool} output: {source}")]
    Json {
        tool: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unexpected plist structure: missing {0} array")]
    UnexpectedStructure(&'static str),
    #[error("disk size not found for {0}")]
    MissingSize(String),
}

/// Access to the external programs the tool drives
///
/// Everything that touches the host goes through this trait so the flows built on top of it can be
/// exercised with a fake.
pub trait DiskTools {
    /// Decoded output of `diskutil list -plist`
    ///
    /// # Errors
    ///
    /// Returns `DiskutilError` if either tool fails or emits invalid JSON.
    fn list(&self) -> Result<Value, DiskutilError>;

    /// Decoded output of `diskutil info -plist <device>`
    ///
    /// # Errors
    ///
    /// Returns `DiskutilError` if either tool fails or emits invalid JSON.
    fn info(&self, device: &str) -> Result<Value, DiskutilError>;

    /// Run a copy pipeline with elevated privileges, attached to the terminal.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` if the pipeline cannot start or exits unsuccessfully.
    fn copy(&self, pipeline: &str) -> Result<(), PipelineError>;

    /// Programs and block size the pipelines are built from
    fn config(&self) -> &ToolConfig;
}

/// [`DiskTools`] backed by the real programs named in a [`ToolConfig`]
#[derive(Debug, Clone, Default)]
pub struct SystemTools {
    pub config: ToolConfig,
}

impl SystemTools {
    #[must_use]
    pub fn new(config: ToolConfig) -> Self {
        Self { config }
    }

    /// Run `diskutil` with `args` and decode its plist output as JSON
    fn diskutil_json(&self, args: &[&str]) -> Result<Value, DiskutilError> {
        let plist = run_captured(&self.config.diskutil, args, None)?;
        let json = run_captured(
            &self.config.plutil,
            &["-convert", "json", "-o", "-", "--", "-"],
            Some(&plist),
        )?;
        serde_json::from_slice(&json).map_err(|source| DiskutilError::Json {
            tool: self.config.plutil.clone(),
            source,
        })
    }
}

impl DiskTools for SystemTools {
    fn list(&self) -> Result<Value, DiskutilError> {
        self.diskutil_json(&["list", "-plist"])
    }

    fn info(&self, device: &str) -> Result<Value, DiskutilError> {
        self.diskutil_json(&["info", "-plist", device])
    }

    fn copy(&self, pipeline: &str) -> Result<(), PipelineError> {
        pipeline::run(&self.config, pipeline)
    }

    fn config(&self) -> &ToolConfig {
        &self.config
    }
}

/// Run a program to completion, optionally feeding `input` on stdin, and return its stdout.
fn run_captured(
    program: &str,
    args: &[&str],
    input: Option<&[u8]>,
) -> Result<Vec<u8>, DiskutilError> {
    debug!("Running {program} {}", args.join(" "));
    let spawn_err = |source| DiskutilError::Spawn {
        tool: program.to_string(),
        source,
    };

    let mut child = ProcessCommand::new(program)
        .args(args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_err)?;

    let output = std::thread::scope(|scope| {
        if let (Some(data), Some(mut stdin)) = (input, child.stdin.take()) {
            scope.spawn(move || {
                // A consumer that exits early closes the pipe; its exit status reports the problem.
                let _ = stdin.write_all(data);
            });
        }
        child.wait_with_output()
    })
    .map_err(spawn_err)?;

    if !output.status.success() {
        return Err(DiskutilError::Failed {
            tool: program.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output.stdout)
}

/// All top-level disks with their partitions and volumes.
///
/// # Errors
///
/// Returns `DiskutilError::UnexpectedStructure` if the listing has no disk array, or any error from
/// running the tools.
pub fn list_disks(tools: &dyn DiskTools) -> Result<Vec<DiskNode>, DiskutilError> {
    let root = tools.list()?;
    let disks = parse_disk_list(root).ok_or(DiskutilError::UnexpectedStructure(ALL_DISKS_KEY))?;
    debug!("Found {} top-level disks", disks.len());
    Ok(disks)
}

/// Size and location facts for one device.
///
/// # Errors
///
/// Returns `DiskutilError` if the info query fails.
pub fn device_info(tools: &dyn DiskTools, device: &str) -> Result<DeviceInfo, DiskutilError> {
    tools.info(device).map(DeviceInfo::from_value)
}

/// Total size of a device in bytes.
///
/// # Errors
///
/// Returns `DiskutilError::MissingSize` if the device reports no numeric size.
pub fn disk_size(tools: &dyn DiskTools, device: &str) -> Result<u64, DiskutilError> {
    device_info(tools, device)?
        .total_size
        .ok_or_else(|| DiskutilError::MissingSize(device.to_string()))
}

/// Whether the enumeration tool flags the device as internal. Absent flag means external.
///
/// # Errors
///
/// Returns `DiskutilError` if the info query fails.
pub fn is_internal(tools: &dyn DiskTools, device: &str) -> Result<bool, DiskutilError> {
    Ok(device_info(tools, device)?.internal)
}
