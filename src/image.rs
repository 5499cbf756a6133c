//! Cloning devices into image files and writing images back onto devices

use std::path::Path;

use log::{info, warn};
use thiserror::Error;

use crate::diskutil::{self, DiskTools, DiskutilError};
use crate::gate::{self, Decision};
use crate::pipeline::{self, PipelineError};
use crate::prompt::Prompter;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("failed to get disk size: {0}")]
    DiskSize(#[source] DiskutilError),
    #[error("failed to get source image size: {0}")]
    ImageSize(#[source] std::io::Error),
    #[error("failed to read confirmation: {0}")]
    Prompt(#[from] std::io::Error),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// How an operation ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Aborted,
}

fn run_pipeline(
    tools: &dyn DiskTools,
    prompter: &mut dyn Prompter,
    command: &str,
) -> Result<Outcome, ImageError> {
    prompter.notice(&format!("Running (sudo required): {command}"));
    tools.copy(command)?;
    info!("Copy pipeline finished");
    Ok(Outcome::Completed)
}

/// Copy the whole of `source_device` into the image file `dest_image`.
///
/// # Errors
///
/// Returns `ImageError::DiskSize` if the device size cannot be determined, or
/// `ImageError::Pipeline` if the copy fails.
pub fn clone(
    source_device: &str,
    dest_image: &str,
    tools: &dyn DiskTools,
    prompter: &mut dyn Prompter,
) -> Result<Outcome, ImageError> {
    let total_size = diskutil::disk_size(tools, source_device).map_err(ImageError::DiskSize)?;
    let command =
        pipeline::clone_pipeline(tools.config(), source_device, dest_image, total_size);
    run_pipeline(tools, prompter, &command)
}

/// Write the image file `source_image` onto `dest_device` after the user confirms.
///
/// # Errors
///
/// Returns `ImageError::ImageSize` if the image cannot be inspected, `ImageError::Prompt` if an
/// answer cannot be read, or `ImageError::Pipeline` if the copy fails.
pub fn write(
    source_image: &str,
    dest_device: &str,
    tools: &dyn DiskTools,
    prompter: &mut dyn Prompter,
) -> Result<Outcome, ImageError> {
    let image_size = std::fs::metadata(Path::new(source_image))
        .map_err(ImageError::ImageSize)?
        .len();

    match diskutil::is_internal(tools, dest_device) {
        Ok(true) => {
            if gate::confirm_internal(dest_device, prompter)? == Decision::Abort {
                return Ok(Outcome::Aborted);
            }
        }
        Ok(false) => {}
        Err(e) => warn!("Unable to tell whether {dest_device} is internal: {e}"),
    }

    if gate::confirm_overwrite(dest_device, image_size, prompter)? == Decision::Abort {
        return Ok(Outcome::Aborted);
    }

    prompter.notice(&format!("Writing {source_image} → {dest_device}"));
    let command =
        pipeline::write_pipeline(tools.config(), source_image, dest_device, image_size);
    run_pipeline(tools, prompter, &command)
}
