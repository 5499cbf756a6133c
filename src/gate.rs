//! Confirmations guarding destructive writes
//!
//! Every check answers with a [`Decision`]. A decline is not an error: the caller stops and exits
//! successfully.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::disks::tree::human_size;
use crate::prompt::Prompter;

static BUFFERED_DEVICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/dev/disk([0-9]+)$").expect("device pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Abort,
}

impl Decision {
    fn from_answer(answer: &str, required: &str) -> Self {
        if answer == required {
            Decision::Proceed
        } else {
            debug!("Expected '{required}', got '{answer}'");
            Decision::Abort
        }
    }
}

/// The raw (unbuffered) form of a whole-disk path: `/dev/diskN` becomes `/dev/rdiskN`.
#[must_use]
pub fn raw_device_path(device: &str) -> Option<String> {
    BUFFERED_DEVICE
        .captures(device)
        .map(|caps| format!("/dev/rdisk{}", &caps[1]))
}

/// Offer the raw device in place of a buffered one. Only `y` or `Y` accepts.
///
/// # Errors
///
/// Returns an error if reading the answer fails.
pub fn offer_raw_device(device: &str, prompter: &mut dyn Prompter) -> std::io::Result<String> {
    let Some(raw) = raw_device_path(device) else {
        return Ok(device.to_string());
    };
    let answer = prompter.ask(&format!(
        "{device} detected. Do you want to use {raw} instead for faster performance? [y/N]: "
    ))?;
    if answer.eq_ignore_ascii_case("y") {
        Ok(raw)
    } else {
        Ok(device.to_string())
    }
}

/// Require the literal `INTERNAL` before touching an internal disk.
///
/// # Errors
///
/// Returns an error if reading the answer fails.
pub fn confirm_internal(device: &str, prompter: &mut dyn Prompter) -> std::io::Result<Decision> {
    prompter.notice(&format!("⚠ WARNING: {device} is an INTERNAL disk!"));
    let answer = prompter
        .ask("Are you absolutely sure you want to continue? Type INTERNAL to confirm: ")?;
    Ok(Decision::from_answer(&answer, "INTERNAL"))
}

/// Require the literal `YES` before overwriting `device` with `image_size` bytes.
///
/// # Errors
///
/// Returns an error if reading the answer fails.
pub fn confirm_overwrite(
    device: &str,
    image_size: u64,
    prompter: &mut dyn Prompter,
) -> std::io::Result<Decision> {
    prompter.notice(&format!("⚠ WARNING: This will overwrite all data on {device}"));
    prompter.notice(&format!(
        "Source image size: {} ({image_size} bytes)",
        human_size(image_size)
    ));
    let answer = prompter.ask("Type YES to continue: ")?;
    Ok(Decision::from_answer(&answer, "YES"))
}
