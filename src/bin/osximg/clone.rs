use clap::Args;

use osximg::diskutil::DiskTools;
use osximg::gate::offer_raw_device;
use osximg::image::{self, Outcome};
use osximg::prompt::StdinPrompter;

#[derive(Args, Debug)]
pub struct CloneArgs {
    /// Device to read, eg /dev/disk4
    source_device: String,

    /// Image file to create
    dest_image: String,
}

/// Clone a device into an image file.
///
/// # Errors
///
/// Returns an error if the device cannot be inspected or the copy fails.
pub fn run(
    args: &CloneArgs,
    tools: &dyn DiskTools,
) -> Result<Outcome, Box<dyn std::error::Error>> {
    let mut prompter = StdinPrompter;
    let source = offer_raw_device(&args.source_device, &mut prompter)?;
    Ok(image::clone(&source, &args.dest_image, tools, &mut prompter)?)
}
