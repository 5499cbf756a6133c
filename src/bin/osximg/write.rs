use clap::Args;

use osximg::diskutil::DiskTools;
use osximg::gate::offer_raw_device;
use osximg::image::{self, Outcome};
use osximg::prompt::StdinPrompter;

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Image file to read
    source_image: String,

    /// Device to overwrite, eg /dev/disk4
    dest_device: String,
}

/// Write an image file onto a device after confirmation.
///
/// # Errors
///
/// Returns an error if the image or device cannot be inspected or the copy fails.
pub fn run(
    args: &WriteArgs,
    tools: &dyn DiskTools,
) -> Result<Outcome, Box<dyn std::error::Error>> {
    let mut prompter = StdinPrompter;
    let dest = offer_raw_device(&args.dest_device, &mut prompter)?;
    Ok(image::write(&args.source_image, &dest, tools, &mut prompter)?)
}
