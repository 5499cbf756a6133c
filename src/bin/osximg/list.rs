use osximg::disks::tree::render_forest;
use osximg::diskutil::{DiskTools, list_disks};
use osximg::image::Outcome;

/// Print every attached disk as a tree.
///
/// # Errors
///
/// Returns an error if the disks cannot be enumerated.
pub fn run(tools: &dyn DiskTools) -> Result<Outcome, Box<dyn std::error::Error>> {
    let disks = list_disks(tools)?;
    for line in render_forest(&disks) {
        println!("{line}");
    }
    Ok(Outcome::Completed)
}
