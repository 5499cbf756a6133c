//! Core implementation of osximg
//!
//! osximg lists the disks attached to a Mac as a tree, clones a device into an image file and
//! writes an image file back onto a device. Enumeration is done by `diskutil` and `plutil`, and the
//! bytes are moved by a `dd`/`pv` pipeline run under `sudo`; this crate builds the disk tree, renders
//! it, and guards destructive writes behind explicit confirmations.

pub mod config_file;
pub mod disks;
pub mod diskutil;
pub mod gate;
pub mod image;
pub mod logger;
pub mod pipeline;
pub mod prompt;

/// Version string printed by `osximg version`
pub const VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

/// Text shown when no valid subcommand is given
pub const USAGE: &str = concat!(
    "osximg version v",
    env!("CARGO_PKG_VERSION"),
    "\n\nUsage: osximg {list|clone|write|version}"
);
