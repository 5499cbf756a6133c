//! Disk hierarchy as reported by the enumeration tool
//!
//! Top-level disks own their partitions, and APFS containers own their volumes. The tree is built
//! from the decoded property list in [`node`] and turned into indented text in [`tree`].
//!
//! Decoding never fails on a partial record: fields that are missing or carry an unexpected type
//! fall back to empty values, so one odd entry cannot hide the rest of the listing.

pub mod node;
pub mod tree;
