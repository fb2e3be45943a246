//! Filesystem operations on the target device.
//!
//! This module handles:
//! - Mounting the block device
//! - Idempotent directory provisioning
//! - Writing the destination file and setting its owner

pub mod dirs;
pub mod file;
pub mod mounts;

pub use dirs::ensure_dir_tree;
pub use file::{apply_ownership, write_file};
pub use mounts::{MountHandle, mount_device};
