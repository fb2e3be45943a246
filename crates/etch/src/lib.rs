//! # Etch
//!
//! Etch writes a single provisioning file onto a block device.
//!
//! ## Flow
//!
//! 1. Validate the request: exactly one content source, absolute path,
//!    octal modes, numeric owner.
//! 2. Mount the device on a fixed mountpoint.
//! 3. Create missing directories with the requested mode and owner.
//! 4. Resolve the contents: literal, metadata user-data, or a netplan
//!    document built from a DHCP offer on the host network.
//! 5. Write the file, optionally apply a boot configuration to it, and
//!    hand it to its owner.
//!
//! ## Usage
//!
//! ```no_run
//! use etch::provision::Provisioner;
//! use etch::request::{ProvisionRequest, Settings};
//! use etch_common::EtchPaths;
//!
//! # async fn example() -> etch_common::EtchResult<()> {
//! let settings = Settings {
//!     dest_disk: Some("/dev/sda1".into()),
//!     fs_type: Some("ext4".into()),
//!     dest_path: Some("/etc/hostname".into()),
//!     contents: Some("node-1\n".into()),
//!     mode: Some("0644".into()),
//!     dir_mode: Some("0755".into()),
//!     uid: Some("0".into()),
//!     gid: Some("0".into()),
//!     ..Settings::default()
//! };
//!
//! let request = ProvisionRequest::from_settings(&settings)?;
//! Provisioner::new(EtchPaths::new())?.run(&request).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod bootconfig;
pub mod cli;
pub mod content;
pub mod filesystem;
pub mod provision;
pub mod request;

pub use provision::Provisioner;
pub use request::{ContentSource, ProvisionRequest};
