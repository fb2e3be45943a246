//! Provisioning request: raw settings in, validated request out.
//!
//! Every check here runs before anything on the system is touched.

use std::time::Duration;

use clap::Args;
use etch_common::{EtchError, EtchResult, FileMode, parse_duration};
use etch_network::DEFAULT_DHCP_TIMEOUT;

/// Raw provisioning settings, as given on the command line or environment.
#[derive(Args, Debug, Clone, Default)]
pub struct Settings {
    /// Block device to mount
    #[arg(long, env = "DEST_DISK")]
    pub dest_disk: Option<String>,

    /// Filesystem type of the block device
    #[arg(long, env = "FS_TYPE")]
    pub fs_type: Option<String>,

    /// Absolute path of the file to write on the device
    #[arg(long, env = "DEST_PATH")]
    pub dest_path: Option<String>,

    /// Literal file contents
    #[arg(long, env = "CONTENTS")]
    pub contents: Option<String>,

    /// Boot configuration document to apply to the file
    #[arg(long, env = "BOOTCONFIG_CONTENTS")]
    pub bootconfig_contents: Option<String>,

    /// Comma-separated metadata service endpoints to fetch user-data from
    #[arg(long, env = "HEGEL_URLS")]
    pub hegel_urls: Option<String>,

    /// Write a netplan document built from a DHCP offer on the host network.
    /// Only "true" enables it; any other value leaves it off.
    #[arg(
        long,
        env = "STATIC_NETPLAN",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub static_netplan: Option<String>,

    /// Interface to run DHCP on (default: first with a global IPv4 address)
    #[arg(long, env = "IFNAME")]
    pub ifname: Option<String>,

    /// Bound on the DHCP exchange, e.g. "90s" or "2m"
    #[arg(long, env = "DHCP_TIMEOUT")]
    pub dhcp_timeout: Option<String>,

    /// Octal mode of the written file
    #[arg(long, env = "MODE")]
    pub mode: Option<String>,

    /// Octal mode of created directories
    #[arg(long, env = "DIRMODE")]
    pub dir_mode: Option<String>,

    /// Owner uid of the file and created directories
    #[arg(long, env = "UID")]
    pub uid: Option<String>,

    /// Owner gid of the file and created directories
    #[arg(long, env = "GID")]
    pub gid: Option<String>,
}

/// Owner applied to created directories and the written file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    /// User id.
    pub uid: u32,
    /// Group id.
    pub gid: u32,
}

/// DHCP discovery parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhcpSettings {
    /// Explicit interface, or `None` to pick the first global unicast one.
    pub interface: Option<String>,
    /// Bound on the whole exchange.
    pub timeout: Duration,
}

/// Where the file contents come from. Exactly one per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// Bytes written verbatim.
    Literal(Vec<u8>),
    /// Boot configuration applied to the (initially empty) file.
    BootConfig(String),
    /// Metadata service endpoints, tried in order.
    MetadataService(Vec<String>),
    /// Netplan document rendered from a DHCP offer.
    Dhcp(DhcpSettings),
}

impl ContentSource {
    /// Short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Literal(_) => "literal",
            Self::BootConfig(_) => "bootconfig",
            Self::MetadataService(_) => "metadata",
            Self::Dhcp(_) => "dhcp",
        }
    }
}

/// A validated provisioning request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    /// Block device to mount.
    pub device: String,
    /// Filesystem type passed to mount.
    pub fs_type: String,
    /// Absolute destination path on the device.
    pub dest_path: String,
    /// Mode of the written file.
    pub mode: FileMode,
    /// Mode of created directories.
    pub dir_mode: FileMode,
    /// Owner of the file and created directories.
    pub owner: Ownership,
    /// Content source.
    pub source: ContentSource,
}

impl ProvisionRequest {
    /// Validate raw settings into a request.
    ///
    /// # Errors
    ///
    /// Returns a validation error for missing or malformed values, a
    /// relative destination path, or anything other than exactly one
    /// content source.
    pub fn from_settings(settings: &Settings) -> EtchResult<Self> {
        let device = required(settings.dest_disk.as_deref(), "DEST_DISK")?;
        let fs_type = required(settings.fs_type.as_deref(), "FS_TYPE")?;
        let dest_path = required(settings.dest_path.as_deref(), "DEST_PATH")?;

        if !dest_path.starts_with('/') {
            return Err(EtchError::validation(format!(
                "DEST_PATH must be an absolute path, got {dest_path}"
            )));
        }
        if dest_path.ends_with('/') {
            return Err(EtchError::validation(format!(
                "DEST_PATH must include a file component, got {dest_path}"
            )));
        }

        let mode = FileMode::parse(&required(settings.mode.as_deref(), "MODE")?)?;
        let dir_mode = FileMode::parse(&required(settings.dir_mode.as_deref(), "DIRMODE")?)?;
        let owner = Ownership {
            uid: parse_id(settings.uid.as_deref(), "UID")?,
            gid: parse_id(settings.gid.as_deref(), "GID")?,
        };

        let source = select_source(settings)?;

        Ok(Self {
            device,
            fs_type,
            dest_path,
            mode,
            dir_mode,
            owner,
            source,
        })
    }

    /// Directory part of the destination path, with a trailing separator.
    #[must_use]
    pub fn dir_path(&self) -> &str {
        // The path is absolute, so there is always a separator.
        let split = self.dest_path.rfind('/').map_or(0, |i| i + 1);
        &self.dest_path[..split]
    }

    /// Final component of the destination path.
    #[must_use]
    pub fn file_name(&self) -> &str {
        let split = self.dest_path.rfind('/').map_or(0, |i| i + 1);
        &self.dest_path[split..]
    }
}

fn required(value: Option<&str>, name: &str) -> EtchResult<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(EtchError::validation(format!(
            "no value specified for [{name}]"
        ))),
    }
}

fn parse_id(value: Option<&str>, name: &str) -> EtchResult<u32> {
    let raw = required(value, name)?;
    raw.trim()
        .parse()
        .map_err(|_| EtchError::validation(format!("could not parse {name}: {raw}")))
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

fn select_source(settings: &Settings) -> EtchResult<ContentSource> {
    let mut sources = Vec::with_capacity(1);

    if let Some(contents) = non_empty(settings.contents.as_ref()) {
        sources.push(ContentSource::Literal(contents.as_bytes().to_vec()));
    }
    if let Some(doc) = non_empty(settings.bootconfig_contents.as_ref()) {
        sources.push(ContentSource::BootConfig(doc.to_string()));
    }
    if let Some(urls) = non_empty(settings.hegel_urls.as_ref()) {
        let endpoints = split_endpoints(urls);
        if endpoints.is_empty() {
            return Err(EtchError::validation(format!(
                "HEGEL_URLS lists no endpoints: {urls:?}"
            )));
        }
        sources.push(ContentSource::MetadataService(endpoints));
    }
    if netplan_requested(settings) {
        sources.push(ContentSource::Dhcp(DhcpSettings {
            interface: non_empty(settings.ifname.as_ref()).map(str::to_string),
            timeout: dhcp_timeout(non_empty(settings.dhcp_timeout.as_ref())),
        }));
    }

    if sources.len() != 1 {
        return Err(EtchError::validation(format!(
            "exactly one of CONTENTS, BOOTCONFIG_CONTENTS, HEGEL_URLS, STATIC_NETPLAN must be set ({} given)",
            sources.len()
        )));
    }

    sources
        .pop()
        .ok_or_else(|| EtchError::validation("no content source"))
}

fn netplan_requested(settings: &Settings) -> bool {
    settings.static_netplan.as_deref() == Some("true")
}

fn split_endpoints(urls: &str) -> Vec<String> {
    urls.split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse the DHCP timeout, falling back to the default on bad input.
fn dhcp_timeout(raw: Option<&str>) -> Duration {
    let Some(raw) = raw else {
        return DEFAULT_DHCP_TIMEOUT;
    };

    match parse_duration(raw) {
        Ok(timeout) => timeout,
        Err(e) => {
            tracing::warn!(
                value = raw,
                error = %e,
                default = ?DEFAULT_DHCP_TIMEOUT,
                "Invalid DHCP_TIMEOUT, using default"
            );
            DEFAULT_DHCP_TIMEOUT
        }
    }
}
