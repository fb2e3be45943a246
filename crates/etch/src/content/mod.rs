//! Resolution of the bytes to write.
//!
//! Literal content is used as given. Metadata user-data is fetched with
//! endpoint failover. DHCP content is a netplan document rendered from an
//! offer received on the host network. Boot configuration resolves to an
//! empty file that the bootconfig tool fills in afterwards.

mod metadata;
mod netplan;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use etch_common::EtchResult;
use etch_network::NetworkInfo;

use crate::request::{ContentSource, DhcpSettings};

pub use metadata::{MetadataClient, REQUEST_TIMEOUT, USER_DATA_VERSION, user_data_url};
pub use netplan::render_netplan;

/// Source of DHCP-derived network facts.
#[async_trait]
pub trait NetworkDiscovery: Send + Sync {
    /// Discover addressing for the provisioning interface.
    async fn discover(&self, settings: &DhcpSettings) -> EtchResult<NetworkInfo>;
}

/// Discovery in the host network namespace.
#[derive(Debug, Clone)]
pub struct HostNetwork {
    netns: PathBuf,
}

impl HostNetwork {
    /// Discover through the namespace file at `netns`.
    pub fn new(netns: impl Into<PathBuf>) -> Self {
        Self {
            netns: netns.into(),
        }
    }
}

#[async_trait]
impl NetworkDiscovery for HostNetwork {
    async fn discover(&self, settings: &DhcpSettings) -> EtchResult<NetworkInfo> {
        etch_network::discover_host_network(
            self.netns.clone(),
            settings.interface.clone(),
            settings.timeout,
        )
        .await
    }
}

/// Turns a [`ContentSource`] into file contents.
#[derive(Clone)]
pub struct ContentResolver {
    metadata: MetadataClient,
    network: Arc<dyn NetworkDiscovery>,
}

impl ContentResolver {
    /// Create a resolver.
    pub fn new(metadata: MetadataClient, network: Arc<dyn NetworkDiscovery>) -> Self {
        Self { metadata, network }
    }

    /// Resolve the contents to write for `source`.
    pub async fn resolve(&self, source: &ContentSource) -> EtchResult<Vec<u8>> {
        tracing::debug!(source = source.kind(), "Resolving content");

        match source {
            ContentSource::Literal(bytes) => Ok(bytes.clone()),
            ContentSource::BootConfig(_) => Ok(Vec::new()),
            ContentSource::MetadataService(endpoints) => {
                self.metadata.fetch_user_data(endpoints).await
            }
            ContentSource::Dhcp(settings) => {
                let info = self.network.discover(settings).await?;
                Ok(render_netplan(&info)?.into_bytes())
            }
        }
    }
}

impl std::fmt::Debug for ContentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentResolver")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}
