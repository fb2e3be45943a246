//! The provisioning run: mount, directories, contents, write, finalize.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use etch_common::{EtchPaths, EtchResult};

use crate::bootconfig::BootConfigTool;
use crate::content::{ContentResolver, HostNetwork, MetadataClient};
use crate::filesystem::{apply_ownership, ensure_dir_tree, mount_device, write_file};
use crate::request::{ContentSource, ProvisionRequest};

/// Executes a [`ProvisionRequest`].
#[derive(Debug, Clone)]
pub struct Provisioner {
    paths: EtchPaths,
    resolver: ContentResolver,
}

impl Provisioner {
    /// Provisioner that discovers DHCP content through the host namespace
    /// named in `paths`.
    pub fn new(paths: EtchPaths) -> EtchResult<Self> {
        let network = Arc::new(HostNetwork::new(paths.host_netns.clone()));
        let resolver = ContentResolver::new(MetadataClient::new()?, network);
        Ok(Self::with_resolver(paths, resolver))
    }

    /// Provisioner with a custom content resolver.
    #[must_use]
    pub const fn with_resolver(paths: EtchPaths, resolver: ContentResolver) -> Self {
        Self { paths, resolver }
    }

    /// Mount the device and populate it.
    ///
    /// Returns the path of the written file as seen from this process.
    pub async fn run(&self, request: &ProvisionRequest) -> EtchResult<PathBuf> {
        let mount = mount_device(&request.device, &request.fs_type, &self.paths.mountpoint)?;
        let written = self.populate(mount.root(), request).await?;

        tracing::info!(
            file = %request.dest_path,
            device = %request.device,
            "Successfully wrote file to device"
        );
        Ok(written)
    }

    /// Write the requested file beneath an already mounted `root`.
    ///
    /// Directories are ensured before any content is resolved, so a
    /// directory conflict fails without touching the network.
    pub async fn populate(&self, root: &Path, request: &ProvisionRequest) -> EtchResult<PathBuf> {
        ensure_dir_tree(root, request.dir_path(), request.dir_mode, request.owner)?;

        let contents = self.resolver.resolve(&request.source).await?;

        let target = EtchPaths::under(root, &request.dest_path);
        write_file(&target, &contents, request.mode)?;

        if let ContentSource::BootConfig(document) = &request.source {
            BootConfigTool::new(&self.paths.bootconfig_tool, &self.paths.bootconfig_input)
                .apply(document, &target, request.mode)
                .await?;
        }

        apply_ownership(&target, request.owner)?;
        tracing::debug!(
            path = %target.display(),
            uid = request.owner.uid,
            gid = request.owner.gid,
            "Set file ownership"
        );

        Ok(target)
    }
}
