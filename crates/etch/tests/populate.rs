//! Integration tests for populating a mounted root.
//!
//! A temporary directory stands in for the mounted device.

use std::error::Error;
use std::net::Ipv4Addr;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use etch::content::{ContentResolver, MetadataClient, NetworkDiscovery};
use etch::request::{DhcpSettings, ProvisionRequest, Settings};
use etch::Provisioner;
use etch_common::{EtchError, EtchPaths, EtchResult};
use etch_network::{HwAddr, NetworkInfo};
use httpmock::prelude::*;
use tempfile::TempDir;

struct OfferedNetwork;

#[async_trait]
impl NetworkDiscovery for OfferedNetwork {
    async fn discover(&self, _settings: &DhcpSettings) -> EtchResult<NetworkInfo> {
        Ok(NetworkInfo {
            hw_addr: HwAddr::new([0x0c, 0xc4, 0x7a, 0x01, 0x02, 0x03]),
            address: Ipv4Addr::new(172, 16, 0, 10),
            prefix_len: 16,
            gateway: None,
            nameservers: vec![Ipv4Addr::new(172, 16, 0, 1)],
        })
    }
}

fn owner() -> (String, String) {
    (
        rustix::process::getuid().as_raw().to_string(),
        rustix::process::getgid().as_raw().to_string(),
    )
}

fn settings(dest_path: &str) -> Settings {
    let (uid, gid) = owner();
    Settings {
        dest_disk: Some("/dev/sdX".to_string()),
        fs_type: Some("ext4".to_string()),
        dest_path: Some(dest_path.to_string()),
        mode: Some("0644".to_string()),
        dir_mode: Some("0755".to_string()),
        uid: Some(uid),
        gid: Some(gid),
        ..Settings::default()
    }
}

fn provisioner(scratch: &Path) -> Result<Provisioner, Box<dyn Error>> {
    let paths = EtchPaths::with_root(scratch).with_bootconfig_tool("/bin/cp");
    let resolver = ContentResolver::new(MetadataClient::new()?, Arc::new(OfferedNetwork));
    Ok(Provisioner::with_resolver(paths, resolver))
}

fn mode_of(path: &Path) -> Result<u32, Box<dyn Error>> {
    Ok(std::fs::metadata(path)?.mode() & 0o7777)
}

#[tokio::test]
async fn test_literal_file_with_directories() -> Result<(), Box<dyn Error>> {
    let root = TempDir::new()?;
    let scratch = TempDir::new()?;
    let request = ProvisionRequest::from_settings(&Settings {
        contents: Some("hello".to_string()),
        ..settings("/etc/config/app.conf")
    })?;

    let written = provisioner(scratch.path())?
        .populate(root.path(), &request)
        .await?;

    assert_eq!(written, root.path().join("etc/config/app.conf"));
    assert_eq!(std::fs::read_to_string(&written)?, "hello");
    assert_eq!(mode_of(&written)?, 0o644);
    assert_eq!(mode_of(&root.path().join("etc"))?, 0o755);
    assert_eq!(mode_of(&root.path().join("etc/config"))?, 0o755);

    let meta = std::fs::metadata(&written)?;
    assert_eq!(meta.uid(), request.owner.uid);
    assert_eq!(meta.gid(), request.owner.gid);
    Ok(())
}

#[tokio::test]
async fn test_rerun_overwrites_file_and_keeps_directories() -> Result<(), Box<dyn Error>> {
    let root = TempDir::new()?;
    let scratch = TempDir::new()?;
    let provisioner = provisioner(scratch.path())?;

    let first = ProvisionRequest::from_settings(&Settings {
        contents: Some("first version".to_string()),
        ..settings("/etc/config/app.conf")
    })?;
    provisioner.populate(root.path(), &first).await?;

    let second = ProvisionRequest::from_settings(&Settings {
        contents: Some("second".to_string()),
        ..settings("/etc/config/app.conf")
    })?;
    let written = provisioner.populate(root.path(), &second).await?;

    assert_eq!(std::fs::read_to_string(written)?, "second");
    Ok(())
}

#[tokio::test]
async fn test_directory_conflict_stops_before_write() -> Result<(), Box<dyn Error>> {
    let root = TempDir::new()?;
    let scratch = TempDir::new()?;
    std::fs::create_dir(root.path().join("etc"))?;
    std::fs::write(root.path().join("etc/config"), b"i am a file")?;

    let request = ProvisionRequest::from_settings(&Settings {
        contents: Some("hello".to_string()),
        ..settings("/etc/config/app.conf")
    })?;

    let err = provisioner(scratch.path())?
        .populate(root.path(), &request)
        .await
        .unwrap_err();

    assert!(matches!(err, EtchError::PathConflict { .. }), "{err:?}");
    assert_eq!(
        std::fs::read_to_string(root.path().join("etc/config"))?,
        "i am a file"
    );
    Ok(())
}

#[tokio::test]
async fn test_bootconfig_is_applied_to_output() -> Result<(), Box<dyn Error>> {
    let root = TempDir::new()?;
    let scratch = TempDir::new()?;
    let request = ProvisionRequest::from_settings(&Settings {
        bootconfig_contents: Some("kernel.console = ttyS0,115200\n".to_string()),
        ..settings("/boot/initrd.img")
    })?;

    let written = provisioner(scratch.path())?
        .populate(root.path(), &request)
        .await?;

    assert_eq!(
        std::fs::read_to_string(&written)?,
        "kernel.console = ttyS0,115200\n"
    );
    assert!(!scratch.path().join("userInputBootConfig").exists());
    Ok(())
}

#[tokio::test]
async fn test_metadata_user_data_with_failover() -> Result<(), Box<dyn Error>> {
    let root = TempDir::new()?;
    let scratch = TempDir::new()?;
    let up = MockServer::start_async().await;

    up.mock_async(|when, then| {
        when.method(GET).path("/2009-04-04/user-data");
        then.status(200).body("#cloud-config\nhostname: node-1\n");
    })
    .await;

    let request = ProvisionRequest::from_settings(&Settings {
        // Nothing listens on port 1, so the first endpoint is refused.
        hegel_urls: Some(format!("http://127.0.0.1:1,{}", up.base_url())),
        ..settings("/var/lib/cloud/seed/nocloud/user-data")
    })?;

    let written = provisioner(scratch.path())?
        .populate(root.path(), &request)
        .await?;

    assert_eq!(
        std::fs::read_to_string(written)?,
        "#cloud-config\nhostname: node-1\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_metadata_error_page_is_written() -> Result<(), Box<dyn Error>> {
    let root = TempDir::new()?;
    let scratch = TempDir::new()?;
    let missing = MockServer::start_async().await;

    missing
        .mock_async(|when, then| {
            when.method(GET).path("/2009-04-04/user-data");
            then.status(404).body("not found");
        })
        .await;

    let request = ProvisionRequest::from_settings(&Settings {
        hegel_urls: Some(missing.base_url()),
        ..settings("/var/lib/cloud/seed/nocloud/user-data")
    })?;

    let written = provisioner(scratch.path())?
        .populate(root.path(), &request)
        .await?;

    assert_eq!(std::fs::read_to_string(written)?, "not found");
    Ok(())
}

#[tokio::test]
async fn test_static_netplan_from_offer() -> Result<(), Box<dyn Error>> {
    let root = TempDir::new()?;
    let scratch = TempDir::new()?;
    let request = ProvisionRequest::from_settings(&Settings {
        static_netplan: Some("true".to_string()),
        ..settings("/etc/netplan/config.yaml")
    })?;

    let written = provisioner(scratch.path())?
        .populate(root.path(), &request)
        .await?;

    let netplan = std::fs::read_to_string(written)?;
    assert!(netplan.contains("macaddress: 0c:c4:7a:01:02:03"));
    assert!(netplan.contains("- 172.16.0.10/16"));
    assert!(netplan.contains("addresses: [172.16.0.1]"));
    assert!(!netplan.contains("routes:"));
    Ok(())
}

#[tokio::test]
#[ignore = "requires root (mount, chown to 0:0)"]
async fn test_full_run_on_tmpfs() -> Result<(), Box<dyn Error>> {
    let scratch = TempDir::new()?;
    let request = ProvisionRequest::from_settings(&Settings {
        dest_disk: Some("tmpfs".to_string()),
        fs_type: Some("tmpfs".to_string()),
        contents: Some("hello".to_string()),
        uid: Some("0".to_string()),
        gid: Some("0".to_string()),
        ..settings("/etc/config/app.conf")
    })?;

    let provisioner = provisioner(scratch.path())?;
    let written = provisioner.run(&request).await?;

    let config = scratch.path().join("mountAction/etc/config");
    assert_eq!(mode_of(&config)?, 0o755);
    assert_eq!(std::fs::metadata(&config)?.uid(), 0);
    assert_eq!(std::fs::read_to_string(&written)?, "hello");
    assert_eq!(mode_of(&written)?, 0o644);

    rustix::mount::unmount(
        &scratch.path().join("mountAction"),
        rustix::mount::UnmountFlags::DETACH,
    )?;
    Ok(())
}
