//! Command line definition and entry point.

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use etch_common::EtchPaths;

use crate::provision::Provisioner;
use crate::request::{ProvisionRequest, Settings};

/// Etch - write a file onto a block device
///
/// Every option can also be given through the environment variable shown.
#[derive(Parser, Debug)]
#[command(name = "etch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Provisioning settings.
    #[command(flatten)]
    pub settings: Settings,
}

impl Cli {
    /// Validate the settings and run the provisioning flow.
    pub async fn execute(self) -> Result<()> {
        tracing::info!("WriteFile - Write file to disk");

        let request = ProvisionRequest::from_settings(&self.settings)
            .map_err(|e| eyre!("Invalid provisioning request: {e}"))?;

        tracing::debug!(
            device = %request.device,
            fs_type = %request.fs_type,
            path = %request.dest_path,
            source = request.source.kind(),
            "Provisioning request validated"
        );

        let provisioner = Provisioner::new(EtchPaths::new())
            .map_err(|e| eyre!("Failed to set up provisioner: {e}"))?;

        provisioner
            .run(&request)
            .await
            .map_err(|e| eyre!("Failed to write {}: {e}", request.dest_path))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_map_to_settings() {
        let cli = Cli::try_parse_from([
            "etch",
            "--dest-disk",
            "/dev/sda1",
            "--fs-type",
            "ext4",
            "--dest-path",
            "/etc/hostname",
            "--contents",
            "node-1",
            "--mode",
            "0644",
            "--dir-mode",
            "0755",
            "--uid",
            "0",
            "--gid",
            "0",
        ])
        .unwrap();

        let request = ProvisionRequest::from_settings(&cli.settings).unwrap();
        assert_eq!(request.device, "/dev/sda1");
        assert_eq!(request.file_name(), "hostname");
    }

    #[test]
    fn static_netplan_is_a_switch() {
        let cli = Cli::try_parse_from(["etch", "--static-netplan", "--ifname", "eth0"]).unwrap();
        assert_eq!(cli.settings.static_netplan.as_deref(), Some("true"));
        assert_eq!(cli.settings.ifname.as_deref(), Some("eth0"));
    }

    #[test]
    fn static_netplan_takes_an_optional_value() {
        let cli = Cli::try_parse_from(["etch", "--static-netplan=false"]).unwrap();
        assert_eq!(cli.settings.static_netplan.as_deref(), Some("false"));
    }
}
