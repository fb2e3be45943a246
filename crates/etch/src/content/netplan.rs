//! Netplan document for a DHCP-discovered interface.

use etch_common::{EtchError, EtchResult};
use etch_network::NetworkInfo;
use minijinja::Environment;

/// The interface is matched by hardware address and pinned to the offered
/// address. A default route is only emitted when the offer named a router.
const NETPLAN_TEMPLATE: &str = r"network:
    version: 2
    renderer: networkd
    ethernets:
        id0:
            match:
                macaddress: {{ hw_addr }}
            addresses:
                - {{ address }}/{{ prefix_len }}
            nameservers:
                addresses: [{{ nameservers | join(', ') }}]
            {%- if gateway %}
            routes:
                - to: default
                  via: {{ gateway }}
            {%- endif %}
";

/// Render the static netplan configuration for `info`.
pub fn render_netplan(info: &NetworkInfo) -> EtchResult<String> {
    let render_err = |e: minijinja::Error| EtchError::Render {
        template: "netplan",
        message: e.to_string(),
    };

    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.add_template("netplan", NETPLAN_TEMPLATE)
        .map_err(render_err)?;

    let rendered = env
        .get_template("netplan")
        .and_then(|tmpl| tmpl.render(info))
        .map_err(render_err)?;

    tracing::debug!(bytes = rendered.len(), "Rendered netplan");
    Ok(rendered)
}
