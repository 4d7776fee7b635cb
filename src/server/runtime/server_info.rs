use crate::{compose::MountOptions, mcp_config::McpConfig};

/// Build the `ServerInfo.instructions` string shown to MCP clients.
pub fn build_instructions(server_spec: &str, config: &McpConfig, options: &MountOptions) -> String {
    let names = config.server_names();
    if names.is_empty() {
        return format!("Composite MCP server for {server_spec}; no servers are configured.");
    }
    let naming = if options.name_as_prefix {
        "Tool and prompt names are prefixed `<server>_`, resource URIs carry the server name as authority."
    } else {
        "Names are exposed unchanged; on collisions the last configured server wins."
    };
    format!(
        "Composite MCP server for {server_spec} mounting {count} server(s): {list}. {naming}",
        count = names.len(),
        list = names.join(", "),
    )
}
