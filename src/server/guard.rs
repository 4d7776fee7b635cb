use std::{io::IsTerminal, process::ExitCode};

use serde_json::json;

use crate::{
    cli::{LaunchProfile, TransportMode},
    lib::errors::{ErrorCategory, MCP_CLIENT_REQUIRED_ERROR},
    server::runtime::RuntimeExit,
};

pub const MCP_CLIENT_REQUIRED_EXIT_CODE: u8 = 44;

/// Refuse to serve stdio when a human is on the other end of the pipe.
pub fn ensure_invoked_via_mcp_client(profile: &LaunchProfile) -> Result<(), RuntimeExit> {
    if profile.transport != TransportMode::Stdio {
        return Ok(());
    }
    let stdin_tty = std::io::stdin().is_terminal();
    let stdout_tty = std::io::stdout().is_terminal();
    if stdin_tty || stdout_tty {
        return Err(client_required_exit(profile, stdin_tty, stdout_tty));
    }
    Ok(())
}

fn client_required_exit(profile: &LaunchProfile, stdin_tty: bool, stdout_tty: bool) -> RuntimeExit {
    let built = MCP_CLIENT_REQUIRED_ERROR
        .builder()
        .retryable(true)
        .category(ErrorCategory::InvalidParams)
        .details(json!({
            "transport": profile.transport.as_str(),
            "server_spec": profile.spec.to_arg(),
            "stdin_is_tty": stdin_tty,
            "stdout_is_tty": stdout_tty
        }))
        .with_exit_code_value(MCP_CLIENT_REQUIRED_EXIT_CODE)
        .build();
    match built {
        Ok(data) => RuntimeExit::structured(data, ExitCode::from(MCP_CLIENT_REQUIRED_EXIT_CODE)),
        Err(err) => RuntimeExit::from_error(err),
    }
}
