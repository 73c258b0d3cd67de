//! stdio helpers for backend child processes.

use mesh_util::preview;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tracing::debug;

use crate::config::ServerConfig;
use crate::types::BackendError;

/// Build a configured `tokio::process::Command` for stdio transport.
pub(crate) fn build_stdio_command(server: &ServerConfig) -> Result<Command, BackendError> {
    let command = server
        .command
        .as_deref()
        .filter(|command| !command.trim().is_empty())
        .ok_or_else(|| BackendError::connect(&server.id, "missing command for stdio transport"))?;

    let mut cmd = Command::new(command);
    cmd.args(&server.args);
    for (key, value) in &server.env {
        cmd.env(key, value);
    }
    if let Some(cwd) = &server.cwd {
        cmd.current_dir(cwd);
    }
    cmd.kill_on_drop(true);
    Ok(cmd)
}

/// Forward the child's stderr lines to tracing.
pub(crate) fn spawn_stderr_logger(server_id: String, stderr: ChildStderr) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(server_id = %server_id, "stderr: {}", preview(&line));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_requires_a_program() {
        let server = ServerConfig {
            id: "fs".into(),
            ..Default::default()
        };
        assert!(matches!(build_stdio_command(&server), Err(BackendError::Connect { .. })));
    }

    #[test]
    fn command_carries_args_env_and_cwd() {
        let mut server = ServerConfig {
            id: "fs".into(),
            command: Some("mcp-fs".into()),
            args: vec!["--root".into(), "/data".into()],
            cwd: Some("/tmp".into()),
            ..Default::default()
        };
        server.env.insert("FS_MODE".into(), "ro".into());

        let cmd = build_stdio_command(&server).unwrap();
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "mcp-fs");
        assert_eq!(std_cmd.get_args().collect::<Vec<_>>(), vec!["--root", "/data"]);
        assert!(
            std_cmd
                .get_envs()
                .any(|(key, value)| key == "FS_MODE" && value == Some(std::ffi::OsStr::new("ro")))
        );
        assert_eq!(std_cmd.get_current_dir(), Some(std::path::Path::new("/tmp")));
    }
}
