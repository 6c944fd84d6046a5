use tokio::process::Command;

use crate::error::NetError;

/// Run an external command and return its stdout on success.
pub async fn run_command(program: &str, args: &[&str]) -> Result<String, NetError> {
    let output = Command::new(program).args(args).output().await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            NetError::CommandNotFound { program: program.to_string() }
        } else {
            NetError::Io(e)
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(NetError::Command {
            program: program.to_string(),
            message: stderr.trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_command_echo() {
        let output = run_command("echo", &["hello"]).await;
        assert_eq!(output.unwrap_or_default(), "hello");
    }

    #[tokio::test]
    async fn run_command_not_found() {
        let output = run_command("nonexistent-binary-xyz", &[]).await;
        assert!(matches!(output, Err(NetError::CommandNotFound { .. })));
    }

    #[tokio::test]
    async fn run_command_failure() {
        let output = run_command("false", &[]).await;
        assert!(matches!(output, Err(NetError::Command { .. })));
    }
}
