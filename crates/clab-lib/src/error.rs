//! Error types for lab discovery

use std::time::Duration;
use thiserror::Error;

/// Failure of an external inspect tool invocation
#[derive(Debug, Error)]
pub enum ExternalToolError {
    /// The process could not be started
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran but exited unsuccessfully
    #[error("`{command}` exited with {}", exit_code_display(.code))]
    NonZeroExit { command: String, code: Option<i32> },

    /// The process succeeded but its stdout is not what we can parse
    #[error("`{command}` returned malformed output: {reason}")]
    MalformedOutput { command: String, reason: String },

    /// The process did not finish within the allowed time
    #[error("`{command}` timed out after {}s", .timeout.as_secs())]
    Timeout { command: String, timeout: Duration },
}

impl ExternalToolError {
    /// Command line that was attempted
    pub fn command(&self) -> &str {
        match self {
            ExternalToolError::Spawn { command, .. }
            | ExternalToolError::NonZeroExit { command, .. }
            | ExternalToolError::MalformedOutput { command, .. }
            | ExternalToolError::Timeout { command, .. } => command,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ExternalToolError::Timeout { .. })
    }
}

fn exit_code_display(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Failure while searching the workspace for topology files
#[derive(Debug, Error)]
pub enum FinderError {
    #[error("invalid topology glob `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("topology search task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_command() {
        let err = ExternalToolError::NonZeroExit {
            command: "containerlab inspect -r docker --all --details --format json".to_string(),
            code: Some(1),
        };
        assert_eq!(
            err.to_string(),
            "`containerlab inspect -r docker --all --details --format json` exited with status 1"
        );
        assert!(err.command().starts_with("containerlab inspect"));
    }

    #[test]
    fn test_timeout_error() {
        let err = ExternalToolError::Timeout {
            command: "containerlab inspect interfaces".to_string(),
            timeout: Duration::from_secs(10),
        };
        assert!(err.is_timeout());
        assert!(err.to_string().ends_with("timed out after 10s"));
    }
}
