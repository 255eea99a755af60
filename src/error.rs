//! Error types for command handling
//!
//! Every handler returns `Result<(), CommandError>`. The dispatcher logs the
//! error and drops the command; nothing crosses the dispatcher boundary.

use thiserror::Error;

/// Result alias used by command handlers and resolution steps
pub type CommandResult<T = ()> = Result<T, CommandError>;

/// Expected failures while interpreting a command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The command was sent with fewer parameters than it needs
    #[error("{command}: expected at least {expected} parameter(s), got {got}")]
    MissingParameters {
        command: String,
        expected: usize,
        got: usize,
    },

    /// A parameter could not be parsed
    #[error("{command}: invalid parameter '{value}' ({reason})")]
    InvalidParameter {
        command: String,
        value: String,
        reason: String,
    },

    /// No button is mapped to the requested address
    #[error("no button at port {port}, channel {channel}")]
    UnresolvedButton { port: u16, channel: u16 },

    /// Page is neither resident nor in the resource registry
    #[error("page '{0}' not found")]
    PageNotFound(String),

    /// Subpage is neither resident nor in the resource registry
    #[error("subpage '{0}' not found")]
    SubPageNotFound(String),

    /// A subpage was about to be shown without a host page
    #[error("subpage '{0}' has no parent page")]
    NoParentPage(String),

    /// The command needs an active page but none is shown
    #[error("no active page")]
    NoActivePage,

    /// A protected page flip was attempted without a login
    #[error("page flip to '{0}' needs a password")]
    PasswordRequired(String),

    /// No handler is registered for the mnemonic
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// The resource registry failed to deliver a definition
    #[error("resource error: {0}")]
    Resource(String),
}

impl CommandError {
    /// Shorthand for a parameter count error
    pub fn missing(command: &str, expected: usize, got: usize) -> Self {
        CommandError::MissingParameters {
            command: command.to_string(),
            expected,
            got,
        }
    }

    /// Shorthand for a parse error
    pub fn invalid(command: &str, value: &str, reason: impl Into<String>) -> Self {
        CommandError::InvalidParameter {
            command: command.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Internal consistency errors are logged at error level, the rest at warn
    pub fn is_consistency_error(&self) -> bool {
        matches!(self, CommandError::NoParentPage(_) | CommandError::Resource(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CommandError::missing("^TXT", 2, 0);
        assert_eq!(
            err.to_string(),
            "^TXT: expected at least 2 parameter(s), got 0"
        );

        let err = CommandError::UnresolvedButton { port: 1, channel: 42 };
        assert_eq!(err.to_string(), "no button at port 1, channel 42");
        assert!(!err.is_consistency_error());
        assert!(CommandError::NoParentPage("popup".into()).is_consistency_error());
    }
}
