//! Error taxonomy for session commands.

use derive_more::{Display, Error};

/// Error raised by a session command.
///
/// Every variant is terminal for the command that raised it: commands either
/// apply in full or reject in full, and a rejected command never leaves
/// partial state behind. `Storage` is the one non-domain variant; it carries
/// store-level failures without masking them behind a domain error.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum GameError {
    /// Caller identity could not be established.
    #[display("Caller is not authenticated")]
    NotAuthenticated,
    /// Caller already belongs to the session.
    #[display("Already joined this session")]
    AlreadyMember,
    /// Caller does not belong to the session.
    #[display("Not a member of this session")]
    NotMember,
    /// Caller is not allowed to perform this command right now.
    #[display("Don't have permission to perform this action")]
    AccessDenied,
    /// The chosen additional roles do not fit the session.
    #[display("Invalid selected additional roles")]
    InvalidRoleSelection,
    /// The proposed team does not match the required shape.
    #[display("Invalid selected mission team members")]
    InvalidTeamSelection,
    /// No session exists under the given id.
    #[display("Session not found")]
    SessionNotFound,
    /// The session store itself failed.
    #[display("Storage error: {reason}")]
    Storage {
        /// What went wrong inside the store.
        reason: String,
    },
}

impl GameError {
    /// Creates a storage error from any displayable cause.
    pub fn storage(reason: impl Into<String>) -> Self {
        Self::Storage {
            reason: reason.into(),
        }
    }
}
