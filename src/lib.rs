//! Avalon Engine - hidden-role game session state machine
//!
//! This library runs sessions of a hidden-role social-deduction game for
//! five to ten players: mission and team progression, role assignment,
//! per-viewer information disclosure, and win-condition evaluation.
//!
//! # Architecture
//!
//! - **Service**: authenticated commands and redacted read projections
//! - **Engine**: the mission state machine, with every phase derived from
//!   session data rather than stored as a tag
//! - **Store**: in-memory versioned session documents with atomic updates
//! - **Oracle / Advisor**: pure per-viewer disclosure and hint functions
//!
//! # Example
//!
//! ```
//! use avalon_engine::GameService;
//!
//! # fn example() -> Result<(), avalon_engine::GameError> {
//! let service = GameService::new();
//! let session_id = service.create_session("arthur", "Camelot".to_string())?;
//! for knight in ["lancelot", "gawain", "percy", "kay"] {
//!     service.join(knight, &session_id)?;
//! }
//! service.start("arthur", &session_id, false, &[])?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod advisor;
mod assignment;
mod engine;
mod error;
mod oracle;
mod roles;
mod service;
mod session;
mod store;

// Crate-level exports - Suggestion advisor
pub use advisor::{Situation, situation, suggest};

// Crate-level exports - Role assignment
pub use assignment::{deal_roles, reset_roles};

// Crate-level exports - Mission engine
pub use engine::{AttemptResult, AttemptSummary, MissionEngine, Phase, Winner};

// Crate-level exports - Errors
pub use error::GameError;

// Crate-level exports - Information oracle
pub use oracle::{Disclosure, disclose, round_status};

// Crate-level exports - Role catalog
pub use roles::{Alignment, GameConfig, Role};

// Crate-level exports - Command service and projections
pub use service::{GameService, PlayerView, SessionSummary, SessionView};

// Crate-level exports - Session data model
pub use session::{
    Approval, GameSession, Message, Mission, Player, PlayerId, SessionId, Team, Vote,
};

// Crate-level exports - Session store
pub use store::{Commit, SessionStore};
