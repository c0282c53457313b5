//! Services - session orchestration
//!
//! - `session` - Session state machine: guards, collaborator calls and
//!   location feed handling

pub mod session;

// Re-export commonly used types
pub use session::{Collaborators, SessionCommand, SessionController};
