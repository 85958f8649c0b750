pub mod domain;
pub mod memory;
pub mod ports;
pub mod session;

pub use domain::{EvaluationSession, InvalidationReason, SessionPolicy, SessionStatus};
pub use memory::InMemorySessionStore;
pub use ports::{PortError, PortResult, SessionStore};
pub use session::{SessionError, SessionManager, TAB_SWITCH_VIOLATION};
