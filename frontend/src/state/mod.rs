pub mod inactivity;
pub mod sequence;
pub mod session;

pub use session::{provide_session, use_session, Session, SessionPhase, SessionStore};
