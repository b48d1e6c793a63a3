//! Database repositories.

pub mod live_session;
pub mod session_interval;
pub mod session_poll;

pub use live_session::LiveSessionRepository;
pub use session_interval::SessionIntervalRepository;
pub use session_poll::{PollResponseRepository, SessionPollRepository};
