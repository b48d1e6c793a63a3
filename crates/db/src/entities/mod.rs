//! Database entities.

#![allow(missing_docs)]

pub mod live_session;
pub mod poll_response;
pub mod session_interval;
pub mod session_poll;

pub use live_session::Entity as LiveSession;
pub use poll_response::Entity as PollResponse;
pub use session_interval::Entity as SessionInterval;
pub use session_poll::Entity as SessionPoll;
