//! Common utilities and shared types for liveclass.
//!
//! This crate provides foundational components used across all liveclass crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based identifiers and room ids via [`IdGenerator`]
//! - **Metrics**: Session counters via [`Metrics`]
//!
//! # Example
//!
//! ```no_run
//! use liveclass_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let room_id = id_gen.generate_room_id();
//!     println!("Listening on {}:{} for room {}", config.server.host, config.server.port, room_id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod metrics;

pub use config::{Config, SessionPolicyConfig};
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use metrics::{JoinRejection, Metrics, MetricsSnapshot, get_metrics};
