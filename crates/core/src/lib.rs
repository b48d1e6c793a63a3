//! Core business logic for liveclass.
//!
//! Services are layered over the repositories in `liveclass-db`:
//!
//! - [`LiveSessionService`]: session record store and lifecycle
//! - [`AdmissionService`]: join/leave and occupancy
//! - [`ArtifactService`]: polls, message counter, whiteboard
//! - [`AttendanceService`]: attendance reports for completed sessions
//!
//! All of them share one [`RoomLocks`] registry so that every mutation of a
//! session is serialized per room.

pub mod services;

pub use services::*;
