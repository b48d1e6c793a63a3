//! Business logic services.

#![allow(missing_docs)]

pub mod admission;
pub mod artifact;
pub mod attendance;
pub mod clock;
pub mod lifecycle;
pub mod room_lock;
pub mod session;

pub use admission::{Admission, AdmissionService, DeviceCapabilities, Occupancy};
pub use artifact::{ArtifactService, CreatePollInput, PollResults, WhiteboardSnapshot};
pub use attendance::{
    AttendanceReport, AttendanceService, AttendanceSummary, ParticipantAttendance,
};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use lifecycle::LifecycleAction;
pub use room_lock::{RoomGuard, RoomLocks};
pub use session::{CreateSessionInput, LiveSessionService, UpdateSessionInput};

use liveclass_common::{AppError, AppResult};
use sea_orm::DatabaseTransaction;

/// Commit a unit of work.
pub(crate) async fn commit(txn: DatabaseTransaction) -> AppResult<()> {
    txn.commit()
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}
