//! Attendance aggregation.
//!
//! Attendance is always computed from the interval log. The counters kept on
//! the session row during admission (`total_participants`,
//! `peak_concurrent_users`) are independent signals; [`cross_check`]
//! compares the two and logs any disagreement.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use liveclass_common::{AppError, AppResult};
use liveclass_db::{
    entities::{live_session, live_session::SessionStatus, session_interval},
    repositories::{LiveSessionRepository, SessionIntervalRepository},
};
use serde::Serialize;

/// Attendance of one participant over the whole session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantAttendance {
    pub participant_id: String,
    /// Sum of all interval lengths.
    pub attended_ms: i64,
    /// `attended_ms` as a share of the session length.
    pub attendance_percent: f64,
    pub interval_count: usize,
    /// Met the session's attendance threshold.
    pub attended: bool,
}

/// Everything derived from an interval log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub session_duration_ms: i64,
    /// One entry per participant who joined at least once, ordered by id.
    pub participants: Vec<ParticipantAttendance>,
    pub distinct_participants: i64,
    pub peak_concurrent: i64,
    pub attended_count: i64,
    /// Mean over everyone who joined; `None` when nobody did.
    pub average_attendance_ms: Option<i64>,
}

/// Attendance report for a completed session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReport {
    pub session_id: String,
    pub actual_start: DateTime<Utc>,
    pub actual_end: DateTime<Utc>,
    pub attendance_threshold_percent: i32,
    pub total_participants: i64,
    pub peak_concurrent_users: i64,
    pub average_attendance_ms: Option<i64>,
    pub attended_count: i64,
    pub participants: Vec<ParticipantAttendance>,
}

#[derive(Debug, Clone, Copy)]
struct Span<'a> {
    participant_id: &'a str,
    joined_at: DateTime<Utc>,
    left_at: DateTime<Utc>,
}

fn spans<'a>(
    intervals: &'a [session_interval::Model],
    actual_start: DateTime<Utc>,
    actual_end: DateTime<Utc>,
) -> Vec<Span<'a>> {
    intervals
        .iter()
        .map(|interval| {
            let joined_at = interval.joined_at.with_timezone(&Utc).max(actual_start);
            let left_at = interval
                .left_at
                .map_or(actual_end, |left| left.with_timezone(&Utc))
                .min(actual_end);
            Span {
                participant_id: interval.participant_id.as_str(),
                joined_at,
                left_at: left_at.max(joined_at),
            }
        })
        .collect()
}

/// Summarize an interval log for a session that ran from `actual_start` to
/// `actual_end`.
///
/// Intervals still open are treated as closed at `actual_end`. A participant
/// counts as attended when
/// `attended_ms / session_duration_ms * 100 >= threshold_percent`.
#[must_use]
pub fn summarize(
    intervals: &[session_interval::Model],
    actual_start: DateTime<Utc>,
    actual_end: DateTime<Utc>,
    threshold_percent: i32,
) -> AttendanceSummary {
    let session_duration_ms = (actual_end - actual_start).num_milliseconds().max(0);
    let spans = spans(intervals, actual_start, actual_end);

    let mut per_participant: BTreeMap<&str, (i64, usize)> = BTreeMap::new();
    for span in &spans {
        let entry = per_participant.entry(span.participant_id).or_default();
        entry.0 += (span.left_at - span.joined_at).num_milliseconds();
        entry.1 += 1;
    }

    let threshold = i64::from(threshold_percent);
    let participants: Vec<ParticipantAttendance> = per_participant
        .into_iter()
        .map(|(participant_id, (attended_ms, interval_count))| {
            let attendance_percent = if session_duration_ms > 0 {
                attended_ms as f64 / session_duration_ms as f64 * 100.0
            } else {
                0.0
            };
            ParticipantAttendance {
                participant_id: participant_id.to_string(),
                attended_ms,
                attendance_percent,
                interval_count,
                // Integer comparison so 50% of 60 min is exactly 30 min.
                attended: attended_ms * 100 >= threshold * session_duration_ms,
            }
        })
        .collect();

    let distinct_participants = participants.len() as i64;
    let attended_count = participants.iter().filter(|p| p.attended).count() as i64;
    let average_attendance_ms = if participants.is_empty() {
        None
    } else {
        let total: i64 = participants.iter().map(|p| p.attended_ms).sum();
        Some(total / distinct_participants)
    };

    AttendanceSummary {
        session_duration_ms,
        participants,
        distinct_participants,
        peak_concurrent: peak_concurrency(&spans),
        attended_count,
        average_attendance_ms,
    }
}

/// Highest number of distinct participants present at once.
///
/// At equal timestamps, leaves of non-empty intervals are applied before
/// joins, and zero-length intervals are counted as present for their instant.
fn peak_concurrency(spans: &[Span<'_>]) -> i64 {
    const LEAVE: u8 = 0;
    const JOIN: u8 = 1;
    const INSTANT_LEAVE: u8 = 2;

    let mut events: Vec<(DateTime<Utc>, u8, &str)> = Vec::with_capacity(spans.len() * 2);
    for span in spans {
        events.push((span.joined_at, JOIN, span.participant_id));
        let rank = if span.left_at == span.joined_at {
            INSTANT_LEAVE
        } else {
            LEAVE
        };
        events.push((span.left_at, rank, span.participant_id));
    }
    events.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut open: HashMap<&str, u32> = HashMap::new();
    let mut present = 0_i64;
    let mut peak = 0_i64;
    for (_, rank, participant_id) in events {
        let count = open.entry(participant_id).or_default();
        if rank == JOIN {
            if *count == 0 {
                present += 1;
            }
            *count += 1;
            peak = peak.max(present);
        } else if *count > 0 {
            *count -= 1;
            if *count == 0 {
                present -= 1;
            }
        }
    }
    peak
}

/// Compare the incrementally maintained counters against the log.
///
/// Returns `true` when both agree.
pub fn cross_check(session: &live_session::Model, summary: &AttendanceSummary) -> bool {
    let mut consistent = true;

    if session.total_participants != summary.distinct_participants {
        tracing::warn!(
            session_id = %session.id,
            counter = session.total_participants,
            derived = summary.distinct_participants,
            "total_participants disagrees with interval log"
        );
        consistent = false;
    }

    if session.peak_concurrent_users != summary.peak_concurrent {
        tracing::warn!(
            session_id = %session.id,
            counter = session.peak_concurrent_users,
            derived = summary.peak_concurrent,
            "peak_concurrent_users disagrees with interval log"
        );
        consistent = false;
    }

    consistent
}

/// Read side of attendance.
#[derive(Clone)]
pub struct AttendanceService {
    session_repo: LiveSessionRepository,
    interval_repo: SessionIntervalRepository,
}

impl AttendanceService {
    /// Create a new attendance service.
    #[must_use]
    pub const fn new(
        session_repo: LiveSessionRepository,
        interval_repo: SessionIntervalRepository,
    ) -> Self {
        Self {
            session_repo,
            interval_repo,
        }
    }

    /// Per-participant attendance for a completed session.
    pub async fn get_attendance(&self, session_id: &str) -> AppResult<AttendanceReport> {
        let session = self.session_repo.get_by_id(session_id).await?;
        if session.status != SessionStatus::Completed {
            return Err(AppError::Conflict(format!(
                "attendance is only available for completed sessions; {session_id} is {}",
                session.status
            )));
        }

        let (Some(actual_start), Some(actual_end)) = (session.actual_start, session.actual_end)
        else {
            return Err(AppError::Internal(format!(
                "completed session {session_id} is missing actual timestamps"
            )));
        };
        let actual_start = actual_start.with_timezone(&Utc);
        let actual_end = actual_end.with_timezone(&Utc);

        let intervals = self.interval_repo.find_by_session(session_id).await?;
        let summary = summarize(
            &intervals,
            actual_start,
            actual_end,
            session.attendance_threshold_percent,
        );

        Ok(AttendanceReport {
            session_id: session.id,
            actual_start,
            actual_end,
            attendance_threshold_percent: session.attendance_threshold_percent,
            total_participants: session.total_participants,
            peak_concurrent_users: session.peak_concurrent_users,
            average_attendance_ms: session.average_attendance_ms,
            attended_count: session.attended_count.unwrap_or(summary.attended_count),
            participants: summary.participants,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn interval(
        id: &str,
        participant_id: &str,
        joined_min: i64,
        left_min: Option<i64>,
    ) -> session_interval::Model {
        session_interval::Model {
            id: id.to_string(),
            session_id: "s1".to_string(),
            participant_id: participant_id.to_string(),
            joined_at: (t0() + Duration::minutes(joined_min)).into(),
            left_at: left_min.map(|m| (t0() + Duration::minutes(m)).into()),
        }
    }

    #[test]
    fn test_threshold_and_average() {
        let intervals = vec![
            interval("i1", "a", 0, Some(50)),
            interval("i2", "b", 40, Some(45)),
        ];
        let summary = summarize(&intervals, t0(), t0() + Duration::minutes(60), 50);

        assert_eq!(summary.distinct_participants, 2);
        assert_eq!(summary.peak_concurrent, 2);
        assert_eq!(summary.attended_count, 1);
        assert!(summary.participants[0].attended);
        assert!(!summary.participants[1].attended);
        // mean(50 min, 5 min) = 27.5 min
        assert_eq!(summary.average_attendance_ms, Some(1_650_000));
    }

    #[test]
    fn test_multiple_intervals_are_summed() {
        let intervals = vec![
            interval("i1", "a", 0, Some(10)),
            interval("i2", "a", 20, Some(40)),
        ];
        let summary = summarize(&intervals, t0(), t0() + Duration::minutes(60), 50);

        let a = &summary.participants[0];
        assert_eq!(a.attended_ms, 30 * 60_000);
        assert_eq!(a.interval_count, 2);
        assert!(a.attended);
        assert_eq!(summary.peak_concurrent, 1);
    }

    #[test]
    fn test_open_intervals_close_at_end() {
        let intervals = vec![interval("i1", "a", 30, None)];
        let summary = summarize(&intervals, t0(), t0() + Duration::minutes(60), 60);

        assert_eq!(summary.participants[0].attended_ms, 30 * 60_000);
        assert!(!summary.participants[0].attended);
    }

    #[test]
    fn test_nobody_joined() {
        let summary = summarize(&[], t0(), t0() + Duration::minutes(60), 50);
        assert!(summary.participants.is_empty());
        assert_eq!(summary.average_attendance_ms, None);
        assert_eq!(summary.peak_concurrent, 0);
        assert_eq!(summary.attended_count, 0);
    }

    #[test]
    fn test_zero_threshold_counts_every_joiner() {
        let intervals = vec![interval("i1", "a", 10, Some(10))];
        let summary = summarize(&intervals, t0(), t0() + Duration::minutes(60), 0);
        assert_eq!(summary.attended_count, 1);
        assert_eq!(summary.peak_concurrent, 1);
    }

    #[test]
    fn test_handover_at_same_instant_is_not_overlap() {
        // b joins exactly when a leaves
        let intervals = vec![
            interval("i1", "a", 0, Some(30)),
            interval("i2", "b", 30, Some(60)),
        ];
        let summary = summarize(&intervals, t0(), t0() + Duration::minutes(60), 50);
        assert_eq!(summary.peak_concurrent, 1);
    }

    #[test]
    fn test_reconnect_does_not_double_count() {
        let intervals = vec![
            interval("i1", "a", 0, Some(0)),
            interval("i2", "a", 0, Some(20)),
            interval("i3", "b", 10, Some(30)),
        ];
        let summary = summarize(&intervals, t0(), t0() + Duration::minutes(60), 50);
        assert_eq!(summary.distinct_participants, 2);
        assert_eq!(summary.peak_concurrent, 2);
    }

    #[test]
    fn test_cross_check_flags_mismatch() {
        let intervals = vec![interval("i1", "a", 0, Some(50))];
        let summary = summarize(&intervals, t0(), t0() + Duration::minutes(60), 50);

        let mut session = session_fixture();
        session.total_participants = 1;
        session.peak_concurrent_users = 1;
        assert!(cross_check(&session, &summary));

        session.peak_concurrent_users = 3;
        assert!(!cross_check(&session, &summary));
    }

    fn session_fixture() -> live_session::Model {
        live_session::Model {
            id: "s1".to_string(),
            room_id: "room_a".to_string(),
            organizer_id: "tutor1".to_string(),
            course_id: None,
            title: "Algebra I".to_string(),
            description: None,
            status: SessionStatus::Completed,
            scheduled_start: t0().into(),
            scheduled_end: (t0() + Duration::hours(1)).into(),
            actual_start: Some(t0().into()),
            actual_end: Some((t0() + Duration::hours(1)).into()),
            max_participants: 10,
            camera_required: false,
            microphone_required: false,
            allow_late_join: true,
            attendance_threshold_percent: 50,
            total_participants: 0,
            peak_concurrent_users: 0,
            average_attendance_ms: None,
            attended_count: None,
            total_messages: 0,
            polls_created: 0,
            whiteboard_snapshot: None,
            whiteboard_updated_at: None,
            created_at: t0().into(),
            updated_at: None,
        }
    }
}
