//! Status <-> percentage mapping.
//!
//! Three fixed points: not started is 0, in progress is 50, done is 100.
//! Any percentage strictly between 0 and 100 reads as in progress; the
//! numeric value itself is kept separately on the task.

use crate::types::Status;

pub const NOT_STARTED_PERCENT: i32 = 0;
pub const IN_PROGRESS_PERCENT: i32 = 50;
pub const DONE_PERCENT: i32 = 100;

/// Canonical percentage for a status. `Issue` implies none.
pub fn status_to_progress(status: Status) -> Option<i32> {
    match status {
        Status::NotStarted => Some(NOT_STARTED_PERCENT),
        Status::InProgress => Some(IN_PROGRESS_PERCENT),
        Status::Done => Some(DONE_PERCENT),
        Status::Issue => None,
    }
}

/// Status implied by a percentage. Lossy: everything in (0, 100) is in progress.
pub fn progress_to_status(progress: i32) -> Status {
    match progress {
        p if p <= NOT_STARTED_PERCENT => Status::NotStarted,
        p if p >= DONE_PERCENT => Status::Done,
        _ => Status::InProgress,
    }
}

/// Clamp a raw percentage into 0..=100.
pub fn clamp_progress(progress: i32) -> i32 {
    progress.clamp(NOT_STARTED_PERCENT, DONE_PERCENT)
}

/// Resolve the stored (status, progress) pair of a task after an edit.
///
/// Progress is authoritative: when it is given, the status follows it.
/// An `Issue` status is never overwritten by progress-driven logic, and an
/// explicit status without a progress resets progress to the canonical value.
pub fn resolve_edit(
    current_status: Status,
    current_progress: Option<i32>,
    status: Option<Status>,
    progress: Option<Option<i32>>,
) -> (Status, Option<i32>) {
    let progress = progress.map(|p| p.map(clamp_progress));

    match (status, progress) {
        (Some(Status::Issue), Some(p)) => (Status::Issue, p),
        (Some(Status::Issue), None) => (Status::Issue, current_progress),
        (Some(_), Some(Some(p))) => (progress_to_status(p), Some(p)),
        (Some(s), _) => (s, status_to_progress(s)),
        (None, Some(Some(p))) if current_status == Status::Issue => (Status::Issue, Some(p)),
        (None, Some(Some(p))) => (progress_to_status(p), Some(p)),
        (None, Some(None)) => (current_status, None),
        (None, None) => (current_status, current_progress),
    }
}
