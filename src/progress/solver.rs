//! Distribution solver.
//!
//! Given a target percentage and the current split of sibling tasks across
//! the three progress buckets, find the split whose percentage is closest to
//! the target. Ties go to the split needing the fewest changes, then to the
//! first split in enumeration order (done ascending, then in-progress
//! ascending).

use super::mapping::{DONE_PERCENT, IN_PROGRESS_PERCENT};
use crate::types::{Status, Task};
use serde::{Deserialize, Serialize};

/// How tasks with the `issue` status take part in reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuePolicy {
    /// Count issue tasks as not started. They may be reassigned.
    #[default]
    Fold,
    /// Leave issue tasks untouched; their progress is a fixed contribution.
    Exclude,
}

/// One of the three progress buckets, ordered by distance from done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    NotStarted,
    InProgress,
    Done,
}

impl Bucket {
    /// Fill order used by the planner.
    pub const ALL: [Bucket; 3] = [Bucket::NotStarted, Bucket::InProgress, Bucket::Done];

    /// Bucket a status counts toward, or `None` if the task is excluded.
    pub fn of(status: Status, policy: IssuePolicy) -> Option<Bucket> {
        match (status, policy) {
            (Status::NotStarted, _) => Some(Bucket::NotStarted),
            (Status::InProgress, _) => Some(Bucket::InProgress),
            (Status::Done, _) => Some(Bucket::Done),
            (Status::Issue, IssuePolicy::Fold) => Some(Bucket::NotStarted),
            (Status::Issue, IssuePolicy::Exclude) => None,
        }
    }

    pub fn status(self) -> Status {
        match self {
            Bucket::NotStarted => Status::NotStarted,
            Bucket::InProgress => Status::InProgress,
            Bucket::Done => Status::Done,
        }
    }

    fn percent(self) -> i64 {
        match self {
            Bucket::NotStarted => 0,
            Bucket::InProgress => i64::from(IN_PROGRESS_PERCENT),
            Bucket::Done => i64::from(DONE_PERCENT),
        }
    }
}

/// Count of sibling tasks per bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Distribution {
    pub done: usize,
    pub in_progress: usize,
    pub not_started: usize,
}

impl Distribution {
    pub fn new(done: usize, in_progress: usize, not_started: usize) -> Self {
        Self {
            done,
            in_progress,
            not_started,
        }
    }

    /// Count tasks by bucket, skipping tasks the policy excludes.
    pub fn from_tasks<'a, I>(tasks: I, policy: IssuePolicy) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut dist = Self::default();
        for task in tasks {
            if let Some(bucket) = Bucket::of(task.status, policy) {
                *dist.count_mut(bucket) += 1;
            }
        }
        dist
    }

    pub fn total(&self) -> usize {
        self.done + self.in_progress + self.not_started
    }

    pub fn count(&self, bucket: Bucket) -> usize {
        match bucket {
            Bucket::NotStarted => self.not_started,
            Bucket::InProgress => self.in_progress,
            Bucket::Done => self.done,
        }
    }

    pub(crate) fn count_mut(&mut self, bucket: Bucket) -> &mut usize {
        match bucket {
            Bucket::NotStarted => &mut self.not_started,
            Bucket::InProgress => &mut self.in_progress,
            Bucket::Done => &mut self.done,
        }
    }

    /// Sum of canonical percentages over all counted tasks.
    fn points(&self) -> i64 {
        Bucket::ALL
            .iter()
            .map(|b| self.count(*b) as i64 * b.percent())
            .sum()
    }

    /// Sum of absolute per-bucket differences. Each moved task counts twice;
    /// only used to order candidates.
    pub fn change_count(&self, other: &Distribution) -> usize {
        self.done.abs_diff(other.done)
            + self.in_progress.abs_diff(other.in_progress)
            + self.not_started.abs_diff(other.not_started)
    }
}

/// Progress held by tasks the solver may not move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pinned {
    pub points: i64,
    pub count: usize,
}

impl Pinned {
    pub fn none() -> Self {
        Self::default()
    }
}

/// The chosen distribution and what it achieves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub distribution: Distribution,
    /// Rounded percentage the distribution yields.
    pub achieved_percentage: i32,
    /// Whether the rounded achieved value equals the target.
    pub exact: bool,
    pub change_count: usize,
}

/// Find the distribution closest to `target`. Returns `None` when there is
/// nothing to distribute.
pub fn solve(target: i32, current: Distribution, pinned: Pinned) -> Option<Solution> {
    let total = current.total();
    if total == 0 {
        return None;
    }

    // Compare errors on the exact rational value, scaled by the denominator.
    let denom = (total + pinned.count) as i64;
    let target_scaled = i64::from(target) * denom;

    let mut best: Option<(i64, usize, Distribution)> = None;
    for done in 0..=total {
        for in_progress in 0..=(total - done) {
            let candidate = Distribution::new(done, in_progress, total - done - in_progress);
            let error = (pinned.points + candidate.points() - target_scaled).abs();
            let changes = candidate.change_count(&current);

            let better = match best {
                None => true,
                Some((best_error, best_changes, _)) => {
                    (error, changes) < (best_error, best_changes)
                }
            };
            if better {
                best = Some((error, changes, candidate));
            }
        }
    }

    best.map(|(_, change_count, distribution)| {
        let points = pinned.points + distribution.points();
        let achieved_percentage = ((2 * points + denom) / (2 * denom)) as i32;
        Solution {
            distribution,
            achieved_percentage,
            exact: achieved_percentage == target,
            change_count,
        }
    })
}
