//! Daily focus goal policy.
//!
//! Per (user, calendar day) the goal has two states: below threshold and
//! achieved. Achieved is terminal for that day; a later drop of the total
//! (edits, deletions) never moves it back.

use crate::domain::foundation::FocusMinutes;

/// Where a day stands relative to the goal after recomputing its total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalProgress {
    /// Total is under the threshold and nothing was awarded yet.
    BelowThreshold,
    /// Total reached the threshold and no achievement exists: award now.
    ThresholdReached,
    /// An achievement is already recorded for the day.
    AlreadyAchieved,
}

/// The daily goal threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyGoal {
    threshold: FocusMinutes,
}

impl DailyGoal {
    /// 120.00 minutes.
    pub fn default_threshold() -> FocusMinutes {
        FocusMinutes::from_hundredths(12_000)
    }

    pub fn new(threshold: FocusMinutes) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> FocusMinutes {
        self.threshold
    }

    /// Inclusive comparison: exactly the threshold counts.
    pub fn is_reached_by(&self, total: FocusMinutes) -> bool {
        total >= self.threshold
    }

    pub fn evaluate(&self, total: FocusMinutes, already_achieved: bool) -> GoalProgress {
        if already_achieved {
            GoalProgress::AlreadyAchieved
        } else if self.is_reached_by(total) {
            GoalProgress::ThresholdReached
        } else {
            GoalProgress::BelowThreshold
        }
    }
}

impl Default for DailyGoal {
    fn default() -> Self {
        Self::new(Self::default_threshold())
    }
}
