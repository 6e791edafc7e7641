//! Daily goal configuration.

use rust_decimal::Decimal;
use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::foundation::FocusMinutes;
use crate::domain::rewards::DailyGoal;

#[derive(Debug, Clone, Deserialize)]
pub struct DailyGoalConfig {
    /// Minutes per UTC day needed for the award
    #[serde(default = "default_threshold")]
    pub threshold_minutes: Decimal,
}

impl DailyGoalConfig {
    pub fn goal(&self) -> DailyGoal {
        DailyGoal::new(FocusMinutes::new(self.threshold_minutes.round_dp(2)))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.threshold_minutes <= Decimal::ZERO {
            return Err(ValidationError::MustBePositive("daily_goal.threshold_minutes"));
        }
        Ok(())
    }
}

impl Default for DailyGoalConfig {
    fn default() -> Self {
        Self {
            threshold_minutes: default_threshold(),
        }
    }
}

fn default_threshold() -> Decimal {
    Decimal::new(120, 0)
}
