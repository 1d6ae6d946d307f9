// Schedule resolution for recurring jobs
//
// Given a recurrence rule and a reference instant, compute the earliest
// instant strictly after the reference that satisfies the rule. Pure and
// deterministic so chains can be tested without a clock.

use crate::errors::ScheduleError;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use cron::Schedule as CronSchedule;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Recurrence rule for a scheduled job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recurrence {
    /// Quartz-style cron expression with second precision, evaluated in
    /// the given timezone
    Cron { expression: String, timezone: Tz },
    /// Fixed cadence measured from the previous scheduled fire date
    Every { interval_seconds: u32 },
}

impl Recurrence {
    /// Cron rule evaluated in UTC
    pub fn cron(expression: impl Into<String>) -> Self {
        Self::Cron {
            expression: expression.into(),
            timezone: chrono_tz::UTC,
        }
    }

    pub fn every_seconds(interval_seconds: u32) -> Self {
        Self::Every { interval_seconds }
    }

    /// Resolve the next fire instant strictly after `reference`.
    ///
    /// `Err(Unsatisfiable)` means the rule can never fire again; callers
    /// treat the job as permanently disabled rather than crashing.
    pub fn resolve_next(&self, reference: DateTime<Utc>) -> Result<DateTime<Utc>, ScheduleError> {
        match self {
            Recurrence::Cron {
                expression,
                timezone,
            } => {
                let schedule = parse_cron_expression(expression)?;
                let reference_in_tz = reference.with_timezone(timezone);
                let next_in_tz = schedule
                    .after(&reference_in_tz)
                    .next()
                    .ok_or(ScheduleError::Unsatisfiable)?;
                Ok(next_in_tz.with_timezone(&Utc))
            }

            Recurrence::Every { interval_seconds } => {
                if *interval_seconds == 0 {
                    return Err(ScheduleError::InvalidConfiguration(
                        "interval_seconds must be greater than 0".to_string(),
                    ));
                }
                Ok(reference + Duration::seconds(i64::from(*interval_seconds)))
            }
        }
    }
}

/// Parse and validate a cron expression
pub fn parse_cron_expression(expression: &str) -> Result<CronSchedule, ScheduleError> {
    CronSchedule::from_str(expression).map_err(|e| ScheduleError::InvalidCronExpression {
        expression: expression.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_parse_valid_cron_expression() {
        assert!(parse_cron_expression("0 0 12 * * * *").is_ok());
    }

    #[test]
    fn test_parse_invalid_cron_expression() {
        assert!(parse_cron_expression("invalid").is_err());
    }

    #[test]
    fn test_every_is_reference_plus_interval() {
        let rule = Recurrence::every_seconds(60);
        let next = rule.resolve_next(reference()).unwrap();
        assert_eq!(next, reference() + Duration::seconds(60));
    }

    #[test]
    fn test_every_zero_interval_rejected() {
        let rule = Recurrence::every_seconds(0);
        assert!(matches!(
            rule.resolve_next(reference()),
            Err(ScheduleError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_cron_next_is_strictly_after_reference() {
        let rule = Recurrence::cron("0 * * * * * *");
        let next = rule.resolve_next(reference()).unwrap();
        assert!(next > reference());
    }

    #[test]
    fn test_cron_resolution_is_deterministic() {
        let rule = Recurrence::cron("0 30 9 * * * *");
        let first = rule.resolve_next(reference()).unwrap();
        let second = rule.resolve_next(reference()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_cron_invalid_expression_surfaces_as_schedule_error() {
        let rule = Recurrence::cron("not a cron rule");
        assert!(matches!(
            rule.resolve_next(reference()),
            Err(ScheduleError::InvalidCronExpression { .. })
        ));
    }

    #[test]
    fn test_cron_respects_timezone() {
        // 09:30 in Saigon is 02:30 UTC
        let rule = Recurrence::Cron {
            expression: "0 30 9 * * * *".to_string(),
            timezone: chrono_tz::Asia::Ho_Chi_Minh,
        };
        let next = rule.resolve_next(reference()).unwrap();
        assert_eq!(next.format("%H:%M").to_string(), "02:30");
    }

    #[test]
    fn test_chained_resolution_steps_forward() {
        let rule = Recurrence::every_seconds(300);
        let first = rule.resolve_next(reference()).unwrap();
        let second = rule.resolve_next(first).unwrap();
        assert_eq!(second - first, Duration::seconds(300));
    }
}
