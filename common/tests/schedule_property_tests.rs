// Property-based tests for schedule resolution

use chrono::{DateTime, Duration, Utc};
use common::schedule::Recurrence;
use proptest::prelude::*;

fn reference_instant() -> impl Strategy<Value = DateTime<Utc>> {
    // 2001-09-09 through 2033-05-18
    (1_000_000_000i64..2_000_000_000i64)
        .prop_map(|secs| DateTime::from_timestamp(secs, 0).unwrap())
}

// For any valid rule and reference instant, the resolved instant is
// strictly after the reference, never equal, never before.
mod strictly_after_reference {
    use super::*;

    proptest! {
        #[test]
        fn every_rule(
            reference in reference_instant(),
            interval in 1u32..=86_400u32,
        ) {
            let rule = Recurrence::every_seconds(interval);
            let next = rule.resolve_next(reference).unwrap();
            prop_assert!(next > reference);
            prop_assert_eq!(next - reference, Duration::seconds(i64::from(interval)));
        }

        #[test]
        fn cron_rule(reference in reference_instant()) {
            // Top of every hour
            let rule = Recurrence::cron("0 0 * * * * *");
            let next = rule.resolve_next(reference).unwrap();
            prop_assert!(next > reference);
        }
    }
}

// Identical inputs always resolve to identical outputs.
mod deterministic_resolution {
    use super::*;

    proptest! {
        #[test]
        fn cron_rule(reference in reference_instant()) {
            let rule = Recurrence::cron("0 15 3 * * * *");
            let first = rule.resolve_next(reference).unwrap();
            let second = rule.resolve_next(reference).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}

// Chained resolution walks forward without ever stalling: resolving from
// the resolved instant gives a strictly later instant again.
mod chains_walk_forward {
    use super::*;

    proptest! {
        #[test]
        fn every_rule(
            reference in reference_instant(),
            interval in 1u32..=3_600u32,
        ) {
            let rule = Recurrence::every_seconds(interval);
            let mut cursor = reference;
            for _ in 0..5 {
                let next = rule.resolve_next(cursor).unwrap();
                prop_assert!(next > cursor);
                cursor = next;
            }
        }
    }
}

mod unsatisfiable_rules {
    use super::*;

    proptest! {
        #[test]
        fn malformed_cron_never_panics(reference in reference_instant()) {
            let rule = Recurrence::cron("definitely not cron");
            prop_assert!(rule.resolve_next(reference).is_err());
        }
    }
}
