use super::*;
use chrono::{Duration, TimeZone};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn days_ago(days: i64) -> String {
    (now() - Duration::days(days)).to_rfc3339()
}

#[test]
fn test_age_in_months_uses_thirty_day_months() {
    assert_eq!(age_in_months(now(), now()), 0);
    assert_eq!(age_in_months(now(), now() - Duration::days(29)), 0);
    assert_eq!(age_in_months(now(), now() - Duration::days(30)), 1);
    assert_eq!(age_in_months(now(), now() - Duration::days(89)), 2);
    assert_eq!(age_in_months(now(), now() - Duration::days(90)), 3);
    assert_eq!(age_in_months(now(), now() - Duration::days(365)), 12);
}

#[test]
fn test_age_in_months_rounds_down_partial_hours() {
    let just_short = now() - Duration::days(30) + Duration::seconds(1);
    assert_eq!(age_in_months(now(), just_short), 0);
}

#[test]
fn test_age_in_months_future_commit_is_negative() {
    assert_eq!(age_in_months(now(), now() + Duration::days(1)), -1);
}

#[test]
fn test_age_in_months_is_pure() {
    let commit = now() - Duration::days(123);
    let first = age_in_months(now(), commit);
    let second = age_in_months(now(), commit);
    assert_eq!(first, second);
    assert_eq!(first, 4);
}

#[test]
fn test_default_policy() {
    let policy = RetentionPolicy::default();

    assert_eq!(policy.threshold_months(), 3);
    assert!(policy.is_protected("master"));
    assert!(policy.is_protected("staging"));
    assert!(!policy.is_protected("main"));
    assert!(!policy.is_protected("Master"));
    assert_eq!(
        policy.protected_branches().collect::<Vec<_>>(),
        vec!["master", "staging"]
    );
}

#[test]
fn test_evaluate_deletes_at_threshold() {
    let policy = RetentionPolicy::default();

    assert_eq!(
        policy.evaluate(now(), "feature/a", &days_ago(90)),
        RetentionDecision::Delete { age_months: 3 }
    );
    assert_eq!(
        policy.evaluate(now(), "feature/a", &days_ago(89)),
        RetentionDecision::TooRecent { age_months: 2 }
    );
}

#[test]
fn test_evaluate_candidate_iff_age_reaches_threshold() {
    for threshold in 0..6u32 {
        let policy = RetentionPolicy::new(threshold, Vec::new());
        for age in 0..8i64 {
            let decision = policy.evaluate(now(), "topic", &days_ago(age * 30));
            assert_eq!(
                decision.is_delete(),
                age >= i64::from(threshold),
                "age {age} threshold {threshold}"
            );
        }
    }
}

#[test]
fn test_evaluate_protects_master_regardless_of_age() {
    let policy = RetentionPolicy::default();

    assert_eq!(
        policy.evaluate(now(), "master", &days_ago(300)),
        RetentionDecision::Protected
    );
    assert_eq!(
        policy.evaluate(now(), "staging", &days_ago(300)),
        RetentionDecision::Protected
    );
}

#[test]
fn test_evaluate_custom_protected_set() {
    let policy = RetentionPolicy::new(1, vec!["main".to_string(), "release".to_string()]);

    assert_eq!(
        policy.evaluate(now(), "main", &days_ago(400)),
        RetentionDecision::Protected
    );
    assert!(policy.evaluate(now(), "master", &days_ago(400)).is_delete());
}

#[test]
fn test_evaluate_accepts_offset_timestamps() {
    let policy = RetentionPolicy::default();

    let decision = policy.evaluate(now(), "feature/b", "2025-01-01T10:00:00+02:00");
    assert_eq!(decision, RetentionDecision::Delete { age_months: 5 });
}

#[test]
fn test_evaluate_invalid_timestamp() {
    let policy = RetentionPolicy::default();

    let decision = policy.evaluate(now(), "feature/c", "last tuesday");
    assert!(matches!(decision, RetentionDecision::InvalidTimestamp { .. }));
    assert!(!decision.is_delete());

    let decision = policy.evaluate(now(), "feature/c", "");
    assert!(matches!(decision, RetentionDecision::InvalidTimestamp { .. }));
}

#[test]
fn test_protected_check_happens_before_timestamp_parsing() {
    let policy = RetentionPolicy::default();

    assert_eq!(
        policy.evaluate(now(), "master", "not a date"),
        RetentionDecision::Protected
    );
}
