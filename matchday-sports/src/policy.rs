//! TTL policy for fixtures and request validation.

use std::time::Duration;

use chrono::NaiveDate;
use serde_json::Value;

use matchday_core::constants::{FINISHED_FIXTURES_TTL, FINISHED_STATUSES, LIVE_FIXTURES_TTL};
use matchday_core::error::{MatchdayError, Result};

/// Parses a strict `YYYY-MM-DD` match date.
pub fn parse_match_date(date: &str) -> Result<NaiveDate> {
    let bytes = date.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !well_formed {
        return Err(MatchdayError::ValidationError(format!(
            "Invalid date '{}', expected YYYY-MM-DD",
            date
        )));
    }

    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| MatchdayError::ValidationError(format!("Invalid date '{}': {}", date, e)))
}

/// Short status code of one fixture, e.g. `"FT"` or `"NS"`.
fn status_of(fixture: &Value) -> Option<&str> {
    fixture.pointer("/fixture/status/short")?.as_str()
}

/// True when the payload is a non-empty list of fixtures that are all over.
pub fn all_finished(fixtures: &Value) -> bool {
    match fixtures.as_array() {
        Some(list) if !list.is_empty() => list
            .iter()
            .all(|f| status_of(f).is_some_and(|s| FINISHED_STATUSES.contains(&s))),
        _ => false,
    }
}

/// TTL for the fixtures of `date`, given the current day.
///
/// Days in the past and days where every fixture is finished are cached for a
/// day. Anything else may still change and gets the live TTL.
pub fn fixtures_by_date_ttl(date: NaiveDate, today: NaiveDate, fixtures: &Value) -> Duration {
    if date < today || all_finished(fixtures) {
        FINISHED_FIXTURES_TTL
    } else {
        LIVE_FIXTURES_TTL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn fixture(status: &str) -> Value {
        json!({"fixture": {"id": 1, "status": {"short": status}}})
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test_case("2024-05-19" ; "plain")]
    #[test_case("2000-02-29" ; "leap day")]
    fn test_valid_dates(date: &str) {
        assert!(parse_match_date(date).is_ok());
    }

    #[test_case("" ; "empty")]
    #[test_case("2024-5-19" ; "short month")]
    #[test_case("2024/05/19" ; "slashes")]
    #[test_case("2024-05-19T00:00" ; "with time")]
    #[test_case("2024-13-01" ; "month out of range")]
    #[test_case("2023-02-29" ; "not a leap year")]
    #[test_case("+024-05-19" ; "sign in year")]
    fn test_invalid_dates(date: &str) {
        assert!(matches!(
            parse_match_date(date),
            Err(MatchdayError::ValidationError(_))
        ));
    }

    #[test]
    fn test_all_finished() {
        assert!(all_finished(&json!([fixture("FT"), fixture("PEN"), fixture("CANC")])));
        assert!(!all_finished(&json!([fixture("FT"), fixture("2H")])));
        assert!(!all_finished(&json!([])));
        assert!(!all_finished(&json!([{"fixture": {"id": 2}}])));
        assert!(!all_finished(&json!({"fixture": {}})));
    }

    #[test_case("2024-05-18", json!([fixture("NS")]), FINISHED_FIXTURES_TTL ; "past day")]
    #[test_case("2024-05-19", json!([fixture("FT")]), FINISHED_FIXTURES_TTL ; "today all finished")]
    #[test_case("2024-05-19", json!([fixture("FT"), fixture("1H")]), LIVE_FIXTURES_TTL ; "today in play")]
    #[test_case("2024-05-20", json!([]), LIVE_FIXTURES_TTL ; "future empty")]
    fn test_fixtures_by_date_ttl(date: &str, fixtures: Value, expected: Duration) {
        assert_eq!(fixtures_by_date_ttl(day(date), day("2024-05-19"), &fixtures), expected);
    }
}
