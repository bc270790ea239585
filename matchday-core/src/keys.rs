//! Cache-key conventions.
//!
//! A key is a resource name followed by its selector parameters. Every
//! component that reads or invalidates a resource builds the key here, so a
//! writer clearing `posts_all` hits the same entry the reader filled.

/// Default selector for live fixtures.
pub const LIVE_ALL: &str = "all";

/// Live fixtures, e.g. `fixtures-live-all`.
pub fn fixtures_live(live: &str) -> String {
    format!("fixtures-live-{}", live)
}

/// Fixtures played on a date (`YYYY-MM-DD`).
pub fn fixtures_by_date(date: &str) -> String {
    format!("fixtures-date-{}", date)
}

/// A single fixture with its events and lineups.
pub fn match_detail(fixture_id: &str) -> String {
    format!("match-detail-{}", fixture_id)
}

/// Latest news posts from the content backend.
pub fn news_latest() -> String {
    "news_latest".to_string()
}

/// All posts from the content backend.
pub fn posts_all() -> String {
    "posts_all".to_string()
}

/// A single post.
pub fn post_detail(post_id: &str) -> String {
    format!("post-detail-{}", post_id)
}

/// Known leagues.
pub fn leagues() -> String {
    "leagues".to_string()
}

/// League table for one season.
pub fn standings(league: &str, season: &str) -> String {
    format!("standings-{}-{}", league, season)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(fixtures_live(LIVE_ALL), "fixtures-live-all" ; "live all")]
    #[test_case(fixtures_live("39-140"), "fixtures-live-39-140" ; "live by league ids")]
    #[test_case(fixtures_by_date("2024-05-19"), "fixtures-date-2024-05-19" ; "by date")]
    #[test_case(match_detail("1035037"), "match-detail-1035037" ; "match detail")]
    #[test_case(news_latest(), "news_latest" ; "news latest")]
    #[test_case(posts_all(), "posts_all" ; "posts all")]
    #[test_case(post_detail("42"), "post-detail-42" ; "post detail")]
    #[test_case(leagues(), "leagues" ; "leagues")]
    #[test_case(standings("39", "2022"), "standings-39-2022" ; "standings")]
    fn test_key_format(actual: String, expected: &str) {
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_distinct_selectors_give_distinct_keys() {
        assert_ne!(standings("39", "2022"), standings("39", "2023"));
        assert_ne!(fixtures_by_date("2024-05-19"), fixtures_by_date("2024-05-20"));
    }
}
