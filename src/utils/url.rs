// src/utils/url.rs

//! URL templates and identifiers for the scrape targets.

use std::sync::LazyLock;

use regex::Regex;

/// `/players/X/Id00.htm` link, capturing the id.
#[allow(clippy::expect_used)]
static PFR_PLAYER_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/players/[A-Z]/([A-Za-z0-9.]+)\.htm").expect("player id regex is valid") // Static pattern
});

/// Feet and inches separated by `-`, `'`, `"` or a space.
#[allow(clippy::expect_used)]
static HEIGHT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\d+)[-'"\s](\d+)"#).expect("height regex is valid") // Static pattern
});

#[allow(clippy::expect_used)]
static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("digits regex is valid"));

/// Team roster page on Pro Football Reference.
///
/// # Examples
/// ```
/// use nfl_fantasy::utils::url::pfr_roster_url;
///
/// assert_eq!(
///     pfr_roster_url("https://www.pro-football-reference.com", "kan", 2023),
///     "https://www.pro-football-reference.com/teams/kan/2023_roster.htm"
/// );
/// ```
pub fn pfr_roster_url(base: &str, pfr_team: &str, season: i32) -> String {
    format!(
        "{}/teams/{}/{}_roster.htm",
        base.trim_end_matches('/'),
        pfr_team.to_lowercase(),
        season
    )
}

/// League-wide season totals page, e.g. `years/2023/passing.htm`.
pub fn pfr_season_stats_url(base: &str, season: i32, page: &str) -> String {
    format!("{}/years/{}/{}.htm", base.trim_end_matches('/'), season, page)
}

/// Absolute URL for a site-relative link.
pub fn absolute(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    url::Url::parse(base)
        .and_then(|b| b.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("{}/{}", base.trim_end_matches('/'), href.trim_start_matches('/')))
}

/// ESPN endpoint below the configured API root.
pub fn espn_endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Extract the player id from a `/players/X/Id00.htm` link.
pub fn extract_pfr_player_id(url: &str) -> Option<String> {
    PFR_PLAYER_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parse `6-2`, `6'2` or `6 2` into inches.
pub fn parse_height_inches(text: &str) -> Option<i64> {
    let caps = HEIGHT.captures(text.trim())?;
    let feet: i64 = caps.get(1)?.as_str().parse().ok()?;
    let inches: i64 = caps.get(2)?.as_str().parse().ok()?;
    Some(feet * 12 + inches)
}

/// First run of digits, e.g. `225 lbs` → 225.
pub fn parse_leading_number(text: &str) -> Option<i64> {
    DIGITS.find(text)?.as_str().parse().ok()
}
