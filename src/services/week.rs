// src/services/week.rs

//! Week number resolution for schedule events.
//!
//! Sources are tried in order and the first hit wins:
//!
//! 1. `event.week` (`{number}` object, integer or numeric string)
//! 2. `competitions[0].week`
//! 3. `season.week`, then a purely numeric `season.slug`
//! 4. an estimate from the event date and the season's opening weekday
//! 5. a `Week N` phrase in `name` / `shortName`
//!
//! Nothing found is a legitimate answer.

use chrono::{Datelike, NaiveDate, Weekday};
use serde_json::Value;

use crate::models::SeasonConfig;
use crate::services::json;

pub fn extract_week(event: &Value, season: i32, rules: &SeasonConfig) -> Option<u32> {
    week_field(event.get("week"))
        .or_else(|| week_field(event.pointer("/competitions/0/week")))
        .or_else(|| season_field(event))
        .or_else(|| estimate_from_date(event, season, rules))
        .or_else(|| week_from_text(event))
}

/// UTC calendar date of an ESPN timestamp such as `2023-09-08T00:20Z`.
pub fn parse_event_date(text: &str) -> Option<NaiveDate> {
    let day = text.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// First `weekday` on or after September 1st.
pub fn season_opener(year: i32, weekday: Weekday) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, 9, 1)?;
    let offset = (7 + weekday.num_days_from_monday() - first.weekday().num_days_from_monday()) % 7;
    first.checked_add_days(chrono::Days::new(offset.into()))
}

fn positive(n: i64) -> Option<u32> {
    u32::try_from(n).ok().filter(|w| *w > 0)
}

fn week_field(value: Option<&Value>) -> Option<u32> {
    let value = value?;
    if value.is_object() {
        json::opt_i64(value, "/number").and_then(positive)
    } else {
        json::as_i64(value).and_then(positive)
    }
}

fn season_field(event: &Value) -> Option<u32> {
    json::opt_i64(event, "/season/week")
        .and_then(positive)
        .or_else(|| {
            let slug = json::opt_str(event, "/season/slug")?;
            if slug.chars().all(|c| c.is_ascii_digit()) {
                slug.parse().ok().and_then(positive)
            } else {
                None
            }
        })
}

fn estimate_from_date(event: &Value, season: i32, rules: &SeasonConfig) -> Option<u32> {
    let date = parse_event_date(&json::opt_str(event, "/date")?)?;
    let year = json::opt_i64(event, "/season/year")
        .and_then(|y| i32::try_from(y).ok())
        .unwrap_or(season);
    let opener = season_opener(year, rules.start_weekday()?)?;
    let days = (date - opener).num_days();
    let week = days.div_euclid(7) + 1;
    positive(week).filter(|w| *w <= rules.max_week)
}

fn week_from_text(event: &Value) -> Option<u32> {
    ["/name", "/shortName"].iter().find_map(|pointer| {
        let text = json::opt_str(event, pointer)?;
        let words: Vec<&str> = text.split_whitespace().collect();
        words
            .windows(2)
            .find(|pair| pair[0] == "Week" && pair[1].chars().all(|c| c.is_ascii_digit()))
            .and_then(|pair| pair[1].parse().ok())
            .and_then(positive)
    })
}
