//! Human-friendly date/time parsing into the core's zone-less
//! [`LocalDate`]/[`LocalTime`] values.

use anyhow::{anyhow, Result};
use chrono::Utc;
use chrono_english::{parse_date_string, Dialect};
use reflow_core::models::ConstraintTarget;
use reflow_core::time::{LocalDate, LocalTime};
use uuid::Uuid;

/// Accepts the canonical `YYYY-MM-DD` form first, falling back to
/// `chrono-english` for relative expressions ("tomorrow", "next friday").
pub fn parse_date(input: &str) -> Result<LocalDate> {
    if let Ok(date) = input.parse::<LocalDate>() {
        return Ok(date);
    }
    let parsed = parse_date_string(input, Utc::now(), Dialect::Us)
        .map_err(|e| anyhow!("invalid date '{input}': {e}"))?;
    Ok(LocalDate::from_naive(parsed.date_naive()))
}

/// Accepts `HH:MM:SS`/`HH:MM` first, falling back to common 12-hour forms.
pub fn parse_time(input: &str) -> Result<LocalTime> {
    if let Ok(time) = input.parse::<LocalTime>() {
        return Ok(time);
    }
    for format in ["%I:%M %p", "%I:%M%p", "%I %p", "%I%p"] {
        if let Ok(t) = chrono::NaiveTime::parse_from_str(&input.to_uppercase(), format) {
            return Ok(LocalTime::from_naive(t));
        }
    }
    Err(anyhow!(
        "invalid time '{input}'; use HH:MM, HH:MM:SS, or a 12-hour form like '9:00 AM'"
    ))
}

/// `mon,wed,fri` / `weekdays` / `weekends` / `daily` into 0=Sun..6=Sat labels.
pub fn parse_days_of_week(input: &str) -> Result<std::collections::BTreeSet<u8>> {
    let normalized = input.trim().to_lowercase();
    match normalized.as_str() {
        "weekdays" => return Ok([1, 2, 3, 4, 5].into_iter().collect()),
        "weekends" => return Ok([0, 6].into_iter().collect()),
        "daily" | "everyday" => return Ok((0..=6).collect()),
        _ => {}
    }

    let mut days = std::collections::BTreeSet::new();
    for token in normalized.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let day = match token {
            "sun" | "sunday" => 0,
            "mon" | "monday" => 1,
            "tue" | "tues" | "tuesday" => 2,
            "wed" | "wednesday" => 3,
            "thu" | "thur" | "thursday" => 4,
            "fri" | "friday" => 5,
            "sat" | "saturday" => 6,
            other => return Err(anyhow!("unrecognized day of week: '{other}'")),
        };
        days.insert(day);
    }
    if days.is_empty() {
        return Err(anyhow!("no days of week specified in '{input}'"));
    }
    Ok(days)
}

/// `series:<uuid>` / `tag:<name>`, with a bare UUID defaulting to `series:`.
pub fn parse_constraint_target(input: &str) -> Result<ConstraintTarget> {
    if let Some(rest) = input.strip_prefix("series:") {
        return Ok(ConstraintTarget::Series(
            rest.parse::<Uuid>().map_err(|e| anyhow!("invalid series id '{rest}': {e}"))?,
        ));
    }
    if let Some(rest) = input.strip_prefix("tag:") {
        if rest.is_empty() {
            return Err(anyhow!("tag name cannot be empty"));
        }
        return Ok(ConstraintTarget::Tag(rest.to_string()));
    }
    let id = input
        .parse::<Uuid>()
        .map_err(|_| anyhow!("invalid constraint target '{input}'; use 'series:<uuid>' or 'tag:<name>'"))?;
    Ok(ConstraintTarget::Series(id))
}
