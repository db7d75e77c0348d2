//! Parsing of free-text user input.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use lanseat_db::EVENT_DATE_FORMAT;
use regex::Regex;

use crate::error::ApiError;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("email regex is valid")
});

static MENTION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<(?:@&|#|@!?)(\d+)>$").expect("mention regex is valid"));

pub fn is_valid_email(input: &str) -> bool {
    input.len() <= 254 && EMAIL_REGEX.is_match(input)
}

/// Comma-separated seat preferences. Entries that are not positive numbers
/// or exceed `total_seats` are dropped; duplicates keep their first position.
pub fn parse_seat_list(input: &str, total_seats: u32) -> Vec<u32> {
    let mut seats = Vec::new();
    for part in input.split(',') {
        if let Ok(seat) = part.trim().parse::<u32>() {
            if (1..=total_seats).contains(&seat) && !seats.contains(&seat) {
                seats.push(seat);
            }
        }
    }
    seats
}

/// `YYYY-MM-DD HH:mm`, as admins type event dates.
pub fn parse_event_date(input: &str, option: &str) -> Result<NaiveDateTime, ApiError> {
    NaiveDateTime::parse_from_str(input.trim(), EVENT_DATE_FORMAT).map_err(|_| {
        ApiError::Validation(format!(
            "Invalid `{}` format. Please use `YYYY-MM-DD HH:mm`.",
            option
        ))
    })
}

/// Raw id or a `<@&role>` / `<#channel>` / `<@user>` mention.
pub fn parse_id(input: &str) -> Option<String> {
    let input = input.trim();
    if !input.is_empty() && input.chars().all(|c| c.is_ascii_digit()) {
        return Some(input.to_string());
    }
    MENTION_REGEX
        .captures(input)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
