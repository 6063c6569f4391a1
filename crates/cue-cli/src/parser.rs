use anyhow::Result;
use chrono::{Local, NaiveDate, NaiveTime};
use chrono_english::{parse_date_string, Dialect};

use crate::error::CliError;

/// ISO dates first, then natural language ("tomorrow", "next friday").
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d") {
        return Ok(date);
    }
    parse_date_string(input, Local::now(), Dialect::Uk)
        .map(|dt| dt.date_naive())
        .map_err(|e| CliError::parse("date", input, e).into())
}

pub fn parse_time(input: &str) -> Result<NaiveTime> {
    let trimmed = input.trim();
    ["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| CliError::parse("time", input, "expected HH:MM").into())
}

/// Parses a signed time delta into minutes: `90`, `+30m`, `-1h`, `1h15m`.
pub fn parse_delta(input: &str) -> Result<i64> {
    let trimmed = input.trim();
    let (sign, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    if body.is_empty() {
        return Err(CliError::parse("delta", input, "no amount given").into());
    }
    if let Ok(minutes) = body.parse::<i64>() {
        return Ok(sign * minutes);
    }

    let mut total = 0i64;
    let mut digits = String::new();
    for c in body.chars() {
        match c {
            '0'..='9' => digits.push(c),
            'h' | 'm' if !digits.is_empty() => {
                let value: i64 = digits
                    .parse()
                    .map_err(|e| CliError::parse("delta", input, e))?;
                total += if c == 'h' { value * 60 } else { value };
                digits.clear();
            }
            _ => return Err(CliError::parse("delta", input, "use forms like 30m, 1h or 1h15m").into()),
        }
    }
    if !digits.is_empty() {
        return Err(CliError::parse("delta", input, "missing unit after the last number").into());
    }
    Ok(sign * total)
}
