use jiff::civil::Date;

use crate::{
    error::DateParseError,
    models::{DatePrecision, PartialDate},
};

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Parses "August 3, 1994", "August 1994" or "1994", ignoring any trailing
/// parenthetical such as "(United States)".
pub fn parse_partial_date(text: &str) -> Result<PartialDate, DateParseError> {
    let head = text.split('(').next().unwrap_or("").trim();
    let parts: Vec<&str> = head.split_whitespace().collect();

    match parts.as_slice() {
        [] => Err(DateParseError::Empty),
        [month, day, year] => {
            let day = day.trim_end_matches(',');
            build(parse_year(year)?, parse_month(month)?, parse_number(day)?, DatePrecision::Day)
        },
        [month, year] => build(parse_year(year)?, parse_month(month)?, 1, DatePrecision::Month),
        [year] => build(parse_year(year)?, 1, 1, DatePrecision::Year),
        _ => Err(DateParseError::Shape(head.to_string())),
    }
}

fn build(
    year: i16,
    month: i8,
    day: i8,
    precision: DatePrecision,
) -> Result<PartialDate, DateParseError> {
    let date = Date::new(year, month, day).map_err(|e| DateParseError::Range(e.to_string()))?;
    Ok(PartialDate { date, precision })
}

fn parse_month(token: &str) -> Result<i8, DateParseError> {
    let lower = token.trim_end_matches([',', '.']).to_lowercase();
    MONTHS
        .iter()
        .position(|name| *name == lower || (lower.len() == 3 && name.starts_with(lower.as_str())))
        .map(|idx| idx as i8 + 1)
        .ok_or_else(|| DateParseError::Month(token.to_string()))
}

fn parse_year(token: &str) -> Result<i16, DateParseError> {
    if token.len() != 4 {
        return Err(DateParseError::Number(token.to_string()));
    }
    token.parse().map_err(|_| DateParseError::Number(token.to_string()))
}

fn parse_number(token: &str) -> Result<i8, DateParseError> {
    token.parse().map_err(|_| DateParseError::Number(token.to_string()))
}
