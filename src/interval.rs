//! Interval parsing
//!
//! Converts interval literals such as `1m`, `30s` or `500ms` into seconds.
//! Units follow the dashboard convention: `ms`, `s`, `m`, `h`, `d`, `w`,
//! `M` (30 days) and `y` (365 days).

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1},
    combinator::{all_consuming, opt, recognize},
    IResult, Parser,
};

use crate::error::{Error, Result};

/// Converts interval literals to seconds
pub trait DurationParser: Send + Sync {
    /// Seconds represented by `literal`
    fn to_seconds(&self, literal: &str) -> Result<f64>;
}

/// Default [`DurationParser`] for `<number><unit>` literals
#[derive(Debug, Clone, Copy, Default)]
pub struct IntervalParser;

impl DurationParser for IntervalParser {
    fn to_seconds(&self, literal: &str) -> Result<f64> {
        interval_to_seconds(literal)
    }
}

/// Seconds represented by an interval literal
pub fn interval_to_seconds(literal: &str) -> Result<f64> {
    let trimmed = literal.trim();

    if trimmed.starts_with('$') || trimmed.starts_with("[[") {
        return Err(Error::InvalidInterval(format!(
            "unresolved template variable '{}'",
            trimmed
        )));
    }

    match all_consuming(parse_interval).parse(trimmed) {
        Ok((_, (amount, unit))) => {
            let amount: f64 = amount
                .parse()
                .map_err(|_| Error::InvalidInterval(literal.to_string()))?;
            Ok(amount * unit_seconds(unit))
        }
        Err(_) => Err(Error::InvalidInterval(format!(
            "'{}', expecting a number followed by one of ms, s, m, h, d, w, M, y",
            literal
        ))),
    }
}

fn parse_interval(input: &str) -> IResult<&str, (&str, &str)> {
    (parse_amount, parse_unit).parse(input)
}

fn parse_amount(input: &str) -> IResult<&str, &str> {
    recognize((digit1, opt((char('.'), digit1)))).parse(input)
}

fn parse_unit(input: &str) -> IResult<&str, &str> {
    // `ms` must be tried before `m`
    alt((
        tag("ms"),
        tag("s"),
        tag("m"),
        tag("h"),
        tag("d"),
        tag("w"),
        tag("M"),
        tag("y"),
    ))
    .parse(input)
}

fn unit_seconds(unit: &str) -> f64 {
    match unit {
        "ms" => 0.001,
        "s" => 1.0,
        "m" => 60.0,
        "h" => 3_600.0,
        "d" => 86_400.0,
        "w" => 604_800.0,
        "M" => 2_592_000.0,
        "y" => 31_536_000.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::TIME_INTERVAL_OPTIONS;

    #[test]
    fn test_basic_units() {
        assert_eq!(interval_to_seconds("1s").unwrap(), 1.0);
        assert_eq!(interval_to_seconds("1m").unwrap(), 60.0);
        assert_eq!(interval_to_seconds("3h").unwrap(), 10_800.0);
        assert_eq!(interval_to_seconds("7d").unwrap(), 604_800.0);
        assert_eq!(interval_to_seconds("1w").unwrap(), 604_800.0);
        assert_eq!(interval_to_seconds("1M").unwrap(), 2_592_000.0);
        assert_eq!(interval_to_seconds("1y").unwrap(), 31_536_000.0);
    }

    #[test]
    fn test_milliseconds_and_fractions() {
        assert_eq!(interval_to_seconds("500ms").unwrap(), 0.5);
        assert_eq!(interval_to_seconds("1.5m").unwrap(), 90.0);
    }

    #[test]
    fn test_every_menu_option_parses() {
        for option in TIME_INTERVAL_OPTIONS.iter().filter(|o| !o.starts_with('$')) {
            assert!(interval_to_seconds(option).is_ok(), "{} should parse", option);
        }
    }

    #[test]
    fn test_unresolved_variable_rejected() {
        let err = interval_to_seconds("$__interval").unwrap_err();
        assert!(err.to_string().contains("$__interval"));
    }

    #[test]
    fn test_garbage_rejected() {
        for literal in ["", "m", "10", "10 minutes", "1m30s", "-1m"] {
            assert!(interval_to_seconds(literal).is_err(), "{:?} should fail", literal);
        }
    }

    #[test]
    fn test_trait_object() {
        let parser: &dyn DurationParser = &IntervalParser;
        assert_eq!(parser.to_seconds(" 10s ").unwrap(), 10.0);
    }
}
