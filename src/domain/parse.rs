//! Parsing of textual rate limit expressions.
//!
//! The grammar is deliberately small:
//!
//! ```text
//! limit       := amount ( "/" | "per" ) [ multiples ] granularity
//! amount      := positive integer
//! multiples   := positive integer (default 1)
//! granularity := second | minute | hour | day | month | year (also plural)
//! ```
//!
//! Matching is case-insensitive and whitespace-tolerant, so `10/minute`,
//! `10 per minute`, `10 per 1 minute` and `10/1 minute` all parse to the
//! same limit. Anything else is a malformed-expression error; no guessing.

use crate::domain::limit::RateLimit;
use crate::error::{LimiterError, Result};

/// Parse a single rate limit expression.
///
/// # Examples
///
/// ```
/// use rate_limits::parse;
///
/// let limit = parse("5 per 3 seconds").unwrap();
/// assert_eq!(limit.amount(), 5);
/// assert_eq!(limit.window_seconds(), 3);
/// ```
///
/// # Errors
/// Returns [`LimiterError::MalformedExpression`] carrying the offending
/// text when the input does not match the grammar.
pub fn parse(text: &str) -> Result<RateLimit> {
    let malformed = || LimiterError::MalformedExpression(text.to_string());
    let lowered = text.trim().to_ascii_lowercase();

    let (amount_part, rest) = if let Some(index) = lowered.find('/') {
        (&lowered[..index], &lowered[index + 1..])
    } else if let Some(index) = lowered.find(" per ") {
        (&lowered[..index], &lowered[index + 5..])
    } else {
        return Err(malformed());
    };

    let amount: u64 = amount_part.trim().parse().map_err(|_| malformed())?;

    let mut tokens = rest.split_whitespace();
    let first = tokens.next().ok_or_else(malformed)?;

    let (multiples, granularity_token) = match first.parse::<u64>() {
        Ok(multiples) => (multiples, tokens.next().ok_or_else(malformed)?),
        Err(_) => (1, first),
    };

    // Trailing garbage is an error, not ignored.
    if tokens.next().is_some() {
        return Err(malformed());
    }

    let granularity = granularity_token
        .parse()
        .map_err(|_| malformed())?;

    RateLimit::new(amount, multiples, granularity).map_err(|_| malformed())
}

/// Parse a delimited list of rate limit expressions.
///
/// Items are separated by `;` or `,`; empty items are rejected.
///
/// # Examples
///
/// ```
/// use rate_limits::parse_many;
///
/// let limits = parse_many("10/minute; 1000/hour").unwrap();
/// assert_eq!(limits.len(), 2);
/// ```
pub fn parse_many(text: &str) -> Result<Vec<RateLimit>> {
    text.split([';', ',']).map(parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::granularity::Granularity;

    #[test]
    fn test_equivalent_spellings() {
        let expected = RateLimit::new(10, 1, Granularity::Minute).unwrap();

        for text in ["10/minute", "10 per minute", "10 per 1 minute", "10/1 minute"] {
            assert_eq!(parse(text).unwrap(), expected, "parsing {text:?}");
        }
    }

    #[test]
    fn test_multiples() {
        let limit = parse("5 per 3 seconds").unwrap();
        assert_eq!(limit.amount(), 5);
        assert_eq!(limit.multiples(), 3);
        assert_eq!(limit.granularity(), Granularity::Second);
    }

    #[test]
    fn test_case_and_whitespace_tolerance() {
        let expected = RateLimit::new(2, 1, Granularity::Hour).unwrap();
        assert_eq!(parse("  2 PER Hour ").unwrap(), expected);
        assert_eq!(parse("2 / hours").unwrap(), expected);
    }

    #[test]
    fn test_rejects_malformed_input() {
        for text in [
            "",
            "minute",
            "10",
            "10 minute",
            "ten/minute",
            "10/fortnight",
            "10 per per minute",
            "10/1 minute extra",
            "0/minute",
            "10 per 0 minute",
            "-1/minute",
        ] {
            let result = parse(text);
            assert!(
                matches!(result, Err(LimiterError::MalformedExpression(_))),
                "expected malformed error for {text:?}, got {result:?}"
            );
        }
    }

    #[test]
    fn test_malformed_error_carries_original_text() {
        match parse("10 per lightyear") {
            Err(LimiterError::MalformedExpression(text)) => {
                assert_eq!(text, "10 per lightyear");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_parse_many() {
        let limits = parse_many("1/second;10 per minute, 100/hour").unwrap();
        assert_eq!(limits.len(), 3);
        assert_eq!(limits[0], RateLimit::new(1, 1, Granularity::Second).unwrap());
        assert_eq!(limits[1], RateLimit::new(10, 1, Granularity::Minute).unwrap());
        assert_eq!(limits[2], RateLimit::new(100, 1, Granularity::Hour).unwrap());
    }

    #[test]
    fn test_parse_many_rejects_empty_item() {
        assert!(parse_many("10/minute;;1/second").is_err());
        assert!(parse_many("").is_err());
    }
}
