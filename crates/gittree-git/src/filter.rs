//! Filter engine
//!
//! Validates user-entered [`FilterParams`] and turns them into a
//! [`SourceConfig`]. Also parses and prints the filter prompt's query
//! language:
//!
//! ```text
//! author:alice path:src/ since:2w "fix parser" max:200
//! ```

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use gittree_core::{FilterParams, GitTreeError, Result, SourceConfig};
use regex::Regex;
use tracing::debug;

use crate::validate::{validate_path, validate_range};

fn invalid(msg: impl Into<String>) -> GitTreeError {
    GitTreeError::InvalidFilter(msg.into())
}

pub struct FilterEngine;

impl FilterEngine {
    /// Validate `params` and build the source configuration.
    ///
    /// Relative times are resolved against `now`.
    pub fn build(params: &FilterParams, now: DateTime<Utc>) -> Result<SourceConfig> {
        let author = non_empty(&params.author);
        let message = non_empty(&params.message);
        for pattern in [&author, &message].into_iter().flatten() {
            Regex::new(pattern).map_err(|e| invalid(format!("bad pattern '{}': {}", pattern, e)))?;
        }

        let since = non_empty(&params.since)
            .map(|s| parse_time(&s, now))
            .transpose()?;
        let until = non_empty(&params.until)
            .map(|s| parse_time(&s, now))
            .transpose()?;
        if let (Some(since), Some(until)) = (since, until) {
            if since > until {
                return Err(invalid("'since' is after 'until'"));
            }
        }

        let range = non_empty(&params.range);
        if let Some(range) = &range {
            validate_range(range)?;
        }

        let mut paths = Vec::with_capacity(params.paths.len());
        for path in &params.paths {
            let path = path.trim();
            validate_path(path)?;
            paths.push(path.to_string());
        }
        if params.follow && paths.len() != 1 {
            return Err(invalid("--follow needs exactly one path"));
        }

        let config = SourceConfig {
            author,
            message,
            paths,
            since,
            until,
            range,
            max_commits: params.max_commits.filter(|&n| n > 0),
            follow: params.follow,
        };
        debug!(?config, "built source config");
        Ok(config)
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Parse an absolute date or a relative duration ("2w", "3 days ago").
pub fn parse_time(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }

    parse_relative(input)
        .and_then(|duration| now.checked_sub_signed(duration))
        .ok_or_else(|| invalid(format!("unrecognized time '{}'", input)))
}

/// "2w", "12h", "3 days ago", "1mo" -> duration
fn parse_relative(input: &str) -> Option<Duration> {
    let lowered = input.to_lowercase();
    let text = lowered.trim();
    let text = text.strip_suffix("ago").unwrap_or(text).trim();

    let split = text.find(|c: char| !c.is_ascii_digit())?;
    let (digits, unit) = text.split_at(split);
    let amount: i64 = digits.parse().ok()?;

    match unit.trim() {
        "m" | "min" | "mins" | "minute" | "minutes" => Duration::try_minutes(amount),
        "h" | "hr" | "hrs" | "hour" | "hours" => Duration::try_hours(amount),
        "d" | "day" | "days" => Duration::try_days(amount),
        "w" | "week" | "weeks" => Duration::try_weeks(amount),
        "mo" | "month" | "months" => Duration::try_days(amount.checked_mul(30)?),
        "y" | "year" | "years" => Duration::try_days(amount.checked_mul(365)?),
        _ => None,
    }
}

/// Split a query into words, keeping double-quoted groups together
fn tokenize(query: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut has_token = false;

    for c in query.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                has_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if quoted {
        return Err(invalid("unterminated quote"));
    }
    if has_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Parse the filter prompt's query language into parameters.
///
/// Keys: `author:`/`a:`, `path:`/`p:` (repeatable), `since:`, `until:`,
/// `range:`, `max:`, `msg:`/`grep:`, and the bare word `follow`. Other
/// words form the message pattern. An empty query clears every filter.
pub fn parse_query(query: &str) -> Result<FilterParams> {
    let mut params = FilterParams::default();
    let mut words: Vec<String> = Vec::new();

    for token in tokenize(query)? {
        if token == "follow" {
            params.follow = true;
            continue;
        }
        let Some((key, value)) = token.split_once(':') else {
            words.push(token);
            continue;
        };
        let value = value.to_string();
        match key {
            "author" | "a" => params.author = Some(value),
            "path" | "p" => params.paths.push(value),
            "since" => params.since = Some(value),
            "until" => params.until = Some(value),
            "range" => params.range = Some(value),
            "msg" | "grep" => words.push(value),
            "max" => {
                let n = value
                    .parse::<usize>()
                    .map_err(|_| invalid(format!("max must be a number, got '{}'", value)))?;
                params.max_commits = Some(n);
            }
            _ => words.push(token),
        }
    }

    if !words.is_empty() {
        params.message = Some(words.join(" "));
    }
    Ok(params)
}

/// Print parameters back in query form (used to prefill the prompt)
pub fn to_query(params: &FilterParams) -> String {
    fn quote(value: &str) -> String {
        if value.contains(char::is_whitespace) {
            format!("\"{}\"", value)
        } else {
            value.to_string()
        }
    }

    let mut parts = Vec::new();
    if let Some(author) = &params.author {
        parts.push(format!("author:{}", quote(author)));
    }
    for path in &params.paths {
        parts.push(format!("path:{}", quote(path)));
    }
    if let Some(since) = &params.since {
        parts.push(format!("since:{}", quote(since)));
    }
    if let Some(until) = &params.until {
        parts.push(format!("until:{}", quote(until)));
    }
    if let Some(range) = &params.range {
        parts.push(format!("range:{}", range));
    }
    if let Some(max) = params.max_commits.filter(|&n| n > 0) {
        parts.push(format!("max:{}", max));
    }
    if let Some(message) = &params.message {
        parts.push(format!("msg:{}", quote(message)));
    }
    if params.follow {
        parts.push("follow".to_string());
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_absolute_times() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(parse_time("2024-01-02", now()).unwrap(), expected);
        assert_eq!(
            parse_time("2024-01-02 03:04:05", now()).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
        );
        assert_eq!(
            parse_time("2024-01-02 03:04", now()).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 0).unwrap()
        );
        assert_eq!(
            parse_time("2024-01-02T05:00:00+02:00", now()).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 3, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_relative_times() {
        let now = now();
        assert_eq!(parse_time("2w", now).unwrap(), now - Duration::weeks(2));
        assert_eq!(parse_time("3d", now).unwrap(), now - Duration::days(3));
        assert_eq!(parse_time("12h", now).unwrap(), now - Duration::hours(12));
        assert_eq!(parse_time("30m", now).unwrap(), now - Duration::minutes(30));
        assert_eq!(parse_time("2mo", now).unwrap(), now - Duration::days(60));
        assert_eq!(parse_time("1y", now).unwrap(), now - Duration::days(365));
        assert_eq!(parse_time("3 days ago", now).unwrap(), now - Duration::days(3));
        assert_eq!(parse_time("1 Week Ago", now).unwrap(), now - Duration::weeks(1));
    }

    #[test]
    fn test_invalid_times() {
        for bad in ["yesterday-ish", "2x", "w", "-3d", "2024-13-01", ""] {
            let err = parse_time(bad, now()).unwrap_err();
            assert!(matches!(err, GitTreeError::InvalidFilter(_)), "{:?}", bad);
        }
    }

    #[test]
    fn test_build_validates_everything() {
        let ok = FilterParams {
            author: Some("alice|bob".into()),
            since: Some("2w".into()),
            until: Some("2024-06-14".into()),
            range: Some("main..feature".into()),
            paths: vec![" src/lib.rs ".into()],
            max_commits: Some(0),
            follow: true,
            ..Default::default()
        };
        let config = FilterEngine::build(&ok, now()).unwrap();
        assert_eq!(config.paths, vec!["src/lib.rs"]);
        assert_eq!(config.max_commits, None);
        assert_eq!(config.since, Some(now() - Duration::weeks(2)));

        let cases = [
            FilterParams { author: Some("(".into()), ..Default::default() },
            FilterParams { since: Some("soon".into()), ..Default::default() },
            FilterParams {
                since: Some("2024-06-10".into()),
                until: Some("2024-06-01".into()),
                ..Default::default()
            },
            FilterParams { range: Some("main..--all".into()), ..Default::default() },
            FilterParams { paths: vec!["../x".into()], ..Default::default() },
            FilterParams { follow: true, ..Default::default() },
        ];
        for params in cases {
            let err = FilterEngine::build(&params, now()).unwrap_err();
            assert!(matches!(err, GitTreeError::InvalidFilter(_)), "{:?}", params);
        }
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let params = FilterParams {
            author: Some("  ".into()),
            range: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(FilterEngine::build(&params, now()).unwrap(), SourceConfig::default());
    }

    #[test]
    fn test_parse_query() {
        let params =
            parse_query(r#"a:alice path:src/ p:"docs/my notes" since:2w max:50 fix "the parser" follow"#)
                .unwrap();
        assert_eq!(params.author.as_deref(), Some("alice"));
        assert_eq!(params.paths, vec!["src/", "docs/my notes"]);
        assert_eq!(params.since.as_deref(), Some("2w"));
        assert_eq!(params.max_commits, Some(50));
        assert_eq!(params.message.as_deref(), Some("fix the parser"));
        assert!(params.follow);

        assert_eq!(parse_query("   ").unwrap(), FilterParams::default());
        assert!(parse_query("max:lots").is_err());
        assert!(parse_query("\"open").is_err());
    }

    #[test]
    fn test_query_round_trip() {
        let params = FilterParams {
            author: Some("Jane Doe".into()),
            paths: vec!["src".into()],
            range: Some("v1..v2".into()),
            message: Some("fix".into()),
            max_commits: Some(10),
            ..Default::default()
        };
        let query = to_query(&params);
        assert_eq!(query, "author:\"Jane Doe\" path:src range:v1..v2 max:10 msg:fix");
        assert_eq!(parse_query(&query).unwrap(), params);
    }
}
