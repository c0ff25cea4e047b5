use crate::error::ParseError;
use poolwatch_common::types::{Field, FieldSet, LogRecord, UNKNOWN_POOL};

const POOL_PREFIX: &str = "pool=";
const UPSTREAM_STATUS_PREFIX: &str = "upstream_status=";
const STATUS_PREFIX: &str = "status=";
const REQUEST_PREFIX: &str = "request=";

/// Parses one access-log line of `key=value` tokens.
///
/// * `pool=` sets the pool.
/// * `upstream_status=` sets the status from its first comma-separated hop
///   (`"504, 502"` is logged as `504,` `502`, only `504` counts).
/// * `status=` is used as the status only when no `upstream_status=` token
///   exists.
/// * `request=`, or a quoted `"GET ` / `"POST ` request line, marks the
///   request as present.
///
/// A non-numeric status fails the whole line.
///
/// # Examples
///
/// ```
/// use poolwatch_common::types::Field;
/// use poolwatch_ingest::parse_line;
///
/// let record = parse_line(r#"pool=green upstream_status=502, request="GET / HTTP/1.1""#).unwrap();
/// assert_eq!(record.pool, "green");
/// assert_eq!(record.status, 502);
/// assert!(record.fields_present.contains(Field::Request));
///
/// assert!(parse_line("pool=blue upstream_status=abc").is_err());
/// ```
pub fn parse_line(line: &str) -> Result<LogRecord, ParseError> {
    let mut pool = None;
    let mut upstream_status = None;
    let mut downstream_status = None;
    let mut fields = FieldSet::default();

    for token in line.split_whitespace() {
        if let Some(value) = token.strip_prefix(POOL_PREFIX) {
            let value = unquote(value).split('=').next().unwrap_or_default();
            if !value.is_empty() {
                pool = Some(value);
                fields.insert(Field::Pool);
            }
        } else if let Some(value) = token.strip_prefix(UPSTREAM_STATUS_PREFIX) {
            upstream_status = Some(parse_status("upstream_status", first_hop(value))?);
            fields.insert(Field::UpstreamStatus);
        } else if let Some(value) = token.strip_prefix(STATUS_PREFIX) {
            downstream_status = Some(parse_status("status", unquote(value))?);
        } else if token.starts_with(REQUEST_PREFIX) {
            fields.insert(Field::Request);
        }
    }

    if line.contains("\"GET ") || line.contains("\"POST ") {
        fields.insert(Field::Request);
    }

    Ok(LogRecord {
        pool: pool.unwrap_or(UNKNOWN_POOL).to_string(),
        status: upstream_status.or(downstream_status).unwrap_or(0),
        fields_present: fields,
    })
}

fn unquote(value: &str) -> &str {
    value.trim_matches('"')
}

fn first_hop(value: &str) -> &str {
    unquote(value).split(',').next().unwrap_or_default().trim()
}

/// Stands in for integers outside `u16`; neither a server error nor unreachable.
const OUT_OF_RANGE_STATUS: u16 = u16::MAX;

fn parse_status(token: &'static str, value: &str) -> Result<u16, ParseError> {
    match value.parse::<u16>() {
        Ok(status) => Ok(status),
        Err(_) if is_integer(value) => Ok(OUT_OF_RANGE_STATUS),
        Err(_) => Err(ParseError::InvalidStatus {
            token,
            value: value.to_string(),
        }),
    }
}

fn is_integer(value: &str) -> bool {
    let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_LINE: &str = r#"10.0.0.1 - - [01/May/2024:12:00:00 +0000] "GET /version HTTP/1.1" status=200 pool=blue release=blue-1 upstream_status=200 upstream=10.0.0.5:3000 request_time=0.004"#;

    #[test]
    fn parses_complete_nginx_line() {
        let record = parse_line(FULL_LINE).unwrap();
        assert_eq!(record.pool, "blue");
        assert_eq!(record.status, 200);
        assert!(record.fields_present.is_complete());
    }

    #[test]
    fn takes_first_hop_of_multi_status() {
        let record = parse_line("pool=green upstream_status=504, 502 request=GET").unwrap();
        assert_eq!(record.status, 504);

        let record = parse_line("pool=green upstream_status=503,200").unwrap();
        assert_eq!(record.status, 503);
    }

    #[test]
    fn non_numeric_status_fails_line() {
        let err = parse_line("pool=blue upstream_status=- request=x").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidStatus {
                token: "upstream_status",
                value: "-".into()
            }
        );
        assert!(parse_line("pool=blue upstream_status=abc").is_err());
        assert!(parse_line("pool=blue status=oops").is_err());
    }

    #[test]
    fn out_of_range_numbers_are_accepted_as_ordinary_statuses() {
        for value in ["70000", "-1", "99999999999999999999999"] {
            let record = parse_line(&format!("pool=blue upstream_status={value} request=x")).unwrap();
            assert_eq!(record.status, OUT_OF_RANGE_STATUS, "{value}");
            assert!(!record.is_server_error());
            assert!(!record.is_unreachable());
        }
        assert!(parse_line("pool=blue upstream_status=+ request=x").is_err());
    }

    #[test]
    fn triple_zero_is_unreachable_not_an_error() {
        let record = parse_line("pool=blue upstream_status=000 request=x").unwrap();
        assert_eq!(record.status, 0);
        assert!(record.is_unreachable());
        assert!(record.fields_present.contains(Field::UpstreamStatus));
    }

    #[test]
    fn missing_pool_defaults_to_unknown() {
        let record = parse_line("upstream_status=200 request=x").unwrap();
        assert_eq!(record.pool, "unknown");
        assert!(!record.fields_present.contains(Field::Pool));
        assert_eq!(record.fields_present.missing(), vec![Field::Pool]);
    }

    #[test]
    fn downstream_status_used_only_without_upstream() {
        let record = parse_line("pool=blue status=502 request=x").unwrap();
        assert_eq!(record.status, 502);
        assert!(!record.fields_present.contains(Field::UpstreamStatus));

        let record = parse_line("pool=blue status=502 upstream_status=200").unwrap();
        assert_eq!(record.status, 200);
    }

    #[test]
    fn no_status_tokens_means_zero() {
        let record = parse_line("pool=blue request=x").unwrap();
        assert_eq!(record.status, 0);
    }

    #[test]
    fn request_detected_from_quoted_method() {
        let record = parse_line(r#""POST /login HTTP/1.1" upstream_status=200"#).unwrap();
        assert!(record.fields_present.contains(Field::Request));

        // Unquoted method names are not proof of a request line.
        let record = parse_line("GET upstream_status=200").unwrap();
        assert!(!record.fields_present.contains(Field::Request));
    }

    #[test]
    fn quoted_values_are_unwrapped() {
        let record = parse_line(r#"pool="green" upstream_status="503""#).unwrap();
        assert_eq!(record.pool, "green");
        assert_eq!(record.status, 503);
    }

    #[test]
    fn empty_pool_value_is_ignored() {
        let record = parse_line("pool= upstream_status=200").unwrap();
        assert_eq!(record.pool, "unknown");
        assert!(!record.fields_present.contains(Field::Pool));
    }
}
