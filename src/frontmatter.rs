//! Front-matter splitting and validation.
//!
//! A post starts with a YAML block between two `---` lines:
//!
//! ```text
//! ---
//! title: Scaling LLM Training
//! description: Notes from a month of FSDP runs
//! date: 2024-03-02
//! lastUpdated: 2024-04-10
//! tags: [ml, infra]
//! ---
//! # Body starts here
//! ```
//!
//! | Field | Type | Required |
//! |---|---|---|
//! | `title` | string | yes |
//! | `description` | string | yes |
//! | `date` | date string | yes |
//! | `lastUpdated` | date string | no |
//! | `archived` | bool | no (false) |
//! | `tags` | list of strings | no (empty) |
//!
//! Unknown keys are ignored. Dates accept RFC 3339 (`2024-03-02T10:00:00Z`),
//! a plain date (`2024-03-02`, midnight UTC), a local date-time without
//! offset (taken as UTC), or a long-form date (`March 2, 2024`).

use crate::types::FrontMatter;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_yaml::{Mapping, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Missing front matter block (file must start with `---`)")]
    MissingFrontMatter,
    #[error("Front matter block is never closed with `---`")]
    Unterminated,
    #[error("Invalid YAML in front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Front matter must be a mapping of keys to values")]
    NotAMapping,
    #[error("Missing required field `{0}`")]
    MissingField(&'static str),
    #[error("Invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Split `source` into its YAML block and the body after it.
pub fn split(source: &str) -> Result<(&str, &str), SchemaError> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let mut lines = source.split_inclusive('\n');
    let opening = lines.next().ok_or(SchemaError::MissingFrontMatter)?;
    if opening.trim_end() != "---" {
        return Err(SchemaError::MissingFrontMatter);
    }

    let yaml_start = opening.len();
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == "---" {
            return Ok((&source[yaml_start..offset], &source[offset + line.len()..]));
        }
        offset += line.len();
    }
    Err(SchemaError::Unterminated)
}

/// Split and validate: returns the typed front matter and the raw body.
pub fn parse(source: &str) -> Result<(FrontMatter, &str), SchemaError> {
    let (yaml, body) = split(source)?;
    let value: Value = serde_yaml::from_str(yaml)?;
    let mapping = match value {
        Value::Mapping(mapping) => mapping,
        Value::Null => Mapping::new(),
        _ => return Err(SchemaError::NotAMapping),
    };
    Ok((validate(&mapping)?, body))
}

fn validate(fields: &Mapping) -> Result<FrontMatter, SchemaError> {
    let date = required_string(fields, "date")?;
    let last_updated = optional_string(fields, "lastUpdated")?;
    Ok(FrontMatter {
        title: required_string(fields, "title")?,
        description: required_string(fields, "description")?,
        date: date_field("date", &date)?,
        last_updated: last_updated
            .map(|value| date_field("lastUpdated", &value))
            .transpose()?,
        archived: match present(fields, "archived") {
            None => false,
            Some(Value::Bool(b)) => *b,
            Some(other) => return Err(invalid("archived", "expected true or false", other)),
        },
        tags: match present(fields, "tags") {
            None => Vec::new(),
            Some(Value::Sequence(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(tag) => Ok(tag.clone()),
                    other => Err(invalid("tags", "expected a list of strings", other)),
                })
                .collect::<Result<_, _>>()?,
            Some(other) => return Err(invalid("tags", "expected a list of strings", other)),
        },
    })
}

/// A key's value, with an explicit `null` treated as absent.
fn present<'a>(fields: &'a Mapping, key: &str) -> Option<&'a Value> {
    fields.get(key).filter(|v| !v.is_null())
}

fn required_string(fields: &Mapping, key: &'static str) -> Result<String, SchemaError> {
    optional_string(fields, key)?.ok_or(SchemaError::MissingField(key))
}

fn optional_string(fields: &Mapping, key: &'static str) -> Result<Option<String>, SchemaError> {
    match present(fields, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(invalid(key, "expected a string", other)),
    }
}

fn invalid(field: &'static str, expected: &str, got: &Value) -> SchemaError {
    let got = serde_yaml::to_string(got).unwrap_or_default();
    SchemaError::InvalidField {
        field,
        reason: format!("{expected}, got `{}`", got.trim()),
    }
}

fn date_field(field: &'static str, value: &str) -> Result<DateTime<Utc>, SchemaError> {
    parse_date(value).ok_or_else(|| SchemaError::InvalidField {
        field,
        reason: format!("`{value}` is not a recognizable date"),
    })
}

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y"];

/// Parse a front-matter date. Values without an offset are taken as UTC.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(naive) = DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    {
        return Some(Utc.from_utc_datetime(&naive));
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    const POST: &str = "---\ntitle: Hello\ndescription: First post\ndate: 2024-01-15\ntags: [rust, web]\n---\n# Hello\n\nBody.\n";

    #[test]
    fn splits_yaml_and_body() {
        let (yaml, body) = split(POST).unwrap();
        assert!(yaml.starts_with("title: Hello\n"));
        assert!(yaml.ends_with("tags: [rust, web]\n"));
        assert_eq!(body, "# Hello\n\nBody.\n");
    }

    #[test]
    fn split_handles_crlf_and_bom() {
        let source = "\u{feff}---\r\ntitle: x\r\n---\r\nbody\r\n";
        let (yaml, body) = split(source).unwrap();
        assert_eq!(yaml, "title: x\r\n");
        assert_eq!(body, "body\r\n");
    }

    #[test]
    fn missing_block_is_error() {
        assert!(matches!(split("# Just a heading\n"), Err(SchemaError::MissingFrontMatter)));
        assert!(matches!(split(""), Err(SchemaError::MissingFrontMatter)));
    }

    #[test]
    fn unterminated_block_is_error() {
        assert!(matches!(split("---\ntitle: x\n"), Err(SchemaError::Unterminated)));
    }

    #[test]
    fn parses_required_and_defaults() {
        let (fm, body) = parse(POST).unwrap();
        assert_eq!(fm.title, "Hello");
        assert_eq!(fm.description, "First post");
        assert_eq!(fm.date, Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
        assert_eq!(fm.last_updated, None);
        assert!(!fm.archived);
        assert_eq!(fm.tags, vec!["rust", "web"]);
        assert_eq!(body, "# Hello\n\nBody.\n");
    }

    #[test]
    fn parses_optional_fields() {
        let source = "---\ntitle: T\ndescription: D\ndate: \"2024-01-15T10:30:00+02:00\"\nlastUpdated: 2024-02-01\narchived: true\n---\n";
        let (fm, _) = parse(source).unwrap();
        assert_eq!(fm.date, Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap());
        assert_eq!(
            fm.last_updated,
            Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap())
        );
        assert!(fm.archived);
        assert!(fm.tags.is_empty());
    }

    #[test]
    fn missing_title_is_schema_error() {
        let err = parse("---\ndescription: D\ndate: 2024-01-15\n---\n").unwrap_err();
        assert!(matches!(err, SchemaError::MissingField("title")));
    }

    #[test]
    fn empty_block_reports_missing_field() {
        let err = parse("---\n---\nbody\n").unwrap_err();
        assert!(matches!(err, SchemaError::MissingField(_)));
    }

    #[test]
    fn unparseable_date_is_schema_error() {
        let err = parse("---\ntitle: T\ndescription: D\ndate: someday\n---\n").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidField { field: "date", .. }));
        assert!(err.to_string().contains("someday"));
    }

    #[test]
    fn wrong_types_are_schema_errors() {
        let err = parse("---\ntitle: T\ndescription: D\ndate: 2024-01-15\narchived: maybe\n---\n")
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidField { field: "archived", .. }));

        let err = parse("---\ntitle: T\ndescription: D\ndate: 2024-01-15\ntags: rust\n---\n")
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidField { field: "tags", .. }));

        let err = parse("---\ntitle: 42\ndescription: D\ndate: 2024-01-15\n---\n").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidField { field: "title", .. }));
    }

    #[test]
    fn invalid_yaml_is_schema_error() {
        let err = parse("---\ntitle: [unclosed\n---\n").unwrap_err();
        assert!(matches!(err, SchemaError::Yaml(_)));
    }

    #[test]
    fn scalar_yaml_is_not_a_mapping() {
        let err = parse("---\njust a string\n---\n").unwrap_err();
        assert!(matches!(err, SchemaError::NotAMapping));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let (fm, _) =
            parse("---\ntitle: T\ndescription: D\ndate: 2024-01-15\nauthor: me\n---\n").unwrap();
        assert_eq!(fm.title, "T");
    }

    #[test]
    fn date_formats() {
        let midnight = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
        assert_eq!(parse_date("2024-03-02"), Some(midnight));
        assert_eq!(parse_date("March 2, 2024"), Some(midnight));
        assert_eq!(parse_date("Mar 2, 2024"), Some(midnight));
        assert_eq!(
            parse_date("2024-03-02 14:05:00"),
            Some(Utc.with_ymd_and_hms(2024, 3, 2, 14, 5, 0).unwrap())
        );
        assert_eq!(
            parse_date("2024-03-02T14:05:00Z"),
            Some(Utc.with_ymd_and_hms(2024, 3, 2, 14, 5, 0).unwrap())
        );
        assert_eq!(parse_date("2024-13-45"), None);
        assert_eq!(parse_date(""), None);
    }
}
