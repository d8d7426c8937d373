//! Table-driven field cleaning
//!
//! Each record declares a table of `FieldSpec`s; `clean_fields` walks that table
//! and checks every named field, so adding a rule never needs a new method.

use crate::domain::models::{FieldAccess, FieldValue};
use crate::domain::violations::ValidationErrors;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref URL_PATTERN: Regex = Regex::new(
        r"(?i)^(?:https?|ftps?)://(?:localhost|[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)*\.[a-z]{2,}|\d{1,3}(?:\.\d{1,3}){3})(?::\d{1,5})?(?:[/?#]\S*)?$"
    )
    .expect("URL pattern compiles");
}

/// One check applied to a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCheck {
    /// Value must be present and, for text, non-blank
    Required,
    /// Text must not exceed this many characters
    MaxLength(usize),
    /// Text, when present, must be an absolute URL
    Url,
}

/// The checks for one named field
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub checks: &'static [FieldCheck],
}

/// Run every check of the table against a record
pub fn clean_fields(record: &dyn FieldAccess, specs: &[FieldSpec]) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    for spec in specs {
        let value = record.field_value(spec.name);
        for check in spec.checks {
            if let Some(message) = run_check(*check, value.as_ref()) {
                errors.add(spec.name, message);
                // Later checks on a missing value would only repeat the problem
                if matches!(check, FieldCheck::Required) {
                    break;
                }
            }
        }
    }

    errors
}

fn run_check(check: FieldCheck, value: Option<&FieldValue<'_>>) -> Option<String> {
    match check {
        FieldCheck::Required => {
            let present = match value {
                Some(FieldValue::Text(Some(text))) => !text.trim().is_empty(),
                Some(FieldValue::Date(date)) => date.is_some(),
                Some(FieldValue::Ref(_, id)) => id.is_some(),
                Some(FieldValue::Refs(_, set)) => !set.is_empty(),
                Some(FieldValue::Bool(_)) => true,
                Some(FieldValue::Text(None)) | None => false,
            };
            (!present).then(|| "This field is required.".to_string())
        }
        FieldCheck::MaxLength(limit) => match value {
            Some(FieldValue::Text(Some(text))) => {
                let length = text.chars().count();
                (length > limit).then(|| {
                    format!("Ensure this value has at most {limit} characters (it has {length}).")
                })
            }
            _ => None,
        },
        FieldCheck::Url => match value {
            Some(FieldValue::Text(Some(text))) if !text.is_empty() => {
                (!is_valid_url(text)).then(|| "Enter a valid URL.".to_string())
            }
            _ => None,
        },
    }
}

/// Whether the text is an absolute http(s)/ftp(s) URL
pub fn is_valid_url(text: &str) -> bool {
    URL_PATTERN.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Blog, Project, Record, Tag};
    use chrono::NaiveDate;
    use rstest::rstest;

    #[rstest]
    #[case("https://github.com/me/portfolio", true)]
    #[case("http://localhost:8000/admin/", true)]
    #[case("ftp://192.168.0.1/file", true)]
    #[case("github.com/me", false)]
    #[case("https://", false)]
    #[case("not a url", false)]
    fn test_url_check(#[case] url: &str, #[case] valid: bool) {
        assert_eq!(is_valid_url(url), valid);
    }

    #[test]
    fn test_max_length_counts_characters() {
        let tag = Tag::new("é".repeat(50));
        assert!(clean_fields(&tag, Tag::field_specs()).is_empty());

        let tag = Tag::new("x".repeat(51));
        let errors = clean_fields(&tag, Tag::field_specs());
        assert_eq!(
            errors.field("name"),
            ["Ensure this value has at most 50 characters (it has 51).".to_string()]
        );
    }

    #[test]
    fn test_required_stops_further_checks() {
        let tag = Tag::new("   ");
        let errors = clean_fields(&tag, Tag::field_specs());
        assert_eq!(errors.field("name"), ["This field is required.".to_string()]);
    }

    #[test]
    fn test_optional_project_fields() {
        let project = Project::default();
        assert!(clean_fields(&project, Project::field_specs()).is_empty());

        let project = Project { repo_url: Some("nope".to_string()), ..Project::new("p") };
        let errors = clean_fields(&project, Project::field_specs());
        assert_eq!(errors.field("repo_url"), ["Enter a valid URL.".to_string()]);
    }

    #[test]
    fn test_blog_requires_read_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut blog = Blog::new("Rust ownership", date);
        assert!(clean_fields(&blog, Blog::field_specs()).is_empty());

        blog.read_date = None;
        let errors = clean_fields(&blog, Blog::field_specs());
        assert!(errors.has_field("read_date"));
    }
}
