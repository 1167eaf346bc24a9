//! Identity keys shared by the scrape and notify stages.
//!
//! A key is `normalize(date_spec) | normalize(course_name)`. The status part
//! of a description never takes part, so a course moving from "geplant" to
//! "eingeladen" keeps its key.

pub const DESCRIPTION_SEPARATOR: &str = " - ";

/// Collapses whitespace runs to a single space and trims.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[must_use]
pub fn normalize_key_part(text: &str) -> String {
    normalize_whitespace(text).to_lowercase()
}

/// Splits a description into course name and status.
///
/// The status is the segment between the first and the second separator;
/// anything after a second separator is dropped.
#[must_use]
pub fn split_description(description: &str) -> (&str, Option<&str>) {
    let mut parts = description.split(DESCRIPTION_SEPARATOR);
    let course_name = parts.next().unwrap_or_default();
    (course_name, parts.next())
}

#[must_use]
pub fn compute_identity_key(date_spec: &str, description: &str) -> String {
    let (course_name, _) = split_description(description);
    format!(
        "{}|{}",
        normalize_key_part(date_spec),
        normalize_key_part(course_name)
    )
}
