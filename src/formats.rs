use serde::{Deserialize, Serialize};

use crate::identity;

/// One course announcement as stored in `termine.json` / `last_sent.json`.
///
/// Field names on disk are the German keys of the original data files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "termin", default)]
    pub date_spec: String,
    #[serde(rename = "beschreibung", default)]
    pub description: String,
    #[serde(rename = "ort", default)]
    pub location: String,
    #[serde(rename = "kursname", default)]
    pub course_name: String,
    #[serde(default)]
    pub status: String,
}

impl Record {
    /// Builds a record and derives `course_name`/`status` from `description`.
    pub fn new(
        date_spec: impl Into<String>,
        description: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        let description = description.into();
        let (course_name, status) = identity::split_description(&description);
        let course_name = course_name.to_owned();
        let status = status.unwrap_or_default().to_owned();
        Self {
            date_spec: date_spec.into(),
            description,
            location: location.into(),
            course_name,
            status,
        }
    }

    #[must_use]
    pub fn identity_key(&self) -> String {
        identity::compute_identity_key(&self.date_spec, &self.description)
    }
}
