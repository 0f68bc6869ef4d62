//! Annotation types and the portable annotation file format
//!
//! An annotation is persisted as plain extracted text plus metadata; there
//! is no structural position. Field names follow the exported JSON shape:
//!
//! ```json
//! {
//!   "sourceFile": "essay.html",
//!   "exportedAt": "2024-05-01T10:00:00.000Z",
//!   "annotations": [
//!     { "id": "…", "text": "…", "color": "#ffff00",
//!       "timestamp": "2024-05-01T09:58:12.345Z", "comment": "…" }
//!   ]
//! }
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::color::normalize_hex;

/// A highlight with its identity and metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Unique identifier, assigned once
    pub id: String,
    /// Rendered text of the highlighted span when it was captured
    pub text: String,
    /// Highlight color as `#rrggbb`
    pub color: String,
    /// Creation time
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    /// Optional user note
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub comment: Option<String>,
}

/// An exported annotation list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationFile {
    /// Name of the document the annotations were made on
    pub source_file: Option<String>,
    /// Export time
    #[serde(with = "iso_millis")]
    pub exported_at: DateTime<Utc>,
    /// Annotations in document order
    pub annotations: Vec<Annotation>,
}

/// One entry of an imported annotation list.
///
/// Every field is optional here; validation happens per record so one bad
/// entry never rejects the whole file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImportRecord {
    pub id: Option<String>,
    pub text: Option<String>,
    pub color: Option<String>,
    pub timestamp: Option<String>,
    pub comment: Option<String>,
}

/// Why an import record cannot be re-anchored
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

impl ImportRecord {
    /// Validate the record into an annotation
    pub fn into_annotation(self) -> Result<Annotation, RecordError> {
        let id = non_empty(self.id).ok_or(RecordError::MissingField("id"))?;
        let text = non_empty(self.text).ok_or(RecordError::MissingField("text"))?;
        let raw_color = non_empty(self.color).ok_or(RecordError::MissingField("color"))?;
        let raw_timestamp =
            non_empty(self.timestamp).ok_or(RecordError::MissingField("timestamp"))?;

        let color = normalize_hex(&raw_color).ok_or(RecordError::InvalidColor(raw_color))?;
        let timestamp =
            parse_timestamp(&raw_timestamp).ok_or(RecordError::InvalidTimestamp(raw_timestamp))?;

        Ok(Annotation {
            id,
            text,
            color,
            timestamp,
            comment: self.comment.filter(|c| !c.is_empty()),
        })
    }
}

impl From<&Annotation> for ImportRecord {
    fn from(annotation: &Annotation) -> Self {
        Self {
            id: Some(annotation.id.clone()),
            text: Some(annotation.text.clone()),
            color: Some(annotation.color.clone()),
            timestamp: Some(format_timestamp(&annotation.timestamp)),
            comment: annotation.comment.clone(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// ISO-8601 with millisecond precision and a `Z` suffix
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse any RFC 3339 timestamp into UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw)))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn sample() -> Annotation {
        Annotation {
            id: "a1".to_string(),
            text: "Hello".to_string(),
            color: "#ffff00".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            comment: None,
        }
    }

    #[test]
    fn test_serialization_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["timestamp"], "2024-05-01T10:00:00.000Z");
        assert_eq!(json["color"], "#ffff00");
        assert!(json.get("comment").is_none());
    }

    #[test]
    fn test_file_uses_camel_case() {
        let file = AnnotationFile {
            source_file: None,
            exported_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            annotations: vec![sample()],
        };
        let json = serde_json::to_value(&file).unwrap();
        assert!(json["sourceFile"].is_null());
        assert_eq!(json["exportedAt"], "2024-05-01T10:00:00.000Z");
        assert_eq!(json["annotations"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_record_into_annotation() {
        let record = ImportRecord {
            id: Some("a1".to_string()),
            text: Some("Hello".to_string()),
            color: Some("#FF0".to_string()),
            timestamp: Some("2024-05-01T12:00:00+02:00".to_string()),
            comment: Some(String::new()),
        };
        let annotation = record.into_annotation().unwrap();

        assert_eq!(annotation.color, "#ffff00");
        assert_eq!(annotation.timestamp, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
        assert_eq!(annotation.comment, None);
    }

    #[test]
    fn test_record_missing_fields() {
        let record = ImportRecord {
            text: Some("Hello".to_string()),
            ..Default::default()
        };
        assert_eq!(record.into_annotation(), Err(RecordError::MissingField("id")));

        let mut record = ImportRecord::from(&sample());
        record.color = Some("transparent".to_string());
        assert!(matches!(record.into_annotation(), Err(RecordError::InvalidColor(_))));

        let mut record = ImportRecord::from(&sample());
        record.timestamp = Some("yesterday".to_string());
        assert!(matches!(record.into_annotation(), Err(RecordError::InvalidTimestamp(_))));
    }

    #[test]
    fn test_record_round_trips_annotation() {
        let original = Annotation {
            comment: Some("note".to_string()),
            ..sample()
        };
        let restored = ImportRecord::from(&original).into_annotation().unwrap();
        assert_eq!(restored, original);
    }
}
