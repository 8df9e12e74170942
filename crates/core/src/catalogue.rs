use crate::models::{AssessmentLength, CatalogueFields, CatalogueItem};
use crate::LoadError;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::warn;

pub const KEY_NAME: &str = "Assessment Name";
pub const KEY_DESCRIPTION: &str = "Description";
pub const KEY_JOB_LEVELS: &str = "Job Levels";
pub const KEY_TEST_TYPE: &str = "Test Type";
pub const KEY_LENGTH: &str = "Assessment Length";
pub const KEY_REMOTE: &str = "Remote Testing";
pub const KEY_ADAPTIVE: &str = "Adaptive / IRT";
pub const KEY_URL: &str = "URL";

#[derive(Debug, Clone)]
pub struct SkippedRecord {
    pub position: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub items: Vec<CatalogueItem>,
    pub skipped_records: Vec<SkippedRecord>,
}

pub fn load_catalogue_file(path: &Path) -> Result<LoadReport, LoadError> {
    let bytes = fs::read(path)?;
    load_catalogue_slice(&bytes)
}

pub fn load_catalogue_slice(bytes: &[u8]) -> Result<LoadReport, LoadError> {
    let value: Value = serde_json::from_slice(bytes)?;
    load_catalogue(value)
}

/// Records that are not objects, or whose fields hold objects or nested
/// arrays, are skipped and reported; they never fail the whole load.
pub fn load_catalogue(value: Value) -> Result<LoadReport, LoadError> {
    let records = match value {
        Value::Array(records) => records,
        other => return Err(LoadError::NotASequence(json_kind(&other).to_string())),
    };

    let mut report = LoadReport {
        items: Vec::with_capacity(records.len()),
        skipped_records: Vec::new(),
    };

    for (position, record) in records.into_iter().enumerate() {
        match parse_record(&record) {
            Ok(fields) => report.items.push(CatalogueItem::new(fields)),
            Err(reason) => {
                warn!(position, reason = %reason, "skipping malformed catalogue record");
                report.skipped_records.push(SkippedRecord { position, reason });
            }
        }
    }

    Ok(report)
}

fn parse_record(record: &Value) -> Result<CatalogueFields, String> {
    let map = record
        .as_object()
        .ok_or_else(|| format!("record is {}, expected object", json_kind(record)))?;

    let defaults = CatalogueFields::default();
    Ok(CatalogueFields {
        name: text_field(map, KEY_NAME)?.unwrap_or(defaults.name),
        description: text_field(map, KEY_DESCRIPTION)?.unwrap_or(defaults.description),
        job_levels: text_field(map, KEY_JOB_LEVELS)?.unwrap_or(defaults.job_levels),
        test_type: text_field(map, KEY_TEST_TYPE)?.unwrap_or(defaults.test_type),
        length: length_field(map)?.unwrap_or(defaults.length),
        remote: flag_field(map, KEY_REMOTE)?.unwrap_or(defaults.remote),
        adaptive: flag_field(map, KEY_ADAPTIVE)?.unwrap_or(defaults.adaptive),
        url: text_field(map, KEY_URL)?.unwrap_or(defaults.url),
    })
}

fn text_field(map: &Map<String, Value>, key: &str) -> Result<Option<String>, String> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(Value::Bool(flag)) => Ok(Some(flag.to_string())),
        Some(Value::Array(values)) => join_scalars(values)
            .map(Some)
            .ok_or_else(|| format!("field `{key}` is an array holding arrays or objects")),
        Some(other) => Err(format!("field `{key}` is {}", json_kind(other))),
    }
}

// ["Graduate", "Entry-Level"] reads as "Graduate, Entry-Level"; nulls are dropped
fn join_scalars(values: &[Value]) -> Option<String> {
    let mut parts = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::Null => {}
            Value::String(text) => parts.push(text.clone()),
            Value::Number(number) => parts.push(number.to_string()),
            Value::Bool(flag) => parts.push(flag.to_string()),
            Value::Array(_) | Value::Object(_) => return None,
        }
    }
    Some(parts.join(", "))
}

fn flag_field(map: &Map<String, Value>, key: &str) -> Result<Option<String>, String> {
    match map.get(key) {
        Some(Value::Bool(true)) => Ok(Some("Yes".to_string())),
        Some(Value::Bool(false)) => Ok(Some("No".to_string())),
        _ => text_field(map, key),
    }
}

fn length_field(map: &Map<String, Value>) -> Result<Option<AssessmentLength>, String> {
    match map.get(KEY_LENGTH) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(minutes)) => Ok(Some(AssessmentLength::Minutes(minutes.clone()))),
        Some(Value::String(text)) => Ok(Some(AssessmentLength::Text(text.clone()))),
        Some(Value::Array(_)) => Ok(text_field(map, KEY_LENGTH)?.map(AssessmentLength::Text)),
        Some(other) => Err(format!("field `{KEY_LENGTH}` is {}", json_kind(other))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub fn catalogue_checksum(items: &[CatalogueItem]) -> String {
    let mut hasher = Sha256::new();
    for item in items {
        hasher.update(item.canonical_text().as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

pub fn filter_by_keywords<'a>(
    items: &'a [CatalogueItem],
    keywords: &[String],
) -> Vec<&'a CatalogueItem> {
    let keywords = keywords
        .iter()
        .map(|keyword| keyword.to_lowercase())
        .collect::<Vec<_>>();

    items
        .iter()
        .filter(|item| {
            let content = item.canonical_text().to_lowercase();
            keywords.iter().any(|keyword| content.contains(keyword))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn loads_records_in_order_with_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let report = load_catalogue(json!([
            {
                "Assessment Name": "Java 8 (New)",
                "Description": "Multi-choice test of Java knowledge.",
                "Job Levels": "Mid-Professional",
                "Test Type": "Knowledge & Skills",
                "Assessment Length": 18,
                "Remote Testing": "Yes",
                "Adaptive / IRT": "No",
                "URL": "https://example.com/java-8"
            },
            {}
        ]))?;

        assert_eq!(report.items.len(), 2);
        assert!(report.skipped_records.is_empty());

        let first = &report.items[0];
        assert_eq!(first.name(), "Java 8 (New)");
        assert_eq!(first.length(), &AssessmentLength::Minutes(18.into()));

        let second = &report.items[1];
        assert_eq!(second.name(), "Unnamed Assessment");
        assert_eq!(second.test_type(), "Unknown");
        assert_eq!(second.job_levels(), "General");
        assert_eq!(second.remote(), "No");
        assert_eq!(second.adaptive(), "No");
        assert_eq!(second.url(), "");
        assert_eq!(second.length().to_string(), "Not specified");
        Ok(())
    }

    #[test]
    fn malformed_records_are_skipped_not_fatal() -> Result<(), Box<dyn std::error::Error>> {
        let report = load_catalogue(json!([
            {"Assessment Name": "First"},
            "not a record",
            {"Assessment Name": [["nested"]]},
            {"Assessment Name": "Last", "Remote Testing": true}
        ]))?;

        let names: Vec<&str> = report.items.iter().map(|item| item.name()).collect();
        assert_eq!(names, vec!["First", "Last"]);
        assert_eq!(report.items[1].remote(), "Yes");

        let skipped: Vec<usize> = report
            .skipped_records
            .iter()
            .map(|record| record.position)
            .collect();
        assert_eq!(skipped, vec![1, 2]);
        Ok(())
    }

    #[test]
    fn array_fields_are_joined() -> Result<(), Box<dyn std::error::Error>> {
        let report = load_catalogue(json!([
            {
                "Assessment Name": "Account Manager Solution",
                "Job Levels": ["Mid-Professional", "Manager", null],
                "Test Type": ["Competencies", "Personality & Behaviour"]
            },
            {"Assessment Name": "Bad", "Job Levels": ["Graduate", {"level": 2}]},
            {"Assessment Name": "Worse", "Description": {"text": "nested"}}
        ]))?;

        assert_eq!(report.items.len(), 1);
        let item = &report.items[0];
        assert_eq!(item.job_levels(), "Mid-Professional, Manager");
        assert_eq!(item.test_type(), "Competencies, Personality & Behaviour");
        assert!(item
            .canonical_text()
            .contains("Suitable For: Mid-Professional, Manager\n"));

        let skipped: Vec<usize> = report
            .skipped_records
            .iter()
            .map(|record| record.position)
            .collect();
        assert_eq!(skipped, vec![1, 2]);
        Ok(())
    }

    #[test]
    fn non_sequence_input_fails() {
        let result = load_catalogue(json!({"Assessment Name": "Lonely"}));
        assert!(matches!(result, Err(LoadError::NotASequence(_))));
    }

    #[test]
    fn invalid_json_file_fails() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("catalogue.json");
        fs::write(&path, b"[{\"Assessment Name\": ")?;

        assert!(matches!(load_catalogue_file(&path), Err(LoadError::Json(_))));
        Ok(())
    }

    #[test]
    fn loads_from_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("catalogue.json");
        fs::write(
            &path,
            r#"[{"Assessment Name": "Spanish (Latin American)", "Assessment Length": "about 20"}]"#,
        )?;

        let report = load_catalogue_file(&path)?;
        assert_eq!(report.items.len(), 1);
        assert!(report.items[0].canonical_text().contains("Duration: about 20"));
        Ok(())
    }

    #[test]
    fn checksum_is_reproducible() -> Result<(), Box<dyn std::error::Error>> {
        let records = json!([{"Assessment Name": "A"}, {"Assessment Name": "B"}]);
        let first = load_catalogue(records.clone())?;
        let second = load_catalogue(records)?;
        assert_eq!(
            catalogue_checksum(&first.items),
            catalogue_checksum(&second.items)
        );
        Ok(())
    }

    #[test]
    fn keyword_filter_is_case_insensitive() -> Result<(), Box<dyn std::error::Error>> {
        let report = load_catalogue(json!([
            {"Assessment Name": "Spanish (Latin American)"},
            {"Assessment Name": "Python (New)"},
            {"Assessment Name": "General", "Description": "Reading test in SPANISH"}
        ]))?;

        let matched = filter_by_keywords(&report.items, &["spanish".to_string()]);
        let names: Vec<&str> = matched.iter().map(|item| item.name()).collect();
        assert_eq!(names, vec!["Spanish (Latin American)", "General"]);
        Ok(())
    }
}
