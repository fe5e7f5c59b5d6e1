//! Turns raw topic records into table rows and column definitions.
//!
//! Each record carries a list of `{ field, value, field2 }` entries, either
//! inline or as a JSON-encoded string. The list is flattened into
//! `attributes` (`field -> value`) and `labels` (`field_name -> field2`).
//! Only the whitelisted keys below become data columns, titled by their
//! label and ordered as they appear in the first record of the batch.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{PortalError, Result};
use crate::models::topic::{Column, SubmitterType, TopicField, TopicRow};

pub const COLUMN_WHITELIST: [&str; 3] = ["name_english", "name_mongolian", "description"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicBatch {
    pub rows: Vec<TopicRow>,
    pub columns: Vec<Column>,
}

/// Columns shown when a batch has no records to derive them from.
pub fn fallback_columns() -> Vec<Column> {
    vec![
        Column::data("Монгол нэр", "name_mongolian"),
        Column::data("Англи нэр", "name_english"),
        Column::data("Тайлбар", "description"),
    ]
}

/// Decode a record's field list. Anything unreadable yields an empty list.
pub fn parse_fields(raw: Option<&Value>) -> Vec<TopicField> {
    let entries: Vec<Value> = match raw {
        Some(Value::Array(entries)) => entries.clone(),
        Some(Value::String(text)) => match serde_json::from_str(text) {
            Ok(entries) => entries,
            Err(err) => {
                log::warn!("Error processing topic fields: {}", err);
                return Vec::new();
            }
        },
        Some(Value::Null) | None => return Vec::new(),
        Some(other) => {
            log::warn!("Error processing topic fields: unexpected {}", other);
            return Vec::new();
        }
    };

    let parsed: std::result::Result<Vec<TopicField>, _> =
        entries.into_iter().map(serde_json::from_value).collect();
    match parsed {
        Ok(fields) => fields,
        Err(err) => {
            log::warn!("Error processing topic fields: {}", err);
            Vec::new()
        }
    }
}

fn row_key(record: &Map<String, Value>, index: usize) -> String {
    match record.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => format!("row-{}", index),
    }
}

pub fn transform_record(item: Value, submitter: SubmitterType, index: usize) -> TopicRow {
    let mut record = match item {
        Value::Object(record) => record,
        other => {
            log::warn!("Topic record {} is not an object: {}", index, other);
            Map::new()
        }
    };

    let fields = parse_fields(record.remove("fields").as_ref());
    let mut attributes = BTreeMap::new();
    let mut labels = BTreeMap::new();
    for field in &fields {
        attributes.insert(field.key.clone(), field.value.clone());
        if let Some(label) = &field.label {
            labels.insert(format!("{}_name", field.key), label.clone());
        }
    }

    TopicRow {
        key: row_key(&record, index),
        submitter,
        record,
        attributes,
        labels,
        fields,
    }
}

pub fn derive_columns(rows: &[TopicRow]) -> Vec<Column> {
    let first = match rows.first() {
        Some(first) => first,
        None => return fallback_columns(),
    };

    first
        .fields
        .iter()
        .filter(|field| COLUMN_WHITELIST.contains(&field.key.as_str()))
        .map(|field| {
            let title = field.label.clone().unwrap_or_else(|| field.key.clone());
            Column::data(title, field.key.clone())
        })
        .chain(std::iter::once(Column::actions()))
        .collect()
}

pub fn transform_batch(payload: Value, submitter: SubmitterType) -> Result<TopicBatch> {
    let items = match payload {
        Value::Array(items) => items,
        _ => {
            return Err(PortalError::MalformedPayload(
                "Invalid data format received from API".to_string(),
            ))
        }
    };

    let rows: Vec<TopicRow> = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| transform_record(item, submitter, index))
        .collect();
    let columns = derive_columns(&rows);

    Ok(TopicBatch { rows, columns })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn topic(id: i64, fields: Value) -> Value {
        json!({ "id": id, "status": "submitted", "fields": fields })
    }

    #[test]
    fn test_empty_batch_uses_fallback_columns() {
        let batch = transform_batch(json!([]), SubmitterType::Teacher).unwrap();
        assert!(batch.rows.is_empty());
        let keys: Vec<_> = batch.columns.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["name_mongolian", "name_english", "description"]);
    }

    #[test]
    fn test_columns_follow_first_record_then_actions() {
        let first = json!([
            { "field": "description", "value": "Graph search", "field2": "Тайлбар" },
            { "field": "advisor", "value": "Dr. Bold", "field2": "Удирдагч" },
            { "field": "name_english", "value": "Pathfinding", "field2": "Англи нэр" }
        ]);
        let second = json!([
            { "field": "name_mongolian", "value": "Зам хайх", "field2": "Монгол нэр" }
        ]);
        let batch = transform_batch(
            json!([topic(1, Value::String(first.to_string())), topic(2, second)]),
            SubmitterType::Student,
        )
        .unwrap();

        let keys: Vec<_> = batch.columns.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["description", "name_english", "actions"]);
        assert_eq!(batch.columns[0].title, "Тайлбар");
        assert!(batch.columns[2].is_actions());
        assert!(batch.columns[2].fixed_right);

        let row = &batch.rows[0];
        assert_eq!(row.key, "1");
        assert_eq!(row.submitter, SubmitterType::Student);
        assert_eq!(row.cell_text("name_english"), "Pathfinding");
        assert_eq!(row.cell_text("status"), "submitted");
        assert_eq!(row.labels["advisor_name"], "Удирдагч");
        assert!(row.record.get("fields").is_none());
    }

    #[test]
    fn test_malformed_record_does_not_fail_batch() {
        let batch = transform_batch(
            json!([
                topic(1, json!("{not json")),
                topic(2, json!([{ "field": "name_english", "value": "Ok", "field2": "Name" }])),
                "garbage"
            ]),
            SubmitterType::Teacher,
        )
        .unwrap();

        assert_eq!(batch.rows.len(), 3);
        assert!(batch.rows[0].attributes.is_empty());
        assert_eq!(batch.rows[1].cell_text("name_english"), "Ok");
        assert_eq!(batch.rows[2].key, "row-2");
        let keys: Vec<_> = batch.columns.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["actions"]);
    }

    #[test]
    fn test_non_array_payload_is_rejected() {
        let result = transform_batch(json!({ "data": [] }), SubmitterType::Teacher);
        match result {
            Err(PortalError::MalformedPayload(message)) => {
                assert_eq!(message, "Invalid data format received from API")
            }
            other => panic!("expected malformed payload, got {:?}", other),
        }
    }
}
