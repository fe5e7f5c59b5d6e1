use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubmitterType {
    #[default]
    Teacher,
    Student,
}

impl SubmitterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitterType::Teacher => "teacher",
            SubmitterType::Student => "student",
        }
    }

    pub fn endpoint(&self) -> String {
        format!("topics/submittedby/{}", self.as_str())
    }
}

impl std::fmt::Display for SubmitterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmitterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "teacher" => Ok(SubmitterType::Teacher),
            "student" => Ok(SubmitterType::Student),
            other => Err(format!("unknown submitter type '{}'", other)),
        }
    }
}

/// One entry of a topic's field list: `{ "field", "value", "field2" }` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicField {
    #[serde(rename = "field")]
    pub key: String,
    #[serde(default)]
    pub value: Value,
    #[serde(rename = "field2", default)]
    pub label: Option<String>,
}

/// A topic flattened for table display.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopicRow {
    pub key: String,
    pub submitter: SubmitterType,
    /// The record as received, minus its field list.
    pub record: Map<String, Value>,
    /// `field key -> value`
    pub attributes: BTreeMap<String, Value>,
    /// `"{field key}_name" -> label`
    pub labels: BTreeMap<String, String>,
    pub fields: Vec<TopicField>,
}

impl TopicRow {
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key).or_else(|| self.record.get(key))
    }

    /// Attribute rendered as table text.
    pub fn cell_text(&self, key: &str) -> String {
        match self.attribute(key) {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Column {
    pub title: String,
    pub key: String,
    pub data_index: Option<String>,
    pub fixed_right: bool,
    pub width: Option<u32>,
}

impl Column {
    pub fn data(title: impl Into<String>, key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            title: title.into(),
            data_index: Some(key.clone()),
            key,
            fixed_right: false,
            width: None,
        }
    }

    pub fn actions() -> Self {
        Self {
            title: "Үйлдэл".to_string(),
            key: "actions".to_string(),
            data_index: None,
            fixed_right: true,
            width: Some(150),
        }
    }

    pub fn is_actions(&self) -> bool {
        self.key == "actions"
    }
}
