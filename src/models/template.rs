use serde::{Deserialize, Serialize};

pub type TemplateId = i64;

/// Placeholders the compose form offers inputs for.
pub const KNOWN_PLACEHOLDERS: [&str; 4] = [
    "submission_deadline",
    "days_remaining",
    "deadline_type",
    "due_date",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationTemplate {
    pub id: TemplateId,
    pub name: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}
