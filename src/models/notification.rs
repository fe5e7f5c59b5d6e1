use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use validator::Validate;

use crate::models::student::{Student, StudentId};
use crate::models::template::TemplateId;

pub const TEMPLATE_ENDPOINT: &str = "notifications/template";
pub const DIRECT_ENDPOINT: &str = "notifications";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipient {
    pub id: StudentId,
    pub email: String,
    pub data: BTreeMap<String, String>,
}

impl From<&Student> for Recipient {
    fn from(student: &Student) -> Self {
        let mut data = BTreeMap::new();
        data.insert("student_name".to_string(), student.firstname.clone());
        Self {
            id: student.id,
            email: student.mail.clone(),
            data,
        }
    }
}

/// Request body for one of the two send endpoints.
///
/// The variants never share a body: templated sends leave placeholder
/// resolution to the server, direct sends carry the final title and content.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum NotificationPayload {
    Template {
        template_id: TemplateId,
        recipients: Vec<Recipient>,
        data: BTreeMap<String, String>,
        #[serde(serialize_with = "serialize_schedule")]
        schedule: Option<DateTime<FixedOffset>>,
        url: Option<String>,
    },
    Direct {
        recipients: Vec<Recipient>,
        title: String,
        content: String,
        #[serde(serialize_with = "serialize_schedule")]
        schedule: Option<DateTime<FixedOffset>>,
        url: Option<String>,
        send_email: bool,
        send_push: bool,
    },
}

impl NotificationPayload {
    pub fn endpoint(&self) -> &'static str {
        match self {
            NotificationPayload::Template { .. } => TEMPLATE_ENDPOINT,
            NotificationPayload::Direct { .. } => DIRECT_ENDPOINT,
        }
    }

    pub fn recipients(&self) -> &[Recipient] {
        match self {
            NotificationPayload::Template { recipients, .. } => recipients,
            NotificationPayload::Direct { recipients, .. } => recipients,
        }
    }
}

/// Canonical wire form of a schedule: RFC 3339, whole seconds, explicit offset.
pub fn format_schedule(schedule: &DateTime<FixedOffset>) -> String {
    schedule.to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn serialize_schedule<S>(
    schedule: &Option<DateTime<FixedOffset>>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match schedule {
        Some(at) => serializer.serialize_str(&format_schedule(at)),
        None => serializer.serialize_none(),
    }
}

/// State of the compose form.
#[derive(Debug, Clone, Default, PartialEq, Validate)]
pub struct NotificationDraft {
    pub template_id: Option<TemplateId>,

    #[validate(length(min = 1, message = "Please enter a subject"))]
    pub subject: String,

    #[validate(length(min = 1, message = "Please enter notification content"))]
    pub content: String,

    pub data: BTreeMap<String, String>,

    #[validate(url(message = "URL must be a valid link"))]
    pub url: Option<String>,

    pub schedule: Option<DateTime<FixedOffset>>,

    pub send_to_all: bool,

    pub recipients: Vec<StudentId>,
}

impl NotificationDraft {
    /// Empty input clears the key, matching a form field left blank.
    pub fn set_data_value(&mut self, key: &str, value: &str) {
        if value.is_empty() {
            self.data.remove(key);
        } else {
            self.data.insert(key.to_string(), value.to_string());
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnreadNotification {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
