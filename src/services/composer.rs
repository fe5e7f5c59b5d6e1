use serde_json::Value;
use validator::Validate;

use crate::error::{PortalError, Result};
use crate::models::common::ListResponse;
use crate::models::notification::{NotificationDraft, NotificationPayload, Recipient};
use crate::models::student::{RecipientFilter, Student, StudentId};
use crate::models::template::{NotificationTemplate, TemplateId, KNOWN_PLACEHOLDERS};
use crate::services::api::{fetch_data, post_data, SharedTransport};
use crate::services::preview::{self, Preview};

pub const TEMPLATES_ENDPOINT: &str = "notification-templates";
pub const STUDENTS_ENDPOINT: &str = "students/all";

const NO_RECIPIENTS: &str = "Please select at least one recipient or choose to send to all.";

/// Who a submission goes to. Exactly one mode per submission.
#[derive(Debug, Clone, PartialEq)]
pub enum RecipientSelection {
    Explicit(Vec<StudentId>),
    Broadcast(RecipientFilter),
}

impl RecipientSelection {
    pub fn from_draft(draft: &NotificationDraft, filter: RecipientFilter) -> Result<Self> {
        if draft.send_to_all {
            Ok(RecipientSelection::Broadcast(filter))
        } else if !draft.recipients.is_empty() {
            Ok(RecipientSelection::Explicit(draft.recipients.clone()))
        } else {
            Err(PortalError::Validation(NO_RECIPIENTS.to_string()))
        }
    }
}

/// Resolve a selection against the roster. An explicit id that is not in the
/// roster fails the whole selection.
pub fn resolve_recipients(
    roster: &[Student],
    selection: &RecipientSelection,
) -> Result<Vec<Recipient>> {
    match selection {
        RecipientSelection::Broadcast(filter) => Ok(roster
            .iter()
            .filter(|student| filter.matches(student))
            .map(Recipient::from)
            .collect()),
        RecipientSelection::Explicit(ids) => {
            if ids.is_empty() {
                return Err(PortalError::Validation(NO_RECIPIENTS.to_string()));
            }
            ids.iter()
                .map(|id| {
                    roster
                        .iter()
                        .find(|student| student.id == *id)
                        .map(Recipient::from)
                        .ok_or_else(|| {
                            PortalError::Validation(format!(
                                "Recipient {} is not in the student list",
                                id
                            ))
                        })
                })
                .collect()
        }
    }
}

pub fn build_payload(draft: &NotificationDraft, recipients: Vec<Recipient>) -> NotificationPayload {
    match draft.template_id {
        Some(template_id) => NotificationPayload::Template {
            template_id,
            recipients,
            data: draft.data.clone(),
            schedule: draft.schedule,
            url: draft.url.clone(),
        },
        None => NotificationPayload::Direct {
            recipients,
            title: draft.subject.clone(),
            content: draft.content.clone(),
            schedule: draft.schedule,
            url: draft.url.clone(),
            send_email: true,
            send_push: true,
        },
    }
}

/// Compose-notification view state.
pub struct NotificationComposer {
    transport: SharedTransport,
    templates: Vec<NotificationTemplate>,
    students: Vec<Student>,
    draft: NotificationDraft,
    preview: Preview,
    filter: RecipientFilter,
}

impl NotificationComposer {
    pub fn new(transport: SharedTransport) -> Self {
        Self {
            transport,
            templates: Vec::new(),
            students: Vec::new(),
            draft: NotificationDraft::default(),
            preview: Preview::default(),
            filter: RecipientFilter::All,
        }
    }

    /// Load templates and the roster side by side. Each failure is reported
    /// on its own and leaves the other list usable.
    pub async fn load(&mut self) -> Vec<String> {
        let transport = self.transport.clone();
        let (templates, students) = tokio::join!(
            fetch_data::<ListResponse<NotificationTemplate>>(transport.as_ref(), TEMPLATES_ENDPOINT),
            fetch_data::<Vec<Student>>(transport.as_ref(), STUDENTS_ENDPOINT),
        );

        let mut errors = Vec::new();
        match templates {
            Ok(templates) => self.templates = templates.into_vec(),
            Err(err) => {
                log::error!("Error fetching templates: {}", err);
                errors.push("Failed to fetch notification templates.".to_string());
            }
        }
        match students {
            Ok(students) => self.students = students,
            Err(err) => {
                log::error!("Error fetching students: {}", err);
                errors.push("Failed to fetch students.".to_string());
            }
        }
        errors
    }

    pub fn templates(&self) -> &[NotificationTemplate] {
        &self.templates
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn draft(&self) -> &NotificationDraft {
        &self.draft
    }

    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    pub fn filter(&self) -> RecipientFilter {
        self.filter
    }

    /// Copies the template's subject and body into the draft.
    pub fn select_template(&mut self, template_id: TemplateId) -> bool {
        let template = match self.templates.iter().find(|t| t.id == template_id) {
            Some(template) => template.clone(),
            None => return false,
        };
        self.draft.template_id = Some(template.id);
        self.draft.subject = template.subject;
        self.draft.content = template.body;
        self.refresh_preview();
        true
    }

    pub fn clear_template(&mut self) {
        self.draft.template_id = None;
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.draft.subject = subject.into();
        self.refresh_preview();
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.draft.content = content.into();
        self.refresh_preview();
    }

    pub fn set_data_value(&mut self, key: &str, value: &str) {
        self.draft.set_data_value(key, value);
        self.refresh_preview();
    }

    /// The placeholder inputs of the form with what has been entered so far.
    pub fn placeholder_inputs(&self) -> Vec<(&'static str, Option<&str>)> {
        KNOWN_PLACEHOLDERS
            .iter()
            .map(|key| (*key, self.draft.data.get(*key).map(String::as_str)))
            .collect()
    }

    pub fn set_url(&mut self, url: Option<String>) {
        self.draft.url = url.filter(|url| !url.trim().is_empty());
    }

    pub fn set_schedule(&mut self, schedule: Option<chrono::DateTime<chrono::FixedOffset>>) {
        self.draft.schedule = schedule;
    }

    pub fn set_filter(&mut self, filter: RecipientFilter) {
        self.filter = filter;
    }

    pub fn recipient_count(&self, filter: RecipientFilter) -> usize {
        self.students.iter().filter(|s| filter.matches(s)).count()
    }

    /// Switch to broadcast over the current filter.
    pub fn send_to_all(&mut self) {
        self.draft.send_to_all = true;
        self.draft.recipients.clear();
    }

    /// Picking a specific student leaves broadcast mode.
    pub fn select_recipient(&mut self, id: StudentId) {
        self.draft.send_to_all = false;
        if !self.draft.recipients.contains(&id) {
            self.draft.recipients.push(id);
        }
    }

    pub fn set_recipients(&mut self, ids: Vec<StudentId>) {
        self.draft.send_to_all = false;
        self.draft.recipients = ids;
    }

    fn refresh_preview(&mut self) {
        self.preview = preview::preview(&self.draft.subject, &self.draft.content, &self.draft.data);
    }

    /// Validate the draft and build the request without sending it.
    pub fn prepare(&self) -> Result<NotificationPayload> {
        self.draft.validate()?;
        let selection = RecipientSelection::from_draft(&self.draft, self.filter)?;
        let recipients = resolve_recipients(&self.students, &selection)?;
        Ok(build_payload(&self.draft, recipients))
    }

    /// Send the draft. The form is reset only when the server accepted it.
    pub async fn submit(&mut self) -> Result<Value> {
        let payload = self.prepare().map_err(|err| {
            log::warn!("Notification not sent: {}", err);
            err
        })?;

        log::info!(
            "Sending notification to {} recipient(s) via {}",
            payload.recipients().len(),
            payload.endpoint()
        );

        match post_data(self.transport.as_ref(), payload.endpoint(), &payload).await {
            Ok(response) => {
                log::info!("Notification sent successfully");
                self.draft = NotificationDraft::default();
                self.preview = Preview::default();
                Ok(response)
            }
            Err(err) => {
                log::error!("Error sending notification: {}", err);
                Err(err)
            }
        }
    }
}
