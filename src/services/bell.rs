use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::common::ListResponse;
use crate::models::notification::UnreadNotification;
use crate::services::api::{fetch_data, SharedTransport};

pub const UNREAD_ENDPOINT: &str = "notifications/unread";
const BADGE_OVERFLOW: usize = 99;

pub fn mark_read_endpoint(id: i64) -> String {
    format!("notifications/{}/read", id)
}

/// Unread-notification popover. Fetches only when opened.
pub struct NotificationBell {
    transport: SharedTransport,
    notifications: Vec<UnreadNotification>,
    open: bool,
    loading: bool,
}

impl NotificationBell {
    pub fn new(transport: SharedTransport) -> Self {
        Self {
            transport,
            notifications: Vec::new(),
            open: false,
            loading: false,
        }
    }

    pub fn notifications(&self) -> &[UnreadNotification] {
        &self.notifications
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Opening the popover refreshes the list. A failed refresh keeps
    /// whatever was shown before.
    pub async fn set_open(&mut self, open: bool) {
        self.open = open;
        if open {
            self.refresh().await;
        }
    }

    pub async fn refresh(&mut self) {
        self.loading = true;
        let result =
            fetch_data::<ListResponse<UnreadNotification>>(self.transport.as_ref(), UNREAD_ENDPOINT)
                .await;
        match result {
            Ok(list) => self.notifications = list.into_vec(),
            Err(err) => log::error!("Error fetching notifications: {}", err),
        }
        self.loading = false;
    }

    /// Mark one notification read and drop it from the list. Returns the
    /// link to follow, if the notification carries one.
    pub async fn click(&mut self, id: i64) -> Result<Option<String>> {
        let endpoint = mark_read_endpoint(id);
        if let Err(err) = self
            .transport
            .post(&endpoint, serde_json::Value::Null)
            .await
        {
            log::error!("Error handling notification click: {}", err);
            return Err(err);
        }

        let url = self
            .notifications
            .iter()
            .find(|n| n.id == id)
            .and_then(|n| n.url.clone());
        self.notifications.retain(|n| n.id != id);
        Ok(url)
    }

    pub fn badge_label(&self) -> String {
        badge_label(self.notifications.len())
    }
}

pub fn badge_label(count: usize) -> String {
    if count > BADGE_OVERFLOW {
        format!("{}+", BADGE_OVERFLOW)
    } else {
        count.to_string()
    }
}

/// Relative age such as "5 minutes ago".
pub fn age_label(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(created_at);
    let seconds = elapsed.num_seconds();

    if seconds < 0 {
        return "in the future".to_string();
    }
    if seconds < 45 {
        return "a few seconds ago".to_string();
    }

    let (amount, unit) = if elapsed.num_minutes() < 60 {
        (elapsed.num_minutes().max(1), "minute")
    } else if elapsed.num_hours() < 24 {
        (elapsed.num_hours(), "hour")
    } else if elapsed.num_days() < 30 {
        (elapsed.num_days(), "day")
    } else if elapsed.num_days() < 365 {
        (elapsed.num_days() / 30, "month")
    } else {
        (elapsed.num_days() / 365, "year")
    };

    if amount == 1 {
        let article = if unit == "hour" { "an" } else { "a" };
        format!("{} {} ago", article, unit)
    } else {
        format!("{} {}s ago", amount, unit)
    }
}
