use thiserror::Error;

pub type Result<T> = std::result::Result<T, PortalError>;

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("{0}")]
    Timeout(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("No access token available")]
    MissingToken,

    #[error("Failed to fetch role information")]
    RoleFetch,

    #[error("{0}")]
    MalformedPayload(String),

    #[error("Access denied for role '{0}'")]
    AccessDenied(String),
}

impl PortalError {
    /// Message suitable for a toast or inline alert.
    ///
    /// Timeouts read like any other transport failure here; the distinct cause
    /// string is kept in `Display` for logs.
    pub fn user_message(&self) -> String {
        match self {
            PortalError::Network(_) | PortalError::Http { .. } | PortalError::Timeout(_) => {
                "Could not reach the portal server. Please try again.".to_string()
            }
            PortalError::Validation(reason) => reason.clone(),
            PortalError::MissingToken => "You are not signed in.".to_string(),
            PortalError::RoleFetch => "Could not determine your role.".to_string(),
            PortalError::MalformedPayload(_) => {
                "The server returned data in an unexpected format.".to_string()
            }
            PortalError::AccessDenied(_) => {
                "You do not have access to this page.".to_string()
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PortalError::Timeout(_))
    }
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        PortalError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        PortalError::MalformedPayload(err.to_string())
    }
}

impl From<validator::ValidationErrors> for PortalError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut reasons: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        reasons.sort();
        PortalError::Validation(reasons.join("; "))
    }
}
