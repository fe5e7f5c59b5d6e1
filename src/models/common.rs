use serde::{Deserialize, Serialize};

/// Envelope used by the portal backend for authenticated lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// The payload, only when the server flagged the call as successful.
    pub fn into_success(self) -> Option<T> {
        if self.success {
            self.data
        } else {
            None
        }
    }
}

/// List endpoints answer either with a bare array or with `{ "data": [...] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> ListResponse<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            ListResponse::Bare(items) => items,
            ListResponse::Wrapped { data } => data,
        }
    }
}
