use crate::error::{PortalError, Result};
use crate::models::common::ApiResponse;
use crate::models::role::{Credentials, Role, RoleInfo};
use crate::services::api::SharedTransport;

#[derive(Clone)]
pub struct RoleService {
    transport: SharedTransport,
    role_url: String,
}

impl RoleService {
    pub fn new(transport: SharedTransport, role_url: impl Into<String>) -> Self {
        Self {
            transport,
            role_url: role_url.into(),
        }
    }

    /// Fetch the caller's role information. No retry.
    pub async fn fetch_user_role(&self, credentials: &Credentials) -> Result<RoleInfo> {
        let token = credentials.token().ok_or(PortalError::MissingToken)?;

        log::info!("Fetching user role from {}", self.role_url);

        let value = self
            .transport
            .get(&self.role_url, Some(token))
            .await
            .map_err(|err| {
                log::error!("Error fetching user role: {}", err);
                err
            })?;

        let response: ApiResponse<RoleInfo> = serde_json::from_value(value).map_err(|err| {
            log::error!("Unexpected role response shape: {}", err);
            PortalError::RoleFetch
        })?;

        response.into_success().ok_or(PortalError::RoleFetch)
    }

    pub async fn resolve_role(&self, credentials: &Credentials) -> Result<Role> {
        let info = self.fetch_user_role(credentials).await?;
        let role = info.role();
        if role == Role::Unknown {
            log::warn!("Group id {} does not map to a known role", info.gid);
        }
        Ok(role)
    }
}
