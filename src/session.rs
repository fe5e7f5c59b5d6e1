use crate::config::Config;
use crate::error::{PortalError, Result};
use crate::models::role::{Credentials, Role, UnknownRolePolicy, View};
use crate::models::topic::SubmitterType;
use crate::services::api::SharedTransport;
use crate::services::bell::NotificationBell;
use crate::services::composer::NotificationComposer;
use crate::services::role::RoleService;
use crate::tasks::topic_poller::TopicView;

/// A signed-in user: the role is resolved once and gates which views open.
pub struct PortalSession {
    transport: SharedTransport,
    config: Config,
    role: Role,
}

impl PortalSession {
    pub async fn start(
        transport: SharedTransport,
        config: Config,
        credentials: &Credentials,
    ) -> Result<Self> {
        let role = RoleService::new(transport.clone(), config.role_url.clone())
            .resolve_role(credentials)
            .await?;
        log::info!("Session started with role {}", role);
        Ok(Self::with_role(transport, config, role))
    }

    pub fn with_role(transport: SharedTransport, config: Config, role: Role) -> Self {
        Self {
            transport,
            config,
            role,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn unknown_role_policy(&self) -> UnknownRolePolicy {
        self.config.unknown_role_policy
    }

    pub fn can_open(&self, view: View) -> bool {
        view.allowed_for(self.role, self.config.unknown_role_policy)
    }

    fn require(&self, view: View) -> Result<()> {
        if self.can_open(view) {
            Ok(())
        } else {
            log::warn!("Role {} may not open {:?}", self.role, view);
            Err(PortalError::AccessDenied(self.role.to_string()))
        }
    }

    pub fn composer(&self) -> Result<NotificationComposer> {
        self.require(View::NotificationComposer)?;
        Ok(NotificationComposer::new(self.transport.clone()))
    }

    pub fn topics(&self, submitter: SubmitterType) -> Result<TopicView> {
        self.require(View::ProposedTopics)?;
        Ok(TopicView::mount(
            self.transport.clone(),
            &self.config.polling,
            submitter,
        ))
    }

    pub fn bell(&self) -> Result<NotificationBell> {
        self.require(View::NotificationBell)?;
        Ok(NotificationBell::new(self.transport.clone()))
    }
}
