use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Group id to role table used by the department portal.
const ROLE_TABLE: [(&str, Role); 4] = [
    ("5", Role::Department),
    ("90", Role::Supervisor),
    ("50", Role::Student),
    ("70", Role::Teacher),
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Department,
    Supervisor,
    Student,
    Teacher,
    Unknown,
}

impl Role {
    /// Unrecognized ids resolve to `Role::Unknown`; this never fails.
    pub fn from_gid(gid: &str) -> Self {
        let gid = gid.trim();
        ROLE_TABLE
            .iter()
            .find(|(id, _)| *id == gid)
            .map(|(_, role)| *role)
            .unwrap_or(Role::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Department => "department",
            Role::Supervisor => "supervisor",
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bearer credential handed to the role resolver by the caller.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    token: Option<String>,
}

impl Credentials {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

/// Payload under `data` of a successful `user/role` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleInfo {
    #[serde(deserialize_with = "gid_from_string_or_number")]
    pub gid: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RoleInfo {
    pub fn role(&self) -> Role {
        Role::from_gid(&self.gid)
    }
}

fn gid_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Gid {
        Text(String),
        Number(i64),
    }

    Ok(match Gid::deserialize(deserializer)? {
        Gid::Text(text) => text,
        Gid::Number(number) => number.to_string(),
    })
}

/// What a caller does with a user whose group id is not in the role table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownRolePolicy {
    Deny,
    ReadOnly,
}

impl FromStr for UnknownRolePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deny" => Ok(UnknownRolePolicy::Deny),
            "read-only" | "readonly" => Ok(UnknownRolePolicy::ReadOnly),
            other => Err(format!(
                "invalid unknown-role policy '{}'; expected 'deny' or 'read-only'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum View {
    NotificationComposer,
    ProposedTopics,
    NotificationBell,
}

impl View {
    pub fn allowed_for(self, role: Role, policy: UnknownRolePolicy) -> bool {
        match (role, self) {
            (Role::Unknown, View::NotificationBell) => policy == UnknownRolePolicy::ReadOnly,
            (Role::Unknown, _) => false,
            (_, View::NotificationBell) => true,
            (Role::Department, View::NotificationComposer) => true,
            (Role::Department | Role::Supervisor, View::ProposedTopics) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_gid_mapping() {
        assert_eq!(Role::from_gid("5"), Role::Department);
        assert_eq!(Role::from_gid("90"), Role::Supervisor);
        assert_eq!(Role::from_gid("50"), Role::Student);
        assert_eq!(Role::from_gid("70"), Role::Teacher);
        assert_eq!(Role::from_gid("999"), Role::Unknown);
        assert_eq!(Role::from_gid(""), Role::Unknown);
    }

    #[test]
    fn test_role_info_accepts_numeric_gid() {
        let info: RoleInfo = serde_json::from_value(json!({ "gid": 90, "name": "Bat" })).unwrap();
        assert_eq!(info.gid, "90");
        assert_eq!(info.role(), Role::Supervisor);
        assert_eq!(info.extra["name"], "Bat");
    }

    #[test]
    fn test_blank_token_counts_as_missing() {
        assert_eq!(Credentials::bearer("  ").token(), None);
        assert_eq!(Credentials::default().token(), None);
        assert_eq!(Credentials::bearer("abc").token(), Some("abc"));
    }

    #[test]
    fn test_unknown_role_policy() {
        assert!(!View::NotificationBell.allowed_for(Role::Unknown, UnknownRolePolicy::Deny));
        assert!(View::NotificationBell.allowed_for(Role::Unknown, UnknownRolePolicy::ReadOnly));
        assert!(!View::ProposedTopics.allowed_for(Role::Unknown, UnknownRolePolicy::ReadOnly));
        assert!(View::ProposedTopics.allowed_for(Role::Supervisor, UnknownRolePolicy::Deny));
        assert!(!View::NotificationComposer.allowed_for(Role::Student, UnknownRolePolicy::Deny));
        assert_eq!("read-only".parse::<UnknownRolePolicy>(), Ok(UnknownRolePolicy::ReadOnly));
        assert!("maybe".parse::<UnknownRolePolicy>().is_err());
    }
}
