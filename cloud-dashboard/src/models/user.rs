use serde::{Deserialize, Serialize};

/// Activation state of a dashboard user as reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    Banned,
    Invited,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub status: UserStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tenants: Option<u32>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// Role of a user inside a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Member,
}

/// A tenant as seen from one user's membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTenant {
    pub tenant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Lookup criteria for `findUser` and invite tickets. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_nick: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_user_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_does_not_fail_decoding() {
        let user: User = serde_json::from_str(r#"{"userId":"u1","status":"pending"}"#).unwrap();
        assert_eq!(user.status, UserStatus::Unknown);
        assert!(!user.is_active());
    }

    #[test]
    fn user_tenant_without_name_decodes() {
        let tenant: UserTenant =
            serde_json::from_str(r#"{"tenantId":"T1","role":"admin"}"#).unwrap();
        assert_eq!(tenant.role, Role::Admin);
        assert!(tenant.name.is_none());
        assert_eq!(
            serde_json::to_value(&tenant).unwrap(),
            serde_json::json!({ "tenantId": "T1", "role": "admin" })
        );
    }
}
