use super::user::{QueryUser, Role};
use serde::{Deserialize, Serialize};

/// Tenant membership an invite grants once redeemed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitedTenant {
    pub id: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteParams {
    pub tenant: InvitedTenant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteTicket {
    pub invite_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub query: QueryUser,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Parameters for creating a ticket; the API assigns the invite id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInviteTicket {
    pub query: QueryUser,
    pub invited_params: InviteParams,
}

/// Invites grouped by the tenant they belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteItem {
    pub tenant_id: String,
    #[serde(default)]
    pub invites: Vec<InviteTicket>,
}
