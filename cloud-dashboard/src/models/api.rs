//! Wire contract of the cloud API.
//!
//! Every call is a single JSON object posted to one endpoint. The object holds
//! the operation payload plus a `type` tag naming the operation and an `auth`
//! credential. Responses carry a matching `type` tag (`reqX` → `resX`).

use super::invite::{InviteItem, InviteTicket, NewInviteTicket};
use super::ledger::{Ledger, LedgerRef, LedgerUpdate, NewLedger};
use super::tenant::{NewTenant, Tenant, TenantUpdate};
use super::user::{QueryUser, Role, User, UserTenant};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every operation the API understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    EnsureUser,
    FindUser,
    CreateTenant,
    UpdateTenant,
    DeleteTenant,
    RedeemInvite,
    ListTenantsByUser,
    InviteUser,
    ListInvites,
    DeleteInvite,
    UpdateUserTenant,
    CreateLedger,
    UpdateLedger,
    DeleteLedger,
    ListLedgersByUser,
}

impl Operation {
    pub const ALL: [Operation; 15] = [
        Operation::EnsureUser,
        Operation::FindUser,
        Operation::CreateTenant,
        Operation::UpdateTenant,
        Operation::DeleteTenant,
        Operation::RedeemInvite,
        Operation::ListTenantsByUser,
        Operation::InviteUser,
        Operation::ListInvites,
        Operation::DeleteInvite,
        Operation::UpdateUserTenant,
        Operation::CreateLedger,
        Operation::UpdateLedger,
        Operation::DeleteLedger,
        Operation::ListLedgersByUser,
    ];

    /// Operation name, also used as the query cache key prefix.
    pub fn name(self) -> &'static str {
        match self {
            Operation::EnsureUser => "ensureUser",
            Operation::FindUser => "findUser",
            Operation::CreateTenant => "createTenant",
            Operation::UpdateTenant => "updateTenant",
            Operation::DeleteTenant => "deleteTenant",
            Operation::RedeemInvite => "redeemInvite",
            Operation::ListTenantsByUser => "listTenantsByUser",
            Operation::InviteUser => "inviteUser",
            Operation::ListInvites => "listInvites",
            Operation::DeleteInvite => "deleteInvite",
            Operation::UpdateUserTenant => "updateUserTenant",
            Operation::CreateLedger => "createLedger",
            Operation::UpdateLedger => "updateLedger",
            Operation::DeleteLedger => "deleteLedger",
            Operation::ListLedgersByUser => "listLedgersByUser",
        }
    }

    pub fn request_tag(self) -> &'static str {
        match self {
            Operation::EnsureUser => "reqEnsureUser",
            Operation::FindUser => "reqFindUser",
            Operation::CreateTenant => "reqCreateTenant",
            Operation::UpdateTenant => "reqUpdateTenant",
            Operation::DeleteTenant => "reqDeleteTenant",
            Operation::RedeemInvite => "reqRedeemInvite",
            Operation::ListTenantsByUser => "reqListTenantsByUser",
            Operation::InviteUser => "reqInviteUser",
            Operation::ListInvites => "reqListInvites",
            Operation::DeleteInvite => "reqDeleteInvite",
            Operation::UpdateUserTenant => "reqUpdateUserTenant",
            Operation::CreateLedger => "reqCreateLedger",
            Operation::UpdateLedger => "reqUpdateLedger",
            Operation::DeleteLedger => "reqDeleteLedger",
            Operation::ListLedgersByUser => "reqListLedgersByUser",
        }
    }

    pub fn response_tag(self) -> &'static str {
        match self {
            Operation::EnsureUser => "resEnsureUser",
            Operation::FindUser => "resFindUser",
            Operation::CreateTenant => "resCreateTenant",
            Operation::UpdateTenant => "resUpdateTenant",
            Operation::DeleteTenant => "resDeleteTenant",
            Operation::RedeemInvite => "resRedeemInvite",
            Operation::ListTenantsByUser => "resListTenantsByUser",
            Operation::InviteUser => "resInviteUser",
            Operation::ListInvites => "resListInvites",
            Operation::DeleteInvite => "resDeleteInvite",
            Operation::UpdateUserTenant => "resUpdateUserTenant",
            Operation::CreateLedger => "resCreateLedger",
            Operation::UpdateLedger => "resUpdateLedger",
            Operation::DeleteLedger => "resDeleteLedger",
            Operation::ListLedgersByUser => "resListLedgersByUser",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Credential attached to every request as `auth`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Credential {
    /// Session JWT issued by the identity provider.
    Clerk { token: String },
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Clerk { .. } => f
                .debug_struct("Clerk")
                .field("token", &"[REDACTED]")
                .finish(),
        }
    }
}

/// A request payload paired with its operation and response type.
///
/// The payload is serialized as a JSON object; `type` and `auth` are added by
/// the client and overwrite any same-named fields of the payload.
pub trait ApiRequest: Serialize + Send + Sync {
    const OPERATION: Operation;
    type Response: DeserializeOwned + Send + 'static;
}

macro_rules! api_request {
    ($($req:ty => $res:ty : $op:ident),+ $(,)?) => {
        $(
            impl ApiRequest for $req {
                const OPERATION: Operation = Operation::$op;
                type Response = $res;
            }
        )+
    };
}

api_request! {
    ReqEnsureUser => ResEnsureUser : EnsureUser,
    ReqFindUser => ResFindUser : FindUser,
    ReqCreateTenant => ResCreateTenant : CreateTenant,
    ReqUpdateTenant => ResUpdateTenant : UpdateTenant,
    ReqDeleteTenant => ResDeleteTenant : DeleteTenant,
    ReqRedeemInvite => ResRedeemInvite : RedeemInvite,
    ReqListTenantsByUser => ResListTenantsByUser : ListTenantsByUser,
    ReqInviteUser => ResInviteUser : InviteUser,
    ReqListInvites => ResListInvites : ListInvites,
    ReqDeleteInvite => ResDeleteInvite : DeleteInvite,
    ReqUpdateUserTenant => ResUpdateUserTenant : UpdateUserTenant,
    ReqCreateLedger => ResCreateLedger : CreateLedger,
    ReqUpdateLedger => ResUpdateLedger : UpdateLedger,
    ReqDeleteLedger => ResDeleteLedger : DeleteLedger,
    ReqListLedgersByUser => ResListLedgersByUser : ListLedgersByUser,
}

// -- users ---------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReqEnsureUser {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResEnsureUser {
    pub user: User,
    #[serde(default)]
    pub tenants: Vec<UserTenant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReqFindUser {
    pub query: QueryUser,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResFindUser {
    #[serde(default)]
    pub query: QueryUser,
    #[serde(default)]
    pub results: Vec<User>,
}

// -- tenants -------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReqCreateTenant {
    pub tenant: NewTenant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResCreateTenant {
    pub tenant: Tenant,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReqUpdateTenant {
    pub tenant: TenantUpdate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResUpdateTenant {
    pub tenant: Tenant,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReqDeleteTenant {
    pub tenant_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResDeleteTenant {
    pub tenant_id: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReqListTenantsByUser {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResListTenantsByUser {
    pub user_id: String,
    pub auth_user_id: String,
    #[serde(default)]
    pub tenants: Vec<UserTenant>,
}

impl Default for ResListTenantsByUser {
    fn default() -> Self {
        Self {
            user_id: "unk".to_string(),
            auth_user_id: "unk".to_string(),
            tenants: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReqUpdateUserTenant {
    pub tenant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResUpdateUserTenant {
    pub tenant_id: String,
    pub user_id: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// -- invites -------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReqRedeemInvite {
    pub query: QueryUser,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResRedeemInvite {
    #[serde(default)]
    pub invites: Vec<InviteTicket>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReqInviteUser {
    pub ticket: NewInviteTicket,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResInviteUser {
    pub invite: InviteTicket,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReqListInvites {
    pub tenant_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResListInvites {
    #[serde(default)]
    pub tickets: Vec<InviteItem>,
}

impl ResListInvites {
    pub fn for_tenant(&self, tenant_id: &str) -> &[InviteTicket] {
        self.tickets
            .iter()
            .find(|item| item.tenant_id == tenant_id)
            .map(|item| item.invites.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReqDeleteInvite {
    pub invite_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResDeleteInvite {
    pub invite_id: String,
}

// -- ledgers -------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReqCreateLedger {
    pub ledger: NewLedger,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResCreateLedger {
    pub ledger: Ledger,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReqUpdateLedger {
    pub ledger: LedgerUpdate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResUpdateLedger {
    pub ledger: Ledger,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReqDeleteLedger {
    pub ledger: LedgerRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResDeleteLedger {
    pub ledger: LedgerRef,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReqListLedgersByUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResListLedgersByUser {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub ledgers: Vec<Ledger>,
}

impl ResListLedgersByUser {
    pub fn for_tenant<'a>(&'a self, tenant_id: &'a str) -> impl Iterator<Item = &'a Ledger> + 'a {
        self.ledgers.iter().filter(move |l| l.tenant_id == tenant_id)
    }
}
