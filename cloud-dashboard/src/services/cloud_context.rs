//! Session-scoped binding between the API client and its consumers.
//!
//! `CloudContext` owns the query cache and the tenant interest sets of one
//! signed-in session. Aggregate queries (invites, ledgers) are scoped to every
//! tenant asked for so far; asking for a new tenant widens the scope and
//! refetches.

use crate::models::api::*;
use crate::models::{LedgerRef, NewInviteTicket, NewLedger, NewTenant, QueryUser, Role};
use crate::models::invite::{InviteParams, InvitedTenant};
use crate::result::CloudResult;
use crate::services::cloud_api::CloudApi;
use crate::services::interest::InterestSet;
use crate::services::query_cache::{Query, QueryCache, QueryKey};
use crate::services::session::SessionProvider;
use std::sync::Arc;

pub struct CloudContext {
    api: Arc<CloudApi>,
    cache: QueryCache,
    invite_interest: Arc<InterestSet>,
    ledger_interest: Arc<InterestSet>,
}

fn session_ready(session: &dyn SessionProvider) -> bool {
    session.is_loaded() && session.is_signed_in()
}

impl CloudContext {
    pub fn new(api: Arc<CloudApi>) -> Self {
        Self {
            api,
            cache: QueryCache::new(),
            invite_interest: Arc::new(InterestSet::new()),
            ledger_interest: Arc::new(InterestSet::new()),
        }
    }

    pub fn api(&self) -> &CloudApi {
        &self.api
    }

    pub fn invite_interest(&self) -> &InterestSet {
        &self.invite_interest
    }

    pub fn ledger_interest(&self) -> &InterestSet {
        &self.ledger_interest
    }

    fn session(&self) -> Arc<dyn SessionProvider> {
        self.api.auth().session().clone()
    }

    pub fn session_ready(&self) -> bool {
        session_ready(self.session().as_ref())
    }

    /// Session ready and the API reports the user as active.
    pub fn is_active(&self) -> bool {
        self.active_gate(|| true)()
    }

    /// Id of the current user once `ensureUser` has succeeded.
    pub fn user_id(&self) -> Option<String> {
        self.ensure_user_query()
            .read(|s| s.data.as_ref().map(|d| d.user.user_id.clone()))
    }

    fn active_gate(
        &self,
        condition: impl Fn() -> bool + Send + Sync + 'static,
    ) -> impl Fn() -> bool + Send + Sync + 'static {
        let session = self.session();
        let user = self.ensure_user_query();
        move || {
            session_ready(session.as_ref())
                && user.read(|s| s.data.as_ref().is_some_and(|d| d.user.is_active()))
                && condition()
        }
    }

    fn ensure_user_query(&self) -> Query<ResEnsureUser> {
        let api = self.api.clone();
        let session = self.session();
        self.cache.subscribe(
            QueryKey::new(Operation::EnsureUser.name(), None),
            move || {
                let api = api.clone();
                async move { api.ensure_user(&ReqEnsureUser::default()).await }
            },
            move || session_ready(session.as_ref()),
        )
    }

    fn tenants_query(&self) -> Query<ResListTenantsByUser> {
        let api = self.api.clone();
        self.cache.subscribe(
            QueryKey::new(Operation::ListTenantsByUser.name(), self.user_id()),
            move || {
                let api = api.clone();
                async move {
                    api.list_tenants_by_user(&ReqListTenantsByUser::default())
                        .await
                }
            },
            self.active_gate(|| true),
        )
    }

    fn invites_query(&self) -> Query<ResListInvites> {
        let api = self.api.clone();
        let interest = self.invite_interest.clone();
        let gate_interest = self.invite_interest.clone();
        self.cache.subscribe(
            QueryKey::new(Operation::ListInvites.name(), self.user_id()),
            move || {
                let api = api.clone();
                let tenant_ids = interest.snapshot();
                async move {
                    tracing::debug!(tenants = ?tenant_ids, "Listing invites");
                    api.list_invites(&ReqListInvites { tenant_ids }).await
                }
            },
            self.active_gate(move || !gate_interest.is_empty()),
        )
    }

    fn ledgers_query(&self) -> Query<ResListLedgersByUser> {
        let api = self.api.clone();
        let interest = self.ledger_interest.clone();
        let gate_interest = self.ledger_interest.clone();
        self.cache.subscribe(
            QueryKey::new(Operation::ListLedgersByUser.name(), self.user_id()),
            move || {
                let api = api.clone();
                let tenant_ids = interest.snapshot();
                async move {
                    tracing::debug!(tenants = ?tenant_ids, "Listing ledgers");
                    api.list_ledgers_by_user(&ReqListLedgersByUser {
                        tenant_ids: Some(tenant_ids),
                    })
                    .await
                }
            },
            self.active_gate(move || !gate_interest.is_empty()),
        )
    }

    /// The current user, fetched once per signed-in session.
    pub async fn ensure_user(&self) -> Query<ResEnsureUser> {
        let query = self.ensure_user_query();
        query.ensure().await;
        query
    }

    pub async fn list_tenants_by_user(&self) -> Query<ResListTenantsByUser> {
        self.ensure_user().await;
        let query = self.tenants_query();
        query.ensure().await;
        query
    }

    /// Invites of `tenant_id`, fetched together with those of every tenant
    /// requested earlier in the session.
    pub async fn list_invites_by_tenant(&self, tenant_id: &str) -> Query<ResListInvites> {
        self.ensure_user().await;
        let query = self.invites_query();
        if self.invite_interest.insert(tenant_id) {
            tracing::debug!(tenant_id = %tenant_id, "Widening invite scope");
            query.refetch().await;
        } else {
            query.ensure().await;
        }
        query
    }

    /// Ledgers of `tenant_id`, fetched together with those of every tenant
    /// requested earlier in the session.
    pub async fn list_ledgers_by_user(&self, tenant_id: &str) -> Query<ResListLedgersByUser> {
        self.ensure_user().await;
        let query = self.ledgers_query();
        if self.ledger_interest.insert(tenant_id) {
            tracing::debug!(tenant_id = %tenant_id, "Widening ledger scope");
            query.refetch().await;
        } else {
            query.ensure().await;
        }
        query
    }

    /// Create a ledger, then refetch the ledger list so it includes the
    /// ledger's tenant.
    pub async fn create_ledger(&self, name: &str, tenant_id: &str) -> CloudResult<ResCreateLedger> {
        let created = self
            .api
            .create_ledger(&ReqCreateLedger {
                ledger: NewLedger {
                    tenant_id: tenant_id.to_string(),
                    name: name.to_string(),
                },
            })
            .await?;

        tracing::info!(
            ledger_id = %created.ledger.ledger_id,
            tenant_id = %tenant_id,
            "Ledger created"
        );

        self.ledger_interest.insert(tenant_id);
        self.ensure_user().await;
        self.ledgers_query().refetch().await;
        Ok(created)
    }

    pub async fn delete_ledger(&self, ledger_id: &str, tenant_id: &str) -> CloudResult<ResDeleteLedger> {
        let deleted = self
            .api
            .delete_ledger(&ReqDeleteLedger {
                ledger: LedgerRef {
                    ledger_id: ledger_id.to_string(),
                    tenant_id: tenant_id.to_string(),
                },
            })
            .await?;

        self.ensure_user().await;
        self.ledgers_query().refetch().await;
        Ok(deleted)
    }

    /// Create a tenant owned by the current user and refresh the tenant list.
    pub async fn create_tenant(&self, name: Option<String>) -> CloudResult<ResCreateTenant> {
        let created = self
            .api
            .create_tenant(&ReqCreateTenant {
                tenant: NewTenant { name },
            })
            .await?;

        tracing::info!(tenant_id = %created.tenant.tenant_id, "Tenant created");

        self.ensure_user().await;
        self.tenants_query().refetch().await;
        Ok(created)
    }

    pub async fn invite_user(
        &self,
        tenant_id: &str,
        query: QueryUser,
        role: Role,
    ) -> CloudResult<ResInviteUser> {
        let invited = self
            .api
            .invite_user(&ReqInviteUser {
                ticket: NewInviteTicket {
                    query,
                    invited_params: InviteParams {
                        tenant: InvitedTenant {
                            id: tenant_id.to_string(),
                            role,
                        },
                    },
                },
            })
            .await?;

        self.invite_interest.insert(tenant_id);
        self.ensure_user().await;
        self.invites_query().refetch().await;
        Ok(invited)
    }

    pub async fn delete_invite(&self, invite_id: &str) -> CloudResult<ResDeleteInvite> {
        let deleted = self
            .api
            .delete_invite(&ReqDeleteInvite {
                invite_id: invite_id.to_string(),
            })
            .await?;

        self.ensure_user().await;
        self.invites_query().refetch().await;
        Ok(deleted)
    }

    /// Forget everything tied to the current session: cached queries,
    /// in-flight fetches and both interest sets.
    pub fn sign_out(&self) {
        tracing::info!("Resetting cloud session state");
        self.cache.clear();
        self.invite_interest.clear();
        self.ledger_interest.clear();
    }
}
