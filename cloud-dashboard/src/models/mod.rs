pub mod api;
pub mod invite;
pub mod ledger;
pub mod tenant;
pub mod user;

pub use api::{ApiRequest, Credential, Operation};
pub use invite::{InviteItem, InviteTicket, NewInviteTicket};
pub use ledger::{Ledger, LedgerRef, NewLedger};
pub use tenant::{NewTenant, Tenant};
pub use user::{QueryUser, Role, User, UserStatus, UserTenant};
