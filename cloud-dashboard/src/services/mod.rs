pub mod auth_token;
pub mod cloud_api;
pub mod cloud_context;
pub mod interest;
pub mod query_cache;
pub mod session;

pub use auth_token::AuthTokenProvider;
pub use cloud_api::CloudApi;
pub use cloud_context::CloudContext;
pub use interest::InterestSet;
pub use query_cache::{Query, QueryCache, QueryKey, QueryState, QueryStatus};
pub use session::{SessionProvider, StaticSession, TokenOptions};
