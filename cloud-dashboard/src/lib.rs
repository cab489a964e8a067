pub mod config;
pub mod handlers;
pub mod models;
pub mod result;
pub mod services;
pub mod startup;

use services::CloudContext;
use std::sync::Arc;

/// Shared application state: the cloud context of the signed-in session.
#[derive(Clone)]
pub struct AppState {
    pub cloud: Arc<CloudContext>,
}

impl AppState {
    pub fn new(cloud: Arc<CloudContext>) -> Self {
        Self { cloud }
    }
}
