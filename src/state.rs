use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::Store;
use crate::notify::Notifier;
use crate::services::{ContentService, TeamService};
use crate::uploads::LocalUploads;

/// Shared handles every handler gets through `State`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub uploads: Arc<LocalUploads>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        let uploads = Arc::new(LocalUploads::new(&config.uploads));
        Self {
            config: Arc::new(config),
            store,
            uploads,
            notifier,
        }
    }

    pub fn team(&self) -> TeamService {
        TeamService::new(self.store.clone())
    }

    pub fn content(&self) -> ContentService {
        ContentService::new(self.store.clone())
    }
}
