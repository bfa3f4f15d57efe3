use std::sync::Arc;

use anyhow::Result;
use lessondir_core::local::FileStorage;
use lessondir_core::remote::{Provider, ProviderBackend};
use lessondir_core::{
    LessonDirConfig, LocalStore, RecordStore, RemoteStore, SessionFile, StoreKind, StoreSelector,
};
use tracing::debug;

use crate::utils::tui;

/// Everything a command needs: config plus the store matching the session.
pub struct Context {
    pub config: LessonDirConfig,
    selector: StoreSelector,
}

impl Context {
    /// Load config and session, and when signed in wait for the first
    /// remote snapshot so commands see current data.
    pub async fn load() -> Result<Self> {
        let config = LessonDirConfig::load()?;

        let local = LocalStore::open(FileStorage::new(config.data_path()))?;
        let backend = ProviderBackend::new(
            Provider::from_name(&config.provider),
            config.poll_interval()?,
        );
        let remote = RemoteStore::new(Arc::new(backend));
        let selector = StoreSelector::new(local, remote);

        if let Some(identity) = SessionFile::open()?.load()? {
            selector.set_session(Some(identity));
            tui::with_spinner(
                format!("Connecting to {}", config.provider),
                selector.remote().wait_for_snapshot(),
            )
            .await?;
        }

        debug!(kind = ?selector.kind(), "Store selected");
        Ok(Context { config, selector })
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.selector.active()
    }

    pub fn kind(&self) -> StoreKind {
        self.selector.kind()
    }
}
