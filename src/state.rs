use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::AppConfig;
use crate::db::{selector, Database};
use crate::storage::{self, ResumeStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Database,
    pub resumes: Arc<dyn ResumeStore>,
}

impl AppState {
    /// Picks the storage backend (fatal in production if the database is
    /// unreachable) and the resume store.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let db = selector::select_backend(&config).await?;
        let resumes = storage::build(&config.uploads).await?;
        Ok(Self::from_parts(config, db, resumes))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        db: Database,
        resumes: Arc<dyn ResumeStore>,
    ) -> Self {
        Self { config, db, resumes }
    }
}

impl FromRef<AppState> for Database {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

#[cfg(test)]
impl AppState {
    /// In-memory database and local resume storage under `upload_dir`.
    pub fn for_tests(upload_dir: &std::path::Path) -> Self {
        Self::for_tests_with_db(upload_dir, Database::ephemeral())
    }

    pub fn for_tests_with_db(upload_dir: &std::path::Path, db: Database) -> Self {
        use crate::config::{AppEnv, JwtConfig, UploadConfig};
        use crate::storage::LocalDiskStorage;

        let config = Arc::new(AppConfig {
            env: AppEnv::Development,
            database_url: None,
            connect_timeout_secs: 1,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test".into(),
                audience: "test".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            uploads: UploadConfig {
                dir: upload_dir.to_path_buf(),
                s3: None,
            },
        });
        let resumes = Arc::new(LocalDiskStorage::new(upload_dir)) as Arc<dyn ResumeStore>;
        Self::from_parts(config, db, resumes)
    }
}
