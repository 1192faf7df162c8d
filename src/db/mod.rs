//! Storage layer: the [`Database`] facade over one of two [`Repository`]
//! backends, chosen once at startup by [`selector`].

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use sqlx::PgPool;
use tracing::{error, warn};

pub mod memory;
pub mod models;
pub mod object_id;
pub mod postgres;
pub mod repository;
pub mod selector;

use memory::MemoryStore;
use models::{
    Application, ApplicationWithJob, CandidateApplication, Job, JobApplication, JobPatch,
    NewApplication, NewJob, PopulatedJob, Role, StatusChange, User,
};
use object_id::ObjectId;
use postgres::PgRepository;
use repository::Repository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    Durable,
    Ephemeral,
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageMode::Durable => f.write_str("durable"),
            StorageMode::Ephemeral => f.write_str("ephemeral"),
        }
    }
}

/// The only failure callers ever see from the storage layer. The cause is
/// logged where it is translated.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage operation failed")]
    OperationFailed,
}

/// Entry point for all business logic. Callers never learn which backend is
/// active: both return the same shapes, and every backend fault becomes
/// [`StorageError::OperationFailed`]. Absent records are `None`, not errors.
#[derive(Clone)]
pub struct Database {
    repo: Arc<dyn Repository>,
    mode: StorageMode,
}

fn translate<T>(operation: &'static str, res: anyhow::Result<T>) -> Result<T, StorageError> {
    res.map_err(|e| {
        error!(operation, error = ?e, "storage operation failed");
        StorageError::OperationFailed
    })
}

fn parse_id(operation: &'static str, raw: &str) -> Result<ObjectId, StorageError> {
    raw.parse().map_err(|e| {
        warn!(operation, error = %e, "malformed record id");
        StorageError::OperationFailed
    })
}

impl Database {
    pub fn new(repo: Arc<dyn Repository>, mode: StorageMode) -> Self {
        Self { repo, mode }
    }

    pub fn durable(db: PgPool) -> Self {
        Self::new(Arc::new(PgRepository::new(db)), StorageMode::Durable)
    }

    pub fn ephemeral() -> Self {
        Self::new(Arc::new(MemoryStore::new()), StorageMode::Ephemeral)
    }

    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    // ---- users ----

    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, StorageError> {
        translate("create_user", self.repo.create_user(name, email, password_hash, role).await)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        translate("find_user_by_email", self.repo.find_user_by_email(email).await)
    }

    pub async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StorageError> {
        let id = parse_id("find_user_by_id", id)?;
        translate("find_user_by_id", self.repo.find_user_by_id(&id).await)
    }

    pub async fn count_users(&self) -> Result<u64, StorageError> {
        translate("count_users", self.repo.count_users().await)
    }

    pub async fn list_users(&self, limit: usize) -> Result<Vec<User>, StorageError> {
        translate("list_users", self.repo.list_users(limit).await)
    }

    // ---- jobs ----

    pub async fn create_job(
        &self,
        job: NewJob,
        created_by: &str,
    ) -> Result<PopulatedJob, StorageError> {
        let created_by = parse_id("create_job", created_by)?;
        translate("create_job", self.repo.create_job(job, &created_by).await)
    }

    /// All jobs, creator populated, newest first.
    pub async fn get_all_jobs(&self) -> Result<Vec<PopulatedJob>, StorageError> {
        translate("get_all_jobs", self.repo.find_all_jobs().await)
    }

    pub async fn get_job_by_id(&self, id: &str) -> Result<Option<PopulatedJob>, StorageError> {
        let id = parse_id("get_job_by_id", id)?;
        translate("get_job_by_id", self.repo.find_job_by_id(&id).await)
    }

    /// Job with `createdBy` left as a bare id, for ownership checks.
    pub async fn get_job_by_id_raw(&self, id: &str) -> Result<Option<Job>, StorageError> {
        let id = parse_id("get_job_by_id_raw", id)?;
        translate("get_job_by_id_raw", self.repo.find_job_by_id_raw(&id).await)
    }

    pub async fn update_job(&self, id: &str, patch: JobPatch) -> Result<Option<Job>, StorageError> {
        let id = parse_id("update_job", id)?;
        translate("update_job", self.repo.update_job(&id, patch).await)
    }

    pub async fn delete_job(&self, id: &str) -> Result<bool, StorageError> {
        let id = parse_id("delete_job", id)?;
        translate("delete_job", self.repo.delete_job(&id).await)
    }

    // ---- applications ----

    pub async fn create_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, StorageError> {
        translate("create_application", self.repo.create_application(application).await)
    }

    /// Lookup by the (job, candidate) pair backing the one-application-per-job rule.
    pub async fn find_existing_application(
        &self,
        job_id: &str,
        candidate_id: &str,
    ) -> Result<Option<Application>, StorageError> {
        let job_id = parse_id("find_existing_application", job_id)?;
        let candidate_id = parse_id("find_existing_application", candidate_id)?;
        translate(
            "find_existing_application",
            self.repo
                .find_existing_application(&job_id, &candidate_id)
                .await,
        )
    }

    pub async fn get_applications_by_candidate(
        &self,
        candidate_id: &str,
    ) -> Result<Vec<CandidateApplication>, StorageError> {
        let candidate_id = parse_id("get_applications_by_candidate", candidate_id)?;
        translate(
            "get_applications_by_candidate",
            self.repo.find_applications_by_candidate(&candidate_id).await,
        )
    }

    pub async fn get_applications_by_job(
        &self,
        job_id: &str,
    ) -> Result<Vec<JobApplication>, StorageError> {
        let job_id = parse_id("get_applications_by_job", job_id)?;
        translate("get_applications_by_job", self.repo.find_applications_by_job(&job_id).await)
    }

    pub async fn update_application_status(
        &self,
        id: &str,
        change: StatusChange,
    ) -> Result<Option<Application>, StorageError> {
        let id = parse_id("update_application_status", id)?;
        translate(
            "update_application_status",
            self.repo.update_application_status(&id, change).await,
        )
    }

    pub async fn find_application_by_id(
        &self,
        id: &str,
    ) -> Result<Option<ApplicationWithJob>, StorageError> {
        let id = parse_id("find_application_by_id", id)?;
        translate("find_application_by_id", self.repo.find_application_by_id(&id).await)
    }
}
