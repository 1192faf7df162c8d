use async_trait::async_trait;

use super::models::{
    Application, ApplicationWithJob, CandidateApplication, Job, JobApplication, JobPatch,
    NewApplication, NewJob, PopulatedJob, Role, StatusChange, User,
};
use super::object_id::ObjectId;

/// Storage contract shared by the Postgres and in-memory backends.
///
/// Both implementations return identical shapes: same population depth,
/// newest-first ordering for listings, `None` for absent records.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> anyhow::Result<User>;
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_user_by_id(&self, id: &ObjectId) -> anyhow::Result<Option<User>>;
    async fn count_users(&self) -> anyhow::Result<u64>;
    async fn list_users(&self, limit: usize) -> anyhow::Result<Vec<User>>;

    async fn create_job(&self, job: NewJob, created_by: &ObjectId)
        -> anyhow::Result<PopulatedJob>;
    async fn find_all_jobs(&self) -> anyhow::Result<Vec<PopulatedJob>>;
    async fn find_job_by_id(&self, id: &ObjectId) -> anyhow::Result<Option<PopulatedJob>>;
    async fn find_job_by_id_raw(&self, id: &ObjectId) -> anyhow::Result<Option<Job>>;
    async fn update_job(&self, id: &ObjectId, patch: JobPatch) -> anyhow::Result<Option<Job>>;
    async fn delete_job(&self, id: &ObjectId) -> anyhow::Result<bool>;

    async fn create_application(&self, application: NewApplication)
        -> anyhow::Result<Application>;
    async fn find_existing_application(
        &self,
        job_id: &ObjectId,
        candidate_id: &ObjectId,
    ) -> anyhow::Result<Option<Application>>;
    async fn find_applications_by_candidate(
        &self,
        candidate_id: &ObjectId,
    ) -> anyhow::Result<Vec<CandidateApplication>>;
    async fn find_applications_by_job(
        &self,
        job_id: &ObjectId,
    ) -> anyhow::Result<Vec<JobApplication>>;
    async fn find_application_by_id(
        &self,
        id: &ObjectId,
    ) -> anyhow::Result<Option<ApplicationWithJob>>;
    async fn update_application_status(
        &self,
        id: &ObjectId,
        change: StatusChange,
    ) -> anyhow::Result<Option<Application>>;
}
