//! In-process substitute for the durable store.
//!
//! `MemoryTables` holds the three tables and performs reference population by
//! hand. `MemoryStore` puts the tables behind one lock and implements
//! [`Repository`]; every operation takes the lock once and never awaits while
//! holding it, so each insert, merge or delete is observed whole.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::info;

use super::models::{
    normalize_email, Application, ApplicationStatus, ApplicationWithJob, CandidateApplication, Job,
    JobApplication, JobPatch, JobRef, NewApplication, NewJob, PopulatedJob, Role, StatusChange,
    User, UserRef,
};
use super::object_id::ObjectId;
use super::repository::Repository;

#[derive(Debug, Default)]
pub struct MemoryTables {
    users: HashMap<ObjectId, User>,
    jobs: HashMap<ObjectId, Job>,
    applications: HashMap<ObjectId, Application>,
}

fn newest_first(
    a_created: &OffsetDateTime,
    a_id: &ObjectId,
    b_created: &OffsetDateTime,
    b_id: &ObjectId,
) -> Ordering {
    b_created.cmp(a_created).then_with(|| b_id.cmp(a_id))
}

impl MemoryTables {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- users ----

    pub fn create_user(
        &mut self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> User {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: ObjectId::new(),
            name: name.trim().to_string(),
            email: normalize_email(email),
            password_hash: password_hash.to_string(),
            role,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.id.clone(), user.clone());
        user
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<User> {
        let key = normalize_email(email);
        self.users.values().find(|u| u.email == key).cloned()
    }

    pub fn find_user_by_id(&self, id: &ObjectId) -> Option<User> {
        self.users.get(id).cloned()
    }

    pub fn count_users(&self) -> u64 {
        self.users.len() as u64
    }

    pub fn list_users(&self, limit: usize) -> Vec<User> {
        let mut users: Vec<User> = self.users.values().cloned().collect();
        users.sort_by(|a, b| newest_first(&a.created_at, &a.id, &b.created_at, &b.id));
        users.truncate(limit);
        users
    }

    fn user_ref(&self, id: &ObjectId) -> Option<UserRef> {
        self.users.get(id).map(UserRef::from)
    }

    // ---- jobs ----

    pub fn create_job(&mut self, new: NewJob, created_by: &ObjectId) -> Job {
        let now = OffsetDateTime::now_utc();
        let job = Job {
            id: ObjectId::new(),
            title: new.title,
            description: new.description,
            skills_required: new.skills_required,
            experience: new.experience,
            company_name: new.company_name,
            created_by: created_by.clone(),
            created_at: now,
            updated_at: now,
        };
        self.jobs.insert(job.id.clone(), job.clone());
        job
    }

    /// Replace the creator id with `{_id, name, email}`.
    pub fn populate_job(&self, job: Job) -> PopulatedJob {
        let creator = self.user_ref(&job.created_by);
        job.with_creator(creator)
    }

    pub fn find_all_jobs(&self) -> Vec<PopulatedJob> {
        let mut jobs: Vec<PopulatedJob> = self
            .jobs
            .values()
            .cloned()
            .map(|j| self.populate_job(j))
            .collect();
        jobs.sort_by(|a, b| newest_first(&a.created_at, &a.id, &b.created_at, &b.id));
        jobs
    }

    pub fn find_job_by_id(&self, id: &ObjectId) -> Option<PopulatedJob> {
        self.find_job_by_id_raw(id).map(|j| self.populate_job(j))
    }

    pub fn find_job_by_id_raw(&self, id: &ObjectId) -> Option<Job> {
        self.jobs.get(id).cloned()
    }

    pub fn update_job(&mut self, id: &ObjectId, patch: JobPatch) -> Option<Job> {
        let job = self.jobs.get_mut(id)?;
        patch.apply(job);
        job.updated_at = OffsetDateTime::now_utc();
        Some(job.clone())
    }

    pub fn delete_job(&mut self, id: &ObjectId) -> bool {
        self.jobs.remove(id).is_some()
    }

    // ---- applications ----

    pub fn create_application(&mut self, new: NewApplication) -> Application {
        let now = OffsetDateTime::now_utc();
        let application = Application {
            id: ObjectId::new(),
            job_id: new.job_id,
            candidate_id: new.candidate_id,
            name: new.name,
            email: new.email,
            phone: new.phone,
            skills: new.skills,
            resume_path: new.resume_path,
            status: ApplicationStatus::Applied,
            appointment_date: None,
            appointment_time: None,
            created_at: now,
            updated_at: now,
        };
        self.applications
            .insert(application.id.clone(), application.clone());
        application
    }

    pub fn find_existing_application(
        &self,
        job_id: &ObjectId,
        candidate_id: &ObjectId,
    ) -> Option<Application> {
        self.applications
            .values()
            .find(|a| &a.job_id == job_id && &a.candidate_id == candidate_id)
            .cloned()
    }

    fn applications_where(&self, pred: impl Fn(&Application) -> bool) -> Vec<Application> {
        let mut apps: Vec<Application> = self
            .applications
            .values()
            .filter(|&a| pred(a))
            .cloned()
            .collect();
        apps.sort_by(|a, b| newest_first(&a.created_at, &a.id, &b.created_at, &b.id));
        apps
    }

    /// Applications of one candidate, each with `{_id, title, companyName}` of its job.
    pub fn find_applications_by_candidate(
        &self,
        candidate_id: &ObjectId,
    ) -> Vec<CandidateApplication> {
        self.applications_where(|a| &a.candidate_id == candidate_id)
            .into_iter()
            .map(|a| {
                let job = self.jobs.get(&a.job_id).map(JobRef::from);
                a.with_job(job)
            })
            .collect()
    }

    /// Applications to one job, each with `{_id, name, email}` of its candidate.
    pub fn find_applications_by_job(&self, job_id: &ObjectId) -> Vec<JobApplication> {
        self.applications_where(|a| &a.job_id == job_id)
            .into_iter()
            .map(|a| {
                let candidate = self.user_ref(&a.candidate_id);
                a.with_candidate(candidate)
            })
            .collect()
    }

    pub fn find_application_by_id(&self, id: &ObjectId) -> Option<ApplicationWithJob> {
        let application = self.applications.get(id)?.clone();
        let job = self.jobs.get(&application.job_id).cloned();
        Some(application.with_full_job(job))
    }

    pub fn update_application_status(
        &mut self,
        id: &ObjectId,
        change: StatusChange,
    ) -> Option<Application> {
        let application = self.applications.get_mut(id)?;
        let (date, time) = change.appointment();
        application.status = change.status();
        application.appointment_date = date.map(str::to_string);
        application.appointment_time = time.map(str::to_string);
        application.updated_at = OffsetDateTime::now_utc();
        Some(application.clone())
    }
}

/// Shared, lock-guarded [`MemoryTables`]. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<MemoryTables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        info!("in-memory store initialised; data will not survive a restart");
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryStore {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> anyhow::Result<User> {
        Ok(self.tables.write().await.create_user(name, email, password_hash, role))
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.tables.read().await.find_user_by_email(email))
    }

    async fn find_user_by_id(&self, id: &ObjectId) -> anyhow::Result<Option<User>> {
        Ok(self.tables.read().await.find_user_by_id(id))
    }

    async fn count_users(&self) -> anyhow::Result<u64> {
        Ok(self.tables.read().await.count_users())
    }

    async fn list_users(&self, limit: usize) -> anyhow::Result<Vec<User>> {
        Ok(self.tables.read().await.list_users(limit))
    }

    async fn create_job(&self, job: NewJob, created_by: &ObjectId) -> anyhow::Result<PopulatedJob> {
        let mut tables = self.tables.write().await;
        let job = tables.create_job(job, created_by);
        Ok(tables.populate_job(job))
    }

    async fn find_all_jobs(&self) -> anyhow::Result<Vec<PopulatedJob>> {
        Ok(self.tables.read().await.find_all_jobs())
    }

    async fn find_job_by_id(&self, id: &ObjectId) -> anyhow::Result<Option<PopulatedJob>> {
        Ok(self.tables.read().await.find_job_by_id(id))
    }

    async fn find_job_by_id_raw(&self, id: &ObjectId) -> anyhow::Result<Option<Job>> {
        Ok(self.tables.read().await.find_job_by_id_raw(id))
    }

    async fn update_job(&self, id: &ObjectId, patch: JobPatch) -> anyhow::Result<Option<Job>> {
        Ok(self.tables.write().await.update_job(id, patch))
    }

    async fn delete_job(&self, id: &ObjectId) -> anyhow::Result<bool> {
        Ok(self.tables.write().await.delete_job(id))
    }

    async fn create_application(&self, application: NewApplication) -> anyhow::Result<Application> {
        Ok(self.tables.write().await.create_application(application))
    }

    async fn find_existing_application(
        &self,
        job_id: &ObjectId,
        candidate_id: &ObjectId,
    ) -> anyhow::Result<Option<Application>> {
        Ok(self
            .tables
            .read()
            .await
            .find_existing_application(job_id, candidate_id))
    }

    async fn find_applications_by_candidate(
        &self,
        candidate_id: &ObjectId,
    ) -> anyhow::Result<Vec<CandidateApplication>> {
        Ok(self
            .tables
            .read()
            .await
            .find_applications_by_candidate(candidate_id))
    }

    async fn find_applications_by_job(
        &self,
        job_id: &ObjectId,
    ) -> anyhow::Result<Vec<JobApplication>> {
        Ok(self.tables.read().await.find_applications_by_job(job_id))
    }

    async fn find_application_by_id(
        &self,
        id: &ObjectId,
    ) -> anyhow::Result<Option<ApplicationWithJob>> {
        Ok(self.tables.read().await.find_application_by_id(id))
    }

    async fn update_application_status(
        &self,
        id: &ObjectId,
        change: StatusChange,
    ) -> anyhow::Result<Option<Application>> {
        Ok(self.tables.write().await.update_application_status(id, change))
    }
}
