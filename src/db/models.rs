use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::object_id::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Candidate,
    Employer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Candidate => "candidate",
            Role::Employer => "employer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "candidate" => Ok(Role::Candidate),
            "employer" => Ok(Role::Employer),
            other => anyhow::bail!("unknown role {other:?}"),
        }
    }
}

/// User record. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Populated user reference: `{_id, name, email}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRef {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserRef {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            name: u.name.clone(),
            email: u.email.clone(),
        }
    }
}

/// Job posting, generic over the creator reference so raw and populated
/// reads are distinct types.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job<C = ObjectId> {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    pub skills_required: Vec<String>,
    pub experience: String,
    pub company_name: String,
    pub created_by: C,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Job with its creator replaced by `{_id, name, email}` (or null when the
/// creator no longer exists).
pub type PopulatedJob = Job<Option<UserRef>>;

impl Job {
    pub fn with_creator(self, creator: Option<UserRef>) -> PopulatedJob {
        Job {
            id: self.id,
            title: self.title,
            description: self.description,
            skills_required: self.skills_required,
            experience: self.experience,
            company_name: self.company_name,
            created_by: creator,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Populated job reference: `{_id, title, companyName}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRef {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub company_name: String,
}

impl<C> From<&Job<C>> for JobRef {
    fn from(j: &Job<C>) -> Self {
        Self {
            id: j.id.clone(),
            title: j.title.clone(),
            company_name: j.company_name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub skills_required: Vec<String>,
    pub experience: String,
    pub company_name: String,
}

/// Partial job update; `None` fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub skills_required: Option<Vec<String>>,
    pub experience: Option<String>,
    pub company_name: Option<String>,
}

impl JobPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.skills_required.is_none()
            && self.experience.is_none()
            && self.company_name.is_none()
    }

    pub fn apply(self, job: &mut Job) {
        if let Some(v) = self.title {
            job.title = v;
        }
        if let Some(v) = self.description {
            job.description = v;
        }
        if let Some(v) = self.skills_required {
            job.skills_required = v;
        }
        if let Some(v) = self.experience {
            job.experience = v;
        }
        if let Some(v) = self.company_name {
            job.company_name = v;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Applied,
    Selected,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Selected => "selected",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    /// `selected` and `rejected` are final.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApplicationStatus::Applied)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "applied" => Ok(ApplicationStatus::Applied),
            "selected" => Ok(ApplicationStatus::Selected),
            "rejected" => Ok(ApplicationStatus::Rejected),
            other => anyhow::bail!("unknown application status {other:?}"),
        }
    }
}

/// A status transition out of `applied`. Selecting a candidate always
/// carries the interview appointment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChange {
    Selected { date: String, time: String },
    Rejected,
}

impl StatusChange {
    pub fn status(&self) -> ApplicationStatus {
        match self {
            StatusChange::Selected { .. } => ApplicationStatus::Selected,
            StatusChange::Rejected => ApplicationStatus::Rejected,
        }
    }

    pub fn appointment(&self) -> (Option<&str>, Option<&str>) {
        match self {
            StatusChange::Selected { date, time } => (Some(date), Some(time)),
            StatusChange::Rejected => (None, None),
        }
    }
}

/// Application, generic over its job and candidate references.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Application<J = ObjectId, C = ObjectId> {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub job_id: J,
    pub candidate_id: C,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub skills: Vec<String>,
    pub resume_path: String,
    pub status: ApplicationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_time: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Application as listed for its candidate: job populated.
pub type CandidateApplication = Application<Option<JobRef>, ObjectId>;
/// Application as listed for the job owner: candidate populated.
pub type JobApplication = Application<ObjectId, Option<UserRef>>;
/// Application with the full raw job, used for ownership checks.
pub type ApplicationWithJob = Application<Option<Job>, ObjectId>;

impl Application {
    pub fn map_refs<J, C>(self, job: J, candidate: C) -> Application<J, C> {
        Application {
            id: self.id,
            job_id: job,
            candidate_id: candidate,
            name: self.name,
            email: self.email,
            phone: self.phone,
            skills: self.skills,
            resume_path: self.resume_path,
            status: self.status,
            appointment_date: self.appointment_date,
            appointment_time: self.appointment_time,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn with_job(self, job: Option<JobRef>) -> CandidateApplication {
        let candidate = self.candidate_id.clone();
        self.map_refs(job, candidate)
    }

    pub fn with_candidate(self, candidate: Option<UserRef>) -> JobApplication {
        let job = self.job_id.clone();
        self.map_refs(job, candidate)
    }

    pub fn with_full_job(self, job: Option<Job>) -> ApplicationWithJob {
        let candidate = self.candidate_id.clone();
        self.map_refs(job, candidate)
    }
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub job_id: ObjectId,
    pub candidate_id: ObjectId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub skills: Vec<String>,
    pub resume_path: String,
}

/// Lowercase and trim an email; applied on every write and every lookup key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
