use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};

use super::models::{
    normalize_email, Application, ApplicationWithJob, CandidateApplication, Job, JobApplication,
    JobPatch, JobRef, NewApplication, NewJob, PopulatedJob, Role, StatusChange, User, UserRef,
};
use super::object_id::ObjectId;
use super::repository::Repository;

/// Durable backend. Population is done with `LEFT JOIN`s so a dangling
/// reference comes back as `None`, matching the in-memory store.
///
/// There is no unique index on `(job_id, candidate_id)`: duplicate
/// applications are prevented by the caller's check-then-create, which two
/// concurrent requests for the same pair can race past.
#[derive(Clone)]
pub struct PgRepository {
    db: PgPool,
}

impl PgRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn user_from_row(row: &PgRow) -> anyhow::Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: row.try_get::<String, _>("role")?.parse::<Role>()?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Reads job columns, optionally prefixed (`j_title`, ...) when the job was joined.
fn job_from_row(row: &PgRow, prefix: &str) -> anyhow::Result<Job> {
    let col = |name: &str| format!("{prefix}{name}");
    Ok(Job {
        id: row.try_get(col("id").as_str())?,
        title: row.try_get(col("title").as_str())?,
        description: row.try_get(col("description").as_str())?,
        skills_required: row.try_get(col("skills_required").as_str())?,
        experience: row.try_get(col("experience").as_str())?,
        company_name: row.try_get(col("company_name").as_str())?,
        created_by: row.try_get(col("created_by").as_str())?,
        created_at: row.try_get(col("created_at").as_str())?,
        updated_at: row.try_get(col("updated_at").as_str())?,
    })
}

fn populated_job_from_row(row: &PgRow) -> anyhow::Result<PopulatedJob> {
    let job = job_from_row(row, "")?;
    let name: Option<String> = row.try_get("creator_name")?;
    let email: Option<String> = row.try_get("creator_email")?;
    let creator = match (name, email) {
        (Some(name), Some(email)) => Some(UserRef {
            id: job.created_by.clone(),
            name,
            email,
        }),
        _ => None,
    };
    Ok(job.with_creator(creator))
}

fn application_from_row(row: &PgRow) -> anyhow::Result<Application> {
    Ok(Application {
        id: row.try_get("id")?,
        job_id: row.try_get("job_id")?,
        candidate_id: row.try_get("candidate_id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        skills: row.try_get("skills")?,
        resume_path: row.try_get("resume_path")?,
        status: row.try_get::<String, _>("status")?.parse()?,
        appointment_date: row.try_get("appointment_date")?,
        appointment_time: row.try_get("appointment_time")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl Repository for PgRepository {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> anyhow::Result<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, password_hash, role, created_at, updated_at
            "#,
        )
        .bind(ObjectId::new())
        .bind(name.trim())
        .bind(normalize_email(email))
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(&self.db)
        .await
        .context("insert user")?;
        user_from_row(&row)
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_id(&self, id: &ObjectId) -> anyhow::Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn count_users(&self) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await
            .context("count users")?;
        Ok(count.max(0) as u64)
    }

    async fn list_users(&self, limit: usize) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, email, password_hash, role, created_at, updated_at
            FROM users
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.db)
        .await
        .context("list users")?;
        rows.iter().map(user_from_row).collect()
    }

    async fn create_job(&self, job: NewJob, created_by: &ObjectId) -> anyhow::Result<PopulatedJob> {
        let row = sqlx::query(
            r#"
            WITH inserted AS (
                INSERT INTO jobs
                    (id, title, description, skills_required, experience, company_name, created_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            )
            SELECT j.id, j.title, j.description, j.skills_required, j.experience, j.company_name,
                   j.created_by, j.created_at, j.updated_at,
                   u.name AS creator_name, u.email AS creator_email
            FROM inserted j
            LEFT JOIN users u ON u.id = j.created_by
            "#,
        )
        .bind(ObjectId::new())
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.skills_required)
        .bind(&job.experience)
        .bind(&job.company_name)
        .bind(created_by)
        .fetch_one(&self.db)
        .await
        .context("insert job")?;
        populated_job_from_row(&row)
    }

    async fn find_all_jobs(&self) -> anyhow::Result<Vec<PopulatedJob>> {
        let rows = sqlx::query(
            r#"
            SELECT j.id, j.title, j.description, j.skills_required, j.experience, j.company_name,
                   j.created_by, j.created_at, j.updated_at,
                   u.name AS creator_name, u.email AS creator_email
            FROM jobs j
            LEFT JOIN users u ON u.id = j.created_by
            ORDER BY j.created_at DESC, j.id DESC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list jobs")?;
        rows.iter().map(populated_job_from_row).collect()
    }

    async fn find_job_by_id(&self, id: &ObjectId) -> anyhow::Result<Option<PopulatedJob>> {
        let row = sqlx::query(
            r#"
            SELECT j.id, j.title, j.description, j.skills_required, j.experience, j.company_name,
                   j.created_by, j.created_at, j.updated_at,
                   u.name AS creator_name, u.email AS creator_email
            FROM jobs j
            LEFT JOIN users u ON u.id = j.created_by
            WHERE j.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find job by id")?;
        row.as_ref().map(populated_job_from_row).transpose()
    }

    async fn find_job_by_id_raw(&self, id: &ObjectId) -> anyhow::Result<Option<Job>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, description, skills_required, experience, company_name,
                   created_by, created_at, updated_at
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find raw job by id")?;
        row.as_ref().map(|r| job_from_row(r, "")).transpose()
    }

    async fn update_job(&self, id: &ObjectId, patch: JobPatch) -> anyhow::Result<Option<Job>> {
        let row = sqlx::query(
            r#"
            UPDATE jobs
               SET title           = COALESCE($2, title),
                   description     = COALESCE($3, description),
                   skills_required = COALESCE($4, skills_required),
                   experience      = COALESCE($5, experience),
                   company_name    = COALESCE($6, company_name),
                   updated_at      = now()
             WHERE id = $1
            RETURNING id, title, description, skills_required, experience, company_name,
                      created_by, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.skills_required)
        .bind(patch.experience)
        .bind(patch.company_name)
        .fetch_optional(&self.db)
        .await
        .context("update job")?;
        row.as_ref().map(|r| job_from_row(r, "")).transpose()
    }

    async fn delete_job(&self, id: &ObjectId) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete job")?;
        Ok(res.rows_affected() > 0)
    }

    async fn create_application(&self, application: NewApplication) -> anyhow::Result<Application> {
        let row = sqlx::query(
            r#"
            INSERT INTO applications
                (id, job_id, candidate_id, name, email, phone, skills, resume_path, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'applied')
            RETURNING id, job_id, candidate_id, name, email, phone, skills, resume_path, status,
                      appointment_date, appointment_time, created_at, updated_at
            "#,
        )
        .bind(ObjectId::new())
        .bind(&application.job_id)
        .bind(&application.candidate_id)
        .bind(&application.name)
        .bind(&application.email)
        .bind(&application.phone)
        .bind(&application.skills)
        .bind(&application.resume_path)
        .fetch_one(&self.db)
        .await
        .context("insert application")?;
        application_from_row(&row)
    }

    async fn find_existing_application(
        &self,
        job_id: &ObjectId,
        candidate_id: &ObjectId,
    ) -> anyhow::Result<Option<Application>> {
        let row = sqlx::query(
            r#"
            SELECT id, job_id, candidate_id, name, email, phone, skills, resume_path, status,
                   appointment_date, appointment_time, created_at, updated_at
            FROM applications
            WHERE job_id = $1 AND candidate_id = $2
            LIMIT 1
            "#,
        )
        .bind(job_id)
        .bind(candidate_id)
        .fetch_optional(&self.db)
        .await
        .context("find existing application")?;
        row.as_ref().map(application_from_row).transpose()
    }

    async fn find_applications_by_candidate(
        &self,
        candidate_id: &ObjectId,
    ) -> anyhow::Result<Vec<CandidateApplication>> {
        let rows = sqlx::query(
            r#"
            SELECT a.id, a.job_id, a.candidate_id, a.name, a.email, a.phone, a.skills,
                   a.resume_path, a.status, a.appointment_date, a.appointment_time,
                   a.created_at, a.updated_at,
                   j.title AS job_title, j.company_name AS job_company_name
            FROM applications a
            LEFT JOIN jobs j ON j.id = a.job_id
            WHERE a.candidate_id = $1
            ORDER BY a.created_at DESC, a.id DESC
            "#,
        )
        .bind(candidate_id)
        .fetch_all(&self.db)
        .await
        .context("list applications by candidate")?;

        rows.iter()
            .map(|row| {
                let application = application_from_row(row)?;
                let title: Option<String> = row.try_get("job_title")?;
                let company_name: Option<String> = row.try_get("job_company_name")?;
                let job = match (title, company_name) {
                    (Some(title), Some(company_name)) => Some(JobRef {
                        id: application.job_id.clone(),
                        title,
                        company_name,
                    }),
                    _ => None,
                };
                Ok(application.with_job(job))
            })
            .collect()
    }

    async fn find_applications_by_job(
        &self,
        job_id: &ObjectId,
    ) -> anyhow::Result<Vec<JobApplication>> {
        let rows = sqlx::query(
            r#"
            SELECT a.id, a.job_id, a.candidate_id, a.name, a.email, a.phone, a.skills,
                   a.resume_path, a.status, a.appointment_date, a.appointment_time,
                   a.created_at, a.updated_at,
                   u.name AS candidate_name, u.email AS candidate_email
            FROM applications a
            LEFT JOIN users u ON u.id = a.candidate_id
            WHERE a.job_id = $1
            ORDER BY a.created_at DESC, a.id DESC
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.db)
        .await
        .context("list applications by job")?;

        rows.iter()
            .map(|row| {
                let application = application_from_row(row)?;
                let name: Option<String> = row.try_get("candidate_name")?;
                let email: Option<String> = row.try_get("candidate_email")?;
                let candidate = match (name, email) {
                    (Some(name), Some(email)) => Some(UserRef {
                        id: application.candidate_id.clone(),
                        name,
                        email,
                    }),
                    _ => None,
                };
                Ok(application.with_candidate(candidate))
            })
            .collect()
    }

    async fn find_application_by_id(
        &self,
        id: &ObjectId,
    ) -> anyhow::Result<Option<ApplicationWithJob>> {
        let row = sqlx::query(
            r#"
            SELECT a.id, a.job_id, a.candidate_id, a.name, a.email, a.phone, a.skills,
                   a.resume_path, a.status, a.appointment_date, a.appointment_time,
                   a.created_at, a.updated_at,
                   j.id AS j_id, j.title AS j_title, j.description AS j_description,
                   j.skills_required AS j_skills_required, j.experience AS j_experience,
                   j.company_name AS j_company_name, j.created_by AS j_created_by,
                   j.created_at AS j_created_at, j.updated_at AS j_updated_at
            FROM applications a
            LEFT JOIN jobs j ON j.id = a.job_id
            WHERE a.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find application by id")?;

        let Some(row) = row else {
            return Ok(None);
        };
        let application = application_from_row(&row)?;
        let joined: Option<ObjectId> = row.try_get("j_id")?;
        let job = match joined {
            Some(_) => Some(job_from_row(&row, "j_")?),
            None => None,
        };
        Ok(Some(application.with_full_job(job)))
    }

    async fn update_application_status(
        &self,
        id: &ObjectId,
        change: StatusChange,
    ) -> anyhow::Result<Option<Application>> {
        let (date, time) = change.appointment();
        // Status and appointment land in one statement.
        let row = sqlx::query(
            r#"
            UPDATE applications
               SET status           = $2,
                   appointment_date = $3,
                   appointment_time = $4,
                   updated_at       = now()
             WHERE id = $1
            RETURNING id, job_id, candidate_id, name, email, phone, skills, resume_path, status,
                      appointment_date, appointment_time, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(change.status().as_str())
        .bind(date)
        .bind(time)
        .fetch_optional(&self.db)
        .await
        .context("update application status")?;
        row.as_ref().map(application_from_row).transpose()
    }
}
