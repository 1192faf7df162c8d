use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post, put},
    Router,
};
use bytes::Bytes;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::dto::{ApplyForm, UpdateStatusRequest};
use crate::{
    auth::extractors::{CandidateUser, EmployerUser},
    db::models::{
        Application, CandidateApplication, JobApplication, NewApplication, StatusChange,
    },
    error::{ApiError, ApiResponse, ApiResult},
    extract::{ApiJson, ApiMultipart, ApiPath, INVALID_FORM},
    jobs::{dto::split_skills, handlers::owned_job},
    state::AppState,
    storage::ext_from_mime,
};

const MAX_RESUME_BYTES: usize = 5 * 1024 * 1024;

pub fn application_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/applications/apply/:job_id",
            post(apply_for_job).layer(DefaultBodyLimit::max(MAX_RESUME_BYTES + 64 * 1024)),
        )
        .route("/applications/my-applications", get(my_applications))
        .route("/applications/job/:job_id", get(job_applications))
        .route("/applications/:id/status", put(update_status))
}

struct ResumeUpload {
    content_type: String,
    body: Bytes,
}

fn bad_form(e: impl std::fmt::Display) -> ApiError {
    warn!(error = %e, "malformed multipart body");
    ApiError::validation(INVALID_FORM)
}

async fn read_apply_form(
    mut mp: Multipart,
) -> ApiResult<(ApplyForm, Option<ResumeUpload>)> {
    let mut form = ApplyForm::default();
    let mut resume = None;
    while let Some(field) = mp.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resume" => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let body = field.bytes().await.map_err(bad_form)?;
                resume = Some(ResumeUpload { content_type, body });
            }
            "name" => form.name = Some(field.text().await.map_err(bad_form)?),
            "email" => form.email = Some(field.text().await.map_err(bad_form)?),
            "phone" => form.phone = Some(field.text().await.map_err(bad_form)?),
            "skills" | "skills[]" => {
                let text = field.text().await.map_err(bad_form)?;
                form.skills.extend(split_skills(&text));
            }
            _ => {}
        }
    }
    Ok((form, resume))
}

#[instrument(skip(state, identity, mp), fields(user_id = %identity.id))]
pub async fn apply_for_job(
    State(state): State<AppState>,
    CandidateUser(identity): CandidateUser,
    ApiPath(job_id): ApiPath<String>,
    ApiMultipart(mp): ApiMultipart,
) -> ApiResult<ApiResponse<Application>> {
    let (form, resume) = read_apply_form(mp).await?;

    let Some(resume) = resume.filter(|r| !r.body.is_empty()) else {
        return Err(ApiError::validation("Resume file is required"));
    };
    let Some(ext) = ext_from_mime(&resume.content_type) else {
        warn!(content_type = %resume.content_type, "unsupported resume type");
        return Err(ApiError::validation("Only PDF and Word documents are allowed"));
    };
    if resume.body.len() > MAX_RESUME_BYTES {
        return Err(ApiError::validation("Resume file must be 5MB or smaller"));
    }

    let text = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let (Some(name), Some(email), Some(phone)) =
        (text(form.name), text(form.email), text(form.phone))
    else {
        return Err(ApiError::validation("Name, email and phone are required"));
    };

    let job = state
        .db
        .get_job_by_id(&job_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    if state
        .db
        .find_existing_application(job.id.as_str(), identity.id.as_str())
        .await?
        .is_some()
    {
        warn!(job_id = %job.id, "duplicate application");
        return Err(ApiError::validation("You have already applied for this job"));
    }

    let key = format!("resumes/{}/{}.{}", identity.id, Uuid::new_v4(), ext);
    let resume_path = state
        .resumes
        .put_object(&key, resume.body, &resume.content_type)
        .await
        .map_err(|e| ApiError::internal("Failed to store resume", e))?;

    let created = state
        .db
        .create_application(NewApplication {
            job_id: job.id.clone(),
            candidate_id: identity.id.clone(),
            name,
            email,
            phone,
            skills: form.skills,
            resume_path,
        })
        .await;
    let application = match created {
        Ok(a) => a,
        Err(e) => {
            if let Err(cleanup) = state.resumes.delete_object(&key).await {
                error!(error = %cleanup, %key, "orphaned resume left behind");
            }
            return Err(e.into());
        }
    };

    info!(application_id = %application.id, job_id = %job.id, "application submitted");
    Ok(ApiResponse::created(application).with_message("Application submitted successfully"))
}

#[instrument(skip(state, identity), fields(user_id = %identity.id))]
pub async fn my_applications(
    State(state): State<AppState>,
    CandidateUser(identity): CandidateUser,
) -> ApiResult<ApiResponse<Vec<CandidateApplication>>> {
    let applications = state.db.get_applications_by_candidate(identity.id.as_str()).await?;
    Ok(ApiResponse::ok(applications))
}

#[instrument(skip(state, identity), fields(user_id = %identity.id))]
pub async fn job_applications(
    State(state): State<AppState>,
    EmployerUser(identity): EmployerUser,
    ApiPath(job_id): ApiPath<String>,
) -> ApiResult<ApiResponse<Vec<JobApplication>>> {
    let denied = "Not authorized to view applications for this job";
    owned_job(&state, &job_id, &identity, denied).await?;
    let applications = state.db.get_applications_by_job(&job_id).await?;
    Ok(ApiResponse::ok(applications))
}

#[instrument(skip(state, identity, payload), fields(user_id = %identity.id))]
pub async fn update_status(
    State(state): State<AppState>,
    EmployerUser(identity): EmployerUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(payload): ApiJson<UpdateStatusRequest>,
) -> ApiResult<ApiResponse<Application>> {
    let change = StatusChange::try_from(payload)?;

    let application = state
        .db
        .find_application_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Application not found"))?;

    let Some(job) = application.job_id.as_ref() else {
        warn!(application_id = %application.id, "application references a deleted job");
        return Err(ApiError::not_found("Job not found"));
    };
    if job.created_by != identity.id {
        warn!(application_id = %application.id, owner = %job.created_by, "not the job owner");
        return Err(ApiError::forbidden("Not authorized to update this application"));
    }
    if application.status.is_terminal() {
        warn!(
            application_id = %application.id,
            status = %application.status,
            "status already final"
        );
        return Err(ApiError::validation(format!(
            "Application is already {}",
            application.status
        )));
    }

    let updated = state
        .db
        .update_application_status(&id, change)
        .await?
        .ok_or_else(|| ApiError::not_found("Application not found"))?;

    info!(application_id = %updated.id, status = %updated.status, "application status updated");
    Ok(ApiResponse::ok(updated).with_message("Application status updated successfully"))
}
