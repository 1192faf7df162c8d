use axum::{extract::State, routing::get, Router};
use tracing::{info, instrument, warn};

use super::dto::{CreateJobRequest, UpdateJobRequest};
use crate::{
    auth::extractors::{EmployerUser, Identity},
    db::models::{Job, JobPatch, PopulatedJob},
    error::{ApiError, ApiResponse, ApiResult},
    extract::{ApiJson, ApiPath},
    state::AppState,
};

pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/:id", get(get_job).put(update_job).delete(delete_job))
}

/// Raw job owned by `identity`: 404 when absent, 403 with `denied` otherwise.
pub(crate) async fn owned_job(
    state: &AppState,
    id: &str,
    identity: &Identity,
    denied: &str,
) -> ApiResult<Job> {
    let job = state
        .db
        .get_job_by_id_raw(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;
    if job.created_by != identity.id {
        warn!(
            job_id = %job.id,
            user_id = %identity.id,
            owner = %job.created_by,
            "not the job owner"
        );
        return Err(ApiError::forbidden(denied));
    }
    Ok(job)
}

#[instrument(skip(state))]
pub async fn list_jobs(
    State(state): State<AppState>,
) -> ApiResult<ApiResponse<Vec<PopulatedJob>>> {
    let jobs = state.db.get_all_jobs().await?;
    Ok(ApiResponse::ok(jobs))
}

#[instrument(skip(state))]
pub async fn get_job(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<ApiResponse<PopulatedJob>> {
    let job = state
        .db
        .get_job_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;
    Ok(ApiResponse::ok(job))
}

#[instrument(skip(state, identity, payload), fields(user_id = %identity.id))]
pub async fn create_job(
    State(state): State<AppState>,
    EmployerUser(identity): EmployerUser,
    ApiJson(payload): ApiJson<CreateJobRequest>,
) -> ApiResult<ApiResponse<PopulatedJob>> {
    let new_job = payload
        .into_new_job()
        .ok_or_else(|| ApiError::validation("All fields are required"))?;
    let job = state.db.create_job(new_job, identity.id.as_str()).await?;
    info!(job_id = %job.id, "job created");
    Ok(ApiResponse::created(job).with_message("Job created successfully"))
}

#[instrument(skip(state, identity, payload), fields(user_id = %identity.id))]
pub async fn update_job(
    State(state): State<AppState>,
    EmployerUser(identity): EmployerUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(payload): ApiJson<UpdateJobRequest>,
) -> ApiResult<ApiResponse<Job>> {
    owned_job(&state, &id, &identity, "Not authorized to update this job").await?;

    let patch = JobPatch::from(payload);
    if patch.is_empty() {
        return Err(ApiError::validation("No fields to update"));
    }

    let job = state
        .db
        .update_job(&id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;
    info!(job_id = %job.id, "job updated");
    Ok(ApiResponse::ok(job).with_message("Job updated successfully"))
}

#[instrument(skip(state, identity), fields(user_id = %identity.id))]
pub async fn delete_job(
    State(state): State<AppState>,
    EmployerUser(identity): EmployerUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<ApiResponse<()>> {
    owned_job(&state, &id, &identity, "Not authorized to delete this job").await?;
    if !state.db.delete_job(&id).await? {
        return Err(ApiError::not_found("Job not found"));
    }
    info!(job_id = %id, "job deleted");
    Ok(ApiResponse::empty("Job deleted successfully"))
}
