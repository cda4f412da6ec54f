// HTTP handlers for job posting endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::{CurrentUser, MaybeUser, OwnedJob};
use crate::error::{ApiError, ErrorResponse};
use crate::jobs::models::{CreateJobRequest, Job, JobResponse, UpdateJobRequest};
use crate::validation::validate_salary_range;
use crate::AppState;

/// Handler for GET /api/jobs
/// Lists open postings; `is_owner` is set for the caller's own postings
#[utoipa::path(
    get,
    path = "/api/jobs",
    responses(
        (status = 200, description = "Open job postings", body = Vec<JobResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "jobs"
)]
pub async fn list_jobs_handler(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
) -> Result<Json<Vec<JobResponse>>, ApiError> {
    let viewer_id = viewer.map(|identity| identity.user_id);
    let jobs = state.jobs.list_open_jobs().await?;

    tracing::debug!("Listing {} open jobs", jobs.len());
    Ok(Json(
        jobs.into_iter()
            .map(|job| JobResponse::for_viewer(job, viewer_id))
            .collect(),
    ))
}

/// Handler for GET /api/jobs/:id
/// Closed postings are only visible to their owner
#[utoipa::path(
    get,
    path = "/api/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job found", body = JobResponse),
        (status = 404, description = "Job not found", body = ErrorResponse)
    ),
    tag = "jobs"
)]
pub async fn get_job_handler(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<Uuid>,
) -> Result<Json<JobResponse>, ApiError> {
    let viewer_id = viewer.map(|identity| identity.user_id);
    let job = state
        .jobs
        .find_job_by_id(id)
        .await?
        .filter(|job| job.is_open || viewer_id == Some(job.employer_id))
        .ok_or_else(|| ApiError::not_found("Job", id))?;

    Ok(Json(JobResponse::for_viewer(job, viewer_id)))
}

/// Handler for POST /api/jobs
/// Creates a posting owned by the calling employer
#[utoipa::path(
    post,
    path = "/api/jobs",
    request_body = CreateJobRequest,
    responses(
        (status = 201, description = "Job created", body = Job),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Caller is not an employer", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "jobs"
)]
pub async fn create_job_handler(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Json(request): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    request.validate()?;

    let job = state.jobs.create_job(identity.user_id, &request).await?;

    tracing::info!("Employer {} created job {}", identity.user_id, job.id);
    Ok((StatusCode::CREATED, Json(job)))
}

/// Handler for GET /api/jobs/mine
/// Lists every posting of the calling employer, open or closed
#[utoipa::path(
    get,
    path = "/api/jobs/mine",
    responses(
        (status = 200, description = "The caller's postings", body = Vec<Job>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Caller is not an employer", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "jobs"
)]
pub async fn my_jobs_handler(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<Vec<Job>>, ApiError> {
    let jobs = state.jobs.list_jobs_by_employer(identity.user_id).await?;
    Ok(Json(jobs))
}

/// Handler for PUT /api/jobs/:id
/// The posting was already loaded and ownership-checked by the pipeline
#[utoipa::path(
    put,
    path = "/api/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    request_body = UpdateJobRequest,
    responses(
        (status = 200, description = "Job updated", body = Job),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Caller does not own the job", body = ErrorResponse),
        (status = 404, description = "Job not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "jobs"
)]
pub async fn update_job_handler(
    State(state): State<AppState>,
    OwnedJob(job): OwnedJob,
    Json(request): Json<UpdateJobRequest>,
) -> Result<Json<Job>, ApiError> {
    request.validate()?;

    let merged = job.merged_with(&request);
    validate_salary_range(merged.salary_min, merged.salary_max).map_err(|_| {
        ApiError::invalid_field(
            "salary_min",
            "salary_range_inverted",
            "Minimum salary must not exceed maximum salary",
        )
    })?;

    let saved = state
        .jobs
        .save_job(&merged)
        .await?
        .ok_or_else(|| ApiError::not_found("Job", job.id))?;

    tracing::info!("Updated job {}", saved.id);
    Ok(Json(saved))
}

/// Handler for DELETE /api/jobs/:id
#[utoipa::path(
    delete,
    path = "/api/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 204, description = "Job deleted"),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Caller does not own the job", body = ErrorResponse),
        (status = 404, description = "Job not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "jobs"
)]
pub async fn delete_job_handler(
    State(state): State<AppState>,
    OwnedJob(job): OwnedJob,
) -> Result<StatusCode, ApiError> {
    if !state.jobs.delete_job(job.id).await? {
        return Err(ApiError::not_found("Job", job.id));
    }

    tracing::info!("Deleted job {}", job.id);
    Ok(StatusCode::NO_CONTENT)
}
