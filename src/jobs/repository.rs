use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::error::StoreError;
use crate::jobs::models::{CreateJobRequest, Job};

/// Job posting persistence
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(
        &self,
        employer_id: Uuid,
        request: &CreateJobRequest,
    ) -> Result<Job, StoreError>;

    async fn find_job_by_id(&self, id: Uuid) -> Result<Option<Job>, StoreError>;

    /// Open postings, newest first
    async fn list_open_jobs(&self) -> Result<Vec<Job>, StoreError>;

    /// Every posting of one employer (open or closed), newest first
    async fn list_jobs_by_employer(&self, employer_id: Uuid) -> Result<Vec<Job>, StoreError>;

    /// Overwrite the mutable fields with those of `job`; `None` if it no longer exists
    async fn save_job(&self, job: &Job) -> Result<Option<Job>, StoreError>;

    async fn delete_job(&self, id: Uuid) -> Result<bool, StoreError>;
}

const JOB_COLUMNS: &str = "id, employer_id, title, description, location, job_type, \
                           salary_min, salary_max, is_open, created_at, updated_at";

/// Repository for job posting operations
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    /// Create a new PgJobStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create_job(
        &self,
        employer_id: Uuid,
        request: &CreateJobRequest,
    ) -> Result<Job, StoreError> {
        let job = sqlx::query_as::<_, Job>(&format!(
            "INSERT INTO jobs \
             (id, employer_id, title, description, location, job_type, salary_min, salary_max) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {}",
            JOB_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(employer_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.location)
        .bind(request.job_type)
        .bind(request.salary_min)
        .bind(request.salary_max)
        .fetch_one(&self.pool)
        .await?;

        Ok(job)
    }

    async fn find_job_by_id(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        let job = sqlx::query_as::<_, Job>(&format!(
            "SELECT {} FROM jobs WHERE id = $1",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    async fn list_open_jobs(&self) -> Result<Vec<Job>, StoreError> {
        let jobs = sqlx::query_as::<_, Job>(&format!(
            "SELECT {} FROM jobs WHERE is_open ORDER BY created_at DESC",
            JOB_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    async fn list_jobs_by_employer(&self, employer_id: Uuid) -> Result<Vec<Job>, StoreError> {
        let jobs = sqlx::query_as::<_, Job>(&format!(
            "SELECT {} FROM jobs WHERE employer_id = $1 ORDER BY created_at DESC",
            JOB_COLUMNS
        ))
        .bind(employer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    async fn save_job(&self, job: &Job) -> Result<Option<Job>, StoreError> {
        let saved = sqlx::query_as::<_, Job>(&format!(
            "UPDATE jobs \
             SET title = $2, description = $3, location = $4, job_type = $5, \
                 salary_min = $6, salary_max = $7, is_open = $8, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {}",
            JOB_COLUMNS
        ))
        .bind(job.id)
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.location)
        .bind(job.job_type)
        .bind(job.salary_min)
        .bind(job.salary_max)
        .bind(job.is_open)
        .fetch_optional(&self.pool)
        .await?;

        Ok(saved)
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}
