// In-memory job store, paired with MemoryUserStore

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::error::StoreError;
use crate::jobs::{
    models::{CreateJobRequest, Job},
    repository::JobStore,
};

#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(mut jobs: Vec<Job>) -> Vec<Job> {
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    jobs
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_job(
        &self,
        employer_id: Uuid,
        request: &CreateJobRequest,
    ) -> Result<Job, StoreError> {
        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            employer_id,
            title: request.title.clone(),
            description: request.description.clone(),
            location: request.location.clone(),
            job_type: request.job_type,
            salary_min: request.salary_min,
            salary_max: request.salary_max,
            is_open: true,
            created_at: now,
            updated_at: now,
        };
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(job)
    }

    async fn find_job_by_id(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn list_open_jobs(&self) -> Result<Vec<Job>, StoreError> {
        let jobs = self.jobs.read().await;
        Ok(newest_first(jobs.values().filter(|j| j.is_open).cloned().collect()))
    }

    async fn list_jobs_by_employer(&self, employer_id: Uuid) -> Result<Vec<Job>, StoreError> {
        let jobs = self.jobs.read().await;
        Ok(newest_first(
            jobs.values()
                .filter(|j| j.employer_id == employer_id)
                .cloned()
                .collect(),
        ))
    }

    async fn save_job(&self, job: &Job) -> Result<Option<Job>, StoreError> {
        let mut jobs = self.jobs.write().await;
        let Some(stored) = jobs.get_mut(&job.id) else {
            return Ok(None);
        };
        *stored = Job {
            id: stored.id,
            employer_id: stored.employer_id,
            created_at: stored.created_at,
            updated_at: Utc::now(),
            ..job.clone()
        };
        Ok(Some(stored.clone()))
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.jobs.write().await.remove(&id).is_some())
    }
}
