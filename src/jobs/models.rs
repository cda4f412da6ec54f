use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::validation::validate_salary_range;

/// Employment type of a posting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Internship,
}

/// Job posting owned by an employer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Job {
    pub id: Uuid,
    pub employer_id: Uuid,
    #[schema(example = "Senior Rust Engineer")]
    pub title: String,
    pub description: String,
    #[schema(example = "Remote")]
    pub location: String,
    pub job_type: JobType,
    #[schema(example = 90000)]
    pub salary_min: Option<i64>,
    #[schema(example = 120000)]
    pub salary_max: Option<i64>,
    pub is_open: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a posting
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_create_salaries"))]
pub struct CreateJobRequest {
    #[validate(length(min = 3, max = 200, message = "Title must be 3-200 characters"))]
    #[schema(example = "Senior Rust Engineer")]
    pub title: String,
    #[validate(length(min = 10, max = 10000, message = "Description must be 10-10000 characters"))]
    pub description: String,
    #[validate(length(min = 1, max = 200, message = "Location must be 1-200 characters"))]
    #[schema(example = "Remote")]
    pub location: String,
    pub job_type: JobType,
    #[validate(range(min = 0, message = "Salary must not be negative"))]
    pub salary_min: Option<i64>,
    #[validate(range(min = 0, message = "Salary must not be negative"))]
    pub salary_max: Option<i64>,
}

/// Request body for updating a posting
///
/// Omitted and `null` fields both keep their stored value, so a salary bound
/// cannot be cleared once set.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateJobRequest {
    #[validate(length(min = 3, max = 200, message = "Title must be 3-200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 10, max = 10000, message = "Description must be 10-10000 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Location must be 1-200 characters"))]
    pub location: Option<String>,
    pub job_type: Option<JobType>,
    /// Lower salary bound; `null` keeps the stored value
    #[validate(range(min = 0, message = "Salary must not be negative"))]
    pub salary_min: Option<i64>,
    /// Upper salary bound; `null` keeps the stored value
    #[validate(range(min = 0, message = "Salary must not be negative"))]
    pub salary_max: Option<i64>,
    pub is_open: Option<bool>,
}

fn validate_create_salaries(request: &CreateJobRequest) -> Result<(), ValidationError> {
    validate_salary_range(request.salary_min, request.salary_max)
}

impl Job {
    /// The posting as it would look after `update`, without touching the store
    pub fn merged_with(&self, update: &UpdateJobRequest) -> Job {
        Job {
            title: update.title.clone().unwrap_or_else(|| self.title.clone()),
            description: update
                .description
                .clone()
                .unwrap_or_else(|| self.description.clone()),
            location: update.location.clone().unwrap_or_else(|| self.location.clone()),
            job_type: update.job_type.unwrap_or(self.job_type),
            salary_min: update.salary_min.or(self.salary_min),
            salary_max: update.salary_max.or(self.salary_max),
            is_open: update.is_open.unwrap_or(self.is_open),
            ..self.clone()
        }
    }
}

/// Job as returned to a caller, personalized when the caller is known
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobResponse {
    #[serde(flatten)]
    pub job: Job,
    /// True when the authenticated caller posted this job
    pub is_owner: bool,
}

impl JobResponse {
    pub fn for_viewer(job: Job, viewer: Option<Uuid>) -> Self {
        let is_owner = viewer == Some(job.employer_id);
        Self { job, is_owner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request() -> CreateJobRequest {
        CreateJobRequest {
            title: "Rust Engineer".to_string(),
            description: "Build reliable backend services".to_string(),
            location: "Remote".to_string(),
            job_type: JobType::FullTime,
            salary_min: Some(80_000),
            salary_max: Some(120_000),
        }
    }

    #[test]
    fn test_job_type_wire_format() {
        assert_eq!(
            serde_json::to_string(&JobType::FullTime).unwrap(),
            "\"full_time\""
        );
        let parsed: JobType = serde_json::from_str("\"internship\"").unwrap();
        assert_eq!(parsed, JobType::Internship);
    }

    #[test]
    fn test_create_request_validation() {
        assert!(create_request().validate().is_ok());

        let short_title = CreateJobRequest {
            title: "Go".to_string(),
            ..create_request()
        };
        assert!(short_title.validate().is_err());

        let negative = CreateJobRequest {
            salary_min: Some(-5),
            ..create_request()
        };
        assert!(negative.validate().is_err());

        let inverted = CreateJobRequest {
            salary_min: Some(200_000),
            salary_max: Some(100_000),
            ..create_request()
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_merged_with_keeps_omitted_fields() {
        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            employer_id: Uuid::new_v4(),
            title: "Rust Engineer".to_string(),
            description: "Build reliable backend services".to_string(),
            location: "Remote".to_string(),
            job_type: JobType::FullTime,
            salary_min: Some(1),
            salary_max: None,
            is_open: true,
            created_at: now,
            updated_at: now,
        };
        let merged = job.merged_with(&UpdateJobRequest {
            location: Some("Berlin".to_string()),
            is_open: Some(false),
            ..UpdateJobRequest::default()
        });

        assert_eq!(merged.location, "Berlin");
        assert!(!merged.is_open);
        assert_eq!(merged.title, job.title);
        assert_eq!(merged.salary_min, Some(1));
        assert_eq!(merged.id, job.id);
    }

    #[test]
    fn test_null_salary_bound_keeps_stored_value() {
        let update: UpdateJobRequest =
            serde_json::from_str(r#"{ "salary_min": null, "title": "Staff Engineer" }"#).unwrap();
        assert!(update.salary_min.is_none());

        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            employer_id: Uuid::new_v4(),
            title: "Rust Engineer".to_string(),
            description: "Build reliable backend services".to_string(),
            location: "Remote".to_string(),
            job_type: JobType::Contract,
            salary_min: Some(50_000),
            salary_max: Some(70_000),
            is_open: true,
            created_at: now,
            updated_at: now,
        };
        let merged = job.merged_with(&update);
        assert_eq!(merged.title, "Staff Engineer");
        assert_eq!(merged.salary_min, Some(50_000));
    }

    #[test]
    fn test_response_marks_owner() {
        let now = Utc::now();
        let owner = Uuid::new_v4();
        let job = Job {
            id: Uuid::new_v4(),
            employer_id: owner,
            title: "Rust Engineer".to_string(),
            description: "Build reliable backend services".to_string(),
            location: "Remote".to_string(),
            job_type: JobType::Contract,
            salary_min: None,
            salary_max: None,
            is_open: true,
            created_at: now,
            updated_at: now,
        };

        assert!(JobResponse::for_viewer(job.clone(), Some(owner)).is_owner);
        assert!(!JobResponse::for_viewer(job.clone(), Some(Uuid::new_v4())).is_owner);
        assert!(!JobResponse::for_viewer(job, None).is_owner);
    }
}
