// Job postings module
// Employer-owned postings, guarded by the authorization pipeline

pub mod handlers;
pub mod memory;
pub mod models;
pub mod repository;

pub use memory::MemoryJobStore;
pub use models::{CreateJobRequest, Job, JobResponse, JobType, UpdateJobRequest};
pub use repository::{JobStore, PgJobStore};
