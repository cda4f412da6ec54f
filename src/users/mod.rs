// User profile module
// Self-service profile reads, partial updates and account deactivation

pub mod handlers;
