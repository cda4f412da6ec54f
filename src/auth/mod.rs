// Authentication module
// Credential hashing, token codec, session store, auth service and the
// authorization pipeline for protected routes

pub mod error;
pub mod handlers;
pub mod memory;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod sessions;
pub mod token;

// Re-export commonly used types
pub use error::{StoreError, TokenError};
pub use memory::MemoryUserStore;
pub use middleware::{AuthPipeline, CurrentUser, MaybeUser, OwnedJob, RequestContext, RequireRole};
pub use models::{AuthUser, Role, User, UserResponse};
pub use password::PasswordService;
pub use repository::{PgUserStore, UserStore};
pub use service::AuthService;
pub use sessions::SessionStore;
pub use token::TokenService;
