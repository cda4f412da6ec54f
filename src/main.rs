mod auth;
mod config;
mod db;
mod error;
mod jobs;
mod users;
mod validation;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use auth::{
    handlers::{
        change_password_handler, login_handler, logout_all_handler, logout_handler, me_handler,
        refresh_handler, register_handler,
    },
    middleware::{optional_auth, require_auth, require_job_owner, require_role},
    models::{
        AuthResponse, AuthUser, ChangePasswordRequest, LoginRequest, MessageResponse,
        ProfileUpdate, RefreshRequest, RefreshResponse, RegisterRequest, Role, UserResponse,
    },
    AuthPipeline, AuthService, MemoryUserStore, PasswordService, PgUserStore, RequireRole,
    TokenService, UserStore,
};
use config::{AppConfig, AuthConfig};
use error::ErrorResponse;
use jobs::{
    handlers::{
        create_job_handler, delete_job_handler, get_job_handler, list_jobs_handler,
        my_jobs_handler, update_job_handler,
    },
    CreateJobRequest, Job, JobResponse, JobStore, JobType, MemoryJobStore, PgJobStore,
    UpdateJobRequest,
};
use users::handlers::{deactivate_account_handler, get_profile_handler, update_profile_handler};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::handlers::register_handler,
        auth::handlers::login_handler,
        auth::handlers::refresh_handler,
        auth::handlers::logout_handler,
        auth::handlers::logout_all_handler,
        auth::handlers::me_handler,
        auth::handlers::change_password_handler,
        users::handlers::get_profile_handler,
        users::handlers::update_profile_handler,
        users::handlers::deactivate_account_handler,
        jobs::handlers::list_jobs_handler,
        jobs::handlers::get_job_handler,
        jobs::handlers::create_job_handler,
        jobs::handlers::my_jobs_handler,
        jobs::handlers::update_job_handler,
        jobs::handlers::delete_job_handler,
    ),
    components(
        schemas(
            Role, AuthUser, UserResponse, RegisterRequest, LoginRequest, RefreshRequest,
            ChangePasswordRequest, AuthResponse, RefreshResponse, MessageResponse, ProfileUpdate,
            Job, JobType, JobResponse, CreateJobRequest, UpdateJobRequest, ErrorResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and session management"),
        (name = "users", description = "Profile of the authenticated user"),
        (name = "jobs", description = "Job postings")
    ),
    info(
        title = "Job Board API",
        version = "1.0.0",
        description = "Job marketplace backend with token-based authentication"
    )
)]
struct ApiDoc;

/// Registers the bearer scheme referenced by protected endpoints
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across handlers and middleware
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub pipeline: AuthPipeline,
    pub users: Arc<dyn UserStore>,
    pub jobs: Arc<dyn JobStore>,
}

impl AppState {
    /// Wire the auth core and the pipeline over the given stores
    pub fn new(
        users: Arc<dyn UserStore>,
        jobs: Arc<dyn JobStore>,
        password_service: PasswordService,
        config: &AuthConfig,
    ) -> Self {
        let tokens = Arc::new(TokenService::new(config));
        let auth = AuthService::new(users.clone(), password_service, tokens.clone(), config);
        Self {
            auth: Arc::new(auth),
            pipeline: AuthPipeline::new(tokens, users.clone()),
            users,
            jobs,
        }
    }
}

/// Creates and configures the application router
///
/// Route groups differ only in their pipeline. Stages inside a
/// `ServiceBuilder` run top to bottom: authenticate, then role, then
/// ownership.
pub fn create_router(state: AppState) -> Router {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/refresh", post(refresh_handler))
        .route("/api/auth/logout", post(logout_handler));

    let browse = Router::new()
        .route("/api/jobs", get(list_jobs_handler))
        .route("/api/jobs/:id", get(get_job_handler))
        .route_layer(from_fn_with_state(state.clone(), optional_auth));

    let authenticated = Router::new()
        .route("/api/auth/logout-all", post(logout_all_handler))
        .route("/api/auth/me", get(me_handler))
        .route("/api/auth/password", put(change_password_handler))
        .route(
            "/api/users/profile",
            get(get_profile_handler).put(update_profile_handler),
        )
        .route("/api/users/account", delete(deactivate_account_handler))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let employer = Router::new()
        .route("/api/jobs", post(create_job_handler))
        .route("/api/jobs/mine", get(my_jobs_handler))
        .route_layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(state.clone(), require_auth))
                .layer(from_fn_with_state(RequireRole::employer(), require_role)),
        );

    let owner = Router::new()
        .route(
            "/api/jobs/:id",
            put(update_job_handler).delete(delete_job_handler),
        )
        .route_layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(state.clone(), require_auth))
                .layer(from_fn_with_state(RequireRole::employer(), require_role))
                .layer(from_fn_with_state(state.clone(), require_job_owner)),
        );

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // API routes
        .merge(public)
        .merge(browse)
        .merge(authenticated)
        .merge(employer)
        .merge(owner)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // RUST_LOG controls verbosity, e.g. RUST_LOG=jobboard_api=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Job Board API - Starting...");

    let config = AppConfig::from_env().expect("Invalid configuration");
    let password_service =
        PasswordService::new(config.hashing).expect("Invalid password hashing parameters");

    let (users, jobs): (Arc<dyn UserStore>, Arc<dyn JobStore>) = match &config.database_url {
        Some(database_url) => {
            let pool = db::connect_and_migrate(database_url)
                .await
                .expect("Failed to prepare database");
            (
                Arc::new(PgUserStore::new(pool.clone())),
                Arc::new(PgJobStore::new(pool)),
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory stores (data is not persisted)");
            (
                Arc::new(MemoryUserStore::new()),
                Arc::new(MemoryJobStore::new()),
            )
        }
    };

    let state = AppState::new(users, jobs, password_service, &config.auth);
    let app = create_router(state);

    let addr = config.bind_address();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Job Board API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await.expect("Server error");
}
