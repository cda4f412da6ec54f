// Authorization pipeline for protected routes
//
// Stages run in order and short-circuit: authenticate -> authorize role ->
// authorize ownership. Each stage returns its result explicitly; the axum
// middleware wrappers store it in a typed RequestContext for later stages and
// for handlers to extract.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::{
    error::StoreError,
    models::{AuthUser, Role},
    repository::UserStore,
    token::TokenService,
};
use crate::error::ApiError;
use crate::jobs::models::Job;
use crate::AppState;

/// A resource preloaded by the ownership stage
#[derive(Debug, Clone)]
pub enum Resource {
    Job(Job),
}

/// Typed per-request context filled in by the pipeline stages
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub identity: Option<AuthUser>,
    pub resource: Option<Resource>,
}

impl RequestContext {
    fn from_request(request: &Request) -> Self {
        request
            .extensions()
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default()
    }
}

/// Anything with a single owning user
pub trait OwnedResource {
    const KIND: &'static str;

    fn owner_id(&self) -> Uuid;
}

impl OwnedResource for Job {
    const KIND: &'static str = "Job";

    fn owner_id(&self) -> Uuid {
        self.employer_id
    }
}

/// Resolves identities from access tokens
///
/// Holds its token codec and user store explicitly; nothing is read from
/// the environment per request.
#[derive(Clone)]
pub struct AuthPipeline {
    tokens: Arc<TokenService>,
    users: Arc<dyn UserStore>,
}

impl AuthPipeline {
    pub fn new(tokens: Arc<TokenService>, users: Arc<dyn UserStore>) -> Self {
        Self { tokens, users }
    }

    /// Stage 1: resolve the caller from the Authorization header
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
        let header_value = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let token = TokenService::extract_bearer(header_value).ok_or(ApiError::MissingToken)?;

        let claims = self.tokens.verify_access(token).map_err(|e| {
            debug!("Access token rejected: {}", e);
            ApiError::Unauthenticated
        })?;

        match self.users.find_user_by_id(claims.sub).await? {
            Some(user) if user.is_active => Ok(AuthUser::from(&user)),
            Some(_) => {
                warn!("Access token presented for deactivated user {}", claims.sub);
                Err(ApiError::Unauthenticated)
            }
            None => {
                warn!("Access token presented for unknown user {}", claims.sub);
                Err(ApiError::Unauthenticated)
            }
        }
    }

    /// Variant for public endpoints: any failure means "anonymous"
    pub async fn optional_authenticate(&self, headers: &HeaderMap) -> Option<AuthUser> {
        if !headers.contains_key(header::AUTHORIZATION) {
            return None;
        }
        match self.authenticate(headers).await {
            Ok(identity) => Some(identity),
            Err(e) => {
                debug!("Optional authentication fell back to anonymous: {}", e);
                None
            }
        }
    }
}

/// Stage 2: the identity's role must be one of `allowed`
pub fn authorize_role(identity: &AuthUser, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&identity.role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "Role '{}' may not perform this action",
            identity.role
        )))
    }
}

/// Stage 3: load the resource and require that the identity owns it
pub async fn authorize_ownership<R, F, Fut>(
    identity: &AuthUser,
    resource_id: Uuid,
    load: F,
) -> Result<R, ApiError>
where
    R: OwnedResource,
    F: FnOnce(Uuid) -> Fut,
    Fut: Future<Output = Result<Option<R>, StoreError>>,
{
    let resource = load(resource_id)
        .await?
        .ok_or_else(|| ApiError::not_found(R::KIND, resource_id))?;

    if resource.owner_id() != identity.user_id {
        warn!(
            "Ownership check failed: user {} does not own {} {}",
            identity.user_id,
            R::KIND,
            resource_id
        );
        return Err(ApiError::Forbidden(format!(
            "You do not own this {}",
            R::KIND.to_lowercase()
        )));
    }
    Ok(resource)
}

/// Middleware: authenticate or reject
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = state.pipeline.authenticate(request.headers()).await?;
    debug!(
        "Authenticated user {} for {}",
        identity.user_id,
        request.uri().path()
    );

    let mut context = RequestContext::from_request(&request);
    context.identity = Some(identity);
    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

/// Middleware: attach an identity if one can be resolved, never reject
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = state.pipeline.optional_authenticate(request.headers()).await;

    let mut context = RequestContext::from_request(&request);
    context.identity = identity;
    request.extensions_mut().insert(context);
    next.run(request).await
}

/// Role requirement, passed as middleware state
#[derive(Debug, Clone)]
pub struct RequireRole {
    allowed: Arc<[Role]>,
}

impl RequireRole {
    /// Create a new RequireRole with the roles allowed through
    pub fn new(allowed: &[Role]) -> Self {
        Self {
            allowed: allowed.into(),
        }
    }

    /// Create a requirement for the employer role
    pub fn employer() -> Self {
        Self::new(&[Role::Employer])
    }

    pub fn check(&self, identity: &AuthUser) -> Result<(), ApiError> {
        authorize_role(identity, &self.allowed)
    }
}

/// Middleware: role check; must run after `require_auth`
pub async fn require_role(
    State(guard): State<RequireRole>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let context = RequestContext::from_request(&request);
    let identity = context.identity.as_ref().ok_or(ApiError::Unauthenticated)?;

    guard.check(identity).map_err(|e| {
        warn!(
            "Authorization failed: user_id={}, role={}, endpoint={}",
            identity.user_id,
            identity.role,
            request.uri().path()
        );
        e
    })?;

    Ok(next.run(request).await)
}

/// Middleware: the caller must own the job named by the `:id` path segment
pub async fn require_job_owner(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let mut context = RequestContext::from_request(&request);
    let identity = context.identity.as_ref().ok_or(ApiError::Unauthenticated)?;

    let jobs = state.jobs.clone();
    let job = authorize_ownership(identity, job_id, |id| async move {
        jobs.find_job_by_id(id).await
    })
    .await?;

    context.resource = Some(Resource::Job(job));
    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

/// Extractor: the authenticated caller (requires `require_auth` upstream)
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .and_then(|context| context.identity.clone())
            .map(CurrentUser)
            .ok_or(ApiError::Unauthenticated)
    }
}

/// Extractor: the caller if one was resolved (for `optional_auth` routes)
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthUser>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts
                .extensions
                .get::<RequestContext>()
                .and_then(|context| context.identity.clone()),
        ))
    }
}

/// Extractor: the job preloaded by `require_job_owner`
#[derive(Debug, Clone)]
pub struct OwnedJob(pub Job);

#[async_trait]
impl<S> FromRequestParts<S> for OwnedJob
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts
            .extensions
            .get::<RequestContext>()
            .and_then(|context| context.resource.clone())
        {
            Some(Resource::Job(job)) => Ok(OwnedJob(job)),
            None => Err(ApiError::InternalError(
                "Ownership stage did not run for this route".to_string(),
            )),
        }
    }
}
