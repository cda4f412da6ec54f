// Authentication service - business logic layer
//
// Stateless orchestrator over the user store, the session store and the
// token codec. Per (user, refresh token) a session moves Issued -> Active ->
// Revoked | Expired and never returns to Active.

use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{
    error::TokenError,
    models::{
        AuthResponse, ChangePasswordRequest, LoginRequest, NewUser, RefreshResponse,
        RegisterRequest, User, UserResponse,
    },
    password::PasswordService,
    repository::UserStore,
    sessions::SessionStore,
    token::{TokenPair, TokenService},
};
use crate::config::AuthConfig;
use crate::error::ApiError;

/// Authentication service coordinating all auth operations
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: SessionStore,
    password_service: PasswordService,
    token_service: Arc<TokenService>,
    rotate_refresh_tokens: bool,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(
        users: Arc<dyn UserStore>,
        password_service: PasswordService,
        token_service: Arc<TokenService>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            sessions: SessionStore::new(users.clone()),
            users,
            password_service,
            token_service,
            rotate_refresh_tokens: config.rotate_refresh_tokens,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Register a new user
    ///
    /// Creates the user, issues a token pair and records exactly one session.
    pub async fn register(&self, mut request: RegisterRequest) -> Result<AuthResponse, ApiError> {
        request.email = normalize_email(&request.email);
        request.validate()?;
        let email = request.email;

        if self.users.email_exists(&email).await? {
            debug!("Registration rejected for existing email");
            return Err(ApiError::DuplicateEmail);
        }

        let password_hash = self
            .password_service
            .hash_password_blocking(request.password)
            .await?;

        // A concurrent registration can still win the race; the store's
        // unique constraint reports it as DuplicateEmail.
        let user = self
            .users
            .create_user(NewUser {
                email,
                password_hash,
                role: request.role.unwrap_or_default(),
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
                phone: request.phone,
                company_name: request.company_name,
            })
            .await?;

        let pair = self.open_session(&user).await?;
        info!("Registered user {} with role {}", user.id, user.role);

        Ok(AuthResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            user: user.into(),
        })
    }

    /// Login a user
    ///
    /// Unknown email and wrong password produce the same error after the
    /// same hashing work. Expired sessions are pruned before the new one is
    /// recorded.
    pub async fn login(&self, mut request: LoginRequest) -> Result<AuthResponse, ApiError> {
        request.email = normalize_email(&request.email);
        request.validate()?;

        let Some(user) = self.users.find_user_by_email(&request.email).await? else {
            self.password_service.verify_dummy_blocking(request.password).await?;
            return Err(ApiError::InvalidCredentials);
        };

        let verified = self
            .password_service
            .verify_password_blocking(request.password, user.password_hash.clone())
            .await?;
        if !verified {
            return Err(ApiError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(ApiError::AccountDeactivated);
        }

        self.sessions.prune_expired(user.id).await?;
        let pair = self.open_session(&user).await?;
        info!("User {} logged in", user.id);

        Ok(AuthResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            user: user.into(),
        })
    }

    /// Exchange a refresh token for a new access token
    ///
    /// A cryptographically valid token is still refused once its session has
    /// been removed from the store.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError> {
        let claims = self
            .token_service
            .verify_refresh(refresh_token)
            .map_err(|e| match e {
                TokenError::Signing(msg) => ApiError::InternalError(msg),
                TokenError::Expired => {
                    debug!("Refresh attempted with expired token");
                    ApiError::InvalidOrExpiredToken
                }
                TokenError::InvalidSignature => ApiError::InvalidOrExpiredToken,
            })?;

        let Some(user) = self.users.find_user_by_id(claims.sub).await? else {
            warn!("Refresh token presented for unknown user {}", claims.sub);
            return Err(ApiError::SessionNotFound);
        };

        if !self.sessions.contains(user.id, refresh_token).await? {
            warn!("Refresh token for user {} is not an active session", user.id);
            return Err(ApiError::SessionNotFound);
        }

        let access_token = self.token_service.sign_access(&user)?;

        if !self.rotate_refresh_tokens {
            return Ok(RefreshResponse {
                access_token,
                refresh_token: None,
            });
        }

        let (new_refresh, expires_at) = self.token_service.sign_refresh(&user)?;
        if !self
            .sessions
            .rotate(user.id, refresh_token, &new_refresh, expires_at)
            .await?
        {
            // Lost a race with logout or another rotation of the same token
            warn!("Refresh token for user {} was revoked during rotation", user.id);
            return Err(ApiError::SessionNotFound);
        }
        debug!("Rotated refresh token for user {}", user.id);

        Ok(RefreshResponse {
            access_token,
            refresh_token: Some(new_refresh),
        })
    }

    /// Revoke one refresh token
    ///
    /// Always succeeds: the token may already be expired, forged or revoked,
    /// and the caller learns nothing about which.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), ApiError> {
        match TokenService::decode_unverified(refresh_token) {
            Some(claims) => {
                let removed = self.sessions.remove(claims.sub, refresh_token).await?;
                if removed {
                    info!("User {} logged out", claims.sub);
                }
            }
            None => debug!("Logout with undecodable token ignored"),
        }
        Ok(())
    }

    /// Revoke every refresh token of an authenticated user
    pub async fn logout_all(&self, user_id: Uuid) -> Result<(), ApiError> {
        self.sessions.remove_all(user_id).await?;
        info!("User {} logged out of all sessions", user_id);
        Ok(())
    }

    /// Get current user information
    pub async fn get_current_user(&self, user_id: Uuid) -> Result<UserResponse, ApiError> {
        self.users
            .find_user_by_id(user_id)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| ApiError::not_found("User", user_id))
    }

    /// Change the password after re-verifying the current one
    ///
    /// Every existing session is revoked in the same store update.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        request: ChangePasswordRequest,
    ) -> Result<(), ApiError> {
        request.validate()?;

        let user = self
            .users
            .find_user_by_id(user_id)
            .await?
            .ok_or(ApiError::Unauthenticated)?;

        let verified = self
            .password_service
            .verify_password_blocking(request.current_password, user.password_hash)
            .await?;
        if !verified {
            return Err(ApiError::InvalidCredentials);
        }

        let password_hash = self
            .password_service
            .hash_password_blocking(request.new_password)
            .await?;
        if !self.users.update_password(user_id, &password_hash).await? {
            return Err(ApiError::Unauthenticated);
        }
        info!("User {} changed password; all sessions revoked", user_id);
        Ok(())
    }

    /// Deactivate the account and revoke every session
    pub async fn deactivate_account(&self, user_id: Uuid) -> Result<(), ApiError> {
        if !self.users.deactivate_user(user_id).await? {
            return Err(ApiError::not_found("User", user_id));
        }
        info!("User {} deactivated", user_id);
        Ok(())
    }

    /// Issue a token pair and record the refresh token as an active session
    async fn open_session(&self, user: &User) -> Result<TokenPair, ApiError> {
        let pair = self.token_service.issue_pair(user)?;
        let recorded = self
            .sessions
            .add(user.id, &pair.refresh_token, pair.refresh_expires_at)
            .await?;
        if !recorded {
            // Deactivated between the credential check and this write
            return Err(ApiError::AccountDeactivated);
        }
        Ok(pair)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::auth::{
        memory::MemoryUserStore,
        models::Role,
        token::test_support::{encode_with, expired_claims, test_token_service, REFRESH_SECRET},
    };

    async fn session_count(users: &MemoryUserStore, user_id: Uuid) -> usize {
        users
            .find_user_by_id(user_id)
            .await
            .unwrap()
            .unwrap()
            .sessions
            .len()
    }

    #[tokio::test]
    async fn test_register_then_login_yields_matching_identity() {
        let (service, users) = test_auth_service();

        let registered = service
            .register(register_request("a@x.com", Some(Role::Applicant)))
            .await
            .unwrap();
        assert_eq!(registered.user.email, "a@x.com");
        assert_eq!(session_count(&users, registered.user.id).await, 1);

        let logged_in = service
            .login(login_request("a@x.com", "Passw0rd"))
            .await
            .unwrap();
        let claims = test_token_service()
            .verify_access(&logged_in.access_token)
            .unwrap();
        assert_eq!(claims.sub, registered.user.id);

        // Two independent sessions coexist
        assert_eq!(session_count(&users, registered.user.id).await, 2);
        assert!(service.refresh(&registered.refresh_token).await.is_ok());
        assert!(service.refresh(&logged_in.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_register_defaults_role_and_normalizes_email() {
        let (service, _) = test_auth_service();
        let response = service
            .register(register_request("  Mixed@Case.COM ", None))
            .await
            .unwrap();
        assert_eq!(response.user.role, Role::Applicant);
        assert_eq!(response.user.email, "mixed@case.com");
    }

    #[tokio::test]
    async fn test_login_trims_and_lowercases_email() {
        let (service, _) = test_auth_service();
        let registered = service
            .register(register_request("a@x.com", None))
            .await
            .unwrap();

        let logged_in = service
            .login(login_request(" A@x.com ", "Passw0rd"))
            .await
            .unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);
    }

    #[tokio::test]
    async fn test_unknown_email_still_verifies_a_password() {
        let (service, _) = test_auth_service();
        service
            .register(register_request("a@x.com", None))
            .await
            .unwrap();

        let before = service.password_service.verification_count();
        let result = service.login(login_request("nobody@x.com", "Passw0rd")).await;
        assert!(matches!(result, Err(ApiError::InvalidCredentials)));
        assert_eq!(service.password_service.verification_count(), before + 1);
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let (service, _) = test_auth_service();
        service
            .register(register_request("a@x.com", None))
            .await
            .unwrap();

        let result = service.register(register_request("A@X.COM", None)).await;
        assert!(matches!(result, Err(ApiError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_input() {
        let (service, users) = test_auth_service();
        let mut request = register_request("a@x.com", None);
        request.password = "short".to_string();

        let result = service.register(request).await;
        assert!(matches!(result, Err(ApiError::ValidationFailed(_))));
        assert!(!users.email_exists("a@x.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_are_indistinguishable() {
        let (service, _) = test_auth_service();
        service
            .register(register_request("a@x.com", None))
            .await
            .unwrap();

        let wrong_password = service
            .login(login_request("a@x.com", "Wr0ngPass"))
            .await
            .unwrap_err();
        let unknown_email = service
            .login(login_request("nobody@x.com", "Passw0rd"))
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, ApiError::InvalidCredentials));
        assert!(matches!(unknown_email, ApiError::InvalidCredentials));
        assert_eq!(wrong_password.status_code(), unknown_email.status_code());
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_login_prunes_expired_sessions() {
        let (service, users) = test_auth_service();
        let registered = service
            .register(register_request("a@x.com", None))
            .await
            .unwrap();
        let user_id = registered.user.id;

        service
            .sessions()
            .add(user_id, "stale-token", chrono::Utc::now() - chrono::Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(session_count(&users, user_id).await, 2);

        service
            .login(login_request("a@x.com", "Passw0rd"))
            .await
            .unwrap();

        // stale pruned, registration session kept, login session added
        assert_eq!(session_count(&users, user_id).await, 2);
        assert!(!service.sessions().contains(user_id, "stale-token").await.unwrap());
    }

    #[tokio::test]
    async fn test_login_deactivated_account() {
        let (service, _) = test_auth_service();
        let registered = service
            .register(register_request("a@x.com", None))
            .await
            .unwrap();
        service.deactivate_account(registered.user.id).await.unwrap();

        let result = service.login(login_request("a@x.com", "Passw0rd")).await;
        assert!(matches!(result, Err(ApiError::AccountDeactivated)));

        // Wrong password on a deactivated account still reads as bad credentials
        let result = service.login(login_request("a@x.com", "Wr0ngPass")).await;
        assert!(matches!(result, Err(ApiError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_refresh_issues_new_access_token_only() {
        let (service, users) = test_auth_service();
        let registered = service
            .register(register_request("a@x.com", Some(Role::Employer)))
            .await
            .unwrap();

        let refreshed = service.refresh(&registered.refresh_token).await.unwrap();
        assert!(refreshed.refresh_token.is_none());

        let claims = test_token_service()
            .verify_access(&refreshed.access_token)
            .unwrap();
        assert_eq!(claims.sub, registered.user.id);
        assert_eq!(claims.role, Role::Employer);

        // The same refresh token keeps working and no session was added
        assert!(service.refresh(&registered.refresh_token).await.is_ok());
        assert_eq!(session_count(&users, registered.user.id).await, 1);
    }

    #[tokio::test]
    async fn test_refresh_after_logout_fails_despite_valid_signature() {
        let (service, _) = test_auth_service();
        let registered = service
            .register(register_request("a@x.com", None))
            .await
            .unwrap();

        service.logout(&registered.refresh_token).await.unwrap();

        assert!(test_token_service()
            .verify_refresh(&registered.refresh_token)
            .is_ok());
        let result = service.refresh(&registered.refresh_token).await;
        assert!(matches!(result, Err(ApiError::SessionNotFound)));
    }

    #[tokio::test]
    async fn test_logout_all_invalidates_every_prior_token() {
        let (service, _) = test_auth_service();
        let registered = service
            .register(register_request("a@x.com", None))
            .await
            .unwrap();
        let mut tokens = vec![registered.refresh_token.clone()];
        for _ in 0..3 {
            let login = service
                .login(login_request("a@x.com", "Passw0rd"))
                .await
                .unwrap();
            tokens.push(login.refresh_token);
        }

        service.logout_all(registered.user.id).await.unwrap();

        for token in &tokens {
            let result = service.refresh(token).await;
            assert!(matches!(result, Err(ApiError::SessionNotFound)));
        }

        // A login after logout-all starts a fresh, working session
        let fresh = service
            .login(login_request("a@x.com", "Passw0rd"))
            .await
            .unwrap();
        assert!(service.refresh(&fresh.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let (service, users) = test_auth_service();
        let registered = service
            .register(register_request("a@x.com", None))
            .await
            .unwrap();

        assert!(service.logout(&registered.refresh_token).await.is_ok());
        assert_eq!(session_count(&users, registered.user.id).await, 0);
        assert!(service.logout(&registered.refresh_token).await.is_ok());
        assert_eq!(session_count(&users, registered.user.id).await, 0);
    }

    #[tokio::test]
    async fn test_logout_accepts_garbage_and_expired_tokens() {
        let (service, users) = test_auth_service();
        let registered = service
            .register(register_request("a@x.com", None))
            .await
            .unwrap();

        assert!(service.logout("not-a-token").await.is_ok());

        let user = users
            .find_user_by_id(registered.user.id)
            .await
            .unwrap()
            .unwrap();
        let expired = encode_with(REFRESH_SECRET, &expired_claims(&user));
        service
            .sessions()
            .add(user.id, &expired, chrono::Utc::now() - chrono::Duration::seconds(1))
            .await
            .unwrap();

        assert!(service.logout(&expired).await.is_ok());
        assert!(!service.sessions().contains(user.id, &expired).await.unwrap());
        // The unrelated session survives
        assert!(service
            .sessions()
            .contains(user.id, &registered.refresh_token)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_refresh_rejects_expired_and_forged_tokens() {
        let (service, users) = test_auth_service();
        let registered = service
            .register(register_request("a@x.com", None))
            .await
            .unwrap();
        let user = users
            .find_user_by_id(registered.user.id)
            .await
            .unwrap()
            .unwrap();

        let expired = encode_with(REFRESH_SECRET, &expired_claims(&user));
        assert!(matches!(
            service.refresh(&expired).await,
            Err(ApiError::InvalidOrExpiredToken)
        ));

        // An access token is signed with the other secret
        assert!(matches!(
            service.refresh(&registered.access_token).await,
            Err(ApiError::InvalidOrExpiredToken)
        ));
        assert!(matches!(
            service.refresh("garbage").await,
            Err(ApiError::InvalidOrExpiredToken)
        ));
    }

    #[tokio::test]
    async fn test_rotation_replaces_refresh_token() {
        let mut config = crate::auth::token::test_support::test_auth_config();
        config.rotate_refresh_tokens = true;
        let (service, users) = test_auth_service_with(config);
        let registered = service
            .register(register_request("a@x.com", None))
            .await
            .unwrap();

        let rotated = service.refresh(&registered.refresh_token).await.unwrap();
        let new_refresh = rotated.refresh_token.expect("rotation issues a refresh token");
        assert_ne!(new_refresh, registered.refresh_token);

        // Replay of the old token is refused; the new one works
        assert!(matches!(
            service.refresh(&registered.refresh_token).await,
            Err(ApiError::SessionNotFound)
        ));
        assert!(service.refresh(&new_refresh).await.is_ok());
        assert_eq!(session_count(&users, registered.user.id).await, 1);
    }

    #[tokio::test]
    async fn test_change_password_revokes_sessions() {
        let (service, _) = test_auth_service();
        let registered = service
            .register(register_request("a@x.com", None))
            .await
            .unwrap();

        let wrong = service
            .change_password(
                registered.user.id,
                ChangePasswordRequest {
                    current_password: "Wr0ngPass".to_string(),
                    new_password: "N3wPassword".to_string(),
                },
            )
            .await;
        assert!(matches!(wrong, Err(ApiError::InvalidCredentials)));

        service
            .change_password(
                registered.user.id,
                ChangePasswordRequest {
                    current_password: "Passw0rd".to_string(),
                    new_password: "N3wPassword".to_string(),
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            service.refresh(&registered.refresh_token).await,
            Err(ApiError::SessionNotFound)
        ));
        assert!(matches!(
            service.login(login_request("a@x.com", "Passw0rd")).await,
            Err(ApiError::InvalidCredentials)
        ));
        assert!(service
            .login(login_request("a@x.com", "N3wPassword"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_refresh_fails_after_deactivation() {
        let (service, _) = test_auth_service();
        let registered = service
            .register(register_request("a@x.com", None))
            .await
            .unwrap();

        service.deactivate_account(registered.user.id).await.unwrap();

        assert!(matches!(
            service.refresh(&registered.refresh_token).await,
            Err(ApiError::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_logins_each_create_a_session() {
        let (service, users) = test_auth_service();
        let registered = service
            .register(register_request("a@x.com", None))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.login(login_request("a@x.com", "Passw0rd")).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(session_count(&users, registered.user.id).await, 9);
    }
}
