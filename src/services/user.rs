//! User service
//!
//! Registration (account, profile and optional picture), authentication,
//! and the login sessions behind the `session` cookie.

use crate::config::UploadConfig;
use crate::db::is_unique_violation;
use crate::db::repositories::{SessionRepository, UserProfileRepository, UserRepository};
use crate::forms::{FormErrors, UserForm, UserProfileForm};
use crate::models::{Session, User, UserProfile};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::{Duration, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use uuid::Uuid;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 14;

/// Subdirectory of the media root holding profile pictures
pub const PROFILE_IMAGES_DIR: &str = "profile_images";

pub const DUPLICATE_USERNAME: &str = "A user with that username already exists.";

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Unknown username or wrong password
    #[error("Invalid login details supplied.")]
    InvalidCredentials,

    /// Correct credentials for an inactive account
    #[error("Your Rango account is disabled.")]
    AccountDisabled,

    /// Registration forms did not validate
    #[error("Invalid registration: {0}")]
    Validation(FormErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Field error for a picture over the upload limit
pub fn picture_too_large(max_file_size: u64) -> String {
    format!("The picture is too large. Maximum size: {} bytes.", max_file_size)
}

/// An uploaded profile picture
#[derive(Debug, Clone)]
pub struct ProfilePicture {
    pub file_name: Option<String>,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// User service for accounts and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    profile_repo: Arc<dyn UserProfileRepository>,
    session_repo: Arc<dyn SessionRepository>,
    upload: UploadConfig,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        profile_repo: Arc<dyn UserProfileRepository>,
        session_repo: Arc<dyn SessionRepository>,
        upload: UploadConfig,
    ) -> Self {
        Self {
            user_repo,
            profile_repo,
            session_repo,
            upload,
            session_expiration_days: DEFAULT_SESSION_EXPIRATION_DAYS,
        }
    }

    /// Override how long new sessions stay valid
    pub fn with_session_expiration(mut self, days: i64) -> Self {
        self.session_expiration_days = days;
        self
    }

    /// Register a new account with its profile.
    ///
    /// Errors from both forms and the picture are collected into one
    /// `FormErrors`. Nothing is written unless everything validates.
    pub async fn register(
        &self,
        mut user_form: UserForm,
        mut profile_form: UserProfileForm,
        picture: Option<ProfilePicture>,
    ) -> Result<(User, UserProfile), UserServiceError> {
        let mut errors = FormErrors::new();
        if let Err(e) = user_form.validate() {
            errors.merge(e);
        }
        if let Err(e) = profile_form.validate() {
            errors.merge(e);
        }
        if let Some(picture) = &picture {
            self.check_picture(picture, &mut errors);
        }

        if !errors.has("username")
            && self
                .user_repo
                .get_by_username(&user_form.username)
                .await
                .context("Failed to check username")?
                .is_some()
        {
            errors.add("username", DUPLICATE_USERNAME);
        }

        if !errors.is_empty() {
            return Err(UserServiceError::Validation(errors));
        }

        let password_hash = hash_password(&user_form.password).context("Failed to hash password")?;

        // The picture goes to disk first so a failed write leaves no account behind.
        let picture_path = match picture {
            Some(picture) => Some(self.save_picture(&picture).await?),
            None => None,
        };

        let new_user = User::new(user_form.username.clone(), user_form.email(), password_hash);
        let user = match self.user_repo.create(&new_user).await {
            Ok(user) => user,
            Err(e) => {
                self.discard_picture(picture_path.as_deref()).await;
                if is_unique_violation(&e) {
                    errors.add("username", DUPLICATE_USERNAME);
                    return Err(UserServiceError::Validation(errors));
                }
                return Err(e.context("Failed to create user").into());
            }
        };

        let profile = UserProfile::new(user.id, profile_form.website(), picture_path.clone());
        let profile = match self.profile_repo.create(&profile).await {
            Ok(profile) => profile,
            Err(e) => {
                if let Err(cleanup) = self.user_repo.delete(user.id).await {
                    tracing::warn!("Failed to remove half-registered user {}: {}", user.id, cleanup);
                }
                self.discard_picture(picture_path.as_deref()).await;
                return Err(e.context("Failed to create user profile").into());
            }
        };

        Ok((user, profile))
    }

    /// Check a username and password.
    ///
    /// The account status is only revealed once the password matched.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, UserServiceError> {
        let user = self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to get user by username")?
            .ok_or(UserServiceError::InvalidCredentials)?;

        let password_valid =
            verify_password(password, &user.password_hash).context("Failed to verify password")?;
        if !password_valid {
            return Err(UserServiceError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(UserServiceError::AccountDisabled);
        }

        Ok(user)
    }

    /// Start a session for an authenticated user
    pub async fn login(&self, user: &User) -> Result<Session, UserServiceError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: user.id,
            expires_at: now + Duration::days(self.session_expiration_days),
            created_at: now,
        };

        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;
        self.user_repo
            .update_last_login(user.id, now)
            .await
            .context("Failed to update last login")?;

        Ok(created)
    }

    /// End a session. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Expired sessions are deleted on sight. Sessions of deactivated
    /// accounts no longer authenticate.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::debug!("Failed to delete expired session: {}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user.filter(|u| u.is_active))
    }

    /// Delete all expired sessions, returning how many went
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(count)
    }

    pub async fn get_profile(&self, user_id: i64) -> Result<Option<UserProfile>, UserServiceError> {
        let profile = self
            .profile_repo
            .get_by_user(user_id)
            .await
            .context("Failed to get user profile")?;
        Ok(profile)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to get user by username")?;
        Ok(user)
    }

    /// Disable or re-enable an account. Its sessions are dropped either way.
    pub async fn set_active(&self, user_id: i64, is_active: bool) -> Result<(), UserServiceError> {
        self.user_repo
            .set_active(user_id, is_active)
            .await
            .context("Failed to update user status")?;
        self.session_repo
            .delete_by_user(user_id)
            .await
            .context("Failed to delete user sessions")?;
        Ok(())
    }

    // ========================================================================
    // Private helper methods
    // ========================================================================

    fn check_picture(&self, picture: &ProfilePicture, errors: &mut FormErrors) {
        if !self.upload.is_type_allowed(&picture.content_type) {
            errors.add(
                "picture",
                format!(
                    "Upload a valid image. Allowed types: {}.",
                    self.upload.allowed_types.join(", ")
                ),
            );
        }
        if picture.data.len() as u64 > self.upload.max_file_size {
            errors.add("picture", picture_too_large(self.upload.max_file_size));
        }
    }

    /// Write the picture under the media root, returning its relative path
    async fn save_picture(&self, picture: &ProfilePicture) -> Result<String, UserServiceError> {
        let dir: PathBuf = self.upload.media_path.join(PROFILE_IMAGES_DIR);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create upload dir: {:?}", dir))?;

        let file_name = format!(
            "{}.{}",
            Uuid::new_v4(),
            self.upload.get_extension(&picture.content_type)
        );
        let file_path = dir.join(&file_name);
        fs::write(&file_path, &picture.data)
            .await
            .with_context(|| format!("Failed to save picture: {:?}", file_path))?;

        tracing::debug!(
            "Saved profile picture {:?} as {}",
            picture.file_name,
            file_name
        );
        Ok(format!("{}/{}", PROFILE_IMAGES_DIR, file_name))
    }

    /// Remove a saved picture after a failed registration
    async fn discard_picture(&self, relative_path: Option<&str>) {
        let Some(relative_path) = relative_path else {
            return;
        };
        let file_path = self.upload.media_path.join(relative_path);
        if let Err(e) = fs::remove_file(&file_path).await {
            tracing::warn!("Failed to remove picture {:?}: {}", file_path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxSessionRepository, SqlxUserProfileRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service(media: &std::path::Path) -> UserService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let upload = UploadConfig {
            media_path: media.to_path_buf(),
            max_file_size: 1024,
            ..UploadConfig::default()
        };

        UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxUserProfileRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
            upload,
        )
    }

    fn png(len: usize) -> ProfilePicture {
        ProfilePicture {
            file_name: Some("me.png".to_string()),
            content_type: "image/png".to_string(),
            data: vec![0u8; len],
        }
    }

    async fn register(service: &UserService, username: &str, password: &str) -> User {
        service
            .register(
                UserForm::new(username, "", password),
                UserProfileForm::default(),
                None,
            )
            .await
            .expect("Registration should succeed")
            .0
    }

    fn validation_errors(err: UserServiceError) -> FormErrors {
        match err {
            UserServiceError::Validation(errors) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_with_profile_and_picture() {
        let media = tempfile::tempdir().unwrap();
        let service = setup_test_service(media.path()).await;

        let (user, profile) = service
            .register(
                UserForm::new("leifos", "leifos@example.com", "rango"),
                UserProfileForm::new("tangowithdjango.com"),
                Some(png(16)),
            )
            .await
            .expect("Registration should succeed");

        assert_eq!(user.username, "leifos");
        assert_ne!(user.password_hash, "rango");
        assert_eq!(profile.user_id, user.id);
        assert_eq!(profile.website.as_deref(), Some("http://tangowithdjango.com"));

        let picture = profile.picture.clone().expect("picture path stored");
        assert!(picture.starts_with("profile_images/") && picture.ends_with(".png"));
        assert!(media.path().join(&picture).exists());

        assert_eq!(service.get_profile(user.id).await.unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let media = tempfile::tempdir().unwrap();
        let service = setup_test_service(media.path()).await;
        register(&service, "leifos", "pw").await;

        let err = service
            .register(UserForm::new("leifos", "", "pw2"), UserProfileForm::default(), None)
            .await
            .unwrap_err();
        assert_eq!(
            validation_errors(err).get("username"),
            Some(&[DUPLICATE_USERNAME.to_string()][..])
        );
    }

    #[tokio::test]
    async fn test_register_collects_all_errors_and_writes_nothing() {
        let media = tempfile::tempdir().unwrap();
        let service = setup_test_service(media.path()).await;

        let mut bad_type = png(4);
        bad_type.content_type = "application/pdf".to_string();

        let err = service
            .register(
                UserForm::new("", "nope", ""),
                UserProfileForm::new("not a url"),
                Some(bad_type),
            )
            .await
            .unwrap_err();
        let errors = validation_errors(err);
        for field in ["username", "email", "password", "website", "picture"] {
            assert!(errors.has(field), "missing error for {}", field);
        }
        assert!(!media.path().join(PROFILE_IMAGES_DIR).exists());
    }

    #[tokio::test]
    async fn test_register_rejects_oversized_picture() {
        let media = tempfile::tempdir().unwrap();
        let service = setup_test_service(media.path()).await;

        let err = service
            .register(UserForm::new("big", "", "pw"), UserProfileForm::default(), Some(png(2048)))
            .await
            .unwrap_err();
        assert!(validation_errors(err).has("picture"));
        assert!(service.get_by_username("big").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_picture_write_leaves_no_account() {
        let media = tempfile::tempdir().unwrap();
        // A regular file where the media directory should be
        let blocked = media.path().join("media");
        std::fs::write(&blocked, b"not a directory").unwrap();
        let service = setup_test_service(&blocked).await;

        let result = service
            .register(UserForm::new("leifos", "", "rango"), UserProfileForm::default(), Some(png(16)))
            .await;
        assert!(matches!(result, Err(UserServiceError::InternalError(_))));
        assert!(service.get_by_username("leifos").await.unwrap().is_none());

        // Once the media directory is usable the same registration goes through.
        let media_dir = media.path().join("uploads");
        let service = UserService {
            upload: UploadConfig {
                media_path: media_dir.clone(),
                ..service.upload.clone()
            },
            ..service
        };
        let (user, profile) = service
            .register(UserForm::new("leifos", "", "rango"), UserProfileForm::default(), Some(png(16)))
            .await
            .expect("Retry should succeed");
        assert_eq!(profile.user_id, user.id);
        assert!(media_dir.join(profile.picture.unwrap()).exists());
    }

    /// User repository whose username lookup always misses, as when another
    /// request registers the same name between check and insert
    struct StaleUsernameCheck(SqlxUserRepository);

    #[async_trait::async_trait]
    impl UserRepository for StaleUsernameCheck {
        async fn create(&self, user: &User) -> anyhow::Result<User> {
            self.0.create(user).await
        }
        async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
            self.0.get_by_id(id).await
        }
        async fn get_by_username(&self, _username: &str) -> anyhow::Result<Option<User>> {
            Ok(None)
        }
        async fn count(&self) -> anyhow::Result<i64> {
            self.0.count().await
        }
        async fn update_last_login(&self, id: i64, at: chrono::DateTime<Utc>) -> anyhow::Result<()> {
            self.0.update_last_login(id, at).await
        }
        async fn set_active(&self, id: i64, is_active: bool) -> anyhow::Result<()> {
            self.0.set_active(id, is_active).await
        }
        async fn delete(&self, id: i64) -> anyhow::Result<()> {
            self.0.delete(id).await
        }
    }

    #[tokio::test]
    async fn test_duplicate_insert_after_check_is_a_form_error() {
        let media = tempfile::tempdir().unwrap();
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let users = Arc::new(StaleUsernameCheck(SqlxUserRepository::new(pool.clone())));
        let service = UserService::new(
            users.clone(),
            SqlxUserProfileRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
            UploadConfig {
                media_path: media.path().to_path_buf(),
                ..UploadConfig::default()
            },
        );

        register(&service, "leifos", "rango").await;
        let err = service
            .register(UserForm::new("leifos", "", "other"), UserProfileForm::default(), Some(png(16)))
            .await
            .unwrap_err();

        assert_eq!(
            validation_errors(err).get("username"),
            Some(&[DUPLICATE_USERNAME.to_string()][..])
        );
        assert_eq!(users.count().await.unwrap(), 1);

        // The picture saved for the losing request is cleaned up.
        let saved = std::fs::read_dir(media.path().join(PROFILE_IMAGES_DIR))
            .unwrap()
            .count();
        assert_eq!(saved, 0);
    }

    #[tokio::test]
    async fn test_authenticate() {
        let media = tempfile::tempdir().unwrap();
        let service = setup_test_service(media.path()).await;
        let user = register(&service, "leifos", "rango").await;

        let authed = service.authenticate("leifos", "rango").await.unwrap();
        assert_eq!(authed.id, user.id);

        assert!(matches!(
            service.authenticate("leifos", "wrong").await,
            Err(UserServiceError::InvalidCredentials)
        ));
        assert!(matches!(
            service.authenticate("nobody", "rango").await,
            Err(UserServiceError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_disabled_account() {
        let media = tempfile::tempdir().unwrap();
        let service = setup_test_service(media.path()).await;
        let user = register(&service, "leifos", "rango").await;
        let session = service.login(&user).await.unwrap();

        service.set_active(user.id, false).await.unwrap();

        assert!(matches!(
            service.authenticate("leifos", "rango").await,
            Err(UserServiceError::AccountDisabled)
        ));
        // Wrong password still reads as bad credentials.
        assert!(matches!(
            service.authenticate("leifos", "wrong").await,
            Err(UserServiceError::InvalidCredentials)
        ));
        assert!(service.validate_session(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_logout_roundtrip() {
        let media = tempfile::tempdir().unwrap();
        let service = setup_test_service(media.path()).await;
        let user = register(&service, "leifos", "rango").await;

        let session = service.login(&user).await.unwrap();
        assert!(session.expires_at > Utc::now() + Duration::days(13));

        let current = service.validate_session(&session.id).await.unwrap().unwrap();
        assert_eq!(current.id, user.id);
        assert!(current.last_login.is_some());

        service.logout(&session.id).await.unwrap();
        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        service.logout("missing").await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_sessions() {
        let media = tempfile::tempdir().unwrap();
        let service = setup_test_service(media.path())
            .await
            .with_session_expiration(-1);
        let user = register(&service, "leifos", "rango").await;

        let stale = service.login(&user).await.unwrap();
        assert!(service.validate_session(&stale.id).await.unwrap().is_none());

        service.login(&user).await.unwrap();
        service.login(&user).await.unwrap();
        assert_eq!(service.cleanup_expired_sessions().await.unwrap(), 2);
    }
}
