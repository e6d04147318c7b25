//! Email/password accounts with opaque session tokens.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    entities::{session, user},
    error::{AppError, AppResult},
};

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account with this email already exists")]
    EmailTaken,

    #[error("please enter a valid email address")]
    InvalidEmail,

    #[error("password must be at least {0} characters long")]
    WeakPassword(usize),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
}

impl From<user::Model> for User {
    fn from(m: user::Model) -> Self {
        Self { id: m.id, email: m.email }
    }
}

#[derive(Clone, Debug)]
pub struct AuthService {
    db: DatabaseConnection,
    session_ttl_seconds: i64,
    min_password_len: usize,
}

impl AuthService {
    pub fn new(db: DatabaseConnection, session_ttl_days: i64, min_password_len: usize) -> Self {
        Self { db, session_ttl_seconds: session_ttl_days * 86_400, min_password_len }
    }

    /// Creates the account and signs it in, returning the session token.
    pub async fn sign_up(&self, email: &str, password: &str) -> AppResult<(User, String)> {
        let email = normalize_email(email)?;
        validate_password_strength(password, self.min_password_len)?;

        let existing = user::Entity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(AuthError::EmailTaken.into());
        }

        let hash = hash_password(password)?;
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            email: Set(email),
            password_hash: Set(hash),
            created_at: Set(now_sec()),
        }
        .insert(&self.db)
        .await?;

        info!(user_id = %model.id, "account created");
        let user = User::from(model);
        let token = self.create_session(&user.id).await?;
        Ok((user, token))
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<(User, String)> {
        let email = email.trim().to_lowercase();
        let Some(model) =
            user::Entity::find().filter(user::Column::Email.eq(email.as_str())).one(&self.db).await?
        else {
            return Err(AuthError::InvalidCredentials.into());
        };

        if !verify_password(password, &model.password_hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }

        let user = User::from(model);
        let token = self.create_session(&user.id).await?;
        debug!(user_id = %user.id, "signed in");
        Ok((user, token))
    }

    /// Unknown tokens are ignored.
    pub async fn sign_out(&self, token: &str) -> AppResult<()> {
        session::Entity::delete_by_id(token.to_string()).exec(&self.db).await?;
        Ok(())
    }

    /// Resolves a live session to its user.
    pub async fn current_user(&self, token: &str) -> AppResult<Option<User>> {
        let Some(sess) = session::Entity::find_by_id(token.to_string()).one(&self.db).await? else {
            return Ok(None);
        };
        if !self.is_fresh(sess.created_at) {
            debug!(user_id = %sess.user_id, "session expired");
            session::Entity::delete_by_id(sess.token).exec(&self.db).await?;
            return Ok(None);
        }

        let user = user::Entity::find_by_id(sess.user_id).one(&self.db).await?;
        Ok(user.map(User::from))
    }

    async fn create_session(&self, user_id: &str) -> AppResult<String> {
        let token = Uuid::new_v4().to_string();
        session::ActiveModel {
            token: Set(token.clone()),
            user_id: Set(user_id.to_string()),
            created_at: Set(now_sec()),
        }
        .insert(&self.db)
        .await?;
        Ok(token)
    }

    fn is_fresh(&self, created_at: i64) -> bool {
        now_sec().saturating_sub(created_at) <= self.session_ttl_seconds
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AuthError::InvalidEmail),
    }
}

fn validate_password_strength(password: &str, min_length: usize) -> Result<(), AuthError> {
    if password.chars().count() < min_length {
        return Err(AuthError::WeakPassword(min_length));
    }
    Ok(())
}

/// Argon2id with a random salt, PHC string format.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Other(anyhow::anyhow!("password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Other(anyhow::anyhow!("stored password hash is invalid: {e}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::Other(anyhow::anyhow!("password verification failed: {e}"))),
    }
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn service() -> AuthService {
        let db = db::connect_and_migrate("sqlite::memory:").await.unwrap();
        AuthService::new(db, 30, 6)
    }

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("correct-horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct-horse", &hash).unwrap());
        assert!(!verify_password("wrong-horse", &hash).unwrap());
    }

    #[test]
    fn email_must_have_both_parts() {
        assert_eq!(normalize_email("  Ann@Example.COM ").unwrap(), "ann@example.com");
        assert!(normalize_email("ann").is_err());
        assert!(normalize_email("@example.com").is_err());
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(matches!(validate_password_strength("12345", 6), Err(AuthError::WeakPassword(6))));
        assert!(validate_password_strength("123456", 6).is_ok());
    }

    #[tokio::test]
    async fn sign_up_sign_in_sign_out() {
        let auth = service().await;
        let (user, token) = auth.sign_up("ann@example.com", "secret-pw").await.unwrap();
        assert_eq!(auth.current_user(&token).await.unwrap(), Some(user.clone()));

        let (again, second) = auth.sign_in("ANN@example.com ", "secret-pw").await.unwrap();
        assert_eq!(again.id, user.id);
        assert_ne!(second, token);

        auth.sign_out(&token).await.unwrap();
        assert_eq!(auth.current_user(&token).await.unwrap(), None);
        assert!(auth.current_user(&second).await.unwrap().is_some());
        auth.sign_out("not-a-token").await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_email_and_bad_password() {
        let auth = service().await;
        auth.sign_up("ann@example.com", "secret-pw").await.unwrap();

        assert!(matches!(
            auth.sign_up("ann@example.com", "another-pw").await,
            Err(AppError::Auth(AuthError::EmailTaken))
        ));
        assert!(matches!(
            auth.sign_in("ann@example.com", "nope-nope").await,
            Err(AppError::Auth(AuthError::InvalidCredentials))
        ));
        assert!(matches!(
            auth.sign_in("bob@example.com", "secret-pw").await,
            Err(AppError::Auth(AuthError::InvalidCredentials))
        ));
    }

    #[tokio::test]
    async fn expired_sessions_are_dropped() {
        let db = db::connect_and_migrate("sqlite::memory:").await.unwrap();
        let auth = AuthService::new(db, 0, 6);
        let (_, token) = auth.sign_up("ann@example.com", "secret-pw").await.unwrap();

        session::Entity::update_many()
            .col_expr(session::Column::CreatedAt, sea_orm::sea_query::Expr::value(now_sec() - 10))
            .filter(session::Column::Token.eq(token.as_str()))
            .exec(&auth.db)
            .await
            .unwrap();

        assert_eq!(auth.current_user(&token).await.unwrap(), None);
    }
}
