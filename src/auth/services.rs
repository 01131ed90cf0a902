use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        jwt::JwtKeys,
        password::{hash_password, hash_password_blocking, verify_password_blocking},
        repo::UserRepository,
        repo_types::{NewUser, User},
    },
    db::StoreError,
    error::AppError,
};

pub const MIN_PASSWORD_LEN: usize = 8;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    // Verified against when the email is unknown so both login failures cost one argon2 run.
    static ref DUMMY_HASH: String = hash_password("dummy-password-for-timing").unwrap_or_default();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Signup and login on top of a [`UserRepository`] and the token keys.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    keys: Arc<JwtKeys>,
}

impl AccountService {
    /// Also builds the dummy hash, so the first unknown-email login does not pay for it.
    pub fn new(users: Arc<dyn UserRepository>, keys: Arc<JwtKeys>) -> Self {
        lazy_static::initialize(&DUMMY_HASH);
        Self { users, keys }
    }

    #[instrument(skip(self, password))]
    pub async fn signup(&self, email: &str, password: &str) -> Result<User, AppError> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AppError::Validation("Invalid email".into()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            warn!("password too short");
            return Err(AppError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let password_hash = hash_password_blocking(password.to_owned()).await?;

        match self.users.create(NewUser { email, password_hash }).await {
            Ok(user) => {
                info!(user_id = %user.id, email = %user.email, "user registered");
                Ok(user)
            }
            Err(StoreError::UniqueViolation) => {
                warn!("signup for an existing account");
                Err(AppError::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Returns a signed token. Unknown email and wrong password give the same `Unauthorized`.
    #[instrument(skip(self, password, now))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        now: OffsetDateTime,
    ) -> Result<String, AppError> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AppError::Validation("Invalid email".into()));
        }
        if password.is_empty() {
            return Err(AppError::Validation("Password is required".into()));
        }

        let Some(user) = self.users.find_by_email(&email).await? else {
            let _ = verify_password_blocking(password.to_owned(), DUMMY_HASH.clone()).await;
            warn!(email = %email, "login unknown email");
            return Err(AppError::Unauthorized);
        };

        if !verify_password_blocking(password.to_owned(), user.password_hash.clone()).await? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::Unauthorized);
        }

        let token = self.keys.issue(user.id, &user.email, now)?;
        info!(user_id = %user.id, "user logged in");
        Ok(token)
    }

    #[instrument(skip(self))]
    pub async fn profile(&self, user_id: Uuid) -> Result<User, AppError> {
        match self.users.find_by_id(user_id).await? {
            Some(user) => Ok(user),
            None => {
                warn!(user_id = %user_id, "token subject no longer exists");
                Err(AppError::Unauthorized)
            }
        }
    }
}
