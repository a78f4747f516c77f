use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::dto::ProfileResponse;
use crate::auth::jwt::TokenCodec;
use crate::auth::password::{dummy_hash, hash_password_blocking, verify_password_blocking};
use crate::auth::repo::UserStore;
use crate::auth::repo_types::{AccountStatus, User};
use crate::clock::Clock;
use crate::context::RequestContext;
use crate::error::{AccountError, AccountResult};

const MAX_USERNAME_CHARS: usize = 64;
const MAX_DISPLAY_NAME_CHARS: usize = 64;
const MAX_PASSWORD_BYTES: usize = 128;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.\-]+$").unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Registration input after normalization.
#[derive(Debug)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub email: String,
    pub display_name: String,
}

impl NewAccount {
    pub fn normalize(
        username: &str,
        password: &str,
        email: &str,
        display_name: &str,
    ) -> AccountResult<Self> {
        let username = username.trim();
        if username.is_empty() || username.chars().count() > MAX_USERNAME_CHARS {
            return Err(AccountError::InvalidInput(format!(
                "username must be 1 to {MAX_USERNAME_CHARS} characters"
            )));
        }
        if !USERNAME_RE.is_match(username) {
            return Err(AccountError::InvalidInput(
                "username may only contain letters, digits, '_', '-' and '.'".into(),
            ));
        }
        if password.is_empty() || password.len() > MAX_PASSWORD_BYTES {
            return Err(AccountError::InvalidInput(format!(
                "password must be 1 to {MAX_PASSWORD_BYTES} bytes"
            )));
        }
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AccountError::InvalidInput("invalid email".into()));
        }
        let display_name = display_name.trim();
        if display_name.is_empty() || display_name.chars().count() > MAX_DISPLAY_NAME_CHARS {
            return Err(AccountError::InvalidInput(format!(
                "display_name must be 1 to {MAX_DISPLAY_NAME_CHARS} characters"
            )));
        }

        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
            email,
            display_name: display_name.to_string(),
        })
    }
}

/// Login, registration and profile lookup over a [`UserStore`].
pub struct AccountService {
    store: Arc<dyn UserStore>,
    tokens: TokenCodec,
    clock: Arc<dyn Clock>,
}

impl AccountService {
    pub fn new(store: Arc<dyn UserStore>, tokens: TokenCodec, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            tokens,
            clock,
        }
    }

    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    /// Checks credentials and returns a fresh session token.
    ///
    /// Unknown username and wrong password fail with different variants
    /// here; the HTTP layer renders both identically.
    #[instrument(skip(self, ctx, password), fields(request_id = %ctx.request_id))]
    pub async fn login(
        &self,
        ctx: &RequestContext,
        username: &str,
        password: &str,
    ) -> AccountResult<String> {
        let username = username.trim();
        let found = self.store.find_by_username(username).await?;

        // unknown usernames verify against a dummy hash
        let hash = found
            .as_ref()
            .map(|u| u.password_hash.clone())
            .unwrap_or_else(|| dummy_hash().to_string());
        let matched = verify_password_blocking(password.to_string(), hash).await?;

        let user = match found {
            Some(u) => u,
            None => {
                warn!(%username, "login unknown username");
                return Err(AccountError::AccountNotFound);
            }
        };
        if !matched {
            warn!(%username, user_id = %user.id, "login invalid password");
            return Err(AccountError::PasswordMismatch);
        }

        if !user.is_enabled() {
            warn!(%username, user_id = %user.id, "login on disabled account");
            return Err(AccountError::AccountLocked);
        }

        let token = self.tokens.issue_at(user.id, self.clock.now())?;
        info!(user_id = %user.id, "user logged in");
        Ok(token)
    }

    #[instrument(skip(self, ctx, password), fields(request_id = %ctx.request_id))]
    pub async fn register(
        &self,
        ctx: &RequestContext,
        username: &str,
        password: &str,
        email: &str,
        display_name: &str,
    ) -> AccountResult<Uuid> {
        let input = NewAccount::normalize(username, password, email, display_name)?;
        let password_hash = hash_password_blocking(input.password).await?;

        let now = self.clock.now();
        let user = User {
            id: Uuid::new_v4(),
            username: input.username,
            password_hash,
            email: input.email,
            display_name: input.display_name,
            status: AccountStatus::Enabled,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };

        let id = match self.store.insert(&user).await {
            Ok(id) => id,
            Err(AccountError::DuplicateUsername) => {
                warn!(username = %user.username, "username already registered");
                return Err(AccountError::DuplicateUsername);
            }
            Err(e) => return Err(e),
        };
        info!(user_id = %id, username = %user.username, "user registered");
        Ok(id)
    }

    #[instrument(skip(self, ctx, token), fields(request_id = %ctx.request_id))]
    pub async fn get_profile(
        &self,
        ctx: &RequestContext,
        token: &str,
    ) -> AccountResult<ProfileResponse> {
        let claims = self.tokens.parse_at(token, self.clock.now())?;
        let user_id = claims.user_id();

        let user = self.store.find_by_id(user_id).await?.ok_or_else(|| {
            warn!(%user_id, "token refers to missing user");
            AccountError::AccountNotFound
        })?;

        Ok(ProfileResponse::from(&user))
    }
}
