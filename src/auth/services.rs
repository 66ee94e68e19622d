use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::auth::{
    dto::{AuthResponse, LoginRequest, RegisterRequest},
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    repo::UserRepo,
    repo_types::{NewUser, PublicUser, User},
};
use crate::error::{AppError, AppResult};
use crate::store::Store;

const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    !username.is_empty() && !username.contains('@') && !username.chars().any(char::is_whitespace)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn register(store: &dyn Store, req: RegisterRequest) -> AppResult<User> {
    let username = req.username.trim().to_string();
    let email = normalize_email(&req.email);

    if !is_valid_username(&username) {
        warn!(%username, "invalid username");
        return Err(AppError::invalid(
            "username must be non-empty and cannot contain '@' or spaces",
        ));
    }
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::invalid("invalid email"));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::invalid(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if store.find_user_by_email(&email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AppError::Conflict("email already registered".into()));
    }
    if store.find_user_by_username(&username).await?.is_some() {
        warn!(%username, "username already taken");
        return Err(AppError::Conflict("username already taken".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let user = store
        .create_user(NewUser {
            username,
            email,
            password_hash,
        })
        .await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

pub async fn login(store: &dyn Store, req: LoginRequest) -> AppResult<User> {
    let found = match (req.username.as_deref().map(str::trim), req.email.as_deref()) {
        (Some(username), _) if !username.is_empty() => {
            if username.contains('@') {
                return Err(AppError::invalid("username cannot contain '@'"));
            }
            store.find_user_by_username(username).await?
        }
        (_, Some(email)) => {
            let email = normalize_email(email);
            if !is_valid_email(&email) {
                return Err(AppError::invalid("invalid email"));
            }
            store.find_user_by_email(&email).await?
        }
        _ => return Err(AppError::invalid("username or email is required")),
    };

    let Some(user) = found else {
        warn!("login with unknown identity");
        return Err(AppError::Unauthorized("invalid credentials".into()));
    };

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized("invalid credentials".into()));
    }

    info!(user_id = %user.id, "user logged in");
    Ok(user)
}

pub fn issue_tokens(keys: &JwtKeys, user: impl Into<PublicUser>) -> AppResult<AuthResponse> {
    let user = user.into();
    Ok(AuthResponse {
        access_token: keys.sign_access(user.id)?,
        refresh_token: keys.sign_refresh(user.id)?,
        user,
    })
}
