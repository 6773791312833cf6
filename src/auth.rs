use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use rand::{RngCore, rngs::OsRng};

use crate::{
    error::ApiError,
    models::{Role, User},
    repository::RepositoryState,
};

/// Number of random bytes behind a token; hex-encoded this gives 40 characters.
const TOKEN_BYTES: usize = 20;

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. Handlers use it to build
/// the visibility scope and to stamp the actor on new records.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        AuthUser {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
        }
    }
}

/// generate_token
///
/// A fresh opaque token: 20 bytes from the OS RNG, lowercase hex.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// token_from_header
///
/// Accepts both `Token <key>` and `Bearer <key>`, with the scheme keyword in any
/// case. Returns `None` for any other shape.
pub fn token_from_header(value: &str) -> Option<&str> {
    let (scheme, key) = value.trim_start().split_once(' ')?;
    if !(scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer")) {
        return None;
    }
    let key = key.trim();
    (!key.is_empty()).then_some(key)
}

/// AuthUser Extractor Implementation
///
/// Makes `AuthUser` usable as a handler argument. The key from the
/// `Authorization` header is looked up in the token table; the owning user is
/// loaded in the same query, so a deleted user's token stops working at once.
///
/// Rejection: `ApiError::Unauthorized` (401) when the header is missing,
/// malformed or names no stored token.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);

        let key = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(token_from_header)
            .ok_or(ApiError::Unauthorized)?;

        let user = repo
            .user_for_token(key)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        Ok(user.into())
    }
}
