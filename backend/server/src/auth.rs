//! # Tokens
//!
//! Identity is a self-contained HS256 JWT stored client-side in an HTTP-only
//! `token` cookie. Nothing is kept server-side, so logging out only clears
//! the cookie.
//!
//! ## Cookie Policy
//! - Always `HttpOnly` and `Path=/`
//! - Production: `Secure; SameSite=None`, the frontend is served from another origin
//! - Otherwise: `SameSite=Strict` over plain HTTP
//!
//! ## Guard
//! [`require_token`] only proves who the caller is. Whether the caller may touch
//! a record is decided per route with [`authorize`].
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{error::AppError, models::TokenRequest};

pub const TOKEN_COOKIE: &str = "token";
pub const TOKEN_LIFETIME_HOURS: i64 = 5;

const RESERVED_CLAIMS: [&str; 3] = ["email", "iat", "exp"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    /// Remaining fields of the user object posted to `/jwt`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    production: bool,
}

impl TokenService {
    pub fn new(secret: &str, production: bool) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            production,
        }
    }

    pub fn issue(&self, email: &str) -> Result<String, AppError> {
        self.issue_at(email, Utc::now())
    }

    pub fn issue_at(&self, email: &str, issued_at: DateTime<Utc>) -> Result<String, AppError> {
        self.sign(email.to_string(), Map::new(), issued_at)
    }

    /// Signs the whole user object, `email` plus whatever else it carries.
    pub fn issue_for(&self, user: &TokenRequest) -> Result<String, AppError> {
        self.sign(user.email.clone(), user.extra.clone(), Utc::now())
    }

    fn sign(
        &self,
        email: String,
        mut extra: Map<String, Value>,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AppError> {
        // timing and identity claims are always server-set
        extra.retain(|key, _| !RESERVED_CLAIMS.contains(&key.as_str()));

        let claims = Claims {
            email,
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp(),
            extra,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Rejected token: {e}");

                AppError::Unauthorized
            })
    }

    pub fn cookie(&self, token: String) -> Cookie<'static> {
        let mut cookie = Cookie::build((TOKEN_COOKIE, token))
            .path("/")
            .http_only(true)
            .build();

        if self.production {
            cookie.set_secure(true);
            cookie.set_same_site(SameSite::None);
        } else {
            cookie.set_same_site(SameSite::Strict);
        }

        cookie
    }

    /// Expired blank cookie with the same attributes as [`Self::cookie`].
    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = self.cookie(String::new());
        cookie.make_removal();

        cookie
    }
}

pub async fn require_token(
    State(tokens): State<TokenService>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(cookie) = jar.get(TOKEN_COOKIE) else {
        debug!("Missing token cookie on {}", request.uri().path());

        return Err(AppError::Unauthorized);
    };

    let claims = tokens.verify(cookie.value())?;
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Single ownership rule for every per-user route.
pub fn authorize(claims: &Claims, owner_email: &str) -> Result<(), AppError> {
    if claims.email == owner_email {
        return Ok(());
    }

    warn!("{} tried to access a record owned by {owner_email}", claims.email);

    Err(AppError::Forbidden)
}
