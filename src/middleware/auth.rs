use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{dto::auth::Claims, entity::users::Role, error::AppError, state::AppState};

pub const TOKEN_COOKIE: &str = "token";

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    if !user.is_admin() {
        return Err(AppError::forbidden());
    }
    Ok(())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let token = token_from_headers(&parts.headers).ok_or(AppError::Unauthorized)?;
        let user = decode_token(&token, &state.config.jwt_secret)?;
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

/// Bearer header first, then the auth cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|raw| cookie_value(raw, TOKEN_COOKIE))
        .map(str::to_string)
}

pub fn decode_token(token: &str, secret: &str) -> Result<AuthUser, AppError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|err| {
        tracing::debug!(error = %err, "rejected token");
        AppError::Unauthorized
    })?;

    let claims = decoded.claims;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)?;
    Ok(AuthUser {
        user_id,
        email: claims.email,
        name: claims.name,
        role: claims.role,
    })
}

pub fn cookie_value<'a>(raw: &'a str, name: &str) -> Option<&'a str> {
    raw.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then_some(value)
    })
}

pub fn auth_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie =
        format!("{TOKEN_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_auth_cookie(secure: bool) -> String {
    auth_cookie("", 0, secure)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};

    use super::*;

    fn sign(secret: &str, exp_offset: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: "staff@shop.local".into(),
            name: "Staff".into(),
            role: Role::Staff,
            iat: now as usize,
            exp: (now + exp_offset) as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn cookie_lookup_handles_multiple_pairs() {
        assert_eq!(cookie_value("a=1; token=abc; b=2", "token"), Some("abc"));
        assert_eq!(cookie_value("tokenx=1", "token"), None);
        assert_eq!(cookie_value("token=", "token"), None);
    }

    #[test]
    fn bearer_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("token=from-cookie"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("from-cookie"));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn auth_cookie_attributes() {
        assert_eq!(
            auth_cookie("jwt", 60, true),
            "token=jwt; HttpOnly; SameSite=Lax; Path=/; Max-Age=60; Secure"
        );
        assert!(clear_auth_cookie(false).contains("Max-Age=0"));
    }

    #[test]
    fn decode_rejects_wrong_secret_and_expired_tokens() {
        let ok = sign("secret", 3600);
        let user = decode_token(&ok, "secret").unwrap();
        assert_eq!(user.role, Role::Staff);
        assert!(!user.is_admin());
        assert!(matches!(decode_token(&ok, "other"), Err(AppError::Unauthorized)));

        let expired = sign("secret", -3600);
        assert!(matches!(
            decode_token(&expired, "secret"),
            Err(AppError::Unauthorized)
        ));
    }
}
