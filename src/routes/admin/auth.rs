use anyhow::Context;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl};
use diesel_async::RunQueryDsl;
use jsonwebtoken::{EncodingKey, Header};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::app_error::AppError;
use crate::app_state::AppState;
use crate::models::AdminEntity;
use crate::routes::admin::AdminClaims;
use crate::schema::admins;

const SESSION_HOURS: i64 = 24;

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(utoipa_axum::routes!(login))
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow::anyhow!("Failed to hash password: {err}"))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(password_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn create_token(admin: &AdminEntity, jwt_secret: &str) -> anyhow::Result<String> {
    let now = Utc::now();
    let claims = AdminClaims {
        sub: admin.id,
        email: admin.email.clone(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::hours(SESSION_HOURS)).timestamp(),
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .context("Failed to sign session token")
}

#[derive(Deserialize, ToSchema)]
struct LoginReq {
    email: String,
    password: String,
}

#[derive(Serialize, ToSchema)]
struct LoginRes {
    token: String,
    name: String,
    email: String,
}

/// Exchange admin credentials for a session token.
///
/// Unknown emails and wrong passwords both come back as 401 without
/// distinguishing which check failed.
#[utoipa::path(
    post,
    path = "/login",
    tags = ["Admin"],
    request_body = LoginReq,
    responses(
        (status = 200, description = "Login successfully", body = LoginRes),
        (status = 401, description = "Invalid credentials")
    )
)]
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let admin: Option<AdminEntity> = admins::table
        .filter(admins::email.eq(body.email.trim().to_lowercase()))
        .first(conn)
        .await
        .optional()
        .context("Failed to look up admin")?;

    let Some(admin) = admin else {
        return Err(AppError::Unauthorized);
    };
    if !verify_password(&body.password, &admin.password_hash) {
        return Err(AppError::Unauthorized);
    }

    let token = create_token(&admin, &state.config.jwt_secret)?;
    tracing::info!(email = %admin.email, "Admin logged in");

    Ok(Json(LoginRes {
        token,
        name: admin.name,
        email: admin.email,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("hunter2", "not-a-phc-string"));
    }
}
