//! Back-office surface. Everything except `/admin/login` sits behind the JWT
//! middleware below.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::{self, Next};
use axum::response::Response;
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use utoipa_axum::router::OpenApiRouter;

use crate::app_error::AppError;
use crate::app_state::AppState;

pub mod auth;
pub mod categories;
pub mod coupons;
pub mod customizations;
pub mod menu;
pub mod orders;
pub mod uploads;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AdminClaims {
    /// Admin id
    pub sub: i32,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

/// Identity of the authenticated admin, inserted as a request extension.
#[derive(Debug, Clone)]
pub struct AdminIdentity {
    pub admin_id: i32,
    pub email: String,
}

/// Require a valid `Authorization: Bearer <token>` admin session.
pub async fn admin_authorization(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let claims = jsonwebtoken::decode::<AdminClaims>(
        token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?
    .claims;

    req.extensions_mut().insert(AdminIdentity {
        admin_id: claims.sub,
        email: claims.email,
    });
    Ok(next.run(req).await)
}

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    let guard = middleware::from_fn_with_state(state, admin_authorization);

    let protected = OpenApiRouter::new()
        .merge(menu::routes_with_openapi())
        .merge(categories::routes_with_openapi())
        .merge(coupons::routes_with_openapi())
        .merge(customizations::routes_with_openapi())
        .merge(uploads::routes_with_openapi())
        .merge(orders::routes_with_openapi())
        .route_layer(guard.clone());

    OpenApiRouter::new()
        .nest("/admin", auth::routes_with_openapi().merge(protected))
        .merge(orders::status_routes_with_openapi().route_layer(guard))
}
