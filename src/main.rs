use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use diesel_migrations::{EmbeddedMigrations, embed_migrations};
use tikki_storefront::{app_state::AppState, bootstrap, config::Config, db, routes};
use tower_http::trace::TraceLayer;
use utoipa_swagger_ui::SwaggerUi;

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    let config = Arc::new(Config::from_env()?);

    tracing::info!("Running migrations...");
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database_url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    let state = AppState::init(config.clone()).await?;

    let api = routes::menu::routes_with_openapi()
        .merge(routes::coupons::routes_with_openapi())
        .merge(routes::orders::routes_with_openapi())
        .merge(routes::payments::routes_with_openapi())
        .merge(routes::admin::routes_with_openapi(state.clone()));

    let mut openapi = api.get_openapi().clone();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("Tikki Storefront API")
        .version("1.0.0")
        .build();
    let swagger_ui = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi);

    let app = Router::new()
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(Router::from(swagger_ui));

    bootstrap::serve(app, config.http_port).await
}
