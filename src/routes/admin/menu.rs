use anyhow::Context;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use utoipa_axum::router::OpenApiRouter;

use crate::app_error::{AppError, StdResponse};
use crate::app_state::AppState;
use crate::models::{CreateMenuItemEntity, MenuItemEntity, UpdateMenuItemEntity};
use crate::schema::menu_items;

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/menu",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(list_menu_items))
            .routes(utoipa_axum::routes!(create_menu_item))
            .routes(utoipa_axum::routes!(update_menu_item))
            .routes(utoipa_axum::routes!(delete_menu_item)),
    )
}

/// List all menu items, unavailable ones included.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Admin"],
    responses(
        (status = 200, description = "All menu items", body = StdResponse<Vec<MenuItemEntity>, String>)
    )
)]
async fn list_menu_items(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let items: Vec<MenuItemEntity> = menu_items::table
        .order_by(menu_items::name.asc())
        .get_results(conn)
        .await
        .context("Failed to get menu items")?;

    Ok(StdResponse {
        data: Some(items),
        message: Some("Get menu items successfully"),
    })
}

/// Add a menu item.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Admin"],
    request_body = CreateMenuItemEntity,
    responses(
        (status = 200, description = "Create menu item successfully", body = StdResponse<MenuItemEntity, String>)
    )
)]
async fn create_menu_item(
    State(state): State<AppState>,
    Json(body): Json<CreateMenuItemEntity>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let item: MenuItemEntity = diesel::insert_into(menu_items::table)
        .values(&body)
        .returning(MenuItemEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create menu item")?;

    Ok(StdResponse {
        data: Some(item),
        message: Some("Create menu item successfully"),
    })
}

/// Update a menu item. Only the provided fields change.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Admin"],
    params(
        ("id" = String, Path, description = "Menu item ID to update")
    ),
    request_body = UpdateMenuItemEntity,
    responses(
        (status = 200, description = "Update menu item successfully", body = StdResponse<MenuItemEntity, String>),
        (status = 404, description = "Menu item not found")
    )
)]
async fn update_menu_item(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<UpdateMenuItemEntity>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let item: MenuItemEntity = diesel::update(menu_items::table.find(&id))
        .set((&body, menu_items::updated_at.eq(diesel::dsl::now)))
        .returning(MenuItemEntity::as_returning())
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(item),
        message: Some("Update menu item successfully"),
    })
}

/// Remove a menu item. Past order snapshots keep their copied name and price.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Admin"],
    params(
        ("id" = String, Path, description = "Menu item ID to delete")
    ),
    responses(
        (status = 200, description = "Delete menu item successfully", body = StdResponse<String, String>),
        (status = 404, description = "Menu item not found")
    )
)]
async fn delete_menu_item(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let deleted = diesel::delete(menu_items::table.find(&id))
        .execute(conn)
        .await
        .context("Failed to delete menu item")?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }

    Ok(StdResponse {
        data: Some(id),
        message: Some("Delete menu item successfully"),
    })
}
