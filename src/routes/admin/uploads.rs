use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::app_error::{AppError, StdResponse};
use crate::app_state::AppState;

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/upload",
        OpenApiRouter::new().routes(utoipa_axum::routes!(upload_image)),
    )
}

#[derive(Serialize, ToSchema)]
struct UploadRes {
    url: String,
}

/// Upload a menu image. Expects a multipart form with a `file` field;
/// returns the public URL to store on the menu item.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Admin"],
    responses(
        (status = 200, description = "Upload image successfully", body = StdResponse<UploadRes, String>),
        (status = 400, description = "Missing file field"),
        (status = 502, description = "Image storage is not configured or unreachable")
    )
)]
async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let Some(images) = &state.images else {
        return Err(AppError::ServiceUnreachable("ImageStorage".into()));
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(err.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let extension = match content_type.as_str() {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            other => {
                return Err(AppError::BadRequest(format!(
                    "Unsupported image type: {other}"
                )));
            }
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::BadRequest(err.to_string()))?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".into()));
        }

        let key = format!(
            "menu-items/{}-{}.{extension}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4()
        );
        let url = images
            .upload(&key, bytes.to_vec(), &content_type)
            .await
            .map_err(|_| AppError::ServiceUnreachable("ImageStorage".into()))?;

        return Ok(StdResponse {
            data: Some(UploadRes { url }),
            message: Some("Upload image successfully"),
        });
    }

    Err(AppError::BadRequest("Missing file field".into()))
}
