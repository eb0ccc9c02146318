use std::sync::Arc;

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use color_eyre::eyre::WrapErr;

use crate::http_server::error::Report;
use crate::http_server::extract::Path;
use crate::http_server::state::AppState;

/// `GET /api/image/{*key}`: 302 to a freshly signed download URL.
///
/// The key may span several path segments (`batch/1700000000000-a.jpg`); axum
/// hands it over already percent-decoded.
pub async fn redirect_to_image(
    State(app_state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, Report> {
    let url = app_state
        .storage
        .generate_download_url(&key)
        .await
        .wrap_err("Failed to access image")?;

    Ok((StatusCode::FOUND, [(header::LOCATION, url)]))
}
