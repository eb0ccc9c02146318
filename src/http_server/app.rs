use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use color_eyre::eyre::{Context, eyre};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::{
    config::Config,
    database::Database,
    http_server::{
        http_routes::{albums, image, models, upload},
        state::AppState,
    },
    storage::ObjectStorage,
};

pub struct HttpServerConfig {
    pub port: u16,
    pub database: Database,
    pub storage: Arc<dyn ObjectStorage>,
    pub config: Config,
    pub base_url: String,
}

async fn root() -> &'static str {
    "model-gallery"
}

#[cfg(debug_assertions)]
fn cors_layer(_base_url: &str) -> color_eyre::Result<CorsLayer> {
    Ok(CorsLayer::permissive())
}

#[cfg(not(debug_assertions))]
fn cors_layer(base_url: &str) -> color_eyre::Result<CorsLayer> {
    use axum::http::HeaderValue;
    use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin};

    let origin = HeaderValue::from_str(base_url.trim_end_matches('/'))
        .wrap_err_with(|| format!("Invalid BASE_URL for CORS: {base_url}"))?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::exact(origin))
        .allow_methods(AllowMethods::any())
        .allow_headers(AllowHeaders::any()))
}

/// All API routes, without the CORS and tracing layers.
pub fn router(app_state: Arc<AppState>) -> Router {
    let max_body_bytes = app_state.config.upload.max_body_mb * 1024 * 1024;

    Router::new()
        .route("/", get(root))
        .route(
            "/api/models",
            get(models::list_models).post(models::create_model),
        )
        .route(
            "/api/models/{id}",
            get(models::get_model)
                .put(models::update_model)
                .delete(models::delete_model),
        )
        .route(
            "/api/albums",
            get(albums::list_albums).post(albums::create_album),
        )
        .route(
            "/api/albums/{id}",
            get(albums::get_album)
                .put(albums::update_album)
                .delete(albums::delete_album),
        )
        .route("/api/upload", post(upload::upload_file))
        .route("/api/upload/presign", post(upload::presign_upload))
        .route("/api/image/{*key}", get(image::redirect_to_image))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(app_state)
}

pub async fn start(server_config: HttpServerConfig) -> color_eyre::Result<()> {
    let HttpServerConfig {
        port,
        database,
        storage,
        config,
        base_url,
    } = server_config;

    let app_state = Arc::new(AppState {
        db: Arc::new(database),
        storage,
        config,
    });

    let app = router(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&base_url)?),
    );

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .wrap_err_with(|| eyre!("Failed to bind to port {}", port))?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .await
        .wrap_err("Failed to start HTTP server")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde::de::DeserializeOwned;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::http_server::error::ErrorBody;
    use crate::http_server::http_routes::albums::{AlbumDto, AlbumListResponse};
    use crate::http_server::http_routes::models::{ModelDto, ModelListResponse};
    use crate::http_server::http_routes::upload::{PresignResponse, UploadResponse};
    use crate::storage::{MockObjectStorage, StorageError};
    use crate::test_utils::test_db;

    async fn app_with(storage: MockObjectStorage) -> Router {
        let app_state = Arc::new(AppState {
            db: test_db().await,
            storage: Arc::new(storage),
            config: Config::default(),
        });
        router(app_state)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn parse<T: DeserializeOwned>(body: &[u8]) -> T {
        serde_json::from_slice(body).unwrap()
    }

    fn multipart_request(parts: &[(&str, Option<(&str, &str)>, &[u8])]) -> Request<Body> {
        let boundary = "gallery-test-boundary";
        let mut body = Vec::new();
        for (name, file, content) in parts {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            match file {
                Some((filename, content_type)) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_model_crud_round_trip() {
        let app = app_with(MockObjectStorage::new()).await;

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/models",
                json!({
                    "name": "Alice",
                    "description": "Studio portraits",
                    "xUrl": "https://x.com/alice",
                    "instagramUrl": "https://instagram.com/alice"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let created: ModelDto = parse(&body);
        assert_eq!(created.x_url.as_deref(), Some("https://x.com/alice"));

        let (status, body) = send(&app, empty_request("GET", &format!("/api/models/{}", created.id))).await;
        assert_eq!(status, StatusCode::OK);
        let fetched: ModelDto = parse(&body);
        assert_eq!(fetched.name, "Alice");
        assert_eq!(fetched.description.as_deref(), Some("Studio portraits"));
        assert_eq!(
            fetched.instagram_url.as_deref(),
            Some("https://instagram.com/alice")
        );

        let (status, body) = send(
            &app,
            json_request(
                "PUT",
                &format!("/api/models/{}", created.id),
                json!({ "name": "Alice B" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let updated: ModelDto = parse(&body);
        assert_eq!(updated.name, "Alice B");
        assert!(updated.x_url.is_none());
    }

    #[tokio::test]
    async fn test_model_validation_and_not_found() {
        let app = app_with(MockObjectStorage::new()).await;

        let (status, body) = send(&app, json_request("POST", "/api/models", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorBody = parse(&body);
        assert_eq!(error.error, "Model name is required");

        let (status, _) = send(&app, empty_request("GET", "/api/models/999")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, empty_request("DELETE", "/api/models/999")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_requests_are_json_bad_requests() {
        let app = app_with(MockObjectStorage::new()).await;

        let wrong_type = json_request("POST", "/api/models", json!({ "name": 5 }));
        let not_json = Request::builder()
            .method("POST")
            .uri("/api/models")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let no_content_type = Request::builder()
            .method("POST")
            .uri("/api/albums")
            .body(Body::from(r#"{"name":"Spring"}"#))
            .unwrap();

        for request in [
            wrong_type,
            not_json,
            no_content_type,
            empty_request("GET", "/api/models/abc"),
            empty_request("DELETE", "/api/albums/abc"),
            empty_request("GET", "/api/models?page=abc"),
        ] {
            let uri = request.uri().clone();
            let (status, body) = send(&app, request).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            let error: ErrorBody = parse(&body);
            assert!(!error.error.is_empty(), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_upload_without_multipart_body_is_json_bad_request() {
        let mut storage = MockObjectStorage::new();
        storage.expect_put_object().never();
        let app = app_with(storage).await;

        let (status, body) = send(&app, json_request("POST", "/api/upload", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorBody = parse(&body);
        assert!(error.error.starts_with("Invalid multipart body"));
    }

    #[tokio::test]
    async fn test_soft_deleted_model_leaves_list_but_stays_fetchable() {
        let app = app_with(MockObjectStorage::new()).await;

        let (_, body) = send(&app, json_request("POST", "/api/models", json!({ "name": "Gone" }))).await;
        let created: ModelDto = parse(&body);

        let (status, _) = send(&app, empty_request("DELETE", &format!("/api/models/{}", created.id))).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, empty_request("GET", "/api/models")).await;
        let listed: ModelListResponse = parse(&body);
        assert!(listed.models.is_empty());
        assert_eq!(listed.pagination.total, 0);

        let (status, body) = send(&app, empty_request("GET", &format!("/api/models/{}", created.id))).await;
        assert_eq!(status, StatusCode::OK);
        let fetched: ModelDto = parse(&body);
        assert!(fetched.is_deleted);
    }

    #[tokio::test]
    async fn test_album_membership_replacement() {
        let app = app_with(MockObjectStorage::new()).await;

        let mut ids = Vec::new();
        for name in ["A", "B", "C"] {
            let (_, body) = send(&app, json_request("POST", "/api/models", json!({ "name": name }))).await;
            ids.push(parse::<ModelDto>(&body).id);
        }

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/albums",
                json!({ "name": "Summer", "imageCount": 12, "modelIds": [ids[0], ids[1]] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let album: AlbumDto = parse(&body);
        assert_eq!(album.image_count, 12);
        assert_eq!(album.video_count, 0);
        assert_eq!(album.models.len(), 2);

        let (status, body) = send(
            &app,
            json_request(
                "PUT",
                &format!("/api/albums/{}", album.id),
                json!({ "name": "Summer", "modelIds": [ids[2]] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let updated: AlbumDto = parse(&body);
        let linked: Vec<i64> = updated.models.iter().map(|m| m.id).collect();
        assert_eq!(linked, vec![ids[2]]);
        assert_eq!(updated.models[0].name, "C");

        let (_, body) = send(
            &app,
            empty_request("GET", &format!("/api/albums?modelId={}", ids[0])),
        )
        .await;
        let listed: AlbumListResponse = parse(&body);
        assert!(listed.albums.is_empty());

        let (_, body) = send(
            &app,
            empty_request("GET", &format!("/api/albums?modelId={}&search=summer", ids[2])),
        )
        .await;
        let listed: AlbumListResponse = parse(&body);
        assert_eq!(listed.albums.len(), 1);
        assert_eq!(listed.pagination.total_pages, 1);
    }

    #[tokio::test]
    async fn test_album_requires_name() {
        let app = app_with(MockObjectStorage::new()).await;

        let (status, body) = send(
            &app,
            json_request("POST", "/api/albums", json!({ "modelIds": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorBody = parse(&body);
        assert_eq!(error.error, "Album name is required");
    }

    #[tokio::test]
    async fn test_upload_stores_file_under_prefixed_key() {
        let mut storage = MockObjectStorage::new();
        storage
            .expect_put_object()
            .withf(|key, body, content_type| {
                key.starts_with("batch/")
                    && key.ends_with("-my-photo.jpg")
                    && body.as_slice() == b"jpeg-bytes"
                    && content_type == "image/jpeg"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        storage
            .expect_public_url()
            .returning(|key| format!("https://gallery.s3.ap-northeast-1.amazonaws.com/{key}"));
        let app = app_with(storage).await;

        let (status, body) = send(
            &app,
            multipart_request(&[
                ("file", Some(("my photo.jpg", "image/jpeg")), b"jpeg-bytes"),
                ("prefix", None, b"batch"),
            ]),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let response: UploadResponse = parse(&body);
        assert!(response.key.starts_with("batch/"));
        assert_eq!(response.filetype, "image/jpeg");
        assert!(response.url.ends_with(&response.key));
    }

    #[tokio::test]
    async fn test_upload_without_file_is_rejected() {
        let mut storage = MockObjectStorage::new();
        storage.expect_put_object().never();
        let app = app_with(storage).await;

        let (status, body) = send(&app, multipart_request(&[("prefix", None, b"batch")])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorBody = parse(&body);
        assert_eq!(error.error, "File is required");
    }

    #[tokio::test]
    async fn test_upload_storage_failure_is_500() {
        let mut storage = MockObjectStorage::new();
        storage
            .expect_put_object()
            .returning(|_, _, _| Err(StorageError::BucketNotConfigured));
        let app = app_with(storage).await;

        let (status, body) = send(
            &app,
            multipart_request(&[("file", Some(("a.png", "image/png")), b"png")]),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let error: ErrorBody = parse(&body);
        assert_eq!(error.error, "Upload failed");
    }

    #[tokio::test]
    async fn test_presign_upload() {
        let mut storage = MockObjectStorage::new();
        storage
            .expect_generate_upload_url()
            .withf(|key, content_type| key.starts_with("avatars/") && content_type == "image/png")
            .returning(|key, _| Ok(format!("https://signed.example/{key}?X-Amz-Expires=3600")));
        let app = app_with(storage).await;

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/upload/presign",
                json!({ "filename": "me.png", "contentType": "image/png", "prefix": "avatars" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let response: PresignResponse = parse(&body);
        assert!(response.key.ends_with("-me.png"));
        assert_eq!(response.expires_in, 3600);
        assert!(response.url.contains(&response.key));
    }

    #[tokio::test]
    async fn test_image_redirects_to_signed_url() {
        let mut storage = MockObjectStorage::new();
        storage
            .expect_generate_download_url()
            .withf(|key| key == "batch/1700000000000-my photo.jpg")
            .times(1)
            .returning(|_| Ok("https://signed.example/photo?X-Amz-Expires=300".to_string()));
        let app = app_with(storage).await;

        let response = app
            .clone()
            .oneshot(empty_request(
                "GET",
                "/api/image/batch/1700000000000-my%20photo.jpg",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://signed.example/photo?X-Amz-Expires=300"
        );
    }

    #[tokio::test]
    async fn test_image_without_bucket_is_500() {
        let mut storage = MockObjectStorage::new();
        storage
            .expect_generate_download_url()
            .returning(|_| Err(StorageError::BucketNotConfigured));
        let app = app_with(storage).await;

        let (status, body) = send(&app, empty_request("GET", "/api/image/a.jpg")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let error: ErrorBody = parse(&body);
        assert_eq!(error.error, "Failed to access image");
    }
}
