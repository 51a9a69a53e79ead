use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use bookmarks_app::{Application, BookmarkInput, FileInfo, SortOrderInput};
use bookmarks_shared::types::{AppInfo, User};
use bookmarks_store::Bookmark;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub app: Application,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    let api = Router::new()
        .route("/appinfo", get(app_info))
        .route("/bookmarks", get(bookmarks_root).post(create_bookmark).put(update_bookmark))
        .route("/bookmarks/sortorder", axum::routing::put(update_sort_order))
        .route("/bookmarks/bypath", get(bookmarks_by_path))
        .route("/bookmarks/byname", get(bookmarks_by_name))
        .route("/bookmarks/folder", get(folder_by_path))
        .route("/bookmarks/folder/:id", delete(delete_folder))
        .route("/bookmarks/allpaths", get(all_paths))
        .route("/bookmarks/mostvisited/:num", get(most_visited))
        .route("/bookmarks/path", delete(delete_path))
        .route("/bookmarks/fetch/:id", get(fetch_and_forward))
        .route("/bookmarks/favicon/:id", get(bookmark_favicon))
        .route("/bookmarks/favicon/raw/:id", get(favicon_by_id))
        .route("/bookmarks/favicons/available", get(available_favicons))
        .route("/bookmarks/file/:id", get(bookmark_file).delete(delete_bookmark_file))
        .route("/bookmarks/:id", get(bookmark_by_id).delete(delete_bookmark));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Principal
// ---------------------------------------------------------------------------

/// The user authenticated by the fronting proxy.
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let header_name = state.config.user_header.as_str();
        let username = header_value(&parts.headers, header_name)
            .ok_or_else(|| ApiError::Unauthenticated(header_name.to_string()))?;

        let mut user = User::named(username);
        if let Some(email) = header_value(&parts.headers, "x-forwarded-email") {
            user.email = email;
        }
        if let Some(name) = header_value(&parts.headers, "x-forwarded-name") {
            user.display_name = name;
        }
        if let Some(roles) = header_value(&parts.headers, "x-forwarded-roles") {
            user.roles = roles
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect();
        }
        Ok(CurrentUser(user))
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ListResponse<T> {
    count: usize,
    value: Vec<T>,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(value: Vec<T>) -> Self {
        Self {
            count: value.len(),
            value,
        }
    }
}

#[derive(Serialize)]
struct PathsResponse {
    count: usize,
    paths: Vec<String>,
}

#[derive(Serialize)]
struct ResultResponse {
    id: String,
    message: String,
}

#[derive(Serialize)]
struct SortOrderResponse {
    updates: usize,
}

#[derive(Deserialize)]
struct PathQuery {
    #[serde(default)]
    path: String,
}

#[derive(Deserialize)]
struct NameQuery {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn app_info(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Json<AppInfo> {
    Json(state.app.app_info(&user))
}

async fn bookmarks_root(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ListResponse<Bookmark>>, ApiError> {
    let bookmarks = state
        .app
        .run_blocking(move |app| app.get_bookmarks_by_path("/", &user))
        .await?;
    Ok(Json(bookmarks.into()))
}

async fn bookmark_by_id(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Bookmark>, ApiError> {
    let bookmark = state
        .app
        .run_blocking(move |app| app.get_bookmark_by_id(&id, &user))
        .await?;
    Ok(Json(bookmark))
}

async fn bookmarks_by_path(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PathQuery>,
) -> Result<Json<ListResponse<Bookmark>>, ApiError> {
    let bookmarks = state
        .app
        .run_blocking(move |app| app.get_bookmarks_by_path(&query.path, &user))
        .await?;
    Ok(Json(bookmarks.into()))
}

async fn bookmarks_by_name(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<NameQuery>,
) -> Result<Json<ListResponse<Bookmark>>, ApiError> {
    let bookmarks = state
        .app
        .run_blocking(move |app| app.get_bookmarks_by_name(&query.name, &user))
        .await?;
    Ok(Json(bookmarks.into()))
}

async fn folder_by_path(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PathQuery>,
) -> Result<Json<Bookmark>, ApiError> {
    let folder = state
        .app
        .run_blocking(move |app| app.get_bookmarks_folder_by_path(&query.path, &user))
        .await?;
    Ok(Json(folder))
}

async fn all_paths(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<PathsResponse>, ApiError> {
    let paths = state
        .app
        .run_blocking(move |app| app.get_all_paths(&user))
        .await?;
    Ok(Json(PathsResponse {
        count: paths.len(),
        paths,
    }))
}

async fn most_visited(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(num): Path<String>,
) -> Result<Json<ListResponse<Bookmark>>, ApiError> {
    let limit: u32 = num
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("'{num}' is not a valid number of items")))?;
    let bookmarks = state
        .app
        .run_blocking(move |app| app.get_most_visited(limit, &user))
        .await?;
    Ok(Json(bookmarks.into()))
}

async fn create_bookmark(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<BookmarkInput>,
) -> Result<(StatusCode, Json<ResultResponse>), ApiError> {
    let created = state
        .app
        .run_blocking(move |app| app.create_bookmark(input, &user))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ResultResponse {
            message: format!("Bookmark created with id '{}'", created.id),
            id: created.id,
        }),
    ))
}

async fn update_bookmark(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<BookmarkInput>,
) -> Result<Json<ResultResponse>, ApiError> {
    let updated = state
        .app
        .run_blocking(move |app| app.update(input, &user))
        .await?;
    Ok(Json(ResultResponse {
        message: format!("Bookmark with id '{}' was updated", updated.id),
        id: updated.id,
    }))
}

async fn update_sort_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(sort): Json<SortOrderInput>,
) -> Result<Json<SortOrderResponse>, ApiError> {
    let updates = state
        .app
        .run_blocking(move |app| app.update_sort_order(&sort, &user))
        .await?;
    Ok(Json(SortOrderResponse { updates }))
}

async fn delete_bookmark(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ResultResponse>, ApiError> {
    let target = id.clone();
    state
        .app
        .run_blocking(move |app| app.delete(&target, &user))
        .await?;
    Ok(Json(ResultResponse {
        message: format!("Bookmark with id '{id}' was deleted"),
        id,
    }))
}

async fn delete_folder(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ResultResponse>, ApiError> {
    let target = id.clone();
    state
        .app
        .run_blocking(move |app| app.delete_folder(&target, &user))
        .await?;
    Ok(Json(ResultResponse {
        message: format!("Folder with id '{id}' and its children were deleted"),
        id,
    }))
}

async fn delete_path(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PathQuery>,
) -> Result<Json<ResultResponse>, ApiError> {
    let path = query.path.clone();
    state
        .app
        .run_blocking(move |app| app.delete_path(&query.path, &user))
        .await?;
    info!(path = %path, "path deleted via API");
    Ok(Json(ResultResponse {
        message: format!("Path '{path}' was deleted"),
        id: path,
    }))
}

async fn fetch_and_forward(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let url = state
        .app
        .run_blocking(move |app| app.fetch_and_forward(&id, &user))
        .await?;
    let location = HeaderValue::from_str(&url)
        .map_err(|_| ApiError::BadRequest(format!("bookmark url '{url}' cannot be forwarded")))?;
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

async fn bookmark_favicon(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let favicon = state.app.get_favicon(&id, &user).await?;
    Ok(binary(favicon, false))
}

async fn favicon_by_id(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let favicon = state.app.get_favicon_by_id(&id).await?;
    Ok(binary(favicon, false))
}

async fn available_favicons(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ListResponse<FileInfo>>, ApiError> {
    let favicons = state
        .app
        .get_available_favicons(&user, &query.search)
        .await?;
    Ok(Json(favicons.into()))
}

async fn bookmark_file(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let file = state
        .app
        .run_blocking(move |app| app.get_bookmark_file(&id, &user))
        .await?;
    Ok(binary(file, true))
}

async fn delete_bookmark_file(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ResultResponse>, ApiError> {
    let target = id.clone();
    state
        .app
        .run_blocking(move |app| app.delete_bookmark_file(&target, &user))
        .await?;
    Ok(Json(ResultResponse {
        message: format!("File of bookmark '{id}' was deleted"),
        id,
    }))
}

/// Payload response with content type and `Last-Modified`.
fn binary(file: FileInfo, attachment: bool) -> Response {
    let last_modified = file
        .modified
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&file.mime_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&last_modified) {
        headers.insert(header::LAST_MODIFIED, value);
    }
    if attachment {
        let disposition = format!("inline; filename=\"{}\"", file.name.replace('"', ""));
        if let Ok(value) = HeaderValue::from_str(&disposition) {
            headers.insert(header::CONTENT_DISPOSITION, value);
        }
    }

    (StatusCode::OK, headers, file.payload).into_response()
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use bookmarks_app::DbBlobStore;
    use bookmarks_favicon::{Content, FetchError, IconSource};
    use bookmarks_store::Store;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct NoIcons;

    #[async_trait]
    impl IconSource for NoIcons {
        async fn favicon_for_page(&self, page_url: &str) -> Result<Content, FetchError> {
            Err(FetchError::EmptyPayload(page_url.to_string()))
        }

        async fn favicon_from_url(&self, icon_url: &str) -> Result<Content, FetchError> {
            Err(FetchError::EmptyPayload(icon_url.to_string()))
        }
    }

    fn router() -> Router {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let blobs = Arc::new(DbBlobStore::new(store.clone(), 1024));
        let app = Application::new(store, blobs, Arc::new(NoIcons)).with_build("test");
        build_router(AppState {
            app,
            config: Arc::new(ServerConfig::default()),
        })
    }

    fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-user", "u");
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(router: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
        let response = router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    async fn send_json(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let (status, _, body) = send(router, req).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_needs_no_user() {
        let router = router();
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send_json(&router, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_missing_user_is_unauthorized() {
        let router = router();
        let req = Request::builder()
            .uri("/api/v1/bookmarks/allpaths")
            .body(Body::empty())
            .unwrap();
        let (status, headers, body) = send(&router, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(headers[header::CONTENT_TYPE], "application/problem+json");
        let problem: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(problem["status"], 401);
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let router = router();
        let (status, created) = send_json(
            &router,
            request(
                Method::POST,
                "/api/v1/bookmarks",
                Some(json!({"path": "/", "display_name": "A", "type": "Folder"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_string();

        let (status, bookmark) =
            send_json(&router, request(Method::GET, &format!("/api/v1/bookmarks/{id}"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bookmark["display_name"], "A");
        assert_eq!(bookmark["type"], "Folder");

        let (_, list) =
            send_json(&router, request(Method::GET, "/api/v1/bookmarks/bypath?path=/", None)).await;
        assert_eq!(list["count"], 1);

        let (_, paths) =
            send_json(&router, request(Method::GET, "/api/v1/bookmarks/allpaths", None)).await;
        assert_eq!(paths["paths"], json!(["/", "/A"]));

        let (status, root) =
            send_json(&router, request(Method::GET, "/api/v1/bookmarks/folder?path=/", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(root["id"], "u_ROOT");
    }

    #[tokio::test]
    async fn test_errors_are_problem_documents() {
        let router = router();
        let (status, problem) = send_json(
            &router,
            request(
                Method::POST,
                "/api/v1/bookmarks",
                Some(json!({"path": "/missing", "display_name": "A", "type": "Folder"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(problem["title"], "Hierarchy");
        assert_eq!(problem["status"], 400);

        let (status, _) =
            send_json(&router, request(Method::GET, "/api/v1/bookmarks/nope", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send_json(
            &router,
            request(Method::DELETE, "/api/v1/bookmarks/path?path=/", None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_fetch_redirects_and_favicon_defaults() {
        let router = router();
        let (_, created) = send_json(
            &router,
            request(
                Method::POST,
                "/api/v1/bookmarks",
                Some(json!({"path": "/", "display_name": "N", "type": "Node", "url": "http://example.org/"})),
            ),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();

        let (status, headers, _) = send(
            &router,
            request(Method::GET, &format!("/api/v1/bookmarks/fetch/{id}"), None),
        )
        .await;
        assert_eq!(status, StatusCode::FOUND);
        assert_eq!(headers[header::LOCATION], "http://example.org/");

        let (status, headers, body) = send(
            &router,
            request(Method::GET, &format!("/api/v1/bookmarks/favicon/{id}"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "image/svg+xml");
        assert_eq!(headers[header::LAST_MODIFIED], "Sat, 31 Dec 2022 00:00:00 GMT");
        assert!(body.starts_with(b"<svg"));

        let (_, visited) = send_json(
            &router,
            request(Method::GET, "/api/v1/bookmarks/mostvisited/5", None),
        )
        .await;
        assert_eq!(visited["count"], 1);
    }

    #[tokio::test]
    async fn test_delete_populated_folder_conflicts() {
        let router = router();
        let (_, folder) = send_json(
            &router,
            request(
                Method::POST,
                "/api/v1/bookmarks",
                Some(json!({"path": "/", "display_name": "A", "type": "Folder"})),
            ),
        )
        .await;
        send_json(
            &router,
            request(
                Method::POST,
                "/api/v1/bookmarks",
                Some(json!({"path": "/A", "display_name": "B", "type": "Folder"})),
            ),
        )
        .await;
        let id = folder["id"].as_str().unwrap();

        let (status, problem) =
            send_json(&router, request(Method::DELETE, &format!("/api/v1/bookmarks/{id}"), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(problem["detail"]
            .as_str()
            .unwrap()
            .contains("existing child-elements 1"));

        let (status, _) = send_json(
            &router,
            request(Method::DELETE, &format!("/api/v1/bookmarks/folder/{id}"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, paths) =
            send_json(&router, request(Method::GET, "/api/v1/bookmarks/allpaths", None)).await;
        assert_eq!(paths["paths"], json!(["/"]));
    }

    #[tokio::test]
    async fn test_appinfo_reports_user() {
        let router = router();
        let req = Request::builder()
            .uri("/api/v1/appinfo")
            .header("x-forwarded-user", "u")
            .header("x-forwarded-roles", "admin, user")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send_json(&router, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["user_name"], "u");
        assert_eq!(body["user"]["roles"], json!(["admin", "user"]));
        assert_eq!(body["version"]["build"], "test");
    }
}
