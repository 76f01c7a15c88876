use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::{error, info};

use crate::{
    batch::{parse_batch, process_batch},
    render::Renderer,
    settings::Settings,
};

#[derive(Clone)]
struct AppState {
    renderer: Arc<dyn Renderer>,
}

/// Builds the router with the following routes:
/// - `POST /process-automata` takes a JSON array of automaton descriptions and answers with
///   the JSON array of [`crate::batch::ItemReport`]s, in the same order.
/// - `GET /health` answers `ok`.
pub fn router(renderer: Arc<dyn Renderer>) -> Router {
    Router::new()
        .route("/process-automata", post(process_automata))
        .route("/health", get(|| async { "ok" }))
        .with_state(AppState { renderer })
}

/// Serves [`router`] on the configured address until the process receives Ctrl+C.
pub async fn serve(settings: &Settings) -> std::io::Result<()> {
    let app = router(settings.renderer());
    let listener = tokio::net::TcpListener::bind(settings.bind).await?;
    info!(
        "listening on http://{}, writing diagrams to {}",
        listener.local_addr()?,
        settings.diagram_dir.display()
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("could not listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

/// Accepts `application/json` and `application/<something>+json`, ignoring parameters such as
/// the charset.
fn is_json_media_type(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    media_type == "application/json"
        || media_type
            .strip_prefix("application/")
            .is_some_and(|subtype| subtype.ends_with("+json"))
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn process_automata(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(is_json_media_type);
    if !is_json {
        return error_response(
            StatusCode::BAD_REQUEST,
            "request body must be JSON".to_string(),
        );
    }

    let items = match parse_batch(&body) {
        Ok(items) => items,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };
    info!("received batch of {} automata", items.len());

    let renderer = state.renderer.clone();
    match tokio::task::spawn_blocking(move || process_batch(&items, renderer.as_ref())).await {
        Ok(reports) => Json(reports).into_response(),
        Err(e) => {
            error!("batch processing was aborted: {e}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "batch processing was aborted".to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        render::NoRenderer,
        tests::{ends_in_ab, even_binary},
    };

    async fn post_json(content_type: &str, body: Vec<u8>) -> (StatusCode, Value) {
        let response = router(Arc::new(NoRenderer))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/process-automata")
                    .header(header::CONTENT_TYPE, content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn processes_a_batch() {
        let mut invalid = ends_in_ab();
        invalid["acceptance_states"] = json!(["q9"]);
        let body = serde_json::to_vec(&json!([even_binary(), invalid, {"name": "no id"}])).unwrap();

        let (status, value) = post_json("application/json", body).await;
        assert_eq!(status, StatusCode::OK);
        let reports = value.as_array().unwrap();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0]["success"], json!(true));
        assert_eq!(
            reports[0]["inputs_validation"][0],
            json!({"input": "0", "accepted": true})
        );
        assert_eq!(reports[1]["id"], json!("ends-ab"));
        assert_eq!(
            reports[1]["error_kind"],
            json!("AcceptanceStatesNotInStates")
        );
        assert_eq!(reports[2]["id"], json!(null));
        assert_eq!(reports[2]["success"], json!(false));
    }

    #[tokio::test]
    async fn rejects_non_json_requests() {
        let (status, value) = post_json("text/plain", b"[]".to_vec()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], json!("request body must be JSON"));

        let (status, value) = post_json("application/json", b"[{".to_vec()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], json!("request body must be JSON"));
    }

    #[test]
    fn json_media_types() {
        assert!(is_json_media_type("application/json"));
        assert!(is_json_media_type("Application/JSON; charset=utf-8"));
        assert!(is_json_media_type("application/vnd.api+json"));
        assert!(!is_json_media_type("text/plain"));
        assert!(!is_json_media_type("application/jsonp"));
        assert!(!is_json_media_type("text/x+json"));
    }

    #[tokio::test]
    async fn accepts_structured_json_media_types() {
        let body = serde_json::to_vec(&json!([even_binary()])).unwrap();
        let (status, value) = post_json("application/vnd.automata+json", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value[0]["success"], json!(true));
    }

    #[tokio::test]
    async fn rejects_non_list_bodies() {
        let body = serde_json::to_vec(&even_binary()).unwrap();
        let (status, value) = post_json("application/json; charset=utf-8", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], json!("input must be a list of automata"));
    }

    #[tokio::test]
    async fn health() {
        let response = router(Arc::new(NoRenderer))
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
