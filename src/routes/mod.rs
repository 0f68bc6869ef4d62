//! Route modules for the Marginalia server

pub mod annotations;
pub mod documents;
pub mod health;
pub mod highlights;

use axum::{extract::DefaultBodyLimit, Router};

use crate::state::AppState;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let max_body = state.config().server.max_document_bytes;

    let documents = documents::router()
        .merge(highlights::router())
        .merge(annotations::router());

    Router::new()
        .nest("/health", health::router())
        .nest("/api/v1/health", health::router())
        .nest("/api/v1/documents", documents)
        // Documents and annotation files can be large
        .layer(DefaultBodyLimit::max(max_body))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;

    const ESSAY: &str = "<html><body><h1>On Margins</h1><p>Readers write in margins. Margins remember readers.</p><script>alert(1)</script></body></html>";

    fn app() -> Router {
        router(AppState::new(Config::default()))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn load(app: &Router) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/v1/documents",
            Some(json!({"fileName": "margins.html", "html": ESSAY})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["documents"], 0);
    }

    #[tokio::test]
    async fn test_load_sanitizes_and_reports_text() {
        let app = app();
        let id = load(&app).await;

        let (status, body) = send(&app, Method::GET, &format!("/api/v1/documents/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["text"], "On Margins Readers write in margins. Margins remember readers.");
        assert_eq!(body["fileName"], "margins.html");
        assert_eq!(body["color"], "#ffff00");
        assert_eq!(body["palette"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_highlight_export_import_round_trip() {
        let app = app();
        let id = load(&app).await;
        let base = format!("/api/v1/documents/{}", id);

        // "write in" spans characters 19..27 of the rendered text
        let (status, body) = send(
            &app,
            Method::POST,
            &format!("{}/highlights", base),
            Some(json!({"start": 19, "end": 27, "color": "lightgreen"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["elements"], 1);
        assert_eq!(body["annotations"][0]["text"], "write in");
        assert_eq!(body["annotations"][0]["color"], "#90ee90");
        let annotation_id = body["annotations"][0]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("{}/annotations/{}/comment", base, annotation_id),
            Some(json!({"comment": "the habit"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["comment"], "the habit");

        let (status, exported) = send(&app, Method::GET, &format!("{}/export", base), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(exported["sourceFile"], "margins.html");
        assert_eq!(exported["annotations"].as_array().unwrap().len(), 1);

        let fresh = load(&app).await;
        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/documents/{}/import", fresh),
            Some(exported.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["imported"], 1);
        assert_eq!(body["total"], 1);
        assert_eq!(body["annotations"], exported["annotations"]);
    }

    #[tokio::test]
    async fn test_export_sets_download_name() {
        let app = app();
        let id = load(&app).await;

        let request = Request::builder()
            .uri(format!("/api/v1/documents/{}/export", id))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"margins-annotations.json\""
        );
    }

    #[tokio::test]
    async fn test_malformed_import_is_rejected() {
        let app = app();
        let id = load(&app).await;

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/documents/{}/import", id),
            Some(json!({"annotations": "nope"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_import");
    }

    #[tokio::test]
    async fn test_auto_highlight_on_selection_release() {
        let app = app();
        let id = load(&app).await;
        let base = format!("/api/v1/documents/{}", id);

        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("{}/settings", base),
            Some(json!({"autoHighlight": true, "color": "#FFB6C1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["color"], "#ffb6c1");

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("{}/selection", base),
            Some(json!({"start": 0, "end": 10})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["release"]["action"], "highlighted");
        assert_eq!(body["annotations"][0]["text"], "On Margins");
        assert_eq!(body["annotations"][0]["color"], "#ffb6c1");
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let app = app();
        let id = load(&app).await;
        let base = format!("/api/v1/documents/{}", id);

        for (start, end) in [(0, 2), (11, 18)] {
            send(
                &app,
                Method::POST,
                &format!("{}/highlights", base),
                Some(json!({"start": start, "end": end})),
            )
            .await;
        }
        let (_, annotations) = send(&app, Method::GET, &format!("{}/annotations", base), None).await;
        assert_eq!(annotations.as_array().unwrap().len(), 2);

        let (_, filtered) =
            send(&app, Method::GET, &format!("{}/annotations?q=READ", base), None).await;
        assert_eq!(filtered.as_array().unwrap().len(), 1);

        let first = annotations[0]["id"].as_str().unwrap();
        let (status, _) =
            send(&app, Method::DELETE, &format!("{}/annotations/{}", base, first), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) =
            send(&app, Method::DELETE, &format!("{}/annotations/{}", base, first), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, Method::DELETE, &format!("{}/annotations", base), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cleared"], 1);
    }

    #[tokio::test]
    async fn test_invalid_input_and_unknown_documents() {
        let app = app();
        let id = load(&app).await;

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/documents/{}/highlights", id),
            Some(json!({"start": 0, "end": 2, "color": "transparent"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");

        let (status, body) = send(&app, Method::GET, "/api/v1/documents/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/documents",
            Some(json!({"html": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/documents/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::GET, &format!("/api/v1/documents/{}/html", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
