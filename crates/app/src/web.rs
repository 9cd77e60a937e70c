use crate::page::{render, Notice, PageView};
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pdf_insights_core::{is_pdf_name, InsightsPipeline, PipelineError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<InsightsPipeline>,
    /// Held for the whole of each store or search so actions never overlap.
    action_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(pipeline: InsightsPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            action_lock: Arc::new(Mutex::new(())),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/documents", post(store_document))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: Option<String>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Page-level failure: rendered as the form plus an error notice.
pub struct PageError {
    status: StatusCode,
    backend: String,
    message: String,
}

impl PageError {
    fn bad_request(backend: &str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            backend: backend.to_string(),
            message: message.into(),
        }
    }

    fn action_failed(backend: &str, error: &PipelineError) -> Self {
        tracing::error!(%error, "action failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            backend: backend.to_string(),
            message: format!("Error: {error}"),
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let html = render(&PageView {
            notices: vec![Notice::Error(self.message)],
            backend: &self.backend,
            ..PageView::default()
        });
        (self.status, Html(html)).into_response()
    }
}

async fn index(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Html<String>, PageError> {
    let backend = state.pipeline.backend();
    let query = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|query| !query.is_empty());

    let Some(query) = query else {
        return Ok(Html(render(&PageView {
            backend,
            ..PageView::default()
        })));
    };

    let matches = {
        let _guard = state.action_lock.lock().await;
        state
            .pipeline
            .search(query)
            .await
            .map_err(|error| PageError::action_failed(backend, &error))?
    };

    Ok(Html(render(&PageView {
        query: Some(query),
        matches: Some(matches.as_slice()),
        backend,
        ..PageView::default()
    })))
}

async fn store_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Html<String>, PageError> {
    let backend = state.pipeline.backend();

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| PageError::bad_request(backend, error.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|error| PageError::bad_request(backend, error.body_text()))?;
        upload = Some((filename, bytes));
        break;
    }

    let Some((filename, bytes)) = upload else {
        return Err(PageError::bad_request(backend, "No file was uploaded."));
    };
    if !is_pdf_name(&filename) {
        return Err(PageError::bad_request(
            backend,
            format!("{filename} is not a PDF file."),
        ));
    }

    let receipt = {
        let _guard = state.action_lock.lock().await;
        state
            .pipeline
            .store_pdf(&filename, &bytes)
            .await
            .map_err(|error| PageError::action_failed(backend, &error))?
    };

    Ok(Html(render(&PageView {
        notices: vec![
            Notice::Success(format!("Uploaded: {filename}")),
            Notice::Success(receipt.message()),
        ],
        backend,
        ..PageView::default()
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};
    use pdf_insights_core::{Document, HashingEmbedder, InMemoryIndex};
    use tower::ServiceExt;

    const DIMS: usize = 64;

    fn state() -> AppState {
        AppState::new(InsightsPipeline::new(
            Box::new(HashingEmbedder::new(DIMS)),
            Box::new(InMemoryIndex::new(DIMS)),
            2,
        ))
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        String::from_utf8(bytes.to_vec()).expect("body should be utf-8")
    }

    /// A one-page PDF whose only text is `text`.
    fn single_page_pdf(text: &str) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("content should encode"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::from(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("pdf should serialize");
        bytes
    }

    fn multipart_request(filename: &str, content: &[u8]) -> Request<Body> {
        let boundary = "insights-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\n\
                 Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/documents")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("request should build")
    }

    #[tokio::test]
    async fn index_renders_form() {
        let response = create_router(state())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains(r#"name="file""#));
        assert!(!html.contains("No relevant documents found."));
    }

    #[tokio::test]
    async fn search_on_empty_index_warns() {
        let response = create_router(state())
            .oneshot(
                Request::get("/?q=What+is+the+premium%3F")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("No relevant documents found."));
    }

    #[tokio::test]
    async fn search_lists_stored_documents() {
        let state = state();
        state
            .pipeline
            .store_document(&Document::new("policy.pdf", "Annual premium is $1200"))
            .await
            .unwrap();

        let response = create_router(state)
            .oneshot(
                Request::get("/?q=Annual+premium+is+%241200")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let html = body_text(response).await;
        assert!(html.contains("<strong>File:</strong> policy.pdf (Score: 1.00)"));
    }

    #[tokio::test]
    async fn uploaded_pdf_is_stored_and_searchable() {
        let state = state();
        let pdf = single_page_pdf("Annual premium is $1200");

        let response = create_router(state.clone())
            .oneshot(multipart_request("policy.pdf", &pdf))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Uploaded: policy.pdf"));
        assert!(html.contains("Stored policy.pdf in memory."));

        let response = create_router(state)
            .oneshot(
                Request::get("/?q=What+is+the+premium%3F")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("policy.pdf (Score:"));
        assert!(!html.contains("No relevant documents found."));
    }

    #[tokio::test]
    async fn non_pdf_upload_is_rejected() {
        let response = create_router(state())
            .oneshot(multipart_request("notes.txt", b"hello"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = body_text(response).await;
        assert!(html.contains("notes.txt is not a PDF file."));
    }

    #[tokio::test]
    async fn broken_pdf_surfaces_error_page() {
        let response = create_router(state())
            .oneshot(multipart_request("broken.pdf", b"%PDF-1.4\n%broken"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let html = body_text(response).await;
        assert!(html.contains("pdf parse error"));
    }

    #[tokio::test]
    async fn health_reports_version() {
        let response = create_router(state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("healthy"));
    }
}
