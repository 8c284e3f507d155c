mod common;

use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use tokio::sync::mpsc;

use scisummarize::services::{UploadEvent, UploadForm};
use scisummarize::{ApiError, ValidationError};

#[derive(Default)]
struct Received {
    content_type: String,
    body: String,
}

#[tokio::test]
async fn test_upload_sends_multipart_form_and_reports_progress() {
    let received = Arc::new(Mutex::new(Received::default()));
    let recorder = received.clone();
    let app = Router::new().route(
        "/api/documents/upload",
        post(move |headers: HeaderMap, body: Bytes| {
            let recorder = recorder.clone();
            async move {
                let mut received = recorder.lock().unwrap();
                received.content_type = headers
                    .get("content-type")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                received.body = String::from_utf8_lossy(&body).into_owned();
                Json(common::document_json("d42", "graph neural nets"))
            }
        }),
    );
    let origin = common::serve(app).await;
    let (ctx, _) = common::context(&origin);

    let mut bytes = b"%PDF-1.7\n".to_vec();
    bytes.extend_from_slice(b"paper body");
    let form = UploadForm {
        filename: "graph_neural-nets.pdf".to_string(),
        bytes,
        title: None,
        description: Some("  survey  ".to_string()),
        tags: "ml, graphs".to_string(),
    };

    let (tx, mut rx) = mpsc::channel(8);
    let document = ctx.upload.upload(form, Some(tx)).await.unwrap();
    assert_eq!(document.id, "d42");
    assert!(!ctx.upload.is_uploading());

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(matches!(events[0], UploadEvent::Validated { ref mime_type, .. } if mime_type == "application/pdf"));
    assert!(matches!(events[1], UploadEvent::Sending { .. }));
    assert!(matches!(events[2], UploadEvent::Completed { ref document_id, .. } if document_id == "d42"));

    let received = received.lock().unwrap();
    assert!(received.content_type.starts_with("multipart/form-data"));
    assert!(received.body.contains(r#"filename="graph_neural-nets.pdf""#));
    assert!(received.body.contains("graph neural nets"));
    assert!(received.body.contains("survey"));
    assert!(received.body.contains(&json!(["ml", "graphs"]).to_string()));
}

#[tokio::test]
async fn test_unsupported_file_never_reaches_the_server() {
    let app = Router::new().route(
        "/api/documents/upload",
        post(|| async { StatusCode::IM_A_TEAPOT }),
    );
    let origin = common::serve(app).await;
    let (ctx, _) = common::context(&origin);

    let form = UploadForm {
        filename: "slides.pptx".to_string(),
        bytes: b"not really slides".to_vec(),
        ..Default::default()
    };
    let (tx, mut rx) = mpsc::channel(8);
    let err = ctx.upload.upload(form, Some(tx)).await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::Validation(ValidationError::UnsupportedFileType(_))
    ));
    assert!(matches!(rx.try_recv(), Ok(UploadEvent::Failed { .. })));
}
