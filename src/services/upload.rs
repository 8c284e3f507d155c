//! Document upload: client-side validation and the multipart submit.
//!
//! Everything that can be checked locally is checked before a request is
//! built, so a rejected file never reaches the network.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::api::{DocumentsApi, UploadRequest};
use crate::error::{ApiResult, StorageError, ValidationError};
use crate::models::Document;

/// Largest accepted file, 10 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// MIME types the backend can summarize.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

/// What the user filled in on the upload form.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Comma-separated tag list as typed.
    pub tags: String,
}

impl UploadForm {
    /// Read a file from disk into a form.
    ///
    /// Files over [`MAX_UPLOAD_BYTES`] are rejected from their metadata, before
    /// any of the content is read.
    pub async fn from_path(path: &Path) -> ApiResult<Self> {
        let size = tokio::fs::metadata(path)
            .await
            .map_err(StorageError::from)?
            .len();
        if size > MAX_UPLOAD_BYTES {
            return Err(ValidationError::FileTooLarge {
                size,
                max: MAX_UPLOAD_BYTES,
            }
            .into());
        }

        let bytes = tokio::fs::read(path).await.map_err(StorageError::from)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self {
            filename,
            bytes,
            ..Default::default()
        })
    }
}

/// Progress events for a single upload.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    Validated {
        filename: String,
        mime_type: String,
        size: u64,
    },
    Sending {
        filename: String,
    },
    Completed {
        document_id: String,
        title: String,
    },
    Failed {
        filename: String,
        error: String,
    },
}

/// Resets the in-progress flag when an upload ends, however it ends.
struct UploadingGuard(Arc<AtomicBool>);

impl Drop for UploadingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct UploadService {
    api: DocumentsApi,
    uploading: Arc<AtomicBool>,
}

impl UploadService {
    pub fn new(api: DocumentsApi) -> Self {
        Self {
            api,
            uploading: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading.load(Ordering::SeqCst)
    }

    /// Validate and upload. A second call while one is running is rejected.
    pub async fn upload(
        &self,
        form: UploadForm,
        events: Option<mpsc::Sender<UploadEvent>>,
    ) -> ApiResult<Document> {
        if self
            .uploading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ValidationError::Busy("upload").into());
        }
        let _guard = UploadingGuard(self.uploading.clone());

        let filename = form.filename.clone();
        let send = |event: UploadEvent| {
            if let Some(ref tx) = events {
                let _ = tx.try_send(event);
            }
        };

        let request = match prepare(form) {
            Ok(request) => request,
            Err(e) => {
                send(UploadEvent::Failed {
                    filename,
                    error: e.to_string(),
                });
                return Err(e.into());
            }
        };
        send(UploadEvent::Validated {
            filename: filename.clone(),
            mime_type: request.mime_type.clone(),
            size: request.bytes.len() as u64,
        });

        send(UploadEvent::Sending {
            filename: filename.clone(),
        });
        match self.api.upload(request).await {
            Ok(document) => {
                info!("Uploaded {} as {}", filename, document.id);
                send(UploadEvent::Completed {
                    document_id: document.id.clone(),
                    title: document.title.clone(),
                });
                Ok(document)
            }
            Err(e) => {
                send(UploadEvent::Failed {
                    filename,
                    error: e.user_message(),
                });
                Err(e)
            }
        }
    }
}

/// Check the form and turn it into a request.
pub fn prepare(form: UploadForm) -> Result<UploadRequest, ValidationError> {
    if form.filename.trim().is_empty() || form.bytes.is_empty() {
        return Err(ValidationError::MissingField("file"));
    }

    let mime_type = detect_mime(&form.filename, &form.bytes)?;
    let size = form.bytes.len() as u64;
    if size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::FileTooLarge {
            size,
            max: MAX_UPLOAD_BYTES,
        });
    }

    let title = form
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| title_from_filename(&form.filename));
    if title.is_empty() {
        return Err(ValidationError::MissingField("title"));
    }

    debug!("Prepared upload of {} ({}, {} bytes)", form.filename, mime_type, size);
    Ok(UploadRequest {
        filename: form.filename,
        mime_type,
        bytes: form.bytes,
        title,
        description: form
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        tags: parse_tags(&form.tags),
    })
}

/// Sniff the content type, falling back to the file extension when the
/// content is not recognised or not in the allowed list.
pub fn detect_mime(filename: &str, bytes: &[u8]) -> Result<String, ValidationError> {
    let sniffed = infer::get(bytes).map(|kind| kind.mime_type().to_string());
    if let Some(ref mime) = sniffed {
        if ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
            return Ok(mime.clone());
        }
    }

    let guessed = mime_guess::from_path(filename)
        .first_raw()
        .map(|m| m.to_string());
    match guessed {
        Some(mime) if ALLOWED_MIME_TYPES.contains(&mime.as_str()) => Ok(mime),
        other => Err(ValidationError::UnsupportedFileType(
            sniffed.or(other).unwrap_or_else(|| "unknown".to_string()),
        )),
    }
}

/// "deep_learning-review.pdf" -> "deep learning review".
pub fn title_from_filename(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.replace(['-', '_'], " ").trim().to_string()
}

pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::gateway::Gateway;
    use crate::storage::MemoryStore;
    use std::time::Duration;

    fn pdf(len: usize) -> Vec<u8> {
        let mut bytes = b"%PDF-1.7\n".to_vec();
        bytes.resize(len, b' ');
        bytes
    }

    #[test]
    fn test_title_and_tags_derivation() {
        assert_eq!(title_from_filename("deep_learning-review.pdf"), "deep learning review");
        assert_eq!(parse_tags(" ml, ,biology,"), vec!["ml", "biology"]);
    }

    #[test]
    fn test_mime_detection() {
        assert_eq!(detect_mime("paper.bin", &pdf(64)).unwrap(), "application/pdf");
        assert_eq!(detect_mime("notes.txt", b"plain words").unwrap(), "text/plain");
        assert!(matches!(
            detect_mime("photo.png", b"\x89PNG\r\n\x1a\n0000"),
            Err(ValidationError::UnsupportedFileType(_))
        ));
    }

    #[test]
    fn test_prepare_fills_title_from_filename() {
        let request = prepare(UploadForm {
            filename: "cell_biology.pdf".to_string(),
            bytes: pdf(128),
            tags: "a, b".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(request.title, "cell biology");
        assert_eq!(request.tags, vec!["a", "b"]);
        assert_eq!(request.description, None);
    }

    #[tokio::test]
    async fn test_from_path_rejects_oversized_file_from_metadata() {
        let file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.as_file().set_len(MAX_UPLOAD_BYTES + 1).unwrap();

        let err = UploadForm::from_path(file.path()).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(ValidationError::FileTooLarge { size, max })
                if size == MAX_UPLOAD_BYTES + 1 && max == MAX_UPLOAD_BYTES
        ));
    }

    #[tokio::test]
    async fn test_from_path_reads_small_file() {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        std::io::Write::write_all(&mut file, &pdf(64)).unwrap();

        let form = UploadForm::from_path(file.path()).await.unwrap();
        assert_eq!(form.bytes.len(), 64);
        assert!(form.filename.ends_with(".pdf"));

        let missing = file.path().with_extension("gone");
        assert!(matches!(
            UploadForm::from_path(&missing).await,
            Err(ApiError::Storage(StorageError::Io(_)))
        ));
    }

    #[tokio::test]
    async fn test_oversized_file_is_rejected_before_any_request() {
        // Nothing listens here; a request would surface as a network error
        let gateway = Gateway::with_base_url(
            "http://127.0.0.1:9/api",
            "test",
            Duration::from_millis(200),
            Arc::new(MemoryStore::new()),
        )
        .unwrap();
        let mut errors = gateway.errors().subscribe();
        let service = UploadService::new(DocumentsApi::new(gateway));

        let form = UploadForm {
            filename: "huge.pdf".to_string(),
            bytes: pdf(MAX_UPLOAD_BYTES as usize + 1),
            ..Default::default()
        };
        let err = service.upload(form, None).await.unwrap_err();

        assert!(matches!(
            err,
            ApiError::Validation(ValidationError::FileTooLarge { .. })
        ));
        assert!(errors.try_recv().is_err());
        assert!(!service.is_uploading());
    }
}
