//! Document export with a single-flight guard.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::api::DocumentsApi;
use crate::error::{ApiResult, StorageError, ValidationError};
use crate::models::{ExportFormat, ExportedFile};

struct ExportingGuard(Arc<AtomicBool>);

impl Drop for ExportingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct ExportService {
    api: DocumentsApi,
    exporting: Arc<AtomicBool>,
}

impl ExportService {
    pub fn new(api: DocumentsApi) -> Self {
        Self {
            api,
            exporting: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting.load(Ordering::SeqCst)
    }

    /// Download `id` as `format`. Rejected while another export runs.
    pub async fn export(&self, id: &str, format: ExportFormat) -> ApiResult<ExportedFile> {
        if self
            .exporting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ValidationError::Busy("export").into());
        }
        let _guard = ExportingGuard(self.exporting.clone());

        let file = self.api.export(id, format).await?;
        info!("Exported {} as {} ({} bytes)", id, file.filename, file.bytes.len());
        Ok(file)
    }
}

/// Write an export into `dir`, keeping only the final path component of the
/// suggested name.
pub async fn save_export(file: &ExportedFile, dir: &Path) -> Result<PathBuf, StorageError> {
    let name = Path::new(&file.filename)
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "export".into());
    let path = dir.join(name);
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(&path, &file.bytes).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_export_strips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let file = ExportedFile {
            filename: "../../etc/summary.txt".to_string(),
            content_type: Some("text/plain".to_string()),
            bytes: b"abstract".to_vec(),
        };
        let path = save_export(&file, dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("summary.txt"));
        assert_eq!(std::fs::read(&path).unwrap(), b"abstract");
    }
}
