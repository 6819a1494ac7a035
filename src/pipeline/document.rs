//! Document acquisition: one file, one page count.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{AcquireError, AcquisitionPipeline, BOOKS_DIR, acquired_at};
use crate::download::{DownloadError, file_name_from_locator, safe_dir_name};
use crate::inspect::InspectError;
use crate::model::{AssetKind, AssetRecord, CatalogEntry};

impl AcquisitionPipeline {
    /// Downloads and inspects a document entry.
    ///
    /// A blank locator fails before any network call. A file that fails
    /// inspection is removed again.
    pub(super) async fn acquire_document(
        &self,
        entry: &CatalogEntry,
    ) -> Result<AssetRecord, AcquireError> {
        let locator = entry
            .locator()
            .map(str::trim)
            .filter(|locator| !locator.is_empty())
            .ok_or_else(|| DownloadError::blank_url(&entry.title))?;

        let translated_title = self.translate(&entry.title).await?;

        let partition = entry.partition_key().to_string();
        let relative = Path::new(BOOKS_DIR)
            .join(safe_dir_name(&partition))
            .join(file_name_from_locator(locator));
        let target = self.output_dir.join(&relative);

        info!(url = %locator, path = %target.display(), "downloading document");
        let bytes = self
            .retry
            .run(locator, || self.client.download_to_path(locator, &target))
            .await?;
        debug!(bytes, "document saved");

        let pages = match self.inspect(target.clone()).await {
            Ok(pages) => pages,
            Err(error) => {
                if let Err(remove_error) = tokio::fs::remove_file(&target).await {
                    warn!(
                        path = %target.display(),
                        error = %remove_error,
                        "failed to remove corrupt document"
                    );
                }
                return Err(error.into());
            }
        };

        Ok(AssetRecord {
            title: entry.title.clone(),
            partition,
            isbn: entry.isbn.clone(),
            edition: entry.edition.clone(),
            file: relative.display().to_string(),
            pages: Some(pages),
            translated_title,
            acquired_at: acquired_at(),
            category: entry.category_label().to_string(),
            kind: AssetKind::Document,
        })
    }

    /// Runs the inspector on the blocking pool. A panicking parser counts as a
    /// corrupt document.
    async fn inspect(&self, path: PathBuf) -> Result<u32, InspectError> {
        let inspector = Arc::clone(&self.inspector);
        let task_path = path.clone();
        tokio::task::spawn_blocking(move || inspector.inspect(&task_path))
            .await
            .unwrap_or_else(|join_error| Err(InspectError::corrupt(path, join_error.to_string())))
    }
}
