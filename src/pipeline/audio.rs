//! Audio book acquisition: many attachments, tracked individually.
//!
//! Each audio book gets a folder holding its files plus two tables:
//! `files.csv` (attachments saved) and `failures.csv` (attachments whose last
//! attempt failed). Both are saved after every attempted attachment.

use std::path::Path;

use tracing::{debug, info, warn};

use super::{AUDIO_DIR, AcquireError, AcquisitionPipeline, Outcome, acquired_at};
use crate::download::{DownloadError, file_name_from_locator, safe_dir_name};
use crate::model::{
    AssetKind, AssetRecord, AttachmentEntry, AudioFileRecord, CatalogEntry, FailureRecord,
};
use crate::store::PersistedSet;

/// Per-title table of saved attachments.
pub const FILE_TABLE: &str = "files.csv";

/// Per-title table of failing attachments.
pub const FAILURE_TABLE: &str = "failures.csv";

impl AcquisitionPipeline {
    /// Downloads every missing attachment of an audio entry.
    pub(super) async fn acquire_audio(
        &self,
        entry: &CatalogEntry,
    ) -> Result<Outcome, Vec<FailureRecord>> {
        let fail = |error: AcquireError| vec![error.into_failure(AssetKind::Audio, &entry.title)];

        let translated_title = self.translate(&entry.title).await.map_err(fail)?;
        let attachments = self
            .source
            .attachments(entry)
            .await
            .map_err(|error| fail(AcquireError::Details(error)))?;

        let partition = entry.partition_key().to_string();
        let folder = entry
            .slug
            .as_deref()
            .filter(|slug| !slug.trim().is_empty())
            .unwrap_or(&entry.title);
        let relative = Path::new(AUDIO_DIR)
            .join(safe_dir_name(&partition))
            .join(safe_dir_name(folder));
        let dir = self.output_dir.join(&relative);

        let mut files: PersistedSet<AudioFileRecord> = PersistedSet::new(dir.join(FILE_TABLE));
        let mut failures: PersistedSet<FailureRecord> =
            PersistedSet::new(dir.join(FAILURE_TABLE));
        files
            .load()
            .and_then(|()| failures.load())
            .map_err(|error| fail(error.into()))?;

        let mut attempted = 0usize;
        for attachment in &attachments {
            if files.exists((), &attachment.title) {
                debug!(attachment = %attachment.title, "attachment already saved");
                continue;
            }
            if attempted > 0 {
                self.pacer.pause().await;
            }
            attempted += 1;

            match self.acquire_attachment(entry, attachment, &dir).await {
                Ok(record) => {
                    files.add(record);
                    if failures.exists(AssetKind::Audio, &attachment.title)
                        && let Err(error) =
                            failures.remove(AssetKind::Audio, &attachment.title)
                    {
                        warn!(attachment = %attachment.title, error = %error, "failed to clear failure row");
                    }
                }
                Err(error) => {
                    warn!(attachment = %attachment.title, error = %error, "attachment failed");
                    failures.add(error.into_failure(AssetKind::Audio, &attachment.title));
                }
            }

            if let Err(error) = files.save().and_then(|()| failures.save()) {
                warn!(dir = %dir.display(), error = %error, "failed to save attachment tables");
            }
        }

        let outstanding: Vec<FailureRecord> = failures
            .iter()
            .filter(|failure| !files.exists((), &failure.title))
            .cloned()
            .collect();

        if outstanding.is_empty() {
            return Ok(Outcome::Acquired(AssetRecord {
                title: entry.title.clone(),
                partition,
                isbn: entry.isbn.clone(),
                edition: entry.edition.clone(),
                file: relative.display().to_string(),
                pages: None,
                translated_title,
                acquired_at: acquired_at(),
                category: entry.category_label().to_string(),
                kind: AssetKind::Audio,
            }));
        }

        if files.is_empty() {
            Err(outstanding)
        } else {
            Ok(Outcome::Partial {
                saved: files.len(),
                failures: outstanding,
            })
        }
    }

    async fn acquire_attachment(
        &self,
        entry: &CatalogEntry,
        attachment: &AttachmentEntry,
        dir: &Path,
    ) -> Result<AudioFileRecord, AcquireError> {
        let chapter = attachment.chapter.clone().unwrap_or_default();
        let sub_chapter = attachment.sub_chapter.clone().unwrap_or_default();
        let ident = [
            entry.title.as_str(),
            attachment.title.as_str(),
            chapter.as_str(),
            sub_chapter.as_str(),
        ]
        .join(" - ");

        let locator = attachment
            .attachment
            .as_deref()
            .map(str::trim)
            .filter(|locator| !locator.is_empty())
            .ok_or_else(|| DownloadError::blank_url(&ident))?;

        let translated_title = self.translate(&attachment.title).await?;
        let file_name = file_name_from_locator(locator);
        let target = dir.join(&file_name);

        info!(attachment = %ident, "downloading audio attachment");
        self.retry
            .run(locator, || self.client.download_to_path(locator, &target))
            .await?;

        Ok(AudioFileRecord {
            title: attachment.title.clone(),
            translated_title,
            chapter,
            sub_chapter,
            file_name,
        })
    }
}
