/// Bulk photo export
///
/// This module handles:
/// - Downloading every photo of a share (fetch.rs)
/// - Naming entries and building the zip (archive.rs)
/// - Saving the finished archive to the path the user picked
///
/// Failed downloads are skipped; the export only fails when nothing at
/// all could be downloaded.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::error::ExportError;
use crate::state::data::Photo;

pub mod archive;
pub mod fetch;

pub use fetch::{HttpPhotoFetcher, PhotoFetcher};

/// A finished archive held in memory until it is written out
#[derive(Debug)]
pub struct ExportedArchive {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub included: usize,
    pub skipped: usize,
}

/// What happened to a requested export
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// There were no photos to export
    NothingToDo,
    Saved {
        path: PathBuf,
        included: usize,
        skipped: usize,
    },
}

/// Download all photos concurrently and zip the ones that arrived.
///
/// Entries are named by their position in `photos`, not by the order the
/// downloads finished. Returns `Ok(None)` for an empty list.
pub async fn package(
    fetcher: Arc<dyn PhotoFetcher>,
    photos: &[Photo],
    title: &str,
    date: NaiveDate,
) -> Result<Option<ExportedArchive>, ExportError> {
    if photos.is_empty() {
        return Ok(None);
    }

    let mut downloads = JoinSet::new();
    for (index, photo) in photos.iter().enumerate() {
        let fetcher = Arc::clone(&fetcher);
        let url = photo.file_url.clone();
        downloads.spawn(async move { (index, fetcher.fetch(&url).await) });
    }

    let mut fetched: Vec<Option<Vec<u8>>> = vec![None; photos.len()];
    while let Some(joined) = downloads.join_next().await {
        match joined {
            Ok((index, Ok(bytes))) => fetched[index] = Some(bytes),
            Ok((index, Err(e))) => {
                warn!(photo = %photos[index].id, error = %e, "skipping photo");
            }
            Err(e) => warn!(error = %e, "photo download task failed"),
        }
    }

    let entries: Vec<(String, Vec<u8>)> = photos
        .iter()
        .zip(fetched)
        .enumerate()
        .filter_map(|(index, (photo, bytes))| {
            bytes.map(|bytes| (archive::entry_name(photo, index + 1), bytes))
        })
        .collect();

    if entries.is_empty() {
        return Err(ExportError::NothingFetched);
    }

    let included = entries.len();
    let skipped = photos.len() - included;
    let bytes = archive::build_archive(&entries)?;
    info!(included, skipped, size = bytes.len(), "photo archive built");

    Ok(Some(ExportedArchive {
        file_name: archive::archive_file_name(title, date),
        bytes,
        included,
        skipped,
    }))
}

/// Package the photos and write the archive to `destination`.
pub async fn download_all(
    fetcher: Arc<dyn PhotoFetcher>,
    photos: Vec<Photo>,
    title: String,
    date: NaiveDate,
    destination: PathBuf,
) -> Result<ExportOutcome, ExportError> {
    match package(fetcher, &photos, &title, date).await? {
        Some(archive) => save_archive(archive, &destination).await,
        None => Ok(ExportOutcome::NothingToDo),
    }
}

/// Write the archive and release its buffer.
pub async fn save_archive(archive: ExportedArchive, path: &Path) -> Result<ExportOutcome, ExportError> {
    let ExportedArchive {
        file_name,
        bytes,
        included,
        skipped,
    } = archive;

    tokio::fs::write(path, bytes).await?;
    info!(archive = %file_name, path = %path.display(), "photo archive saved");

    Ok(ExportOutcome::Saved {
        path: path.to_path_buf(),
        included,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::fetch::fake::FakeFetcher;
    use super::*;
    use crate::state::data::fixtures::photo;
    use std::io::Cursor;
    use std::sync::atomic::Ordering;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn photos(n: usize) -> Vec<Photo> {
        (1..=n)
            .map(|i| photo(&i.to_string(), Some(if i % 2 == 0 { "after" } else { "before" })))
            .collect()
    }

    fn names(bytes: Vec<u8>) -> Vec<String> {
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_empty_list_is_noop() {
        let fetcher = Arc::new(FakeFetcher::default());
        let result = package(fetcher.clone(), &[], "Job", date()).await.unwrap();
        assert!(result.is_none());
        assert_eq!(fetcher.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_partial_failures_are_skipped() {
        let photos = photos(5);
        // Photos 2 and 4 404
        let fetcher = Arc::new(FakeFetcher::serving(&[
            photos[0].file_url.as_str(),
            photos[2].file_url.as_str(),
            photos[4].file_url.as_str(),
        ]));

        let archive = package(fetcher.clone(), &photos, "Kitchen Rewire", date())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(fetcher.calls.load(Ordering::Relaxed), 5);
        assert_eq!(archive.included, 3);
        assert_eq!(archive.skipped, 2);
        assert_eq!(archive.file_name, "kitchen-rewire-2026-10-16.zip");
        assert_eq!(
            names(archive.bytes),
            vec!["before_1.jpg", "before_3.jpg", "before_5.jpg"]
        );
    }

    #[tokio::test]
    async fn test_total_failure_is_an_error() {
        let fetcher = Arc::new(FakeFetcher::default());
        let err = package(fetcher, &photos(3), "Job", date()).await.unwrap_err();
        assert!(matches!(err, ExportError::NothingFetched));
    }

    #[tokio::test]
    async fn test_download_all_writes_file() {
        let photos = photos(2);
        let urls: Vec<&str> = photos.iter().map(|p| p.file_url.as_str()).collect();
        let fetcher = Arc::new(FakeFetcher::serving(&urls));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(archive::archive_file_name("Job 7", date()));
        let outcome = download_all(fetcher, photos, "Job 7".to_string(), date(), path.clone())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ExportOutcome::Saved {
                path: path.clone(),
                included: 2,
                skipped: 0
            }
        );
        let saved = std::fs::read(&path).unwrap();
        assert_eq!(names(saved), vec!["after_2.jpg", "before_1.jpg"]);
    }

    #[tokio::test]
    async fn test_download_all_without_photos_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.zip");
        let outcome = download_all(
            Arc::new(FakeFetcher::default()),
            Vec::new(),
            "Job".to_string(),
            date(),
            path.clone(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, ExportOutcome::NothingToDo);
        assert!(!path.exists());
    }
}
