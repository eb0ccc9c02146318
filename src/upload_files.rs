use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr, eyre};
use tokio::sync::mpsc;
use url::Url;

use crate::batch_upload::{
    BatchUploadController, BatchUploadOptions, HttpUploader, ImageInfo, SelectedFile,
    UploadEvent, UploadStatus,
};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Reads a file from disk, sniffing its MIME type from the content.
pub async fn read_selected_file(path: &Path) -> Result<SelectedFile> {
    let bytes = tokio::fs::read(path)
        .await
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;

    let content_type = infer::get(&bytes)
        .map(|kind| kind.mime_type())
        .unwrap_or(FALLBACK_CONTENT_TYPE);

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| eyre!("Not a file: {}", path.display()))?;

    Ok(SelectedFile::new(name, content_type, bytes))
}

async fn report_events(mut events: mpsc::UnboundedReceiver<UploadEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            UploadEvent::Notice(notice) => eprintln!("error: {}", notice.message),
            UploadEvent::StatusChanged { id, status } => {
                log::debug!("{id} is now {status:?}");
            }
            UploadEvent::CommittedChanged(committed) => {
                log::debug!("{} images committed", committed.len());
            }
        }
    }
}

/// Uploads `paths` through a running server's upload endpoint and returns the
/// committed images. Fails when nothing could be uploaded.
pub async fn upload_files(
    server: &Url,
    paths: &[PathBuf],
    options: BatchUploadOptions,
) -> Result<Vec<ImageInfo>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(read_selected_file(path).await?);
    }

    let uploader = HttpUploader::new(server)?;
    log::info!("Uploading {} files to {}", files.len(), uploader.endpoint());

    let (mut controller, events) = BatchUploadController::new(uploader, options, Vec::new());
    let reporter = tokio::spawn(report_events(events));

    let outcome = controller.add_files(files)?;
    controller.wait_idle().await;

    let failed = controller
        .images()
        .iter()
        .filter(|image| image.status == UploadStatus::Error)
        .count();
    let committed = controller.committed();
    drop(controller);
    reporter.await.wrap_err("Event reporter stopped unexpectedly")?;

    log::info!(
        "{} uploaded, {} failed, {} skipped",
        committed.len(),
        failed,
        outcome.rejected.len()
    );

    for info in &committed {
        match (info.orientation(), info.aspect_ratio()) {
            (Some(orientation), Some(ratio)) => {
                log::debug!("{}: {orientation:?}, {ratio:.2}:1", info.key)
            }
            _ => log::debug!("{}: dimensions unknown", info.key),
        }
    }

    if committed.is_empty() && !paths.is_empty() {
        return Err(eyre!("No files were uploaded"));
    }

    Ok(committed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::encode_test_image;
    use image::ImageFormat;

    #[tokio::test]
    async fn test_read_selected_file_sniffs_type() {
        let dir = tempfile::tempdir().unwrap();

        let png = dir.path().join("photo one.png");
        std::fs::write(&png, encode_test_image(3, 3, ImageFormat::Png)).unwrap();
        let file = read_selected_file(&png).await.unwrap();
        assert_eq!(file.name, "photo one.png");
        assert_eq!(file.content_type, "image/png");

        // Extension is ignored; content decides
        let text = dir.path().join("fake.jpg");
        std::fs::write(&text, "plain text").unwrap();
        let file = read_selected_file(&text).await.unwrap();
        assert_eq!(file.content_type, FALLBACK_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_read_selected_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_selected_file(&dir.path().join("nope.jpg"))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Failed to read"));
    }

    #[tokio::test]
    async fn test_upload_files_with_only_rejected_files_fails() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("notes.txt");
        std::fs::write(&text, "hello").unwrap();

        // Nothing reaches the network: the only file is not an image
        let server = Url::parse("http://127.0.0.1:9/").unwrap();
        let err = upload_files(&server, &[text], BatchUploadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No files were uploaded");
    }
}
