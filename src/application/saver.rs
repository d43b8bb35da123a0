use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::{api::ApiClient, domain::DownloadError, utils::sanitize_filename};

use super::traits::MediaSaver;

/// Saves assets into a download directory.
///
/// The payload is streamed into `<name>.part`, which is renamed to `<name>`
/// once complete and removed on any failure.
#[derive(Clone)]
pub struct FileSaver {
    api_client: ApiClient,
    dir: PathBuf,
}

impl FileSaver {
    pub fn new(api_client: ApiClient, dir: impl Into<PathBuf>) -> Self {
        Self {
            api_client,
            dir: dir.into(),
        }
    }

    pub async fn save_to_disk(&self, url: &str, file_name: &str) -> Result<PathBuf, DownloadError> {
        let name = sanitize_filename(file_name);
        if name.is_empty() || name == "." || name == ".." {
            return Err(DownloadError::Io(format!("Unusable file name: {:?}", file_name)));
        }

        let target = self.dir.join(&name);
        let partial = self.dir.join(format!("{}.part", name));

        let result = match self.write_partial(url, &partial).await {
            Ok(()) => tokio::fs::rename(&partial, &target)
                .await
                .map_err(|e| DownloadError::Io(format!("Failed to finalize file: {}", e))),
            Err(e) => Err(e),
        };

        if result.is_err() {
            let _ = tokio::fs::remove_file(&partial).await;
        }

        result.map(|()| target)
    }

    async fn write_partial(&self, url: &str, path: &Path) -> Result<(), DownloadError> {
        let (total, stream) = self
            .api_client
            .download_file_stream(url)
            .await
            .map_err(|e| DownloadError::Fetch(e.to_string()))?;
        let mut stream = stream.boxed();

        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|e| DownloadError::Io(format!("Failed to create file: {}", e)))?;

        let mut downloaded: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DownloadError::Fetch(e.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| DownloadError::Io(format!("Write error: {}", e)))?;
            downloaded += chunk.len() as u64;
        }

        file.sync_all()
            .await
            .map_err(|e| DownloadError::Io(format!("Failed to sync file: {}", e)))?;

        debug!(%url, downloaded, ?total, "payload written");
        Ok(())
    }
}

#[async_trait]
impl MediaSaver for FileSaver {
    async fn save(&self, url: &str, file_name: &str) -> bool {
        match self.save_to_disk(url, file_name).await {
            Ok(path) => {
                debug!(path = %path.display(), "saved");
                true
            }
            Err(e) => {
                warn!(%url, %file_name, error = %e, "download failed");
                false
            }
        }
    }
}
