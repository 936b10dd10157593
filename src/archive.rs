use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;

use crate::broadcast::CapturedFile;
use crate::config::Config;

/// Resolved location of an archived file on the remote.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRef {
    pub id: String,
    pub preview_url: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("rclone {step} failed: {stderr}")]
    Rclone { step: &'static str, stderr: String },
    #[error("Could not parse rclone listing: {0}")]
    ParseListing(#[from] serde_json::Error),
    #[error("Moved file missing from remote listing")]
    MissingEntry,
}

#[async_trait]
pub trait Archiver {
    async fn archive(&self, file: &CapturedFile) -> Result<RemoteRef, ArchiveError>;
}

/// Moves captured files into the remote folder tree with rclone and
/// reads back their remote identifiers.
pub struct Uploader {
    remote: String,
    root: String,
}

#[derive(Debug, Deserialize)]
struct RemoteEntry {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
}

pub fn preview_url(id: &str) -> String {
    format!("https://drive.google.com/file/d/{}/preview", id)
}

impl Uploader {
    pub fn new(config: &Config) -> Self {
        Self {
            remote: config.rclone_remote.clone(),
            root: config.remote_root.clone(),
        }
    }

    async fn rclone(&self, step: &'static str, args: &[&str]) -> Result<Vec<u8>, ArchiveError> {
        debug!("rclone {} {:?}", step, args);
        let output = Command::new("rclone").arg(step).args(args).output().await?;
        if !output.status.success() {
            return Err(ArchiveError::Rclone {
                step,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(output.stdout)
    }

    // Remote listings can lag briefly behind a finished move, hence the
    // retried readback.
    async fn resolve_entry(&self, target: &str) -> Result<RemoteEntry, ArchiveError> {
        let listing = self.rclone("lsjson", &[target]).await?;
        let mut entries: Vec<RemoteEntry> = serde_json::from_slice(&listing)?;
        entries.pop().ok_or(ArchiveError::MissingEntry)
    }
}

#[async_trait]
impl Archiver for Uploader {
    async fn archive(&self, file: &CapturedFile) -> Result<RemoteRef, ArchiveError> {
        let folder = format!("{}:{}/{}", self.remote, self.root, file.subject.as_str());
        let local = file.path.to_string_lossy().into_owned();
        let name = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ArchiveError::IoError(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "capture path has no file name",
                ))
            })?;

        // Folder creation is idempotent and deliberately not rolled back
        // when a later step fails.
        self.rclone("mkdir", &[&folder]).await?;

        info!("uploading {} to {}", name, folder);
        self.rclone("move", &[&local, &folder, "--drive-chunk-size", "64M"])
            .await?;

        let target = format!("{}/{}", folder, name);
        let entry = Retry::spawn(FixedInterval::from_millis(2_000).take(3), || {
            self.resolve_entry(&target)
        })
        .await?;
        debug!("archived {} as remote id {}", entry.name, entry.id);

        Ok(RemoteRef {
            preview_url: preview_url(&entry.id),
            id: entry.id,
        })
    }
}
