use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_stream::wrappers::LinesStream;

use crate::broadcast::{CapturedFile, LiveBroadcast};
use crate::config::Config;
use crate::ffprobe;
use crate::subject::Subject;
use crate::util;

/// Highest-quality combined rendition up to 720p, with a pre-muxed
/// fallback when separate streams are unavailable.
const FORMAT_SELECTOR: &str = "bestvideo[height<=720]+bestaudio[ext=m4a]/best[height<=720]";

/// The container extension is decided by the extractor after the fact;
/// probe these, in order, to find what actually landed on disk.
const CONTAINER_EXTENSIONS: [&str; 3] = ["mp4", "mkv", "webm"];

/// Extractor output that indicates the credentials were rejected rather
/// than a transient failure.
const AUTH_MARKERS: [&str; 5] = [
    "sign in to confirm",
    "cookies are no longer valid",
    "login required",
    "private video",
    "members-only",
];

#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    /// The broadcast landed on disk. Duration comes from probing the
    /// finished file.
    Complete {
        file: CapturedFile,
        duration_seconds: i64,
    },
    /// The extractor was turned away for credential reasons; the caller
    /// should flag the credentials for rotation.
    AuthRejected,
    /// Anything else. Logged, not retried this run.
    Failed,
}

#[async_trait]
pub trait Capturer {
    async fn capture(&self, live: &LiveBroadcast, subject: Subject) -> CaptureOutcome;
}

/// Records a live broadcast to local storage by driving yt-dlp. Blocks
/// for the real duration of the broadcast; the only retry bounds are
/// the per-fragment and whole-request limits handed to the extractor.
pub struct CaptureEngine {
    base_path: PathBuf,
    cookie_file: Option<PathBuf>,
    fragment_retries: u32,
    download_retries: u32,
}

impl CaptureEngine {
    pub fn new(config: &Config, cookie_file: Option<PathBuf>) -> Self {
        Self {
            base_path: config.base_path.clone(),
            cookie_file,
            fragment_retries: config.fragment_retries,
            download_retries: config.download_retries,
        }
    }

    /// Runs the extractor to completion, streaming its stderr into the
    /// log. Returns whether an authentication marker was seen.
    async fn run_ytdlp(&self, folder: &Path, stem: &str, url: &str) -> std::io::Result<bool> {
        let template = folder.join(format!("{}.%(ext)s", stem));

        let mut cmd = Command::new("yt-dlp");
        cmd.arg("--live-from-start")
            .arg("--ignore-errors")
            .arg("--no-warnings")
            .arg("-f")
            .arg(FORMAT_SELECTOR)
            .arg("--fragment-retries")
            .arg(self.fragment_retries.to_string())
            .arg("--retries")
            .arg(self.download_retries.to_string())
            .arg("-o")
            .arg(&template);
        if let Some(cookies) = &self.cookie_file {
            cmd.arg("--cookies").arg(cookies);
        }
        cmd.arg(url).stdout(Stdio::null()).stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        let stderr = child.stderr.take().expect("stderr was piped");

        let mut auth_rejected = false;
        let mut lines = LinesStream::new(BufReader::new(stderr).lines());
        while let Some(line) = lines.next().await {
            match line {
                Ok(line) => {
                    if is_auth_failure(&line) {
                        auth_rejected = true;
                    }
                    debug!("yt-dlp: {}", line);
                }
                Err(e) => {
                    warn!("lost yt-dlp output stream: {}", e);
                    break;
                }
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            warn!("yt-dlp exited with {}", status);
        }
        Ok(auth_rejected)
    }
}

#[async_trait]
impl Capturer for CaptureEngine {
    async fn capture(&self, live: &LiveBroadcast, subject: Subject) -> CaptureOutcome {
        let folder = self.base_path.join(subject.as_str());
        if let Err(e) = fs::create_dir_all(&folder).await {
            warn!("could not create {}: {}", folder.display(), e);
            return CaptureOutcome::Failed;
        }

        let stem = format!(
            "{} [{}]",
            util::sanitize_title(&live.broadcast.title),
            live.broadcast.id
        );

        info!("recording {} into {}", live.broadcast.id, folder.display());
        let auth_rejected = match self.run_ytdlp(&folder, &stem, &live.broadcast.url).await {
            Ok(seen) => seen,
            Err(e) => {
                warn!("could not run yt-dlp: {}", e);
                return CaptureOutcome::Failed;
            }
        };

        match probe_recording(&folder, &stem).await {
            Some(path) => {
                let duration_seconds = match ffprobe::probe_duration(&path).await {
                    Ok(duration) => duration.round() as i64,
                    Err(e) => {
                        warn!("could not probe duration of {}: {}", path.display(), e);
                        0
                    }
                };
                CaptureOutcome::Complete {
                    file: CapturedFile {
                        path,
                        subject,
                        video_id: live.broadcast.id.clone(),
                    },
                    duration_seconds,
                }
            }
            None if auth_rejected => CaptureOutcome::AuthRejected,
            None => CaptureOutcome::Failed,
        }
    }
}

/// Probes the ordered list of candidate container extensions and returns
/// the first file that exists.
pub(crate) async fn probe_recording(folder: &Path, stem: &str) -> Option<PathBuf> {
    for ext in CONTAINER_EXTENSIONS {
        let candidate = folder.join(format!("{}.{}", stem, ext));
        if let Ok(true) = fs::try_exists(&candidate).await {
            return Some(candidate);
        }
    }
    None
}

fn is_auth_failure(line: &str) -> bool {
    let line = line.to_ascii_lowercase();
    AUTH_MARKERS.iter().any(|marker| line.contains(marker))
}
