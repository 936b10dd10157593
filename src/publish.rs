use std::path::Path;

use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::broadcast::{ArchiveRecord, ScheduledBroadcast};

#[derive(thiserror::Error, Debug)]
pub enum PublishError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Could not encode state document: {0}")]
    EncodeError(#[from] serde_json::Error),
}

/// State document the presentation layer reads to decide whether to show
/// the live player. Non-null iff a live broadcast was detected this run;
/// it does not imply the capture or the archive succeeded.
#[derive(Debug, Serialize)]
pub struct LiveState {
    #[serde(rename = "liveVideoId")]
    pub live_video_id: Option<String>,
}

/// Total overwrite of the schedule document, every run.
pub async fn write_schedule(path: &Path, items: &[ScheduledBroadcast]) -> Result<(), PublishError> {
    write_atomic(path, &serde_json::to_vec_pretty(items)?).await
}

/// Total overwrite of the live-state document, every run.
pub async fn write_live_state(path: &Path, live_id: Option<&str>) -> Result<(), PublishError> {
    let state = LiveState {
        live_video_id: live_id.map(str::to_owned),
    };
    write_atomic(path, &serde_json::to_vec(&state)?).await
}

// Consumers poll these files, so they must never observe a torn write.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PublishError> {
    let temp_path = format!("{}.tmp", path.display());
    fs::write(&temp_path, bytes).await?;
    fs::rename(&temp_path, path).await?;
    Ok(())
}

/// Appends this run's structured outputs to the signal file the invoking
/// environment exposes, as `name=value` lines: `auth_failed` every run,
/// `new_video` only when a capture-and-archive completed.
pub async fn emit_signal(
    path: Option<&Path>,
    auth_failed: bool,
    record: Option<&ArchiveRecord>,
) -> Result<(), PublishError> {
    let Some(path) = path else {
        debug!("no signal channel configured");
        return Ok(());
    };

    let mut payload = format!("auth_failed={}\n", auth_failed);
    if let Some(record) = record {
        payload.push_str(&format!("new_video={}\n", serde_json::to_string(record)?));
    }

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(payload.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    use super::*;
    use crate::subject::Subject;

    #[tokio::test]
    async fn live_state_documents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("live.json");

        write_live_state(&path, None).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            r#"{"liveVideoId":null}"#
        );

        write_live_state(&path, Some("abc123")).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            r#"{"liveVideoId":"abc123"}"#
        );
    }

    #[tokio::test]
    async fn schedule_document_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schedule.json");

        let items = vec![ScheduledBroadcast {
            title: "Polity Class".into(),
            start_time: Utc.timestamp_opt(4_102_444_800, 0).unwrap(),
        }];
        write_schedule(&path, &items).await.unwrap();
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .contains("Polity Class"));

        write_schedule(&path, &[]).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[tokio::test]
    async fn signal_lines_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.txt");

        emit_signal(Some(&path), false, None).await.unwrap();
        let record = ArchiveRecord {
            id: "abc123".into(),
            title: "History Class".into(),
            duration_seconds: 5400,
            upload_date: "2026-08-07".into(),
            subject: Subject::History,
            remote_url: "https://drive.google.com/file/d/x/preview".into(),
        };
        emit_signal(Some(&path), true, Some(&record)).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "auth_failed=false");
        assert_eq!(lines[1], "auth_failed=true");
        assert!(lines[2].starts_with("new_video={"));
        assert!(lines[2].contains(r#""id":"abc123""#));
    }

    #[tokio::test]
    async fn no_signal_channel_is_fine() {
        emit_signal(None, false, None).await.unwrap();
    }
}
