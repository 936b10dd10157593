use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::subject::Subject;

/// Stable identity of a single broadcast on the watched channel.
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastRef {
    pub id: String,
    pub title: String,
    pub url: String,
}

/// A broadcast that is live right now (or was, moments ago).
#[derive(Debug, Clone, PartialEq)]
pub struct LiveBroadcast {
    pub broadcast: BroadcastRef,
    /// Known only when the locator saw the watch page metadata.
    pub started_at: Option<DateTime<Utc>>,
}

/// One entry of the published schedule document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledBroadcast {
    pub title: String,
    #[serde(rename = "startTime")]
    pub start_time: DateTime<Utc>,
}

/// Ascending by start time; stable, so ties keep their feed order.
pub fn sort_schedule(items: &mut [ScheduledBroadcast]) {
    items.sort_by_key(|item| item.start_time);
}

pub fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", id)
}

/// Local capture artifact, owned by the pipeline until the uploader
/// moves it off the disk.
#[derive(Debug, Clone)]
pub struct CapturedFile {
    pub path: PathBuf,
    pub subject: Subject,
    pub video_id: String,
}

/// Published result of a completed capture-and-archive. Field names on
/// the wire match what the presentation layer consumes.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "duration")]
    pub duration_seconds: i64,
    #[serde(rename = "uploadDate")]
    pub upload_date: String,
    pub subject: Subject,
    #[serde(rename = "gdrive_url")]
    pub remote_url: String,
}
