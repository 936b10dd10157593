use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::util;

/// Parsed subset of the `ytInitialPlayerResponse` blob embedded in a
/// watch page. Only the fields the locator reads survive parsing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialPlayerResponse {
    pub playability_status: PlayabilityStatus,
    pub video_details: Option<VideoDetails>,
    pub microformat: Option<Microformat>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayabilityStatus {
    pub status: Status,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Ok,
    LiveStreamOffline,
    Unplayable,
    LoginRequired,
    Error,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    pub video_id: String,
    pub title: String,
    #[serde(default)]
    pub is_live: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Microformat {
    pub player_microformat_renderer: PlayerMicroformatRenderer,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMicroformatRenderer {
    pub live_broadcast_details: Option<LiveBroadcastDetails>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveBroadcastDetails {
    pub is_live_now: bool,
    pub start_timestamp: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum PlayerResponseError {
    #[error("Could not find initial player response")]
    NoInitialPlayerResponse,
    #[error("Could not parse initial player response")]
    ParseInitialPlayerResponse(#[from] serde_json::Error),
}

const IPR_STR: &str = "var ytInitialPlayerResponse =";

impl InitialPlayerResponse {
    pub fn from_html(html: &str) -> Result<Self, PlayerResponseError> {
        // Find the initial player response
        let ipr_str = util::extract_json_object(html, IPR_STR)
            .ok_or(PlayerResponseError::NoInitialPlayerResponse)?;

        // Parse the JSON
        serde_json::from_str(ipr_str).map_err(PlayerResponseError::ParseInitialPlayerResponse)
    }

    /// Whether the page describes a broadcast that is live right now.
    pub fn is_live(&self) -> bool {
        self.playability_status.status == Status::Ok
            && self
                .video_details
                .as_ref()
                .map(|v| !v.video_id.is_empty() && v.is_live)
                .unwrap_or(false)
            && self
                .microformat
                .as_ref()
                .and_then(|mf| {
                    mf.player_microformat_renderer
                        .live_broadcast_details
                        .as_ref()
                })
                .map(|lbd| lbd.is_live_now)
                .unwrap_or(false)
    }

    /// Actual start of the running broadcast, when the page carries it.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        let details = self
            .microformat
            .as_ref()?
            .player_microformat_renderer
            .live_broadcast_details
            .as_ref()?;
        let ts = details.start_timestamp.as_deref()?;
        DateTime::parse_from_rfc3339(ts)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn watch_page(ipr: &str) -> String {
        format!("<script>var ytInitialPlayerResponse = {};</script>", ipr)
    }

    #[test]
    fn ipr_live() {
        let html = watch_page(
            r#"{
                "playabilityStatus": {"status": "OK"},
                "videoDetails": {"videoId": "abc123", "title": "History Class", "isLive": true},
                "microformat": {"playerMicroformatRenderer": {"liveBroadcastDetails": {
                    "isLiveNow": true,
                    "startTimestamp": "2024-02-15T08:15:00+00:00"
                }}}
            }"#,
        );
        let ipr = InitialPlayerResponse::from_html(&html).expect("Could not parse IPR");

        assert!(ipr.is_live(), "Video should be live");
        assert_eq!(ipr.video_details.as_ref().unwrap().video_id, "abc123");
        assert_eq!(
            ipr.started_at(),
            Some(DateTime::<Utc>::from_str("2024-02-15T08:15:00Z").unwrap())
        );
    }

    #[test]
    fn ipr_offline() {
        let html = watch_page(
            r#"{
                "playabilityStatus": {"status": "LIVE_STREAM_OFFLINE", "reason": "Offline"},
                "videoDetails": {"videoId": "abc123", "title": "History Class"}
            }"#,
        );
        let ipr = InitialPlayerResponse::from_html(&html).expect("Could not parse IPR");

        assert!(!ipr.is_live(), "Video should not be live");
        assert_eq!(ipr.playability_status.status, Status::LiveStreamOffline);
        assert!(ipr.started_at().is_none());
    }

    #[test]
    fn ipr_ended_broadcast() {
        // Status OK but the broadcast details say it is over.
        let html = watch_page(
            r#"{
                "playabilityStatus": {"status": "OK"},
                "videoDetails": {"videoId": "abc123", "title": "History Class", "isLive": false},
                "microformat": {"playerMicroformatRenderer": {"liveBroadcastDetails": {
                    "isLiveNow": false,
                    "startTimestamp": "2024-02-15T08:15:00+00:00"
                }}}
            }"#,
        );
        let ipr = InitialPlayerResponse::from_html(&html).expect("Could not parse IPR");
        assert!(!ipr.is_live());
    }

    #[test]
    fn ipr_missing() {
        let html = "<html><body>nothing here</body></html>";
        assert!(matches!(
            InitialPlayerResponse::from_html(html),
            Err(PlayerResponseError::NoInitialPlayerResponse)
        ));
    }
}
