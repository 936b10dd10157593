use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::broadcast::{sort_schedule, watch_url, BroadcastRef, LiveBroadcast, ScheduledBroadcast};
use crate::locator::{LocatorError, StreamLocator};
use crate::player_response::{InitialPlayerResponse, PlayerResponseError};
use crate::util::{self, HttpClient};

const INITIAL_DATA_STR: &str = "var ytInitialData =";

/// Locator strategy that works without an API key: resolves the
/// channel's `/live` redirect for the current broadcast and scrapes the
/// `/streams` listing for scheduled ones.
pub struct ScrapeLocator {
    client: HttpClient,
    channel_id: String,
}

impl ScrapeLocator {
    pub fn new(client: HttpClient, channel_id: String) -> Self {
        Self { client, channel_id }
    }

    async fn live_watch_page(&self) -> Result<Option<LiveBroadcast>, LocatorError> {
        let url = format!("https://www.youtube.com/channel/{}/live", self.channel_id);
        let html = self.client.fetch_text(&url).await?;
        let ipr = InitialPlayerResponse::from_html(&html)?;

        if !ipr.is_live() {
            debug!(
                "watch page is not live: {:?}",
                ipr.playability_status.reason
            );
            return Ok(None);
        }
        let Some(details) = ipr.video_details.as_ref() else {
            return Ok(None);
        };

        Ok(Some(LiveBroadcast {
            broadcast: BroadcastRef {
                id: details.video_id.clone(),
                title: details.title.clone(),
                url: watch_url(&details.video_id),
            },
            started_at: ipr.started_at(),
        }))
    }

    async fn upcoming_streams(&self) -> Result<Vec<ScheduledBroadcast>, LocatorError> {
        let url = format!(
            "https://www.youtube.com/channel/{}/streams",
            self.channel_id
        );
        let html = self.client.fetch_text(&url).await?;
        let data = util::extract_json_object(&html, INITIAL_DATA_STR)
            .ok_or(LocatorError::NoInitialData)?;
        let data: Value = serde_json::from_str(data)?;

        let mut items = collect_upcoming(&data, Utc::now());
        sort_schedule(&mut items);
        Ok(items)
    }
}

/// Walks the browse payload for `videoRenderer` entries carrying
/// `upcomingEventData`, keeping only starts strictly in the future.
/// Entries that are already live carry no event data and fall out here.
fn collect_upcoming(data: &Value, now: DateTime<Utc>) -> Vec<ScheduledBroadcast> {
    let mut items = Vec::new();
    walk_renderers(data, now, &mut items);
    items
}

fn walk_renderers(value: &Value, now: DateTime<Utc>, out: &mut Vec<ScheduledBroadcast>) {
    match value {
        Value::Object(map) => {
            if let Some(item) = scheduled_entry(map, now) {
                out.push(item);
            }
            for child in map.values() {
                walk_renderers(child, now, out);
            }
        }
        Value::Array(children) => {
            for child in children {
                walk_renderers(child, now, out);
            }
        }
        _ => (),
    }
}

fn scheduled_entry(
    map: &serde_json::Map<String, Value>,
    now: DateTime<Utc>,
) -> Option<ScheduledBroadcast> {
    map.get("videoId")?;
    let start = map
        .get("upcomingEventData")?
        .get("startTime")?
        .as_str()?
        .parse::<i64>()
        .ok()?;
    let start_time = Utc.timestamp_opt(start, 0).single()?;
    if start_time <= now {
        return None;
    }
    let title = title_text(map.get("title")?)?;
    Some(ScheduledBroadcast { title, start_time })
}

fn title_text(title: &Value) -> Option<String> {
    if let Some(text) = title.get("simpleText").and_then(Value::as_str) {
        return Some(text.to_owned());
    }
    title
        .get("runs")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(str::to_owned)
}

#[async_trait]
impl StreamLocator for ScrapeLocator {
    async fn find_live(&self) -> Option<LiveBroadcast> {
        match self.live_watch_page().await {
            Ok(live) => live,
            Err(LocatorError::PlayerResponse(PlayerResponseError::NoInitialPlayerResponse)) => {
                debug!("channel has no live watch page");
                None
            }
            Err(e) => {
                warn!("live lookup failed: {}", e);
                None
            }
        }
    }

    async fn find_upcoming(&self) -> Vec<ScheduledBroadcast> {
        match self.upcoming_streams().await {
            Ok(items) => items,
            Err(e) => {
                warn!("upcoming lookup failed: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal shape of a channel /streams browse payload: one upcoming
    // entry, one already past, one currently live (no event data).
    const STREAMS_DATA: &str = r#"{
        "contents": {"tabs": [{"content": {"items": [
            {"videoRenderer": {
                "videoId": "up1",
                "title": {"runs": [{"text": "Polity Class"}]},
                "upcomingEventData": {"startTime": "4102444800"}
            }},
            {"videoRenderer": {
                "videoId": "old1",
                "title": {"runs": [{"text": "Old Class"}]},
                "upcomingEventData": {"startTime": "946684800"}
            }},
            {"videoRenderer": {
                "videoId": "live1",
                "title": {"runs": [{"text": "Live Now"}]}
            }}
        ]}}]}
    }"#;

    #[test]
    fn keeps_only_future_scheduled_entries() {
        let data: Value = serde_json::from_str(STREAMS_DATA).unwrap();
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let items = collect_upcoming(&data, now);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Polity Class");
        assert_eq!(items[0].start_time, Utc.timestamp_opt(4_102_444_800, 0).unwrap());
    }

    #[test]
    fn title_text_handles_both_shapes() {
        let runs: Value = serde_json::from_str(r#"{"runs": [{"text": "from runs"}]}"#).unwrap();
        assert_eq!(title_text(&runs).as_deref(), Some("from runs"));

        let simple: Value = serde_json::from_str(r#"{"simpleText": "plain"}"#).unwrap();
        assert_eq!(title_text(&simple).as_deref(), Some("plain"));

        let neither: Value = serde_json::from_str(r#"{}"#).unwrap();
        assert!(title_text(&neither).is_none());
    }

    #[test]
    fn malformed_event_data_is_skipped() {
        let data: Value = serde_json::from_str(
            r#"{"videoRenderer": {
                "videoId": "x",
                "title": {"runs": [{"text": "Bad"}]},
                "upcomingEventData": {"startTime": "not-a-number"}
            }}"#,
        )
        .unwrap();
        let now = Utc.timestamp_opt(0, 0).unwrap();
        assert!(collect_upcoming(&data, now).is_empty());
    }
}
