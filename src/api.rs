use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::broadcast::{sort_schedule, watch_url, BroadcastRef, LiveBroadcast, ScheduledBroadcast};
use crate::locator::{LocatorError, StreamLocator};
use crate::util::HttpClient;

const SEARCH_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/search";

/// Locator strategy backed by the YouTube Data API. Each lookup is one
/// quota-bounded search call against the channel's event feed.
pub struct ApiLocator {
    client: HttpClient,
    api_key: String,
    channel_id: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    publish_time: Option<String>,
}

impl ApiLocator {
    pub fn new(client: HttpClient, api_key: String, channel_id: String) -> Self {
        Self {
            client,
            api_key,
            channel_id,
        }
    }

    async fn search(&self, event_type: &str) -> Result<SearchResponse, LocatorError> {
        let url = format!(
            "{}?part=snippet&channelId={}&eventType={}&type=video&key={}",
            SEARCH_ENDPOINT, self.channel_id, event_type, self.api_key
        );
        Ok(self.client.fetch_json(&url).await?)
    }
}

fn live_from_response(response: SearchResponse) -> Option<LiveBroadcast> {
    let item = response.items.into_iter().next()?;
    let id = item.id.video_id?;
    Some(LiveBroadcast {
        broadcast: BroadcastRef {
            url: watch_url(&id),
            title: item.snippet.title,
            id,
        },
        started_at: None,
    })
}

// The search feed does not expose scheduled start times, so the
// snippet's publish time stands in for them. Entries without a usable
// time are skipped.
fn schedule_from_response(response: SearchResponse) -> Vec<ScheduledBroadcast> {
    let mut items = Vec::new();
    for item in response.items {
        let Some(time) = item.snippet.publish_time.as_deref() else {
            continue;
        };
        match DateTime::parse_from_rfc3339(time) {
            Ok(start_time) => items.push(ScheduledBroadcast {
                title: item.snippet.title,
                start_time: start_time.with_timezone(&Utc),
            }),
            Err(e) => warn!("skipping entry with bad start time {:?}: {}", time, e),
        }
    }
    sort_schedule(&mut items);
    items
}

#[async_trait]
impl StreamLocator for ApiLocator {
    async fn find_live(&self) -> Option<LiveBroadcast> {
        match self.search("live").await {
            Ok(response) => live_from_response(response),
            Err(e) => {
                warn!("live search failed: {}", e);
                None
            }
        }
    }

    async fn find_upcoming(&self) -> Vec<ScheduledBroadcast> {
        match self.search("upcoming").await {
            Ok(response) => schedule_from_response(response),
            Err(e) => {
                warn!("upcoming search failed: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> SearchResponse {
        serde_json::from_str(json).expect("Could not parse search response")
    }

    #[test]
    fn live_item_becomes_broadcast() {
        let response = parse(
            r#"{
                "kind": "youtube#searchListResponse",
                "items": [{
                    "id": {"kind": "youtube#video", "videoId": "abc123"},
                    "snippet": {"title": "History Class", "publishTime": "2024-05-01T04:00:00Z"}
                }]
            }"#,
        );
        let live = live_from_response(response).expect("live broadcast");
        assert_eq!(live.broadcast.id, "abc123");
        assert_eq!(live.broadcast.title, "History Class");
        assert_eq!(
            live.broadcast.url,
            "https://www.youtube.com/watch?v=abc123"
        );
    }

    #[test]
    fn empty_feed_is_not_live() {
        assert!(live_from_response(parse(r#"{"items": []}"#)).is_none());
        assert!(live_from_response(parse(r#"{}"#)).is_none());
    }

    #[test]
    fn upcoming_items_are_sorted_ascending() {
        let response = parse(
            r#"{
                "items": [
                    {"id": {"videoId": "b"}, "snippet": {"title": "later", "publishTime": "2024-05-02T04:00:00Z"}},
                    {"id": {"videoId": "a"}, "snippet": {"title": "sooner", "publishTime": "2024-05-01T04:00:00Z"}},
                    {"id": {"videoId": "c"}, "snippet": {"title": "no time"}}
                ]
            }"#,
        );
        let schedule = schedule_from_response(response);
        let titles: Vec<&str> = schedule.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["sooner", "later"]);
    }

    #[test]
    fn conversion_is_deterministic() {
        let json = r#"{
            "items": [
                {"id": {"videoId": "a"}, "snippet": {"title": "x", "publishTime": "2024-05-01T04:00:00Z"}},
                {"id": {"videoId": "b"}, "snippet": {"title": "y", "publishTime": "2024-05-01T04:00:00Z"}}
            ]
        }"#;
        let first = serde_json::to_string(&schedule_from_response(parse(json))).unwrap();
        let second = serde_json::to_string(&schedule_from_response(parse(json))).unwrap();
        assert_eq!(first, second);
    }
}
