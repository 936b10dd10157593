use async_trait::async_trait;

use crate::broadcast::{LiveBroadcast, ScheduledBroadcast};
use crate::player_response::PlayerResponseError;
use crate::util;

/// One strategy for answering "is the channel live" and "what is
/// scheduled". Lookup failures never escape this layer: implementations
/// degrade to `None` / empty and log, so the caller can always publish a
/// valid (possibly empty) schedule.
#[async_trait]
pub trait StreamLocator {
    async fn find_live(&self) -> Option<LiveBroadcast>;
    async fn find_upcoming(&self) -> Vec<ScheduledBroadcast>;
}

#[derive(thiserror::Error, Debug)]
pub enum LocatorError {
    #[error("http error: {0}")]
    Http(#[from] util::FetchError),
    #[error("player response error: {0}")]
    PlayerResponse(#[from] PlayerResponseError),
    #[error("could not find initial data payload")]
    NoInitialData,
    #[error("could not parse payload: {0}")]
    Parse(#[from] serde_json::Error),
}
