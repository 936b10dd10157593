use std::path::PathBuf;

use chrono::Utc;
use tokio::fs;

use crate::api::ApiLocator;
use crate::archive::{Archiver, Uploader};
use crate::broadcast::ArchiveRecord;
use crate::capture::{CaptureEngine, CaptureOutcome, Capturer};
use crate::config::Config;
use crate::locator::StreamLocator;
use crate::publish::{self, PublishError};
use crate::scrape::ScrapeLocator;
use crate::subject;
use crate::util::{self, HttpClient};

/// Outcome of one invocation, also delivered on the signal channel.
#[derive(Debug)]
pub struct RunReport {
    pub live_video_id: Option<String>,
    pub archive: Option<ArchiveRecord>,
    pub auth_failed: bool,
}

/// Runs the whole pipeline once: locate, publish the schedule, then (if
/// live) capture, classify, archive, and publish the live state. Both
/// state documents are written on every path, including the
/// credential-less degraded one.
pub async fn run(config: &Config) -> Result<RunReport, PublishError> {
    let cookie_file = match &config.cookies {
        Some(blob) => write_cookie_file(config, blob).await,
        None => None,
    };

    let locator = build_locator(config);
    if locator.is_none() {
        info!("no usable credentials, publishing empty state");
    }

    let capturer = CaptureEngine::new(config, cookie_file);
    let uploader = Uploader::new(config);
    run_with(config, locator.as_deref(), &capturer, &uploader).await
}

/// The cookie blob must sit at a known local path before the extractor
/// can use it.
async fn write_cookie_file(config: &Config, blob: &str) -> Option<PathBuf> {
    if let Err(e) = fs::create_dir_all(&config.base_path).await {
        warn!("could not create {}: {}", config.base_path.display(), e);
        return None;
    }
    let path = config.cookie_file();
    match fs::write(&path, blob).await {
        Ok(()) => Some(path),
        Err(e) => {
            warn!("could not write cookie file: {}", e);
            None
        }
    }
}

/// Strategy selection: an API key wins, a cookie blob alone enables the
/// scrape fallback, neither leaves the run in its degraded state.
fn build_locator(config: &Config) -> Option<Box<dyn StreamLocator>> {
    if let Some(key) = &config.api_key {
        return match HttpClient::new(None) {
            Ok(client) => Some(Box::new(ApiLocator::new(
                client,
                key.clone(),
                config.channel_id.clone(),
            ))),
            Err(e) => {
                error!("could not build http client: {}", e);
                None
            }
        };
    }
    if let Some(blob) = &config.cookies {
        let header = util::cookie_header_from_netscape(blob);
        return match HttpClient::new(header) {
            Ok(client) => Some(Box::new(ScrapeLocator::new(
                client,
                config.channel_id.clone(),
            ))),
            Err(e) => {
                error!("could not build http client: {}", e);
                None
            }
        };
    }
    None
}

pub(crate) async fn run_with(
    config: &Config,
    locator: Option<&dyn StreamLocator>,
    capturer: &dyn Capturer,
    archiver: &dyn Archiver,
) -> Result<RunReport, PublishError> {
    let (upcoming, live) = match locator {
        Some(locator) => futures::join!(locator.find_upcoming(), locator.find_live()),
        None => (Vec::new(), None),
    };

    // The schedule goes out before any capture work so consumers are
    // never stuck with a stale document for the length of a broadcast.
    publish::write_schedule(&config.schedule_path, &upcoming).await?;
    info!("schedule updated: {} upcoming broadcasts", upcoming.len());

    let mut report = RunReport {
        live_video_id: None,
        archive: None,
        auth_failed: false,
    };

    if let Some(live) = live {
        info!(
            "live broadcast detected: {} ({})",
            live.broadcast.title, live.broadcast.id
        );
        report.live_video_id = Some(live.broadcast.id.clone());
        let subject = subject::classify(&live.broadcast.title);

        match capturer.capture(&live, subject).await {
            CaptureOutcome::Complete {
                file,
                duration_seconds,
            } => match archiver.archive(&file).await {
                Ok(remote) => {
                    info!("archived as {}", remote.preview_url);
                    report.archive = Some(ArchiveRecord {
                        id: live.broadcast.id.clone(),
                        title: live.broadcast.title.clone(),
                        duration_seconds,
                        upload_date: Utc::now().format("%Y-%m-%d").to_string(),
                        subject,
                        remote_url: remote.preview_url,
                    });
                }
                Err(e) => {
                    // The capture survives on disk for manual cleanup or
                    // the next run.
                    warn!(
                        "archive failed, leaving {} on disk: {}",
                        file.path.display(),
                        e
                    );
                }
            },
            CaptureOutcome::AuthRejected => {
                warn!("capture rejected by authentication, flagging credentials for rotation");
                report.auth_failed = true;
            }
            CaptureOutcome::Failed => {
                warn!("capture failed, next scheduled run will retry");
            }
        }
    } else {
        info!("channel is not live");
    }

    publish::write_live_state(&config.live_state_path, report.live_video_id.as_deref()).await?;
    publish::emit_signal(
        config.signal_path.as_deref(),
        report.auth_failed,
        report.archive.as_ref(),
    )
    .await?;

    Ok(report)
}
