//! # class-archiver
//!
//! This crate watches a single YouTube channel for live classes. When a
//! broadcast is live it records it to local storage with `yt-dlp`, tags
//! it with a subject derived from the title, moves it to Google Drive
//! with `rclone`, and publishes two small JSON state documents
//! (`live.json`, `schedule.json`) that a separate web page consumes.
//!
//! The crate is built to be invoked repeatedly by an external scheduler;
//! each invocation is one run-to-completion pass over the pipeline:
//!
//! ```no_run
//! use class_archiver::{config::Config, worker};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     env_logger::init();
//!
//!     // Credentials and overrides come from the environment
//!     let config = Config::from_env();
//!
//!     // Locate, capture, archive, publish
//!     let report = worker::run(&config).await.expect("run failed");
//!     if report.auth_failed {
//!         eprintln!("credentials need rotation");
//!     }
//! }
//! ```
//!
//! Lookup failures degrade to "nothing found" so every run ends with
//! both state documents written, even with no credentials configured.

#[forbid(unsafe_code)]
#[macro_use]
extern crate log;

pub mod api;
pub mod archive;
pub mod broadcast;
pub mod capture;
pub mod config;
pub mod ffprobe;
pub mod locator;
pub mod player_response;
pub mod publish;
pub mod scrape;
pub mod subject;
pub mod util;
pub mod worker;
