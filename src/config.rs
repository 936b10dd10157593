use std::env;
use std::path::PathBuf;

const DEFAULT_CHANNEL_ID: &str = "UC4h_7L2n2aC_j-gN-V_f_xw";
const DEFAULT_BASE_PATH: &str = "/tmp/YouTubeClasses";
const DEFAULT_RCLONE_REMOTE: &str = "gdrive";
const DEFAULT_REMOTE_ROOT: &str = "Parmar_SSC_Classes";

/// Everything one invocation needs, resolved up front. Leaf components
/// receive this (or pieces of it) explicitly instead of reading process
/// state themselves.
#[derive(Debug, Clone)]
pub struct Config {
    /// Channel to watch, as a YouTube channel id.
    pub channel_id: String,
    /// Local working directory for captures and the cookie file.
    pub base_path: PathBuf,
    /// Name of the configured rclone remote.
    pub rclone_remote: String,
    /// Folder on the remote under which subject folders are created.
    pub remote_root: String,
    /// YouTube Data API key. Selects the API locator strategy.
    pub api_key: Option<String>,
    /// Netscape-format cookie blob. Selects the scrape strategy when no
    /// API key is configured, and authenticates captures either way.
    pub cookies: Option<String>,
    pub schedule_path: PathBuf,
    pub live_state_path: PathBuf,
    /// File the invoking environment reads structured outputs from.
    pub signal_path: Option<PathBuf>,
    pub fragment_retries: u32,
    pub download_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            channel_id: DEFAULT_CHANNEL_ID.to_owned(),
            base_path: PathBuf::from(DEFAULT_BASE_PATH),
            rclone_remote: DEFAULT_RCLONE_REMOTE.to_owned(),
            remote_root: DEFAULT_REMOTE_ROOT.to_owned(),
            api_key: None,
            cookies: None,
            schedule_path: PathBuf::from("schedule.json"),
            live_state_path: PathBuf::from("live.json"),
            signal_path: None,
            fragment_retries: 50,
            download_retries: 20,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(v) = env::var("CHANNEL_ID") {
            config.channel_id = v;
        }
        if let Ok(v) = env::var("BASE_PATH") {
            config.base_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("RCLONE_REMOTE") {
            config.rclone_remote = v;
        }
        if let Ok(v) = env::var("REMOTE_ROOT") {
            config.remote_root = v;
        }

        config.api_key = env::var("YOUTUBE_API_KEY").ok().filter(|v| !v.is_empty());
        config.cookies = env::var("YOUTUBE_COOKIES").ok().filter(|v| !v.is_empty());
        config.signal_path = env::var("GITHUB_OUTPUT").ok().map(PathBuf::from);

        config
    }

    /// Known local path the cookie blob is written to before use.
    pub fn cookie_file(&self) -> PathBuf {
        self.base_path.join("cookies.txt")
    }
}
