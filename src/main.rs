use class_archiver::{config::Config, worker};
use log::{error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let config = Config::from_env();
    info!("checking channel {}", config.channel_id);

    match worker::run(&config).await {
        Ok(report) => {
            if report.auth_failed {
                warn!("authentication was rejected, credentials need rotation");
            }
            match report.archive {
                Some(record) => info!("archived {} ({})", record.title, record.remote_url),
                None => info!("no new archive this run"),
            }
        }
        Err(e) => {
            error!("could not publish state documents: {}", e);
            std::process::exit(1);
        }
    }
}
