use clap::Parser;
use node_status_monitor::{
    config::{AppConfig, ColorChoice, Options},
    error::MonitorError,
    logging::init_tracing,
    service,
};
use tracing::error;

#[tokio::main]
async fn main() {
    let options = Options::parse();
    let address = options.address.clone();

    if let Err(error) = start(options).await {
        error!(error = %error, "status monitor stopped");
        eprintln!("\n{}", error.guidance(&address));
        eprintln!("{error}");
        std::process::exit(1);
    }
}

async fn start(options: Options) -> Result<(), MonitorError> {
    init_tracing(options.log_level).map_err(MonitorError::Logging)?;

    match options.color {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
        ColorChoice::Auto => {}
    }

    let config = AppConfig::try_from(options)?;
    service::run(config).await
}
