use anyhow::{Context, Result};
use clap::{Arg, ArgAction};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use request_transform::{
    config::{load_config, EXAMPLE_CONFIG},
    create_router,
    domain::Transformer,
    RequestTransformLayer,
};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = clap::Command::new("request-transform")
        .about("Rewrite JSON request bodies with templates or jq filters")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("CONFIG")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Path to a YAML or JSON configuration file"),
        )
        .arg(
            Arg::new("listen")
                .short('l')
                .long("listen")
                .value_name("ADDR")
                .help("Address to bind, overrides server.listen"),
        )
        .arg(
            Arg::new("log_level")
                .long("log-level")
                .value_name("LEVEL")
                .default_value("info")
                .help("Log level used when RUST_LOG is unset"),
        )
        .arg(
            Arg::new("json_logs")
                .long("json-logs")
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .arg(
            Arg::new("validate")
                .long("validate")
                .action(ArgAction::SetTrue)
                .help("Check the configuration and exit"),
        )
        .arg(
            Arg::new("example_config")
                .long("example-config")
                .action(ArgAction::SetTrue)
                .help("Print an example configuration and exit"),
        )
        .get_matches();

    let log_level = matches
        .get_one::<String>("log_level")
        .map(|s| s.as_str())
        .unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if matches.get_flag("json_logs") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }

    if matches.get_flag("example_config") {
        println!("{}", EXAMPLE_CONFIG);
        return Ok(());
    }

    let config_path = matches
        .get_one::<PathBuf>("config")
        .context("A configuration file is required (--config)")?;
    let mut config = load_config(config_path)
        .with_context(|| format!("Failed to load config file: {}", config_path.display()))?;

    if let Some(listen) = matches.get_one::<String>("listen") {
        config.server.listen = listen.clone();
    }

    if matches.get_flag("validate") {
        let layer = RequestTransformLayer::new(config.transform.clone())
            .context("Invalid transform configuration")?;
        if let Transformer::Pipeline(pipeline) = layer.transformer() {
            pipeline.check().context("Invalid pipeline")?;
        }
        println!("Configuration is valid");
        return Ok(());
    }

    let app = create_router(&config).context("Invalid transform configuration")?;

    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen))?;
    info!(listen = %config.server.listen, "Server listening");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
