use args::Args;
use clap::Parser;
use server::ServeConfig;

mod args;
mod logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init(&args);

    let config = match args.config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    // Without a token the protocol server can never be created; running on
    // would serve nothing but 503s. The hosted entrypoints may prefer that,
    // the binary treats it as fatal.
    if config.upstream.access_token().is_none() {
        log::error!("No access token configured. Set RELAY_ACCESS_TOKEN or pass --access-token.");
        std::process::exit(1);
    }

    let listen_address = config.server.listen_address();

    let serve_config = ServeConfig {
        listen_address,
        config,
        shutdown: None,
    };

    if let Err(e) = server::serve(serve_config).await {
        log::error!("Server failed to start: {e}");
        std::process::exit(1);
    }

    Ok(())
}
