use clap::Parser;

use ybfeed_client_core::api::ApiClient;
use ybfeed_client_core::cli::{Cli, Command};
use ybfeed_client_core::config::Config;
use ybfeed_client_core::error::CliError;
use ybfeed_client_core::{client, commands, telemetry};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = telemetry::init(&cli.logging.to_config()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    if let Err(err) = run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = match cli.server {
        Some(server) => Config::with_server(server),
        None => Config::from_env(),
    };
    let api = ApiClient::new(config.base_url()?);

    match cli.command {
        Command::Watch { feed, secret } => client::run_watch(api, &feed, secret.as_deref()).await,
        Command::Get { feed, auth } => commands::get(&api, &feed, &auth).await,
        Command::Item { feed, name, auth } => commands::item(&api, &feed, &name, &auth).await,
        Command::Post {
            feed,
            text,
            file,
            auth,
        } => commands::post(&api, &feed, text.as_deref(), file.as_deref(), &auth).await,
        Command::Delete { feed, name, auth } => commands::delete(&api, &feed, &name, &auth).await,
        Command::Empty { feed, auth } => commands::empty(&api, &feed, &auth).await,
        Command::SetPin { feed, pin, auth } => {
            commands::set_pin(&api, &feed, pin.as_deref(), &auth).await
        }
        Command::Link { feed, auth } => commands::link(&api, &feed, &auth).await,
        Command::Ping => commands::ping(&api).await,
    }
}
