//! Candy bot entry point: CLI parsing, env-file loading, config validation,
//! and wiring the economy to the Revolt gateway.

use std::{env, path::PathBuf, process, sync::Arc};

use candy_bot::{
    handler::BotHandler, platform::RevoltPlatform, scheduler, BotConfig, CandyBot, Economy, Store,
};
use rand::{rngs::StdRng, SeedableRng};
use revolt_api::{AuthToken, RevoltClient};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let args = env::args().skip(1).collect::<Vec<String>>();

    if args.iter().any(|a| a == "--help") {
        print_help();
        process::exit(0);
    }

    if args.iter().any(|a| a == "--version") {
        println!("candy_bot {}", env!("CARGO_PKG_VERSION"));
        process::exit(0);
    }

    let mut env_file: Option<String> = None;
    let mut token: Option<String> = None;
    let mut proxy: Option<String> = None;
    let mut verbose = false;
    let mut config_file: Option<String> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--proxy" | "-x" => {
                i += 1;
                let Some(value) = args.get(i) else {
                    eprintln!("error: --proxy requires a proxy URL.");
                    process::exit(1);
                };
                proxy = Some(value.clone());
            }
            "--env-file" | "-e" => {
                i += 1;
                let Some(value) = args.get(i) else {
                    eprintln!("error: --env-file requires a file name.");
                    process::exit(1);
                };
                env_file = Some(value.clone());
            }
            "--token" | "-t" => {
                i += 1;
                let Some(value) = args.get(i) else {
                    eprintln!("error: --token requires a token string.");
                    process::exit(1);
                };
                token = Some(value.clone());
            }
            "--verbose" | "-v" => verbose = true,
            flag if flag.starts_with('-') => {
                eprintln!("error: unknown option '{flag}'. See --help.");
                process::exit(1);
            }
            val => match &config_file {
                None => config_file = Some(val.to_string()),
                Some(first) => {
                    eprintln!("warning: multiple config files given; using '{first}' and ignoring '{val}'.");
                }
            },
        }
        i += 1;
    }

    init_tracing(verbose);

    if let Some(env_path) = &env_file {
        if let Err(e) = dotenvy::from_filename(env_path) {
            error!(path = %env_path, error = %e, "failed to load env file");
            process::exit(1);
        }
        info!(path = %env_path, "environment loaded");
    }

    let Some(token) = token.or_else(|| env::var("REVOLT_TOKEN").ok()) else {
        error!("{}", candy_bot::error::ConfigError::MissingToken);
        process::exit(1);
    };

    let Some(config_file) = config_file else {
        error!("no config file provided; pass a JSON config file as an argument");
        process::exit(1);
    };

    let config = match BotConfig::load(&PathBuf::from(&config_file)) {
        Ok(config) => config,
        Err(e) => {
            error!(path = %config_file, error = %e, "invalid configuration");
            process::exit(1);
        }
    };
    info!(path = %config_file, "config validated");

    let economy = Economy::open(
        Store::new(&config.data_file),
        config.rewards.clone(),
        config.qualifying_channels(),
    );

    let client = match RevoltClient::new(config.api_url.clone(), config.ws_url.clone(), proxy) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "failed to build client");
            process::exit(1);
        }
    };
    client.set_token(Some(AuthToken::bot(token))).await;

    let platform = RevoltPlatform::new(client.clone(), config.moderator_permission);
    let bot = match CandyBot::new(config, economy, platform, StdRng::from_os_rng()) {
        Ok(bot) => Arc::new(bot),
        Err(e) => {
            error!(error = %e, "failed to start bot");
            process::exit(1);
        }
    };

    client.event_handler(BotHandler::new(Arc::clone(&bot))).await;

    let scheduled = Arc::clone(&bot);
    tokio::spawn(scheduler::run(bot.trigger(), move |now| {
        let bot = Arc::clone(&scheduled);
        async move { bot.run_scheduled(now).await }
    }));

    if let Err(e) = client.start().await {
        error!(error = %e, "failed to connect to gateway");
        process::exit(1);
    }

    info!("bot is running; press Ctrl+C to stop");
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("shutting down");
            if let Err(e) = client.close_ws(Some("Shutting down")).await {
                error!(error = %e, "error during shutdown");
            }
        }
        Err(e) => error!(error = %e, "error waiting for Ctrl+C"),
    }
}

fn print_help() {
    println!(
        r#"Usage: candy_bot [OPTION]... CONFIG_FILE
Run the candy economy bot with the given JSON configuration file.

Options:
  -e, --env-file [FILE]        Load environment variables from a .env file.
  -t, --token [TOKEN]          Bot token (defaults to $REVOLT_TOKEN).
  -x, --proxy [PROXY]          HTTP proxy for REST and WebSocket traffic.
  -v, --verbose                Debug logging (RUST_LOG overrides).
      --help                   Display this help and exit.
      --version                Output version information and exit.

Examples:
  candy_bot -e .env config.json
  candy_bot -t MyBotToken config.json
  candy_bot -x http://proxy:8080 config.json
"#
    );
}
