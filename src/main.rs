//! `bazaar` binary: serve the storefront, generate its runtime config, or
//! check the realtime endpoint. See [`bazaar::cli`] for the options.

use std::process::ExitCode;

use bazaar::cli::{Cli, Command, GenerateConfigArgs, ServeArgs};
use bazaar::events::EventSource;
use bazaar::events::listeners::LoggingListener;
use bazaar::{api, register_event_listeners};
use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_logging(cli.debug);
    register_event_listeners(|registry| {
        // realtime transitions are already logged by the connection manager
        registry.listen_to(EventSource::Session, LoggingListener::new());
        #[cfg(feature = "tracing")]
        registry.listen(bazaar::events::listeners::TracingListener);
    });

    match cli.command {
        Command::Serve(args) => serve(args, cli.debug).await,
        Command::GenerateConfig(args) => generate_config(&args, cli.debug),
        #[cfg(feature = "realtime")]
        Command::Watch(args) => watch::run(&args).await,
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

async fn serve(args: ServeArgs, debug: bool) -> ExitCode {
    let config = match args.into_config(debug) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match api::serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!(target: "bazaar::http", "msg=\"server failed\" error=\"{e}\"");
            ExitCode::FAILURE
        }
    }
}

fn generate_config(args: &GenerateConfigArgs, debug: bool) -> ExitCode {
    let runtime_config = match args.runtime_config(debug) {
        Ok(runtime_config) => runtime_config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = runtime_config.write_to(&args.out) {
        eprintln!("Error writing {}: {e}", args.out.display());
        return ExitCode::FAILURE;
    }

    println!("Wrote {}", args.out.display());
    ExitCode::SUCCESS
}

#[cfg(feature = "realtime")]
mod watch {
    use std::process::ExitCode;

    use bazaar::cli::WatchArgs;
    use bazaar::realtime::{ConnectionManager, ConnectionState, Inbound};
    use tokio::sync::broadcast::error::RecvError;

    pub async fn run(args: &WatchArgs) -> ExitCode {
        let manager = ConnectionManager::new(args.realtime_config());
        let mut inbound = manager.subscribe();
        let mut state = manager.watch_state();

        if let Err(e) = manager.initiate() {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    manager.close().await;
                    return ExitCode::SUCCESS;
                }
                changed = state.changed() => {
                    if changed.is_err() {
                        return ExitCode::FAILURE;
                    }
                    let current = *state.borrow_and_update();
                    println!("state: {current}");
                    match current {
                        ConnectionState::Errored => return ExitCode::FAILURE,
                        ConnectionState::Closed => return ExitCode::SUCCESS,
                        _ => {}
                    }
                }
                message = inbound.recv() => match message {
                    Ok(Inbound::Json(value)) => println!("{value}"),
                    Ok(Inbound::Raw(text)) => println!("(raw) {text}"),
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!(target: "bazaar::realtime", "msg=\"watcher lagged\" skipped={skipped}");
                    }
                    Err(RecvError::Closed) => return ExitCode::SUCCESS,
                },
            }
        }
    }
}
