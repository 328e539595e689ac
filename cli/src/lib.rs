//! GoStream terminal host.
//!
//! Signs the user in, runs the engine on its own thread and bridges stdin
//! commands and engine events.

mod commands;
mod config;
mod render;

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::Receiver;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gostream_engine::{create_engine, open_store, Accounts, Session, DEMO_EMAIL, DEMO_PASSWORD};
use gostream_ipc::{command_channel, event_channel, EngineCommand, EngineEvent};

use crate::commands::{Input, SignIn, DASHBOARD_HELP, SIGN_IN_HELP};

/// Initialize logging.
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "gostream=info,gostream_lib=info,gostream_engine=info,gostream_ipc=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Run the terminal dashboard until `quit` or end of input.
pub fn run() -> Result<()> {
    init_logging();
    info!("GoStream starting");

    let config = config::from_env()?;
    let store = open_store(&config).context("Failed to open data directory")?;
    let mut lines = io::stdin().lock().lines();

    let Some(session) = sign_in(&Accounts::new(Arc::clone(&store)), &mut lines)? else {
        info!("No session acquired, exiting");
        return Ok(());
    };
    println!("Welcome, {}!", session.name);

    let (command_tx, command_rx) = command_channel();
    let (event_tx, event_rx) = event_channel();

    let mut engine = create_engine(&config, store, command_rx, event_tx)?;
    let snapshot = engine.snapshot_handle();

    let engine_thread = thread::Builder::new()
        .name("gostream-engine".into())
        .spawn(move || {
            info!("Engine thread starting");
            engine.run();
            info!("Engine thread stopped");
        })?;
    let printer_thread = thread::Builder::new()
        .name("gostream-events".into())
        .spawn(move || print_events(event_rx))?;

    for line in lines {
        let line = line?;
        match commands::parse(&line) {
            Ok(Input::Command(command)) => {
                if command_tx.send(command).is_err() {
                    error!("Engine is gone");
                    break;
                }
            }
            Ok(Input::Status { json: false }) => {
                println!("{}", render::status(&snapshot.read()));
            }
            Ok(Input::Status { json: true }) => {
                let text = serde_json::to_string_pretty(&*snapshot.read())?;
                println!("{text}");
            }
            Ok(Input::Help) => println!("{DASHBOARD_HELP}"),
            Ok(Input::Quit) => break,
            Ok(Input::Empty) => {}
            Err(e) => println!("{e}"),
        }
    }

    if command_tx.send(EngineCommand::Shutdown).is_err() {
        warn!("Engine already stopped");
    }
    engine_thread
        .join()
        .map_err(|_| anyhow!("Engine thread panicked"))?;
    printer_thread
        .join()
        .map_err(|_| anyhow!("Event printer panicked"))?;

    info!("GoStream stopped");
    Ok(())
}

/// Prompt until a session is acquired. Returns `None` at end of input.
fn sign_in(
    accounts: &Accounts,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<Option<Session>> {
    println!("{SIGN_IN_HELP}");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            return Ok(None);
        };

        let attempt = match commands::parse_sign_in(&line?) {
            Ok(SignIn::Login { email, password }) => accounts.login(&email, &password),
            Ok(SignIn::Register(profile)) => accounts.register(profile),
            Ok(SignIn::Demo) => accounts.login(DEMO_EMAIL, DEMO_PASSWORD),
            Ok(SignIn::Help) => {
                println!("{SIGN_IN_HELP}");
                continue;
            }
            Ok(SignIn::Empty) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match attempt {
            Ok(session) => return Ok(Some(session)),
            Err(e) => println!("{e}"),
        }
    }
}

/// Print events until the engine hangs up.
fn print_events(events: Receiver<EngineEvent>) {
    for event in events.iter() {
        println!("{}", render::describe(&event));
    }
}
