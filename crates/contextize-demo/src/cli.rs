use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use contextize::{FileStorage, MemoryStorage, Storage, StoreHandle, keyed_store};
use contextize_core::Runtime;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::{App, stored_mode};
use crate::error::{DemoError, Result};

#[derive(Debug, Parser)]
#[command(
    name = "contextize-demo",
    about = "Light/dark mode demo for tagged contexts with a persisted debug layer",
    version
)]
pub struct Cli {
    /// JSON document holding the debug snapshot. Kept in memory when omitted.
    #[arg(long, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// Storage key the debug snapshot lives under.
    #[arg(long, default_value = "state")]
    pub key: String,

    /// Number of presses on the switch button.
    #[arg(long, default_value_t = 1)]
    pub toggles: usize,

    /// Clear the stored snapshot before mounting.
    #[arg(long)]
    pub reset: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long)]
    pub log_json: bool,
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);
    run(cli, &mut io::stdout().lock())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn open_store<S: Storage + 'static>(storage: S, cli: &Cli) -> Result<StoreHandle> {
    if cli.key.is_empty() {
        return Err(DemoError::invalid("--key must not be empty"));
    }
    if cli.reset {
        storage.remove_item(&cli.key)?;
        info!(key = %cli.key, "demo.reset");
    }
    Ok(StoreHandle::new(keyed_store(cli.key.clone(), storage)))
}

pub fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let store = match &cli.store {
        Some(path) => open_store(FileStorage::new(path), &cli)?,
        None => open_store(MemoryStorage::new(), &cli)?,
    };
    let initial = stored_mode(&store)?.unwrap_or_default();
    info!(mode = initial.as_str(), toggles = cli.toggles, "demo.start");

    let app = App::new();
    let mut runtime = Runtime::mount(app.element(store, initial))?;
    writeln!(out, "# initial ({initial})")?;
    write!(out, "{}", runtime.frame())?;

    for n in 1..=cli.toggles {
        runtime.click("Switch")?;
        writeln!(out, "# toggle {n}")?;
        write!(out, "{}", runtime.frame())?;
    }
    out.flush()?;
    Ok(())
}
