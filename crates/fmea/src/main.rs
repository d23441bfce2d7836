//! `fmea` - CLI for the FMEA tracker
//!
//! This binary runs the web server and offers command-line access to the
//! same records and statistics.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;

use fmea::cli::output::{render_report, render_status};
use fmea::cli::{AddCommand, Cli, Command, ConfigCommand, ReportCommand, ServeCommand};
use fmea::web::{self, AppState};
use fmea::{init_logging, Config, Database, Error, Overview, RecordStore};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(&config, serve_cmd),
        Command::Add(add_cmd) => handle_add(&config, add_cmd),
        Command::Report(report_cmd) => handle_report(&config, &report_cmd),
        Command::Status(status_cmd) => handle_status(&config, status_cmd.json),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn database(config: &Config) -> Database {
    Database::new(config.database_path()).with_busy_timeout(config.busy_timeout())
}

fn handle_serve(config: &Config, cmd: ServeCommand) -> anyhow::Result<()> {
    let mut config = config.clone();
    if let Some(bind) = cmd.bind {
        config.server.bind_addr = bind;
    }
    let addr = config.bind_addr()?;
    let state = AppState::from_config(&config)?;

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(web::serve(state, addr))?;
    Ok(())
}

fn handle_add(config: &Config, cmd: AddCommand) -> anyhow::Result<()> {
    let storage = database(config).connect()?;
    match storage.submit(&cmd.into_input()) {
        Ok(id) => {
            let record = storage
                .get(id)?
                .context("record missing right after insert")?;
            println!(
                "Recorded #{}: {} (RPN {} = {} x {} x {})",
                record.id,
                record.failure_mode,
                record.rpn,
                record.severity,
                record.occurrence,
                record.detection
            );
            Ok(())
        }
        Err(Error::Validation(err)) => {
            anyhow::bail!("entry rejected: {err}")
        }
        Err(err) => Err(err.into()),
    }
}

fn handle_report(config: &Config, cmd: &ReportCommand) -> anyhow::Result<()> {
    let top = cmd.top.unwrap_or(config.dashboard.top_n);
    let records = database(config).connect()?.list_all()?;
    let overview = Overview::from_records(records, top);

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
    } else {
        print!("{}", render_report(&overview));
    }
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let db = database(config);
    let stats = db.connect()?.stats()?;

    if json {
        let status = serde_json::json!({
            "database_path": db.path(),
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print!("{}", render_status(db.path(), &stats));
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Busy timeout (ms):  {}", config.storage.busy_timeout_ms);
                println!();
                println!("[Server]");
                println!("  Bind address:       {}", config.server.bind_addr);
                println!();
                println!("[Dashboard]");
                println!("  Top entries:        {}", config.dashboard.top_n);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
