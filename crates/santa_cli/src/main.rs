//! Operator command line for the gift draw.
//!
//! Works directly against the configured store, so it can reveal, export
//! and reset without the HTTP server running.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use log::error;
use santa_core::export::claim_link;
use santa_core::{
    default_log_level, default_roster, init_logging, load_roster, open_store, LoggingConfig,
    ParticipantView, SantaService, Store, StoreBackend,
};

#[derive(Parser, Debug)]
#[command(name = "santa")]
#[command(about = "Draw, reveal and export gift assignments")]
struct Args {
    /// Storage backend
    #[arg(long, value_enum, default_value_t = Backend::Sqlite, global = true)]
    backend: Backend,

    /// SQLite database file
    #[arg(long, default_value = "santa.sqlite3", global = true)]
    db_path: PathBuf,

    /// JSON document file
    #[arg(long, default_value = "santa.json", global = true)]
    document_path: PathBuf,

    /// Roster JSON file; the built-in roster is used when omitted
    #[arg(long, global = true)]
    roster: Option<PathBuf>,

    /// Prefix for claim links
    #[arg(long, default_value = "http://localhost:8080", global = true)]
    base_url: String,

    /// Milliseconds to wait on a locked database
    #[arg(long, default_value = "5000", global = true)]
    busy_timeout_ms: u64,

    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log directory; defaults to `./logs`
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Backend {
    Sqlite,
    Document,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Show whom the token holder gives to, drawing on first use
    Reveal { token: String },
    /// Print the assignment table as CSV
    Assignments,
    /// Print one claim link per participant as CSV
    Links,
    /// Clear every assignment; links stay valid
    Reset,
    /// Check that the store answers
    Health,
    /// Print the claim link for one participant
    Token { name: String },
}

impl Args {
    fn store_backend(&self) -> StoreBackend {
        match self.backend {
            Backend::Sqlite => StoreBackend::Sqlite {
                path: self.db_path.clone(),
                busy_timeout: Duration::from_millis(self.busy_timeout_ms),
            },
            Backend::Document => StoreBackend::Document {
                path: self.document_path.clone(),
            },
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(err) = start_logging(&args) {
        eprintln!("santa: {err}");
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            error!("event=cli_exit module=cli status=error error={err}");
            eprintln!("santa: {err}");
            ExitCode::FAILURE
        }
    }
}

fn start_logging(args: &Args) -> Result<(), String> {
    let cwd = std::env::current_dir().map_err(|err| format!("cannot resolve cwd: {err}"))?;
    let log_dir = cwd.join(args.log_dir.clone().unwrap_or_else(|| PathBuf::from("logs")));
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level().to_string());
    init_logging(&LoggingConfig::new(level, log_dir))
}

fn run(args: &Args) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let roster = match &args.roster {
        Some(path) => load_roster(path)?,
        None => default_roster()?,
    };
    let store = open_store(&args.store_backend())?;
    let service: SantaService<dyn Store> = SantaService::new(store, roster);

    match &args.command {
        Command::Reveal { token } => {
            let reveal = service.reveal(token)?;
            println!(
                "{} gives to {}",
                describe(&reveal.giver),
                describe(&reveal.receiver)
            );
        }
        Command::Assignments => print!("{}", service.export_assignments_csv(&args.base_url)?),
        Command::Links => print!("{}", service.export_links_csv(&args.base_url)?),
        Command::Reset => {
            service.reset()?;
            println!("assignments cleared");
        }
        Command::Health => {
            let health = service.health();
            let state = if health.reachable { "ok" } else { "unreachable" };
            println!("backend={} status={state}", health.backend);
            if !health.reachable {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Token { name } => {
            let token = service.ensure_token(name)?;
            println!("{}", claim_link(&args.base_url, &token));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn describe(view: &ParticipantView) -> String {
    let dates: Vec<String> = [
        view.birthday.as_deref().map(|day| format!("birthday {day}")),
        view.anniversary
            .as_deref()
            .map(|day| format!("anniversary {day}")),
    ]
    .into_iter()
    .flatten()
    .collect();

    if dates.is_empty() {
        view.name.clone()
    } else {
        format!("{} ({})", view.name, dates.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_follow_subcommands() {
        let args = Args::try_parse_from([
            "santa",
            "links",
            "--backend",
            "document",
            "--document-path",
            "/tmp/draw.json",
        ])
        .unwrap();
        assert_eq!(args.command, Command::Links);
        assert_eq!(
            args.store_backend(),
            StoreBackend::Document {
                path: PathBuf::from("/tmp/draw.json")
            }
        );
    }

    #[test]
    fn reveal_requires_a_token() {
        assert!(Args::try_parse_from(["santa", "reveal"]).is_err());
        let args = Args::try_parse_from(["santa", "reveal", "abc"]).unwrap();
        assert_eq!(
            args.command,
            Command::Reveal {
                token: "abc".to_string()
            }
        );
        assert_eq!(args.backend, Backend::Sqlite);
    }

    #[test]
    fn describe_lists_known_dates() {
        let view = ParticipantView {
            name: "Alice".to_string(),
            birthday: Some("03-14".to_string()),
            anniversary: None,
        };
        assert_eq!(describe(&view), "Alice (birthday 03-14)");
    }
}
