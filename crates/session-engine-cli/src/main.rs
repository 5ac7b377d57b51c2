//! `sessions`: run the session engine over a JSON dump of storage rows.
//!
//! Rows are read from `--input` or stdin as a JSON array in either storage
//! layout. Results go to stdout as JSON; logs go to stderr.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use session_engine::{
    delete_targets, has_session_on_date, month_markers, normalize_day, sessions_on_date,
    to_class_events, upcoming_sessions, ClassSession, DateInput, DeleteScope,
    DEFAULT_UPCOMING_DAYS,
};

#[derive(Parser, Debug)]
#[command(name = "sessions")]
#[command(version, about = "Inspect class-session placement over storage rows", long_about = None)]
struct Cli {
    /// JSON file with an array of storage rows (defaults to stdin)
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,

    /// Reference day used as "today" and as the fallback for unreadable dates
    #[arg(long, global = true, env = "SESSION_ENGINE_TODAY")]
    today: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sessions on one calendar day
    Day {
        /// Day to show (any supported date format)
        date: String,
    },
    /// Sessions in the upcoming window, soonest first
    Upcoming {
        /// Window length in days, starting today
        #[arg(short, long, env = "SESSION_ENGINE_DAYS", default_value_t = DEFAULT_UPCOMING_DAYS)]
        days: u32,
    },
    /// Days of a month that carry at least one session
    Month {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
    },
    /// Ids a delete of one session would remove
    DeleteTargets {
        /// Id of the targeted session
        id: String,
        /// Delete every occurrence of the recurring series
        #[arg(long)]
        all_recurring: bool,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DayView<'a> {
    date: NaiveDate,
    has_sessions: bool,
    sessions: Vec<&'a ClassSession>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpcomingView<'a> {
    today: NaiveDate,
    days: u32,
    sessions: Vec<&'a ClassSession>,
}

#[derive(Serialize)]
struct MonthView {
    year: i32,
    month: u32,
    days: Vec<u32>,
}

#[derive(Serialize)]
struct DeleteView {
    scope: DeleteScope,
    ids: Vec<String>,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let now = reference_now(cli.today.as_deref())?;
    let rows = read_rows(cli.input.as_ref())?;
    let sessions = to_class_events(&rows, now);
    tracing::debug!(count = sessions.len(), "mapped storage rows");

    let output = match &cli.command {
        Command::Day { date } => {
            let day = parse_day(date)?;
            serde_json::to_string_pretty(&DayView {
                date: day,
                has_sessions: has_session_on_date(&sessions, day),
                sessions: sessions_on_date(&sessions, day),
            })?
        }
        Command::Upcoming { days } => serde_json::to_string_pretty(&UpcomingView {
            today: now.date(),
            days: *days,
            sessions: upcoming_sessions(&sessions, now, *days),
        })?,
        Command::Month { year, month } => {
            if !(1..=12).contains(month) {
                bail!("month must be between 1 and 12, got {month}");
            }
            serde_json::to_string_pretty(&MonthView {
                year: *year,
                month: *month,
                days: month_markers(&sessions, *year, *month).into_iter().collect(),
            })?
        }
        Command::DeleteTargets { id, all_recurring } => {
            if !sessions.iter().any(|s| s.id == *id) {
                bail!("no session with id '{id}'");
            }
            let scope = DeleteScope::from_flag(*all_recurring);
            let ids = delete_targets(&sessions, id, scope);
            serde_json::to_string_pretty(&DeleteView { scope, ids })?
        }
    };

    println!("{output}");
    Ok(())
}

/// Log filter from `SESSION_ENGINE_LOG`, then `RUST_LOG`, default `warn`.
fn init_logging() {
    let filter = std::env::var("SESSION_ENGINE_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(&filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
}

fn parse_day(s: &str) -> Result<NaiveDate> {
    normalize_day(&DateInput::from(s)).with_context(|| format!("invalid date '{s}'"))
}

fn reference_now(today: Option<&str>) -> Result<NaiveDateTime> {
    match today {
        Some(s) => Ok(parse_day(s)?.and_time(Local::now().time())),
        None => Ok(Local::now().naive_local()),
    }
}

fn read_rows(input: Option<&PathBuf>) -> Result<Vec<Value>> {
    let mut raw = String::new();
    match input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            BufReader::new(file)
                .read_to_string(&mut raw)
                .with_context(|| format!("failed to read {}", path.display()))?;
        }
        None => {
            io::stdin()
                .read_to_string(&mut raw)
                .context("failed to read stdin")?;
        }
    }

    let value: Value = serde_json::from_str(&raw).context("input is not valid JSON")?;
    match value {
        Value::Array(rows) => Ok(rows),
        other => bail!("expected a JSON array of rows, got {}", kind(&other)),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
