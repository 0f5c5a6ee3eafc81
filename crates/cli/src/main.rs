// weektally - weekly activity summary
// Fetch one week of tracker activity, tally it per user, publish a sheet tab.

mod exit_codes;
mod fetch;
mod prompt;
mod publish;
mod report;
mod tally;
mod week;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Datelike, Local};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use weektally_config::{LabelLocale, PageErrorPolicy, Settings, WeekAnchor};
use weektally_sheets::{ServiceAccountKey, SheetsClient};

use exit_codes::{EXIT_CONFIG, EXIT_ERROR, EXIT_FETCH_PARTIAL, EXIT_SUCCESS, EXIT_USAGE};
use fetch::ActivityClient;

const SOURCE_NAME: &str = "Activity API";
const TOKEN_ENV: &str = "ACCESS_TOKEN";
const API_URL_ENV: &str = "API_URL";
const SHEET_ID_ENV: &str = "SHEET_ID";
const DEFAULT_CREDENTIALS: &str = "credentials.json";

#[derive(Parser)]
#[command(name = "weektally")]
#[command(about = "Tally a week of job-tracker activity per user and publish it to a spreadsheet tab")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Settings file (default: <config dir>/weektally/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Log request-level detail
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a week of activities and publish the per-user summary tab
    #[command(after_help = "\
Examples:
  weektally report                                  # prompts for year and week
  weektally report --year 2024 --week 7
  weektally report --year 2024 --week 7 --dry-run --out week7.csv
  weektally report --year 2024 --week 7 --on-page-error fail

Environment:
  API_URL                          Activity API base URL
  ACCESS_TOKEN                     Activity API bearer token
  SHEET_ID                         Destination spreadsheet id
  GOOGLE_APPLICATION_CREDENTIALS   Service-account key file")]
    Report {
        #[command(flatten)]
        period: PeriodArgs,

        /// Activity API base URL [env: API_URL]
        #[arg(long)]
        api_url: Option<String>,

        /// Activity API bearer token [env: ACCESS_TOKEN]
        #[arg(long)]
        access_token: Option<String>,

        /// Destination spreadsheet id [env: SHEET_ID]
        #[arg(long)]
        sheet_id: Option<String>,

        /// Service-account key file
        #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
        credentials: Option<PathBuf>,

        /// What to do when a page of the listing fails: partial or fail
        #[arg(long, value_name = "POLICY")]
        on_page_error: Option<PageErrorPolicy>,

        /// Print the report as CSV instead of publishing it
        #[arg(long)]
        dry_run: bool,

        /// CSV destination for --dry-run (default: stdout)
        #[arg(long, short = 'o', requires = "dry_run")]
        out: Option<PathBuf>,
    },

    /// Show the tab title, label and unix boundaries of a week
    #[command(after_help = "\
Examples:
  weektally range --year 2024 --week 1
  weektally range --year 2021 --week 1 --week-anchor iso")]
    Range {
        #[command(flatten)]
        period: PeriodArgs,
    },
}

#[derive(clap::Args)]
struct PeriodArgs {
    /// Report year (prompted when omitted)
    #[arg(long)]
    year: Option<i32>,

    /// Week number, 1-53 (prompted when omitted)
    #[arg(long)]
    week: Option<u32>,

    /// Where week 1 starts: jan1 or iso
    #[arg(long, value_name = "ANCHOR")]
    week_anchor: Option<WeekAnchor>,

    /// Language of the period label: en or id
    #[arg(long, value_name = "LOCALE")]
    locale: Option<LabelLocale>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: weektally <command> [options]");
            eprintln!("       weektally --help for more information");
            Ok(())
        }
        Some(Commands::Report {
            period,
            api_url,
            access_token,
            sheet_id,
            credentials,
            on_page_error,
            dry_run,
            out,
        }) => load_settings(cli.config).and_then(|settings| {
            cmd_report(ReportArgs {
                settings,
                period,
                api_url,
                access_token,
                sheet_id,
                credentials,
                on_page_error,
                dry_run,
                out,
                quiet: cli.quiet,
            })
        }),
        Some(Commands::Range { period }) => {
            load_settings(cli.config).and_then(|settings| cmd_range(&settings, period))
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Logs go to stderr. `RUST_LOG` wins over the flags.
fn init_logging(quiet: bool, verbose: bool) {
    let default_level = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .with_target(false)
        .init();
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nbuild:   ", env!("BUILD_PROFILE"),
        "\ntarget:  ", env!("TARGET"),
    )
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CONFIG, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// settings + period selection
// ============================================================================

fn load_settings(path: Option<PathBuf>) -> Result<Settings, CliError> {
    Settings::load(path.as_deref()).map_err(|e| {
        CliError::config(e.to_string())
            .with_hint(format!("default settings file: {}", Settings::config_path().display()))
    })
}

/// Year and week from flags, prompting for whichever is missing.
fn select_period(
    args: &PeriodArgs,
    anchor: WeekAnchor,
) -> Result<week::WeekPeriod, CliError> {
    let today = Local::now().date_naive();
    let needs_prompt = args.year.is_none() || args.week.is_none();

    if needs_prompt && !atty::is(atty::Stream::Stdin) {
        return Err(CliError::args("no --year/--week given and stdin is not a TTY")
            .with_hint("pass --year and --week to run non-interactively"));
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stderr = io::stderr();

    let year = match args.year {
        Some(y) => y,
        None => prompt::prompt_year(&mut input, &mut stderr, &prompt::year_choices(today.year()))?,
    };
    let week = match args.week {
        Some(w) => prompt::check_week(w)?,
        None => prompt::prompt_week(
            &mut input,
            &mut stderr,
            today.year(),
            week::current_iso_week(today),
        )?,
    };

    week::week_range(year, week, anchor)
        .ok_or_else(|| CliError::args(format!("year {} is out of range", year)))
}

// ============================================================================
// range
// ============================================================================

fn cmd_range(settings: &Settings, period: PeriodArgs) -> Result<(), CliError> {
    let anchor = period.week_anchor.unwrap_or(settings.week_anchor);
    let locale = period.locale.unwrap_or(settings.label_locale);
    let p = select_period(&period, anchor)?;
    let (after, before) = p.bounds(&Local);

    println!("tab:            {}", p.tab_title());
    println!("label:          {}", p.label(locale));
    println!("start:          {}", p.start);
    println!("end:            {}", p.end);
    println!("created_after:  {}", after);
    println!("created_before: {}", before);
    Ok(())
}

// ============================================================================
// report
// ============================================================================

struct ReportArgs {
    settings: Settings,
    period: PeriodArgs,
    api_url: Option<String>,
    access_token: Option<String>,
    sheet_id: Option<String>,
    credentials: Option<PathBuf>,
    on_page_error: Option<PageErrorPolicy>,
    dry_run: bool,
    out: Option<PathBuf>,
    quiet: bool,
}

fn cmd_report(args: ReportArgs) -> Result<(), CliError> {
    let settings = &args.settings;

    // 1. Resolve everything the run needs before touching the network
    let taxonomy = settings.taxonomy().map_err(|e| CliError::config(e.to_string()))?;
    let policy = args.on_page_error.unwrap_or(settings.page_error);
    let anchor = args.period.week_anchor.unwrap_or(settings.week_anchor);
    let locale = args.period.locale.unwrap_or(settings.label_locale);

    let api_url = fetch::resolve_value(args.api_url, API_URL_ENV, settings.api_url.as_deref())
        .ok_or_else(|| {
            CliError::config("missing Activity API base URL")
                .with_hint("use --api-url, set API_URL, or add api_url to the settings file")
        })?;
    let token = fetch::resolve_api_key(args.access_token, SOURCE_NAME, TOKEN_ENV)?;

    let mut sheets = if args.dry_run {
        None
    } else {
        Some(connect_sheets(&args.sheet_id, &args.credentials, settings)?)
    };

    // 2. Period
    let period = select_period(&args.period, anchor)?;
    let (after, before) = period.bounds(&Local);

    // 3. Fetch
    let show_progress = !args.quiet && atty::is(atty::Stream::Stderr);
    info!(
        "Fetching activities from {} to {}",
        period.start, period.end,
    );

    let client = ActivityClient::new(token, api_url);
    let outcome = client.fetch_all(after, before, policy)?;
    info!(
        "Fetched {} activities in {} page(s)",
        outcome.records.len(),
        outcome.pages,
    );

    if let Some(err) = outcome.unread_week_error() {
        return Err(err);
    }

    let incomplete = outcome.failure.as_ref().map(|f| {
        format!(
            "page {} failed, {} activities from earlier pages kept: {}",
            f.page,
            outcome.records.len(),
            f.message,
        )
    });

    // 4. Tally + rows
    let tally = tally::aggregate(&outcome.records)?;
    info!(
        "Tallied {} activities for {} users",
        tally.total(),
        tally.actor_count(),
    );
    let report = report::build_report(&tally, &taxonomy, incomplete);
    if !report.dropped.is_empty() {
        warn!(
            "{} categor{} not in the taxonomy, left out of the sheet: {}",
            report.dropped.len(),
            if report.dropped.len() == 1 { "y" } else { "ies" },
            report.dropped.join(", "),
        );
    }

    // 5. Output
    match sheets.as_mut() {
        None => {
            let out_label = report::write_csv(&report, &args.out)?;
            if show_progress {
                eprintln!("Done: {} rows written to {}", report.rows.len(), out_label);
            }
        }
        Some(client) => {
            let summary = publish::publish(client, &period, &report, locale)?;
            if show_progress {
                eprintln!(
                    "Successfully updated '{}' sheet ({} rows{})",
                    summary.tab_title,
                    summary.rows,
                    if summary.created { ", new tab" } else { "" },
                );
            }
        }
    }

    match report.incomplete {
        Some(reason) => Err(CliError {
            code: EXIT_FETCH_PARTIAL,
            message: format!("report for {} is incomplete: {}", period.tab_title(), reason),
            hint: Some("re-run once the Activity API recovers to overwrite the tab".into()),
        }),
        None => Ok(()),
    }
}

/// Resolve the sheet id and service-account key, then exchange the key for a token.
fn connect_sheets(
    sheet_id: &Option<String>,
    credentials: &Option<PathBuf>,
    settings: &Settings,
) -> Result<SheetsClient, CliError> {
    let sheet_id = fetch::resolve_value(sheet_id.clone(), SHEET_ID_ENV, settings.sheet_id.as_deref())
        .ok_or_else(|| {
            CliError::config("missing destination spreadsheet id")
                .with_hint("use --sheet-id, set SHEET_ID, or add sheet_id to the settings file (or pass --dry-run)")
        })?;

    let key_path = credentials
        .clone()
        .or_else(|| settings.credentials.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS));

    let key = ServiceAccountKey::from_file(&key_path)
        .map_err(|e| publish::sheets_error("load credentials", e))?;
    info!("Authorizing as {}", key.client_email);

    SheetsClient::connect(&key, &sheet_id).map_err(|e| publish::sheets_error("authorize", e))
}
