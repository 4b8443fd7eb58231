use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use courtscraper::{
    config::{Config, Overrides},
    fetch::{
        case_status::{fetch_case_status, CaseStatusQuery, COMMON_CASE_TYPES},
        cause_list::{fetch_cause_list, CauseListQuery, DELHI_COURT_COMPLEXES},
        webdriver::WebDriverSession,
        StepLog,
    },
    history::{CaseQueryRow, CauseListQueryRow, History},
    process::{extract_cause_list, parse_case_details, CaseDetails, CauseList},
    report::{self, CaseMeta, CauseListMeta, Report},
};
use reqwest::Client;
use serde::Serialize;
use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Case status and cause list scraper for the Indian eCourts portals"
)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Look up one case on the eCourts services portal
    CaseStatus(CaseArgs),
    /// Fetch a Delhi district court cause list
    CauseList(CauseListArgs),
    /// Extract a cause list from a saved page
    ParseCauseList {
        html: PathBuf,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Parse a saved case-status result page
    ParseCaseStatus {
        html: PathBuf,
        #[command(flatten)]
        case: CaseIdArgs,
    },
    /// Show past queries, newest first
    History {
        #[arg(long)]
        json: bool,
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },
    /// Print the common case-type labels
    CaseTypes,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Merge the history store's small files
    Vacuum,
}

#[derive(clap::Args)]
struct CaseIdArgs {
    #[arg(long)]
    case_type: String,
    #[arg(long)]
    number: String,
    #[arg(long)]
    year: i32,
}

#[derive(clap::Args)]
struct CaseArgs {
    #[arg(long)]
    state: String,
    #[arg(long)]
    district: String,
    #[arg(long)]
    court_complex: String,
    #[command(flatten)]
    case: CaseIdArgs,
}

#[derive(clap::Args)]
struct ListArgs {
    #[arg(long)]
    court_complex: String,
    /// YYYY-MM-DD
    #[arg(long)]
    date: NaiveDate,
    #[arg(long, value_enum, default_value_t = ListType::Civil)]
    list_type: ListType,
}

#[derive(clap::Args)]
struct CauseListArgs {
    #[command(flatten)]
    list: ListArgs,
    /// Court number or judge; leave out to pick in the browser
    #[arg(long)]
    court: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ListType {
    Civil,
    Criminal,
}

impl fmt::Display for ListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ListType::Civil => "Civil",
            ListType::Criminal => "Criminal",
        })
    }
}

impl ListArgs {
    /// The date the way the portal takes it.
    fn portal_date(&self) -> String {
        self.date.format("%m/%d/%Y").to_string()
    }

    fn meta(&self) -> CauseListMeta {
        CauseListMeta {
            court_complex: self.court_complex.clone(),
            date: self.portal_date(),
            list_type: self.list_type.to_string(),
        }
    }
}

impl CaseIdArgs {
    fn meta(&self) -> CaseMeta {
        CaseMeta {
            case_type: self.case_type.clone(),
            case_number: self.number.clone(),
            case_year: self.year,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1) logging: RUST_LOG, else LOG_LEVEL, else info
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // 2) settings
    let cli = Cli::parse();
    let cfg = Config::load(&cli.overrides)?;
    info!(data_dir = %cfg.data_dir.display(), export_dir = %cfg.export_dir.display(), "startup");

    match cli.command {
        Command::CaseStatus(args) => case_status(&cfg, args).await,
        Command::CauseList(args) => cause_list(&cfg, args).await,
        Command::ParseCauseList { html, list } => {
            let page = read_page(&html)?;
            let parsed = extract_cause_list(&page)?;
            finish_cause_list(&cfg, &list, None, &parsed)
        }
        Command::ParseCaseStatus { html, case } => {
            let page = read_page(&html)?;
            let details = parse_case_details(&page);
            finish_case(&cfg, &case, &details, page)
        }
        Command::History { json, action } => {
            let history = History::open(&cfg.data_dir)?;
            match action {
                Some(HistoryAction::Vacuum) => {
                    let merged = history.vacuum()?;
                    println!("Merged {} file(s).", merged);
                    Ok(())
                }
                None => print_history(&history, json),
            }
        }
        Command::CaseTypes => {
            for t in COMMON_CASE_TYPES {
                println!("{}", t);
            }
            Ok(())
        }
    }
}

fn read_page(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

async fn case_status(cfg: &Config, args: CaseArgs) -> Result<()> {
    let endpoints = cfg.endpoints()?;
    let client = Client::new();
    let mut session = WebDriverSession::connect(&client, &endpoints.webdriver).await?;

    let query = CaseStatusQuery {
        state: args.state,
        district: args.district,
        court_complex: args.court_complex,
        case_type: args.case.case_type.clone(),
        case_number: args.case.number.clone(),
        case_year: args.case.year,
    };
    println!(
        "Solve the CAPTCHA in the browser and press Go (waiting up to {}s).",
        cfg.result_timeout_secs
    );
    let mut steps = StepLog::default();
    let fetched =
        fetch_case_status(&mut session, &endpoints.ecourts, &query, &cfg.timings(), &mut steps).await;
    print_warnings(&steps);
    let fetched = fetched?;
    finish_case(cfg, &args.case, &fetched.details, fetched.raw_html)
}

async fn cause_list(cfg: &Config, args: CauseListArgs) -> Result<()> {
    let endpoints = cfg.endpoints()?;
    let client = Client::new();
    let mut session = WebDriverSession::connect(&client, &endpoints.webdriver).await?;

    if !DELHI_COURT_COMPLEXES
        .iter()
        .any(|c| c.eq_ignore_ascii_case(&args.list.court_complex))
    {
        println!(
            "Note: '{}' is not one of the known complexes ({}).",
            args.list.court_complex,
            DELHI_COURT_COMPLEXES.join(", ")
        );
    }

    let query = CauseListQuery {
        court_complex: args.list.court_complex.clone(),
        court: args.court.clone(),
        date: args.list.portal_date(),
        list_type: args.list.list_type.to_string(),
    };
    println!(
        "Complete the form, enter the CAPTCHA and press Submit within {}s.",
        cfg.manual_window_secs
    );
    let mut steps = StepLog::default();
    let fetched =
        fetch_cause_list(&mut session, &endpoints.cause_list, &query, &cfg.timings(), &mut steps).await;
    print_warnings(&steps);
    let fetched = fetched?;
    finish_cause_list(cfg, &args.list, args.court.as_deref(), &fetched.cause_list)
}

/// Record the lookup and write its report.
fn finish_case(cfg: &Config, case: &CaseIdArgs, details: &CaseDetails, raw_html: String) -> Result<()> {
    let history = History::open(&cfg.data_dir)?;
    history.save_case_query(&CaseQueryRow::new(
        &case.case_type,
        &case.number,
        case.year,
        details,
        raw_html,
        Utc::now(),
    ))?;

    let report = Report::case_details(details, &case.meta(), Local::now().naive_local());
    let stem = report::case_file_stem(&case.case_type, &case.number, case.year);
    let out = report::export(&report, &cfg.export_dir, &stem)?;

    for (label, value) in details.fields() {
        println!("{:<12} {}", label, value);
    }
    println!("CSV: {}\nPDF: {}", out.csv.display(), out.pdf.display());
    Ok(())
}

/// Record the cause list query, write its report and show the breakdown.
fn finish_cause_list(
    cfg: &Config,
    list: &ListArgs,
    court: Option<&str>,
    parsed: &CauseList,
) -> Result<()> {
    let meta = list.meta();
    let history = History::open(&cfg.data_dir)?;
    history.save_cause_list_query(&CauseListQueryRow::new(
        &meta.court_complex,
        court,
        &meta.date,
        &meta.list_type,
        parsed.rows.len() as u64,
        Utc::now(),
    ))?;

    let report = Report::cause_list(parsed, &meta, Local::now().naive_local());
    let stem = report::cause_list_file_stem(&meta.court_complex, &meta.date, &meta.list_type);
    let out = report::export(&report, &cfg.export_dir, &stem)?;

    println!("Extracted {} case(s).", parsed.rows.len());
    for (section, n) in parsed.section_counts() {
        println!("  {}: {} cases", section, n);
    }
    println!("CSV: {}\nPDF: {}", out.csv.display(), out.pdf.display());
    Ok(())
}

fn print_warnings(steps: &StepLog) {
    if steps.is_empty() {
        return;
    }
    println!("Some steps need attention:");
    for w in steps.warnings() {
        println!("  - {}", w);
    }
}

#[derive(Serialize)]
struct HistoryDump {
    case_queries: Vec<CaseQueryRow>,
    cause_list_queries: Vec<CauseListQueryRow>,
}

fn print_history(history: &History, json: bool) -> Result<()> {
    let dump = HistoryDump {
        case_queries: history.case_queries.list()?,
        cause_list_queries: history.cause_list_queries.list()?,
    };
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&dump).context("serialising history")?
        );
        return Ok(());
    }

    println!("Case queries ({})", dump.case_queries.len());
    for q in &dump.case_queries {
        println!(
            "  {}  {} {}/{}  {}  {}",
            q.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            q.case_type,
            q.case_number,
            q.case_year,
            q.case_status,
            q.parties
        );
    }
    println!("Cause list queries ({})", dump.cause_list_queries.len());
    for q in &dump.cause_list_queries {
        println!(
            "  {}  {}  {}  {}  {}  {} cases",
            q.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            q.court_complex,
            q.court_number,
            q.list_date,
            q.list_type,
            q.total_cases
        );
    }
    Ok(())
}
