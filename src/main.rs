// Entry point and high-level CLI flow.
//
// - Option [1] loads the workbook and lists what it found.
// - Option [2] asks for a month (or All), builds the report for every
//   configured fiscal year, prints them side by side and writes exports.
// - After a report the user can go back to the menu or exit.
// - With `--month` the same report runs once without any prompts.
mod allocation;
mod charts;
mod config;
mod error;
mod loader;
mod metrics;
mod months;
mod output;
mod reports;
mod types;
mod util;

use anyhow::Context;
use clap::Parser;
use config::ReportConfig;
use loader::Workbook;
use months::{FiscalYear, Window};
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use types::ReportStatus;

#[derive(Parser)]
#[command(name = "profitability-report")]
#[command(
    version,
    about = "Domain-wise profitability report from the finance workbook",
    long_about = None
)]
struct Cli {
    /// Workbook to read
    #[arg(short, long, default_value = "Profitability_CEOITBOX.xlsx")]
    workbook: PathBuf,

    /// JSON file overriding the workbook layout
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run once for this window (All, April, ..., March) instead of the menu
    #[arg(short, long, value_parser = parse_window)]
    month: Option<Window>,

    /// Report a single fiscal year (e.g. 2025-26) instead of every configured one
    #[arg(short, long, value_parser = parse_fiscal_year)]
    fiscal_year: Option<FiscalYear>,

    /// Directory for CSV and JSON exports
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_window(s: &str) -> Result<Window, String> {
    Window::parse(s).ok_or_else(|| format!("'{}' is not All or a month name", s))
}

fn parse_fiscal_year(s: &str) -> Result<FiscalYear, String> {
    FiscalYear::parse(s).ok_or_else(|| format!("'{}' is not a fiscal year like 2025-26", s))
}

// The workbook is read once and shared by every report generated in this run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { workbook: None }));

struct AppState {
    workbook: Option<Arc<Workbook>>,
}

fn cached_workbook() -> Option<Arc<Workbook>> {
    let state = APP_STATE.lock().unwrap_or_else(|e| e.into_inner());
    state.workbook.clone()
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to menu (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).ok();
        let resp = buf.trim().to_uppercase();
        match resp.as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Month selector: `[0] All`, then the fiscal months in order. Accepts the
/// number or the name.
fn prompt_window() -> Window {
    let options = Window::options();
    loop {
        println!("Select Month:");
        for (i, w) in options.iter().enumerate() {
            println!("[{}] {}", i, w);
        }
        let choice = read_choice();
        let picked = choice
            .parse::<usize>()
            .ok()
            .and_then(|i| options.get(i).copied())
            .or_else(|| Window::parse(&choice));
        match picked {
            Some(w) => return w,
            None => println!("Invalid choice. Please pick a listed month.\n"),
        }
    }
}

/// Handle option [1]: read the workbook and cache it.
fn handle_load(path: &Path) -> anyhow::Result<Arc<Workbook>> {
    let workbook = Workbook::open(path)
        .with_context(|| format!("failed to load workbook {}", path.display()))?;
    let names = workbook.sheet_names();
    println!("Loaded {} ({} sheets)", path.display(), names.len());
    for name in names {
        println!("  - {}", name);
    }
    println!();
    let workbook = Arc::new(workbook);
    let mut state = APP_STATE.lock().unwrap_or_else(|e| e.into_inner());
    state.workbook = Some(Arc::clone(&workbook));
    Ok(workbook)
}

/// Handle option [2]: one report per configured fiscal year, printed and
/// exported.
fn handle_generate(
    workbook: &Workbook,
    config: &ReportConfig,
    fiscal_year: Option<FiscalYear>,
    window: Window,
    out_dir: &Path,
) -> anyhow::Result<()> {
    let reports = match fiscal_year {
        Some(fy) => vec![reports::generate_report(workbook, config, fy, window)?],
        None => reports::generate_comparison(workbook, config, window)?,
    };
    for report in &reports {
        output::print_report(report);
        let (csv_path, json_path) = output::export_report(out_dir, report)
            .with_context(|| format!("failed to write exports to {}", out_dir.display()))?;
        println!("(Exported to {} and {})", csv_path.display(), json_path.display());
        if report.status == ReportStatus::Degraded {
            println!("Some rows were zeroed or skipped; see the warnings above.");
        }
        println!();
    }
    info!(window = %window, reports = reports.len(), "reports generated");
    Ok(())
}

fn run_menu(cli: &Cli, config: &ReportConfig) {
    loop {
        println!("Profitability Report");
        println!("[1] Load the workbook");
        println!("[2] Generate report\n");
        match read_choice().as_str() {
            "1" => {
                if let Err(e) = handle_load(&cli.workbook) {
                    error!("{:#}", e);
                    eprintln!("Failed to load file: {:#}\n", e);
                }
            }
            "2" => {
                let Some(workbook) = cached_workbook() else {
                    println!("Error: No workbook loaded. Please load it first (option 1).\n");
                    continue;
                };
                let window = prompt_window();
                println!();
                let result =
                    handle_generate(&workbook, config, cli.fiscal_year, window, &cli.out_dir);
                if let Err(e) = result {
                    error!("{:#}", e);
                    eprintln!("Error: {:#}\n", e);
                }
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => ReportConfig::load(path)
            .with_context(|| format!("invalid config {}", path.display()))?,
        None => ReportConfig::default(),
    };

    match cli.month {
        Some(window) => {
            let workbook = handle_load(&cli.workbook)?;
            handle_generate(&workbook, &config, cli.fiscal_year, window, &cli.out_dir)
        }
        None => {
            run_menu(&cli, &config);
            Ok(())
        }
    }
}
