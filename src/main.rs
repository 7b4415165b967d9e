// Entry point and high-level CLI flow.
//
// Batch mode (the default) loads the sales table, applies the selection and
// costs from the config file and flags, writes every report and prints a
// preview. `--interactive` opens a menu where the file, the selection and
// the channel costs can be changed and the reports regenerated without
// restarting.
mod cache;
mod config;
mod derive;
mod error;
mod format;
mod loader;
mod output;
mod pipeline;
mod reports;
mod transform;
mod types;
mod util;

use anyhow::{bail, Context, Result};
use cache::LoadCache;
use clap::Parser;
use config::{Overrides, ReportConfig};
use loader::{LoadReport, SourceKind};
use once_cell::sync::Lazy;
use pipeline::Selection;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use types::{CostInput, DerivedRecord};

const PREVIEW_ROWS: usize = 10;

#[derive(Parser, Debug)]
#[command(author, version, about = "TV channel revenue and MER report", long_about = None)]
struct Cli {
    /// Sales placement export (.xlsx, .xlsm, .xlsb, .xls, .ods or .csv)
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// TOML file with selection, costs and slot columns
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Worksheet name (defaults to the first sheet)
    #[arg(long)]
    sheet: Option<String>,
    /// Read slash dates as day/month/year
    #[arg(long)]
    day_first: bool,
    /// Product line to report on (defaults to the first one in the file)
    #[arg(long)]
    category: Option<String>,
    /// Month to include; repeat for several (defaults to all months)
    #[arg(long = "month")]
    months: Vec<String>,
    /// Channel cost as CHANNEL=AMOUNT; repeat for several channels
    #[arg(long = "cost")]
    costs: Vec<String>,
    /// Directory for the CSV and JSON outputs
    #[arg(short, long)]
    out_dir: Option<PathBuf>,
    /// Open the interactive menu instead of running once
    #[arg(long)]
    interactive: bool,
}

// In-memory app state for interactive mode so the file is parsed once while
// the selection and costs change between report runs.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState::default()));

#[derive(Default)]
struct AppState {
    config: ReportConfig,
    cache: LoadCache,
    data: Option<Arc<Vec<DerivedRecord>>>,
    selection: Option<Selection>,
    costs: CostInput,
}

fn state() -> MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> String {
    read_line("Enter choice: ")
}

/// Ask whether to go back to the menu after generating reports.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        let resp = read_line("Back to menu (Y/N): ").to_uppercase();
        match resp.as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Selection from the config, falling back to the first product and every
/// month present in the data.
fn resolve_selection(config: &ReportConfig, data: &[DerivedRecord]) -> Option<Selection> {
    let mut selection = Selection::default_for(data)?;
    if let Some(category) = &config.category {
        selection.category = category.clone();
    }
    if let Some(months) = &config.months {
        selection.months = months.iter().cloned().collect();
    }
    Some(selection)
}

fn print_load_notes(report: &LoadReport) {
    println!(
        "Processing dataset... ({} of {} rows loaded)",
        util::format_int(report.loaded_rows),
        util::format_int(report.total_rows)
    );
    if report.blank_rows > 0 {
        println!(
            "Note: {} blank rows skipped.",
            util::format_int(report.blank_rows)
        );
    }
    if report.unparsed_revenue > 0 {
        println!(
            "Note: {} revenue cells could not be read as numbers and were left empty.",
            util::format_int(report.unparsed_revenue)
        );
    }
}

fn run_batch(config: ReportConfig) -> Result<()> {
    let Some(input) = config.input.clone() else {
        bail!("no input file given; pass --input or set `input` in the config file");
    };
    let opts = config.load_options()?;
    let (data, load_report) = loader::load_and_derive(&input, &opts)
        .with_context(|| format!("failed to load {}", input.display()))?;
    print_load_notes(&load_report);

    let Some(selection) = resolve_selection(&config, &data) else {
        println!("The file has no data rows; nothing to report.");
        return Ok(());
    };
    let costs = config.cost_input()?;
    let report = pipeline::run(&data, &selection, &costs);

    let out_dir = config.output_dir();
    output::write_reports(&out_dir, &report)?;
    println!("\nProduct: {}\n", selection.category);
    output::preview_report(&report, PREVIEW_ROWS);
    println!("(Full tables exported to {})", out_dir.display());
    Ok(())
}

/// Menu option [1]: load (or reload) the sales file.
fn handle_load() {
    let mut st = state();
    let path = match st.config.input.clone() {
        Some(p) => {
            let entered = read_line(&format!("File path [{}]: ", p.display()));
            if entered.is_empty() {
                p
            } else {
                PathBuf::from(entered)
            }
        }
        None => PathBuf::from(read_line("File path: ")),
    };

    let opts = match st.config.load_options() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Invalid configuration: {}\n", e);
            return;
        }
    };
    let loaded = SourceKind::from_path(&path).and_then(|kind| {
        let bytes = loader::read_source(&path)?;
        st.cache.get_or_load(&bytes, kind, &opts)
    });
    match loaded {
        Ok(loaded) => {
            print_load_notes(&loaded.report);
            println!();
            st.selection = resolve_selection(&st.config, &loaded.records);
            st.config.input = Some(path);
            st.data = Some(loaded.records);
        }
        Err(e) => eprintln!("Failed to load file: {}\n", e),
    }
}

fn parse_indices(input: &str, max: usize) -> Option<Vec<usize>> {
    input
        .split(',')
        .map(|s| match s.trim().parse::<usize>() {
            Ok(n) if (1..=max).contains(&n) => Some(n - 1),
            _ => None,
        })
        .collect()
}

/// Menu option [2]: choose the product line and months.
fn handle_select() {
    let mut st = state();
    let Some(data) = st.data.clone() else {
        println!("Error: No data loaded. Please load the file first (option 1).\n");
        return;
    };

    let products = loader::products(&data);
    if products.is_empty() {
        println!("The file has no data rows.\n");
        return;
    }
    println!("Products:");
    for (i, p) in products.iter().enumerate() {
        println!("[{}] {}", i + 1, p);
    }
    let category = loop {
        match parse_indices(&read_choice(), products.len()).as_deref() {
            Some([idx]) => break products[*idx].clone(),
            _ => println!("Invalid choice. Please enter a number from the list."),
        }
    };

    let months = loader::months(&data);
    println!("\nMonths:");
    for (i, m) in months.iter().enumerate() {
        println!("[{}] {}", i + 1, m);
    }
    let chosen: Vec<String> = loop {
        let input = read_line("Months (comma separated, blank for all, 'none' for none): ");
        if input.is_empty() {
            break months.clone();
        }
        if input.eq_ignore_ascii_case("none") {
            break Vec::new();
        }
        match parse_indices(&input, months.len()) {
            Some(idx) => break idx.into_iter().map(|i| months[i].clone()).collect(),
            None => println!("Invalid choice. Use numbers from the list."),
        }
    };
    if chosen.is_empty() {
        warn!("no months selected; reports will be empty");
    }
    println!();
    st.selection = Some(Selection::new(category, chosen));
}

/// Menu option [3]: enter a cost for each channel in the current selection.
fn handle_costs() {
    let mut st = state();
    let (Some(data), Some(selection)) = (st.data.clone(), st.selection.clone()) else {
        println!("Error: No data loaded. Please load the file first (option 1).\n");
        return;
    };
    let report = pipeline::run(&data, &selection, &st.costs);
    if report.is_empty() {
        println!("No channels in the current selection.\n");
        return;
    }

    println!("Enter cost for each channel (blank keeps the current value):");
    let channels: Vec<String> = report.channels().map(str::to_string).collect();
    for channel in channels {
        loop {
            let current = st.costs.cost_for(&channel);
            let input = read_line(&format!(
                "Cost for {} [{}]: ",
                channel,
                util::format_currency(current)
            ));
            if input.is_empty() {
                break;
            }
            match util::parse_f64_safe(Some(&input)) {
                Some(cost) => match st.costs.set(channel.clone(), cost) {
                    Ok(()) => break,
                    Err(e) => println!("{}", e),
                },
                None => println!("Please enter a number."),
            }
        }
    }
    println!();
}

/// Menu option [4]: run the pipeline, preview and export.
fn handle_generate_reports() {
    let st = state();
    let (Some(data), Some(selection)) = (st.data.clone(), st.selection.clone()) else {
        println!("Error: No data loaded. Please load the file first (option 1).\n");
        return;
    };

    println!("Generating reports for {}...\n", selection.category);
    let report = pipeline::run(&data, &selection, &st.costs);
    output::preview_report(&report, PREVIEW_ROWS);

    let out_dir = st.config.output_dir();
    match output::write_reports(&out_dir, &report) {
        Ok(_) => println!("(Full tables exported to {})\n", out_dir.display()),
        Err(e) => eprintln!("Write error: {}", e),
    }
}

fn run_interactive(config: ReportConfig) -> Result<()> {
    {
        let mut st = state();
        st.costs = config.cost_input()?;
        st.config = config;
    }
    loop {
        println!("TV Channel Revenue Report");
        println!("[1] Load the file");
        println!("[2] Select product and months");
        println!("[3] Enter channel costs");
        println!("[4] Generate reports\n");
        match read_choice().as_str() {
            "1" => handle_load(),
            "2" => handle_select(),
            "3" => handle_costs(),
            "4" => {
                handle_generate_reports();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => println!("Invalid choice. Please enter 1 to 4.\n"),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ReportConfig::from_path(path)?,
        None => ReportConfig::default(),
    };
    config.apply(Overrides {
        input: cli.input,
        sheet: cli.sheet,
        day_first: cli.day_first,
        category: cli.category,
        months: cli.months,
        costs: cli.costs,
        output_dir: cli.out_dir,
    })?;

    if cli.interactive {
        info!("starting interactive session");
        run_interactive(config)
    } else {
        run_batch(config)
    }
}
