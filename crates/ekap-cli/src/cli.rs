use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use ekap_calc::{
    calculate_price_diff, calculate_threshold_with, renumber_rows, weighted_average, Bid,
    BidStatus, PercentageCostRow, PriceDiffInput, StdDevDivisor, ThresholdOptions,
};
use ekap_document::{
    apply_price_updates, match_price_rows, mutate_item_price, open_document, save_document,
    schema, EkapDocument, EkapItem, MatchField, MatchResult, TenderInfo,
};
use ekap_number::{amount_to_words, format_money, parse_strict};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;

use crate::fs::atomic_write_bytes;
use crate::history::{self, HistoryEntry, HistoryStore, JsonFileHistory};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MatchArg {
    /// Item sequence number (SiraNo).
    Seq,
    /// Work-item number (IsKalemiNo).
    WorkItem,
}

impl From<MatchArg> for MatchField {
    fn from(value: MatchArg) -> Self {
        match value {
            MatchArg::Seq => MatchField::SequenceNo,
            MatchArg::WorkItem => MatchField::WorkItemNo,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "ekap",
    about = "Open, price and save EKAP bid files, and run tender calculations."
)]
pub struct Args {
    #[command(subcommand)]
    command: Command,

    /// Password of the bid file.
    #[arg(long, global = true)]
    password: Option<String>,

    /// Read the password from a file (trailing newlines are trimmed).
    #[arg(long, value_name = "PATH", conflicts_with = "password", global = true)]
    password_file: Option<PathBuf>,

    /// Recent-file history location (default: the platform data directory).
    #[arg(long, value_name = "PATH", global = true)]
    history: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// More log output on stderr (repeatable).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// No log output.
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print the tender, its items and the bid total.
    Show { file: PathBuf },

    /// Set the unit price of one item and save the result.
    SetPrice {
        input: PathBuf,
        output: PathBuf,
        /// 1-based item position.
        #[arg(long)]
        item: usize,
        /// New unit price, e.g. `1.234,56`.
        #[arg(long, allow_hyphen_values = true)]
        price: String,
    },

    /// Update prices from a JSON grid of spreadsheet rows (first row is a header).
    ImportPrices {
        input: PathBuf,
        output: PathBuf,
        /// JSON array of rows, each an array of cells.
        #[arg(long, value_name = "PATH")]
        rows: PathBuf,
        /// Item field the key column is compared against.
        #[arg(long = "match", value_enum, default_value_t = MatchArg::Seq)]
        match_field: MatchArg,
        /// 0-based column holding the key.
        #[arg(long, default_value_t = 0)]
        key_col: usize,
        /// 0-based column holding the price.
        #[arg(long, default_value_t = 1)]
        price_col: usize,
    },

    /// Abnormally-low-bid threshold (sınır değer) from a JSON bid list.
    Threshold {
        #[arg(long, value_name = "PATH")]
        input: PathBuf,
        /// Divide the standard deviation by n instead of n - 1.
        #[arg(long)]
        population_std_dev: bool,
    },

    /// Price-index adjustment (fiyat farkı) from JSON coefficients and indices.
    PriceDiff {
        #[arg(long, value_name = "PATH")]
        input: PathBuf,
    },

    /// Percentage-based cost estimate from JSON rows.
    Percentage {
        #[arg(long, value_name = "PATH")]
        input: PathBuf,
    },

    /// List recently opened bid files.
    History,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    run_with_args(args)
}

pub fn run_with_args(args: Args) -> Result<()> {
    init_logging(args.verbose, args.quiet);

    let password = if let Some(path) = args.password_file.as_deref() {
        let value = std::fs::read_to_string(path)
            .with_context(|| format!("read password file {}", path.display()))?;
        Some(value.trim_end_matches(&['\r', '\n'][..]).to_string())
    } else {
        args.password.clone()
    };

    let history = args
        .history
        .clone()
        .map(JsonFileHistory::new)
        .or_else(JsonFileHistory::default_location);

    let mut session = Session {
        format: args.format,
        password,
        history,
    };

    match args.command {
        Command::Show { file } => session.show(&file),
        Command::SetPrice {
            input,
            output,
            item,
            price,
        } => session.set_price(&input, &output, item, &price),
        Command::ImportPrices {
            input,
            output,
            rows,
            match_field,
            key_col,
            price_col,
        } => session.import_prices(&input, &output, &rows, match_field.into(), key_col, price_col),
        Command::Threshold {
            input,
            population_std_dev,
        } => session.threshold(&input, population_std_dev),
        Command::PriceDiff { input } => session.price_diff(&input),
        Command::Percentage { input } => session.percentage(&input),
        Command::History => session.list_history(),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    // Also routes `log` records from the library crates.
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

struct Session {
    format: OutputFormat,
    password: Option<String>,
    history: Option<JsonFileHistory>,
}

#[derive(Debug, Serialize)]
struct JsonShow<'a> {
    path: String,
    tender: &'a TenderInfo,
    registration_number: String,
    total: Decimal,
    total_in_words: String,
    items: &'a [EkapItem],
}

#[derive(Debug, Serialize)]
struct JsonSetPrice {
    item: usize,
    previous_price: Decimal,
    price: Decimal,
    total: Decimal,
    tender_total: Decimal,
}

#[derive(Debug, Serialize)]
struct JsonImport<'a> {
    #[serde(flatten)]
    result: &'a MatchResult,
    tender_total: Decimal,
}

#[derive(Debug, Deserialize)]
struct ThresholdInput {
    estimated_cost: Decimal,
    #[serde(default = "default_n")]
    n: Decimal,
    bids: Vec<Bid>,
}

fn default_n() -> Decimal {
    Decimal::ONE
}

#[derive(Debug, Serialize)]
struct JsonPercentage<'a> {
    rows: &'a [PercentageCostRow],
    weighted_average: Decimal,
}

impl Session {
    fn password(&self) -> Result<&str> {
        self.password
            .as_deref()
            .context("a password is required (use --password or --password-file)")
    }

    fn open(&mut self, path: &Path) -> Result<EkapDocument> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read bid file {}", path.display()))?;
        let document = open_document(&bytes, self.password()?)
            .with_context(|| format!("open bid file {}", path.display()))?;
        self.remember(path, bytes.len() as u64);
        Ok(document)
    }

    fn remember(&mut self, path: &Path, size: u64) {
        let Some(store) = self.history.as_mut() else {
            log::debug!("no history location; not recording {}", path.display());
            return;
        };
        let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if let Err(err) = history::record(&mut *store, HistoryEntry::for_path(&path, size)) {
            log::warn!("failed to update history {}: {err}", store.path().display());
        }
    }

    fn save(&self, document: &EkapDocument, path: &Path) -> Result<()> {
        let bytes = save_document(document, self.password()?).context("serialize bid file")?;
        atomic_write_bytes(path, &bytes).with_context(|| format!("write {}", path.display()))?;
        log::info!("wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    fn show(&mut self, path: &Path) -> Result<()> {
        let document = self.open(path)?;
        let tender = document.tender();
        let currency = document
            .items()
            .first()
            .map(|item| item.currency.as_str())
            .filter(|c| !c.is_empty())
            .unwrap_or(schema::DEFAULT_CURRENCY);
        let total_in_words = amount_to_words(document.total(), currency);

        match self.format {
            OutputFormat::Text => {
                println!("Tender: {} {}", tender.registration_number(), tender.title);
                if !tender.deadline.is_empty() {
                    println!("  deadline: {}", tender.deadline);
                }
                println!("  items: {}", document.items().len());
                println!();
                for item in document.items() {
                    println!(
                        "{:>4}  [{}] {} {}",
                        item.index, item.sequence_no, item.work_item_no, item.name
                    );
                    println!(
                        "      {} {} x {} = {} {}",
                        item.quantity_text,
                        item.unit,
                        format_money(item.price),
                        format_money(item.total),
                        item.currency
                    );
                }
                println!();
                println!("Total: {} {currency}", format_money(document.total()));
                println!("  {total_in_words}");
                Ok(())
            }
            OutputFormat::Json => print_json(&JsonShow {
                path: path.to_string_lossy().into_owned(),
                tender,
                registration_number: tender.registration_number(),
                total: document.total(),
                total_in_words,
                items: document.items(),
            }),
        }
    }

    fn set_price(&mut self, input: &Path, output: &Path, item: usize, price: &str) -> Result<()> {
        let price = parse_strict(price).with_context(|| format!("invalid price '{price}'"))?;
        let document = self.open(input)?;
        let Some(previous) = document.item(item) else {
            anyhow::bail!(
                "{} has no item {item} (items are numbered 1 to {})",
                input.display(),
                document.items().len()
            );
        };
        let previous_price = previous.price;

        let updated = mutate_item_price(&document, item, price);
        self.save(&updated, output)?;

        let line_total = updated.item(item).map(|i| i.total).unwrap_or_default();
        match self.format {
            OutputFormat::Text => {
                println!(
                    "Item {item}: {} -> {} (line total {})",
                    format_money(previous_price),
                    format_money(price),
                    format_money(line_total)
                );
                println!("Tender total: {}", format_money(updated.total()));
                Ok(())
            }
            OutputFormat::Json => print_json(&JsonSetPrice {
                item,
                previous_price,
                price,
                total: line_total,
                tender_total: updated.total(),
            }),
        }
    }

    fn import_prices(
        &mut self,
        input: &Path,
        output: &Path,
        rows_path: &Path,
        match_field: MatchField,
        key_col: usize,
        price_col: usize,
    ) -> Result<()> {
        let cells: Vec<Vec<serde_json::Value>> = read_json(rows_path)?;
        let rows: Vec<Vec<String>> = cells
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect();

        let document = self.open(input)?;
        let result = match_price_rows(&rows, document.items(), match_field, key_col, price_col);
        let updated = apply_price_updates(&document, &result.updates);
        self.save(&updated, output)?;

        match self.format {
            OutputFormat::Text => {
                println!("Updated {} item(s)", result.updates.len());
                for update in &result.updates {
                    println!(
                        "  row {}: item {} [{}] {} -> {}",
                        update.row,
                        update.item_index,
                        update.sequence_no,
                        format_money(update.current_price),
                        format_money(update.new_price)
                    );
                }
                print_rows("Unmatched rows", &result.unmatched_rows);
                print_rows("Invalid price rows", &result.invalid_price_rows);
                print_rows("Duplicate key rows", &result.duplicate_key_rows);
                println!("Tender total: {}", format_money(updated.total()));
                Ok(())
            }
            OutputFormat::Json => print_json(&JsonImport {
                result: &result,
                tender_total: updated.total(),
            }),
        }
    }

    fn threshold(&self, input: &Path, population_std_dev: bool) -> Result<()> {
        let ThresholdInput {
            estimated_cost,
            n,
            bids,
        } = read_json(input)?;
        let options = ThresholdOptions {
            std_dev_divisor: if population_std_dev {
                StdDevDivisor::Population
            } else {
                StdDevDivisor::Sample
            },
        };
        let result = calculate_threshold_with(estimated_cost, n, &bids, options)
            .context("threshold calculation")?;

        match self.format {
            OutputFormat::Text => {
                let steps = &result.steps;
                println!(
                    "Valid range: {} - {}",
                    format_money(steps.lower_bound),
                    format_money(steps.upper_bound)
                );
                println!("Tort1: {}", format_money(steps.tort1));
                println!("Std dev: {}", format_money(steps.std_dev));
                println!("Tort2: {}", format_money(steps.tort2));
                println!("C: {}  K: {}  N: {}", steps.c.round_dp(3), steps.k, steps.n);
                println!("Threshold: {}", format_money(result.threshold_value));
                println!();
                for bid in &result.bids {
                    let status = match bid.status {
                        BidStatus::Normal => "normal",
                        BidStatus::Low => "low",
                        BidStatus::Excluded => "excluded",
                    };
                    println!(
                        "  {:<9} {:>18}  {:>7}%  {}",
                        status,
                        format_money(bid.amount),
                        bid.discount.round_dp(2),
                        bid.name
                    );
                }
                println!();
                println!("Winner: {}", result.winner.as_deref().unwrap_or("(none)"));
                Ok(())
            }
            OutputFormat::Json => print_json(&result),
        }
    }

    fn price_diff(&self, input: &Path) -> Result<()> {
        let input: PriceDiffInput = read_json(input)?;
        let result = calculate_price_diff(&input).context("price difference calculation")?;
        match self.format {
            OutputFormat::Text => {
                println!("Pn: {}", result.pn.round_dp(6));
                println!("B: {}", result.b);
                println!("F: {}", format_money(result.f));
                Ok(())
            }
            OutputFormat::Json => print_json(&result),
        }
    }

    fn percentage(&self, input: &Path) -> Result<()> {
        let mut rows: Vec<PercentageCostRow> = read_json(input)?;
        for row in &mut rows {
            row.recompute();
        }
        renumber_rows(&mut rows);
        let average = weighted_average(&rows);

        match self.format {
            OutputFormat::Text => {
                for row in &rows {
                    println!(
                        "{:>4}  {:<12} {:>18}  {:>6}%  {:>18}  {}",
                        row.row_number,
                        row.work_item_no,
                        format_money(row.total),
                        row.effective_percentage,
                        format_money(row.estimated_cost),
                        row.description
                    );
                }
                println!();
                println!("Weighted average: {}", format_money(average));
                Ok(())
            }
            OutputFormat::Json => print_json(&JsonPercentage {
                rows: &rows,
                weighted_average: average,
            }),
        }
    }

    fn list_history(&self) -> Result<()> {
        let entries = match &self.history {
            Some(store) => store
                .load()
                .with_context(|| format!("read history {}", store.path().display()))?,
            None => Vec::new(),
        };
        match self.format {
            OutputFormat::Text => {
                if entries.is_empty() {
                    println!("No recent files.");
                }
                for entry in &entries {
                    println!(
                        "{:>12}  {:>10}  {}",
                        entry.last_opened, entry.size, entry.path
                    );
                }
                Ok(())
            }
            OutputFormat::Json => print_json(&entries),
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse JSON in {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer(&mut handle, value)?;
    handle.write_all(b"\n")?;
    Ok(())
}

fn print_rows(label: &str, rows: &[usize]) {
    if rows.is_empty() {
        return;
    }
    let list: Vec<String> = rows.iter().map(|r| r.to_string()).collect();
    println!("{label}: {}", list.join(", "));
}

/// Spreadsheet exports may carry numbers and blanks as JSON scalars.
fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
