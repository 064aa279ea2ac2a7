use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use gramreport::aggregate::ResultLimit;
use gramreport::csv_reader;
use gramreport::data::Table;
use gramreport::geometry::ChartKind;
use gramreport::mappings::{ChartMappings, JsonFileStore, MappingRecord, MappingStore};
use gramreport::report::Report;
use gramreport::runtime;
use gramreport::schema::{self, numeric_columns};
use gramreport::stats::ColumnStats;
use gramreport::{OutputFormat, RenderOptions};
use log::info;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gramreport")]
#[command(about = "Aggregate CSV data into bar, pie, area and treemap charts and HTML reports", long_about = None)]
struct Args {
    /// Input file (reads stdin when omitted)
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,

    /// Treat the input as a JSON array of objects instead of CSV
    #[arg(long, global = true)]
    json: bool,

    /// JSON file holding saved chart mappings
    #[arg(short, long, global = true)]
    mappings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify columns as numeric and/or date-like
    Inspect {
        /// Only list columns whose name contains this text (case-insensitive)
        #[arg(long)]
        search: Option<String>,
    },
    /// Print the aggregated series of one chart as JSON
    Series {
        kind: ChartKind,
        /// Positive integer or "all" (defaults to the chart's live limit)
        #[arg(long)]
        limit: Option<ResultLimit>,
    },
    /// Render one chart as SVG or PNG
    Render {
        kind: ChartKind,
        #[arg(long, default_value = "svg")]
        format: OutputFormat,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        #[arg(long)]
        limit: Option<ResultLimit>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write the HTML report with all four charts
    Report {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Re-serialize the loaded table as CSV
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Summary statistics of one numeric column
    Stats {
        /// Column to review (defaults to the saved review field)
        field: Option<String>,
    },
    /// Inspect or edit saved mappings
    Mappings {
        #[command(subcommand)]
        action: MappingsAction,
    },
}

#[derive(Subcommand, Debug)]
enum MappingsAction {
    /// Print the stored record
    Show,
    /// Print mappings resolved against the input table
    Resolve,
    /// Store one key, e.g. `set barAgg avg` or `set topN all`
    Set { key: String, value: String },
    /// Resolve against the input table and store every key
    Save,
    /// Remove all stored mappings
    Reset,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let store = args.mappings.as_ref().map(JsonFileStore::new);

    match &args.command {
        Command::Inspect { search } => {
            let table = load_table(&args)?;
            let mut columns = schema::inspect(&table);
            if let Some(query) = search {
                let keep = schema::filter_headers(&table.headers, query);
                columns.retain(|c| keep.contains(&c.name.as_str()));
            }
            write_json(&columns)
        }
        Command::Series { kind, limit } => {
            let table = load_table(&args)?;
            let mappings = resolve_mappings(store.as_ref(), &table)?;
            let limit = limit.unwrap_or_else(|| mappings.live_limit(*kind));
            write_json(&runtime::chart_series(&table, &mappings, *kind, limit))
        }
        Command::Render { kind, format, width, height, limit, output } => {
            let table = load_table(&args)?;
            let mappings = resolve_mappings(store.as_ref(), &table)?;
            let limit = limit.unwrap_or_else(|| mappings.live_limit(*kind));
            let options = RenderOptions {
                width: *width,
                height: *height,
                format: *format,
            };
            let bytes = runtime::render_chart(&table, &mappings, *kind, limit, &options)
                .with_context(|| format!("Failed to render {} chart", kind))?;
            write_output(output.as_ref(), &bytes)
        }
        Command::Report { output } => {
            let table = load_table(&args)?;
            let mappings = resolve_mappings(store.as_ref(), &table)?;
            let report = Report::assemble(&table, &mappings, Local::now());
            write_output(output.as_ref(), report.to_html().as_bytes())
        }
        Command::Export { output } => {
            let table = load_table(&args)?;
            let csv = csv_reader::to_csv_string(&table)?;
            write_output(output.as_ref(), csv.as_bytes())
        }
        Command::Stats { field } => {
            let table = load_table(&args)?;
            let field = match field {
                Some(field) => field.clone(),
                None => resolve_mappings(store.as_ref(), &table)?
                    .review_field
                    .context("No review field: pass a column name")?,
            };
            let stats = ColumnStats::from_column(&table, &field)
                .with_context(|| format!("Column '{}' not found", field))?;
            write_json(&stats)
        }
        Command::Mappings { action } => run_mappings(action, store.as_ref(), &args),
    }
}

fn run_mappings(action: &MappingsAction, store: Option<&JsonFileStore>, args: &Args) -> Result<()> {
    match action {
        MappingsAction::Show => {
            let record = match store {
                Some(store) => store.load()?,
                None => MappingRecord::default(),
            };
            write_json(&record)
        }
        MappingsAction::Resolve => {
            let table = load_table(args)?;
            write_json(&resolve_mappings(store, &table)?)
        }
        MappingsAction::Set { key, value } => {
            let store = require_store(store)?;
            let record = store.set_key_text(key, value)?;
            info!("Stored '{}' in '{}'", key, store.path().display());
            write_json(&record)
        }
        MappingsAction::Save => {
            let store = require_store(store)?;
            let table = load_table(args)?;
            let mappings = resolve_mappings(Some(store), &table)?;
            store.save(&mappings.to_record())?;
            info!("Saved mappings to '{}'", store.path().display());
            Ok(())
        }
        MappingsAction::Reset => {
            let store = require_store(store)?;
            store.clear()?;
            info!("Cleared mappings in '{}'", store.path().display());
            Ok(())
        }
    }
}

fn require_store(store: Option<&JsonFileStore>) -> Result<&JsonFileStore> {
    store.context("This command needs a mappings file (--mappings <PATH>)")
}

fn load_table(args: &Args) -> Result<Table> {
    let table = if args.json {
        let text = match &args.input {
            Some(path) => fs::read_to_string(path)
                .with_context(|| format!("Failed to read '{}'", path.display()))?,
            None => {
                let mut text = String::new();
                io::stdin()
                    .read_to_string(&mut text)
                    .context("Failed to read JSON from stdin")?;
                text
            }
        };
        let value: serde_json::Value = serde_json::from_str(&text).context("Input is not valid JSON")?;
        Table::from_json(&value)?
    } else {
        match &args.input {
            Some(path) => csv_reader::read_csv_from_path(path)?,
            None => csv_reader::read_csv_from_stdin().context("Failed to read CSV from stdin")?,
        }
    };

    info!("Loaded {} rows x {} columns", table.len(), table.headers.len());
    Ok(table)
}

fn resolve_mappings(store: Option<&JsonFileStore>, table: &Table) -> Result<ChartMappings> {
    let record = match store {
        Some(store) => store.load()?,
        None => MappingRecord::default(),
    };
    Ok(record.resolve(&table.headers, &numeric_columns(table)))
}

fn write_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let mut text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    text.push('\n');
    write_output(None, text.as_bytes())
}

fn write_output(path: Option<&PathBuf>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) => fs::write(path, bytes)
            .with_context(|| format!("Failed to write '{}'", path.display())),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(bytes).context("Failed to write to stdout")?;
            handle.flush().context("Failed to flush stdout")?;
            Ok(())
        }
    }
}
