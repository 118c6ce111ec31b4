//! Grid Merge CLI
//!
//! Command-line tool for inspecting spreadsheet files and merging their sheets
//! into a single exported table.

use clap::{Parser, Subcommand};
use gm_core::{
    discover_inputs, load_path, CellValue, ExportFormat, MergePlan, Session, Settings, UnifiedTable,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gm-cli")]
#[command(about = "Merge sheets from multiple spreadsheet files", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the sheets of a file with their leading rows
    Inspect {
        /// Path to a CSV or workbook file
        #[arg(short, long)]
        file: PathBuf,

        /// Number of rows to show per sheet
        #[arg(short, long, default_value_t = 10)]
        rows: usize,
    },

    /// Write a plan file listing every sheet of the inputs with default settings
    CreatePlan {
        /// Input files or directories
        #[arg(short, long, required = true)]
        input: Vec<PathBuf>,

        /// Output path for the plan file
        #[arg(short, long)]
        output: PathBuf,

        /// Export label stored in the plan
        #[arg(short, long)]
        label: Option<String>,

        /// Header row (1-based) for every sheet
        #[arg(long, default_value_t = 1)]
        header_row: usize,

        /// Data start row (1-based) for every sheet
        #[arg(long, default_value_t = 2)]
        data_start_row: usize,
    },

    /// Merge the inputs and export the result
    Merge {
        /// Plan file describing inputs and sheet settings
        #[arg(short, long, conflicts_with = "input")]
        plan: Option<PathBuf>,

        /// Input files or directories
        #[arg(short, long, required_unless_present = "plan")]
        input: Vec<PathBuf>,

        /// Header row (1-based) for every sheet
        #[arg(long, default_value_t = 1, conflicts_with = "plan")]
        header_row: usize,

        /// Data start row (1-based) for every sheet
        #[arg(long, default_value_t = 2, conflicts_with = "plan")]
        data_start_row: usize,

        /// Directory to write the export into
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Export file name prefix
        #[arg(short, long)]
        label: Option<String>,

        /// Output format (xlsx, csv or json)
        #[arg(long, default_value = "xlsx")]
        format: String,
    },

    /// Merge the inputs and print the result
    Show {
        /// Plan file describing inputs and sheet settings
        #[arg(short, long, conflicts_with = "input")]
        plan: Option<PathBuf>,

        /// Input files or directories
        #[arg(short, long, required_unless_present = "plan")]
        input: Vec<PathBuf>,

        /// Header row (1-based) for every sheet
        #[arg(long, default_value_t = 1, conflicts_with = "plan")]
        header_row: usize,

        /// Data start row (1-based) for every sheet
        #[arg(long, default_value_t = 2, conflicts_with = "plan")]
        data_start_row: usize,

        /// Maximum number of rows to display
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> gm_core::Result<()> {
    match command {
        Commands::Inspect { file, rows } => cmd_inspect(&file, rows),
        Commands::CreatePlan {
            input,
            output,
            label,
            header_row,
            data_start_row,
        } => cmd_create_plan(&input, &output, label, header_row, data_start_row),
        Commands::Merge {
            plan,
            input,
            header_row,
            data_start_row,
            output_dir,
            label,
            format,
        } => {
            let session = open_session(plan.as_deref(), &input, header_row, data_start_row)?;
            cmd_merge(session, &output_dir, label, &format)
        }
        Commands::Show {
            plan,
            input,
            header_row,
            data_start_row,
            limit,
        } => {
            let session = open_session(plan.as_deref(), &input, header_row, data_start_row)?;
            cmd_show(session, limit)
        }
    }
}

/// Build a session from a plan file, or from inputs with uniform row settings
fn open_session(
    plan: Option<&Path>,
    inputs: &[PathBuf],
    header_row: usize,
    data_start_row: usize,
) -> gm_core::Result<Session> {
    let (session, failures) = match plan {
        Some(plan_path) => {
            let plan = MergePlan::load(plan_path)?;
            let base_dir = plan_path.parent().unwrap_or_else(|| Path::new("."));
            plan.build_session(base_dir)?
        }
        None => {
            let paths = discover_inputs(inputs)?;
            let mut session = Session::new(Settings {
                default_header_row: header_row,
                default_data_start_row: data_start_row,
                ..Settings::default()
            });
            let (_, failures) = session.load_paths(&paths);
            (session, failures)
        }
    };

    for (path, err) in &failures {
        eprintln!("Warning: skipped {}: {}", path.display(), err);
    }

    if session.store().is_empty() {
        return Err(gm_core::Error::NoFiles);
    }
    Ok(session)
}

fn cmd_inspect(file: &Path, rows: usize) -> gm_core::Result<()> {
    let settings = Settings {
        preview_rows: rows,
        ..Settings::default()
    };
    let loaded = load_path(file, &settings)?;

    println!("File: {}", file.display());
    println!("Sheets: {}", loaded.entry.sheets.len());
    println!("Row numbers count from cell A1, including blank leading rows.");

    for sheet in &loaded.entry.sheets {
        let total = loaded
            .grids
            .sheet(&sheet.name)
            .map(|g| g.row_count())
            .unwrap_or(0);

        println!();
        println!("[{}] {} rows", sheet.name, total);
        for (idx, row) in sheet.preview_rows.iter().enumerate() {
            println!("{:>4} | {}", idx + 1, render_row(row));
        }
        if total > sheet.preview_rows.len() {
            println!("     ... ({} more rows)", total - sheet.preview_rows.len());
        }

        match sheet.preview_header() {
            Some(row) => println!("Header (row {}): {}", sheet.header_row, render_row(row)),
            None => println!("Header (row {}): not in preview", sheet.header_row),
        }
        match sheet.preview_first_data_row() {
            Some(row) => println!("First data (row {}): {}", sheet.data_start_row, render_row(row)),
            None => println!("First data (row {}): not in preview", sheet.data_start_row),
        }
    }

    Ok(())
}

fn render_row(row: &[CellValue]) -> String {
    let values: Vec<String> = row.iter().map(|c| c.render()).collect();
    values.join("\t")
}

fn cmd_create_plan(
    inputs: &[PathBuf],
    output: &Path,
    label: Option<String>,
    header_row: usize,
    data_start_row: usize,
) -> gm_core::Result<()> {
    let mut session = open_session(None, inputs, header_row, data_start_row)?;
    if let Some(label) = label {
        session.settings_mut().label = label;
    }

    let plan = MergePlan::from_session(&session);
    plan.save(output)?;

    let sheets: usize = plan.files.iter().map(|f| f.sheets.len()).sum();
    println!("Created plan file: {}", output.display());
    println!("Files: {}", plan.files.len());
    println!("Sheets: {}", sheets);
    println!();
    println!("Edit the file to adjust sheet settings, then run:");
    println!("  gm-cli merge --plan {} --output-dir <dir>", output.display());

    Ok(())
}

fn cmd_merge(
    mut session: Session,
    output_dir: &Path,
    label: Option<String>,
    format: &str,
) -> gm_core::Result<()> {
    let format: ExportFormat = format.parse()?;
    if let Some(label) = label {
        session.settings_mut().label = label;
    }

    let selected = session.store().selected_sheets().len();
    let table = session.run_merge()?;
    println!(
        "Merged {} rows from {} sheets ({} columns)",
        table.row_count(),
        selected,
        table.column_count()
    );

    let now = chrono::Local::now().naive_local();
    let path = session.export(output_dir, format, now)?;
    println!("Exported to {}", path.display());

    Ok(())
}

fn cmd_show(mut session: Session, limit: Option<usize>) -> gm_core::Result<()> {
    let table = session.run_merge()?;
    print_table(table, limit);
    Ok(())
}

fn print_table(table: &UnifiedTable, limit: Option<usize>) {
    println!("{}", table.headers.join("\t"));
    println!("{}", "-".repeat(table.max_width().max(1) * 12));

    let row_limit = limit.unwrap_or(table.row_count());
    for row in table.rows.iter().take(row_limit) {
        println!("{}", render_row(row));
    }

    if table.row_count() > row_limit {
        println!("... ({} more rows)", table.row_count() - row_limit);
    }
}
