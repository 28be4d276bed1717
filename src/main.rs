use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::eyre;
use proctree::config::{self, Config, load_config, load_config_from_path};
use proctree::render::{self, Columns, OutputFormat};
use proctree::{Collector, ProcessDataFlags, ProcessRecord, build_process_tree, filter_process_list};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "proctree",
    about = "Process table snapshots with memory, command line, owner and CPU details"
)]
struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format: text, json
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List running processes
    List(ListArgs),
    /// Measure CPU usage over a one second window
    Cpu(CpuArgs),
}

#[derive(Args)]
struct ListArgs {
    /// Only this process and its descendants
    #[arg(long)]
    root: Option<u32>,

    /// Include working-set size
    #[arg(long)]
    memory: bool,

    /// Include the full command line
    #[arg(long)]
    command_line: bool,

    /// Include the owning account
    #[arg(long)]
    owner: bool,

    /// Output format: table, tree, json
    #[arg(long)]
    format: Option<String>,
}

#[derive(Args)]
struct CpuArgs {
    /// Sample this process and its descendants
    #[arg(long, conflicts_with = "pids")]
    root: Option<u32>,

    /// Output format: table, tree, json
    #[arg(long)]
    format: Option<String>,

    /// Processes to sample; all of them when empty
    pids: Vec<u32>,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = load_config_for_cli(&cli);
    init_logging(&config.logging)?;

    let collector = Collector::new();
    let output = match &cli.command {
        Command::List(args) => run_list(&collector, &config, args)?,
        Command::Cpu(args) => run_cpu(&collector, &config, args)?,
    };
    print!("{output}");
    Ok(())
}

fn load_config_for_cli(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.logging.format = format.clone();
    }
    let format = match &cli.command {
        Command::List(args) => args.format.as_ref(),
        Command::Cpu(args) => args.format.as_ref(),
    };
    if let Some(format) = format {
        config.general.default_format = format.clone();
    }

    config
}

fn init_logging(logging: &config::LoggingConfig) -> Result<()> {
    let level = logging.level.parse::<Level>().unwrap_or(Level::WARN);
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr);

    let installed = if logging.format.eq_ignore_ascii_case("json") {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    installed.map_err(|e| eyre!("failed to set tracing subscriber: {e}"))
}

fn run_list(collector: &Collector, config: &Config, args: &ListArgs) -> Result<String> {
    let mut flags = ProcessDataFlags::NONE;
    if args.memory {
        flags |= ProcessDataFlags::MEMORY;
    }
    if args.command_line {
        flags |= ProcessDataFlags::COMMAND_LINE;
    }
    if args.owner {
        flags |= ProcessDataFlags::OWNER;
    }
    if flags.is_empty() {
        flags = config.general.default_flags();
    }

    let records = collector.list_processes(flags)?;
    let records = select_root(records, args.root)?;
    output(config, &records, args.root, Columns::from_flags(flags, false))
}

fn run_cpu(collector: &Collector, config: &Config, args: &CpuArgs) -> Result<String> {
    let records = collector.list_processes(ProcessDataFlags::NONE)?;
    let records = select_root(records, args.root)?;
    let records = if args.pids.is_empty() {
        records
    } else {
        let missing: Vec<String> = args
            .pids
            .iter()
            .filter(|pid| !records.iter().any(|r| r.pid == **pid))
            .map(u32::to_string)
            .collect();
        if !missing.is_empty() {
            tracing::warn!(pids = %missing.join(","), "requested processes are not running");
        }
        records
            .into_iter()
            .filter(|r| args.pids.contains(&r.pid))
            .collect()
    };

    let records = collector.sample_cpu(records);
    output(
        config,
        &records,
        args.root,
        Columns::from_flags(ProcessDataFlags::NONE, true),
    )
}

fn select_root(records: Vec<ProcessRecord>, root: Option<u32>) -> Result<Vec<ProcessRecord>> {
    match root {
        Some(pid) => {
            filter_process_list(pid, &records).ok_or_else(|| eyre!("process {pid} is not running"))
        }
        None => Ok(records),
    }
}

fn output(
    config: &Config,
    records: &[ProcessRecord],
    root: Option<u32>,
    columns: Columns,
) -> Result<String> {
    let width = config.general.command_width;
    let format = OutputFormat::from_str_config(&config.general.default_format);

    let tree = |pid: u32| {
        build_process_tree(records, pid).ok_or_else(|| eyre!("process {pid} is not running"))
    };
    let text = match (format, root) {
        (OutputFormat::Table, _) => render::render_table(records, columns, width),
        (OutputFormat::Tree, Some(pid)) => render::render_tree(&tree(pid)?, width),
        (OutputFormat::Tree, None) => render::render_forest(records, width),
        (OutputFormat::Json, Some(pid)) => render::render_json(&tree(pid)?)? + "\n",
        (OutputFormat::Json, None) => render::render_json(records)? + "\n",
    };
    Ok(text)
}
