use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use topic_cli::{check_config, plan, resolve, scan, ResolveInput, RouterConfig};

#[derive(Parser)]
#[command(name = "topic-router")]
#[command(about = "Route log events to chat topics by the markers on the code that raised them", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only errors (stdout is reserved for JSON)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the topic of an event read as JSON
    Resolve(ResolveArgs),

    /// Print the marker the source scanner finds on a method
    Scan(ScanArgs),

    /// Print the delivery the handler would dispatch for an event
    Plan(PlanArgs),

    /// Validate a configuration file
    #[command(name = "check-config")]
    CheckConfig(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    /// TOML configuration file
    #[arg(short, long)]
    config: PathBuf,
}

#[derive(Args)]
struct ResolveArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Input file (`-` or absent reads stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Include the detection trace
    #[arg(long)]
    explain: bool,
}

#[derive(Args)]
struct ScanArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Fully-qualified class name
    #[arg(long)]
    class: String,

    /// Method whose marker is read
    #[arg(long, default_value = "handle")]
    method: String,
}

#[derive(Args)]
struct PlanArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Input file (`-` or absent reads stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Error);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let output = match cli.command {
        Commands::Resolve(args) => {
            let config = RouterConfig::load(&args.config.config)?;
            let input = read_input(args.input.as_ref())?;
            resolve(&config, &input, args.explain)?
        }
        Commands::Scan(args) => {
            let config = RouterConfig::load(&args.config.config)?;
            scan(&config, &args.class, &args.method)?
        }
        Commands::Plan(args) => {
            let config = RouterConfig::load(&args.config.config)?;
            let input = read_input(args.input.as_ref())?;
            plan(&config, &input)?
        }
        Commands::CheckConfig(args) => check_config(&RouterConfig::load(&args.config)?)?,
    };

    print_json(&output, cli.pretty)
}

fn read_input(path: Option<&PathBuf>) -> Result<ResolveInput> {
    let raw = match path {
        Some(path) if path.as_os_str() != "-" => fs::read_to_string(path)
            .with_context(|| format!("Failed to read input {}", path.display()))?,
        _ => {
            let mut raw = String::new();
            io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read stdin")?;
            raw
        }
    };
    ResolveInput::parse(&raw)
}

fn print_json(value: &Value, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{output}");
    Ok(())
}
