use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use dotenvy::dotenv;
use relsql::{config, generate_sql, Expr};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InputFormat {
    Json,
    Yaml,
}

/// relsql - compile a relational query tree to SQL Server SQL
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Query tree file, or `-` for stdin
    input: PathBuf,

    /// Input format; guessed from the file extension when omitted
    #[arg(long, value_enum)]
    format: Option<InputFormat>,

    /// Targeted SQL Server release (2000, 2005, 2008 or 2012)
    #[arg(long, default_value = "2008")]
    sql_version: String,

    /// Maximum query tree depth
    #[arg(long, default_value_t = 200)]
    max_depth: u32,

    /// YAML generator configuration; takes precedence over the flags above
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read the configuration from RELSQL_* environment variables
    #[arg(long)]
    from_env: bool,

    /// Also print the result column mapping as JSON
    #[arg(long)]
    columns: bool,
}

impl From<&Cli> for config::CliConfig {
    fn from(cli: &Cli) -> Self {
        config::CliConfig {
            sql_version: cli.sql_version.clone(),
            max_depth: cli.max_depth,
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<config::GeneratorConfig> {
    let config = if let Some(path) = &cli.config {
        config::GeneratorConfig::from_yaml_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?
    } else if cli.from_env {
        config::GeneratorConfig::from_env().context("reading configuration from environment")?
    } else {
        config::GeneratorConfig::from_cli(cli.into()).context("invalid command line")?
    };
    Ok(config)
}

fn detect_format(path: &Path, explicit: Option<InputFormat>) -> anyhow::Result<InputFormat> {
    if let Some(format) = explicit {
        return Ok(format);
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(InputFormat::Json),
        Some("yaml") | Some("yml") => Ok(InputFormat::Yaml),
        _ => bail!(
            "cannot tell the format of {}; pass --format json|yaml",
            path.display()
        ),
    }
}

fn read_query(cli: &Cli) -> anyhow::Result<Expr> {
    let (content, format) = if cli.input.as_os_str() == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("reading query tree from stdin")?;
        (content, cli.format.unwrap_or(InputFormat::Json))
    } else {
        let content = std::fs::read_to_string(&cli.input)
            .with_context(|| format!("reading {}", cli.input.display()))?;
        (content, detect_format(&cli.input, cli.format)?)
    };

    let query = match format {
        InputFormat::Json => Expr::from_json(&content).context("parsing JSON query tree")?,
        InputFormat::Yaml => Expr::from_yaml(&content).context("parsing YAML query tree")?,
    };
    Ok(query)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    log::info!(
        "Compiling for {} (max depth {})",
        config.sql_version,
        config.max_depth
    );

    let query = read_query(&cli)?;
    let generated = generate_sql(&query, &config).context("SQL generation failed")?;

    println!("{}", generated.sql);
    if cli.columns {
        println!("{}", serde_json::to_string_pretty(&generated.columns)?);
    }
    Ok(())
}

fn main() {
    // Defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    dotenv().ok();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
