use anyhow::{Context, Result};
use clap::Parser;
use commonware_runtime::{deterministic, Runner as _};
use std::path::{Path, PathBuf};
use tracing::info;
use unspent_cli::{replay, Config, Script, ValidatedConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Ledger configuration (YAML).
    #[arg(long)]
    config: PathBuf,

    /// Invocations and queries to replay (YAML).
    #[arg(long)]
    script: PathBuf,

    /// Validate config and script and exit without executing anything.
    #[arg(long)]
    dry_run: bool,
}

fn load_config(path: &Path) -> Result<ValidatedConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read config file {}", path.display()))?;
    let config: Config =
        serde_yaml::from_str(&contents).context("Could not parse config file")?;
    config.validate().context("Invalid config")
}

fn load_script(path: &Path) -> Result<Script> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read script file {}", path.display()))?;
    serde_yaml::from_str(&contents).context("Could not parse script file")
}

fn init_tracing(config: &ValidatedConfig) {
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(config.log_level)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(config.log_level)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() {
    if let Err(err) = main_result() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn main_result() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args.config)?;
    let script = load_script(&args.script)?;

    if args.dry_run {
        println!("namespace: {}", String::from_utf8_lossy(&config.namespace));
        println!("admins: {}", config.admins.len());
        println!("invocations: {}", script.invocations.len());
        println!("instructions: {}", script.instruction_count());
        println!("queries: {}", script.queries.len());
        println!("config ok");
        return Ok(());
    }

    init_tracing(&config);
    info!(
        script = %args.script.display(),
        invocations = script.invocations.len(),
        "replaying"
    );

    let executor = deterministic::Runner::default();
    let report = executor
        .start(|_| async move { replay(&config, &script).await })
        .context("replay failed")?;
    let output = serde_json::to_string_pretty(&report).context("serialize report")?;
    println!("{output}");
    Ok(())
}
