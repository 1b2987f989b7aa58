use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use nexus_account::{AccountConfig, LocalSigner};
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Command;

/// Offline payload builder for Nexus smart accounts.
///
/// Every command works from a JSON account config and, where a signature is needed, the owner
/// key. Nothing is broadcast; results are printed and optionally recorded in a JSON file.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Account configuration (contract address book, chain id, attesters).
    #[arg(long, env = "NEXUS_CONFIG", default_value = "nexus.config.json")]
    config: PathBuf,

    /// Path to a file containing the owner private key.
    #[arg(long, env = "PRIV_KEY_PATH", conflicts_with = "private_key", global = true)]
    private_key_path: Option<PathBuf>,

    /// Owner private key (hex string, 0x...).
    #[arg(long, env = "PKEY", conflicts_with = "private_key_path", global = true, hide_env_values = true)]
    private_key: Option<String>,

    /// Account index under the owner.
    #[arg(long, default_value_t = 0, global = true)]
    index: u64,

    /// Record the result under `results.<command>` in this JSON file.
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn owner_key(&self) -> Result<LocalSigner> {
        let raw = if let Some(ref path) = self.private_key_path {
            fs::read_to_string(path).with_context(|| format!("failed reading key file {}", path.display()))?
        } else if let Some(ref pk) = self.private_key {
            pk.clone()
        } else {
            return Err(anyhow!(
                "missing owner key: provide --private-key-path or --private-key (or set PRIV_KEY_PATH/PKEY)"
            ));
        };
        LocalSigner::from_hex(raw.trim()).map_err(|e| anyhow!("invalid owner key: {e}"))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AccountConfig::from_json_file(&cli.config)
        .with_context(|| format!("failed loading {}", cli.config.display()))?;
    info!(chain_id = config.chain_id, config = %cli.config.display(), "loaded account config");

    let name = cli.command.name();
    let output = commands::run(&cli, config).await?;
    println!("{}", serde_json::to_string_pretty(&output).context("failed serialising output")?);

    if let Some(ref path) = cli.out {
        record_result(path, name, output)?;
        info!(path = %path.display(), command = name, "recorded result");
    }
    Ok(())
}

fn record_result(path: &Path, command: &str, output: Value) -> Result<()> {
    let now = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| "unknown".to_string());

    let existing = if path.exists() {
        fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?
    } else {
        String::new()
    };

    let mut root: Value = if existing.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(&existing).with_context(|| format!("failed parsing JSON in {}", path.display()))?
    };
    if !root.is_object() {
        root = json!({});
    }
    root["updated_at"] = json!(now);
    if root.get("results").and_then(Value::as_object).is_none() {
        root["results"] = json!({});
    }
    root["results"][command] = json!({ "output": output, "recorded_at": now });

    write_json_atomic(path, &root)
}

fn write_json_atomic(path: &Path, value: &Value) -> Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    if !parent.exists() {
        fs::create_dir_all(parent).with_context(|| format!("failed creating directory {}", parent.display()))?;
    }

    let serialised = serde_json::to_string_pretty(value).context("failed serialising results JSON")?;
    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, serialised.as_bytes())
        .with_context(|| format!("failed writing temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("failed replacing {}", path.display()))?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
