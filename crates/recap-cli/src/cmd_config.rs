use clap::Subcommand;
use recap_store::RecapPaths;

use crate::settings::{env_name, is_secret, read_config_file, KEYS};

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Set a config value
    Set {
        /// Config key (e.g. gitlab_url)
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
}

// ── Dispatch ──

pub fn run(cmd: ConfigCmd, paths: &RecapPaths) -> anyhow::Result<()> {
    match cmd {
        ConfigCmd::Set { key, value } => set(paths, &key, &value),
        ConfigCmd::Get { key } => get(paths, &key),
        ConfigCmd::List => list(paths),
    }
}

// ── Command Implementations ──

fn check_key(key: &str) -> anyhow::Result<()> {
    if !KEYS.contains(&key) {
        anyhow::bail!("unknown config key `{key}`. Known keys: {}", KEYS.join(", "));
    }
    Ok(())
}

fn write_config(
    paths: &RecapPaths,
    config: &serde_json::Map<String, serde_json::Value>,
) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&config)?;
    recap_store::write_atomic(&paths.config_json, json.as_bytes())
}

/// JSON value for `key`. Only `smtp_port` and `mail_thread` are typed; every
/// other value is stored verbatim so tokens like `007` keep their digits.
fn parse_value(key: &str, s: &str) -> serde_json::Value {
    match (key, s) {
        ("mail_thread", "true") => serde_json::Value::Bool(true),
        ("mail_thread", "false") => serde_json::Value::Bool(false),
        ("smtp_port", _) => match s.parse::<u16>() {
            Ok(n) => serde_json::Value::Number(n.into()),
            Err(_) => serde_json::Value::String(s.to_string()),
        },
        _ => serde_json::Value::String(s.to_string()),
    }
}

fn shown(key: &str, value: &serde_json::Value) -> String {
    if is_secret(key) {
        "********".to_string()
    } else {
        value.to_string()
    }
}

/// `recap config set <key> <value>`
pub fn set(paths: &RecapPaths, key: &str, value: &str) -> anyhow::Result<()> {
    check_key(key)?;
    paths.ensure_layout()?;
    let mut config = read_config_file(&paths.config_json)?;
    let value = parse_value(key, value);
    println!("{key} = {}", shown(key, &value));
    config.insert(key.to_string(), value);
    write_config(paths, &config)
}

/// `recap config get <key>`
pub fn get(paths: &RecapPaths, key: &str) -> anyhow::Result<()> {
    check_key(key)?;
    let config = read_config_file(&paths.config_json)?;
    match config.get(key) {
        Some(val) => println!("{}", shown(key, val)),
        None => println!("(not set)"),
    }
    if std::env::var_os(env_name(key)).is_some() {
        println!("(overridden by ${})", env_name(key));
    }
    Ok(())
}

/// `recap config list`
pub fn list(paths: &RecapPaths) -> anyhow::Result<()> {
    let config = read_config_file(&paths.config_json)?;
    if config.is_empty() {
        println!("(no config set)");
    } else {
        for (k, v) in &config {
            println!("{k} = {}", shown(k, v));
        }
    }
    Ok(())
}
