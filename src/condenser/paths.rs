use anyhow::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct CondenserPaths {
    pub condenser_home: PathBuf,
    pub state_file: PathBuf,
    pub summaries_file: PathBuf,
    pub credentials_file: PathBuf,
    pub config_file: PathBuf,
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<CondenserPaths> {
    let home = required_home_dir()?;
    let condenser_home = env_or_default_path("CONDENSER_HOME", home.join(".condenser"));

    let state_file = env_or_default_path(
        "CONDENSER_STATE_FILE",
        condenser_home.join("state/scheduler.json"),
    );
    let summaries_file = env_or_default_path(
        "CONDENSER_SUMMARIES_FILE",
        condenser_home.join("summaries.jsonl"),
    );
    let credentials_file = env_or_default_path(
        "CONDENSER_CREDENTIALS_FILE",
        condenser_home.join("credentials.json"),
    );
    let config_file = env_or_default_path(
        "CONDENSER_CONFIG_PATH",
        condenser_home.join("condenser.toml"),
    );

    Ok(CondenserPaths {
        condenser_home,
        state_file,
        summaries_file,
        credentials_file,
        config_file,
    })
}
