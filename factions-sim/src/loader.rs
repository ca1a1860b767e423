use crate::script::{Script, ScriptEntry};
use anyhow::{Context, Result};
use factions_core::{Checkpoint, FactionsConfig, WorldState};
use std::fs;
use std::path::Path;

/// Missing path means built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<FactionsConfig> {
    match path {
        Some(path) => {
            log::info!("Loading config from {:?}", path);
            FactionsConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))
        }
        None => Ok(FactionsConfig::default()),
    }
}

pub fn load_initial_state(checkpoint: Option<&Path>, config: &FactionsConfig) -> Result<WorldState> {
    let Some(path) = checkpoint else {
        log::info!("No checkpoint given, starting an empty world");
        return Ok(WorldState::new(config));
    };
    log::info!("Loading checkpoint from {:?}", path);
    let checkpoint = Checkpoint::load(path)
        .with_context(|| format!("Failed to load checkpoint {}", path.display()))?;
    let state = checkpoint.into_state(config);
    log::info!(
        "Restored tick {} with {} factions and {} claimed chunks",
        state.tick,
        state.factions.len(),
        state.ledger.len()
    );
    Ok(state)
}

/// Blank lines and lines starting with `#` are skipped.
pub fn load_script(path: &Path) -> Result<Script> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    let mut entries = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let entry: ScriptEntry = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: malformed script entry", path.display(), index + 1))?;
        entries.push(entry);
    }
    log::info!("Loaded {} script entries", entries.len());
    Ok(entries.into_iter().collect())
}
