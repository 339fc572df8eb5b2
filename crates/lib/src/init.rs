//! Initialize the configuration directory: create ~/.dfbridge and a template config.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Template written by `dfbridge init`. Secrets may be left empty and supplied via env instead.
static DEFAULT_CONFIG: &str = r#"{
  "dialogflow": {
    "projectId": "",
    "agentId": "",
    "location": "global",
    "defaultLanguage": "en",
    "clientEmail": "",
    "privateKey": "",
    "capabilities": {
      "events": true,
      "richCards": true,
      "echoSession": true
    }
  },
  "channels": {
    "telegram": {
      "botToken": null
    }
  }
}
"#;

/// Create the config directory and a template `config.json` if it does not exist.
/// Returns the config directory.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if config_path.exists() {
        log::debug!("config already exists at {}, leaving it unchanged", config_path.display());
    } else {
        std::fs::write(config_path, DEFAULT_CONFIG)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    }

    Ok(config_dir.to_path_buf())
}
