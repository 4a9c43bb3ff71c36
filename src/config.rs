use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ImportError;
use crate::schema::SchemaVariant;

pub const DEFAULT_BASE_URL: &str = "https://api.trello.com/1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub trello: TrelloConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrelloConfig {
    pub api_key: Option<String>,
    pub token: Option<String>,
    pub board_id: Option<String>,
    pub list_id: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Treat any 2xx as success; when false only 200 is accepted.
    pub accept_any_success: bool,
}

impl Default for TrelloConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            token: None,
            board_id: None,
            list_id: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            accept_any_success: true,
        }
    }
}

/// Unset fields fall back to the defaults of the selected schema.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    pub schema: Option<SchemaVariant>,
    pub strict: Option<bool>,
    pub require_labels: Option<bool>,
    pub require_members: Option<bool>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl TrelloConfig {
    pub fn credentials(&self) -> Result<(&str, &str), ImportError> {
        match (non_empty(&self.api_key), non_empty(&self.token)) {
            (Some(key), Some(token)) => Ok((key, token)),
            _ => Err(ImportError::Config(
                "Trello api_key and token are required (config [trello] or TRELLO_API_KEY / TRELLO_TOKEN)"
                    .into(),
            )),
        }
    }

    pub fn board_id(&self) -> Result<&str, ImportError> {
        non_empty(&self.board_id).ok_or_else(|| {
            ImportError::Config("no board id configured (board_id, TRELLO_BOARD_ID or --board)".into())
        })
    }

    pub fn list_id(&self) -> Result<&str, ImportError> {
        non_empty(&self.list_id).ok_or_else(|| {
            ImportError::Config("no list id configured (list_id, TRELLO_LIST_ID or --list)".into())
        })
    }
}

impl AppConfig {
    /// Overlay `TRELLO_*` values from the given lookup onto the file config.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let trello = &mut self.trello;
        let slots: [(&str, &mut Option<String>); 4] = [
            ("TRELLO_API_KEY", &mut trello.api_key),
            ("TRELLO_TOKEN", &mut trello.token),
            ("TRELLO_BOARD_ID", &mut trello.board_id),
            ("TRELLO_LIST_ID", &mut trello.list_id),
        ];
        for (var, slot) in slots {
            if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
                *slot = Some(value);
            }
        }
        if let Some(url) = lookup("TRELLO_BASE_URL").filter(|v| !v.trim().is_empty()) {
            trello.base_url = url;
        }
    }

    pub fn apply_env(&mut self) {
        self.apply_env_with(|var| std::env::var(var).ok());
    }
}

pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cartollero")
}

fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

fn parse_config(path: &Path) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}

/// Load the config file (an explicit path must exist; the default one may
/// be absent) and apply environment overrides.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let mut config = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            parse_config(path)?
        }
        None => {
            let path = config_path();
            if path.exists() {
                parse_config(&path)?
            } else {
                AppConfig::default()
            }
        }
    };
    config.apply_env();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.trello.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.trello.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.trello.accept_any_success);
        assert_eq!(config.import.schema, None);
    }

    #[test]
    fn parses_both_sections() {
        let config: AppConfig = toml::from_str(
            r#"
            [trello]
            api_key = "k"
            token = "t"
            board_id = "B1"
            list_id = "L1"
            timeout_secs = 5

            [import]
            schema = "extended"
            strict = false
            require_labels = true
            "#,
        )
        .unwrap();
        assert_eq!(config.trello.credentials().unwrap(), ("k", "t"));
        assert_eq!(config.trello.board_id().unwrap(), "B1");
        assert_eq!(config.trello.timeout_secs, 5);
        assert_eq!(config.import.schema, Some(SchemaVariant::Extended));
        assert_eq!(config.import.strict, Some(false));
        assert_eq!(config.import.require_labels, Some(true));
        assert_eq!(config.import.require_members, None);
    }

    #[test]
    fn success_policy_lives_under_trello() {
        let config: AppConfig =
            toml::from_str("[trello]\naccept_any_success = false\n").unwrap();
        assert!(!config.trello.accept_any_success);

        let err = toml::from_str::<AppConfig>("[import]\naccept_any_success = false\n")
            .unwrap_err();
        assert!(err.to_string().contains("accept_any_success"));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = AppConfig::default();
        config.trello.board_id = Some("from-file".into());
        let env: HashMap<&str, &str> = [
            ("TRELLO_API_KEY", "env-key"),
            ("TRELLO_TOKEN", "env-token"),
            ("TRELLO_BOARD_ID", "env-board"),
            ("TRELLO_LIST_ID", ""),
            ("TRELLO_BASE_URL", "http://localhost:9999"),
        ]
        .into_iter()
        .collect();

        config.apply_env_with(|var| env.get(var).map(|v| v.to_string()));

        assert_eq!(config.trello.credentials().unwrap(), ("env-key", "env-token"));
        assert_eq!(config.trello.board_id().unwrap(), "env-board");
        assert!(config.trello.list_id().is_err());
        assert_eq!(config.trello.base_url, "http://localhost:9999");
    }

    #[test]
    fn blank_credentials_are_missing() {
        let config = TrelloConfig {
            api_key: Some("  ".into()),
            token: Some("t".into()),
            ..TrelloConfig::default()
        };
        assert!(matches!(config.credentials(), Err(ImportError::Config(_))));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn explicit_file_is_parsed() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[import]\nschema = \"minimal\"").unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.import.schema, Some(SchemaVariant::Minimal));
    }
}
