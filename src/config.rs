use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::actions::ActionKind;
use crate::errors::ConfigError;

const CONFIG_FILE: &str = "config.yaml";

/// Blur debounce in milliseconds
const DEFAULT_BLUR_DEBOUNCE_MS: u64 = 200;
const DEFAULT_MAX_VALUE_SUGGESTIONS: usize = 15;
const DEFAULT_MULTI_VALUE_DISPLAY_LIMIT: usize = 3;

/// Controller behavior switches
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OmniBoxConfig {
    /// Open the menu when the input gains focus
    #[serde(default = "default_true")]
    pub open_after_focus: bool,

    /// Collapse the menu after a successful commit
    #[serde(default)]
    pub close_on_complete: bool,

    /// Backspace on empty input moves the last chip back into the input
    #[serde(default = "default_true")]
    pub backspace_removes: bool,

    /// Tab accepts the highlighted option
    #[serde(default = "default_true")]
    pub tab_selects_value: bool,

    #[serde(default = "default_blur_debounce_ms")]
    pub blur_debounce_ms: u64,
}

impl Default for OmniBoxConfig {
    fn default() -> Self {
        Self {
            open_after_focus: true,
            close_on_complete: false,
            backspace_removes: true,
            tab_selects_value: true,
            blur_debounce_ms: DEFAULT_BLUR_DEBOUNCE_MS,
        }
    }
}

impl OmniBoxConfig {
    pub fn blur_debounce(&self) -> Duration {
        Duration::from_millis(self.blur_debounce_ms)
    }
}

fn default_true() -> bool {
    true
}

fn default_blur_debounce_ms() -> u64 {
    DEFAULT_BLUR_DEBOUNCE_MS
}

fn default_max_value_suggestions() -> usize {
    DEFAULT_MAX_VALUE_SUGGESTIONS
}

fn default_multi_value_display_limit() -> usize {
    DEFAULT_MULTI_VALUE_DISPLAY_LIMIT
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub omnibox: OmniBoxConfig,

    /// Data region prefix for URL parameters (`query` -> `query.sort=...`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_prefix: Option<String>,

    /// Action that takes over input without a keyword
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_action: Option<ActionKind>,

    #[serde(default = "default_max_value_suggestions")]
    pub max_value_suggestions: usize,

    #[serde(default = "default_multi_value_display_limit")]
    pub multi_value_display_limit: usize,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            omnibox: OmniBoxConfig::default(),
            param_prefix: None,
            default_action: None,
            max_value_suggestions: DEFAULT_MAX_VALUE_SUGGESTIONS,
            multi_value_display_limit: DEFAULT_MULTI_VALUE_DISPLAY_LIMIT,
            base_path: PathBuf::new(),
        }
    }
}

impl Config {
    fn validate(&mut self) -> Result<(), ConfigError> {
        if self.omnibox.blur_debounce_ms == 0 {
            return Err(ConfigError::invalid(
                "omnibox.blur_debounce_ms",
                "must be greater than 0",
            ));
        }

        if self.max_value_suggestions == 0 {
            return Err(ConfigError::invalid(
                "max_value_suggestions",
                "must be greater than 0",
            ));
        }

        if let Some(prefix) = &self.param_prefix {
            if prefix.contains(['.', '=', '&', '~']) {
                return Err(ConfigError::invalid(
                    "param_prefix",
                    format!("'{prefix}' must not contain '.', '=', '&' or '~'"),
                ));
            }
            // an empty prefix means no prefix
            if prefix.is_empty() {
                self.param_prefix = None;
            }
        }

        Ok(())
    }

    pub fn load_with(base_path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let base_path = base_path.as_ref();
        let path = base_path.join(CONFIG_FILE);

        // create new if does not exist
        if !path.exists() {
            std::fs::create_dir_all(base_path)?;
            std::fs::write(&path, serde_yml::to_string(&Self::default())?)?;
        }

        let config_str = std::fs::read_to_string(&path)?;
        let mut config: Self = serde_yml::from_str(&config_str)?;

        config.base_path = base_path.to_path_buf();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let config_str = serde_yml::to_string(&self)?;
        std::fs::write(self.base_path.join(CONFIG_FILE), config_str)?;
        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}
