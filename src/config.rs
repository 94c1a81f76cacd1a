use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub wizard: WizardConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Wizard navigation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardConfig {
    /// Texts shown when leaving a step with unsaved changes.
    #[serde(default)]
    pub confirm: ConfirmPromptConfig,
    /// Seconds to wait for a leave confirmation before staying (0 = wait forever).
    #[serde(default)]
    pub confirm_timeout_secs: u64,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            confirm: ConfirmPromptConfig::default(),
            confirm_timeout_secs: 0,
        }
    }
}

impl WizardConfig {
    pub fn confirm_timeout(&self) -> Option<Duration> {
        (self.confirm_timeout_secs > 0).then(|| Duration::from_secs(self.confirm_timeout_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmPromptConfig {
    #[serde(default = "default_confirm_title")]
    pub title: String,
    #[serde(default = "default_confirm_message")]
    pub message: String,
    #[serde(default = "default_confirm_label")]
    pub confirm_label: String,
    #[serde(default = "default_cancel_label")]
    pub cancel_label: String,
}

fn default_confirm_title() -> String {
    "Unsaved changes".to_string()
}

fn default_confirm_message() -> String {
    "You have unsaved changes. Leave this page and discard them?".to_string()
}

fn default_confirm_label() -> String {
    "Leave".to_string()
}

fn default_cancel_label() -> String {
    "Stay".to_string()
}

impl Default for ConfirmPromptConfig {
    fn default() -> Self {
        Self {
            title: default_confirm_title(),
            message: default_confirm_message(),
            confirm_label: default_confirm_label(),
            cancel_label: default_cancel_label(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Master switch for toast delivery.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Mirror every toast into the log.
    #[serde(default = "default_true")]
    pub log_toasts: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_toasts: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to log to a file under the state directory (false = stderr).
    #[serde(default)]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_state_path")]
    pub state: String,
}

fn default_state_path() -> String {
    ".casewizard".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state: default_state_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wizard: WizardConfig::default(),
            notifications: NotificationsConfig::default(),
            logging: LoggingConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Config {
    /// Project-local config file, relative to cwd.
    pub fn local_config_path() -> PathBuf {
        PathBuf::from("casewizard.toml")
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so the tool works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        let local_config = Self::local_config_path();
        if local_config.exists() {
            builder = builder.add_source(config::File::from(local_config));
        }

        // User config in ~/.config/casewizard/ (optional global overrides)
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("casewizard").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables, e.g. CASEWIZARD__WIZARD__CONFIRM_TIMEOUT_SECS=30
        builder = builder.add_source(
            config::Environment::with_prefix("CASEWIZARD")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Save config as TOML to `path`.
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
        }

        let toml_str =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        std::fs::write(path, toml_str).context("Failed to write config file")?;

        Ok(())
    }

    /// Get absolute path to state directory.
    pub fn state_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.paths.state);
        if path.is_absolute() {
            path
        } else {
            std::env::current_dir().unwrap_or_default().join(path)
        }
    }

    /// Get absolute path to logs directory.
    pub fn logs_path(&self) -> PathBuf {
        self.state_path().join("logs")
    }
}
