//! Connection settings shared by all backends.
//!
//! A [`BankingConfig`] is loaded once, either from `AQBANKING_*`
//! environment variables or from a camelCase JSON document, and then
//! shared read-only by the dispatcher and the selected backend.

use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::error::{BankingError, Result};
use crate::models::BackendKind;

/// Default HBCI protocol version.
pub const DEFAULT_HBCI_VERSION: &str = "300";
/// Default TAN method id (single-step TAN).
pub const DEFAULT_TAN_METHOD_ID: &str = "999";
/// Default interpreter for the script backend.
pub const DEFAULT_PYTHON_PATH: &str = "python";
/// Default image for the container backend.
pub const DEFAULT_DOCKER_IMAGE: &str = "ghcr.io/larsux/aqbanking-docker";
/// Default container runtime command.
pub const DEFAULT_DOCKER_COMMAND: &str = "docker";
/// Default path of the AqBanking request tool.
pub const DEFAULT_AQBANKING_CLI: &str = "aqbanking-cli";
/// Default path of the HBCI administration tool.
pub const DEFAULT_HBCI_TOOL: &str = "aqhbci-tool4";

/// Log level exported to the tools when debug logging is on.
const DEBUG_LOG_LEVEL: &str = "info";
/// Tool log variables set when debug logging is on.
const DEBUG_LOG_VARS: [&str; 3] = ["GWEN_LOGLEVEL", "AQBANKING_LOGLEVEL", "AQHBCI_LOGLEVEL"];

/// Prefix of every environment variable read by [`BankingConfig::from_env`].
const ENV_PREFIX: &str = "AQBANKING_";

/// Bank connection and backend settings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BankingConfig {
    /// German bank code (BLZ).
    pub bank_code: String,
    /// Online-banking login.
    pub user_id: String,
    /// Customer id, if the bank distinguishes it from the login.
    pub customer_id: Option<String>,
    /// Online-banking PIN; blank values are treated as absent.
    #[serde(deserialize_with = "deserialize_pin")]
    pub pin: Option<SecretString>,
    /// FinTS server URL.
    pub server_url: Option<String>,
    /// HBCI protocol version.
    ///
    /// Informational only. The tools read the version from the user set up
    /// in their own configuration and python-fints always speaks FinTS 3.0.
    pub hbci_version: String,
    /// Preferred TAN method id, sent to the script backend.
    pub tan_method_id: String,
    /// TAN medium (device) name, sent to the script backend.
    pub tan_medium_name: Option<String>,
    /// Pass `--noninteractive` to the tools and never pipe the PIN.
    pub non_interactive: bool,
    /// User name registered in the AqBanking configuration.
    #[serde(rename = "aqBankingUserName")]
    pub aqbanking_user_name: Option<String>,
    /// Export tool log levels to spawned processes.
    pub enable_debug_logging: bool,
    /// Backend used for every request.
    #[serde(alias = "fintsImplementation")]
    pub backend: BackendKind,
    /// Interpreter for the script backend.
    pub python_path: String,
    /// Image for the container backend.
    pub docker_image: String,
    /// Container runtime command.
    pub docker_command: String,
    /// Path of `aqbanking-cli`.
    #[serde(rename = "aqbankingCli")]
    pub aqbanking_cli: String,
    /// Path of `aqhbci-tool4`.
    pub hbci_tool: String,
    /// Host directory mounted as the tool configuration in containers
    /// (default `$HOME/.aqbanking`).
    pub config_dir: Option<PathBuf>,
}

impl Default for BankingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            bank_code: String::new(),
            user_id: String::new(),
            customer_id: None,
            pin: None,
            server_url: None,
            hbci_version: DEFAULT_HBCI_VERSION.to_owned(),
            tan_method_id: DEFAULT_TAN_METHOD_ID.to_owned(),
            tan_medium_name: None,
            non_interactive: true,
            aqbanking_user_name: None,
            enable_debug_logging: false,
            backend: BackendKind::default(),
            python_path: DEFAULT_PYTHON_PATH.to_owned(),
            docker_image: DEFAULT_DOCKER_IMAGE.to_owned(),
            docker_command: DEFAULT_DOCKER_COMMAND.to_owned(),
            aqbanking_cli: DEFAULT_AQBANKING_CLI.to_owned(),
            hbci_tool: DEFAULT_HBCI_TOOL.to_owned(),
            config_dir: None,
        }
    }
}

impl BankingConfig {
    /// Creates a configuration with defaults for everything but the login.
    #[inline]
    #[must_use]
    pub fn new<B: Into<String>, U: Into<String>>(bank_code: B, user_id: U) -> Self {
        Self {
            bank_code: bank_code.into(),
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    /// Loads the configuration from `AQBANKING_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`BankingError::Configuration`] if a flag or backend name
    /// cannot be parsed.
    #[inline]
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through an arbitrary variable lookup.
    ///
    /// `lookup` receives full variable names such as `AQBANKING_BANK_CODE`.
    /// Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`BankingError::Configuration`] if a flag or backend name
    /// cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |suffix: &str| {
            lookup(&format!("{ENV_PREFIX}{suffix}")).filter(|value| !value.trim().is_empty())
        };
        let mut config = Self::default();

        if let Some(value) = get("BANK_CODE") {
            config.bank_code = value;
        }
        if let Some(value) = get("USER_ID") {
            config.user_id = value;
        }
        config.customer_id = get("CUSTOMER_ID");
        config.pin = get("PIN").map(SecretString::from);
        config.server_url = get("SERVER_URL");
        if let Some(value) = get("HBCI_VERSION") {
            config.hbci_version = value;
        }
        if let Some(value) = get("TAN_METHOD") {
            config.tan_method_id = value;
        }
        config.tan_medium_name = get("TAN_MEDIUM");
        if let Some(value) = get("NON_INTERACTIVE") {
            config.non_interactive = parse_flag("AQBANKING_NON_INTERACTIVE", &value)?;
        }
        config.aqbanking_user_name = get("USER_NAME");
        if let Some(value) = get("DEBUG") {
            config.enable_debug_logging = parse_flag("AQBANKING_DEBUG", &value)?;
        }
        if let Some(value) = get("BACKEND") {
            config.backend = value.parse().map_err(BankingError::Configuration)?;
        }
        if let Some(value) = get("PYTHON") {
            config.python_path = value;
        }
        if let Some(value) = get("DOCKER_IMAGE") {
            config.docker_image = value;
        }
        if let Some(value) = get("DOCKER") {
            config.docker_command = value;
        }
        if let Some(value) = get("CLI") {
            config.aqbanking_cli = value;
        }
        if let Some(value) = get("HBCI_TOOL") {
            config.hbci_tool = value;
        }
        config.config_dir = get("CONFIG_DIR").map(PathBuf::from);

        tracing::debug!(backend = %config.backend, "configuration loaded from environment");
        Ok(config)
    }

    /// Loads the configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`BankingError::Io`] if the file cannot be read and
    /// [`BankingError::Serialization`] if it is not a valid configuration.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        tracing::debug!(path = %path.display(), backend = %config.backend, "configuration loaded");
        Ok(config)
    }

    /// Per-spawn environment for the tools.
    ///
    /// Empty unless debug logging is enabled.
    #[must_use]
    pub fn debug_env(&self) -> Vec<(&'static str, &'static str)> {
        if self.enable_debug_logging {
            DEBUG_LOG_VARS
                .iter()
                .map(|&var| (var, DEBUG_LOG_LEVEL))
                .collect()
        } else {
            Vec::new()
        }
    }

    /// Fails unless a bank code and login are configured.
    ///
    /// # Errors
    ///
    /// Returns [`BankingError::Configuration`] naming the missing field.
    pub fn require_login(&self) -> Result<()> {
        if self.bank_code.trim().is_empty() {
            return Err(BankingError::configuration("bank code is not configured"));
        }
        if self.user_id.trim().is_empty() {
            return Err(BankingError::configuration("user id is not configured"));
        }
        Ok(())
    }

    /// Configured bank code, or `None` if blank.
    #[inline]
    #[must_use]
    pub fn bank_code(&self) -> Option<&str> {
        Some(self.bank_code.trim()).filter(|code| !code.is_empty())
    }
}

/// Parses a boolean environment flag.
fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(BankingError::configuration(format!(
            "{name} must be a boolean, got `{other}`"
        ))),
    }
}

/// Reads an optional PIN, mapping blank strings to `None`.
fn deserialize_pin<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> core::result::Result<Option<SecretString>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|pin| !pin.is_empty())
        .map(SecretString::from))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write as _;

    use secrecy::ExposeSecret as _;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|&(key, value)| (key.to_owned(), value.to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = BankingConfig::default();
        assert_eq!(config.hbci_version, "300");
        assert_eq!(config.tan_method_id, "999");
        assert!(config.non_interactive);
        assert!(!config.enable_debug_logging);
        assert_eq!(config.backend, BackendKind::ExternalTool);
        assert_eq!(config.python_path, "python");
        assert_eq!(config.docker_image, DEFAULT_DOCKER_IMAGE);
        assert!(config.pin.is_none());
        assert!(config.debug_env().is_empty());
    }

    #[test]
    fn env_lookup_overrides() {
        let config = BankingConfig::from_lookup(lookup(&[
            ("AQBANKING_BANK_CODE", "37040044"),
            ("AQBANKING_USER_ID", "max"),
            ("AQBANKING_PIN", "12345"),
            ("AQBANKING_NON_INTERACTIVE", "false"),
            ("AQBANKING_DEBUG", "yes"),
            ("AQBANKING_BACKEND", "docker"),
            ("AQBANKING_SERVER_URL", "   "),
        ]))
        .unwrap();
        assert_eq!(config.bank_code, "37040044");
        assert_eq!(config.user_id, "max");
        assert_eq!(config.pin.as_ref().unwrap().expose_secret(), "12345");
        assert!(!config.non_interactive);
        assert!(config.enable_debug_logging);
        assert_eq!(config.backend, BackendKind::Container);
        assert!(config.server_url.is_none());
    }

    #[test]
    fn env_bad_flag() {
        let err = BankingConfig::from_lookup(lookup(&[("AQBANKING_DEBUG", "maybe")])).unwrap_err();
        assert!(err.to_string().contains("AQBANKING_DEBUG"));
    }

    #[test]
    fn env_bad_backend() {
        let result = BankingConfig::from_lookup(lookup(&[("AQBANKING_BACKEND", "hbci4java")]));
        assert!(matches!(result, Err(BankingError::Configuration(_))));
    }

    #[test]
    fn debug_env_sets_three_levels() {
        let config = BankingConfig {
            enable_debug_logging: true,
            ..BankingConfig::default()
        };
        assert_eq!(
            config.debug_env(),
            vec![
                ("GWEN_LOGLEVEL", "info"),
                ("AQBANKING_LOGLEVEL", "info"),
                ("AQHBCI_LOGLEVEL", "info"),
            ]
        );
    }

    #[test]
    fn json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "bankCode": "12030000",
                "userId": "erika",
                "pin": "",
                "serverUrl": "https://banking.example/fints",
                "fintsImplementation": "python",
                "pythonPath": "/usr/bin/python3",
                "aqBankingUserName": "erika-hbci"
            }}"#
        )
        .unwrap();
        let config = BankingConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.bank_code, "12030000");
        assert!(config.pin.is_none());
        assert_eq!(config.backend, BackendKind::Script);
        assert_eq!(config.python_path, "/usr/bin/python3");
        assert_eq!(config.aqbanking_user_name.as_deref(), Some("erika-hbci"));
        assert_eq!(config.hbci_version, "300");
    }

    #[test]
    fn json_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let result = BankingConfig::from_json_file(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(BankingError::Io(_))));
    }

    #[test]
    fn require_login() {
        assert!(BankingConfig::new("37040044", "max").require_login().is_ok());
        assert!(matches!(
            BankingConfig::new(" ", "max").require_login(),
            Err(BankingError::Configuration(_))
        ));
        assert!(BankingConfig::new("37040044", "").require_login().is_err());
    }

    #[test]
    fn blank_bank_code_is_none() {
        assert_eq!(BankingConfig::new("", "x").bank_code(), None);
        assert_eq!(BankingConfig::new("123", "x").bank_code(), Some("123"));
    }
}
