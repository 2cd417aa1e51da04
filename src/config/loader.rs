//! Configuration Loader
//!
//! Environment-aware configuration loading: YAML file discovery, environment
//! detection, environment-specific override merging and `${VAR}` expansion.

use super::error::{ConfigResult, ConfigurationError};
use super::ReconcilerConfig;
use serde_yaml::Value as YamlValue;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const CONFIG_FILE_NAMES: [&str; 2] = ["status-reconciler.yaml", "status-reconciler.yml"];
const ENVIRONMENT_SECTIONS: [&str; 3] = ["development", "test", "production"];

/// Loaded configuration together with where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: ReconcilerConfig,
    environment: String,
    config_file: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let config_file = Self::find_config_file(&config_directory)?;
        let mut config = Self::load_and_merge_config(&config_file, environment)?;
        Self::expand_environment_variables(&mut config)?;

        config.validate()?;

        debug!(
            "Configuration loaded successfully: {}",
            serde_json::to_string_pretty(&Self::sanitize_config_for_logging(&config))
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );

        info!(
            environment = environment,
            config_file = %config_file.display(),
            provider = %config.provider.http.name,
            multiplicity = config.schedule.multiplicity,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_file,
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Get the current environment
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Get the file the configuration was read from
    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Get sanitized configuration for debugging/logging that masks sensitive fields
    pub fn debug_config(&self) -> serde_json::Value {
        Self::sanitize_config_for_logging(&self.config)
    }

    /// Detect current environment from environment variables
    fn detect_environment() -> String {
        env::var("RECONCILER_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn find_config_file(config_directory: &Path) -> ConfigResult<PathBuf> {
        let mut searched_paths = Vec::new();

        for name in CONFIG_FILE_NAMES {
            let config_path = config_directory.join(name);
            searched_paths.push(config_path.clone());

            if config_path.is_file() {
                debug!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        Err(ConfigurationError::config_file_not_found(searched_paths))
    }

    /// Load and merge configuration with environment-specific overrides
    fn load_and_merge_config(
        config_file: &Path,
        environment: &str,
    ) -> ConfigResult<ReconcilerConfig> {
        let yaml_content = std::fs::read_to_string(config_file).map_err(|e| {
            ConfigurationError::file_read_error(config_file.display().to_string(), e)
        })?;

        let mut yaml_data: YamlValue = serde_yaml::from_str(&yaml_content)
            .map_err(|e| ConfigurationError::invalid_yaml(config_file.display().to_string(), e))?;

        if let Some(env_overrides) = yaml_data
            .get(YamlValue::String(environment.to_string()))
            .cloned()
        {
            debug!("Applying environment-specific overrides for: {}", environment);
            Self::merge_yaml_values(&mut yaml_data, env_overrides);
        }

        if let YamlValue::Mapping(ref mut map) = yaml_data {
            for section in ENVIRONMENT_SECTIONS {
                map.remove(YamlValue::String(section.to_string()));
            }
        }

        let mut config: ReconcilerConfig = serde_yaml::from_value(yaml_data).map_err(|e| {
            ConfigurationError::invalid_yaml(
                config_file.display().to_string(),
                format!("Failed to deserialize configuration: {e}"),
            )
        })?;

        config.environment = environment.to_string();

        Ok(config)
    }

    /// Recursively merge YAML values (environment overrides into base config)
    fn merge_yaml_values(base: &mut YamlValue, override_value: YamlValue) {
        match (&mut *base, override_value) {
            (YamlValue::Mapping(base_map), YamlValue::Mapping(override_map)) => {
                for (key, value) in override_map {
                    if let Some(existing_value) = base_map.get_mut(&key) {
                        Self::merge_yaml_values(existing_value, value);
                    } else {
                        base_map.insert(key, value);
                    }
                }
            }
            (base_ref, override_val) => {
                *base_ref = override_val;
            }
        }
    }

    /// Expand `${VAR}` placeholders in the database URL and provider API key
    fn expand_environment_variables(config: &mut ReconcilerConfig) -> ConfigResult<()> {
        config.database.url = Self::expand_placeholder(&config.database.url, true)?;

        if let Some(api_key) = config.provider.http.api_key.take() {
            let expanded = Self::expand_placeholder(&api_key, false)?;
            if Self::placeholder_variable(&expanded).is_some() {
                warn!("Provider API key is not set, requests are sent unauthenticated");
            } else {
                config.provider.http.api_key = Some(expanded);
            }
        }

        Ok(())
    }

    fn placeholder_variable(value: &str) -> Option<&str> {
        value
            .strip_prefix("${")
            .and_then(|rest| rest.strip_suffix('}'))
    }

    fn expand_placeholder(value: &str, required: bool) -> ConfigResult<String> {
        let Some(var_name) = Self::placeholder_variable(value) else {
            return Ok(value.to_string());
        };

        match env::var(var_name) {
            Ok(env_value) => {
                debug!("Expanding environment variable {}", var_name);
                Ok(env_value)
            }
            Err(_) if required => Err(ConfigurationError::environment_variable_error(
                var_name,
                "variable is not set",
            )),
            Err(_) => {
                warn!(
                    "Environment variable {} not found, keeping original value",
                    var_name
                );
                Ok(value.to_string())
            }
        }
    }

    /// Sanitize configuration for safe logging by masking sensitive fields
    fn sanitize_config_for_logging(config: &ReconcilerConfig) -> serde_json::Value {
        let mut config_json = serde_json::json!(config);
        let sensitive_patterns = ["password", "secret", "api_key", "token", "url"];
        Self::sanitize_json_recursive(&mut config_json, &sensitive_patterns);
        config_json
    }

    fn sanitize_json_recursive(value: &mut serde_json::Value, sensitive_patterns: &[&str]) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key_lower = key.to_lowercase();
                    let is_sensitive = sensitive_patterns
                        .iter()
                        .any(|pattern| key_lower.contains(pattern));

                    if is_sensitive && val.is_string() {
                        *val = serde_json::Value::String("[MASKED]".to_string());
                    } else {
                        Self::sanitize_json_recursive(val, sensitive_patterns);
                    }
                }
            }
            serde_json::Value::Array(arr) => {
                for item in arr.iter_mut() {
                    Self::sanitize_json_recursive(item, sensitive_patterns);
                }
            }
            _ => {}
        }
    }
}
