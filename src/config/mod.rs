use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::AppError;

/// Default YAML config file read from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Values read from the YAML config file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tenant_id: Option<String>,
    pub api_version: Option<String>,
    pub csv_headers_file_path: Option<String>,
    pub csv_data_file_path: Option<String>,
    pub report_template_name: Option<String>,
    pub findings_layout_name: Option<String>,
    pub export_dir: Option<String>,
    pub log_dir: Option<String>,
    pub max_input_attempts: Option<u32>,
    pub dry_run: Option<bool>,
}

impl FileConfig {
    pub fn from_yaml(data: &str) -> Result<Self, AppError> {
        serde_yaml::from_str(data).map_err(|e| AppError::Config(format!("Invalid config YAML: {e}")))
    }

    /// Read the file if it exists; a missing file yields an empty config.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }
}

/// Run configuration: YAML file values overridden by `IMPORT_*` environment variables.
///
/// Empty strings count as absent, so the pipeline falls back to prompting.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tenant_id: Option<String>,
    pub api_version: Option<String>,
    pub csv_headers_file_path: Option<PathBuf>,
    pub csv_data_file_path: Option<PathBuf>,
    pub report_template_name: Option<String>,
    pub findings_layout_name: Option<String>,
    pub export_dir: PathBuf,
    pub log_dir: PathBuf,
    pub max_input_attempts: u32,
    pub dry_run: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_sources(FileConfig::default(), |_| None)
    }
}

impl AppConfig {
    /// Load `IMPORT_CONFIG_FILE` (default `config.yaml`) and apply env overrides.
    pub fn load() -> Result<Self, AppError> {
        let path = env::var("IMPORT_CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let file = FileConfig::load(Path::new(&path))?;
        Ok(Self::from_sources(file, |key| env::var(key).ok()))
    }

    /// Merge file values with overrides from `lookup` (normally the environment).
    pub fn from_sources<F>(file: FileConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |key: &str, fallback: Option<String>| {
            non_empty(lookup(key)).or_else(|| non_empty(fallback))
        };

        Self {
            base_url: pick("IMPORT_BASE_URL", file.base_url),
            username: pick("IMPORT_USERNAME", file.username),
            password: pick("IMPORT_PASSWORD", file.password),
            tenant_id: pick("IMPORT_TENANT_ID", file.tenant_id),
            api_version: pick("IMPORT_API_VERSION", file.api_version),
            csv_headers_file_path: pick("IMPORT_CSV_HEADERS_FILE_PATH", file.csv_headers_file_path)
                .map(PathBuf::from),
            csv_data_file_path: pick("IMPORT_CSV_DATA_FILE_PATH", file.csv_data_file_path)
                .map(PathBuf::from),
            report_template_name: pick("IMPORT_REPORT_TEMPLATE_NAME", file.report_template_name),
            findings_layout_name: pick("IMPORT_FINDINGS_LAYOUT_NAME", file.findings_layout_name),
            export_dir: pick("IMPORT_EXPORT_DIR", file.export_dir)
                .unwrap_or_else(|| "exported-ptracs".to_string())
                .into(),
            log_dir: pick("IMPORT_LOG_DIR", file.log_dir)
                .unwrap_or_else(|| "logs".to_string())
                .into(),
            max_input_attempts: lookup("IMPORT_MAX_INPUT_ATTEMPTS")
                .and_then(|v| v.parse().ok())
                .or(file.max_input_attempts)
                .filter(|n| *n > 0)
                .unwrap_or(3),
            dry_run: lookup("IMPORT_DRY_RUN")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                .or(file.dry_run)
                .unwrap_or(false),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = AppConfig::default();
        assert!(config.api_version.is_none());
        assert_eq!(config.export_dir, PathBuf::from("exported-ptracs"));
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.max_input_attempts, 3);
        assert!(!config.dry_run);
    }

    #[test]
    fn yaml_values_are_read() {
        let file = FileConfig::from_yaml(
            "api_version: 1.61.0\ncsv_headers_file_path: mapping.csv\nreport_template_name: Standard\n",
        )
        .unwrap();
        let config = AppConfig::from_sources(file, |_| None);
        assert_eq!(config.api_version.as_deref(), Some("1.61.0"));
        assert_eq!(config.csv_headers_file_path, Some(PathBuf::from("mapping.csv")));
        assert_eq!(config.report_template_name.as_deref(), Some("Standard"));
    }

    #[test]
    fn env_overrides_yaml() {
        let file = FileConfig::from_yaml("api_version: 1.0.0\nmax_input_attempts: 5\n").unwrap();
        let config = AppConfig::from_sources(
            file,
            env_of(&[
                ("IMPORT_API_VERSION", "2.0.0"),
                ("IMPORT_DRY_RUN", "true"),
                ("IMPORT_TENANT_ID", "42"),
            ]),
        );
        assert_eq!(config.api_version.as_deref(), Some("2.0.0"));
        assert_eq!(config.max_input_attempts, 5);
        assert_eq!(config.tenant_id.as_deref(), Some("42"));
        assert!(config.dry_run);
    }

    #[test]
    fn empty_values_count_as_absent() {
        let file = FileConfig::from_yaml("api_version: ''\nfindings_layout_name: Layout\n").unwrap();
        let config = AppConfig::from_sources(file, env_of(&[("IMPORT_FINDINGS_LAYOUT_NAME", "")]));
        assert!(config.api_version.is_none());
        assert_eq!(config.findings_layout_name.as_deref(), Some("Layout"));
    }

    #[test]
    fn zero_attempts_falls_back_to_default() {
        let config = AppConfig::from_sources(
            FileConfig::default(),
            env_of(&[("IMPORT_MAX_INPUT_ATTEMPTS", "0")]),
        );
        assert_eq!(config.max_input_attempts, 3);
    }

    #[test]
    fn invalid_yaml_is_config_error() {
        let err = FileConfig::from_yaml("api_version: [unclosed").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn missing_file_is_empty_config() {
        let config = FileConfig::load(Path::new("/nonexistent/config.yaml")).unwrap();
        assert!(config.base_url.is_none());
    }
}
