use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::error::{AppError, Result};
use crate::domain::export_job::ExportFormat;

pub const DEFAULT_CONFIG_FILE: &str = "taas.toml";
pub const CONFIG_PATH_ENV: &str = "TAAS_CONFIG";

const DEFAULT_CLASS_LIST_URL: &str =
    "https://raw.githubusercontent.com/brianguida/cise-taas/main/TAAS%20input%20SP%2025%2010.22.24.csv";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub survey: SurveyConfig,
    pub storage: StorageConfig,
    pub class_list: ClassListConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    pub api_token: Option<String>,
    pub data_center: String,
    pub survey_id: String,
    pub format: ExportFormat,
    pub poll_interval_ms: u64,
    /// Give up after this many progress checks. Unset polls until a terminal status.
    pub max_poll_attempts: Option<u32>,
    /// Give up once this much time has passed since the export was initiated.
    pub max_poll_seconds: Option<u64>,
    pub request_timeout_secs: u64,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            data_center: "yul1".to_string(),
            survey_id: "SV_5gMaPpNjF7lFKbs".to_string(),
            format: ExportFormat::Csv,
            poll_interval_ms: 1000,
            max_poll_attempts: None,
            max_poll_seconds: None,
            request_timeout_secs: 60,
        }
    }
}

impl SurveyConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_poll_duration(&self) -> Option<Duration> {
        self.max_poll_seconds.map(Duration::from_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub extract_dir: PathBuf,
    /// Stable name of the "current" student dataset inside `data_dir`
    pub dataset_file: String,
    /// Column holding the student email in the dataset
    pub email_field: String,
    pub selections_file: String,
    /// Copy each freshly extracted CSV onto the current dataset and reload lookups
    pub promote_exports: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./public/data"),
            extract_dir: PathBuf::from("./responses"),
            dataset_file: "StudentResponses.csv".to_string(),
            email_field: "shib_mail".to_string(),
            selections_file: "FacultyResponses.csv".to_string(),
            promote_exports: true,
        }
    }
}

impl StorageConfig {
    pub fn dataset_path(&self) -> PathBuf {
        self.data_dir.join(&self.dataset_file)
    }

    pub fn selections_path(&self) -> PathBuf {
        self.data_dir.join(&self.selections_file)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassListConfig {
    pub url: String,
}

impl Default for ClassListConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_CLASS_LIST_URL.to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the TOML file, then `TAAS_*` env vars (`__` separates sections).
    /// `BEARER_TOKEN` and `PORT` are honoured for older deployments.
    pub fn figment(config_path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(config_path))
            .merge(Env::raw().only(&["BEARER_TOKEN"]).map(|_| "survey.api_token".into()))
            .merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()))
            .merge(Env::prefixed("TAAS_").ignore(&["CONFIG"]).split("__"))
    }

    pub fn load() -> Result<Self> {
        let config_path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config: AppConfig = Self::figment(config_path)
            .extract()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AppError::ConfigError("server.port must be non-zero".into()));
        }
        if self.survey.survey_id.trim().is_empty() {
            return Err(AppError::ConfigError("survey.survey_id is empty".into()));
        }
        if self.survey.data_center.trim().is_empty() {
            return Err(AppError::ConfigError("survey.data_center is empty".into()));
        }
        if self.storage.dataset_file.trim().is_empty() || self.storage.selections_file.trim().is_empty()
        {
            return Err(AppError::ConfigError(
                "storage.dataset_file and storage.selections_file must be set".into(),
            ));
        }
        if self.survey.api_token.as_deref().map_or(true, |t| t.trim().is_empty()) {
            warn!("No survey API token configured; exports will be rejected by the platform");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_values() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.survey.data_center, "yul1");
        assert_eq!(config.survey.poll_interval(), Duration::from_secs(1));
        assert!(config.survey.max_poll_attempts.is_none());
        assert_eq!(
            config.storage.selections_path(),
            PathBuf::from("./public/data/FacultyResponses.csv")
        );
    }

    #[test]
    fn test_toml_and_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "taas.toml",
                r#"
                [survey]
                survey_id = "SV_from_file"
                max_poll_attempts = 30

                [storage]
                data_dir = "/srv/taas"
                "#,
            )?;
            jail.set_env("TAAS_SERVER__PORT", "8080");
            jail.set_env("BEARER_TOKEN", "secret");

            let config = AppConfig::load_from(Path::new("taas.toml")).expect("config loads");
            assert_eq!(config.survey.survey_id, "SV_from_file");
            assert_eq!(config.survey.max_poll_attempts, Some(30));
            assert_eq!(config.survey.api_token.as_deref(), Some("secret"));
            assert_eq!(config.server.port, 8080);
            assert_eq!(
                config.storage.dataset_path(),
                PathBuf::from("/srv/taas/StudentResponses.csv")
            );
            Ok(())
        });
    }

    #[test]
    fn test_prefixed_env_overrides_legacy_token() {
        Jail::expect_with(|jail| {
            jail.set_env("BEARER_TOKEN", "legacy");
            jail.set_env("TAAS_SURVEY__API_TOKEN", "preferred");
            let config = AppConfig::load_from(Path::new("missing.toml")).expect("config loads");
            assert_eq!(config.survey.api_token.as_deref(), Some("preferred"));
            Ok(())
        });
    }

    #[test]
    fn test_non_delimited_export_format_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("TAAS_SURVEY__FORMAT", "json");
            let result = AppConfig::load_from(Path::new("missing.toml"));
            assert!(matches!(result, Err(AppError::ConfigError(_))));

            jail.set_env("TAAS_SURVEY__FORMAT", "tsv");
            let config = AppConfig::load_from(Path::new("missing.toml")).expect("config loads");
            assert_eq!(config.survey.format, ExportFormat::Tsv);
            Ok(())
        });
    }

    #[test]
    fn test_empty_survey_id_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("TAAS_SURVEY__SURVEY_ID", "");
            let result = AppConfig::load_from(Path::new("missing.toml"));
            assert!(matches!(result, Err(AppError::ConfigError(_))));
            Ok(())
        });
    }
}
