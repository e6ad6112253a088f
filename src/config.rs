use crate::error::{BalanceSheetError, Result};
use ::config::{Config, Environment, File, FileFormat};
use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of environment overrides, e.g. `BALANCE_SHEET_BACKEND_URL`.
pub const ENV_PREFIX: &str = "BALANCE_SHEET";

/// Limits and collaborator settings for a workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Maximum number of companies in one workspace.
    pub max_companies: usize,
    /// Maximum number of balance sheets per company.
    pub max_sheets_per_company: usize,
    /// Year used for new sheets when there is nothing to count from.
    /// Falls back to the current calendar year.
    pub default_year: Option<i32>,
    /// Base URL of the upload/analysis and problem service.
    pub backend_url: String,
    /// Directory used by file-backed storage.
    pub storage_dir: Option<PathBuf>,
    /// Largest |assets - liabilities - equity| still treated as balanced.
    pub equation_tolerance: f64,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            max_companies: 5,
            max_sheets_per_company: 10,
            default_year: None,
            backend_url: "http://localhost:8080/api".to_string(),
            storage_dir: None,
            equation_tolerance: 1e-6,
        }
    }
}

impl WorkspaceConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a JSON config file, then layers `BALANCE_SHEET_*` environment
    /// variables over it.
    pub fn load(path: &Path) -> Result<Self> {
        Self::layered(Some(path), Environment::with_prefix(ENV_PREFIX))
    }

    /// Defaults with `BALANCE_SHEET_*` environment variables applied.
    pub fn from_env() -> Result<Self> {
        Self::layered(None, Environment::with_prefix(ENV_PREFIX))
    }

    fn layered(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Json));
        }
        let settings = builder.add_source(env.try_parsing(true)).build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_companies == 0 {
            return Err(BalanceSheetError::Config(
                "max_companies must be at least 1".to_string(),
            ));
        }
        if self.max_sheets_per_company == 0 {
            return Err(BalanceSheetError::Config(
                "max_sheets_per_company must be at least 1".to_string(),
            ));
        }
        if self.equation_tolerance.is_nan() || self.equation_tolerance < 0.0 {
            return Err(BalanceSheetError::Config(format!(
                "equation_tolerance {} must be a non-negative number",
                self.equation_tolerance
            )));
        }
        if self.max_companies > 26 {
            return Err(BalanceSheetError::Config(format!(
                "max_companies {} exceeds the 26 available company letters",
                self.max_companies
            )));
        }
        Ok(())
    }

    pub fn effective_default_year(&self) -> i32 {
        self.default_year.unwrap_or_else(|| Local::now().year())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkspaceConfig::default();
        assert_eq!(config.max_companies, 5);
        assert_eq!(config.max_sheets_per_company, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = WorkspaceConfig::from_json_str(r#"{ "default_year": 2020 }"#).unwrap();
        assert_eq!(config.effective_default_year(), 2020);
        assert_eq!(config.max_sheets_per_company, 10);
    }

    #[test]
    fn test_rejects_zero_limits() {
        let result = WorkspaceConfig::from_json_str(r#"{ "max_companies": 0 }"#);
        assert!(matches!(result, Err(BalanceSheetError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workspace.json");
        std::fs::write(&path, r#"{ "max_sheets_per_company": 3 }"#).unwrap();

        let config = WorkspaceConfig::load(&path).unwrap();
        assert_eq!(config.max_sheets_per_company, 3);
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workspace.json");
        std::fs::write(&path, r#"{ "max_companies": 3, "default_year": 2020 }"#).unwrap();

        let mut vars = ::config::Map::new();
        vars.insert("BALANCE_SHEET_MAX_COMPANIES".to_string(), "4".to_string());
        vars.insert(
            "BALANCE_SHEET_BACKEND_URL".to_string(),
            "https://api.example.com".to_string(),
        );
        let env = Environment::with_prefix(ENV_PREFIX).source(Some(vars));

        let config = WorkspaceConfig::layered(Some(&path), env).unwrap();
        assert_eq!(config.max_companies, 4);
        assert_eq!(config.default_year, Some(2020));
        assert_eq!(config.backend_url, "https://api.example.com");
        assert_eq!(config.max_sheets_per_company, 10);
    }

    #[test]
    fn test_layered_config_is_validated() {
        let mut vars = ::config::Map::new();
        vars.insert("BALANCE_SHEET_MAX_SHEETS_PER_COMPANY".to_string(), "0".to_string());
        let env = Environment::with_prefix(ENV_PREFIX).source(Some(vars));

        let result = WorkspaceConfig::layered(None, env);
        assert!(matches!(result, Err(BalanceSheetError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = WorkspaceConfig::load(Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(BalanceSheetError::Settings(_))));
    }
}
