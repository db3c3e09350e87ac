use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::providers::github::DEFAULT_API_URL;
use crate::timeline::{JobKeywords, JobMatchPolicy};

/// Configuration file structure for DORALens.
///
/// Lets a team keep organisation, pipeline selection and analysis settings
/// next to the repository instead of repeating them on every run. Values
/// given on the command line take precedence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub azure: AzureConfig,

    /// Commit lookups for GitHub-hosted sources
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub output: OutputConfig,

    /// Timeline heuristic and collection tuning
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AzureConfig {
    pub organization: Option<String>,

    pub project: Option<String>,

    /// Azure DevOps base URL
    #[serde(default = "default_azure_base_url")]
    pub base_url: String,

    /// Build definition ids; take precedence over `pipeline-names`
    #[serde(default)]
    pub pipeline_ids: Vec<u64>,

    /// Comma separated name fragments
    pub pipeline_names: Option<String>,

    #[serde(default = "default_days")]
    pub days: u32,

    /// Branch ref to filter builds by; empty disables the filter
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Personal access token
    pub pat: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitHubConfig {
    pub token: Option<String>,

    /// GitHub API base URL, change for GitHub Enterprise Server
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// `owner/repo` used for every commit lookup
    pub repo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,

    /// Directory the reports are written to
    pub directory: Option<PathBuf>,

    /// Prefix for output file names, e.g. `email-queue-`
    #[serde(default)]
    pub prefix: String,

    /// Logical application name written to every CSV row
    #[serde(default)]
    pub app: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AnalysisConfig {
    #[serde(default)]
    pub keywords: JobKeywords,

    #[serde(default)]
    pub match_policy: JobMatchPolicy,

    /// Builds analyzed in parallel
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            organization: None,
            project: None,
            base_url: default_azure_base_url(),
            pipeline_ids: Vec::new(),
            pipeline_names: None,
            days: default_days(),
            branch: default_branch(),
            pat: None,
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_github_api_url(),
            repo: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Csv,
            pretty: false,
            directory: None,
            prefix: String::new(),
            app: String::new(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            keywords: JobKeywords::default(),
            match_policy: JobMatchPolicy::default(),
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

fn default_azure_base_url() -> String {
    "https://dev.azure.com".to_string()
}

fn default_github_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_days() -> u32 {
    90
}

fn default_branch() -> String {
    "refs/heads/main".to_string()
}

fn default_concurrency() -> usize {
    crate::providers::azure::provider::DEFAULT_CONCURRENCY
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

const CANDIDATES: [&str; 4] = ["doralens.toml", "doralens.json", "doralens.yaml", "doralens.yml"];

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./doralens.toml
    /// 3. ./doralens.json
    /// 4. ./doralens.yaml
    /// 5. ./doralens.yml
    /// 6. `<user config dir>/doralens/config.toml`
    ///
    /// Returns default configuration if no file is found. A specified path
    /// that cannot be read is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let user_config = dirs::config_dir().map(|dir| dir.join("doralens").join("config.toml"));

        match discover(Path::new("."), user_config) {
            Some(found) => {
                log::debug!("Using config file {}", found.display());
                Self::load_from_path(&found)
            }
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => {
                // Try TOML first, then JSON, then YAML
                toml::from_str(&contents)
                    .or_else(|_| serde_json::from_str(&contents))
                    .or_else(|_| serde_yaml::from_str(&contents))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))
            }
        }
    }
}

/// First existing config candidate in `dir`, then `user_config`.
fn discover(dir: &Path, user_config: Option<PathBuf>) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|candidate| dir.join(candidate))
        .chain(user_config)
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.azure.base_url, "https://dev.azure.com");
        assert_eq!(config.azure.days, 90);
        assert_eq!(config.azure.branch, "refs/heads/main");
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.output.format, OutputFormat::Csv);
        assert_eq!(config.analysis.concurrency, 8);
        assert_eq!(config.analysis.timeout_secs, 60);
        assert_eq!(config.analysis.match_policy, JobMatchPolicy::FirstInTimeline);
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        let toml_content = r#"
[azure]
organization = "contoso"
project = "web"
pipeline-ids = [12, 7]
days = 30
branch = ""

[github]
repo = "acme/app"
api-url = "https://ghe.example.com/api/v3"

[output]
format = "json"
prefix = "email-queue-"
app = "email-queue"

[analysis]
match-policy = "latest-attempt"
concurrency = 2

[analysis.keywords]
swap = "promote"
"#;
        write!(temp_file, "{toml_content}").unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.azure.organization.as_deref(), Some("contoso"));
        assert_eq!(config.azure.pipeline_ids, vec![12, 7]);
        assert_eq!(config.azure.days, 30);
        assert_eq!(config.azure.branch, "");
        assert_eq!(config.azure.base_url, "https://dev.azure.com");
        assert_eq!(config.github.repo.as_deref(), Some("acme/app"));
        assert_eq!(config.github.api_url, "https://ghe.example.com/api/v3");
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.prefix, "email-queue-");
        assert_eq!(config.analysis.match_policy, JobMatchPolicy::LatestAttempt);
        assert_eq!(config.analysis.concurrency, 2);
        assert_eq!(config.analysis.keywords.swap, "promote");
        assert_eq!(config.analysis.keywords.validate, "validate");
    }

    #[test]
    fn test_load_json_config() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let json_content = r#"{
  "azure": {
    "organization": "contoso",
    "pipeline-names": "web-deploy"
  },
  "output": {
    "format": "csv",
    "pretty": true
  }
}"#;
        write!(temp_file, "{json_content}").unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.azure.pipeline_names.as_deref(), Some("web-deploy"));
        assert_eq!(config.output.format, OutputFormat::Csv);
        assert!(config.output.pretty);
        assert_eq!(config.analysis.max_retries, 3);
    }

    #[test]
    fn test_load_yaml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        write!(
            temp_file,
            "azure:\n  project: web\n  days: 14\nanalysis:\n  timeout-secs: 10\n"
        )
        .unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.azure.project.as_deref(), Some("web"));
        assert_eq!(config.azure.days, 14);
        assert_eq!(config.analysis.timeout_secs, 10);
    }

    #[test]
    fn test_explicit_missing_config_is_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("nonexistent.toml");
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_invalid_config_is_error() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(temp_file, "[azure\norganization = ").unwrap();
        assert!(Config::load_from_path(temp_file.path()).is_err());
    }

    #[test]
    fn test_discover_prefers_local_candidates() {
        let temp_dir = tempfile::tempdir().unwrap();
        let user_dir = tempfile::tempdir().unwrap();
        let user_config = user_dir.path().join("config.toml");
        std::fs::write(&user_config, "[azure]\nproject = \"user\"\n").unwrap();

        assert_eq!(
            discover(temp_dir.path(), Some(user_config.clone())),
            Some(user_config.clone())
        );

        let local = temp_dir.path().join("doralens.yml");
        std::fs::write(&local, "azure:\n  project: local\n").unwrap();
        assert_eq!(discover(temp_dir.path(), Some(user_config)), Some(local.clone()));

        let config = Config::load_from_path(&local).unwrap();
        assert_eq!(config.azure.project.as_deref(), Some("local"));
    }

    #[test]
    fn test_discover_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert_eq!(discover(temp_dir.path(), None), None);
    }
}
