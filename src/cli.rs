use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AzureCredentials, Token};
use crate::commits::ProviderCommitResolver;
use crate::config::{Config, OutputFormat};
use crate::output;
use crate::providers::azure::provider::parse_name_filters;
use crate::providers::azure::{AzureDevOpsClient, AzureProvider, CollectOptions, HttpSettings};
use crate::providers::github::GitHubClient;
use crate::timeline::{JobKeywords, JobMatchPolicy, TimelineAnalyzer};

#[derive(Parser)]
#[command(name = "doralens")]
#[command(author, version, about = "DORA metrics from Azure DevOps build timelines", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./doralens.{toml,json,yaml,yml})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the generated reports
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, value_enum)]
    format: Option<OutputFormat>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    /// Log lookups and skipped builds
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect DORA metrics from Azure DevOps pipelines
    Azure(AzureArgs),
}

#[derive(Args, Default)]
struct AzureArgs {
    #[arg(long)]
    org: Option<String>,

    #[arg(long)]
    project: Option<String>,

    #[arg(long)]
    base_url: Option<String>,

    /// Build definition ids, comma separated
    #[arg(long, value_delimiter = ',')]
    pipeline_ids: Vec<u64>,

    /// Names or substrings of build definitions, comma separated
    #[arg(long)]
    pipeline_names: Option<String>,

    #[arg(long)]
    days: Option<u32>,

    /// Branch ref to filter builds by; pass an empty value to disable
    #[arg(long)]
    branch: Option<String>,

    #[arg(long, env = "AZDO_PAT", hide_env_values = true)]
    pat: Option<String>,

    #[arg(long, env = "AZDO_BEARER", hide_env_values = true)]
    bearer_token: Option<String>,

    #[arg(long, env = "SYSTEM_ACCESSTOKEN", hide = true)]
    system_access_token: Option<String>,

    /// GitHub token for commit timestamps
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Override owner/repo for commit lookup, e.g. "org/app-repo"
    #[arg(long, env = "GITHUB_REPO")]
    github_repo: Option<String>,

    #[arg(long)]
    github_api_url: Option<String>,

    /// Logical application name for the reports
    #[arg(long)]
    app: Option<String>,

    /// Prefix for output file names, e.g. "email-queue-"
    #[arg(long)]
    out_prefix: Option<String>,

    /// Builds analyzed in parallel
    #[arg(long)]
    concurrency: Option<usize>,

    #[arg(long, value_enum)]
    match_policy: Option<JobMatchPolicy>,
}

/// Settings for one Azure run after merging CLI, config file and defaults.
#[derive(Debug)]
struct AzureRun {
    organization: String,
    project: String,
    base_url: String,
    pipeline_ids: Vec<u64>,
    pipeline_names: Vec<String>,
    credentials: AzureCredentials,
    github_token: Option<Token>,
    github_repo: Option<String>,
    github_api_url: String,
    keywords: JobKeywords,
    match_policy: JobMatchPolicy,
    http: HttpSettings,
    collect: CollectOptions,
    format: OutputFormat,
    pretty: bool,
    output_dir: Option<PathBuf>,
    prefix: String,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl AzureArgs {
    fn resolve(&self, cli: &Cli, config: &Config) -> Result<AzureRun> {
        let Some(organization) = non_blank(self.org.as_deref())
            .or_else(|| non_blank(config.azure.organization.as_deref()))
        else {
            bail!("missing Azure DevOps organization: pass --org or set azure.organization");
        };
        let Some(project) = non_blank(self.project.as_deref())
            .or_else(|| non_blank(config.azure.project.as_deref()))
        else {
            bail!("missing Azure DevOps project: pass --project or set azure.project");
        };

        let pipeline_ids = if self.pipeline_ids.is_empty() {
            config.azure.pipeline_ids.clone()
        } else {
            self.pipeline_ids.clone()
        };
        let pipeline_names = self
            .pipeline_names
            .as_deref()
            .or(config.azure.pipeline_names.as_deref())
            .map(parse_name_filters)
            .unwrap_or_default();

        let pat = self.pat.as_deref().or(config.azure.pat.as_deref());
        let credentials = AzureCredentials::select(
            self.system_access_token.as_deref(),
            self.bearer_token.as_deref(),
            pat,
        )?;

        let branch = self
            .branch
            .as_deref()
            .unwrap_or(&config.azure.branch)
            .trim()
            .to_string();

        let analysis = &config.analysis;
        let http = HttpSettings {
            timeout: Duration::from_secs(analysis.timeout_secs),
            max_retries: analysis.max_retries,
            retry_delay: Duration::from_secs(analysis.retry_delay_secs),
        };

        let app = self.app.clone().unwrap_or_else(|| config.output.app.clone());

        Ok(AzureRun {
            collect: CollectOptions {
                app,
                organization: organization.clone(),
                project: project.clone(),
                branch: (!branch.is_empty()).then_some(branch),
                days: self.days.unwrap_or(config.azure.days),
                concurrency: self.concurrency.unwrap_or(analysis.concurrency).max(1),
            },
            organization,
            project,
            base_url: self
                .base_url
                .clone()
                .unwrap_or_else(|| config.azure.base_url.clone()),
            pipeline_ids,
            pipeline_names,
            credentials,
            github_token: non_blank(self.github_token.as_deref())
                .or_else(|| non_blank(config.github.token.as_deref()))
                .map(Token::from),
            github_repo: non_blank(self.github_repo.as_deref())
                .or_else(|| non_blank(config.github.repo.as_deref())),
            github_api_url: self
                .github_api_url
                .clone()
                .unwrap_or_else(|| config.github.api_url.clone()),
            keywords: analysis.keywords.clone(),
            match_policy: self.match_policy.unwrap_or(analysis.match_policy),
            http,
            format: cli.format.unwrap_or(config.output.format),
            pretty: cli.pretty || config.output.pretty,
            output_dir: cli.output.clone().or_else(|| config.output.directory.clone()),
            prefix: self
                .out_prefix
                .clone()
                .unwrap_or_else(|| config.output.prefix.clone()),
        })
    }
}

impl Cli {
    async fn execute_azure(&self, args: &AzureArgs) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let run = args.resolve(self, &config)?;

        info!(
            "Collecting DORA metrics for {}/{}",
            run.organization, run.project
        );

        let client = Arc::new(AzureDevOpsClient::new(
            &run.base_url,
            &run.organization,
            &run.project,
            run.credentials.clone(),
            run.http,
        )?);
        let github = GitHubClient::new(
            run.github_api_url.clone(),
            run.github_token.clone(),
            run.http.timeout,
        )?;
        let resolver = ProviderCommitResolver::new(Arc::clone(&client), github, run.github_repo.clone());

        let provider = AzureProvider::new(
            Arc::clone(&client),
            Box::new(resolver),
            TimelineAnalyzer::new(run.keywords.clone(), run.match_policy),
            client.run_links(),
        );

        let definitions = provider
            .resolve_definitions(&run.pipeline_ids, &run.pipeline_names)
            .await?;
        let insights = provider
            .collect_insights(definitions, &run.collect, Utc::now())
            .await?;

        match run.format {
            OutputFormat::Csv => {
                let dir = run.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
                let artifacts = output::write_csv_reports(&insights, &dir, &run.prefix)?;
                info!("Reports written to: {}", dir.display());
                output::print_summary(&insights, &artifacts);
            }
            OutputFormat::Json => {
                if let Some(dir) = &run.output_dir {
                    std::fs::create_dir_all(dir)
                        .with_context(|| format!("Failed to create {}", dir.display()))?;
                    let path = dir.join(format!("{}{}", run.prefix, output::JSON_REPORT_FILE));
                    let mut file = std::fs::File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    output::export_json(&insights, run.pretty, &mut file)?;
                    info!("Report written to: {}", path.display());
                } else {
                    output::export_json(&insights, run.pretty, &mut std::io::stdout().lock())?;
                }
            }
        }

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Azure(args) => self.execute_azure(args).await,
        }
    }
}
