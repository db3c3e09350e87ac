use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};

use crate::commits::CommitResolver;
use crate::dora::{DeliveryEvents, DoraMetrics, ResolvedCommit};
use crate::error::{DoraLensError, Result};
use crate::insights::DoraInsights;
use crate::output::PhaseProgress;
use crate::providers::azure::links::RunLinks;
use crate::providers::azure::types::{Build, PipelineDefinition};
use crate::providers::PipelineClient;
use crate::time::TimeWindow;
use crate::timeline::{BuildClassification, TimelineAnalyzer};

pub const DEFAULT_CONCURRENCY: usize = 8;

/// Per-run collection settings.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub app: String,
    pub organization: String,
    pub project: String,
    /// Branch filter sent to the build listing; `None` lists every branch
    pub branch: Option<String>,
    pub days: u32,
    pub concurrency: usize,
}

#[derive(Debug, Default)]
struct BuildOutcome {
    classification: BuildClassification,
    commit: Option<ResolvedCommit>,
}

/// Azure DevOps DORA provider.
///
/// Lists builds of the selected pipeline definitions, classifies every build
/// timeline and resolves commit times for the builds that deployed, then
/// hands the events to the metrics engine.
pub struct AzureProvider<C> {
    client: Arc<C>,
    resolver: Box<dyn CommitResolver>,
    analyzer: TimelineAnalyzer,
    links: RunLinks,
}

/// Lowercased, trimmed, non-empty name fragments from a comma separated list.
pub fn parse_name_filters(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl<C: PipelineClient> AzureProvider<C> {
    pub fn new(
        client: Arc<C>,
        resolver: Box<dyn CommitResolver>,
        analyzer: TimelineAnalyzer,
        links: RunLinks,
    ) -> Self {
        Self {
            client,
            resolver,
            analyzer,
            links,
        }
    }

    /// Picks the pipeline definitions to report on.
    ///
    /// Explicit ids win over name fragments. Ids whose details cannot be
    /// fetched are kept without a name. Name fragments match case-insensitively
    /// anywhere in the definition name; the result is sorted by id.
    ///
    /// # Errors
    ///
    /// Returns an error when neither ids nor names are given, when listing
    /// definitions fails, or when no definition matches the names.
    pub async fn resolve_definitions(
        &self,
        ids: &[u64],
        names: &[String],
    ) -> Result<Vec<PipelineDefinition>> {
        if !ids.is_empty() {
            let mut ids = ids.to_vec();
            ids.sort_unstable();
            ids.dedup();

            let lookups = ids.into_iter().map(|id| async move {
                match self.client.get_definition(id).await {
                    Ok(definition) => definition,
                    Err(e) => {
                        debug!("[DEFINITION] id={id} details unavailable: {e}");
                        PipelineDefinition {
                            id,
                            name: String::new(),
                        }
                    }
                }
            });
            return Ok(futures::future::join_all(lookups).await);
        }

        if names.is_empty() {
            return Err(DoraLensError::Config(
                "provide --pipeline-ids or --pipeline-names".to_string(),
            ));
        }

        let mut matched: Vec<PipelineDefinition> = self
            .client
            .list_definitions(None)
            .await?
            .into_iter()
            .filter(|d| {
                let name = d.name.to_lowercase();
                names.iter().any(|fragment| name.contains(fragment.as_str()))
            })
            .collect();

        matched.sort_by_key(|d| d.id);
        matched.dedup_by_key(|d| d.id);

        if matched.is_empty() {
            return Err(DoraLensError::NoMatchingDefinitions(names.join(", ")));
        }

        info!(
            "Matched {} pipeline definitions: {:?}",
            matched.len(),
            matched.iter().map(|d| d.id).collect::<Vec<_>>()
        );
        Ok(matched)
    }

    async fn analyze_build(&self, build: &Build) -> BuildOutcome {
        let records = match self.client.get_timeline(build.id).await {
            Ok(records) => records,
            Err(e) => {
                debug!("[TIMELINE] build={} timeline unavailable: {e}", build.id);
                return BuildOutcome::default();
            }
        };

        let classification = self.analyzer.classify(build.id, &records);

        let commit = if classification.deployment.is_some() {
            self.resolver
                .commit_time(build)
                .await
                .zip(build.commit_id())
                .map(|(committed_at, sha)| ResolvedCommit {
                    build_id: build.id,
                    commit_id: sha.to_string(),
                    committed_at,
                })
        } else {
            None
        };

        BuildOutcome {
            classification,
            commit,
        }
    }

    fn into_events(outcomes: Vec<BuildOutcome>) -> DeliveryEvents {
        let mut events = outcomes
            .into_iter()
            .fold(DeliveryEvents::default(), |mut events, outcome| {
                events.deployments.extend(outcome.classification.deployment);
                events.failures.extend(outcome.classification.failure);
                events.commits.extend(outcome.commit);
                events
            });

        events.deployments.sort_by_key(|d| (d.when, d.build_id));
        events.failures.sort_by_key(|f| (f.when, f.build_id));
        events.commits.sort_by_key(|c| c.build_id);
        events
    }

    /// Collects the DORA report for `definitions` over the last
    /// `options.days` days before `now`.
    ///
    /// Progress is displayed in three phases:
    /// 1. Listing builds in the window
    /// 2. Classifying each build timeline and resolving commit times
    /// 3. Computing the four metrics
    ///
    /// # Errors
    ///
    /// An out-of-range window or a failed build listing aborts collection.
    /// Timeline and commit lookups that fail leave the affected build out of
    /// the metrics that needed them.
    pub async fn collect_insights(
        &self,
        definitions: Vec<PipelineDefinition>,
        options: &CollectOptions,
        now: DateTime<Utc>,
    ) -> Result<DoraInsights> {
        let window = TimeWindow::last_days(now, options.days)?;
        let ids: Vec<u64> = definitions.iter().map(|d| d.id).collect();

        info!(
            "Collecting DORA metrics for {}/{} pipelines {ids:?} from {} to {}",
            options.organization, options.project, window.since, window.until
        );

        // Phase 1: Listing builds
        let progress = PhaseProgress::start_phase_1();

        let builds = self
            .client
            .list_builds(&ids, &window, options.branch.as_deref())
            .await?;

        if builds.is_empty() {
            warn!("No builds found for pipelines {ids:?} in the window");
        }

        // Phase 2: Analyzing timelines
        let progress = progress.finish_phase_1_start_phase_2(builds.len());
        let tracker = &progress;

        let outcomes: Vec<BuildOutcome> = stream::iter(&builds)
            .map(|build| async move {
                let outcome = self.analyze_build(build).await;
                tracker.inc();
                outcome
            })
            .buffer_unordered(options.concurrency.max(1))
            .collect()
            .await;

        let events = Self::into_events(outcomes);
        debug!(
            "[COLLECT] deployments={} failures={} commits={}",
            events.deployments.len(),
            events.failures.len(),
            events.commits.len()
        );

        // Phase 3: Computing metrics
        let progress =
            progress.finish_phase_2_start_phase_3(events.deployments.len(), events.failures.len());

        let metrics = DoraMetrics::compute(&events, &window, &self.links);

        let insights = DoraInsights {
            provider: "Azure DevOps".to_string(),
            app: options.app.clone(),
            organization: options.organization.clone(),
            project: options.project.clone(),
            pipelines: definitions,
            branch: options.branch.clone(),
            window,
            collected_at: now,
            total_builds: builds.len(),
            metrics,
        };

        progress.finish_phase_3();

        Ok(insights)
    }
}
