use aggregate::{rank, EntityMeta, EntityReport, EntitySummary, RunTotals};
use crawl::{Browser, Convergence, PageTraversal};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::{RunConfig, Target};
use crate::metrics::{Metrics, TimedOperation};

/// Why one entity produced no report. The run moves on to the next one.
#[derive(Debug, thiserror::Error)]
pub enum EntityFailure {
    #[error("navigation to {url} failed: {cause:#}")]
    Navigation { url: String, cause: anyhow::Error },

    #[error("traversal of {url} failed: {cause:#}")]
    Traversal { url: String, cause: anyhow::Error },

    #[error("report for {entity} could not be written: {cause:#}")]
    Persist { entity: String, cause: anyhow::Error },
}

#[derive(Debug, Clone)]
pub struct ProcessedEntity {
    pub summary: EntitySummary,
    pub report: EntityReport,
    pub report_path: PathBuf,
    pub convergence: Convergence,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedEntity {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub ranking: Vec<EntitySummary>,
    pub totals: RunTotals,
    pub failures: Vec<FailedEntity>,
    pub report_paths: Vec<PathBuf>,
}

pub struct Pipeline {
    traversal: PageTraversal,
    run: RunConfig,
    metrics: Arc<Metrics>,
}

impl Pipeline {
    pub fn new(traversal: PageTraversal, run: RunConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            traversal,
            run,
            metrics,
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Traverse one entity page, aggregate its reviews and write the report.
    pub async fn process_entity<B: Browser + ?Sized>(
        &self,
        browser: &mut B,
        target: &Target,
    ) -> Result<ProcessedEntity, EntityFailure> {
        let timer = TimedOperation::start();

        // Step 1: Load the page
        self.traversal
            .open(browser, &target.url)
            .await
            .map_err(|cause| EntityFailure::Navigation {
                url: target.url.clone(),
                cause,
            })?;

        let name = match &target.name {
            Some(name) => name.clone(),
            None => self.traversal.read_entity_name(browser).await,
        };
        info!(entity = %name, url = %target.url, "Processing entity");

        // Step 2: Scroll and extract
        let outcome = self
            .traversal
            .collect(browser)
            .await
            .map_err(|cause| EntityFailure::Traversal {
                url: target.url.clone(),
                cause,
            })?;

        // Step 3: Aggregate
        let meta = EntityMeta {
            name: name.clone(),
            source_url: target.url.clone(),
            extracted_at: chrono::Local::now().naive_local(),
        };
        let summary = EntitySummary::from_records(meta, &outcome.records);
        let report = EntityReport::build(&summary, &outcome.records);

        // Step 4: Persist
        let report_path = report
            .write(&self.run.output_dir, chrono::Utc::now().timestamp())
            .await
            .map_err(|cause| EntityFailure::Persist {
                entity: name.clone(),
                cause,
            })?;

        self.metrics
            .record_entity(timer.elapsed(), outcome.records.len(), outcome.skipped, outcome.failed);

        info!(
            entity = %name,
            elements = outcome.elements_found,
            total = summary.total_count,
            positive = summary.positive_count,
            negative = summary.negative_count,
            neutral = summary.neutral_count,
            positive_pct = summary.positive_percentage,
            scroll_attempts = outcome.convergence.attempts(),
            "Entity processed"
        );

        Ok(ProcessedEntity {
            summary,
            report,
            report_path,
            convergence: outcome.convergence,
        })
    }

    /// Process targets one after another. A failed entity is logged and
    /// counted; it never stops the run.
    pub async fn run<B: Browser + ?Sized>(&self, browser: &mut B, targets: &[Target]) -> RunReport {
        let limit = self.run.max_entities.unwrap_or(targets.len()).min(targets.len());
        let targets = &targets[..limit];

        let mut summaries = Vec::new();
        let mut report_paths = Vec::new();
        let mut failures = Vec::new();

        for (index, target) in targets.iter().enumerate() {
            info!(entity = index + 1, of = targets.len(), url = %target.url, "Starting entity");

            match self.process_entity(browser, target).await {
                Ok(processed) => {
                    summaries.push(processed.summary);
                    report_paths.push(processed.report_path);
                }
                Err(e) => {
                    warn!(url = %target.url, error = %e, "Entity skipped");
                    self.metrics.record_entity_failure();
                    failures.push(FailedEntity {
                        url: target.url.clone(),
                        reason: e.to_string(),
                    });
                }
            }

            if index + 1 < targets.len() {
                self.traversal.pause(self.run.inter_entity_pause_ms).await;
            }
        }

        RunReport {
            totals: RunTotals::from_summaries(&summaries),
            ranking: rank(summaries),
            failures,
            report_paths,
        }
    }
}

/// Run every target on `browser`, then quit it.
///
/// The run happens on its own task so that `quit` is reached even when the
/// run panics. The panic is resumed once the session is released.
pub async fn run_and_release<B: Browser + 'static>(
    pipeline: Arc<Pipeline>,
    browser: Arc<Mutex<B>>,
    targets: Vec<Target>,
) -> anyhow::Result<RunReport> {
    let session = browser.clone();
    let handle = tokio::spawn(async move {
        let mut browser = session.lock().await;
        pipeline.run(&mut *browser, &targets).await
    });

    let outcome = handle.await;

    if let Err(e) = browser.lock().await.quit().await {
        warn!(error = %e, "Failed to close browser session");
    }

    match outcome {
        Ok(report) => Ok(report),
        Err(e) if e.is_panic() => {
            error!("Run panicked; browser session released");
            std::panic::resume_unwind(e.into_panic())
        }
        Err(e) => Err(anyhow::anyhow!("Run task did not complete: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawl::clock::RecordingSleeper;
    use crawl::testing::ScriptedBrowser;
    use crawl::TraversalConfig;
    use extract::{ExtractionConfig, RawElement, ReviewExtractor};
    use sentiment::{Lexicon, ScoringPolicy, SentimentAnalyzer};
    use std::time::Duration;

    fn pipeline(output_dir: PathBuf, sleeper: Arc<RecordingSleeper>, max_entities: Option<usize>) -> Pipeline {
        let analyzer = SentimentAnalyzer::new(Lexicon::builtin().unwrap(), ScoringPolicy::strict()).unwrap();
        let extractor = ReviewExtractor::new(&ExtractionConfig::default(), Arc::new(analyzer)).unwrap();
        let config = TraversalConfig {
            initial_settle_ms: 0,
            scroll_wait_ms: 0,
            post_scroll_settle_ms: 0,
            element_pause_ms: 0,
            min_primary_elements: 1,
            ..Default::default()
        };
        let run = RunConfig {
            output_dir,
            inter_entity_pause_ms: 5000,
            max_entities,
        };
        Pipeline::new(PageTraversal::new(config, extractor, sleeper), run, Metrics::new())
    }

    fn review(text: &str, full_stars: usize) -> RawElement {
        let stars: String = (0..5)
            .map(|i| if i < full_stars { r#"<span class="_full"></span>"# } else { r#"<span class="_empty"></span>"# })
            .collect();
        RawElement::new(
            format!(
                r#"<div class="business-review-view">
                     <div class="business-rating-badge-view__stars">{}</div>
                     <span class="business-review-view__body-text">{}</span>
                   </div>"#,
                stars, text
            ),
            text,
        )
    }

    fn page() -> ScriptedBrowser {
        ScriptedBrowser::new()
            .with_heights(vec![2000])
            .with_elements(
                ".business-review-view",
                vec![
                    review("Очень вкусно и уютно, вернёмся", 5),
                    review("Грязно, грубо и очень долго", 1),
                    review("Обычное кафе возле дома", 0),
                    RawElement::new(r#"<div class="business-review-view">Ок</div>"#, "Ок"),
                ],
            )
            .with_elements("h1.orgpage-header-view__header", vec![RawElement::new("", "Кафе Пушкин")])
    }

    #[tokio::test]
    async fn test_process_entity_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path().to_path_buf(), Arc::new(RecordingSleeper::new()), None);
        let mut browser = page();
        let target = Target {
            name: None,
            url: "https://example.test/org/1".to_string(),
        };

        let processed = pipeline.process_entity(&mut browser, &target).await.unwrap();

        assert_eq!(processed.summary.entity_name, "Кафе Пушкин");
        assert_eq!(processed.summary.total_count, 3);
        assert_eq!(processed.summary.positive_count, 1);
        assert_eq!(processed.summary.negative_count, 1);
        assert_eq!(processed.summary.neutral_count, 1);
        assert_eq!(processed.convergence, Convergence::Stable { attempts: 0 });
        assert!(processed.report_path.starts_with(dir.path()));

        let file = processed.report_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(file.starts_with("reviews_Кафе_Пушкин_"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&processed.report_path).unwrap()).unwrap();
        assert_eq!(json["sentiment_analysis"]["total_comments"], 3);
        assert_eq!(json["user_comments"]["review_0"]["stars"], 5.0);

        let snapshot = pipeline.metrics().snapshot();
        assert_eq!(snapshot.entities_processed, 1);
        assert_eq!(snapshot.elements_skipped, 1);
    }

    #[tokio::test]
    async fn test_run_ranks_and_pauses_between_entities() {
        let dir = tempfile::tempdir().unwrap();
        let sleeper = Arc::new(RecordingSleeper::new());
        let pipeline = pipeline(dir.path().to_path_buf(), sleeper.clone(), None);
        let mut browser = page();
        let targets = vec![
            Target::new("Первое", "https://example.test/1"),
            Target::new("Второе", "https://example.test/2"),
        ];

        let report = pipeline.run(&mut browser, &targets).await;

        assert_eq!(report.ranking.len(), 2);
        assert_eq!(report.ranking[0].entity_name, "Первое");
        assert_eq!(report.totals.total_reviews, 6);
        assert_eq!(report.report_paths.len(), 2);
        assert!(report.failures.is_empty());
        assert_eq!(sleeper.waits(), vec![Duration::from_millis(5000)]);
        assert_eq!(browser.visited(), &["https://example.test/1", "https://example.test/2"]);
    }

    #[tokio::test]
    async fn test_run_honours_max_entities() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path().to_path_buf(), Arc::new(RecordingSleeper::new()), Some(1));
        let mut browser = page();
        let targets = vec![
            Target::new("A", "https://example.test/a"),
            Target::new("B", "https://example.test/b"),
        ];

        let report = pipeline.run(&mut browser, &targets).await;

        assert_eq!(report.ranking.len(), 1);
        assert_eq!(browser.visited().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_entities_do_not_stop_run() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path().to_path_buf(), Arc::new(RecordingSleeper::new()), None);
        let mut browser = page().failing_navigation();
        let targets = vec![
            Target::new("A", "https://example.test/a"),
            Target::new("B", "https://example.test/b"),
        ];

        let report = pipeline.run(&mut browser, &targets).await;

        assert_eq!(report.failures.len(), 2);
        assert!(report.failures[0].reason.starts_with("navigation to https://example.test/a failed"));
        assert!(report.ranking.is_empty());
        assert_eq!(report.totals, RunTotals::default());
        assert_eq!(pipeline.metrics().snapshot().entities_failed, 2);
    }

    #[tokio::test]
    async fn test_run_and_release_quits_browser() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Arc::new(pipeline(dir.path().to_path_buf(), Arc::new(RecordingSleeper::new()), None));
        let browser = Arc::new(Mutex::new(page()));

        let report = run_and_release(pipeline, browser.clone(), vec![Target::new("A", "https://example.test/a")])
            .await
            .unwrap();

        assert_eq!(report.ranking.len(), 1);
        assert_eq!(browser.lock().await.quit_calls(), 1);
    }

    #[tokio::test]
    async fn test_run_and_release_quits_browser_after_panic() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Arc::new(pipeline(dir.path().to_path_buf(), Arc::new(RecordingSleeper::new()), None));
        let browser = Arc::new(Mutex::new(page().panicking_navigation()));
        let targets = vec![Target::new("A", "https://example.test/a")];

        let joined = tokio::spawn(run_and_release(pipeline, browser.clone(), targets)).await;

        assert!(joined.unwrap_err().is_panic());
        assert_eq!(browser.lock().await.quit_calls(), 1);
    }

    #[tokio::test]
    async fn test_unwritable_output_is_persist_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, "not a directory").unwrap();
        let pipeline = pipeline(blocked, Arc::new(RecordingSleeper::new()), None);
        let mut browser = page();

        let err = pipeline
            .process_entity(&mut browser, &Target::new("A", "https://example.test/a"))
            .await
            .unwrap_err();

        assert!(matches!(err, EntityFailure::Persist { ref entity, .. } if entity == "A"));
    }
}
