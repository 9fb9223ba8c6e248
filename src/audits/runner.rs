//! Audit runner
//!
//! Runs every configured audit concurrently on the tokio runtime and turns
//! each `AuditProduct` into a normalized `AuditResult`.
//!
//! Isolation rules:
//! - missing or failed required artifacts, audit errors and panics become
//!   error results (score `None`) and the run continues
//! - a score outside `[0, 1]` or a non-finite score is a broken audit and
//!   aborts the whole run

use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::{Audit, AuditContext, AuditMeta, AuditProduct, AuditRegistry, RawScore};
use crate::artifacts::Artifacts;
use crate::computed::ComputedCache;
use crate::config::{ReportConfig, Settings};
use crate::error::{panic_message, AuditError, ConfigError};
use crate::models::{AuditResult, ScoreDisplayMode, PASS_THRESHOLD};
use crate::report::Timer;

/// Progress callback: (audit id, done, total)
pub type ProgressCallback = Box<dyn Fn(&str, usize, usize) + Send + Sync>;

/// An audit paired with its effective options
#[derive(Clone)]
pub struct ConfiguredAudit {
    pub audit: Arc<dyn Audit>,
    pub options: Value,
}

/// Counts of one runner pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditSummary {
    pub audits_run: usize,
    pub scored: usize,
    pub passed: usize,
    pub not_applicable: usize,
    pub unscored: usize,
    pub errors: usize,
    pub duration_ms: u64,
}

impl AuditSummary {
    pub fn add_result(&mut self, result: &AuditResult) {
        self.audits_run += 1;
        match result.score_display_mode {
            ScoreDisplayMode::Binary | ScoreDisplayMode::Numeric => {
                self.scored += 1;
                if result.passed() {
                    self.passed += 1;
                }
            }
            ScoreDisplayMode::NotApplicable => self.not_applicable += 1,
            ScoreDisplayMode::Error => self.errors += 1,
            ScoreDisplayMode::Informative | ScoreDisplayMode::Manual => self.unscored += 1,
        }
    }
}

/// Results in configured order plus summary counts
#[derive(Debug, Clone)]
pub struct AuditRunOutput {
    pub results: IndexMap<String, AuditResult>,
    pub summary: AuditSummary,
}

/// Shallow merge: keys from `overrides` win over `defaults`.
/// A non-object override replaces the defaults entirely.
pub fn merge_options(defaults: &Value, overrides: Option<&Value>) -> Value {
    match (defaults, overrides) {
        (_, None) | (_, Some(Value::Null)) => defaults.clone(),
        (Value::Object(base), Some(Value::Object(extra))) => {
            let mut merged = base.clone();
            for (key, value) in extra {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        (_, Some(other)) => other.clone(),
    }
}

fn round_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}

/// Validate a raw score for a display mode.
///
/// Unscored modes always yield `None`. Scored modes accept a bool (coerced
/// to 1/0) or a finite number in `[0, 1]`, rounded to two decimals.
fn normalize_score(
    audit_id: &str,
    raw: RawScore,
    mode: ScoreDisplayMode,
) -> Result<Option<f64>, AuditError> {
    let value = match raw {
        RawScore::Null => None,
        RawScore::Bool(passed) => Some(if passed { 1.0 } else { 0.0 }),
        RawScore::Number(n) => {
            if !n.is_finite() {
                return Err(AuditError::InvalidScore {
                    audit_id: audit_id.to_string(),
                    score: n.to_string(),
                });
            }
            if n > 1.0 {
                return Err(AuditError::ScoreAboveOne {
                    audit_id: audit_id.to_string(),
                });
            }
            if n < 0.0 {
                return Err(AuditError::ScoreBelowZero {
                    audit_id: audit_id.to_string(),
                });
            }
            Some(n)
        }
    };

    if !mode.is_scored() {
        return Ok(None);
    }
    match value {
        Some(score) => Ok(Some(round_score(score))),
        None => Err(AuditError::InvalidScore {
            audit_id: audit_id.to_string(),
            score: "null".to_string(),
        }),
    }
}

/// Turn an audit product into a result.
///
/// `Err` means the audit broke its contract and the run must stop.
pub fn make_audit_result(meta: &AuditMeta, product: AuditProduct) -> Result<AuditResult, AuditError> {
    if let Some(message) = product.error_message {
        return Ok(AuditResult::error(
            &meta.id,
            &meta.title,
            &meta.description,
            message,
        ));
    }

    let mode = if product.not_applicable {
        ScoreDisplayMode::NotApplicable
    } else {
        product.score_display_mode.unwrap_or(meta.score_display_mode)
    };
    let score = normalize_score(&meta.id, product.score, mode)?;

    let title = match (score, &meta.failure_title) {
        (Some(s), Some(failure_title)) if s < PASS_THRESHOLD => failure_title.clone(),
        _ => meta.title.clone(),
    };

    Ok(AuditResult {
        id: meta.id.clone(),
        title,
        description: meta.description.clone(),
        score,
        score_display_mode: mode,
        numeric_value: product.numeric_value,
        numeric_unit: product.numeric_unit,
        display_value: product.display_value,
        explanation: product.explanation,
        error_message: None,
        warnings: product.warnings,
        details: product.details,
    })
}

/// Run a single audit with artifact checks and error isolation
pub async fn run_audit(
    audit: &dyn Audit,
    artifacts: &Artifacts,
    context: &AuditContext,
) -> Result<AuditResult, AuditError> {
    let meta = audit.meta();

    for name in &meta.required_artifacts {
        if let Err(e) = artifacts.check(name) {
            debug!("Audit {} skipped: {}", meta.id, e);
            return Ok(AuditResult::error(
                &meta.id,
                &meta.title,
                &meta.description,
                e.to_string(),
            ));
        }
    }

    match audit.audit(artifacts, context).await {
        Ok(product) => make_audit_result(meta, product),
        Err(e) => {
            warn!("Audit {} failed: {:#}", meta.id, e);
            Ok(AuditResult::error(
                &meta.id,
                &meta.title,
                &meta.description,
                format!("{:#}", e),
            ))
        }
    }
}

/// Runs configured audits concurrently
#[derive(Default)]
pub struct AuditRunner {
    audits: Vec<ConfiguredAudit>,
    progress_callback: Option<ProgressCallback>,
}

impl AuditRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every audit the config names, with merged options
    pub fn from_config(registry: &AuditRegistry, config: &ReportConfig) -> Result<Self, ConfigError> {
        let mut runner = Self::new();
        for id in config.audit_ids() {
            let audit = registry
                .get(&id)
                .ok_or_else(|| ConfigError::UnregisteredAudit(id.clone()))?;
            let options = merge_options(&audit.default_options(), config.audit_options(&id));
            runner.register(audit, options);
        }
        Ok(runner)
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn register(&mut self, audit: Arc<dyn Audit>, options: Value) {
        self.audits.push(ConfiguredAudit { audit, options });
    }

    pub fn audit_count(&self) -> usize {
        self.audits.len()
    }

    pub fn audit_ids(&self) -> Vec<&str> {
        self.audits.iter().map(|c| c.audit.meta().id.as_str()).collect()
    }

    /// Run every audit. Results keep registration order regardless of
    /// completion order.
    pub async fn run(
        &self,
        artifacts: Arc<Artifacts>,
        settings: Arc<Settings>,
        cache: Arc<ComputedCache>,
        timer: &Timer,
    ) -> Result<AuditRunOutput, AuditError> {
        let start = Instant::now();
        let total = self.audits.len();
        info!("Running {} audits", total);

        let mut handles = Vec::with_capacity(total);
        for configured in &self.audits {
            let audit = Arc::clone(&configured.audit);
            let artifacts = Arc::clone(&artifacts);
            let context = AuditContext {
                settings: Arc::clone(&settings),
                computed: Arc::clone(&cache),
                options: configured.options.clone(),
                gather_mode: artifacts.gather_mode(),
            };
            let timer = timer.clone();

            let handle = tokio::spawn(async move {
                let mark = timer.start(format!("audit:{}", audit.meta().id));
                let result = run_audit(audit.as_ref(), &artifacts, &context).await;
                timer.end(mark);
                result
            });
            handles.push((Arc::clone(&configured.audit), handle));
        }

        let mut results = IndexMap::with_capacity(total);
        let mut summary = AuditSummary::default();
        let mut pending = handles.into_iter();

        while let Some((audit, handle)) = pending.next() {
            let meta = audit.meta();
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    let message = if join_error.is_panic() {
                        panic_message(join_error.into_panic().as_ref())
                    } else {
                        join_error.to_string()
                    };
                    error!("Audit {} panicked: {}", meta.id, message);
                    Ok(AuditResult::error(
                        &meta.id,
                        &meta.title,
                        &meta.description,
                        format!("Panic: {}", message),
                    ))
                }
            };

            let result = match outcome {
                Ok(result) => result,
                Err(fatal) => {
                    error!("Aborting run: {}", fatal);
                    for (_, remaining) in pending {
                        remaining.abort();
                    }
                    return Err(fatal);
                }
            };

            let done = results.len() + 1;
            if let Some(ref callback) = self.progress_callback {
                callback(&meta.id, done, total);
            }

            summary.add_result(&result);
            results.insert(meta.id.clone(), result);
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Audits complete: {}/{} scored audits passed, {} errors, {} not applicable in {:?}",
            summary.passed,
            summary.scored,
            summary.errors,
            summary.not_applicable,
            start.elapsed()
        );

        Ok(AuditRunOutput { results, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Returns a fixed product after an optional delay
    struct FixedAudit {
        meta: AuditMeta,
        product: AuditProduct,
        delay_ms: u64,
    }

    impl FixedAudit {
        fn new(id: &str, product: AuditProduct) -> Self {
            Self {
                meta: AuditMeta::new(id, format!("{} passes", id), "")
                    .failure_title(format!("{} fails", id)),
                product,
                delay_ms: 0,
            }
        }

        fn delayed(mut self, delay_ms: u64) -> Self {
            self.delay_ms = delay_ms;
            self
        }

        fn requiring(mut self, artifacts: &[&str]) -> Self {
            self.meta = self.meta.requires(artifacts);
            self
        }
    }

    #[async_trait]
    impl Audit for FixedAudit {
        fn meta(&self) -> &AuditMeta {
            &self.meta
        }

        async fn audit(&self, _artifacts: &Artifacts, _ctx: &AuditContext) -> anyhow::Result<AuditProduct> {
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            Ok(self.product.clone())
        }
    }

    struct FailingAudit {
        meta: AuditMeta,
    }

    #[async_trait]
    impl Audit for FailingAudit {
        fn meta(&self) -> &AuditMeta {
            &self.meta
        }

        async fn audit(&self, _artifacts: &Artifacts, _ctx: &AuditContext) -> anyhow::Result<AuditProduct> {
            anyhow::bail!("trace was empty")
        }
    }

    struct PanickingAudit {
        meta: AuditMeta,
    }

    #[async_trait]
    impl Audit for PanickingAudit {
        fn meta(&self) -> &AuditMeta {
            &self.meta
        }

        async fn audit(&self, _artifacts: &Artifacts, _ctx: &AuditContext) -> anyhow::Result<AuditProduct> {
            panic!("index out of bounds")
        }
    }

    /// Echoes its options back as details
    struct OptionsAudit {
        meta: AuditMeta,
    }

    #[async_trait]
    impl Audit for OptionsAudit {
        fn meta(&self) -> &AuditMeta {
            &self.meta
        }

        fn default_options(&self) -> Value {
            json!({"p10": 1, "median": 2})
        }

        async fn audit(&self, _artifacts: &Artifacts, ctx: &AuditContext) -> anyhow::Result<AuditProduct> {
            Ok(AuditProduct::new(true).with_details(ctx.options.clone()))
        }
    }

    fn context() -> AuditContext {
        AuditContext {
            settings: Arc::new(Settings::default()),
            computed: Arc::new(ComputedCache::new()),
            options: Value::Null,
            gather_mode: Default::default(),
        }
    }

    async fn run_all(runner: &AuditRunner, artifacts: Artifacts) -> Result<AuditRunOutput, AuditError> {
        runner
            .run(
                Arc::new(artifacts),
                Arc::new(Settings::default()),
                Arc::new(ComputedCache::new()),
                &Timer::new(),
            )
            .await
    }

    fn meta(id: &str) -> AuditMeta {
        AuditMeta::new(id, id, "")
    }

    #[test]
    fn test_bool_scores_are_coerced() {
        let pass = make_audit_result(&meta("a"), AuditProduct::new(true)).unwrap();
        let fail = make_audit_result(&meta("a"), AuditProduct::new(false)).unwrap();
        assert_eq!(pass.score, Some(1.0));
        assert_eq!(fail.score, Some(0.0));
    }

    #[test]
    fn test_out_of_range_scores_are_fatal() {
        let above = make_audit_result(&meta("a"), AuditProduct::new(1.5)).unwrap_err();
        assert_eq!(above, AuditError::ScoreAboveOne { audit_id: "a".to_string() });

        let below = make_audit_result(&meta("a"), AuditProduct::new(-0.1)).unwrap_err();
        assert_eq!(below, AuditError::ScoreBelowZero { audit_id: "a".to_string() });

        let nan = make_audit_result(&meta("a"), AuditProduct::new(f64::NAN));
        assert!(matches!(nan, Err(AuditError::InvalidScore { .. })));
    }

    #[test]
    fn test_null_score_in_scored_mode_is_fatal() {
        let err = make_audit_result(&meta("a"), AuditProduct::new(RawScore::Null)).unwrap_err();
        assert!(matches!(err, AuditError::InvalidScore { .. }));
    }

    #[test]
    fn test_scores_are_rounded() {
        let numeric = meta("a").display_mode(ScoreDisplayMode::Numeric);
        let result = make_audit_result(&numeric, AuditProduct::new(0.876)).unwrap();
        assert_eq!(result.score, Some(0.88));
    }

    #[test]
    fn test_not_applicable_has_null_score() {
        let result = make_audit_result(&meta("a"), AuditProduct::not_applicable()).unwrap();
        assert_eq!(result.score, None);
        assert_eq!(result.score_display_mode, ScoreDisplayMode::NotApplicable);
    }

    #[test]
    fn test_unscored_modes_drop_the_score() {
        let manual = meta("a").display_mode(ScoreDisplayMode::Manual);
        let result = make_audit_result(&manual, AuditProduct::unscored()).unwrap();
        assert_eq!(result.score, None);

        let informative = make_audit_result(
            &meta("a"),
            AuditProduct::new(1.0).with_mode(ScoreDisplayMode::Informative),
        )
        .unwrap();
        assert_eq!(informative.score, None);
        assert_eq!(informative.score_display_mode, ScoreDisplayMode::Informative);
    }

    #[test]
    fn test_error_message_makes_error_result() {
        let result =
            make_audit_result(&meta("a"), AuditProduct::new(1.0).with_error("no trace")).unwrap();
        assert_eq!(result.score_display_mode, ScoreDisplayMode::Error);
        assert_eq!(result.score, None);
        assert_eq!(result.error_message.as_deref(), Some("no trace"));
    }

    #[test]
    fn test_failure_title_below_threshold() {
        let m = meta("a").failure_title("a fails");
        assert_eq!(make_audit_result(&m, AuditProduct::new(0.89)).unwrap().title, "a fails");
        assert_eq!(make_audit_result(&m, AuditProduct::new(0.9)).unwrap().title, "a");
    }

    #[test]
    fn test_merge_options() {
        let defaults = json!({"p10": 1, "median": 2});
        assert_eq!(merge_options(&defaults, None), defaults);
        assert_eq!(
            merge_options(&defaults, Some(&json!({"median": 5}))),
            json!({"p10": 1, "median": 5})
        );
        assert_eq!(merge_options(&Value::Null, Some(&json!({"x": 1}))), json!({"x": 1}));
    }

    #[tokio::test]
    async fn test_missing_artifact_gives_error_result() {
        let audit = FixedAudit::new("a", AuditProduct::new(true)).requiring(&["MetaElements"]);
        let result = run_audit(&audit, &Artifacts::default(), &context()).await.unwrap();
        assert_eq!(result.score_display_mode, ScoreDisplayMode::Error);
        assert_eq!(
            result.error_message.as_deref(),
            Some("Required MetaElements gatherer did not run.")
        );
    }

    #[tokio::test]
    async fn test_gatherer_error_gives_error_result() {
        let mut artifacts = Artifacts::default();
        artifacts.insert_error("MetaElements", "protocol timeout");
        let audit = FixedAudit::new("a", AuditProduct::new(true)).requiring(&["MetaElements"]);
        let result = run_audit(&audit, &artifacts, &context()).await.unwrap();
        assert_eq!(
            result.error_message.as_deref(),
            Some("Required MetaElements gatherer encountered an error: protocol timeout")
        );
    }

    #[tokio::test]
    async fn test_results_keep_configured_order() {
        let mut runner = AuditRunner::new();
        runner.register(
            Arc::new(FixedAudit::new("slow", AuditProduct::new(true)).delayed(40)),
            Value::Null,
        );
        runner.register(Arc::new(FixedAudit::new("fast", AuditProduct::new(false))), Value::Null);

        let output = run_all(&runner, Artifacts::default()).await.unwrap();
        let ids: Vec<&str> = output.results.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["slow", "fast"]);
        assert_eq!(output.results["fast"].title, "fast fails");
        assert_eq!(output.summary.scored, 2);
        assert_eq!(output.summary.passed, 1);
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let mut runner = AuditRunner::new();
        runner.register(Arc::new(FailingAudit { meta: meta("broken") }), Value::Null);
        runner.register(Arc::new(PanickingAudit { meta: meta("panics") }), Value::Null);
        runner.register(Arc::new(FixedAudit::new("ok", AuditProduct::new(true))), Value::Null);

        let output = run_all(&runner, Artifacts::default()).await.unwrap();
        assert_eq!(output.results["broken"].error_message.as_deref(), Some("trace was empty"));
        assert_eq!(output.results["broken"].score, None);
        assert_eq!(
            output.results["panics"].error_message.as_deref(),
            Some("Panic: index out of bounds")
        );
        assert_eq!(output.results["ok"].score, Some(1.0));
        assert_eq!(output.summary.errors, 2);
    }

    #[tokio::test]
    async fn test_invalid_score_aborts_run() {
        let mut runner = AuditRunner::new();
        runner.register(Arc::new(FixedAudit::new("ok", AuditProduct::new(true))), Value::Null);
        runner.register(Arc::new(FixedAudit::new("bad", AuditProduct::new(1.5))), Value::Null);

        let err = run_all(&runner, Artifacts::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "audit score for bad is > 1");
    }

    #[tokio::test]
    async fn test_from_config_merges_options() {
        let config = ReportConfig::from_toml_str(
            r#"
            [categories.cat]
            title = "Cat"
            audit_refs = [{ id = "opts", weight = 1 }]

            [audits.opts]
            options = { median = 9 }
            "#,
        )
        .unwrap();
        let mut registry = AuditRegistry::new();
        registry.register(Arc::new(OptionsAudit { meta: meta("opts") }));

        let runner = AuditRunner::from_config(&registry, &config).unwrap();
        assert_eq!(runner.audit_ids(), vec!["opts"]);

        let output = run_all(&runner, Artifacts::default()).await.unwrap();
        assert_eq!(output.results["opts"].details, Some(json!({"p10": 1, "median": 9})));
    }

    #[tokio::test]
    async fn test_progress_callback_sees_every_audit() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let mut runner = AuditRunner::new().with_progress_callback(Box::new(move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        runner.register(Arc::new(FixedAudit::new("a", AuditProduct::new(true))), Value::Null);
        runner.register(Arc::new(FixedAudit::new("b", AuditProduct::new(true))), Value::Null);

        run_all(&runner, Artifacts::default()).await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
