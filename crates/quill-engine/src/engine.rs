//! Orchestration: both providers concurrently, merge, fall back, rank.

use crate::analysis::Analysis;
use crate::providers::{RemoteProvider, WorkerProvider};
use quill_adapters::config::Config;
use quill_core::suggest::fallback::{fallback_suggestions, is_fallback};
use quill_core::suggest::rank::rank;
use quill_core::suggest::{IdGenerator, ProviderModel, Suggestion, UuidIds, WritingFormat};
use quill_core::util::{char_len, estimate_tokens};
use quill_core::{SuggestionProvider, SuggestionRequest};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sentence sent by [`SuggestionEngine::health`]
pub const HEALTH_CHECK_TEXT: &str = "The quick brown fox jumps over the lazy dog.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub processing_time_ms: u64,
    pub model_used: ProviderModel,
    pub tokens_used: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionResponse {
    pub suggestions: Vec<Suggestion>,
    pub performance: PerformanceMetrics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub remote: bool,
    pub local: bool,
    pub processing_time_ms: u64,
    pub suggestions_generated: usize,
}

/// Runs the remote and local providers side by side and merges their output.
///
/// Every public call resolves to a list. Provider failures are absorbed by
/// the providers themselves; a provider that misses the deadline counts as
/// an empty result and its future is dropped.
#[derive(Clone)]
pub struct SuggestionEngine {
    remote: Arc<dyn SuggestionProvider>,
    local: Arc<dyn SuggestionProvider>,
    ids: Arc<dyn IdGenerator>,
    deadline: Duration,
}

impl SuggestionEngine {
    pub fn new(
        remote: Arc<dyn SuggestionProvider>,
        local: Arc<dyn SuggestionProvider>,
        deadline: Duration,
    ) -> Self {
        Self {
            remote,
            local,
            ids: Arc::new(UuidIds),
            deadline,
        }
    }

    /// Engine wired to the configured remote endpoint and worker
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let remote = RemoteProvider::from_config(config)?;
        let local = WorkerProvider::new(config.local.clone());
        Ok(Self::new(
            Arc::new(remote),
            Arc::new(local),
            config.provider_deadline(),
        ))
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    async fn bounded(
        &self,
        provider: &dyn SuggestionProvider,
        request: &SuggestionRequest,
    ) -> Vec<Suggestion> {
        match tokio::time::timeout(self.deadline, provider.suggest(request)).await {
            Ok(suggestions) => suggestions,
            Err(_) => {
                tracing::warn!(
                    model = provider.model().as_str(),
                    deadline_ms = self.deadline.as_millis() as u64,
                    "provider missed the deadline, treating as empty"
                );
                Vec::new()
            }
        }
    }

    /// Both providers' raw output, remote first
    async fn gather(&self, request: &SuggestionRequest) -> (Vec<Suggestion>, Vec<Suggestion>) {
        tokio::join!(
            self.bounded(self.remote.as_ref(), request),
            self.bounded(self.local.as_ref(), request)
        )
    }

    /// Ranked suggestions for `request`
    pub async fn suggest(&self, request: &SuggestionRequest) -> Vec<Suggestion> {
        let started = Instant::now();
        let (remote, local) = self.gather(request).await;
        let (remote_count, local_count) = (remote.len(), local.len());

        let mut merged = remote;
        merged.extend(local);
        let used_fallback = merged.is_empty();
        if used_fallback {
            merged = fallback_suggestions(&request.content);
        }

        let ranked = rank(merged, self.ids.as_ref());
        tracing::info!(
            chars = char_len(&request.content),
            remote = remote_count,
            local = local_count,
            used_fallback,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "suggestions ready"
        );
        ranked
    }

    pub async fn get_suggestions(&self, content: &str, format: WritingFormat) -> Vec<Suggestion> {
        self.suggest(&SuggestionRequest::new(content, format)).await
    }

    /// Suggestions plus timing and a token estimate for the caller
    pub async fn suggest_with_metrics(
        &self,
        content: &str,
        format: WritingFormat,
    ) -> SuggestionResponse {
        let started = Instant::now();
        let suggestions = self.get_suggestions(content, format).await;
        SuggestionResponse {
            suggestions,
            performance: PerformanceMetrics {
                processing_time_ms: started.elapsed().as_millis() as u64,
                model_used: ProviderModel::Hybrid,
                tokens_used: estimate_tokens(content),
            },
        }
    }

    pub async fn analyze(&self, content: &str, analysis: &Analysis) -> Vec<Suggestion> {
        let request = SuggestionRequest::new(content, analysis.format()).with_focus(analysis.focus());
        let mut suggestions = self.suggest(&request).await;
        if let Some(kind) = analysis.type_filter() {
            suggestions.retain(|s| s.suggestion_type == kind);
        }
        tracing::debug!(analysis = analysis.name(), kept = suggestions.len(), "analysis done");
        suggestions
    }

    /// Check both providers with a fixed sentence.
    ///
    /// A provider is healthy when it returned at least one suggestion that is
    /// not a fallback entry.
    pub async fn health(&self) -> HealthReport {
        let started = Instant::now();
        let request = SuggestionRequest::new(HEALTH_CHECK_TEXT, WritingFormat::Novel);
        let (remote, local) = self.gather(&request).await;

        let healthy = |list: &[Suggestion]| list.iter().any(|s| !is_fallback(s));
        let report = HealthReport {
            remote: healthy(&remote),
            local: healthy(&local),
            processing_time_ms: started.elapsed().as_millis() as u64,
            suggestions_generated: remote.len() + local.len(),
        };
        tracing::info!(remote = report.remote, local = report.local, "health check finished");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use pretty_assertions::assert_eq;
    use quill_core::suggest::{Position, SequentialIds, SuggestionMetadata, SuggestionType};

    const FOX: &str = "The quick brown fox jumps over the lazy dog.";

    struct StubProvider {
        model: ProviderModel,
        output: Vec<Suggestion>,
        delay: Option<Duration>,
    }

    impl StubProvider {
        fn returning(model: ProviderModel, output: Vec<Suggestion>) -> Arc<Self> {
            Arc::new(Self {
                model,
                output,
                delay: None,
            })
        }

        fn stalled(model: ProviderModel) -> Arc<Self> {
            Arc::new(Self {
                model,
                output: vec![stub("never", SuggestionType::Style, 1.0, model)],
                delay: Some(Duration::from_secs(30)),
            })
        }
    }

    impl SuggestionProvider for StubProvider {
        fn model(&self) -> ProviderModel {
            self.model
        }

        fn suggest<'a>(&'a self, _request: &'a SuggestionRequest) -> BoxFuture<'a, Vec<Suggestion>> {
            Box::pin(async move {
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                self.output.clone()
            })
        }
    }

    fn stub(text: &str, kind: SuggestionType, confidence: f64, model: ProviderModel) -> Suggestion {
        Suggestion::new(
            text,
            kind,
            "Stub",
            confidence,
            model,
            SuggestionMetadata {
                position: Position::new(4, 9),
                context: FOX.to_string(),
                original_text: "quick".to_string(),
            },
        )
    }

    fn engine(
        remote: Arc<StubProvider>,
        local: Arc<StubProvider>,
        deadline: Duration,
    ) -> SuggestionEngine {
        SuggestionEngine::new(remote, local, deadline)
            .with_id_generator(Arc::new(SequentialIds::default()))
    }

    fn texts(suggestions: &[Suggestion]) -> Vec<&str> {
        suggestions.iter().map(|s| s.text.as_str()).collect()
    }

    #[tokio::test]
    async fn test_both_empty_yields_fallback() {
        let engine = engine(
            StubProvider::returning(ProviderModel::Remote, vec![]),
            StubProvider::returning(ProviderModel::Local, vec![]),
            Duration::from_secs(5),
        );
        let suggestions = engine.get_suggestions(FOX, WritingFormat::Novel).await;

        let mut expected = fallback_suggestions(FOX);
        expected[0].id = Some("s-1".into());
        expected[1].id = Some("s-2".into());
        assert_eq!(suggestions, expected);
        assert_eq!(suggestions[0].position(), Position::new(0, 44));
    }

    #[tokio::test]
    async fn test_merge_keeps_remote_first_on_ties() {
        let engine = engine(
            StubProvider::returning(
                ProviderModel::Remote,
                vec![
                    stub("r1", SuggestionType::Style, 0.85, ProviderModel::Remote),
                    stub("r2", SuggestionType::Plot, 0.85, ProviderModel::Remote),
                ],
            ),
            StubProvider::returning(
                ProviderModel::Local,
                vec![
                    stub("l1", SuggestionType::Style, 0.85, ProviderModel::Local),
                    stub("l2", SuggestionType::Style, 0.95, ProviderModel::Local),
                ],
            ),
            Duration::from_secs(5),
        );
        let suggestions = engine.get_suggestions(FOX, WritingFormat::Novel).await;

        assert_eq!(texts(&suggestions), vec!["l2", "r1", "r2", "l1"]);
        let ids: Vec<_> = suggestions.iter().filter_map(|s| s.id.as_deref()).collect();
        assert_eq!(ids, vec!["s-1", "s-2", "s-3", "s-4"]);
    }

    #[tokio::test]
    async fn test_one_sided_result_skips_fallback() {
        let engine = engine(
            StubProvider::returning(ProviderModel::Remote, vec![]),
            StubProvider::returning(
                ProviderModel::Local,
                vec![stub("only", SuggestionType::Style, 0.4, ProviderModel::Local)],
            ),
            Duration::from_secs(5),
        );
        let suggestions = engine.get_suggestions(FOX, WritingFormat::Novel).await;
        assert_eq!(texts(&suggestions), vec!["only"]);
    }

    #[tokio::test]
    async fn test_stalled_provider_is_cut_off() {
        let engine = engine(
            StubProvider::returning(
                ProviderModel::Remote,
                vec![stub("fast", SuggestionType::Style, 0.85, ProviderModel::Remote)],
            ),
            StubProvider::stalled(ProviderModel::Local),
            Duration::from_millis(100),
        );

        let started = Instant::now();
        let suggestions = engine.get_suggestions(FOX, WritingFormat::Novel).await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(texts(&suggestions), vec!["fast"]);
    }

    #[tokio::test]
    async fn test_both_stalled_still_returns_fallback() {
        let engine = engine(
            StubProvider::stalled(ProviderModel::Remote),
            StubProvider::stalled(ProviderModel::Local),
            Duration::from_millis(50),
        );
        let suggestions = engine.get_suggestions(FOX, WritingFormat::Novel).await;
        assert_eq!(suggestions.len(), 2);
        assert!(suggestions.iter().all(is_fallback));
    }

    #[tokio::test]
    async fn test_empty_content_returns_list() {
        let engine = engine(
            StubProvider::returning(ProviderModel::Remote, vec![]),
            StubProvider::returning(ProviderModel::Local, vec![]),
            Duration::from_secs(5),
        );
        let suggestions = engine.get_suggestions("", WritingFormat::Novel).await;
        assert_eq!(suggestions.len(), 2);
        assert!(suggestions
            .iter()
            .all(|s| s.position() == Position::new(0, 0)));
    }

    #[tokio::test]
    async fn test_analysis_filters_by_type() {
        let engine = engine(
            StubProvider::returning(
                ProviderModel::Remote,
                vec![
                    stub("say it plainly", SuggestionType::Dialogue, 0.85, ProviderModel::Remote),
                    stub("tighten", SuggestionType::Style, 0.85, ProviderModel::Remote),
                ],
            ),
            StubProvider::returning(ProviderModel::Local, vec![]),
            Duration::from_secs(5),
        );
        let suggestions = engine
            .analyze(
                FOX,
                &Analysis::RewriteDialogue {
                    format: WritingFormat::Screenplay,
                },
            )
            .await;
        assert_eq!(texts(&suggestions), vec!["say it plainly"]);

        let suggestions = engine.analyze(FOX, &Analysis::Summarize).await;
        assert_eq!(suggestions.len(), 2);
    }

    #[tokio::test]
    async fn test_metrics_report_hybrid_and_tokens() {
        let engine = engine(
            StubProvider::returning(ProviderModel::Remote, vec![]),
            StubProvider::returning(ProviderModel::Local, vec![]),
            Duration::from_secs(5),
        );
        let response = engine.suggest_with_metrics(FOX, WritingFormat::Novel).await;

        assert_eq!(response.performance.model_used, ProviderModel::Hybrid);
        assert_eq!(response.performance.tokens_used, 11);
        assert_eq!(response.suggestions.len(), 2);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["performance"]["modelUsed"], "HYBRID");
        assert_eq!(json["performance"]["tokensUsed"], 11);
    }

    #[tokio::test]
    async fn test_health_ignores_fallback_output() {
        let engine = engine(
            StubProvider::returning(ProviderModel::Remote, fallback_suggestions(HEALTH_CHECK_TEXT)),
            StubProvider::returning(
                ProviderModel::Local,
                vec![stub("ok", SuggestionType::Style, 0.7, ProviderModel::Local)],
            ),
            Duration::from_secs(5),
        );
        let report = engine.health().await;

        assert!(!report.remote);
        assert!(report.local);
        assert_eq!(report.suggestions_generated, 3);
    }

    mod prop_tests {
        use super::*;
        use proptest::prelude::*;
        use quill_core::util::{context_window, slice_chars, CONTEXT_RADIUS};
        use std::collections::HashSet;

        /// Anchors one suggestion per confidence on a suffix of the request
        struct AnchoringProvider {
            model: ProviderModel,
            confidences: Vec<f64>,
        }

        impl SuggestionProvider for AnchoringProvider {
            fn model(&self) -> ProviderModel {
                self.model
            }

            fn suggest<'a>(
                &'a self,
                request: &'a SuggestionRequest,
            ) -> BoxFuture<'a, Vec<Suggestion>> {
                Box::pin(async move {
                    let content = &request.content;
                    let len = char_len(content);
                    self.confidences
                        .iter()
                        .enumerate()
                        .map(|(i, &confidence)| {
                            let start = i.min(len);
                            Suggestion::new(
                                format!("edit {}", i),
                                SuggestionType::Style,
                                "Anchored",
                                confidence,
                                self.model,
                                SuggestionMetadata {
                                    position: Position::new(start, len),
                                    context: context_window(content, start, len, CONTEXT_RADIUS),
                                    original_text: slice_chars(content, start, len).to_string(),
                                },
                            )
                        })
                        .collect()
                })
            }
        }

        proptest! {
            #[test]
            fn prop_engine_output_is_ranked_and_anchored(
                content in any::<String>(),
                remote in prop::collection::vec(0.0f64..=1.0, 0..6),
                local in prop::collection::vec(0.0f64..=1.0, 0..6),
            ) {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                    .unwrap();
                let expected_len = match remote.len() + local.len() {
                    0 => 2,
                    n => n,
                };
                let engine = SuggestionEngine::new(
                    Arc::new(AnchoringProvider { model: ProviderModel::Remote, confidences: remote }),
                    Arc::new(AnchoringProvider { model: ProviderModel::Local, confidences: local }),
                    Duration::from_secs(5),
                )
                .with_id_generator(Arc::new(SequentialIds::default()));

                let suggestions = runtime.block_on(engine.get_suggestions(&content, WritingFormat::Novel));

                prop_assert_eq!(suggestions.len(), expected_len);
                let len = char_len(&content);
                let mut ids = HashSet::new();
                for s in &suggestions {
                    let p = s.position();
                    prop_assert!(p.start <= p.end && p.end <= len);
                    prop_assert_eq!(s.metadata.original_text.as_str(), slice_chars(&content, p.start, p.end));
                    prop_assert!(ids.insert(s.id.clone().unwrap_or_default()));
                }
                for pair in suggestions.windows(2) {
                    prop_assert!(pair[0].confidence >= pair[1].confidence);
                }
            }
        }
    }
}
