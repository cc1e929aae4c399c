//! PlannerLoop - lets the language model drive the retrieval tools
//!
//! Each iteration shows the model the tool guide, the hints the turn
//! carries, and every tool result gathered so far, and asks for one JSON
//! step: call a tool or give the final answer.
//!
//! ## Algorithm
//! 1. Detect an episode reference in the question
//! 2. Up to `step_limit` times:
//!    - Invalid plan: stop; with an empty history, first run the default
//!      search over the raw question
//!    - `final`: return its answer (blank means no answer)
//!    - Unknown tool: run the default search, tagged with the name, then stop
//!    - Same call as the previous step: stop
//!    - Otherwise run the tool (faults become `{error}` results); an
//!      ambiguous `find_movie_by_name` records a pending clarification and a
//!      `get_full_transcript` that worked ends planning
//! 3. Without a final answer, one last generation over the tool history
//!    produces the answer, or nothing

use crate::history::{ToolHistory, ToolRecord};
use crate::plan::Plan;
use crate::prompts::{final_prompt, planner_prompt};
use crate::traits::AnswerStrategy;
use crate::turn::{Answer, PendingClarification, StrategyOutcome, Turn};
use anyhow::Result;
use async_trait::async_trait;
use ml_client::{LanguageModel, ModelBackend};
use retrieval::{EpisodeDetector, MovieBrief, ResolverConfig, ToolCall, ToolName, ToolRegistry};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Planning iterations on the primary backend
    pub max_steps: usize,
    /// Iteration cap on the constrained backend
    pub constrained_max_steps: usize,
    /// Cap on the serialized tool history inside prompts
    pub history_max_chars: usize,
    /// `top_k` of the default search
    pub fallback_top_k: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_steps: 9,
            constrained_max_steps: 3,
            history_max_chars: 12_000,
            fallback_top_k: 5,
        }
    }
}

impl PlannerConfig {
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn step_limit(&self, backend: ModelBackend) -> usize {
        match backend {
            ModelBackend::Primary => self.max_steps,
            ModelBackend::Constrained => self.max_steps.min(self.constrained_max_steps),
        }
    }
}

/// Why planning stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Final,
    InvalidPlan,
    UnknownTool,
    RepeatedCall,
    TranscriptFetched,
    StepLimit,
}

/// Everything one planning run produced
#[derive(Debug, Clone)]
pub struct PlannerReport {
    /// Non-blank answer, if any
    pub answer: Option<String>,
    pub stop: StopReason,
    /// Planning iterations used (model calls, not counting the final one)
    pub steps: usize,
    pub history: ToolHistory,
    pub clarification: Option<PendingClarification>,
}

pub struct PlannerLoop {
    registry: Arc<ToolRegistry>,
    model: Arc<dyn LanguageModel>,
    detector: EpisodeDetector,
    resolver_config: ResolverConfig,
    config: PlannerConfig,
}

impl PlannerLoop {
    pub fn new(registry: Arc<ToolRegistry>, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            registry,
            model,
            detector: EpisodeDetector::new(),
            resolver_config: ResolverConfig::default(),
            config: PlannerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    /// Thresholds deciding when `find_movie_by_name` results are ambiguous
    pub fn with_resolver_config(mut self, config: ResolverConfig) -> Self {
        self.resolver_config = config;
        self
    }

    /// Plan and answer one question
    #[instrument(skip(self, turn), fields(session = %turn.session_id))]
    pub async fn run(&self, turn: &Turn) -> PlannerReport {
        let detected_episode = self.detector.detect(&turn.question);
        let step_limit = self.config.step_limit(self.model.backend());
        let mut history = ToolHistory::new();
        let mut clarification = None;
        let mut stop = StopReason::StepLimit;
        let mut steps = 0;

        while steps < step_limit {
            steps += 1;
            let prompt = planner_prompt(
                turn,
                detected_episode,
                &history.render(self.config.history_max_chars),
            );
            let reply = self
                .model
                .try_generate(&prompt, "planner")
                .await
                .unwrap_or_default();

            match Plan::parse(&reply) {
                Plan::Invalid { reason } => {
                    debug!(%reason, "invalid plan");
                    if history.is_empty() {
                        self.run_default_search(turn, &mut history, "fallback_from_invalid_plan".into())
                            .await;
                    }
                    stop = StopReason::InvalidPlan;
                    break;
                }
                Plan::Final { answer } => {
                    info!(steps, "planner answered");
                    return PlannerReport {
                        answer: Some(answer).filter(|a| !a.is_empty()),
                        stop: StopReason::Final,
                        steps,
                        history,
                        clarification,
                    };
                }
                Plan::UnknownTool { name } => {
                    warn!(tool = %name, "planner asked for an unknown tool");
                    self.run_default_search(
                        turn,
                        &mut history,
                        format!("fallback_from_unknown_tool:{name}"),
                    )
                    .await;
                    stop = StopReason::UnknownTool;
                    break;
                }
                Plan::Call { call, args } => {
                    let tool = call.name();
                    if history.repeats(tool.as_str(), &args) {
                        debug!(%tool, "repeated call");
                        stop = StopReason::RepeatedCall;
                        break;
                    }

                    debug!(%tool, ?args, "running planned tool");
                    let result = self.registry.execute(&call).await;
                    if tool == ToolName::FindMovieByName {
                        if let Some(pending) = self.ambiguous_matches(&result, &turn.question) {
                            debug!(candidates = pending.candidates.len(), "ambiguous title");
                            clarification = Some(pending);
                        }
                    }
                    let fetched = tool == ToolName::GetFullTranscript
                        && result.get("error").is_none()
                        && result.get("movie").is_some();
                    history.push(ToolRecord {
                        action: tool.as_str().to_string(),
                        args,
                        result,
                        note: None,
                    });
                    if fetched {
                        stop = StopReason::TranscriptFetched;
                        break;
                    }
                }
            }
        }

        let prompt = final_prompt(turn, &history.render(self.config.history_max_chars));
        let answer = self
            .model
            .try_generate(&prompt, "final")
            .await
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        info!(steps, ?stop, tools = history.len(), answered = answer.is_some(), "planning finished");

        PlannerReport {
            answer,
            stop,
            steps,
            history,
            clarification,
        }
    }

    /// The guaranteed-safe step: semantic search over the raw question
    async fn run_default_search(&self, turn: &Turn, history: &mut ToolHistory, note: String) {
        let call = ToolCall::SearchMoviesByText {
            query: turn.question.clone(),
            top_k: self.config.fallback_top_k,
        };
        let mut args = Map::new();
        args.insert("query".into(), json!(turn.question));
        args.insert("top_k".into(), json!(self.config.fallback_top_k));

        let result = self.registry.execute(&call).await;
        history.push(ToolRecord {
            action: call.name().as_str().to_string(),
            args,
            result,
            note: Some(note),
        });
    }

    /// Candidates of a `find_movie_by_name` result, when they are too close to call
    fn ambiguous_matches(&self, result: &Value, question: &str) -> Option<PendingClarification> {
        let matches: Vec<MovieBrief> = result
            .get("matches")
            .and_then(|m| serde_json::from_value(m.clone()).ok())?;
        let scores: Vec<f64> = matches.iter().map(|m| m.score.unwrap_or(0.0)).collect();

        let count = self.resolver_config.ambiguous_count(&scores);
        if count == 0 {
            return None;
        }
        Some(PendingClarification {
            candidates: matches.into_iter().take(count).collect(),
            question: question.to_string(),
        })
    }
}

#[async_trait]
impl AnswerStrategy for PlannerLoop {
    fn name(&self) -> &str {
        "planner"
    }

    async fn answer(&self, turn: &Turn) -> Result<StrategyOutcome> {
        let report = self.run(turn).await;
        Ok(StrategyOutcome {
            answer: report.answer.map(Answer::generated),
            clarification: report.clarification,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::{CatalogEntry, CatalogIndex, EntryEmbedding, EntryKind, TranscriptSegment};
    use ml_client::testing::{BagOfWordsEmbedder, ScriptedModel};

    fn registry() -> Arc<ToolRegistry> {
        let embedder = BagOfWordsEmbedder::default();
        let mut index = CatalogIndex::new();
        index.insert_entry(
            CatalogEntry::new("m1", "doraemon", "Doraemon", EntryKind::Series)
                .with_code("DRM")
                .with_episode_count(5),
        );
        index.insert_entry(CatalogEntry::new("m2", "rong-thieng", "Rồng Thiêng", EntryKind::Single));
        index.insert_entry(CatalogEntry::new(
            "m3",
            "rong-than",
            "Rồng Thần",
            EntryKind::Single,
        ));
        index.insert_entry_embedding(EntryEmbedding {
            movie_key: "m1".into(),
            vector: embedder.embed_text("mèo máy doraemon"),
        });
        index.insert_segment(TranscriptSegment {
            movie_key: "m1".into(),
            episode: 5,
            start: 3.0,
            content: "Doraemon ăn bánh rán".into(),
            embedding: Vec::new(),
        });
        Arc::new(ToolRegistry::new(Arc::new(index), Arc::new(embedder)))
    }

    fn planner(replies: Vec<Option<&str>>, backend: ModelBackend) -> (PlannerLoop, Arc<ScriptedModel>) {
        let model = Arc::new(ScriptedModel::queued(backend, replies));
        (PlannerLoop::new(registry(), model.clone()), model)
    }

    #[tokio::test]
    async fn test_final_answer() {
        let (planner, model) = planner(
            vec![Some(r#"{"action": "final", "answer": "Xin chào!"}"#)],
            ModelBackend::Primary,
        );
        let report = planner.run(&Turn::new("chào")).await;

        assert_eq!(report.answer.as_deref(), Some("Xin chào!"));
        assert_eq!(report.stop, StopReason::Final);
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_blank_final_is_no_answer() {
        let (planner, model) = planner(
            vec![Some(r#"{"action": "final", "answer": "  "}"#)],
            ModelBackend::Primary,
        );
        let report = planner.run(&Turn::new("chào")).await;

        assert!(report.answer.is_none());
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_first_plan_runs_default_search() {
        let (planner, model) = planner(
            vec![Some("Tôi nghĩ bạn nên xem Doraemon"), Some("Gợi ý: Doraemon")],
            ModelBackend::Primary,
        );
        let report = planner.run(&Turn::new("phim về mèo máy")).await;

        assert_eq!(report.stop, StopReason::InvalidPlan);
        assert_eq!(report.steps, 1);
        let record = &report.history.records()[0];
        assert_eq!(record.action, "search_movies_by_text");
        assert_eq!(record.args["query"], "phim về mèo máy");
        assert_eq!(record.args["top_k"], 5);
        assert_eq!(record.note.as_deref(), Some("fallback_from_invalid_plan"));
        assert_eq!(report.answer.as_deref(), Some("Gợi ý: Doraemon"));
        assert!(model.prompts()[1].contains("fallback_from_invalid_plan"));
    }

    #[tokio::test]
    async fn test_invalid_later_plan_keeps_history() {
        let (planner, _) = planner(
            vec![
                Some(r#"{"action": "get_movie_meta", "args": {"slug": "doraemon"}}"#),
                Some("oops"),
                Some("Doraemon là phim hoạt hình."),
            ],
            ModelBackend::Primary,
        );
        let report = planner.run(&Turn::new("doraemon là gì")).await;

        assert_eq!(report.stop, StopReason::InvalidPlan);
        assert_eq!(report.history.len(), 1);
        assert_eq!(report.history.records()[0].action, "get_movie_meta");
        assert_eq!(report.answer.as_deref(), Some("Doraemon là phim hoạt hình."));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_tagged() {
        let (planner, _) = planner(
            vec![Some(r#"{"action": "play_movie", "args": {}}"#), None],
            ModelBackend::Primary,
        );
        let report = planner.run(&Turn::new("mở phim")).await;

        assert_eq!(report.stop, StopReason::UnknownTool);
        assert_eq!(
            report.history.records()[0].note.as_deref(),
            Some("fallback_from_unknown_tool:play_movie")
        );
        assert!(report.answer.is_none());
    }

    #[tokio::test]
    async fn test_repeated_call_stops_within_two_iterations() {
        let model = Arc::new(ScriptedModel::responding(ModelBackend::Primary, |prompt| {
            if prompt.starts_with("Bạn là bộ điều phối") {
                Some(r#"{"action": "get_movie_meta", "args": {"slug": "doraemon"}}"#.into())
            } else {
                Some("Doraemon.".into())
            }
        }));
        let planner = PlannerLoop::new(registry(), model.clone());
        let report = planner.run(&Turn::new("doraemon")).await;

        assert_eq!(report.stop, StopReason::RepeatedCall);
        assert_eq!(report.steps, 2);
        assert_eq!(report.history.len(), 1);
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn test_step_limit_per_backend() {
        for (backend, limit) in [(ModelBackend::Primary, 9), (ModelBackend::Constrained, 3)] {
            let model = Arc::new(ScriptedModel::responding(backend, |prompt| {
                if prompt.starts_with("Bạn là bộ điều phối") {
                    let n = prompt.matches("\"action\"").count();
                    Some(format!(
                        r#"{{"action": "search_movies_by_text", "args": {{"query": "q{n}"}}}}"#
                    ))
                } else {
                    None
                }
            }));
            let planner = PlannerLoop::new(registry(), model.clone());
            let report = planner.run(&Turn::new("bất kỳ")).await;

            assert_eq!(report.stop, StopReason::StepLimit);
            assert_eq!(report.steps, limit);
            assert_eq!(report.history.len(), limit);
            assert!(report.answer.is_none());
        }
    }

    #[tokio::test]
    async fn test_transcript_ends_planning() {
        let (planner, model) = planner(
            vec![
                Some(r#"{"action": "get_full_transcript", "args": {"slug": "doraemon", "episode": 5}}"#),
                Some("Tập 5: Doraemon ăn bánh rán."),
            ],
            ModelBackend::Primary,
        );
        let report = planner.run(&Turn::new("tóm tắt doraemon tập 5")).await;

        assert_eq!(report.stop, StopReason::TranscriptFetched);
        assert_eq!(report.answer.as_deref(), Some("Tập 5: Doraemon ăn bánh rán."));
        assert!(model.prompts()[0].contains("- detected_episode: 5"));
        assert!(model.prompts()[1].contains("Doraemon ăn bánh rán"));
    }

    #[tokio::test]
    async fn test_missing_movie_transcript_keeps_planning() {
        let (planner, model) = planner(
            vec![
                Some(r#"{"action": "get_full_transcript", "args": {"slug": "khong-co-phim", "episode": 2}}"#),
                Some(r#"{"action": "final", "answer": "Mình không tìm thấy phim này."}"#),
            ],
            ModelBackend::Primary,
        );
        let report = planner.run(&Turn::new("tóm tắt khong co phim tập 2")).await;

        assert_eq!(report.stop, StopReason::Final);
        assert_eq!(report.steps, 2);
        assert_eq!(report.history.len(), 1);
        assert_eq!(report.answer.as_deref(), Some("Mình không tìm thấy phim này."));
        assert!(model.prompts()[1].contains("Không tìm thấy phim."));
    }

    #[tokio::test]
    async fn test_ambiguous_find_records_clarification() {
        let (planner, _) = planner(
            vec![
                Some(r#"{"action": "find_movie_by_name", "args": {"query": "rồng"}}"#),
                Some(r#"{"action": "final", "answer": "Bạn muốn hỏi phim nào?"}"#),
            ],
            ModelBackend::Primary,
        );
        let report = planner.run(&Turn::new("phim rồng")).await;

        let pending = report.clarification.expect("ambiguous title");
        assert_eq!(pending.question, "phim rồng");
        let slugs: Vec<&str> = pending.candidates.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(slugs.len(), 2);
        assert!(slugs.contains(&"rong-thieng") && slugs.contains(&"rong-than"));
        assert_eq!(report.answer.as_deref(), Some("Bạn muốn hỏi phim nào?"));
    }

    #[tokio::test]
    async fn test_tool_errors_are_recorded() {
        let (planner, _) = planner(
            vec![
                Some(r#"{"action": "find_movie_by_name", "args": {}}"#),
                Some(r#"{"action": "final", "answer": "Bạn tìm phim gì?"}"#),
            ],
            ModelBackend::Primary,
        );
        let report = planner.run(&Turn::new("tìm phim")).await;

        assert!(report.history.records()[0].result["error"].is_string());
        assert!(report.clarification.is_none());
        assert_eq!(report.answer.as_deref(), Some("Bạn tìm phim gì?"));
    }
}
