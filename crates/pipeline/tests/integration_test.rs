//! Integration tests for the pipeline.
//!
//! These tests run the full tier chain (planner, then legacy) against a
//! small catalog with scripted models.

use catalog::{CatalogEntry, CatalogIndex, EntryEmbedding, EntryKind, TranscriptSegment};
use ml_client::ModelBackend;
use ml_client::testing::{BagOfWordsEmbedder, ScriptedModel};
use pipeline::prompts::BUSY_MESSAGE;
use pipeline::{AnswerKind, LegacyPipeline, PlannerLoop, StrategyChain, Turn};
use retrieval::{CatalogResolver, ToolRegistry};
use std::sync::{Arc, Mutex};

const PLANNER_PREFIX: &str = "Bạn là bộ điều phối";
const FINAL_PREFIX: &str = "Bạn là trợ lý phim. Dựa trên dữ liệu tool";

fn create_catalog() -> Arc<CatalogIndex> {
    let embedder = BagOfWordsEmbedder::default();
    let mut index = CatalogIndex::new();

    index.insert_entry(
        CatalogEntry::new("m1", "doraemon", "Doraemon", EntryKind::Series)
            .with_code("DRM")
            .with_year(1979)
            .with_synopsis("Mèo máy Doraemon đến từ thế kỷ 22 giúp đỡ Nobita.")
            .with_episode_count(5),
    );
    index.insert_entry(CatalogEntry::new("m2", "rong-thieng", "Rồng Thiêng", EntryKind::Single));
    index.insert_entry(CatalogEntry::new(
        "m3",
        "bay-vien-ngoc-rong",
        "Bảy Viên Ngọc Rồng",
        EntryKind::Series,
    ));
    index.insert_entry_embedding(EntryEmbedding {
        movie_key: "m1".into(),
        vector: embedder.embed_text("mèo máy thế kỷ 22 nobita"),
    });

    for (episode, start, content) in [
        (4, 2.0, "Nobita bị điểm kém"),
        (5, 3.0, "Doraemon lấy ra cỗ máy thời gian"),
        (5, 40.0, "Nobita quay về quá khứ gặp ông nội"),
    ] {
        index.insert_segment(TranscriptSegment {
            movie_key: "m1".into(),
            episode,
            start,
            content: content.into(),
            embedding: embedder.embed_text(content),
        });
    }
    Arc::new(index)
}

fn create_chain(model: Arc<ScriptedModel>) -> StrategyChain {
    let store = create_catalog();
    let embedder = Arc::new(BagOfWordsEmbedder::default());
    let registry = Arc::new(ToolRegistry::new(store.clone(), embedder.clone()));
    let resolver = Arc::new(CatalogResolver::new(store.clone(), embedder.clone()));

    StrategyChain::new()
        .add_strategy(PlannerLoop::new(registry, model.clone()))
        .add_strategy(LegacyPipeline::new(store, resolver, model, embedder))
}

#[tokio::test]
async fn test_episode_summary_through_planner() {
    let transcript_args = Arc::new(Mutex::new(None));
    let seen = transcript_args.clone();
    let model = Arc::new(ScriptedModel::responding(ModelBackend::Primary, move |prompt| {
        if prompt.starts_with(PLANNER_PREFIX) {
            if !prompt.contains("find_movie_by_name\",\"args\"") {
                return Some(r#"{"action": "find_movie_by_name", "args": {"query": "doraemon"}}"#.into());
            }
            let call = r#"{"action": "get_full_transcript", "args": {"slug": "doraemon", "episode": 5}}"#;
            *seen.lock().unwrap() = Some(call.to_string());
            return Some(call.into());
        }
        if prompt.starts_with(FINAL_PREFIX) && prompt.contains("cỗ máy thời gian") {
            return Some("Trong tập 5, Doraemon dùng cỗ máy thời gian đưa Nobita về gặp ông nội.".into());
        }
        None
    }));

    let outcome = create_chain(model.clone())
        .run(&Turn::new("doraemon tập 5 nói về gì"))
        .await;

    assert_eq!(outcome.answered_by.as_deref(), Some("planner"));
    assert_eq!(outcome.answer.kind, AnswerKind::Generated);
    assert!(outcome.answer.text.contains("tập 5"));
    assert!(outcome.clarification.is_none());
    assert!(transcript_args.lock().unwrap().is_some());

    let prompts = model.prompts();
    assert!(prompts[0].contains("- detected_episode: 5"));
    // find, transcript, final
    assert_eq!(prompts.len(), 3);
    assert!(!prompts[2].contains("Nobita bị điểm kém"));
}

#[tokio::test]
async fn test_episode_summary_through_legacy() {
    let model = Arc::new(ScriptedModel::responding(ModelBackend::Primary, |prompt| {
        if prompt.starts_with("Hãy phân loại") {
            return Some("summary".into());
        }
        if prompt.contains("TOÀN BỘ nội dung chi tiết của Tập 5") {
            return Some("Tập 5: Nobita dùng cỗ máy thời gian về gặp ông nội.".into());
        }
        // the planner and its final call are down
        None
    }));

    let outcome = create_chain(model.clone())
        .run(&Turn::new("doraemon tập 5 nói về gì"))
        .await;

    assert_eq!(outcome.answered_by.as_deref(), Some("legacy"));
    assert_eq!(
        outcome.answer.text,
        "Tập 5: Nobita dùng cỗ máy thời gian về gặp ông nội."
    );
}

#[tokio::test]
async fn test_ambiguous_title_yields_clarification() {
    let model = Arc::new(ScriptedModel::failing(ModelBackend::Primary));
    let outcome = create_chain(model).run(&Turn::new("rồng")).await;

    assert_eq!(outcome.answered_by.as_deref(), Some("legacy"));
    assert_eq!(outcome.answer.kind, AnswerKind::Clarification);
    assert_eq!(
        outcome.answer.text,
        "Mình chưa chắc bạn đang nói tới phim nào. Bạn chọn giúp 1 phim nhé:\n\
         1. Rồng Thiêng\n\
         2. Bảy Viên Ngọc Rồng"
    );
    let pending = outcome.clarification.unwrap();
    assert_eq!(pending.candidates[1].slug, "bay-vien-ngoc-rong");
}

#[tokio::test]
async fn test_adversarial_planner_is_bounded() {
    let model = Arc::new(ScriptedModel::responding(ModelBackend::Primary, |prompt| {
        if prompt.starts_with(PLANNER_PREFIX) {
            Some(r#"{"action": "search_movies_by_text", "args": {"top_k": 2, "query": "mèo"}}"#.into())
        } else {
            None
        }
    }));

    let outcome = create_chain(model.clone()).run(&Turn::new("xyz qqq")).await;

    let planner_calls = model
        .prompts()
        .iter()
        .filter(|p| p.starts_with(PLANNER_PREFIX))
        .count();
    assert_eq!(planner_calls, 2);
    assert_eq!(outcome.answer.kind, AnswerKind::Fixed);
}

#[tokio::test]
async fn test_everything_down_is_busy() {
    let store = create_catalog();
    let embedder = Arc::new(BagOfWordsEmbedder::default());
    let model = Arc::new(ScriptedModel::failing(ModelBackend::Constrained));
    let registry = Arc::new(ToolRegistry::new(store, embedder));

    let chain = StrategyChain::new().add_strategy(PlannerLoop::new(registry, model));
    let outcome = chain.run(&Turn::new("doraemon")).await;

    assert_eq!(outcome.answer.text, BUSY_MESSAGE);
    assert!(outcome.answered_by.is_none());
}
