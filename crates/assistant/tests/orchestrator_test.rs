//! End-to-end tests for the orchestrator.
//!
//! These tests drive `reply` over a small in-memory catalog with scripted
//! models, checking clarification handling and session memory.

use assistant::{AssistantConfig, ChatRequest, Orchestrator};
use catalog::{CatalogEntry, CatalogIndex, EntryKind, TranscriptSegment};
use ml_client::ModelBackend;
use ml_client::testing::{BagOfWordsEmbedder, ScriptedModel};
use pipeline::prompts::{BUSY_MESSAGE, NOT_RECOGNIZED_MESSAGE};
use std::sync::Arc;

const PLANNER_PREFIX: &str = "Bạn là bộ điều phối";
const LEGACY_MARKER: &str = "--- THÔNG TIN CHUNG VỀ PHIM ---";

fn create_catalog(titles: &[(&str, &str, &str)]) -> Arc<CatalogIndex> {
    let embedder = BagOfWordsEmbedder::default();
    let mut index = CatalogIndex::new();
    index.insert_entry(
        CatalogEntry::new("d0", "doraemon", "Doraemon", EntryKind::Series).with_episode_count(5),
    );
    for (key, slug, title) in titles {
        index.insert_entry(CatalogEntry::new(*key, *slug, *title, EntryKind::Single));
    }
    for (start, content) in [(3.0, "Doraemon lấy ra cỗ máy thời gian"), (40.0, "Nobita gặp ông nội")] {
        index.insert_segment(TranscriptSegment {
            movie_key: "d0".into(),
            episode: 5,
            start,
            content: content.into(),
            embedding: embedder.embed_text(content),
        });
    }
    Arc::new(index)
}

fn three_dragons() -> Arc<CatalogIndex> {
    create_catalog(&[
        ("r1", "rong-thieng", "Rồng Thiêng"),
        ("r2", "bay-vien-ngoc-rong", "Bảy Viên Ngọc Rồng"),
        ("r3", "rong-than", "Rồng Thần"),
    ])
}

/// The planner is down; legacy answers name the movie they were given
fn legacy_only_model() -> Arc<ScriptedModel> {
    Arc::new(ScriptedModel::responding(ModelBackend::Primary, |prompt| {
        if !prompt.contains(LEGACY_MARKER) {
            return None;
        }
        prompt
            .lines()
            .find_map(|line| line.strip_prefix("- Tên phim: "))
            .map(|title| format!("Phim bạn hỏi là {title}."))
    }))
}

fn create_orchestrator(store: Arc<CatalogIndex>, model: Arc<ScriptedModel>) -> Orchestrator {
    Orchestrator::from_parts(
        store,
        model,
        Arc::new(BagOfWordsEmbedder::default()),
        &AssistantConfig::default(),
    )
}

#[tokio::test]
async fn test_ambiguous_title_returns_clarification() {
    let store = create_catalog(&[
        ("r1", "rong-thieng", "Rồng Thiêng"),
        ("r2", "bay-vien-ngoc-rong", "Bảy Viên Ngọc Rồng"),
    ]);
    let orchestrator = create_orchestrator(store, Arc::new(ScriptedModel::failing(ModelBackend::Primary)));

    let reply = orchestrator
        .reply(ChatRequest::new("rồng").with_session("s1"))
        .await;
    assert_eq!(
        reply,
        "Mình chưa chắc bạn đang nói tới phim nào. Bạn chọn giúp 1 phim nhé:\n\
         1. Rồng Thiêng\n\
         2. Bảy Viên Ngọc Rồng"
    );

    let conversation = orchestrator.conversations().snapshot("s1").await.unwrap();
    assert_eq!(conversation.pending.unwrap().candidates.len(), 2);
    assert!(conversation.memory.is_empty());
    assert_eq!(conversation.last_question.as_deref(), Some("rồng"));
}

#[tokio::test]
async fn test_pick_selects_candidate() {
    let model = legacy_only_model();
    let orchestrator = create_orchestrator(three_dragons(), model.clone());

    let first = orchestrator
        .reply(ChatRequest::new("rồng").with_session("s1"))
        .await;
    let first_lines: Vec<&str> = first.lines().collect();
    assert_eq!(first_lines.len(), 4, "unexpected clarification: {first}");

    let reply = orchestrator
        .reply(ChatRequest::new(" 2 ").with_session("s1"))
        .await;
    assert_eq!(reply, "Phim bạn hỏi là Bảy Viên Ngọc Rồng.");
    assert!(
        model
            .prompts()
            .iter()
            .any(|p| p.starts_with(PLANNER_PREFIX) && p.contains("- current_slug: bay-vien-ngoc-rong"))
    );

    let conversation = orchestrator.conversations().snapshot("s1").await.unwrap();
    assert!(conversation.pending.is_none());
    // the question that triggered the clarification is remembered
    assert_eq!(conversation.memory.last_question(), "rồng");
}

#[tokio::test]
async fn test_other_number_clears_state() {
    let orchestrator = create_orchestrator(three_dragons(), legacy_only_model());

    orchestrator
        .reply(ChatRequest::new("rồng").with_session("s1"))
        .await;
    let reply = orchestrator
        .reply(ChatRequest::new("4").with_session("s1"))
        .await;
    assert_eq!(reply, NOT_RECOGNIZED_MESSAGE);

    let conversation = orchestrator.conversations().snapshot("s1").await.unwrap();
    assert!(conversation.pending.is_none());
    assert_eq!(conversation.last_question.as_deref(), Some("4"));

    // with nothing pending a digit is just a question again
    let again = orchestrator
        .reply(ChatRequest::new("2").with_session("s1"))
        .await;
    assert_eq!(again, NOT_RECOGNIZED_MESSAGE);
}

#[tokio::test]
async fn test_pick_beyond_candidates_clears_state() {
    let store = create_catalog(&[
        ("r1", "rong-thieng", "Rồng Thiêng"),
        ("r2", "bay-vien-ngoc-rong", "Bảy Viên Ngọc Rồng"),
    ]);
    let model = legacy_only_model();
    let orchestrator = create_orchestrator(store, model.clone());

    orchestrator
        .reply(ChatRequest::new("rồng").with_session("s1"))
        .await;
    let reply = orchestrator
        .reply(ChatRequest::new("3").with_session("s1"))
        .await;

    assert_eq!(reply, NOT_RECOGNIZED_MESSAGE);
    assert!(!model.prompts().iter().any(|p| p.contains("- current_slug:")));
    let conversation = orchestrator.conversations().snapshot("s1").await.unwrap();
    assert!(conversation.pending.is_none());
}

#[tokio::test]
async fn test_padded_number_is_not_a_pick() {
    let model = legacy_only_model();
    let orchestrator = create_orchestrator(three_dragons(), model.clone());

    orchestrator
        .reply(ChatRequest::new("rồng").with_session("s1"))
        .await;
    let reply = orchestrator
        .reply(ChatRequest::new("01").with_session("s1"))
        .await;

    assert_eq!(reply, NOT_RECOGNIZED_MESSAGE);
    assert!(!model.prompts().iter().any(|p| p.contains("- current_slug: rong-thieng")));
    let conversation = orchestrator.conversations().snapshot("s1").await.unwrap();
    assert!(conversation.pending.is_none());
    assert_eq!(conversation.last_question.as_deref(), Some("01"));
}

#[tokio::test]
async fn test_numeric_question_is_remembered() {
    let orchestrator = create_orchestrator(three_dragons(), legacy_only_model());

    orchestrator
        .reply(ChatRequest::new("2024").with_session("s1"))
        .await;

    let conversation = orchestrator.conversations().snapshot("s1").await.unwrap();
    assert_eq!(conversation.last_question.as_deref(), Some("2024"));
}

#[tokio::test]
async fn test_new_clarification_replaces_pending() {
    let store = create_catalog(&[
        ("r1", "rong-thieng", "Rồng Thiêng"),
        ("r2", "bay-vien-ngoc-rong", "Bảy Viên Ngọc Rồng"),
        ("r3", "rong-than", "Rồng Thần"),
        ("c1", "meo-may", "Mèo Máy"),
        ("c2", "meo-hoang", "Mèo Hoang"),
    ]);
    let model = legacy_only_model();
    let orchestrator = create_orchestrator(store, model.clone());

    let first = orchestrator
        .reply(ChatRequest::new("rồng").with_session("s1"))
        .await;
    assert_eq!(first.lines().count(), 4, "unexpected clarification: {first}");
    let second = orchestrator
        .reply(ChatRequest::new("mèo").with_session("s1"))
        .await;
    assert_eq!(
        second,
        "Mình chưa chắc bạn đang nói tới phim nào. Bạn chọn giúp 1 phim nhé:\n\
         1. Mèo Máy\n\
         2. Mèo Hoang"
    );

    let pending = orchestrator
        .conversations()
        .snapshot("s1")
        .await
        .unwrap()
        .pending
        .unwrap();
    assert_eq!(pending.question, "mèo");
    assert_eq!(pending.candidates.len(), 2);

    let reply = orchestrator
        .reply(ChatRequest::new("1").with_session("s1"))
        .await;
    assert_eq!(reply, "Phim bạn hỏi là Mèo Máy.");
    assert!(model.prompts().iter().any(|p| p.starts_with(PLANNER_PREFIX)
        && p.contains("- current_slug: meo-may")
        && p.contains("Câu hỏi user: \"mèo\"")));
    assert!(!model.prompts().iter().any(|p| p.contains("- current_slug: rong-thieng")));
}

#[tokio::test]
async fn test_blank_candidate_slug_keeps_page_slug() {
    let store = create_catalog(&[
        ("r1", "", "Rồng Xanh"),
        ("r2", "rong-thieng", "Rồng Thiêng"),
    ]);
    let model = legacy_only_model();
    let orchestrator = create_orchestrator(store, model.clone());

    let first = orchestrator
        .reply(ChatRequest::new("rồng").with_session("s1"))
        .await;
    assert!(first.contains("1. Rồng Xanh"), "unexpected clarification: {first}");

    let reply = orchestrator
        .reply(
            ChatRequest::new("1")
                .with_session("s1")
                .with_slug("rong-thieng"),
        )
        .await;
    assert_eq!(reply, "Phim bạn hỏi là Rồng Thiêng.");
    assert!(model.prompts().iter().any(|p| p.starts_with(PLANNER_PREFIX)
        && p.contains("- current_slug: rong-thieng")
        && p.contains("Câu hỏi user: \"rồng\"")));
}

#[tokio::test]
async fn test_pending_clarification_is_per_session() {
    let orchestrator = create_orchestrator(three_dragons(), legacy_only_model());

    orchestrator
        .reply(ChatRequest::new("rồng").with_session("s1"))
        .await;
    let other = orchestrator
        .reply(ChatRequest::new("2").with_session("s2"))
        .await;

    assert_eq!(other, NOT_RECOGNIZED_MESSAGE);
    let s1 = orchestrator.conversations().snapshot("s1").await.unwrap();
    assert!(s1.pending.is_some());
}

#[tokio::test]
async fn test_episode_summary_end_to_end() {
    let model = Arc::new(ScriptedModel::responding(ModelBackend::Primary, |prompt| {
        if prompt.starts_with(PLANNER_PREFIX) {
            if prompt.contains("get_full_transcript\",\"args\"") {
                return Some(r#"{"action": "final", "answer": "unused"}"#.into());
            }
            return Some(
                r#"{"action": "get_full_transcript", "args": {"slug": "doraemon", "episode": 5}}"#.into(),
            );
        }
        if prompt.contains("cỗ máy thời gian") {
            return Some("Ở tập 5, Doraemon đưa Nobita về quá khứ gặp ông nội.".into());
        }
        None
    }));
    let orchestrator = create_orchestrator(create_catalog(&[]), model.clone());

    let reply = orchestrator
        .reply(ChatRequest::new("doraemon tập 5 nói về gì"))
        .await;
    assert_eq!(reply, "Ở tập 5, Doraemon đưa Nobita về quá khứ gặp ông nội.");
    assert!(model.prompts()[0].contains("- detected_episode: 5"));

    let conversation = orchestrator.conversations().snapshot("anonymous").await.unwrap();
    assert_eq!(
        conversation.memory.context(),
        "Tóm tắt ngắn: doraemon tập 5 nói về gì\n\
         Lượt trước: U: doraemon tập 5 nói về gì | A: Ở tập 5, Doraemon đưa Nobita về quá khứ gặp ông nội."
    );
}

#[tokio::test]
async fn test_session_context_reaches_prompts() {
    let model = Arc::new(ScriptedModel::responding(ModelBackend::Primary, |prompt| {
        if prompt.starts_with(PLANNER_PREFIX) {
            Some(r#"{"action": "final", "answer": "Chào bạn!"}"#.into())
        } else {
            None
        }
    }));
    let orchestrator = create_orchestrator(create_catalog(&[]), model.clone());

    orchestrator.reply(ChatRequest::new("xin chào").with_session("a")).await;
    orchestrator.reply(ChatRequest::new("bạn là ai").with_session("a")).await;
    orchestrator.reply(ChatRequest::new("hello").with_session("b")).await;

    let prompts = model.prompts();
    assert!(prompts[0].contains("Bối cảnh phiên:\nKhông có"));
    assert!(prompts[1].contains("Lượt trước: U: xin chào | A: Chào bạn!"));
    assert!(prompts[2].contains("Bối cảnh phiên:\nKhông có"));
}

#[tokio::test]
async fn test_failure_everywhere_is_busy() {
    let orchestrator = create_orchestrator(
        create_catalog(&[]),
        Arc::new(ScriptedModel::failing(ModelBackend::Constrained)),
    );
    let reply = orchestrator
        .reply(ChatRequest::new("doraemon có gì hay").with_slug("doraemon"))
        .await;
    assert_eq!(reply, BUSY_MESSAGE);
}

#[tokio::test]
async fn test_concurrent_sessions_do_not_interfere() {
    let model = Arc::new(ScriptedModel::responding(ModelBackend::Primary, |prompt| {
        let question = prompt.rsplit("Câu hỏi user: ").next()?.trim_matches('"').to_string();
        Some(format!(r#"{{"action": "final", "answer": "đáp: {question}"}}"#))
    }));
    let orchestrator = Arc::new(create_orchestrator(create_catalog(&[]), model));

    let mut tasks = Vec::new();
    for i in 0..16 {
        let orchestrator = orchestrator.clone();
        tasks.push(tokio::spawn(async move {
            let session = format!("user-{}", i % 4);
            let question = format!("câu {i}");
            let reply = orchestrator
                .reply(ChatRequest::new(question.clone()).with_session(session))
                .await;
            (question, reply)
        }));
    }
    for task in tasks {
        let (question, reply) = task.await.unwrap();
        assert_eq!(reply, format!("đáp: {question}"));
    }

    assert_eq!(orchestrator.conversations().len(), 4);
    for s in 0..4 {
        let conversation = orchestrator
            .conversations()
            .snapshot(&format!("user-{s}"))
            .await
            .unwrap();
        let summary = conversation.memory.summary();
        assert_eq!(summary.matches(" | ").count(), 3, "{summary}");
    }
}
