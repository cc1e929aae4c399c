//! Prompt builders and the fixed user-facing messages.
//!
//! Every text the assistant shows or sends to a model is Vietnamese; the
//! wording here is what the models were tuned against, so keep edits small.

use crate::turn::Turn;
use catalog::{CatalogEntry, Episode};
use retrieval::{MovieBrief, ToolName};

// =============================================================================
// Fixed messages
// =============================================================================

/// No tier could produce an answer, or generation failed
pub const BUSY_MESSAGE: &str = "Hệ thống đang bận. Bạn thử lại sau vài giây nhé.";

/// No movie could be resolved from the question
pub const NOT_RECOGNIZED_MESSAGE: &str =
    "Mình chưa nhận ra phim bạn đang nói tới. Bạn mô tả thêm hoặc nêu rõ tên phim nhé.";

/// A summary was requested for an episode without transcript
pub const NO_TRANSCRIPT_MESSAGE: &str = "Chưa có dữ liệu chi tiết cho tập này để tóm tắt.";

/// Question used when a clarification pick arrives without one on record
pub const DEFAULT_PICK_QUESTION: &str = "Bạn muốn biết gì về phim này?";

const CLARIFICATION_HEADER: &str =
    "Mình chưa chắc bạn đang nói tới phim nào. Bạn chọn giúp 1 phim nhé:";

const NOTHING: &str = "Không có";

/// Numbered candidate list asking the user to pick one movie
pub fn clarification_message(candidates: &[MovieBrief]) -> String {
    if candidates.is_empty() {
        return NOT_RECOGNIZED_MESSAGE.to_string();
    }
    let mut lines = vec![CLARIFICATION_HEADER.to_string()];
    lines.extend(
        candidates
            .iter()
            .enumerate()
            .map(|(i, brief)| brief.clarification_line(i + 1)),
    );
    lines.join("\n")
}

// =============================================================================
// Planner
// =============================================================================

fn tool_names() -> String {
    let mut names: Vec<&str> = ToolName::ALL.iter().map(ToolName::as_str).collect();
    names.sort_unstable();
    names.join(", ")
}

fn hint_lines(turn: &Turn, detected_episode: Option<Episode>) -> String {
    let mut lines = Vec::new();
    if let Some(slug) = &turn.current_slug {
        lines.push(format!("- current_slug: {slug}"));
    }
    if let Some(episode) = turn.current_episode {
        lines.push(format!("- current_episode: {episode}"));
    }
    if let Some(episode) = detected_episode {
        lines.push(format!("- detected_episode: {episode}"));
    }
    if lines.is_empty() {
        "- none".to_string()
    } else {
        lines.join("\n")
    }
}

fn session_text(turn: &Turn) -> &str {
    if turn.session_context.is_empty() {
        NOTHING
    } else {
        &turn.session_context
    }
}

/// One planning step: pick a tool or answer, as one JSON object
pub fn planner_prompt(turn: &Turn, detected_episode: Option<Episode>, history: &str) -> String {
    format!(
        "Bạn là bộ điều phối cho chatbot phim. Hãy chọn tool phù hợp hoặc trả lời trực tiếp.\n\
         Luật:\n\
         - Chỉ trả JSON thuần (không markdown, không code block).\n\
         - action phải là một trong: {tools} hoặc \"final\".\n\
         - Khi gọi tool, luôn kèm args.\n\
         - Không bịa dữ liệu; chỉ dùng dữ liệu tool trả về.\n\
         - Nếu chưa đủ thông tin, hỏi lại người dùng trong \"final\".\n\
         - Nếu câu hỏi là tóm tắt tập, ưu tiên: xác định đúng phim/tập -> get_full_transcript -> final.\n\
         Định dạng: {{\"action\": \"<tool>\", \"args\": {{...}}}} hoặc {{\"action\": \"final\", \"answer\": \"...\"}}\n\
         \n\
         Tool list:\n\
         {guide}\n\
         \n\
         Ngữ cảnh:\n\
         {hints}\n\
         \n\
         Lịch sử tool:\n\
         {history}\n\
         \n\
         Bối cảnh phiên:\n\
         {session}\n\
         \n\
         Câu hỏi user: \"{question}\"",
        tools = tool_names(),
        guide = ToolName::guide(),
        hints = hint_lines(turn, detected_episode),
        session = session_text(turn),
        question = turn.question,
    )
}

/// Answer from the gathered tool data, no more tool access
pub fn final_prompt(turn: &Turn, history: &str) -> String {
    format!(
        "Bạn là trợ lý phim. Dựa trên dữ liệu tool dưới đây để trả lời người dùng bằng tiếng Việt, rõ ràng, thân thiện.\n\
         Trả lời khoảng 4-6 câu. Nếu là gợi ý phim, hãy đưa 3-5 phim và mỗi phim 1-2 câu mô tả.\n\
         Nếu không đủ dữ liệu, hãy hỏi lại ngắn gọn để lấy thêm thông tin.\n\
         Khi nhắc tới phim cụ thể, hãy kèm link dạng Markdown: [Tên phim](/movie/{{id}}).\n\
         \n\
         Tool data:\n\
         {history}\n\
         \n\
         Bối cảnh phiên:\n\
         {session}\n\
         \n\
         Câu hỏi user: \"{question}\"",
        session = session_text(turn),
        question = turn.question,
    )
}

// =============================================================================
// Legacy pipeline
// =============================================================================

/// One-word summary/detail classification
pub fn classify_prompt(text: &str) -> String {
    format!(
        "Hãy phân loại yêu cầu dưới đây.\n\
         - Trả lời \"summary\" nếu người dùng muốn tóm tắt/kể lại nội dung.\n\
         - Trả lời \"detail\" nếu không phải yêu cầu tóm tắt.\n\
         Chỉ trả đúng một từ: summary hoặc detail.\n\
         \n\
         Yêu cầu: \"{text}\""
    )
}

pub const SUMMARY_INSTRUCTION: &str = "Bạn hãy đọc toàn bộ kịch bản trên và viết một đoạn tóm tắt nội dung đầy đủ, hấp dẫn, nêu bật các diễn biến chính (khoảng 6-8 câu).";

pub const DETAIL_INSTRUCTION: &str = "Trả lời câu hỏi dựa trên các đoạn thông tin rời rạc trên (khoảng 3-5 câu). Nếu không có thông tin thì nói không biết.";

/// Movie metadata block heading every legacy prompt
pub fn meta_block(entry: &CatalogEntry) -> String {
    let or_na = |s: &str| if s.is_empty() { "N/A".to_string() } else { s.to_string() };
    format!(
        "--- THÔNG TIN CHUNG VỀ PHIM ---\n\
         - Tên phim: {title}\n\
         - Đạo diễn: {director}\n\
         - Diễn viên chính: {cast}\n\
         - Tóm tắt nội dung: {synopsis}\n\
         \n\
         --- CÁC ĐOẠN CHI TIẾT TÌM THẤY TRONG VIDEO ---",
        title = or_na(&entry.title),
        director = or_na(entry.director.as_deref().unwrap_or_default()),
        cast = entry.cast.join(", "),
        synopsis = or_na(&entry.synopsis),
    )
}

/// Context block carrying a whole episode transcript
pub fn transcript_context(episode: Episode, transcript: &str) -> String {
    format!(
        "Dưới đây là TOÀN BỘ nội dung chi tiết của Tập {episode}:\n\
         ---------------------\n\
         {transcript}\n\
         ---------------------"
    )
}

/// Context block listing retrieved transcript lines
pub fn segments_context(lines: &[String]) -> String {
    let mut context = String::from("Thông tin tìm được:\n");
    for line in lines {
        context.push_str(line);
        context.push('\n');
    }
    context
}

pub fn legacy_prompt(meta: &str, context: &str, instruction: &str, question: &str) -> String {
    format!("{meta}\n\n{context}\n\nYÊU CẦU: {instruction}\nCÂU HỎI USER: \"{question}\"")
}

// =============================================================================
// Summarizer
// =============================================================================

pub fn chunk_prompt(index: usize, total: usize, episode: Episode, title: &str, chunk: &str) -> String {
    format!(
        "Bạn là trợ lý phim. Hãy tóm tắt ngắn gọn nội dung đoạn {index}/{total} của tập {episode} phim \"{title}\" (2-3 câu),\n\
         nêu diễn biến chính theo thứ tự, không bịa.\n\
         \n\
         Nội dung:\n\
         {chunk}"
    )
}

pub fn merge_prompt(episode: Episode, title: &str, merged: &str) -> String {
    format!(
        "Dựa trên các tóm tắt từng đoạn của tập {episode} phim \"{title}\" dưới đây, hãy viết tóm tắt 6-8 câu,\n\
         mạch lạc, theo thứ tự thời gian, không bịa.\n\
         \n\
         Tóm tắt từng đoạn:\n\
         {merged}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::EntryKind;

    #[test]
    fn test_clarification_message() {
        let rong = CatalogEntry::new("m1", "rong-thieng", "Rồng Thiêng", EntryKind::Single)
            .with_year(2003);
        let ngoc = CatalogEntry::new("m2", "bay-vien-ngoc-rong", "Bảy Viên Ngọc Rồng", EntryKind::Series);

        let message = clarification_message(&[MovieBrief::from(&rong), MovieBrief::from(&ngoc)]);
        assert_eq!(
            message,
            "Mình chưa chắc bạn đang nói tới phim nào. Bạn chọn giúp 1 phim nhé:\n\
             1. Rồng Thiêng (2003)\n\
             2. Bảy Viên Ngọc Rồng"
        );
        assert_eq!(clarification_message(&[]), NOT_RECOGNIZED_MESSAGE);
    }

    #[test]
    fn test_planner_prompt_hints() {
        let turn = Turn::new("tóm tắt tập 5")
            .with_slug(Some("doraemon".into()))
            .with_session("s1", "Tóm tắt ngắn: doraemon");
        let prompt = planner_prompt(&turn, Some(5), "[]");

        assert!(prompt.contains("- current_slug: doraemon\n- detected_episode: 5"));
        assert!(prompt.contains("find_movie_by_name, get_full_transcript, get_movie_meta"));
        assert!(prompt.contains("Bối cảnh phiên:\nTóm tắt ngắn: doraemon"));
        assert!(prompt.ends_with("Câu hỏi user: \"tóm tắt tập 5\""));

        let bare = planner_prompt(&Turn::new("hi"), None, "[]");
        assert!(bare.contains("Ngữ cảnh:\n- none"));
        assert!(bare.contains("Bối cảnh phiên:\nKhông có"));
    }

    #[test]
    fn test_meta_block_placeholders() {
        let entry = CatalogEntry::new("m1", "x", "X", EntryKind::Single);
        let block = meta_block(&entry);
        assert!(block.contains("- Đạo diễn: N/A"));
        assert!(block.contains("- Tóm tắt nội dung: N/A"));
    }
}
