//! The closed set of retrieval tools and their typed calls.
//!
//! The planner speaks JSON (`{"action": "...", "args": {...}}`); this module
//! is where untrusted arguments become typed values. Extraction is lenient
//! the way a model's output needs it to be: numbers may arrive as strings,
//! tag lists as comma-separated text, and anything unusable falls back to the
//! tool's default instead of failing.

use catalog::Episode;
use serde_json::{Map, Value};
use std::fmt;

/// Default number of results for `find_movie_by_name`
pub const FIND_TOP_K: usize = 3;
/// Default number of results for the search tools
pub const SEARCH_TOP_K: usize = 5;
/// Default transcript budget in characters
pub const TRANSCRIPT_MAX_CHARS: usize = 12_000;

/// Names of the registered tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    FindMovieByName,
    SearchMoviesByText,
    SearchMoviesByTags,
    GetMovieMeta,
    SearchVideoVectors,
    GetFullTranscript,
}

impl ToolName {
    pub const ALL: [ToolName; 6] = [
        ToolName::FindMovieByName,
        ToolName::SearchMoviesByText,
        ToolName::SearchMoviesByTags,
        ToolName::GetMovieMeta,
        ToolName::SearchVideoVectors,
        ToolName::GetFullTranscript,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::FindMovieByName => "find_movie_by_name",
            ToolName::SearchMoviesByText => "search_movies_by_text",
            ToolName::SearchMoviesByTags => "search_movies_by_tags",
            ToolName::GetMovieMeta => "get_movie_meta",
            ToolName::SearchVideoVectors => "search_video_vectors",
            ToolName::GetFullTranscript => "get_full_transcript",
        }
    }

    /// Exact, case-sensitive lookup; anything else is not a tool
    pub fn parse(name: &str) -> Option<ToolName> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// What the tool does, as shown to the planner
    pub fn description(&self) -> &'static str {
        match self {
            ToolName::FindMovieByName => "tìm phim theo tên/slug (chịu lỗi gõ).",
            ToolName::SearchMoviesByText => "tìm phim theo mô tả tự nhiên.",
            ToolName::SearchMoviesByTags => "tìm phim theo thể loại/tags.",
            ToolName::GetMovieMeta => "lấy thông tin tổng quan phim.",
            ToolName::SearchVideoVectors => {
                "tìm đoạn liên quan trong video (có thể chỉ định tập)."
            }
            ToolName::GetFullTranscript => "lấy toàn bộ transcript của 1 tập.",
        }
    }

    /// Argument list, as shown to the planner
    pub fn args_hint(&self) -> &'static str {
        match self {
            ToolName::FindMovieByName | ToolName::SearchMoviesByText => "{ query, top_k? }",
            ToolName::SearchMoviesByTags => "{ tags, top_k?, match_all? }",
            ToolName::GetMovieMeta => "{ movie_id?, slug?, movie_code? }",
            ToolName::SearchVideoVectors => {
                "{ query, movie_id?, slug?, movie_code?, episode?, top_k? }"
            }
            ToolName::GetFullTranscript => "{ movie_id?, slug?, movie_code?, episode?, max_chars? }",
        }
    }

    /// Numbered tool guide for planner prompts
    pub fn guide() -> String {
        let mut guide = String::new();
        for (i, tool) in Self::ALL.iter().enumerate() {
            guide.push_str(&format!(
                "{}) {}: {}\n   Args: {}\n",
                i + 1,
                tool.as_str(),
                tool.description(),
                tool.args_hint()
            ));
        }
        guide.push_str(
            "\nGợi ý:\n- Nếu user muốn tóm tắt tập, hãy xác định đúng phim/tập trước \
             (find_movie_by_name hoặc search_movies_by_text),\n  sau đó gọi get_full_transcript \
             với episode, rồi mới trả lời.",
        );
        guide
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which movie a tool should look at; tried in the order id, slug, code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieTarget {
    pub movie_id: Option<String>,
    pub slug: Option<String>,
    pub movie_code: Option<String>,
}

impl MovieTarget {
    pub fn slug(slug: impl Into<String>) -> Self {
        Self {
            slug: Some(slug.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.movie_id.is_none() && self.slug.is_none() && self.movie_code.is_none()
    }
}

/// A fully typed tool invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    FindMovieByName {
        query: String,
        top_k: usize,
    },
    SearchMoviesByText {
        query: String,
        top_k: usize,
    },
    SearchMoviesByTags {
        tags: Vec<String>,
        top_k: usize,
        match_all: bool,
    },
    GetMovieMeta {
        target: MovieTarget,
    },
    SearchVideoVectors {
        query: String,
        target: MovieTarget,
        episode: Option<Episode>,
        top_k: usize,
    },
    GetFullTranscript {
        target: MovieTarget,
        episode: Option<Episode>,
        /// `None` disables truncation
        max_chars: Option<usize>,
    },
}

impl ToolCall {
    /// Build a call from planner-supplied arguments.
    ///
    /// Total over every tool: unknown keys are ignored and unusable values
    /// take the tool's default. Missing required text arrives as an empty
    /// string and is reported by the handler.
    pub fn from_args(name: ToolName, args: &Map<String, Value>) -> Self {
        let args = Args(args);
        match name {
            ToolName::FindMovieByName => ToolCall::FindMovieByName {
                query: args.text("query").unwrap_or_default(),
                top_k: args.top_k(FIND_TOP_K),
            },
            ToolName::SearchMoviesByText => ToolCall::SearchMoviesByText {
                query: args.text("query").unwrap_or_default(),
                top_k: args.top_k(SEARCH_TOP_K),
            },
            ToolName::SearchMoviesByTags => ToolCall::SearchMoviesByTags {
                tags: args.tags("tags"),
                top_k: match args.integer("top_k") {
                    Some(k) if k > 0 => k as usize,
                    _ => SEARCH_TOP_K,
                },
                match_all: args.flag("match_all"),
            },
            ToolName::GetMovieMeta => ToolCall::GetMovieMeta {
                target: args.target(),
            },
            ToolName::SearchVideoVectors => ToolCall::SearchVideoVectors {
                query: args.text("query").unwrap_or_default(),
                target: args.target(),
                episode: args.episode(),
                top_k: args.top_k(SEARCH_TOP_K),
            },
            ToolName::GetFullTranscript => ToolCall::GetFullTranscript {
                target: args.target(),
                episode: args.episode(),
                max_chars: match args.0.get("max_chars") {
                    None | Some(Value::Null) => Some(TRANSCRIPT_MAX_CHARS),
                    Some(_) => match args.integer("max_chars") {
                        Some(n) if n > 0 => Some(n as usize),
                        Some(_) => None,
                        None => Some(TRANSCRIPT_MAX_CHARS),
                    },
                },
            },
        }
    }

    pub fn name(&self) -> ToolName {
        match self {
            ToolCall::FindMovieByName { .. } => ToolName::FindMovieByName,
            ToolCall::SearchMoviesByText { .. } => ToolName::SearchMoviesByText,
            ToolCall::SearchMoviesByTags { .. } => ToolName::SearchMoviesByTags,
            ToolCall::GetMovieMeta { .. } => ToolName::GetMovieMeta,
            ToolCall::SearchVideoVectors { .. } => ToolName::SearchVideoVectors,
            ToolCall::GetFullTranscript { .. } => ToolName::GetFullTranscript,
        }
    }
}

/// Lenient accessors over a JSON argument map
struct Args<'a>(&'a Map<String, Value>);

impl Args<'_> {
    /// Trimmed, non-empty text; numbers are accepted as text
    fn text(&self, key: &str) -> Option<String> {
        let text = match self.0.get(key)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }

    /// Integer from a number (truncating floats) or a numeric string
    fn integer(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Result count, at least 1
    fn top_k(&self, default: usize) -> usize {
        self.integer("top_k")
            .map(|k| k.max(1) as usize)
            .unwrap_or(default)
    }

    fn episode(&self) -> Option<Episode> {
        self.integer("episode")
            .and_then(|ep| Episode::try_from(ep).ok())
    }

    fn flag(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            _ => false,
        }
    }

    /// Tag list from an array or a comma-separated string, blanks dropped
    fn tags(&self, key: &str) -> Vec<String> {
        let raw: Vec<String> = match self.0.get(key) {
            Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        raw.into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }

    fn target(&self) -> MovieTarget {
        MovieTarget {
            movie_id: self.text("movie_id"),
            slug: self.text("slug"),
            movie_code: self.text("movie_code"),
        }
    }
}
