//! Compact entry descriptions handed to the planner and the user.

use catalog::{CatalogEntry, EntryHeadline, EntryKind};
use serde::{Deserialize, Serialize};

/// What tool results and clarification lists say about a movie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieBrief {
    /// Secondary code, as the site exposes it
    pub id: Option<String>,
    pub slug: String,
    pub title: String,
    pub year: Option<u16>,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl MovieBrief {
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// One numbered line of a clarification list: `2. Title (1999)`
    pub fn clarification_line(&self, position: usize) -> String {
        let title = if self.title.is_empty() {
            "Không rõ"
        } else {
            self.title.as_str()
        };
        match self.year {
            Some(year) => format!("{position}. {title} ({year})"),
            None => format!("{position}. {title}"),
        }
    }
}

impl From<&CatalogEntry> for MovieBrief {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            id: entry.code.clone(),
            slug: entry.slug.clone(),
            title: entry.title.clone(),
            year: entry.year,
            kind: entry.kind,
            link: entry.link(),
            score: None,
        }
    }
}

impl From<&EntryHeadline> for MovieBrief {
    fn from(headline: &EntryHeadline) -> Self {
        Self {
            id: headline.code.clone(),
            slug: headline.slug.clone(),
            title: headline.title.clone(),
            year: headline.year,
            kind: headline.kind,
            link: headline.link(),
            score: None,
        }
    }
}
