use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::block::RenderedBlock;
use crate::config::FaithfulnessConfig;

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid url pattern"));

/// How confident the backend is in a retrieved excerpt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

/// A source excerpt backing part of an answer. Referenced from the answer
/// text by its 1-based position, e.g. `[2]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub document_name: String,
    pub text: String,
    pub similarity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<ConfidenceLevel>,
}

impl Citation {
    /// Similarity as a whole percentage, e.g. `0.876` -> `88`.
    pub fn similarity_percent(&self) -> u32 {
        (self.similarity.clamp(0.0, 1.0) * 100.0).round() as u32
    }

    /// The excerpt cut to `max_chars` characters, with `...` appended when
    /// anything was cut.
    pub fn preview(&self, max_chars: usize) -> String {
        match self.text.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{}...", &self.text[..cut]),
            None => self.text.clone(),
        }
    }

    /// Links mentioned inside the excerpt text.
    pub fn urls(&self) -> Vec<&str> {
        URL.find_iter(&self.text).map(|m| m.as_str()).collect()
    }
}

/// Answer payload returned by the backend query and chat endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Chat messages carry the text under `content` instead of `answer`
    #[serde(alias = "content")]
    pub answer: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub faithfulness_score: Option<f64>,
    #[serde(default)]
    pub refused: bool,
}

impl QueryResponse {
    /// Segment the answer and render its inline markup against this
    /// response's own citations.
    pub fn render(&self) -> Vec<RenderedBlock> {
        crate::render_message(&self.answer, &self.citations)
    }

    pub fn faithfulness(&self, thresholds: &FaithfulnessConfig) -> FaithfulnessBand {
        FaithfulnessBand::classify(self.faithfulness_score.unwrap_or(0.0), self.refused, thresholds)
    }
}

/// Display bucket for an answer's faithfulness score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FaithfulnessBand {
    High,
    Medium,
    Low,
    Refused,
}

impl FaithfulnessBand {
    pub fn classify(score: f64, refused: bool, thresholds: &FaithfulnessConfig) -> Self {
        if refused {
            Self::Refused
        } else if score >= thresholds.high {
            Self::High
        } else if score >= thresholds.medium {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Refused => "Refused",
        }
    }
}
