//! Prompt templates for the text-analysis helpers.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_LENGTH: u32 = 200;
const INSIGHTS_MAX_LENGTH: u32 = 400;
const COMPARE_MAX_LENGTH: u32 = 300;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    Summary,
    Mood,
    Theme,
    Genre,
    General,
}

impl AnalysisMode {
    /// Unrecognised modes fall back to a general analysis.
    pub fn parse(mode: &str) -> Self {
        match mode.trim().to_ascii_lowercase().as_str() {
            "summary" => AnalysisMode::Summary,
            "mood" => AnalysisMode::Mood,
            "theme" | "themes" => AnalysisMode::Theme,
            "genre" => AnalysisMode::Genre,
            _ => AnalysisMode::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Summary => "summary",
            AnalysisMode::Mood => "mood",
            AnalysisMode::Theme => "theme",
            AnalysisMode::Genre => "genre",
            AnalysisMode::General => "general",
        }
    }

    pub fn max_length(&self) -> u32 {
        match self {
            AnalysisMode::Genre => 100,
            AnalysisMode::Summary | AnalysisMode::Mood => 150,
            AnalysisMode::Theme | AnalysisMode::General => DEFAULT_MAX_LENGTH,
        }
    }

    pub fn prompt(&self, text: &str) -> String {
        let text = text.trim();
        match self {
            AnalysisMode::Summary => format!(
                "Summarize the following song lyrics in two or three sentences.\n\nLyrics:\n{text}\n\nSummary:"
            ),
            AnalysisMode::Mood => format!(
                "Describe the emotional mood and tone of the following song lyrics. \
                 Name the dominant emotions and how they change over the song.\n\nLyrics:\n{text}\n\nMood:"
            ),
            AnalysisMode::Theme => format!(
                "List the main themes of the following song lyrics, one per line, \
                 each with a short explanation.\n\nLyrics:\n{text}\n\nThemes:"
            ),
            AnalysisMode::Genre => format!(
                "Based only on the lyrics below, suggest the most likely music genre \
                 and one or two alternatives, with a one-line reason.\n\nLyrics:\n{text}\n\nGenre:"
            ),
            AnalysisMode::General => format!(
                "Analyze the following text. Cover its subject, tone and anything notable \
                 about its style.\n\nText:\n{text}\n\nAnalysis:"
            ),
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn compare_prompt(a: &str, b: &str) -> (String, u32) {
    let prompt = format!(
        "Compare the two texts below. Say how similar they are, where they differ, \
         and which one looks more complete and accurate.\n\nText A:\n{}\n\nText B:\n{}\n\nComparison:",
        a.trim(),
        b.trim()
    );
    (prompt, COMPARE_MAX_LENGTH)
}

/// Song details that sharpen the insights prompt. All optional.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SongMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub duration: Option<f64>,
}

pub fn insights_prompt(text: &str, meta: &SongMetadata) -> (String, u32) {
    let mut header = String::new();
    if let Some(title) = meta.title.as_deref().filter(|t| !t.is_empty()) {
        header.push_str(&format!("Title: {title}\n"));
    }
    if let Some(genre) = meta.genre.as_deref().filter(|g| !g.is_empty()) {
        header.push_str(&format!("Genre: {genre}\n"));
    }
    if let Some(secs) = meta.duration.filter(|d| d.is_finite() && *d > 0.0) {
        let secs = secs.round() as u64;
        header.push_str(&format!("Duration: {}:{:02}\n", secs / 60, secs % 60));
    }

    let prompt = format!(
        "You are a music analyst. Give insights about this song: its story, \
         songwriting techniques, notable imagery, and what kind of listener it \
         would resonate with.\n\n{header}\nLyrics:\n{}\n\nInsights:",
        text.trim()
    );
    (prompt, INSIGHTS_MAX_LENGTH)
}
