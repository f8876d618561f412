//! Субтитры из граничных событий синтеза

use std::str::FromStr;
use crate::error::TtsError;

pub mod srt;
pub mod timestamp;

pub use srt::{render_srt, SubtitleCue, SubtitleDeriver};
pub use timestamp::{parse_timestamp, ticks_to_timestamp};

/// Поддерживаемые форматы субтитров
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    Srt,
}

impl SubtitleFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
        }
    }

    pub fn render(&self, cues: &[SubtitleCue]) -> String {
        match self {
            Self::Srt => render_srt(cues),
        }
    }
}

impl FromStr for SubtitleFormat {
    type Err = TtsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "srt" => Ok(Self::Srt),
            _ => Err(TtsError::UnsupportedSubtitleFormat(s.to_string())),
        }
    }
}
