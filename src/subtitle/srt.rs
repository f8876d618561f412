//! Построение SRT из граничных событий провайдера

use std::fmt;
use futures::stream::StreamExt;
use crate::error::Result;
use crate::provider::{BoundaryEvent, ChunkStream, SpeechChunk};
use crate::tts::synthesizer::into_synthesis_error;
use super::timestamp::ticks_to_timestamp;

/// Одна запись субтитров
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleCue {
    /// Номер, начиная с 1
    pub index: usize,
    pub start: String,
    pub end: String,
    pub text: String,
}

impl SubtitleCue {
    pub fn from_event(index: usize, event: &BoundaryEvent, source: &str) -> Self {
        Self {
            index,
            start: ticks_to_timestamp(event.offset),
            end: ticks_to_timestamp(event.offset.saturating_add(event.duration)),
            text: char_substring(source, event.text_offset, event.text_length),
        }
    }
}

impl fmt::Display for SubtitleCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{} --> {}\n{}\n", self.index, self.start, self.end, self.text)
    }
}

/// Склеить записи через пустую строку
pub fn render_srt(cues: &[SubtitleCue]) -> String {
    cues.iter()
        .map(|cue| cue.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Подстрока по символьным позициям; выход за границы текста обрезается
fn char_substring(text: &str, offset: usize, length: usize) -> String {
    text.chars().skip(offset).take(length).collect()
}

/// Потребитель потока событий одного вызова синтеза
#[derive(Debug, Default)]
pub struct SubtitleDeriver {
    cues: Vec<SubtitleCue>,
}

impl SubtitleDeriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавить запись для очередного события
    pub fn push(&mut self, event: &BoundaryEvent, source: &str) {
        let cue = SubtitleCue::from_event(self.cues.len() + 1, event, source);
        log::trace!("Cue {}: {} --> {} {:?}", cue.index, cue.start, cue.end, cue.text);
        self.cues.push(cue);
    }

    /// Прочитать поток до конца; аудио игнорируется
    pub async fn consume(mut self, text: &str, mut stream: ChunkStream) -> Result<Vec<SubtitleCue>> {
        while let Some(chunk) = stream.next().await {
            match chunk.map_err(into_synthesis_error)? {
                SpeechChunk::Boundary(event) => self.push(&event, text),
                SpeechChunk::Audio(_) => {}
            }
        }
        log::debug!("Derived {} subtitle cues", self.cues.len());
        Ok(self.cues)
    }

    pub fn cues(&self) -> &[SubtitleCue] {
        &self.cues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;
    use crate::error::TtsError;
    use crate::models::BoundaryKind;
    use crate::subtitle::parse_timestamp;

    fn event(offset: u64, duration: u64, text_offset: usize, text_length: usize) -> BoundaryEvent {
        BoundaryEvent {
            kind: BoundaryKind::WordBoundary,
            offset,
            duration,
            text_offset,
            text_length,
        }
    }

    #[test]
    fn test_cue_from_event() {
        let cue = SubtitleCue::from_event(1, &event(27_500_000, 20_000_000, 6, 5), "Hello world");
        assert_eq!(cue.start, "00:00:02,750");
        assert_eq!(cue.end, "00:00:04,750");
        assert_eq!(cue.text, "world");
        assert_eq!(cue.to_string(), "1\n00:00:02,750 --> 00:00:04,750\nworld\n");
    }

    #[test]
    fn test_substring_uses_characters_and_clamps() {
        assert_eq!(char_substring("Привет мир", 7, 3), "мир");
        assert_eq!(char_substring("short", 3, 100), "rt");
        assert_eq!(char_substring("short", 10, 2), "");
    }

    #[test]
    fn test_render_separates_cues_with_blank_line() {
        let mut deriver = SubtitleDeriver::new();
        deriver.push(&event(0, 5_000_000, 0, 3), "one two");
        deriver.push(&event(5_000_000, 5_000_000, 4, 3), "one two");

        let srt = render_srt(deriver.cues());
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:00,500\none\n\n2\n00:00:00,500 --> 00:00:01,000\ntwo\n"
        );
        assert_eq!(render_srt(&[]), "");
    }

    #[tokio::test]
    async fn test_consume_ignores_audio_and_numbers_from_one() {
        let chunks: Vec<Result<SpeechChunk>> = vec![
            Ok(SpeechChunk::Audio(Bytes::from_static(b"abc"))),
            Ok(SpeechChunk::Boundary(event(1_000_000, 2_000_000, 0, 2))),
            Ok(SpeechChunk::Audio(Bytes::from_static(b"def"))),
            Ok(SpeechChunk::Boundary(event(4_000_000, 2_000_000, 4, 3))),
            Ok(SpeechChunk::Boundary(event(8_000_000, 1_000_000, 8, 5))),
        ];
        let cues = SubtitleDeriver::new()
            .consume("Hi, you there", stream::iter(chunks).boxed())
            .await
            .unwrap();

        let indices: Vec<usize> = cues.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        for cue in &cues {
            assert!(parse_timestamp(&cue.start).unwrap() <= parse_timestamp(&cue.end).unwrap());
        }
        assert_eq!(cues[2].text, "there");
    }

    #[tokio::test]
    async fn test_stream_error_is_synthesis_failure() {
        let chunks: Vec<Result<SpeechChunk>> = vec![
            Ok(SpeechChunk::Boundary(event(0, 1, 0, 1))),
            Err(TtsError::Provider("connection reset".into())),
        ];
        let result = SubtitleDeriver::new()
            .consume("a", stream::iter(chunks).boxed())
            .await;

        assert!(matches!(result, Err(TtsError::SynthesisFailed(msg)) if msg.contains("connection reset")));
    }
}
