//! Провайдер в памяти
//!
//! Детерминированная реализация `SpeechProvider` без сети: аудио каждого вызова
//! равно байтам `[voice|text]`, граничные события расставляются по словам
//! с шагом в полсекунды. Используется в тестах и для локальной проверки конвейера.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use crate::error::{Result, TtsError};
use crate::models::BoundaryKind;
use super::{BoundaryEvent, ChunkStream, SpeechChunk, SpeechProvider, SynthesisParams, VoiceRecord};

/// Шаг между словами в тиках (0.5 с)
const WORD_STEP_TICKS: u64 = 5_000_000;
/// Длительность одного слова в тиках (0.4 с)
const WORD_DURATION_TICKS: u64 = 4_000_000;

pub struct MemoryProvider {
    voices: Vec<VoiceRecord>,
    failing_texts: HashSet<String>,
    silent_texts: HashSet<String>,
    scripted: HashMap<String, Vec<SpeechChunk>>,
    catalog_down: AtomicBool,
    chunk_size: usize,
    fetch_calls: AtomicUsize,
    synthesize_calls: AtomicUsize,
}

impl MemoryProvider {
    pub fn new(voices: Vec<VoiceRecord>) -> Self {
        Self {
            voices,
            failing_texts: HashSet::new(),
            silent_texts: HashSet::new(),
            scripted: HashMap::new(),
            catalog_down: AtomicBool::new(false),
            chunk_size: 4,
            fetch_calls: AtomicUsize::new(0),
            synthesize_calls: AtomicUsize::new(0),
        }
    }

    /// Запись каталога с типичными для провайдера полями
    pub fn voice(short_name: &str, locale: &str, gender: &str) -> VoiceRecord {
        VoiceRecord {
            name: format!("Microsoft Server Speech Text to Speech Voice ({}, {})", locale, short_name),
            short_name: short_name.to_string(),
            gender: gender.to_string(),
            locale: locale.to_string(),
            style_list: Vec::new(),
            voice_type: "Neural".to_string(),
            status: Some("GA".to_string()),
            words_per_minute: None,
        }
    }

    /// Поток для этого текста завершится ошибкой после первого фрагмента
    pub fn fail_on(mut self, text: impl Into<String>) -> Self {
        self.failing_texts.insert(text.into());
        self
    }

    /// Поток для этого текста не будет содержать аудио
    pub fn silent_on(mut self, text: impl Into<String>) -> Self {
        self.silent_texts.insert(text.into());
        self
    }

    /// Задать точную последовательность фрагментов для текста
    pub fn script(mut self, text: impl Into<String>, chunks: Vec<SpeechChunk>) -> Self {
        self.scripted.insert(text.into(), chunks);
        self
    }

    /// Сделать каталог голосов недоступным или снова доступным
    pub fn set_catalog_down(&self, down: bool) {
        self.catalog_down.store(down, Ordering::SeqCst);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn synthesize_calls(&self) -> usize {
        self.synthesize_calls.load(Ordering::SeqCst)
    }

    /// Аудио, которое провайдер выдаст для голоса и текста
    pub fn expected_audio(voice: &str, text: &str) -> Vec<u8> {
        format!("[{}|{}]", voice, text).into_bytes()
    }

    fn boundaries(params: &SynthesisParams) -> Vec<BoundaryEvent> {
        match params.boundary {
            BoundaryKind::SentenceBoundary => {
                let words = params.text.split_whitespace().count().max(1) as u64;
                vec![BoundaryEvent {
                    kind: BoundaryKind::SentenceBoundary,
                    offset: 0,
                    duration: (words - 1) * WORD_STEP_TICKS + WORD_DURATION_TICKS,
                    text_offset: 0,
                    text_length: params.text.chars().count(),
                }]
            }
            BoundaryKind::WordBoundary => {
                let mut events = Vec::new();
                let mut word_start: Option<usize> = None;
                let chars: Vec<char> = params.text.chars().collect();
                for position in 0..=chars.len() {
                    let is_space = chars.get(position).map_or(true, |c| c.is_whitespace());
                    match (word_start, is_space) {
                        (None, false) => word_start = Some(position),
                        (Some(start), true) => {
                            let n = events.len() as u64;
                            events.push(BoundaryEvent {
                                kind: BoundaryKind::WordBoundary,
                                offset: n * WORD_STEP_TICKS,
                                duration: WORD_DURATION_TICKS,
                                text_offset: start,
                                text_length: position - start,
                            });
                            word_start = None;
                        }
                        _ => {}
                    }
                }
                events
            }
        }
    }
}

#[async_trait]
impl SpeechProvider for MemoryProvider {
    async fn fetch_voices(&self) -> Result<Vec<VoiceRecord>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.catalog_down.load(Ordering::SeqCst) {
            return Err(TtsError::ProviderUnavailable("catalog endpoint unreachable".to_string()));
        }
        Ok(self.voices.clone())
    }

    async fn synthesize(&self, params: &SynthesisParams) -> Result<ChunkStream> {
        self.synthesize_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(chunks) = self.scripted.get(&params.text) {
            let items: Vec<Result<SpeechChunk>> = chunks.iter().cloned().map(Ok).collect();
            return Ok(Box::pin(stream::iter(items)));
        }

        let audio = Self::expected_audio(&params.voice, &params.text);
        let mut items: Vec<Result<SpeechChunk>> = Vec::new();

        if !self.silent_texts.contains(&params.text) {
            for chunk in audio.chunks(self.chunk_size.max(1)) {
                items.push(Ok(SpeechChunk::Audio(Bytes::copy_from_slice(chunk))));
            }
        }
        for event in Self::boundaries(params) {
            items.push(Ok(SpeechChunk::Boundary(event)));
        }

        if self.failing_texts.contains(&params.text) {
            items.truncate(1);
            items.push(Err(TtsError::Provider("stream closed unexpectedly".to_string())));
        }

        Ok(Box::pin(stream::iter(items)))
    }
}
