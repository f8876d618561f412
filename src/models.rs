//! Модели запросов и ответов инструментов
//!
//! Запросы проверяются здесь, до попадания в конвейер синтеза:
//! сам конвейер считает параметры корректными.

use std::fmt;
use std::str::FromStr;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use crate::config::{TtsToolsConfig, DEFAULT_VOICE};
use crate::error::{Result, SegmentFailure, TtsError};
use crate::voices::{Voice, VoiceSummary};

lazy_static! {
    static ref PERCENTAGE_RE: Regex = Regex::new(r"^[+-]?\d+%$").expect("valid percentage regex");
    static ref PITCH_RE: Regex = Regex::new(r"^[+-]?\d+Hz$").expect("valid pitch regex");
}

/// Режим выдачи граничных событий
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BoundaryKind {
    /// Граница каждого слова
    WordBoundary,
    /// Граница каждого предложения
    #[default]
    SentenceBoundary,
}

impl BoundaryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WordBoundary => "WordBoundary",
            Self::SentenceBoundary => "SentenceBoundary",
        }
    }
}

/// Формат итогового аудиофайла
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Wav,
    Ogg,
}

impl AudioFormat {
    /// Расширение файла
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Ogg => "ogg",
        }
    }

    /// Аудиокодек ffmpeg для экспорта
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            Self::Mp3 => "libmp3lame",
            Self::Wav => "pcm_s16le",
            Self::Ogg => "libvorbis",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = TtsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "wav" => Ok(Self::Wav),
            "ogg" => Ok(Self::Ogg),
            other => Err(TtsError::UnsupportedFormat(other.to_string())),
        }
    }
}

fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

fn default_adjustment() -> String {
    "+0%".to_string()
}

fn default_pitch() -> String {
    "+0Hz".to_string()
}

fn default_subtitle_format() -> String {
    "srt".to_string()
}

/// Один сегмент синтеза со своими параметрами
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRequest {
    /// Текст сегмента
    pub text: String,
    /// Идентификатор голоса (полное или короткое имя)
    #[serde(default = "default_voice")]
    pub voice: String,
    /// Изменение скорости, например `+10%`
    #[serde(default = "default_adjustment")]
    pub rate: String,
    /// Изменение громкости, например `-5%`
    #[serde(default = "default_adjustment")]
    pub volume: String,
    /// Изменение высоты тона, например `+50Hz`
    #[serde(default = "default_pitch")]
    pub pitch: String,
    /// Режим граничных событий
    #[serde(default)]
    pub boundary: BoundaryKind,
}

impl SegmentRequest {
    /// Сегмент с параметрами по умолчанию
    pub fn new(text: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
            rate: default_adjustment(),
            volume: default_adjustment(),
            pitch: default_pitch(),
            boundary: BoundaryKind::default(),
        }
    }

    /// Количество символов текста
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Проверить параметры сегмента
    pub fn validate(&self, config: &TtsToolsConfig) -> Result<()> {
        let length = self.char_count();
        if length == 0 || length > config.max_text_length {
            return Err(TtsError::Validation(format!(
                "text must contain 1..={} characters, got {}",
                config.max_text_length, length
            )));
        }
        if self.voice.trim().is_empty() {
            return Err(TtsError::Validation("voice must not be empty".to_string()));
        }
        for (name, value) in [("rate", &self.rate), ("volume", &self.volume)] {
            if !PERCENTAGE_RE.is_match(value) {
                return Err(TtsError::Validation(format!(
                    "{} must be a signed percentage like +10% or -5%, got {:?}",
                    name, value
                )));
            }
        }
        if !PITCH_RE.is_match(&self.pitch) {
            return Err(TtsError::Validation(format!(
                "pitch must be a signed frequency like +50Hz or -20Hz, got {:?}",
                self.pitch
            )));
        }
        Ok(())
    }
}

/// Запрос одиночного синтеза
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextToSpeechRequest {
    #[serde(flatten)]
    pub segment: SegmentRequest,
    #[serde(default)]
    pub format: AudioFormat,
    /// Вернуть аудио в base64 вместо записи файла
    #[serde(default)]
    pub inline: bool,
}

impl TextToSpeechRequest {
    pub fn validate(&self, config: &TtsToolsConfig) -> Result<()> {
        self.segment.validate(config)
    }
}

/// Запрос пакетного синтеза
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub segments: Vec<SegmentRequest>,
    #[serde(default)]
    pub format: AudioFormat,
    #[serde(default)]
    pub output_filename: Option<String>,
}

impl BatchRequest {
    pub fn new(segments: Vec<SegmentRequest>, format: AudioFormat) -> Self {
        Self {
            segments,
            format,
            output_filename: None,
        }
    }

    /// Проверить пакет целиком и каждый сегмент
    pub fn validate(&self, config: &TtsToolsConfig) -> Result<()> {
        if self.segments.is_empty() || self.segments.len() > config.max_segments {
            return Err(TtsError::Validation(format!(
                "batch must contain 1..={} segments, got {}",
                config.max_segments,
                self.segments.len()
            )));
        }

        for (index, segment) in self.segments.iter().enumerate() {
            segment.validate(config).map_err(|e| match e {
                TtsError::Validation(msg) => TtsError::Validation(format!("segment {}: {}", index, msg)),
                other => other,
            })?;
        }

        let total: usize = self.segments.iter().map(SegmentRequest::char_count).sum();
        if total > config.max_batch_characters {
            return Err(TtsError::Validation(format!(
                "batch text must not exceed {} characters in total, got {}",
                config.max_batch_characters, total
            )));
        }

        if let Some(name) = &self.output_filename {
            if name.trim().is_empty() {
                return Err(TtsError::Validation("output_filename must not be empty".to_string()));
            }
        }

        Ok(())
    }
}

/// Запрос списка голосов
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListVoicesRequest {
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub name_pattern: Option<String>,
}

impl ListVoicesRequest {
    pub fn validate(&self) -> Result<()> {
        match self.gender.as_deref() {
            None | Some("Male") | Some("Female") => Ok(()),
            Some(other) => Err(TtsError::Validation(format!(
                "gender must be Male or Female, got {:?}",
                other
            ))),
        }
    }

    pub fn has_filters(&self) -> bool {
        self.locale.is_some() || self.gender.is_some() || self.name_pattern.is_some()
    }
}

/// Запрос информации о голосе
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceInfoRequest {
    pub voice_name: String,
}

/// Запрос сохранения аудио из base64
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveAudioRequest {
    pub audio_data: String,
    pub filename: String,
    #[serde(default = "default_format_name")]
    pub format: String,
}

fn default_format_name() -> String {
    AudioFormat::default().extension().to_string()
}

/// Запрос генерации субтитров
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtitleRequest {
    pub text: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_subtitle_format")]
    pub subtitle_format: String,
    #[serde(default)]
    pub boundary_type: BoundaryKind,
}

impl SubtitleRequest {
    pub fn new(text: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
            subtitle_format: default_subtitle_format(),
            boundary_type: BoundaryKind::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.text.is_empty() {
            return Err(TtsError::Validation("text must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Ответ одиночного синтеза, записанного в файл
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechFileResponse {
    pub success: bool,
    pub file_path: String,
    pub file_size: u64,
    /// Приблизительная длительность в секундах
    pub estimated_duration: f64,
    pub message: String,
}

/// Метаданные аудио, возвращенного в base64
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioMetadata {
    pub voice: String,
    pub text_length: usize,
    pub audio_duration: f64,
    pub format: AudioFormat,
}

/// Ответ одиночного синтеза с аудио в теле ответа
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineAudioResponse {
    pub audio_data: String,
    pub metadata: AudioMetadata,
}

/// Ответ пакетного синтеза
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub success: bool,
    pub file_path: String,
    pub file_size: u64,
    pub segment_count: usize,
    pub processed_count: usize,
    pub failed_count: usize,
    pub errors: Vec<SegmentFailure>,
    pub message: String,
}

/// Ответ со списком голосов
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceListResponse {
    pub voices: Vec<Voice>,
    pub total_count: usize,
}

/// Ответ с информацией о голосе
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceInfoResponse {
    pub voice: Voice,
}

/// Ответ сохранения аудио
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveAudioResponse {
    pub success: bool,
    pub file_path: String,
    pub file_size: u64,
}

/// Ответ генерации субтитров
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtitleResponse {
    pub subtitles: String,
    pub format: String,
    pub segment_count: usize,
}

/// Результат одиночного синтеза: файл или аудио в теле ответа
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpeechOutput {
    File(SpeechFileResponse),
    Inline(InlineAudioResponse),
}

/// Список голосов по фильтру или сводка по всему каталогу
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VoiceListing {
    Voices(VoiceListResponse),
    Summary(VoiceSummary),
}
