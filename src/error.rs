//! Модуль обработки ошибок библиотеки tts-tools
//!
//! Этот модуль содержит типы ошибок, которые могут возникнуть при работе библиотеки,
//! и их отображение в конверт ошибки `{code, message, data}` для внешнего протокола.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Ошибка отдельного сегмента пакета
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentFailure {
    /// Позиция сегмента в исходном запросе
    pub index: usize,
    /// Человекочитаемая причина
    pub error: String,
}

impl SegmentFailure {
    pub fn new(index: usize, error: impl Into<String>) -> Self {
        Self {
            index,
            error: error.into(),
        }
    }
}

/// Ошибки библиотеки tts-tools
#[derive(Debug, Error)]
pub enum TtsError {
    /// Некорректные входные параметры
    #[error("Validation error: {0}")]
    Validation(String),

    /// Голос не найден в каталоге
    #[error("Voice not found: {0}")]
    VoiceNotFound(String),

    /// Каталог голосов недоступен
    #[error("Voice catalog unavailable: {0}")]
    ProviderUnavailable(String),

    /// Ошибка, возвращенная провайдером синтеза
    #[error("Provider error: {0}")]
    Provider(String),

    /// Ошибка синтеза речи
    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(String),

    /// Ошибка декодирования, склейки или экспорта аудио
    #[error("Audio assembly failed: {0}")]
    AssemblyFailed(String),

    /// Неподдерживаемый формат аудио
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Неподдерживаемый формат субтитров
    #[error("Unsupported subtitle format: {0} (only srt is supported)")]
    UnsupportedSubtitleFormat(String),

    /// Ни один сегмент пакета не был синтезирован
    #[error("All {} segments failed", errors.len())]
    BatchFailed { errors: Vec<SegmentFailure> },

    /// Операция отменена или превысила лимит времени
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// Неизвестный инструмент
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Ошибка конфигурации
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Другая ошибка
    #[error("Other error: {0}")]
    Other(String),
}

impl TtsError {
    /// Стабильный числовой код ошибки для внешнего протокола
    pub fn code(&self) -> i32 {
        match self {
            Self::VoiceNotFound(_) => 1002,
            Self::Validation(_)
            | Self::UnsupportedFormat(_)
            | Self::UnsupportedSubtitleFormat(_)
            | Self::Configuration(_) => 1003,
            Self::ProviderUnavailable(_) => 1004,
            Self::Provider(_)
            | Self::SynthesisFailed(_)
            | Self::AssemblyFailed(_)
            | Self::BatchFailed { .. }
            | Self::Cancelled(_)
            | Self::Io(_)
            | Self::Json(_) => 1005,
            Self::UnknownTool(_) | Self::Other(_) => 1000,
        }
    }

    /// Ошибки уровня сегмента, которые не прерывают пакет
    pub fn is_segment_level(&self) -> bool {
        matches!(
            self,
            Self::VoiceNotFound(_) | Self::SynthesisFailed(_) | Self::Provider(_)
        )
    }

    /// Преобразовать ошибку в конверт для внешнего протокола
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let data = match self {
            Self::BatchFailed { errors } => json!({ "errors": errors }),
            _ => json!({}),
        };

        ErrorEnvelope {
            code: self.code(),
            message: self.to_string(),
            data,
        }
    }
}

impl From<&str> for TtsError {
    fn from(s: &str) -> Self {
        TtsError::Other(s.to_string())
    }
}

impl From<String> for TtsError {
    fn from(s: String) -> Self {
        TtsError::Other(s)
    }
}

/// Конверт ошибки `{code, message, data}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub code: i32,
    pub message: String,
    pub data: Value,
}

impl ErrorEnvelope {
    /// Обернуть конверт в объект `{"error": {...}}`
    pub fn into_response(self) -> Value {
        json!({ "error": self })
    }
}

/// Тип Result для библиотеки tts-tools
pub type Result<T> = std::result::Result<T, TtsError>;
