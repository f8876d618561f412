//! Модуль конфигурации библиотеки tts-tools
//!
//! Этот модуль содержит структуру настроек и значения по умолчанию.

use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::error::{Result, TtsError};

/// Голос по умолчанию
pub const DEFAULT_VOICE: &str = "en-US-EmmaMultilingualNeural";

/// Конфигурация библиотеки
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsToolsConfig {
    /// Голос, используемый если запрос его не указывает
    pub default_voice: String,
    /// Директория для итоговых аудиофайлов
    pub output_dir: PathBuf,
    /// Максимальное количество одновременных запросов к провайдеру
    pub max_concurrent_requests: usize,
    /// Максимальное количество сегментов в пакете
    pub max_segments: usize,
    /// Максимальная длина текста одного сегмента (в символах)
    pub max_text_length: usize,
    /// Максимальная суммарная длина текста пакета (в символах)
    pub max_batch_characters: usize,
    /// Окно устаревания каталога голосов в секундах
    pub voice_cache_ttl_secs: u64,
    /// Лимит времени на весь пакет в секундах
    pub batch_timeout_secs: Option<u64>,
    /// Путь к исполняемому файлу ffmpeg
    pub ffmpeg_path: String,
    /// Где создавать временные директории склейки; по умолчанию системный каталог
    pub scratch_dir: Option<PathBuf>,
}

impl Default for TtsToolsConfig {
    fn default() -> Self {
        Self {
            default_voice: DEFAULT_VOICE.to_string(),
            output_dir: PathBuf::from("."),
            max_concurrent_requests: 5,
            max_segments: 20,
            max_text_length: 5000,
            max_batch_characters: 10_000,
            voice_cache_ttl_secs: 3600,
            batch_timeout_secs: None,
            ffmpeg_path: "ffmpeg".to_string(),
            scratch_dir: None,
        }
    }
}

impl TtsToolsConfig {
    /// Загрузить конфигурацию из JSON файла
    ///
    /// Отсутствующие поля получают значения по умолчанию.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            TtsError::Configuration(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| TtsError::Configuration(format!("Failed to parse config: {}", e)))?;
        config.validate()?;

        log::debug!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Проверить согласованность настроек
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_requests == 0 {
            return Err(TtsError::Configuration(
                "max_concurrent_requests must be greater than zero".to_string(),
            ));
        }
        if self.max_segments == 0 || self.max_text_length == 0 || self.max_batch_characters == 0 {
            return Err(TtsError::Configuration(
                "segment and character limits must be greater than zero".to_string(),
            ));
        }
        if self.default_voice.trim().is_empty() {
            return Err(TtsError::Configuration("default_voice must not be empty".to_string()));
        }
        Ok(())
    }

    /// Окно устаревания каталога голосов
    pub fn voice_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.voice_cache_ttl_secs)
    }

    /// Лимит времени на пакет, если задан
    pub fn batch_timeout(&self) -> Option<Duration> {
        self.batch_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_request_limits() {
        let config = TtsToolsConfig::default();
        assert_eq!(config.max_segments, 20);
        assert_eq!(config.max_text_length, 5000);
        assert_eq!(config.max_batch_characters, 10_000);
        assert_eq!(config.default_voice, DEFAULT_VOICE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_concurrent_requests": 2, "batch_timeout_secs": 30}}"#).unwrap();

        let config = TtsToolsConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.max_concurrent_requests, 2);
        assert_eq!(config.batch_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.ffmpeg_path, "ffmpeg");
        assert!(config.scratch_dir.is_none());
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let config = TtsToolsConfig {
            max_concurrent_requests: 0,
            ..TtsToolsConfig::default()
        };
        assert!(matches!(config.validate(), Err(TtsError::Configuration(_))));
    }
}
