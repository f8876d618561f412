//! Каталог голосов
//!
//! Каталог загружается у провайдера при первом обращении и кэшируется на время
//! жизни процесса. Записи неизменяемы, поэтому чтение не требует блокировок
//! дольше, чем на копирование `Arc`. Одновременная первая загрузка безопасна:
//! все загрузки сходятся к одинаковому набору.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use crate::error::{Result, TtsError};
use crate::models::ListVoicesRequest;
use crate::provider::{SpeechProvider, VoiceRecord};

/// Голос из каталога
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    pub short_name: String,
    pub gender: String,
    pub locale: String,
    pub supported_styles: Vec<String>,
    pub voice_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words_per_minute: Option<String>,
}

impl Voice {
    /// Совпадает ли идентификатор с полным или коротким именем
    pub fn is_identified_by(&self, identifier: &str) -> bool {
        self.name == identifier || self.short_name == identifier
    }
}

impl From<VoiceRecord> for Voice {
    fn from(record: VoiceRecord) -> Self {
        Self {
            name: record.name,
            short_name: record.short_name,
            gender: record.gender,
            locale: record.locale,
            supported_styles: record.style_list,
            voice_type: record.voice_type,
            status: record.status,
            words_per_minute: record.words_per_minute,
        }
    }
}

/// Фильтр списка голосов; все условия объединяются через И
#[derive(Debug, Clone, Default)]
pub struct VoiceFilter {
    /// Точное совпадение локали без учета регистра
    pub locale: Option<String>,
    /// Точное совпадение пола без учета регистра
    pub gender: Option<String>,
    /// Подстрока полного имени без учета регистра
    pub name_pattern: Option<String>,
}

impl VoiceFilter {
    pub fn matches(&self, voice: &Voice) -> bool {
        if let Some(locale) = &self.locale {
            if !voice.locale.eq_ignore_ascii_case(locale) {
                return false;
            }
        }
        if let Some(gender) = &self.gender {
            if !voice.gender.eq_ignore_ascii_case(gender) {
                return false;
            }
        }
        if let Some(pattern) = &self.name_pattern {
            if !voice.name.to_lowercase().contains(&pattern.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

impl From<&ListVoicesRequest> for VoiceFilter {
    fn from(request: &ListVoicesRequest) -> Self {
        Self {
            locale: request.locale.clone(),
            gender: request.gender.clone(),
            name_pattern: request.name_pattern.clone(),
        }
    }
}

/// Краткая сводка по каталогу
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSummary {
    pub total_count: usize,
    pub locales: Vec<String>,
    pub genders: BTreeMap<String, usize>,
}

/// Снимок каталога на момент загрузки
#[derive(Debug)]
pub struct VoiceCatalog {
    voices: Vec<Voice>,
    fetched_at: Instant,
}

impl VoiceCatalog {
    fn new(records: Vec<VoiceRecord>) -> Self {
        Self {
            voices: records.into_iter().map(Voice::from).collect(),
            fetched_at: Instant::now(),
        }
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    fn find(&self, identifier: &str) -> Option<&Voice> {
        self.voices.iter().find(|voice| voice.is_identified_by(identifier))
    }
}

/// Владелец кэша каталога голосов
pub struct VoiceDirectory {
    provider: Arc<dyn SpeechProvider>,
    catalog: RwLock<Option<Arc<VoiceCatalog>>>,
    ttl: Duration,
}

impl VoiceDirectory {
    pub fn new(provider: Arc<dyn SpeechProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            catalog: RwLock::new(None),
            ttl,
        }
    }

    /// Текущий каталог; загружается при первом обращении
    pub async fn catalog(&self) -> Result<Arc<VoiceCatalog>> {
        let cached = self.catalog.read().clone();
        match cached {
            Some(catalog) => Ok(catalog),
            None => self.refresh().await,
        }
    }

    /// Принудительно перезагрузить каталог у провайдера
    ///
    /// Ошибка загрузки не кэшируется: следующий вызов повторит запрос.
    pub async fn refresh(&self) -> Result<Arc<VoiceCatalog>> {
        log::debug!("Fetching voice catalog from provider");
        let records = self.provider.fetch_voices().await.map_err(|e| {
            log::error!("Failed to fetch voice catalog: {}", e);
            match e {
                TtsError::ProviderUnavailable(msg) => TtsError::ProviderUnavailable(msg),
                other => TtsError::ProviderUnavailable(other.to_string()),
            }
        })?;

        let catalog = Arc::new(VoiceCatalog::new(records));
        log::info!("Voice catalog loaded: {} voices", catalog.voices().len());
        *self.catalog.write() = Some(catalog.clone());
        Ok(catalog)
    }

    /// Устарел ли каталог относительно настроенного окна
    ///
    /// Незагруженный каталог не считается устаревшим.
    pub fn is_stale(&self) -> bool {
        self.catalog
            .read()
            .as_ref()
            .map(|catalog| catalog.age() >= self.ttl)
            .unwrap_or(false)
    }

    /// Обновить каталог, если он устарел; при ошибке остается старый снимок
    pub async fn refresh_if_stale(&self) -> Result<Arc<VoiceCatalog>> {
        if !self.is_stale() {
            return self.catalog().await;
        }

        match self.refresh().await {
            Ok(catalog) => Ok(catalog),
            Err(e) => {
                log::warn!("Keeping stale voice catalog after failed refresh: {}", e);
                self.catalog().await
            }
        }
    }

    /// Голоса, подходящие под фильтр
    pub async fn list(&self, filter: &VoiceFilter) -> Result<Vec<Voice>> {
        let catalog = self.catalog().await?;
        Ok(catalog
            .voices()
            .iter()
            .filter(|voice| filter.matches(voice))
            .cloned()
            .collect())
    }

    /// Найти голос по полному или короткому имени
    pub async fn resolve(&self, identifier: &str) -> Result<Voice> {
        let catalog = self.catalog().await?;
        catalog
            .find(identifier)
            .cloned()
            .ok_or_else(|| TtsError::VoiceNotFound(identifier.to_string()))
    }

    /// Сводка по каталогу
    pub async fn summary(&self) -> Result<VoiceSummary> {
        let catalog = self.catalog().await?;

        let mut locales: Vec<String> = catalog.voices().iter().map(|v| v.locale.clone()).collect();
        locales.sort();
        locales.dedup();

        let mut genders = BTreeMap::new();
        for voice in catalog.voices() {
            *genders.entry(voice.gender.clone()).or_insert(0) += 1;
        }

        Ok(VoiceSummary {
            total_count: catalog.voices().len(),
            locales,
            genders,
        })
    }
}
