//! Интерфейс внешнего провайдера синтеза речи
//!
//! Провайдер скрыт за трейтом: протокол передачи не воспроизводится,
//! используется только контракт типизированных фрагментов потока.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::models::BoundaryKind;

#[doc(hidden)]
pub mod memory;

#[doc(hidden)]
pub use memory::MemoryProvider;

/// Количество тиков провайдера в секунде
pub const TICKS_PER_SECOND: u64 = 10_000_000;

/// Запись каталога голосов в том виде, в котором ее отдает провайдер
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VoiceRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub style_list: Vec<String>,
    #[serde(default)]
    pub voice_type: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub words_per_minute: Option<String>,
}

/// Параметры одного вызова синтеза
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisParams {
    pub text: String,
    pub voice: String,
    pub rate: String,
    pub volume: String,
    pub pitch: String,
    pub boundary: BoundaryKind,
}

/// Граничное событие: временной интервал и фрагмент исходного текста
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryEvent {
    pub kind: BoundaryKind,
    /// Начало в тиках
    pub offset: u64,
    /// Длительность в тиках
    pub duration: u64,
    /// Смещение фрагмента в тексте (в символах)
    pub text_offset: usize,
    /// Длина фрагмента (в символах)
    pub text_length: usize,
}

/// Фрагмент потока провайдера
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechChunk {
    /// Сырые аудиоданные
    Audio(Bytes),
    /// Метаданные границы слова или предложения
    Boundary(BoundaryEvent),
}

/// Поток фрагментов одного вызова синтеза
pub type ChunkStream = BoxStream<'static, Result<SpeechChunk>>;

/// Внешний провайдер синтеза речи
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Получить полный каталог голосов
    async fn fetch_voices(&self) -> Result<Vec<VoiceRecord>>;

    /// Открыть поток синтеза для одного текста
    async fn synthesize(&self, params: &SynthesisParams) -> Result<ChunkStream>;
}
