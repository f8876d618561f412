//! Синтез одного сегмента
//!
//! Голос проверяется по каталогу до обращения к провайдеру; аудиофрагменты
//! потока склеиваются в порядке поступления. Повторов на этом уровне нет.

use std::sync::Arc;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use crate::error::{Result, TtsError};
use crate::models::{BoundaryKind, SegmentRequest};
use crate::provider::{ChunkStream, SpeechChunk, SpeechProvider, SynthesisParams};
use crate::voices::VoiceDirectory;

/// Грубая оценка битрейта потока провайдера (байт в секунду)
const ESTIMATED_BYTES_PER_SECOND: f64 = 16_000.0;

/// Приблизительная длительность аудио в секундах по размеру данных
pub fn estimate_duration(audio_len: usize) -> f64 {
    audio_len as f64 / ESTIMATED_BYTES_PER_SECOND
}

pub struct SegmentSynthesizer {
    provider: Arc<dyn SpeechProvider>,
    voices: Arc<VoiceDirectory>,
}

impl SegmentSynthesizer {
    pub fn new(provider: Arc<dyn SpeechProvider>, voices: Arc<VoiceDirectory>) -> Self {
        Self { provider, voices }
    }

    pub fn voices(&self) -> &Arc<VoiceDirectory> {
        &self.voices
    }

    /// Открыть поток провайдера для сегмента после проверки голоса
    pub async fn open_stream(&self, segment: &SegmentRequest) -> Result<ChunkStream> {
        self.open_stream_with(segment, segment.boundary).await
    }

    /// То же, но с явным режимом граничных событий
    pub async fn open_stream_with(&self, segment: &SegmentRequest, boundary: BoundaryKind) -> Result<ChunkStream> {
        let voice = self.voices.resolve(&segment.voice).await?;

        let params = SynthesisParams {
            text: segment.text.clone(),
            voice: if voice.short_name.is_empty() { voice.name } else { voice.short_name },
            rate: segment.rate.clone(),
            volume: segment.volume.clone(),
            pitch: segment.pitch.clone(),
            boundary,
        };

        log::debug!(
            "Opening synthesis stream: voice={}, rate={}, volume={}, pitch={}, boundary={}",
            params.voice,
            params.rate,
            params.volume,
            params.pitch,
            params.boundary.as_str()
        );

        self.provider.synthesize(&params).await.map_err(into_synthesis_error)
    }

    /// Синтезировать сегмент в непрерывную последовательность байт
    pub async fn synthesize(&self, segment: &SegmentRequest) -> Result<Bytes> {
        let mut stream = self.open_stream(segment).await?;

        let mut audio = BytesMut::new();
        let mut audio_chunks = 0usize;
        while let Some(chunk) = stream.next().await {
            match chunk.map_err(into_synthesis_error)? {
                SpeechChunk::Audio(data) => {
                    audio.extend_from_slice(&data);
                    audio_chunks += 1;
                }
                SpeechChunk::Boundary(_) => {}
            }
        }

        if audio.is_empty() {
            return Err(TtsError::SynthesisFailed(format!(
                "provider returned no audio for voice {}",
                segment.voice
            )));
        }

        log::debug!("Received {} audio chunks, {} bytes", audio_chunks, audio.len());
        Ok(audio.freeze())
    }
}

pub(crate) fn into_synthesis_error(error: TtsError) -> TtsError {
    match error {
        TtsError::SynthesisFailed(msg) => TtsError::SynthesisFailed(msg),
        TtsError::Provider(msg) => TtsError::SynthesisFailed(msg),
        other => TtsError::SynthesisFailed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::provider::MemoryProvider;

    fn synthesizer(provider: Arc<MemoryProvider>) -> SegmentSynthesizer {
        let voices = Arc::new(VoiceDirectory::new(provider.clone(), Duration::from_secs(3600)));
        SegmentSynthesizer::new(provider, voices)
    }

    fn provider() -> MemoryProvider {
        MemoryProvider::new(vec![
            MemoryProvider::voice("en-US-GuyNeural", "en-US", "Male"),
            MemoryProvider::voice("ja-JP-NanamiNeural", "ja-JP", "Female"),
        ])
    }

    #[tokio::test]
    async fn test_audio_chunks_are_joined_in_order() {
        let synthesizer = synthesizer(Arc::new(provider()));
        let audio = synthesizer
            .synthesize(&SegmentRequest::new("Hello there", "en-US-GuyNeural"))
            .await
            .unwrap();

        assert_eq!(&audio[..], &MemoryProvider::expected_audio("en-US-GuyNeural", "Hello there")[..]);
    }

    #[tokio::test]
    async fn test_full_name_resolves_to_short_name() {
        let synthesizer = synthesizer(Arc::new(provider()));
        let full_name = MemoryProvider::voice("ja-JP-NanamiNeural", "ja-JP", "Female").name;

        let audio = synthesizer.synthesize(&SegmentRequest::new("こんにちは", full_name)).await.unwrap();
        assert_eq!(&audio[..], &MemoryProvider::expected_audio("ja-JP-NanamiNeural", "こんにちは")[..]);
    }

    #[tokio::test]
    async fn test_unknown_voice_skips_provider() {
        let provider = Arc::new(provider());
        let synthesizer = synthesizer(provider.clone());

        let result = synthesizer.synthesize(&SegmentRequest::new("Hi", "xx-XX-Nobody")).await;
        assert!(matches!(result, Err(TtsError::VoiceNotFound(_))));
        assert_eq!(provider.synthesize_calls(), 0);
    }

    #[tokio::test]
    async fn test_stream_error_is_synthesis_failure() {
        let synthesizer = synthesizer(Arc::new(provider().fail_on("broken")));
        let result = synthesizer.synthesize(&SegmentRequest::new("broken", "en-US-GuyNeural")).await;

        match result {
            Err(TtsError::SynthesisFailed(msg)) => assert!(msg.contains("stream closed")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_stream_is_synthesis_failure() {
        let synthesizer = synthesizer(Arc::new(provider().silent_on("quiet")));
        let result = synthesizer.synthesize(&SegmentRequest::new("quiet", "en-US-GuyNeural")).await;
        assert!(matches!(result, Err(TtsError::SynthesisFailed(_))));
    }

    #[test]
    fn test_estimate_duration() {
        assert_eq!(estimate_duration(32_000), 2.0);
    }
}
