//! Пакетная обработка сегментов
//!
//! Каждый сегмент синтезируется независимо, параллельно в пределах лимита.
//! Ошибка сегмента фиксируется и не прерывает остальные. Результаты
//! упорядочиваются по исходной позиции, а не по порядку завершения.

use bytes::Bytes;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use crate::error::{Result, SegmentFailure, TtsError};
use crate::models::SegmentRequest;
use crate::progress::{BatchStep, ProgressTracker};
use super::synthesizer::SegmentSynthesizer;

/// Успешно синтезированный сегмент
#[derive(Debug, Clone)]
pub struct SynthesizedSegment {
    /// Позиция в исходном запросе
    pub index: usize,
    pub text: String,
    pub voice: String,
    pub audio: Bytes,
}

/// Итог пакетной обработки до сборки аудио
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub total: usize,
    /// Успешные сегменты по возрастанию позиции
    pub successes: Vec<SynthesizedSegment>,
    /// Ошибки по возрастанию позиции
    pub failures: Vec<SegmentFailure>,
}

impl BatchOutcome {
    pub fn processed_count(&self) -> usize {
        self.successes.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    /// `BatchFailed`, если не удалось ни одного сегмента
    pub fn ensure_any_success(self) -> Result<Self> {
        if self.successes.is_empty() {
            return Err(TtsError::BatchFailed { errors: self.failures });
        }
        Ok(self)
    }
}

pub struct BatchOrchestrator<'a> {
    synthesizer: &'a SegmentSynthesizer,
    max_concurrent: usize,
    tracker: Option<&'a ProgressTracker>,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(synthesizer: &'a SegmentSynthesizer, max_concurrent: usize) -> Self {
        Self {
            synthesizer,
            max_concurrent: max_concurrent.max(1),
            tracker: None,
        }
    }

    pub fn with_tracker(mut self, tracker: Option<&'a ProgressTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    /// Синтезировать все сегменты
    ///
    /// Будущие значения сегментов опрашиваются на месте, без `tokio::spawn`:
    /// если весь пакет отменен (drop или таймаут), незавершенные вызовы
    /// провайдера отменяются вместе с ним.
    pub async fn run(&self, segments: &[SegmentRequest]) -> BatchOutcome {
        let total = segments.len();
        log::info!(
            "Starting batch synthesis: {} segments, up to {} concurrent requests",
            total,
            self.max_concurrent
        );

        if let Some(t) = self.tracker {
            t.set_step(BatchStep::VoiceLookup);
        }
        // Прогреваем каталог один раз, чтобы сегменты не запрашивали его параллельно.
        // Ошибка здесь не фатальна: каждый сегмент повторит загрузку и зафиксирует причину.
        if let Err(e) = self.synthesizer.voices().catalog().await {
            log::warn!("Voice catalog warm-up failed: {}", e);
        }

        if let Some(t) = self.tracker {
            t.set_step(BatchStep::Synthesis);
        }

        let semaphore = Semaphore::new(self.max_concurrent);
        let semaphore = &semaphore;

        let mut pending: FuturesUnordered<_> = segments
            .iter()
            .enumerate()
            .map(|(index, segment)| async move {
                let result = async {
                    let _permit = semaphore
                        .acquire()
                        .await
                        .map_err(|e| TtsError::Cancelled(format!("segment limiter closed: {}", e)))?;
                    log::debug!("Synthesizing segment {} with voice {}", index, segment.voice);
                    self.synthesizer.synthesize(segment).await
                }
                .await;
                (index, result)
            })
            .collect();

        let mut outcome = BatchOutcome {
            total,
            ..Default::default()
        };
        let mut completed = 0usize;

        while let Some((index, result)) = pending.next().await {
            completed += 1;
            match result {
                Ok(audio) => {
                    log::info!("Segment {} synthesized: {} bytes", index, audio.len());
                    let segment = &segments[index];
                    outcome.successes.push(SynthesizedSegment {
                        index,
                        text: segment.text.clone(),
                        voice: segment.voice.clone(),
                        audio,
                    });
                }
                Err(e) => {
                    if e.is_segment_level() {
                        log::warn!("Segment {} failed: {}", index, e);
                    } else {
                        log::error!("Segment {} failed unexpectedly: {}", index, e);
                    }
                    outcome.failures.push(SegmentFailure::new(index, e.to_string()));
                }
            }

            if let Some(t) = self.tracker {
                t.update_step_progress(
                    completed as f32 / total as f32 * 100.0,
                    Some(format!("Synthesized {}/{} segments", completed, total)),
                );
            }
        }

        outcome.successes.sort_by_key(|segment| segment.index);
        outcome.failures.sort_by_key(|failure| failure.index);

        log::info!(
            "Batch synthesis finished: {} succeeded, {} failed",
            outcome.processed_count(),
            outcome.failed_count()
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use crate::provider::MemoryProvider;
    use crate::voices::VoiceDirectory;

    fn synthesizer(provider: MemoryProvider) -> SegmentSynthesizer {
        let provider = Arc::new(provider);
        let voices = Arc::new(VoiceDirectory::new(provider.clone(), Duration::from_secs(3600)));
        SegmentSynthesizer::new(provider, voices)
    }

    fn voices() -> Vec<crate::provider::VoiceRecord> {
        vec![
            MemoryProvider::voice("en-US-GuyNeural", "en-US", "Male"),
            MemoryProvider::voice("zh-CN-XiaoxiaoNeural", "zh-CN", "Female"),
        ]
    }

    #[tokio::test]
    async fn test_failure_keeps_positions() {
        let synthesizer = synthesizer(MemoryProvider::new(voices()));
        let segments = vec![
            SegmentRequest::new("A", "en-US-GuyNeural"),
            SegmentRequest::new("B", "xx-XX-Missing"),
            SegmentRequest::new("C", "zh-CN-XiaoxiaoNeural"),
        ];

        let outcome = BatchOrchestrator::new(&synthesizer, 2).run(&segments).await;

        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.processed_count(), 2);
        assert_eq!(outcome.failed_count(), 1);
        assert_eq!(outcome.failures[0].index, 1);
        assert!(outcome.failures[0].error.contains("xx-XX-Missing"));
        let indices: Vec<usize> = outcome.successes.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[tokio::test]
    async fn test_all_failures_become_batch_failed() {
        let synthesizer = synthesizer(MemoryProvider::new(voices()).fail_on("x"));
        let segments = vec![
            SegmentRequest::new("x", "en-US-GuyNeural"),
            SegmentRequest::new("y", "nobody"),
        ];

        let outcome = BatchOrchestrator::new(&synthesizer, 4).run(&segments).await;
        match outcome.ensure_any_success() {
            Err(TtsError::BatchFailed { errors }) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].index, 0);
                assert_eq!(errors[1].index, 1);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_catalog_outage_is_recorded_per_segment() {
        let provider = MemoryProvider::new(voices());
        provider.set_catalog_down(true);
        let synthesizer = synthesizer(provider);

        let segments = vec![SegmentRequest::new("A", "en-US-GuyNeural")];
        let outcome = BatchOrchestrator::new(&synthesizer, 1).run(&segments).await;

        assert_eq!(outcome.failed_count(), 1);
        assert!(outcome.failures[0].error.contains("unavailable"));
    }

    #[tokio::test]
    async fn test_progress_reaches_full_synthesis() {
        let synthesizer = synthesizer(MemoryProvider::new(voices()));
        let tracker = ProgressTracker::new();
        let segments = vec![SegmentRequest::new("one two", "en-US-GuyNeural"); 4];

        let outcome = BatchOrchestrator::new(&synthesizer, 2)
            .with_tracker(Some(&tracker))
            .run(&segments)
            .await;

        assert_eq!(outcome.processed_count(), 4);
        // 5% за поиск голосов + 80% за синтез
        assert!((tracker.total_progress() - 85.0).abs() < 0.01);
    }
}
