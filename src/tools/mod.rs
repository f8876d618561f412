//! Инструменты синтеза речи, голосов и субтитров
//!
//! `TtsTools` связывает каталог голосов, синтез сегментов, сборку аудио
//! и построение субтитров. Каждый метод соответствует одному удаленно
//! вызываемому инструменту; `call_tool` разбирает JSON-аргументы и
//! возвращает результат или конверт ошибки.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use path_clean::PathClean;
use crate::config::TtsToolsConfig;
use crate::error::{Result, TtsError};
use crate::media::{write_artifact, AudioAssembler, AudioProcessor, FfmpegProcessor};
use crate::models::{
    AudioFormat, AudioMetadata, BatchRequest, BatchResponse, InlineAudioResponse, ListVoicesRequest,
    SaveAudioRequest, SaveAudioResponse, SegmentRequest, SpeechFileResponse, SpeechOutput, SubtitleRequest,
    SubtitleResponse, TextToSpeechRequest, VoiceInfoRequest, VoiceInfoResponse, VoiceListResponse,
    VoiceListing,
};
use crate::progress::{
    BatchStep, DefaultProgressReporter, ProgressObserver, ProgressReporter, ProgressTracker, SharedProgressReporter,
};
use crate::provider::SpeechProvider;
use crate::subtitle::{SubtitleDeriver, SubtitleFormat};
use crate::tts::{estimate_duration, BatchOrchestrator, SegmentSynthesizer};
use crate::utils::naming::{artifact_file_name, resolve_output_path, resolve_path_with_extension};
use crate::voices::{VoiceDirectory, VoiceFilter};

pub mod dispatch;
pub mod schema;

pub use schema::{tool_definitions, ToolDefinition};

/// Основная структура для работы с библиотекой
pub struct TtsTools {
    config: TtsToolsConfig,
    voices: Arc<VoiceDirectory>,
    synthesizer: SegmentSynthesizer,
    assembler: AudioAssembler,
    progress: Option<SharedProgressReporter>,
    /// Наблюдатели, добавленные через `add_observer`
    observer_ids: Vec<usize>,
}

impl TtsTools {
    /// Создать экземпляр с заданными провайдером и обработчиком аудио
    pub fn new(
        config: TtsToolsConfig,
        provider: Arc<dyn SpeechProvider>,
        processor: Arc<dyn AudioProcessor>,
    ) -> Result<Self> {
        config.validate()?;

        let voices = Arc::new(VoiceDirectory::new(provider.clone(), config.voice_cache_ttl()));
        let synthesizer = SegmentSynthesizer::new(provider, voices.clone());

        Ok(Self {
            config,
            voices,
            synthesizer,
            assembler: AudioAssembler::new(processor),
            progress: None,
            observer_ids: Vec::new(),
        })
    }

    /// Создать экземпляр, склеивающий аудио через FFmpeg из конфигурации
    pub fn with_ffmpeg(config: TtsToolsConfig, provider: Arc<dyn SpeechProvider>) -> Result<Self> {
        let mut processor = FfmpegProcessor::new(config.ffmpeg_path.clone());
        if let Some(root) = &config.scratch_dir {
            processor = processor.with_scratch_root(root.clone());
        }
        let processor = Arc::new(processor);
        Self::new(config, provider, processor)
    }

    /// Подключить репортер прогресса для пакетного синтеза
    pub fn with_progress_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.set_progress_reporter(reporter);
        self
    }

    /// Заменить репортер прогресса
    ///
    /// Наблюдатели, добавленные через [`TtsTools::add_observer`], переносятся
    /// в новый репортер и получают новые идентификаторы.
    pub fn set_progress_reporter(&mut self, reporter: Box<dyn ProgressReporter>) {
        match &self.progress {
            Some(shared) => self.observer_ids = shared.replace(reporter, &self.observer_ids),
            None => self.progress = Some(SharedProgressReporter::new(reporter)),
        }
    }

    /// Добавить наблюдателя прогресса
    ///
    /// Каждый пакет отслеживается отдельным трекером; обновления
    /// параллельных пакетов различаются по полю `operation`.
    pub fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize {
        let shared = self
            .progress
            .get_or_insert_with(|| SharedProgressReporter::new(Box::new(DefaultProgressReporter::new())));
        let id = shared.add_observer(observer);
        self.observer_ids.push(id);
        id
    }

    pub fn config(&self) -> &TtsToolsConfig {
        &self.config
    }

    pub fn voices(&self) -> &Arc<VoiceDirectory> {
        &self.voices
    }

    /// Синтезировать пакет сегментов в один аудиофайл
    pub async fn batch_text_to_speech(&self, request: BatchRequest) -> Result<BatchResponse> {
        request.validate(&self.config)?;

        let output_path = match &request.output_filename {
            Some(name) => resolve_output_path(&self.config.output_dir, name, request.format)?,
            None => self.config.output_dir.join(artifact_file_name(
                "batch_tts",
                request.segments.iter().map(|segment| segment.text.as_str()),
                request.format.extension(),
            )),
        };
        let output_path = absolute_path(&output_path)?;

        let tracker = self.progress.as_ref().map(|shared| {
            ProgressTracker::with_reporter(Box::new(shared.clone()))
                .with_operation(output_path.to_string_lossy().into_owned())
        });

        let work = self.run_batch(&request, &output_path, tracker.as_ref());
        let result = match self.config.batch_timeout() {
            Some(limit) => match tokio::time::timeout(limit, work).await {
                Ok(result) => result,
                Err(_) => {
                    log::error!("Batch cancelled after {:?}", limit);
                    Err(TtsError::Cancelled(format!(
                        "batch did not finish within {} seconds",
                        limit.as_secs()
                    )))
                }
            },
            None => work.await,
        };

        if let (Err(e), Some(t)) = (&result, &tracker) {
            t.fail(e);
        }
        result
    }

    async fn run_batch(
        &self,
        request: &BatchRequest,
        output_path: &Path,
        tracker: Option<&ProgressTracker>,
    ) -> Result<BatchResponse> {
        let outcome = BatchOrchestrator::new(&self.synthesizer, self.config.max_concurrent_requests)
            .with_tracker(tracker)
            .run(&request.segments)
            .await
            .ensure_any_success()?;

        if let Some(t) = tracker {
            t.set_step(BatchStep::Assembly);
        }
        let artifact = self
            .assembler
            .assemble(&outcome.successes, request.format, output_path)
            .await?;
        if let Some(t) = tracker {
            t.complete();
        }

        let mut message = format!(
            "Processed {} of {} segments into {}",
            outcome.processed_count(),
            outcome.total,
            artifact.path.display()
        );
        if outcome.failed_count() > 0 {
            message.push_str(&format!(", {} failed", outcome.failed_count()));
        }
        log::info!("{}", message);

        Ok(BatchResponse {
            success: true,
            file_path: artifact.path.to_string_lossy().into_owned(),
            file_size: artifact.size,
            segment_count: outcome.total,
            processed_count: outcome.processed_count(),
            failed_count: outcome.failed_count(),
            errors: outcome.failures,
            message,
        })
    }

    /// Построить субтитры по граничным событиям одного вызова синтеза
    pub async fn generate_subtitles(&self, request: SubtitleRequest) -> Result<SubtitleResponse> {
        request.validate()?;
        // Формат проверяется до обращения к каталогу и провайдеру
        let format: SubtitleFormat = request.subtitle_format.parse()?;

        let mut segment = SegmentRequest::new(request.text.clone(), request.voice.clone());
        segment.boundary = request.boundary_type;

        let stream = self.synthesizer.open_stream(&segment).await?;
        let cues = SubtitleDeriver::new().consume(&request.text, stream).await?;
        log::info!(
            "Generated {} {} cues for {} characters",
            cues.len(),
            request.boundary_type.as_str(),
            segment.char_count()
        );

        Ok(SubtitleResponse {
            subtitles: format.render(&cues),
            format: format.as_str().to_string(),
            segment_count: cues.len(),
        })
    }

    /// Синтезировать один текст в файл или в base64
    pub async fn text_to_speech(&self, request: TextToSpeechRequest) -> Result<SpeechOutput> {
        request.validate(&self.config)?;

        let segment = &request.segment;
        let audio = self.synthesizer.synthesize(segment).await?;
        let duration = estimate_duration(audio.len());

        if request.inline {
            return Ok(SpeechOutput::Inline(InlineAudioResponse {
                audio_data: BASE64.encode(&audio),
                metadata: AudioMetadata {
                    voice: segment.voice.clone(),
                    text_length: segment.char_count(),
                    audio_duration: duration,
                    format: request.format,
                },
            }));
        }

        let path = absolute_path(&self.config.output_dir.join(artifact_file_name(
            "tts",
            [segment.text.as_str()],
            request.format.extension(),
        )))?;
        let file_size = write_artifact(&path, audio).await?;

        Ok(SpeechOutput::File(SpeechFileResponse {
            success: true,
            file_path: path.to_string_lossy().into_owned(),
            file_size,
            estimated_duration: duration,
            message: format!("Speech saved to {} ({:.1}s estimated)", path.display(), duration),
        }))
    }

    /// Список голосов по фильтру; без фильтров возвращается сводка
    pub async fn list_voices(&self, request: ListVoicesRequest) -> Result<VoiceListing> {
        request.validate()?;
        self.voices.refresh_if_stale().await?;

        if !request.has_filters() {
            return Ok(VoiceListing::Summary(self.voices.summary().await?));
        }

        let voices = self.voices.list(&VoiceFilter::from(&request)).await?;
        log::debug!("Voice filter matched {} voices", voices.len());
        Ok(VoiceListing::Voices(VoiceListResponse {
            total_count: voices.len(),
            voices,
        }))
    }

    pub async fn get_voice_info(&self, request: VoiceInfoRequest) -> Result<VoiceInfoResponse> {
        if request.voice_name.trim().is_empty() {
            return Err(TtsError::Validation("voice_name must not be empty".to_string()));
        }
        self.voices.refresh_if_stale().await?;
        let voice = self.voices.resolve(&request.voice_name).await?;
        Ok(VoiceInfoResponse { voice })
    }

    /// Сохранить аудио, переданное в base64
    pub async fn save_audio(&self, request: SaveAudioRequest) -> Result<SaveAudioResponse> {
        let format: AudioFormat = request.format.parse()?;
        if request.filename.trim().is_empty() {
            return Err(TtsError::Validation("filename must not be empty".to_string()));
        }

        let data = BASE64
            .decode(request.audio_data.trim())
            .map_err(|e| TtsError::Validation(format!("audio_data is not valid base64: {}", e)))?;

        let path = absolute_path(&resolve_path_with_extension(
            &self.config.output_dir,
            &request.filename,
            format.extension(),
        )?)?;
        let file_size = write_artifact(&path, data.into()).await?;
        log::info!("Saved {} bytes of {} audio to {}", file_size, format, path.display());

        Ok(SaveAudioResponse {
            success: true,
            file_path: path.to_string_lossy().into_owned(),
            file_size,
        })
    }
}

fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf().clean())
    } else {
        Ok(std::env::current_dir()?.join(path).clean())
    }
}
