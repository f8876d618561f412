//! Модуль для работы с аудио
//!
//! Проверка клипов через symphonia и склейка через FFmpeg.

use std::path::{Path, PathBuf};
use async_trait::async_trait;
use bytes::Bytes;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use crate::error::{Result, TtsError};
use crate::models::AudioFormat;
use crate::utils::ffmpeg::{ffmpeg_version, run_ffmpeg};
use crate::utils::temp::TempFileManager;

/// Параметры декодированного клипа
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipInfo {
    pub sample_rate: u32,
    pub channels: usize,
    pub frames: u64,
}

impl ClipInfo {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }
}

/// Полностью декодировать клип, чтобы убедиться, что он читается
pub fn probe_clip(data: &[u8], format: AudioFormat) -> Result<ClipInfo> {
    let cursor = std::io::Cursor::new(data.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    hint.with_extension(format.extension());

    let format_opts = FormatOptions {
        enable_gapless: false,
        ..Default::default()
    };

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_opts, &MetadataOptions::default())
        .map_err(|e| TtsError::AssemblyFailed(format!("unrecognized {} data: {}", format, e)))?;

    let mut reader = probed.format;
    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| TtsError::AssemblyFailed("no audio track found".to_string()))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| TtsError::AssemblyFailed(format!("no decoder for {} data: {}", format, e)))?;

    let mut frames = 0u64;
    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(TtsError::AssemblyFailed(format!("failed to read packet: {}", e))),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                frames += decoded.frames() as u64;
                if sample_rate == 0 {
                    sample_rate = decoded.spec().rate;
                }
            }
            Err(SymphoniaError::DecodeError(e)) => {
                log::debug!("Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(TtsError::AssemblyFailed(format!("failed to decode audio: {}", e))),
        }
    }

    if frames == 0 {
        return Err(TtsError::AssemblyFailed("clip contains no decodable audio".to_string()));
    }

    Ok(ClipInfo { sample_rate, channels, frames })
}

/// Склейка клипов в один поток целевого формата
#[async_trait]
pub trait AudioProcessor: Send + Sync {
    /// Клипы склеиваются строго в переданном порядке
    async fn concatenate(&self, clips: &[Bytes], source: AudioFormat, target: AudioFormat) -> Result<Vec<u8>>;
}

/// Склейка через FFmpeg concat demuxer
///
/// Промежуточные файлы пишутся во временную директорию, которая
/// удаляется после склейки, в том числе при ошибке.
pub struct FfmpegProcessor {
    ffmpeg_path: String,
    scratch_root: Option<PathBuf>,
}

impl FfmpegProcessor {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            scratch_root: None,
        }
    }

    /// Создавать временные директории внутри `root`
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Проверить, что FFmpeg запускается, и вернуть строку версии
    pub async fn check_available(&self) -> Result<String> {
        let version = ffmpeg_version(&self.ffmpeg_path).await?;
        log::info!("Using {}", version);
        Ok(version)
    }
}

fn concat_list_entry(path: &Path) -> String {
    // В concat-списке одинарная кавычка экранируется как '\''
    format!("file '{}'\n", path.to_string_lossy().replace('\'', "'\\''"))
}

#[async_trait]
impl AudioProcessor for FfmpegProcessor {
    async fn concatenate(&self, clips: &[Bytes], source: AudioFormat, target: AudioFormat) -> Result<Vec<u8>> {
        let mut total_secs = 0.0;
        for (i, clip) in clips.iter().enumerate() {
            let info = probe_clip(clip, source)
                .map_err(|e| TtsError::AssemblyFailed(format!("clip {}: {}", i, e)))?;
            log::debug!(
                "Clip {}: {} Hz, {} channels, {:.2}s",
                i,
                info.sample_rate,
                info.channels,
                info.duration_secs()
            );
            total_secs += info.duration_secs();
        }

        let scratch_err = |e: TtsError| TtsError::AssemblyFailed(format!("scratch file error: {}", e));
        let mut scratch = TempFileManager::create(self.scratch_root.as_deref()).map_err(scratch_err)?;

        let mut list = String::new();
        for (i, clip) in clips.iter().enumerate() {
            let path = scratch
                .create_temp_file(&format!("clip_{:03}", i), source.extension(), clip)
                .await
                .map_err(scratch_err)?;
            list.push_str(&concat_list_entry(&path));
        }
        let list_path = scratch
            .create_temp_file("concat_list", "txt", list.as_bytes())
            .await
            .map_err(scratch_err)?;
        let output_path = scratch.reserve_path("combined", target.extension());

        let args: Vec<String> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            list_path.to_string_lossy().into_owned(),
            "-c:a".into(),
            target.ffmpeg_codec().into(),
            "-y".into(),
            output_path.to_string_lossy().into_owned(),
        ];
        run_ffmpeg(&self.ffmpeg_path, &args).await?;

        let combined = tokio::fs::read(&output_path)
            .await
            .map_err(|e| TtsError::AssemblyFailed(format!("failed to read combined audio: {}", e)))?;

        log::info!(
            "Concatenated {} clips into {} ({} bytes, ~{:.1}s)",
            clips.len(),
            target,
            combined.len(),
            total_secs
        );
        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_clip(frames: u32, sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..frames {
                writer.write_sample(((i % 100) as i16 - 50) * 100).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_valid_wav() {
        let info = probe_clip(&wav_clip(1600, 16000), AudioFormat::Wav).unwrap();
        assert_eq!(info.sample_rate, 16000);
        assert_eq!(info.channels, 1);
        assert_eq!(info.frames, 1600);
        assert!((info.duration_secs() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = probe_clip(b"definitely not audio", AudioFormat::Mp3);
        assert!(matches!(result, Err(TtsError::AssemblyFailed(_))));
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let entry = concat_list_entry(Path::new("/tmp/it's.mp3"));
        assert_eq!(entry, "file '/tmp/it'\\''s.mp3'\n");
    }

    #[tokio::test]
    async fn test_undecodable_clip_fails_before_ffmpeg() {
        let processor = FfmpegProcessor::new("/nonexistent/ffmpeg-binary");
        let clips = vec![Bytes::from(wav_clip(160, 16000)), Bytes::from_static(b"junk")];

        let result = processor.concatenate(&clips, AudioFormat::Wav, AudioFormat::Wav).await;
        match result {
            Err(TtsError::AssemblyFailed(msg)) => assert!(msg.starts_with("clip 1:")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_is_reported() {
        let processor = FfmpegProcessor::new("/nonexistent/ffmpeg-binary");
        assert!(matches!(processor.check_available().await, Err(TtsError::AssemblyFailed(_))));
    }

    #[tokio::test]
    async fn test_scratch_removed_when_ffmpeg_fails() {
        let root = tempfile::tempdir().unwrap();
        let processor = FfmpegProcessor::new("/nonexistent/ffmpeg-binary").with_scratch_root(root.path());
        let clips = vec![Bytes::from(wav_clip(1600, 16000)), Bytes::from(wav_clip(800, 16000))];

        let result = processor.concatenate(&clips, AudioFormat::Wav, AudioFormat::Wav).await;
        assert!(matches!(result, Err(TtsError::AssemblyFailed(_))));

        let leftovers: Vec<_> = std::fs::read_dir(root.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert!(leftovers.is_empty(), "scratch left behind: {:?}", leftovers);
    }

    #[tokio::test]
    async fn test_concatenate_with_ffmpeg() {
        if ffmpeg_version("ffmpeg").await.is_err() {
            eprintln!("ffmpeg not found, skipping");
            return;
        }

        let root = tempfile::tempdir().unwrap();
        let processor = FfmpegProcessor::new("ffmpeg").with_scratch_root(root.path());
        let clips = vec![Bytes::from(wav_clip(1600, 16000)), Bytes::from(wav_clip(800, 16000))];

        let combined = processor
            .concatenate(&clips, AudioFormat::Wav, AudioFormat::Wav)
            .await
            .unwrap();
        let info = probe_clip(&combined, AudioFormat::Wav).unwrap();
        assert_eq!(info.sample_rate, 16000);
        assert!(info.frames.abs_diff(2400) <= 16, "frames: {}", info.frames);
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
