//! Сборка итогового аудиофайла из успешных сегментов

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use bytes::Bytes;
use tempfile::NamedTempFile;
use crate::error::{Result, TtsError};
use crate::models::AudioFormat;
use crate::tts::SynthesizedSegment;
use super::audio::AudioProcessor;

/// Формат, в котором провайдер отдает аудио
pub const SOURCE_FORMAT: AudioFormat = AudioFormat::Mp3;

/// Записанный на диск результат
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledArtifact {
    pub path: PathBuf,
    pub size: u64,
}

/// Атомарная запись: временный файл рядом с целевым, затем переименование
///
/// Запись выполняется в блокирующем пуле tokio.
pub async fn write_artifact(path: &Path, data: Bytes) -> Result<u64> {
    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || persist_artifact(&target, &data))
        .await
        .map_err(|e| TtsError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}

fn persist_artifact(path: &Path, data: &[u8]) -> Result<u64> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;

    let mut file = NamedTempFile::new_in(&parent)?;
    file.write_all(data)?;
    file.flush()?;
    file.persist(path).map_err(|e| TtsError::Io(e.error))?;

    log::debug!("Wrote {} bytes to {}", data.len(), path.display());
    Ok(data.len() as u64)
}

pub struct AudioAssembler {
    processor: Arc<dyn AudioProcessor>,
}

impl AudioAssembler {
    pub fn new(processor: Arc<dyn AudioProcessor>) -> Self {
        Self { processor }
    }

    /// Склеить сегменты по возрастанию позиции и записать результат
    ///
    /// Один сегмент записывается как есть. Ошибки склейки и записи
    /// превращаются в `AssemblyFailed`.
    pub async fn assemble(
        &self,
        segments: &[SynthesizedSegment],
        format: AudioFormat,
        output: &Path,
    ) -> Result<AssembledArtifact> {
        let data = match segments {
            [] => return Err(TtsError::AssemblyFailed("no audio segments to assemble".to_string())),
            [single] => single.audio.clone(),
            many => {
                let mut ordered: Vec<&SynthesizedSegment> = many.iter().collect();
                ordered.sort_by_key(|segment| segment.index);
                let clips: Vec<Bytes> = ordered.iter().map(|segment| segment.audio.clone()).collect();

                log::info!("Assembling {} segments into {}", clips.len(), format);
                let combined = self
                    .processor
                    .concatenate(&clips, SOURCE_FORMAT, format)
                    .await
                    .map_err(|e| match e {
                        TtsError::AssemblyFailed(msg) => TtsError::AssemblyFailed(msg),
                        other => TtsError::AssemblyFailed(other.to_string()),
                    })?;
                Bytes::from(combined)
            }
        };

        let size = write_artifact(output, data)
            .await
            .map_err(|e| TtsError::AssemblyFailed(format!("failed to write {}: {}", output.display(), e)))?;

        Ok(AssembledArtifact {
            path: output.to_path_buf(),
            size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Склейка простой конкатенацией байт, с записью порядка вызова
    #[derive(Default)]
    struct JoiningProcessor {
        calls: Mutex<Vec<(usize, AudioFormat, AudioFormat)>>,
    }

    #[async_trait]
    impl AudioProcessor for JoiningProcessor {
        async fn concatenate(&self, clips: &[Bytes], source: AudioFormat, target: AudioFormat) -> Result<Vec<u8>> {
            self.calls.lock().push((clips.len(), source, target));
            Ok(clips.iter().flat_map(|clip| clip.iter().copied()).collect())
        }
    }

    struct BrokenProcessor;

    #[async_trait]
    impl AudioProcessor for BrokenProcessor {
        async fn concatenate(&self, _: &[Bytes], _: AudioFormat, _: AudioFormat) -> Result<Vec<u8>> {
            Err(TtsError::Other("encoder crashed".into()))
        }
    }

    fn segment(index: usize, audio: &'static [u8]) -> SynthesizedSegment {
        SynthesizedSegment {
            index,
            text: format!("text {}", index),
            voice: "en-US-GuyNeural".into(),
            audio: Bytes::from_static(audio),
        }
    }

    #[tokio::test]
    async fn test_segments_joined_by_position() {
        let dir = tempfile::tempdir().unwrap();
        let processor = Arc::new(JoiningProcessor::default());
        let assembler = AudioAssembler::new(processor.clone());
        let output = dir.path().join("out.ogg");

        let artifact = assembler
            .assemble(&[segment(2, b"CC"), segment(0, b"AA")], AudioFormat::Ogg, &output)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"AACC");
        assert_eq!(artifact.size, 4);
        assert_eq!(processor.calls.lock().as_slice(), &[(2, AudioFormat::Mp3, AudioFormat::Ogg)]);
    }

    #[tokio::test]
    async fn test_single_segment_is_written_directly() {
        let dir = tempfile::tempdir().unwrap();
        let processor = Arc::new(JoiningProcessor::default());
        let assembler = AudioAssembler::new(processor.clone());
        let output = dir.path().join("nested/one.mp3");

        let artifact = assembler.assemble(&[segment(0, b"solo")], AudioFormat::Mp3, &output).await.unwrap();

        assert_eq!(artifact.path, output);
        assert_eq!(std::fs::read(&output).unwrap(), b"solo");
        assert!(processor.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_processor_errors_become_assembly_failed() {
        let dir = tempfile::tempdir().unwrap();
        let assembler = AudioAssembler::new(Arc::new(BrokenProcessor));
        let output = dir.path().join("out.mp3");

        let result = assembler
            .assemble(&[segment(0, b"A"), segment(1, b"B")], AudioFormat::Mp3, &output)
            .await;

        assert!(matches!(result, Err(TtsError::AssemblyFailed(msg)) if msg.contains("encoder crashed")));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_write_artifact_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("speech.mp3");
        std::fs::write(&output, b"old contents").unwrap();

        let size = write_artifact(&output, Bytes::from_static(b"new")).await.unwrap();

        assert_eq!(size, 3);
        assert_eq!(std::fs::read(&output).unwrap(), b"new");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let assembler = AudioAssembler::new(Arc::new(BrokenProcessor));
        let result = assembler.assemble(&[], AudioFormat::Mp3, &dir.path().join("x.mp3")).await;
        assert!(matches!(result, Err(TtsError::AssemblyFailed(_))));
    }
}
