//! Общие помощники для интеграционных тестов
#![allow(dead_code)]

use std::sync::Arc;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tempfile::TempDir;
use tts_tools::{AudioFormat, AudioProcessor, MemoryProvider, Result, TtsTools, TtsToolsConfig};

/// Склейка конкатенацией байт: порядок клипов виден прямо в файле
#[derive(Default)]
pub struct JoiningProcessor {
    pub calls: Mutex<usize>,
}

#[async_trait]
impl AudioProcessor for JoiningProcessor {
    async fn concatenate(&self, clips: &[Bytes], _source: AudioFormat, _target: AudioFormat) -> Result<Vec<u8>> {
        *self.calls.lock() += 1;
        Ok(clips.iter().flat_map(|clip| clip.iter().copied()).collect())
    }
}

pub fn catalog() -> Vec<tts_tools::provider::VoiceRecord> {
    vec![
        MemoryProvider::voice("en-US-GuyNeural", "en-US", "Male"),
        MemoryProvider::voice("en-US-EmmaMultilingualNeural", "en-US", "Female"),
        MemoryProvider::voice("en-GB-SoniaNeural", "en-GB", "Female"),
        MemoryProvider::voice("zh-CN-XiaoxiaoNeural", "zh-CN", "Female"),
    ]
}

pub struct Harness {
    pub tools: TtsTools,
    pub provider: Arc<MemoryProvider>,
    pub processor: Arc<JoiningProcessor>,
    pub dir: TempDir,
}

pub fn harness(provider: MemoryProvider) -> Harness {
    harness_with(provider, |_| {})
}

pub fn harness_with(provider: MemoryProvider, configure: impl FnOnce(&mut TtsToolsConfig)) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut config = TtsToolsConfig {
        output_dir: dir.path().to_path_buf(),
        ..TtsToolsConfig::default()
    };
    configure(&mut config);

    let provider = Arc::new(provider);
    let processor = Arc::new(JoiningProcessor::default());
    let tools = TtsTools::new(config, provider.clone(), processor.clone()).unwrap();

    Harness { tools, provider, processor, dir }
}

pub fn audio(voice: &str, text: &str) -> Vec<u8> {
    MemoryProvider::expected_audio(voice, text)
}
