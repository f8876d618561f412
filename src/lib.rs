//! Основной файл библиотеки tts-tools
//!
//! Инструменты пакетного синтеза речи, каталога голосов и субтитров SRT
//! поверх потокового провайдера синтеза. Провайдер подключается через
//! трейт [`SpeechProvider`], склейка аудио через [`AudioProcessor`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use tts_tools::{SpeechProvider, TtsTools, TtsToolsConfig};
//!
//! # async fn run(provider: Arc<dyn SpeechProvider>) -> tts_tools::Result<()> {
//! let config = TtsToolsConfig::from_json_file("tts-tools.json")?;
//! let tools = TtsTools::with_ffmpeg(config, provider)?;
//! let result = tools
//!     .call_tool("generate_subtitles", serde_json::json!({ "text": "Hello world" }))
//!     .await;
//! println!("{}", result);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod media;
pub mod models;
pub mod notification;
pub mod progress;
pub mod provider;
pub mod subtitle;
pub mod tools;
pub mod tts;
pub mod utils;
pub mod voices;

pub use config::TtsToolsConfig;
pub use error::{ErrorEnvelope, Result, SegmentFailure, TtsError};
pub use media::{AudioProcessor, FfmpegProcessor};
pub use models::{AudioFormat, BatchRequest, BoundaryKind, SegmentRequest, SubtitleRequest};
pub use progress::{ProgressInfo, ProgressObserver, ProgressReporter};
#[doc(hidden)]
pub use provider::MemoryProvider;
pub use provider::SpeechProvider;
pub use tools::TtsTools;
pub use utils::logger::init_logger;
