//! Работа с аудио: проверка, склейка и запись результата

pub mod assembler;
pub mod audio;

pub use assembler::{write_artifact, AssembledArtifact, AudioAssembler, SOURCE_FORMAT};
pub use audio::{probe_clip, AudioProcessor, ClipInfo, FfmpegProcessor};
