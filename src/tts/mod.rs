//! Модуль для синтеза речи
//!
//! Этот модуль содержит синтез одного сегмента и пакетную обработку сегментов.

pub mod synthesizer;
pub mod batch;

pub use synthesizer::{estimate_duration, SegmentSynthesizer};
pub use batch::{BatchOrchestrator, BatchOutcome, SynthesizedSegment};
