//! Вспомогательные модули: временные файлы, ffmpeg, логирование, имена файлов

pub mod ffmpeg;
pub mod logger;
pub mod naming;
pub mod temp;
