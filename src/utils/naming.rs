//! Имена итоговых файлов
//!
//! Имя по умолчанию строится из метки времени и md5 текста,
//! имя от клиента нормализуется и получает нужное расширение.

use std::path::{Component, Path, PathBuf};
use path_clean::PathClean;
use crate::error::{Result, TtsError};
use crate::models::AudioFormat;

/// Имя вида `{prefix}_{unix}_{md5[..8]}.{ext}`
pub fn artifact_file_name<'a, I>(prefix: &str, texts: I, extension: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = md5::Context::new();
    for (i, text) in texts.into_iter().enumerate() {
        if i > 0 {
            hasher.consume(b"\n");
        }
        hasher.consume(text.as_bytes());
    }
    let digest = format!("{:x}", hasher.compute());
    let timestamp = chrono::Utc::now().timestamp();

    format!("{}_{}_{}.{}", prefix, timestamp, &digest[..8], extension)
}

/// Добавить расширение, если имя заканчивается иначе
pub fn ensure_extension(name: &str, extension: &str) -> String {
    let suffix = format!(".{}", extension.to_ascii_lowercase());
    if name.to_ascii_lowercase().ends_with(&suffix) {
        name.to_string()
    } else {
        format!("{}{}", name, suffix)
    }
}

/// Путь к итоговому файлу внутри `output_dir`
///
/// Абсолютные пути от клиента принимаются как есть (после нормализации);
/// относительные не могут выходить за пределы `output_dir`.
pub fn resolve_output_path(output_dir: &Path, requested: &str, format: AudioFormat) -> Result<PathBuf> {
    resolve_path_with_extension(output_dir, requested, format.extension())
}

pub fn resolve_path_with_extension(output_dir: &Path, requested: &str, extension: &str) -> Result<PathBuf> {
    let name = ensure_extension(requested.trim(), extension);
    let requested = PathBuf::from(&name).clean();

    if requested.is_absolute() {
        return Ok(requested);
    }
    if matches!(requested.components().next(), Some(Component::ParentDir)) {
        return Err(TtsError::Validation(format!(
            "output file name must stay inside the output directory: {}",
            name
        )));
    }

    Ok(output_dir.join(requested).clean())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_name_shape() {
        let name = artifact_file_name("batch_tts", ["A", "B"], "mp3");
        let parts: Vec<&str> = name.trim_end_matches(".mp3").split('_').collect();

        assert_eq!(&parts[..2], &["batch", "tts"]);
        assert!(parts[2].parse::<i64>().is_ok());
        assert_eq!(parts[3].len(), 8);
        assert!(name.ends_with(".mp3"));
    }

    #[test]
    fn test_hash_depends_on_text() {
        let a = artifact_file_name("tts", ["hello"], "wav");
        let b = artifact_file_name("tts", ["world"], "wav");
        assert_ne!(a.rsplit('_').next(), b.rsplit('_').next());
    }

    #[test]
    fn test_extension_is_enforced_once() {
        assert_eq!(ensure_extension("out", "mp3"), "out.mp3");
        assert_eq!(ensure_extension("out.MP3", "mp3"), "out.MP3");
        assert_eq!(ensure_extension("out.wav", "mp3"), "out.wav.mp3");
    }

    #[test]
    fn test_relative_names_stay_in_output_dir() {
        let dir = Path::new("/srv/audio");
        let path = resolve_output_path(dir, "podcasts/./ep1", AudioFormat::Ogg).unwrap();
        assert_eq!(path, PathBuf::from("/srv/audio/podcasts/ep1.ogg"));

        let escaped = resolve_output_path(dir, "../etc/passwd", AudioFormat::Mp3);
        assert!(matches!(escaped, Err(TtsError::Validation(_))));
    }

    #[test]
    fn test_absolute_names_are_cleaned() {
        let path = resolve_output_path(Path::new("."), "/tmp/x/../result", AudioFormat::Wav).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/result.wav"));
    }
}
