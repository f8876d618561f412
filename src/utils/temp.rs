//! Модуль для работы с временными файлами
//!
//! Промежуточные файлы склейки живут во временной директории,
//! которая удаляется при уничтожении менеджера на любом пути выхода.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use crate::error::Result;

/// Менеджер временных файлов
pub struct TempFileManager {
    /// Временная директория; `None` только внутри `drop`
    temp_dir: Option<TempDir>,
    /// Список созданных файлов
    files: Vec<PathBuf>,
}

impl TempFileManager {
    /// Создать директорию в системном временном каталоге
    pub fn new() -> Result<Self> {
        Self::create(None)
    }

    /// Создать директорию внутри `root`, либо в системном каталоге
    pub fn create(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("tts-tools-");
        let temp_dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        log::debug!("Created scratch directory {}", temp_dir.path().display());

        Ok(Self {
            temp_dir: Some(temp_dir),
            files: Vec::new(),
        })
    }

    /// Путь к временной директории
    pub fn temp_dir_path(&self) -> &Path {
        match &self.temp_dir {
            Some(dir) => dir.path(),
            None => Path::new(""),
        }
    }

    /// Зарезервировать уникальное имя файла без создания
    pub fn reserve_path(&mut self, prefix: &str, extension: &str) -> PathBuf {
        let file_name = format!("{}_{}.{}", prefix, uuid::Uuid::new_v4(), extension);
        let path = self.temp_dir_path().join(file_name);
        self.files.push(path.clone());
        path
    }

    /// Создать временный файл с содержимым
    pub async fn create_temp_file(&mut self, prefix: &str, extension: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.reserve_path(prefix, extension);
        tokio::fs::write(&path, contents).await?;
        Ok(path)
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl Drop for TempFileManager {
    fn drop(&mut self) {
        if let Some(dir) = self.temp_dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                log::warn!("Failed to remove scratch directory {}: {}", path.display(), e);
            }
        }
    }
}
