//! Модуль для работы с FFmpeg
//!
//! Процессы запускаются с `kill_on_drop`, поэтому отмена операции
//! останавливает и дочерний ffmpeg.

use tokio::process::Command;
use crate::error::{Result, TtsError};

/// Сколько последних строк stderr включать в сообщение об ошибке
const STDERR_TAIL_LINES: usize = 5;

/// Получение версии FFmpeg
pub async fn ffmpeg_version(ffmpeg_path: &str) -> Result<String> {
    let output = Command::new(ffmpeg_path)
        .arg("-version")
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| TtsError::AssemblyFailed(format!("failed to start {}: {}", ffmpeg_path, e)))?;

    if !output.status.success() {
        return Err(TtsError::AssemblyFailed(format!(
            "{} -version exited with status {}",
            ffmpeg_path, output.status
        )));
    }

    let version_str = String::from_utf8_lossy(&output.stdout);
    Ok(version_str.lines().next().unwrap_or("").to_string())
}

/// Запуск команды FFmpeg
pub async fn run_ffmpeg(ffmpeg_path: &str, args: &[String]) -> Result<()> {
    log::debug!("Running {} {}", ffmpeg_path, args.join(" "));

    let output = Command::new(ffmpeg_path)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| TtsError::AssemblyFailed(format!("failed to start {}: {}", ffmpeg_path, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
        log::error!("FFmpeg failed with status {}: {}", output.status, tail);
        return Err(TtsError::AssemblyFailed(format!(
            "FFmpeg command failed with status {}: {}",
            output.status, tail
        )));
    }

    Ok(())
}
