//! Готовые наблюдатели прогресса
//!
//! stdout может быть занят протоколом вызова инструментов, поэтому
//! консольного вывода здесь нет: прогресс уходит в лог, в память или в канал.

use std::sync::Arc;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use crate::progress::{ProgressInfo, ProgressObserver};

/// Наблюдатель, пишущий прогресс в лог
pub struct LogProgressObserver {
    prefix: Option<String>,
}

impl LogProgressObserver {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: Some(prefix.into()) }
    }
}

impl Default for LogProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for LogProgressObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        let prefix = self.prefix.as_deref().unwrap_or("");
        match progress.details.as_deref() {
            Some(details) => log::info!(
                "{}{}: {:.1}% (total {:.1}%), {}",
                prefix,
                progress.step,
                progress.step_progress,
                progress.total_progress,
                details
            ),
            None => log::info!(
                "{}{}: {:.1}% (total {:.1}%)",
                prefix,
                progress.step,
                progress.step_progress,
                progress.total_progress
            ),
        }
    }
}

/// Наблюдатель, сохраняющий историю обновлений в памяти
#[derive(Clone, Default)]
pub struct MemoryProgressObserver {
    history: Arc<Mutex<Vec<ProgressInfo>>>,
}

impl MemoryProgressObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<ProgressInfo> {
        self.history.lock().clone()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }
}

impl ProgressObserver for MemoryProgressObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        self.history.lock().push(progress);
    }
}

/// Наблюдатель, отправляющий обновления в канал
///
/// Отправка не блокирует: если получатель не успевает, обновление теряется.
pub struct ChannelProgressObserver {
    sender: mpsc::Sender<ProgressInfo>,
}

impl ChannelProgressObserver {
    pub fn new(sender: mpsc::Sender<ProgressInfo>) -> Self {
        Self { sender }
    }
}

impl ProgressObserver for ChannelProgressObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        if let Err(e) = self.sender.try_send(progress) {
            log::debug!("Dropping progress update: {}", e);
        }
    }
}

/// Наблюдатель, вызывающий функцию при каждом обновлении
pub struct CallbackProgressObserver<F>
where
    F: Fn(ProgressInfo) + Send + Sync + 'static,
{
    callback: F,
}

impl<F> CallbackProgressObserver<F>
where
    F: Fn(ProgressInfo) + Send + Sync + 'static,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressObserver for CallbackProgressObserver<F>
where
    F: Fn(ProgressInfo) + Send + Sync + 'static,
{
    fn on_progress_update(&self, progress: ProgressInfo) {
        (self.callback)(progress);
    }
}
