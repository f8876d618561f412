//! Модуль для отслеживания прогресса выполнения операций
//!
//! Этот модуль предоставляет реализацию паттерна Observer для
//! отслеживания прогресса пакетного синтеза.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Информация о прогрессе выполнения операции
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressInfo {
    /// Текущий этап операции
    pub step: String,
    /// Процент выполнения текущего этапа (0.0 - 100.0)
    pub step_progress: f32,
    /// Общий процент выполнения всей операции (0.0 - 100.0)
    pub total_progress: f32,
    /// Дополнительная информация о текущем этапе
    pub details: Option<String>,
    /// Операция, к которой относится обновление
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
}

impl ProgressInfo {
    pub fn new(step: impl Into<String>, step_progress: f32, total_progress: f32, details: Option<String>) -> Self {
        Self {
            step: step.into(),
            step_progress: step_progress.clamp(0.0, 100.0),
            total_progress: total_progress.clamp(0.0, 100.0),
            details,
            operation: None,
        }
    }
}

/// Трейт для наблюдателя, получающего уведомления о прогрессе
pub trait ProgressObserver: Send + Sync {
    fn on_progress_update(&self, progress: ProgressInfo);
}

/// Трейт для объекта, отправляющего уведомления о прогрессе
pub trait ProgressReporter: Send + Sync {
    /// Добавить наблюдателя
    ///
    /// Возвращает идентификатор, по которому наблюдателя можно удалить.
    fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize;

    /// Удалить наблюдателя по идентификатору
    fn remove_observer(&mut self, id: usize) -> Option<Box<dyn ProgressObserver>>;

    /// Уведомить всех наблюдателей о прогрессе
    fn notify_progress(&self, progress: ProgressInfo);
}

/// Реализация ProgressReporter, вызывающая наблюдателей синхронно
pub struct DefaultProgressReporter {
    observers: RwLock<HashMap<usize, Box<dyn ProgressObserver>>>,
    next_id: AtomicUsize,
}

impl DefaultProgressReporter {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
            next_id: AtomicUsize::new(0),
        }
    }
}

impl Default for DefaultProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for DefaultProgressReporter {
    fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.observers.write().insert(id, observer);
        id
    }

    fn remove_observer(&mut self, id: usize) -> Option<Box<dyn ProgressObserver>> {
        self.observers.write().remove(&id)
    }

    fn notify_progress(&self, progress: ProgressInfo) {
        let observers = self.observers.read();
        for observer in observers.values() {
            observer.on_progress_update(progress.clone());
        }
    }
}

/// Репортер, разделяемый несколькими трекерами
///
/// Каждый пакет получает собственный `ProgressTracker`, а наблюдатели
/// остаются общими. Замена внутреннего репортера видна всем копиям.
#[derive(Clone)]
pub struct SharedProgressReporter {
    inner: Arc<RwLock<Box<dyn ProgressReporter>>>,
}

impl SharedProgressReporter {
    pub fn new(reporter: Box<dyn ProgressReporter>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(reporter)),
        }
    }

    /// Заменить внутренний репортер, перенеся в него наблюдателей `ids`
    ///
    /// Возвращает новые идентификаторы перенесенных наблюдателей.
    pub fn replace(&self, mut reporter: Box<dyn ProgressReporter>, ids: &[usize]) -> Vec<usize> {
        let mut current = self.inner.write();
        let moved = ids
            .iter()
            .filter_map(|id| current.remove_observer(*id))
            .map(|observer| reporter.add_observer(observer))
            .collect();
        *current = reporter;
        moved
    }
}

impl ProgressReporter for SharedProgressReporter {
    fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize {
        self.inner.write().add_observer(observer)
    }

    fn remove_observer(&mut self, id: usize) -> Option<Box<dyn ProgressObserver>> {
        self.inner.write().remove_observer(id)
    }

    fn notify_progress(&self, progress: ProgressInfo) {
        self.inner.read().notify_progress(progress);
    }
}

/// Этапы пакетного синтеза
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchStep {
    /// Загрузка каталога голосов
    VoiceLookup,
    /// Синтез сегментов
    Synthesis,
    /// Склейка и запись итогового файла
    Assembly,
}

impl BatchStep {
    const ALL: [BatchStep; 3] = [Self::VoiceLookup, Self::Synthesis, Self::Assembly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VoiceLookup => "Voice lookup",
            Self::Synthesis => "Speech synthesis",
            Self::Assembly => "Audio assembly",
        }
    }

    /// Вес этапа в процентах от всего процесса
    pub fn weight(&self) -> f32 {
        match self {
            Self::VoiceLookup => 5.0,
            Self::Synthesis => 80.0,
            Self::Assembly => 15.0,
        }
    }
}

/// Трекер прогресса одной пакетной операции
pub struct ProgressTracker {
    reporter: Option<Box<dyn ProgressReporter>>,
    operation: Option<String>,
    current_step: RwLock<BatchStep>,
    step_progress: RwLock<f32>,
    total_progress: RwLock<f32>,
    completed_steps: RwLock<HashMap<BatchStep, f32>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            reporter: None,
            operation: None,
            current_step: RwLock::new(BatchStep::VoiceLookup),
            step_progress: RwLock::new(0.0),
            total_progress: RwLock::new(0.0),
            completed_steps: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_reporter(reporter: Box<dyn ProgressReporter>) -> Self {
        let mut tracker = Self::new();
        tracker.reporter = Some(reporter);
        tracker
    }

    /// Помечать все обновления именем операции
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Установить текущий этап; предыдущий считается завершенным
    pub fn set_step(&self, step: BatchStep) {
        {
            let mut current_step = self.current_step.write();
            if *current_step == step {
                return;
            }
            self.completed_steps.write().insert(*current_step, 100.0);
            *current_step = step;
            *self.step_progress.write() = 0.0;
        }

        self.update_total_progress();
        self.report_progress(None);
    }

    /// Обновить прогресс текущего этапа
    pub fn update_step_progress(&self, progress: f32, details: Option<String>) {
        *self.step_progress.write() = progress.clamp(0.0, 100.0);
        self.update_total_progress();
        self.report_progress(details);
    }

    /// Отметить завершение всей операции
    pub fn complete(&self) {
        let current_step = *self.current_step.read();
        self.completed_steps.write().insert(current_step, 100.0);
        *self.step_progress.write() = 100.0;
        *self.total_progress.write() = 100.0;
        self.report_progress(Some("Completed".to_string()));
    }

    /// Сообщить о прерывании операции; прогресс не меняется
    pub fn fail(&self, reason: impl std::fmt::Display) {
        self.report_progress(Some(format!("Failed: {}", reason)));
    }

    pub fn total_progress(&self) -> f32 {
        *self.total_progress.read()
    }

    fn update_total_progress(&self) {
        let current_step = *self.current_step.read();
        let step_progress = *self.step_progress.read();
        let completed_steps = self.completed_steps.read();

        let total_weight: f32 = BatchStep::ALL.iter().map(BatchStep::weight).sum();
        let mut total = current_step.weight() * step_progress / 100.0;
        for (step, progress) in completed_steps.iter() {
            if *step != current_step {
                total += step.weight() * progress / 100.0;
            }
        }

        *self.total_progress.write() = (total / total_weight * 100.0).clamp(0.0, 100.0);
    }

    fn report_progress(&self, details: Option<String>) {
        if let Some(reporter) = &self.reporter {
            let mut progress = ProgressInfo::new(
                self.current_step.read().as_str(),
                *self.step_progress.read(),
                *self.total_progress.read(),
                details,
            );
            progress.operation = self.operation.clone();
            reporter.notify_progress(progress);
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
