use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

/// Фильтр по умолчанию, если RUST_LOG не задан
const DEFAULT_FILTER: &str = "warn,tts_tools=info";

/// Инициализация логирования для приложения, встраивающего библиотеку
///
/// Повторный вызов безопасен: ошибка повторной инициализации игнорируется.
pub fn init_logger() {
    let env = Env::default().filter_or("RUST_LOG", DEFAULT_FILTER);

    let mut builder = Builder::from_env(env);

    // Подавляем шум от рантайма
    builder
        .filter_module("mio", LevelFilter::Error)
        .filter_module("tokio_util", LevelFilter::Error)
        .filter_module("symphonia_core", LevelFilter::Warn)
        .filter_module("symphonia_bundle_mp3", LevelFilter::Warn)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        // stdout может быть занят протоколом, поэтому пишем в stderr
        .target(env_logger::Target::Stderr);

    let _ = builder.try_init();
}
