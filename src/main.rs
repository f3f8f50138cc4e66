use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use std::sync::Arc;
mod config;
mod error;
mod events;
mod geometry;
mod placement;
mod services;
mod utils;

use config::Config;
use placement::{EnforcerExit, PlacementEnforcer, TrackingState};
use services::create_platform_services;

#[derive(Parser, Debug)]
#[command(name = "aspect-pin")]
#[command(about = "Держит окно игры на мониторе с той же ориентацией, без рамки")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "aspect-pin.toml")]
    config: String,

    /// Режим сухого запуска (виртуальный рабочий стол вместо Win32)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (перекрывает logging.level)
    #[arg(long)]
    log_level: Option<String>,

    /// Имя процесса игры (перекрывает target.process_name)
    #[arg(short, long)]
    process: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Загрузка конфигурации
    let mut config = Config::load(&args.config)?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(process) = args.process {
        config.target.process_name = process;
    }
    config.validate()?;
    let config = Arc::new(config);

    // Инициализация системы логирования
    init_tracing(&config)?;

    info!("Запуск aspect-pin v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    if args.dry_run {
        warn!("Режим сухого запуска - реальные окна не изменяются");
    }

    let services = create_platform_services(&config, args.dry_run)?;
    let platform = services.platform;
    let mut bridge = services.bridge;

    // Окно ищется один раз; без него цикл не устанавливается
    let target = match platform.find_target_window(&config.target.process_name) {
        Ok(target) => target,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };
    let process_id = target.process_id;

    let mut enforcer = PlacementEnforcer::new(platform.clone(), target, &config.enforcement);
    let outcome = enforcer.initial_adjust();
    info!("Начальная проверка: {:?}", outcome);

    // Окно закрылось между поиском и первой проверкой: подписываться не на что
    if enforcer.context().state == TrackingState::Lost {
        warn!("Окно игры закрыто; перезапустите aspect-pin после запуска игры");
        return Ok(());
    }

    let (event_tx, event_rx) = mpsc::channel(config.enforcement.event_queue_capacity);
    bridge.subscribe(process_id, event_tx)?;

    let mut enforcer_handle = tokio::spawn(enforcer.run(event_rx));

    info!("Отслеживание запущено");

    // Ожидание сигнала завершения или потери окна
    let finished = tokio::select! {
        result = signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
                Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
            }
            None
        }
        result = &mut enforcer_handle => Some(result),
    };

    info!("Завершение работы...");

    // Отписка закрывает поток событий, и цикл завершается сам
    bridge.unsubscribe().await;

    let result = match finished {
        Some(result) => Ok(result),
        None => {
            let shutdown_timeout = tokio::time::Duration::from_secs(5);
            tokio::time::timeout(shutdown_timeout, enforcer_handle).await
        }
    };

    match result {
        Ok(Ok((exit, stats))) => {
            if exit == EnforcerExit::TargetLost {
                warn!("Окно игры закрыто; перезапустите aspect-pin после запуска игры");
            }
            info!(
                "Статистика: проходов {}, коррекций {}, снятий рамки {}, \
                 чужих событий {}, схлопнуто {}, брошено {}",
                stats.passes,
                stats.corrections,
                stats.strips,
                stats.ignored,
                stats.coalesced,
                stats.abandoned
            );
        }
        Ok(Err(e)) => error!("Ошибка в PlacementEnforcer: {}", e),
        Err(_) => warn!("Таймаут при завершении PlacementEnforcer"),
    }

    info!("aspect-pin завершил работу");
    Ok(())
}

fn init_tracing(config: &Config) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let directives = if config.logging.filter.is_empty() {
        config.logging.level.clone()
    } else {
        format!("{},{}", config.logging.level, config.logging.filter)
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&directives))?;

    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format.as_str() {
        "full" => registry.with(tracing_subscriber::fmt::layer()).init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .init(),
    }

    Ok(())
}
