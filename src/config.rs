use crate::geometry::{Display, Rect};
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub logging: LoggingConfig,
    pub target: TargetConfig,
    pub enforcement: EnforcementConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    /// Дополнительная директива EnvFilter, например "aspect_pin::placement=trace"
    #[serde(default)]
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    /// Имя процесса без учёта регистра, с ".exe" или без
    pub process_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnforcementConfig {
    /// Сколько раз повторить неудачное чтение состояния ОС за один проход (0 или 1)
    pub read_retries: u32,
    pub event_queue_capacity: usize,
    /// Схлопывать накопившиеся в очереди уведомления в один проход
    pub coalesce_events: bool,
}

/// Виртуальный рабочий стол для `--dry-run`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    pub displays: Vec<SimulatedDisplayConfig>,
    pub window: SimulatedWindowConfig,
    /// Период эмуляции действий пользователя; 0 отключает
    pub perturb_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulatedDisplayConfig {
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulatedWindowConfig {
    pub width: i32,
    pub height: i32,
    pub decorated: bool,
}

impl SimulationConfig {
    pub fn displays(&self) -> Vec<Display> {
        self.displays
            .iter()
            .map(|d| Display::new(d.name.clone(), Rect::new(d.x, d.y, d.width, d.height)))
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "compact".to_string(),
                filter: String::new(),
            },
            target: TargetConfig {
                process_name: "umamusume".to_string(),
            },
            enforcement: EnforcementConfig {
                read_retries: 1,
                event_queue_capacity: 64,
                coalesce_events: true,
            },
            simulation: SimulationConfig {
                displays: vec![
                    SimulatedDisplayConfig {
                        name: "\\\\.\\DISPLAY1".to_string(),
                        x: 0,
                        y: 0,
                        width: 1920,
                        height: 1080,
                    },
                    SimulatedDisplayConfig {
                        name: "\\\\.\\DISPLAY2".to_string(),
                        x: 1920,
                        y: 0,
                        width: 1080,
                        height: 1920,
                    },
                ],
                window: SimulatedWindowConfig {
                    width: 800,
                    height: 600,
                    decorated: true,
                },
                perturb_interval_ms: 5000,
            },
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("ASPECT_PIN_").split("__"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "compact" | "full" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        if self.target.process_name.trim().is_empty() {
            anyhow::bail!("target.process_name не может быть пустым");
        }

        // Повтор чтения не чаще одного раза за проход
        if self.enforcement.read_retries > 1 {
            anyhow::bail!(
                "read_retries должно быть 0 или 1, получено {}",
                self.enforcement.read_retries
            );
        }

        if self.enforcement.event_queue_capacity == 0 {
            anyhow::bail!("event_queue_capacity должно быть больше 0");
        }

        for (i, display) in self.simulation.displays.iter().enumerate() {
            if display.width <= 0 || display.height <= 0 {
                anyhow::bail!(
                    "Монитор #{} ({}) в simulation.displays имеет неположительный размер",
                    i + 1,
                    display.name
                );
            }
        }

        if self.simulation.window.width <= 0 || self.simulation.window.height <= 0 {
            anyhow::bail!("simulation.window должно иметь положительный размер");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_second_retry() {
        let mut config = Config::default();
        config.enforcement.read_retries = 2;
        assert!(config.validate().is_err());

        config.enforcement.read_retries = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_logging_and_queue() {
        let mut config = Config::default();
        config.logging.format = "json".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.enforcement.event_queue_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.target.process_name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_degenerate_simulated_display() {
        let mut config = Config::default();
        config.simulation.displays[1].height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_simulated_displays_keep_order() {
        let displays = Config::default().simulation.displays();
        assert_eq!(displays.len(), 2);
        assert_eq!(displays[0].bounds, Rect::new(0, 0, 1920, 1080));
        assert_eq!(displays[1].bounds, Rect::new(1920, 0, 1080, 1920));
    }

    #[test]
    fn test_load_merges_toml_over_defaults() {
        let path = std::env::temp_dir()
            .join(format!("aspect-pin-test-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[target]\nprocess_name = \"game.exe\"\n\n[enforcement]\nread_retries = 0\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.target.process_name, "game.exe");
        assert_eq!(config.enforcement.read_retries, 0);
        assert_eq!(config.enforcement.event_queue_capacity, 64);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = Config::load("/nonexistent/aspect-pin.toml").unwrap();
        assert_eq!(config.target.process_name, "umamusume");
    }
}
