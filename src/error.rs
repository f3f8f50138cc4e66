use crate::events::WindowHandle;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PinError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Целевое окно не найдено: {0}")]
    TargetNotFound(String),

    #[error("Не удалось получить список мониторов: {0}")]
    DisplayQuery(String),

    #[error("Не удалось прочитать состояние окна: {0}")]
    WindowQuery(String),

    #[error("ОС отклонила изменение окна: {0}")]
    GeometryWrite(String),

    #[error("Дескриптор окна {0} больше недействителен")]
    StaleHandle(WindowHandle),

    #[error("Сервис недоступен: {0}")]
    ServiceUnavailable(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl PinError {
    pub fn target_not_found<T>(msg: impl Into<String>) -> Result<T> {
        Err(PinError::TargetNotFound(msg.into()))
    }

    /// Ошибки, после которых окно уже не вернётся: проход бросается, отслеживание прекращается
    pub fn is_stale(&self) -> bool {
        matches!(self, PinError::StaleHandle(_))
    }
}

pub type Result<T> = std::result::Result<T, PinError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! pin_error {
    (target_not_found, $($arg:tt)*) => {
        $crate::error::PinError::TargetNotFound(format!($($arg)*))
    };
    (display_query, $($arg:tt)*) => {
        $crate::error::PinError::DisplayQuery(format!($($arg)*))
    };
    (window_query, $($arg:tt)*) => {
        $crate::error::PinError::WindowQuery(format!($($arg)*))
    };
    (geometry_write, $($arg:tt)*) => {
        $crate::error::PinError::GeometryWrite(format!($($arg)*))
    };
    (service_unavailable, $($arg:tt)*) => {
        $crate::error::PinError::ServiceUnavailable(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::PinError::Internal(format!($($arg)*))
    };
}
