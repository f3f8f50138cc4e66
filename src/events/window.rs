use serde::{Deserialize, Serialize};
use std::fmt;

/// Непрозрачный дескриптор окна верхнего уровня (HWND на Windows)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowHandle(pub isize);

impl WindowHandle {
    pub fn new(raw: isize) -> Self {
        Self(raw)
    }

    pub fn value(&self) -> isize {
        self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Окно, за которым следит процесс: дескриптор, владелец и заголовок для логов
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedWindow {
    pub handle: WindowHandle,
    pub process_id: u32,
    pub title: String,
}

impl TrackedWindow {
    pub fn new(handle: WindowHandle, process_id: u32) -> Self {
        Self {
            handle,
            process_id,
            title: String::new(),
        }
    }

    pub fn with_title(mut self, title: String) -> Self {
        self.title = title;
        self
    }
}

impl fmt::Display for TrackedWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.title.is_empty() {
            write!(f, "{} (pid {})", self.handle, self.process_id)
        } else {
            write!(f, "\"{}\" {} (pid {})", self.title, self.handle, self.process_id)
        }
    }
}

/// Уведомление ОС о том, что окно сдвинулось, изменило размер или родителя
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowEvent {
    pub handle: WindowHandle,
    pub kind: WindowEventKind,
    pub timestamp: std::time::Instant,
}

impl WindowEvent {
    pub fn new(handle: WindowHandle, kind: WindowEventKind) -> Self {
        Self {
            handle,
            kind,
            timestamp: std::time::Instant::now(),
        }
    }

    pub fn location_changed(handle: WindowHandle) -> Self {
        Self::new(handle, WindowEventKind::LocationChanged)
    }

    #[allow(dead_code)]
    pub fn parent_changed(handle: WindowHandle) -> Self {
        Self::new(handle, WindowEventKind::ParentChanged)
    }
}

impl fmt::Display for WindowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: {} ({}ms ago)",
            self.kind,
            self.handle,
            self.timestamp.elapsed().as_millis()
        )
    }
}

/// Тип события окна
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowEventKind {
    LocationChanged,
    ParentChanged,
}
