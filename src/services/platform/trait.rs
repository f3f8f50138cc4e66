use crate::error::Result;
use crate::events::{TrackedWindow, WindowHandle};
use crate::geometry::{Display, Rect};
use crate::placement::WindowStyleFlags;

/// OS primitives consumed by the placement core.
///
/// Every call is a bounded synchronous query or write. Implementations report a
/// window that no longer exists as [`PinError::StaleHandle`](crate::error::PinError::StaleHandle)
/// whenever they can tell it apart from a transient failure.
pub trait WindowPlatform: Send + Sync {
    /// Первое окно верхнего уровня процесса с указанным именем
    fn find_target_window(&self, process_name: &str) -> Result<TrackedWindow>;

    /// Подключённые мониторы в порядке перечисления ОС
    fn enumerate_displays(&self) -> Result<Vec<Display>>;

    fn read_window_style(&self, handle: WindowHandle) -> Result<WindowStyleFlags>;

    fn write_window_style(&self, handle: WindowHandle, flags: WindowStyleFlags) -> Result<()>;

    /// Клиентская область; `x`/`y` всегда 0
    fn read_client_bounds(&self, handle: WindowHandle) -> Result<Rect>;

    /// Одна запись положения и размера рамки окна
    fn move_resize_window(&self, handle: WindowHandle, bounds: Rect) -> Result<()>;

    fn window_exists(&self, handle: WindowHandle) -> bool;
}
