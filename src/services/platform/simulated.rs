use super::{process_name_matches, WindowPlatform};
use crate::config::SimulationConfig;
use crate::error::{PinError, Result};
use crate::events::{TrackedWindow, WindowEvent, WindowHandle};
use crate::geometry::{Display, Rect};
use crate::placement::WindowStyleFlags;
use crate::pin_error;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

// Размер рамки и заголовка, которые «ОС» вычитает из клиентской области
const CAPTION_CHROME: (i32, i32) = (16, 39);
const SIZEBOX_CHROME: (i32, i32) = (8, 8);

pub const SIMULATED_HANDLE: WindowHandle = WindowHandle(0x0001_0a2c);
pub const SIMULATED_PID: u32 = 4242;

/// Окно на виртуальном рабочем столе
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedWindow {
    pub handle: WindowHandle,
    pub process_id: u32,
    pub process_name: String,
    pub title: String,
    pub style: WindowStyleFlags,
    pub frame: Rect,
}

impl SimulatedWindow {
    pub fn new(process_name: &str, frame: Rect, style: WindowStyleFlags) -> Self {
        Self {
            handle: SIMULATED_HANDLE,
            process_id: SIMULATED_PID,
            process_name: format!("{}.exe", process_name.trim_end_matches(".exe")),
            title: "simulated - dry_run".to_string(),
            style,
            frame,
        }
    }

    pub fn client_size(&self) -> (i32, i32) {
        let (dw, dh) = chrome(self.style);
        ((self.frame.width - dw).max(0), (self.frame.height - dh).max(0))
    }
}

fn chrome(style: WindowStyleFlags) -> (i32, i32) {
    if style.is_decorated() {
        CAPTION_CHROME
    } else if style.intersects(WindowStyleFlags::SIZEBOX) {
        SIZEBOX_CHROME
    } else {
        (0, 0)
    }
}

/// Записи, которые «ОС» приняла
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteRecord {
    Style {
        handle: WindowHandle,
        flags: WindowStyleFlags,
    },
    MoveResize {
        handle: WindowHandle,
        bounds: Rect,
    },
}

#[derive(Debug, Default)]
struct SimulatedDesktop {
    displays: Vec<Display>,
    window: Option<SimulatedWindow>,
    sink: Option<(u32, mpsc::Sender<WindowEvent>)>,
    writes: Vec<WriteRecord>,
    failing_reads: u32,
    failing_display_queries: u32,
    reject_writes: bool,
}

impl SimulatedDesktop {
    fn live_window(&mut self, handle: WindowHandle) -> Result<&mut SimulatedWindow> {
        match self.window.as_mut() {
            Some(window) if window.handle == handle => Ok(window),
            _ => Err(PinError::StaleHandle(handle)),
        }
    }

    fn take_read_failure(&mut self) -> bool {
        if self.failing_reads > 0 {
            self.failing_reads -= 1;
            true
        } else {
            false
        }
    }

    /// Уведомление подписчику, если окно принадлежит его процессу
    fn notify(&self, handle: WindowHandle) {
        let Some((process_id, sink)) = self.sink.as_ref() else {
            return;
        };
        let owned = self
            .window
            .as_ref()
            .is_some_and(|w| w.handle == handle && w.process_id == *process_id);
        if owned {
            if let Err(e) = sink.try_send(WindowEvent::location_changed(handle)) {
                debug!("Симуляция: уведомление не доставлено: {}", e);
            }
        }
    }
}

/// In-memory desktop implementing every OS primitive. Backs `--dry-run` and tests.
///
/// Every accepted write (and every simulated user drag) emits a location-change
/// notification to the attached sink, reproducing the self-triggered re-entry a
/// real window manager produces.
#[derive(Debug, Default)]
pub struct SimulatedPlatform {
    desktop: Mutex<SimulatedDesktop>,
}

impl SimulatedPlatform {
    pub fn new(displays: Vec<Display>) -> Self {
        Self {
            desktop: Mutex::new(SimulatedDesktop {
                displays,
                ..Default::default()
            }),
        }
    }

    pub fn from_config(simulation: &SimulationConfig, process_name: &str) -> Self {
        let platform = Self::new(simulation.displays());
        let style = if simulation.window.decorated {
            WindowStyleFlags::CAPTION | WindowStyleFlags::SIZEBOX
        } else {
            WindowStyleFlags::NONE
        };
        // Рамка задаётся так, чтобы клиентская область была ровно window.width x window.height
        let (dw, dh) = chrome(style);
        let frame = Rect::new(
            100,
            100,
            simulation.window.width + dw,
            simulation.window.height + dh,
        );
        let window = SimulatedWindow::new(process_name, frame, style);
        platform.spawn_window(window);
        platform
    }

    pub fn spawn_window(&self, window: SimulatedWindow) {
        info!("Симуляция: окно {} {}", window.title, window.frame);
        self.desktop.lock().window = Some(window);
    }

    pub fn window(&self) -> Option<SimulatedWindow> {
        self.desktop.lock().window.clone()
    }

    pub fn close_window(&self) {
        self.desktop.lock().window = None;
    }

    pub fn set_displays(&self, displays: Vec<Display>) {
        self.desktop.lock().displays = displays;
    }

    /// Действие пользователя: окно перетащили или изменили его размер
    pub fn drag_window(&self, frame: Rect) {
        let mut desktop = self.desktop.lock();
        let Some(window) = desktop.window.as_mut() else {
            return;
        };
        window.frame = frame;
        let handle = window.handle;
        desktop.notify(handle);
    }

    /// Игра вернулась в оконный режим и снова нарисовала рамку
    pub fn restore_decorations(&self) {
        let mut desktop = self.desktop.lock();
        let Some(window) = desktop.window.as_mut() else {
            return;
        };
        window.style = window.style | WindowStyleFlags::CAPTION | WindowStyleFlags::SIZEBOX;
        let handle = window.handle;
        desktop.notify(handle);
    }

    pub fn fail_next_reads(&self, count: u32) {
        self.desktop.lock().failing_reads = count;
    }

    pub fn fail_next_display_queries(&self, count: u32) {
        self.desktop.lock().failing_display_queries = count;
    }

    pub fn reject_writes(&self, reject: bool) {
        self.desktop.lock().reject_writes = reject;
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.desktop.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.desktop.lock().writes.clear();
    }

    pub fn attach_sink(&self, process_id: u32, sink: mpsc::Sender<WindowEvent>) {
        self.desktop.lock().sink = Some((process_id, sink));
    }

    pub fn detach_sink(&self) {
        self.desktop.lock().sink = None;
    }
}

impl WindowPlatform for SimulatedPlatform {
    fn find_target_window(&self, process_name: &str) -> Result<TrackedWindow> {
        let desktop = self.desktop.lock();
        match desktop.window.as_ref() {
            Some(window) if process_name_matches(&window.process_name, process_name) => {
                Ok(TrackedWindow::new(window.handle, window.process_id)
                    .with_title(window.title.clone()))
            }
            _ => PinError::target_not_found(format!("процесс {} не запущен", process_name)),
        }
    }

    fn enumerate_displays(&self) -> Result<Vec<Display>> {
        let mut desktop = self.desktop.lock();
        if desktop.failing_display_queries > 0 {
            desktop.failing_display_queries -= 1;
            return Err(pin_error!(display_query, "симулированный сбой перечисления"));
        }
        Ok(desktop.displays.clone())
    }

    fn read_window_style(&self, handle: WindowHandle) -> Result<WindowStyleFlags> {
        let mut desktop = self.desktop.lock();
        if desktop.take_read_failure() {
            return Err(pin_error!(window_query, "симулированный сбой чтения стиля"));
        }
        Ok(desktop.live_window(handle)?.style)
    }

    fn write_window_style(&self, handle: WindowHandle, flags: WindowStyleFlags) -> Result<()> {
        let mut desktop = self.desktop.lock();
        if desktop.reject_writes {
            warn!("Симуляция: запись стиля отклонена");
            return Err(pin_error!(geometry_write, "симуляция отклонила SetWindowLong"));
        }
        desktop.live_window(handle)?.style = flags;
        desktop.writes.push(WriteRecord::Style { handle, flags });
        desktop.notify(handle);
        Ok(())
    }

    fn read_client_bounds(&self, handle: WindowHandle) -> Result<Rect> {
        let mut desktop = self.desktop.lock();
        if desktop.take_read_failure() {
            return Err(pin_error!(window_query, "симулированный сбой GetClientRect"));
        }
        let (width, height) = desktop.live_window(handle)?.client_size();
        Ok(Rect::new(0, 0, width, height))
    }

    fn move_resize_window(&self, handle: WindowHandle, bounds: Rect) -> Result<()> {
        let mut desktop = self.desktop.lock();
        if desktop.reject_writes {
            warn!("Симуляция: перемещение окна отклонено");
            return Err(pin_error!(geometry_write, "симуляция отклонила SetWindowPos"));
        }
        desktop.live_window(handle)?.frame = bounds;
        desktop.writes.push(WriteRecord::MoveResize { handle, bounds });
        desktop.notify(handle);
        Ok(())
    }

    fn window_exists(&self, handle: WindowHandle) -> bool {
        self.desktop
            .lock()
            .window
            .as_ref()
            .is_some_and(|w| w.handle == handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn platform() -> SimulatedPlatform {
        SimulatedPlatform::from_config(&Config::default().simulation, "umamusume")
    }

    #[test]
    fn configured_window_has_requested_client_size() {
        let platform = platform();
        let window = platform.window().unwrap();

        assert!(window.style.is_decorated());
        assert_eq!(
            platform.read_client_bounds(window.handle).unwrap(),
            Rect::new(0, 0, 800, 600)
        );
        assert_eq!(window.frame, Rect::new(100, 100, 816, 639));
    }

    #[test]
    fn finds_window_by_process_name() {
        let platform = platform();

        let target = platform.find_target_window("UMAMUSUME.exe").unwrap();
        assert_eq!(target.handle, SIMULATED_HANDLE);
        assert_eq!(target.process_id, SIMULATED_PID);

        assert!(matches!(
            platform.find_target_window("notepad"),
            Err(PinError::TargetNotFound(_))
        ));
    }

    #[test]
    fn closed_window_reads_as_stale() {
        let platform = platform();
        platform.close_window();

        assert!(!platform.window_exists(SIMULATED_HANDLE));
        assert!(matches!(
            platform.read_window_style(SIMULATED_HANDLE),
            Err(PinError::StaleHandle(_))
        ));
        assert!(platform
            .move_resize_window(SIMULATED_HANDLE, Rect::new(0, 0, 1, 1))
            .is_err());
    }

    #[test]
    fn injected_failures_are_consumed() {
        let platform = platform();
        platform.fail_next_reads(1);
        platform.fail_next_display_queries(1);

        assert!(matches!(
            platform.read_window_style(SIMULATED_HANDLE),
            Err(PinError::WindowQuery(_))
        ));
        assert!(platform.read_window_style(SIMULATED_HANDLE).is_ok());
        assert!(platform.enumerate_displays().is_err());
        assert_eq!(platform.enumerate_displays().unwrap().len(), 2);
    }

    #[test]
    fn accepted_writes_notify_attached_sink() {
        let platform = platform();
        let (tx, mut rx) = mpsc::channel(8);
        platform.attach_sink(SIMULATED_PID, tx);

        platform
            .move_resize_window(SIMULATED_HANDLE, Rect::new(0, 0, 1920, 1080))
            .unwrap();
        let event = rx.try_recv().unwrap();
        assert_eq!(event.handle, SIMULATED_HANDLE);

        platform.reject_writes(true);
        assert!(platform
            .write_window_style(SIMULATED_HANDLE, WindowStyleFlags::NONE)
            .is_err());
        assert!(rx.try_recv().is_err());
        assert_eq!(platform.writes().len(), 1);

        platform.detach_sink();
        platform.drag_window(Rect::new(5, 5, 640, 480));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn sink_for_other_process_gets_nothing() {
        let platform = platform();
        let (tx, mut rx) = mpsc::channel(8);
        platform.attach_sink(SIMULATED_PID + 1, tx);

        platform.drag_window(Rect::new(0, 0, 640, 480));
        assert!(rx.try_recv().is_err());
    }
}
