use super::{process_name_matches, WindowPlatform};
use crate::debug_if_enabled;
use crate::error::{PinError, Result};
use crate::events::{TrackedWindow, WindowHandle};
use crate::geometry::{Display, Rect};
use crate::pin_error;
use crate::placement::WindowStyleFlags;
use std::ffi::c_void;
use std::ptr::null_mut;
use tracing::{debug, info, warn};
use windows::Win32::Foundation::{
    CloseHandle, GetLastError, SetLastError, BOOL, ERROR_SUCCESS, FALSE, HWND, LPARAM, RECT,
    TRUE, WIN32_ERROR,
};
use windows::Win32::Graphics::Gdi::{
    EnumDisplayMonitors, GetMonitorInfoW, HDC, HMONITOR, MONITORINFO, MONITORINFOEXW,
};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W,
    TH32CS_SNAPPROCESS,
};
use windows::Win32::UI::HiDpi::{
    SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetClientRect, GetParent, GetWindowLongW, GetWindowTextW,
    GetWindowThreadProcessId, IsWindow, SetWindowLongW, SetWindowPos, GWL_STYLE,
    SWP_FRAMECHANGED, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SWP_NOZORDER,
};

fn hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.value() as *mut c_void)
}

/// `GetWindowLongW`/`SetWindowLongW` возвращают 0 и при ошибке, и при нулевом значении;
/// различает только код последней ошибки, сброшенный перед вызовом
fn zero_result_error(value: i32) -> Option<WIN32_ERROR> {
    if value != 0 {
        return None;
    }
    let code = unsafe { GetLastError() };
    (code != ERROR_SUCCESS).then_some(code)
}

fn wide_to_string(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..len])
}

/// Состояние поиска окна для `EnumWindows`
struct WindowSearch {
    process_id: u32,
    found: Option<HWND>,
}

/// Win32 implementation of the OS primitives.
pub struct Win32Platform;

impl Win32Platform {
    pub fn new() -> Self {
        // Без этого масштабированные мониторы отдают логические размеры и «теряют» 16:9
        if let Err(e) =
            unsafe { SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) }
        {
            warn!("Не удалось включить per-monitor DPI awareness (возможно, уже включено): {}", e);
        }
        Self
    }

    fn find_process_ids(process_name: &str) -> Result<Vec<u32>> {
        let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }
            .map_err(|e| pin_error!(service_unavailable, "CreateToolhelp32Snapshot: {}", e))?;

        let mut entry = PROCESSENTRY32W {
            dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };
        let mut ids = Vec::new();

        unsafe {
            let mut next = Process32FirstW(snapshot, &mut entry);
            while next.is_ok() {
                let executable = wide_to_string(&entry.szExeFile);
                if process_name_matches(&executable, process_name) {
                    ids.push(entry.th32ProcessID);
                }
                next = Process32NextW(snapshot, &mut entry);
            }
            let _ = CloseHandle(snapshot);
        }

        Ok(ids)
    }

    fn first_top_level_window(process_id: u32) -> Option<HWND> {
        let mut search = WindowSearch {
            process_id,
            found: None,
        };
        // FALSE из колбэка прерывает перечисление, и EnumWindows возвращает ошибку
        let _ = unsafe {
            EnumWindows(
                Some(enum_window_callback),
                LPARAM(&mut search as *mut WindowSearch as isize),
            )
        };
        search.found
    }

    fn window_title(window: HWND) -> String {
        let mut buffer = [0u16; 256];
        let len = unsafe { GetWindowTextW(window, &mut buffer) };
        wide_to_string(&buffer[..len.max(0) as usize])
    }

    /// Ошибка вызова на закрытом окне означает устаревший дескриптор
    fn stale_or(&self, handle: WindowHandle, error: impl FnOnce() -> PinError) -> PinError {
        if self.window_exists(handle) {
            error()
        } else {
            PinError::StaleHandle(handle)
        }
    }

    fn ensure_alive(&self, handle: WindowHandle) -> Result<HWND> {
        let window = hwnd(handle);
        if unsafe { IsWindow(window) }.as_bool() {
            Ok(window)
        } else {
            Err(PinError::StaleHandle(handle))
        }
    }
}

impl Default for Win32Platform {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowPlatform for Win32Platform {
    fn find_target_window(&self, process_name: &str) -> Result<TrackedWindow> {
        let process_ids = Self::find_process_ids(process_name)?;
        if process_ids.is_empty() {
            return PinError::target_not_found(format!("процесс {} не запущен", process_name));
        }

        for process_id in process_ids {
            if let Some(window) = Self::first_top_level_window(process_id) {
                let title = Self::window_title(window);
                let handle = WindowHandle::new(window.0 as isize);
                info!("Найдено окно \"{}\" {} процесса {}", title, handle, process_id);
                return Ok(TrackedWindow::new(handle, process_id).with_title(title));
            }
            debug!("У процесса {} нет окна верхнего уровня", process_id);
        }

        PinError::target_not_found(format!(
            "у процесса {} нет окна верхнего уровня",
            process_name
        ))
    }

    fn enumerate_displays(&self) -> Result<Vec<Display>> {
        let mut monitors: Vec<HMONITOR> = Vec::new();
        let ok = unsafe {
            EnumDisplayMonitors(
                HDC::default(),
                None,
                Some(enum_monitor_callback),
                LPARAM(&mut monitors as *mut Vec<HMONITOR> as isize),
            )
        };
        if !ok.as_bool() {
            return Err(pin_error!(display_query, "EnumDisplayMonitors вернул FALSE"));
        }

        let mut displays = Vec::with_capacity(monitors.len());
        for monitor in monitors {
            let mut info = MONITORINFOEXW {
                monitorInfo: MONITORINFO {
                    cbSize: std::mem::size_of::<MONITORINFOEXW>() as u32,
                    ..Default::default()
                },
                ..Default::default()
            };

            let ok = unsafe {
                GetMonitorInfoW(monitor, &mut info as *mut MONITORINFOEXW as *mut MONITORINFO)
            };
            if !ok.as_bool() {
                debug!("GetMonitorInfoW не сработал для монитора {:?}", monitor);
                continue;
            }

            let rect = info.monitorInfo.rcMonitor;
            let monitor_display = Display::new(
                wide_to_string(&info.szDevice),
                Rect::from_edges(rect.left, rect.top, rect.right, rect.bottom),
            );
            debug_if_enabled!("Монитор: {}", monitor_display);
            displays.push(monitor_display);
        }

        Ok(displays)
    }

    fn read_window_style(&self, handle: WindowHandle) -> Result<WindowStyleFlags> {
        let window = self.ensure_alive(handle)?;
        let bits = unsafe {
            SetLastError(ERROR_SUCCESS);
            GetWindowLongW(window, GWL_STYLE)
        };
        if let Some(code) = zero_result_error(bits) {
            return Err(self.stale_or(handle, || {
                pin_error!(window_query, "GetWindowLongW для {}: {:?}", handle, code)
            }));
        }
        Ok(WindowStyleFlags::from_bits(bits as u32))
    }

    fn write_window_style(&self, handle: WindowHandle, flags: WindowStyleFlags) -> Result<()> {
        let window = self.ensure_alive(handle)?;
        let previous = unsafe {
            SetLastError(ERROR_SUCCESS);
            SetWindowLongW(window, GWL_STYLE, flags.bits() as i32)
        };
        if let Some(code) = zero_result_error(previous) {
            return Err(self.stale_or(handle, || {
                pin_error!(geometry_write, "SetWindowLongW для {}: {:?}", handle, code)
            }));
        }

        // Новый стиль рамки применяется только после SWP_FRAMECHANGED
        unsafe {
            SetWindowPos(
                window,
                HWND(null_mut()),
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOZORDER | SWP_NOACTIVATE | SWP_FRAMECHANGED,
            )
        }
        .map_err(|e| {
            self.stale_or(handle, || {
                pin_error!(geometry_write, "SWP_FRAMECHANGED для {}: {}", handle, e)
            })
        })
    }

    fn read_client_bounds(&self, handle: WindowHandle) -> Result<Rect> {
        let window = self.ensure_alive(handle)?;
        let mut rect = RECT::default();
        unsafe { GetClientRect(window, &mut rect) }.map_err(|e| {
            self.stale_or(handle, || {
                pin_error!(window_query, "GetClientRect для {}: {}", handle, e)
            })
        })?;
        Ok(Rect::from_edges(rect.left, rect.top, rect.right, rect.bottom))
    }

    fn move_resize_window(&self, handle: WindowHandle, bounds: Rect) -> Result<()> {
        let window = self.ensure_alive(handle)?;
        unsafe {
            // SWP_FRAMECHANGED применяет только что снятые биты рамки
            SetWindowPos(
                window,
                HWND(null_mut()),
                bounds.x,
                bounds.y,
                bounds.width,
                bounds.height,
                SWP_NOZORDER | SWP_NOACTIVATE | SWP_FRAMECHANGED,
            )
        }
        .map_err(|e| pin_error!(geometry_write, "SetWindowPos для {} в {}: {}", handle, bounds, e))
    }

    fn window_exists(&self, handle: WindowHandle) -> bool {
        unsafe { IsWindow(hwnd(handle)) }.as_bool()
    }
}

unsafe extern "system" fn enum_window_callback(window: HWND, lparam: LPARAM) -> BOOL {
    let search = &mut *(lparam.0 as *mut WindowSearch);

    let top_level = match GetParent(window) {
        Ok(parent) => parent.0.is_null(),
        Err(_) => true,
    };
    if !top_level {
        return TRUE;
    }

    let mut owner = 0u32;
    GetWindowThreadProcessId(window, Some(&mut owner));
    if owner == search.process_id {
        search.found = Some(window);
        return FALSE;
    }
    TRUE
}

/// Callback for `EnumDisplayMonitors` that collects HMONITOR handles.
unsafe extern "system" fn enum_monitor_callback(
    monitor: HMONITOR,
    _hdc: HDC,
    _rect: *mut RECT,
    lparam: LPARAM,
) -> BOOL {
    let monitors = &mut *(lparam.0 as *mut Vec<HMONITOR>);
    monitors.push(monitor);
    TRUE
}
