use super::NotificationBridge;
use crate::error::Result;
use crate::events::{WindowEvent, WindowEventKind, WindowHandle};
use crate::pin_error;
use std::cell::RefCell;
use std::ptr::null_mut;
use std::thread::JoinHandle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};
use windows::Win32::Foundation::{HMODULE, HWND, LPARAM, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Accessibility::{SetWinEventHook, UnhookWinEvent, HWINEVENTHOOK};
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, GetMessageW, PeekMessageW, PostThreadMessageW, TranslateMessage,
    CHILDID_SELF, EVENT_OBJECT_LOCATIONCHANGE, EVENT_OBJECT_PARENTCHANGE, MSG, OBJID_WINDOW,
    PM_NOREMOVE, WINEVENT_OUTOFCONTEXT, WINEVENT_SKIPOWNPROCESS, WM_QUIT, WM_USER,
};

thread_local! {
    // Хук OUTOFCONTEXT вызывается на потоке, который его поставил
    static EVENT_SINK: RefCell<Option<mpsc::Sender<WindowEvent>>> = const { RefCell::new(None) };
}

struct HookThread {
    thread_id: u32,
    join: JoinHandle<()>,
}

/// WinEvent hook on a dedicated message-pumping thread.
pub struct Win32Bridge {
    hook_thread: Option<HookThread>,
}

impl Win32Bridge {
    pub fn new() -> Self {
        Self { hook_thread: None }
    }

    fn post_quit(thread_id: u32) {
        if let Err(e) = unsafe { PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) } {
            warn!("Не удалось остановить поток WinEvent-хука {}: {}", thread_id, e);
        }
    }
}

impl Default for Win32Bridge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl NotificationBridge for Win32Bridge {
    fn subscribe(&mut self, process_id: u32, sink: mpsc::Sender<WindowEvent>) -> Result<()> {
        if self.hook_thread.is_some() {
            return Err(pin_error!(internal, "WinEvent-хук уже установлен"));
        }

        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<u32>>();
        let join = std::thread::Builder::new()
            .name("winevent-hook".to_string())
            .spawn(move || hook_thread_main(process_id, sink, ready_tx))?;

        let thread_id = ready_rx
            .recv()
            .map_err(|_| pin_error!(internal, "поток WinEvent-хука завершился до запуска"))??;

        info!(
            "WinEvent-хук установлен для процесса {} (поток {})",
            process_id, thread_id
        );
        self.hook_thread = Some(HookThread { thread_id, join });
        Ok(())
    }

    async fn unsubscribe(&mut self) {
        let Some(hook) = self.hook_thread.take() else {
            return;
        };

        Self::post_quit(hook.thread_id);
        match tokio::task::spawn_blocking(move || hook.join.join()).await {
            Ok(Ok(())) => info!("WinEvent-хук снят"),
            Ok(Err(_)) => error!("Поток WinEvent-хука завершился паникой"),
            Err(e) => error!("Не удалось дождаться потока WinEvent-хука: {}", e),
        }
    }
}

impl Drop for Win32Bridge {
    fn drop(&mut self) {
        if let Some(hook) = self.hook_thread.take() {
            Self::post_quit(hook.thread_id);
        }
    }
}

fn hook_thread_main(
    process_id: u32,
    sink: mpsc::Sender<WindowEvent>,
    ready: std::sync::mpsc::Sender<Result<u32>>,
) {
    EVENT_SINK.with(|slot| *slot.borrow_mut() = Some(sink));

    let hook = unsafe {
        SetWinEventHook(
            EVENT_OBJECT_LOCATIONCHANGE,
            EVENT_OBJECT_PARENTCHANGE,
            HMODULE::default(),
            Some(win_event_proc),
            process_id,
            0,
            WINEVENT_OUTOFCONTEXT | WINEVENT_SKIPOWNPROCESS,
        )
    };
    if hook.0.is_null() {
        let _ = ready.send(Err(pin_error!(
            service_unavailable,
            "SetWinEventHook не сработал для процесса {}",
            process_id
        )));
        return;
    }

    let mut msg = MSG::default();
    let thread_id = unsafe {
        // Очередь сообщений должна существовать до первого PostThreadMessageW
        let _ = PeekMessageW(&mut msg, HWND(null_mut()), WM_USER, WM_USER, PM_NOREMOVE);
        GetCurrentThreadId()
    };
    let _ = ready.send(Ok(thread_id));

    unsafe {
        while GetMessageW(&mut msg, HWND(null_mut()), 0, 0).0 > 0 {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
        let _ = UnhookWinEvent(hook);
    }

    EVENT_SINK.with(|slot| slot.borrow_mut().take());
    debug!("Поток WinEvent-хука завершён");
}

unsafe extern "system" fn win_event_proc(
    _hook: HWINEVENTHOOK,
    event: u32,
    hwnd: HWND,
    id_object: i32,
    id_child: i32,
    _event_thread: u32,
    _event_time: u32,
) {
    // Курсор, каретка и дочерние элементы тоже шлют LOCATIONCHANGE
    if id_object != OBJID_WINDOW.0 || id_child != CHILDID_SELF as i32 {
        return;
    }

    let kind = match event {
        EVENT_OBJECT_LOCATIONCHANGE => WindowEventKind::LocationChanged,
        EVENT_OBJECT_PARENTCHANGE => WindowEventKind::ParentChanged,
        _ => return,
    };
    let event = WindowEvent::new(WindowHandle::new(hwnd.0 as isize), kind);

    EVENT_SINK.with(|slot| {
        let slot = slot.borrow();
        let Some(sink) = slot.as_ref() else {
            return;
        };
        match sink.try_send(event) {
            Ok(()) => {}
            // В очереди уже есть событие, значит проход всё равно состоится
            Err(TrySendError::Full(_)) => {
                debug!("Очередь уведомлений заполнена, событие пропущено")
            }
            Err(TrySendError::Closed(_)) => debug!("Получатель уведомлений закрыт"),
        }
    });
}
