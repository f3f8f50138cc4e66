use crate::error::Result;
use crate::events::WindowEvent;
use tokio::sync::mpsc;

/// Source of "window changed" notifications for one process.
///
/// The bridge is the only producer of the stream; the placement enforcer is its
/// only consumer. Delivery must never block the OS callback thread.
#[async_trait::async_trait]
pub trait NotificationBridge: Send {
    /// Подписаться на изменения окон процесса `process_id`
    fn subscribe(&mut self, process_id: u32, sink: mpsc::Sender<WindowEvent>) -> Result<()>;

    /// Отписаться; после этого отправитель потока закрыт
    async fn unsubscribe(&mut self);
}
