use super::NotificationBridge;
use crate::error::Result;
use crate::events::WindowEvent;
use crate::geometry::Rect;
use crate::pin_error;
use crate::services::platform::SimulatedPlatform;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::info;

/// Эмулируемые действия пользователя
#[derive(Debug, Clone, Copy)]
enum Perturbation {
    Drag(Rect),
    Redecorate,
}

static PERTURBATIONS: [Perturbation; 3] = [
    Perturbation::Drag(Rect::new(200, 150, 1280, 720)),
    Perturbation::Drag(Rect::new(2100, 200, 600, 1000)),
    Perturbation::Redecorate,
];

/// Dry-run bridge: wires the simulated desktop's notifications into the stream
/// and optionally plays a user who keeps dragging the window around.
pub struct SimulatedBridge {
    platform: Arc<SimulatedPlatform>,
    perturb_interval: Option<Duration>,
    perturber: Option<JoinHandle<()>>,
    subscribed: bool,
}

impl SimulatedBridge {
    pub fn new(platform: Arc<SimulatedPlatform>, perturb_interval_ms: u64) -> Self {
        let perturb_interval =
            (perturb_interval_ms > 0).then(|| Duration::from_millis(perturb_interval_ms));

        Self {
            platform,
            perturb_interval,
            perturber: None,
            subscribed: false,
        }
    }

    fn spawn_perturber(&self, period: Duration) -> JoinHandle<()> {
        let platform = self.platform.clone();

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Первый тик срабатывает сразу; пропускаем его
            ticker.tick().await;

            for perturbation in PERTURBATIONS.iter().cycle() {
                ticker.tick().await;
                match *perturbation {
                    Perturbation::Drag(frame) => {
                        info!("Dry-run: пользователь перетащил окно в {}", frame);
                        platform.drag_window(frame);
                    }
                    Perturbation::Redecorate => {
                        info!("Dry-run: игра вернула рамку окна");
                        platform.restore_decorations();
                    }
                }
            }
        })
    }
}

#[async_trait::async_trait]
impl NotificationBridge for SimulatedBridge {
    fn subscribe(&mut self, process_id: u32, sink: mpsc::Sender<WindowEvent>) -> Result<()> {
        if self.subscribed {
            return Err(pin_error!(internal, "мост уже подписан"));
        }

        info!("Dry-run: подписка на изменения окон процесса {}", process_id);
        self.platform.attach_sink(process_id, sink);
        self.perturber = self.perturb_interval.map(|period| self.spawn_perturber(period));
        self.subscribed = true;
        Ok(())
    }

    async fn unsubscribe(&mut self) {
        if let Some(task) = self.perturber.take() {
            task.abort();
            let _ = task.await;
        }
        if self.subscribed {
            self.platform.detach_sink();
            self.subscribed = false;
            info!("Dry-run: подписка снята");
        }
    }
}
