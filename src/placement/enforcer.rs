use super::{decide, strip_decorations, Decision, WindowGeometrySnapshot};
use crate::config::EnforcementConfig;
use crate::debug_if_enabled;
use crate::error::{PinError, Result};
use crate::events::{TrackedWindow, WindowEvent, WindowHandle};
use crate::geometry::Display;
use crate::services::platform::WindowPlatform;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Active,
    /// Окно закрыто: проходы больше не выполняются до нового поиска цели
    Lost,
}

/// Всё, что раньше было глобальным состоянием: отслеживаемое окно и его статус
#[derive(Debug, Clone)]
pub struct EnforcementContext {
    pub target: TrackedWindow,
    pub state: TrackingState,
}

impl EnforcementContext {
    pub fn new(target: TrackedWindow) -> Self {
        Self {
            target,
            state: TrackingState::Active,
        }
    }
}

/// Результат одного прохода
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    IgnoredForeignWindow,
    Suspended,
    NoActionNeeded,
    DecorationsStripped,
    Corrected { display: Display },
    /// Проход брошен без ошибки наружу; следующий event попробует снова
    Abandoned { reason: String },
    TargetLost,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnforcementStats {
    pub passes: u64,
    pub corrections: u64,
    pub strips: u64,
    pub ignored: u64,
    pub coalesced: u64,
    pub abandoned: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforcerExit {
    TargetLost,
    StreamClosed,
}

/// Decide-then-correct loop for a single tracked window.
///
/// Exclusively owns its context; `&mut self` on every entry point keeps passes
/// strictly sequential. A corrective write triggers one more notification, and
/// that follow-up pass finds nothing to do, so the chain ends on its own.
pub struct PlacementEnforcer {
    platform: Arc<dyn WindowPlatform>,
    context: EnforcementContext,
    read_retries: u32,
    coalesce_events: bool,
    stats: EnforcementStats,
}

impl PlacementEnforcer {
    pub fn new(
        platform: Arc<dyn WindowPlatform>,
        target: TrackedWindow,
        config: &EnforcementConfig,
    ) -> Self {
        info!("Инициализация PlacementEnforcer для окна {}", target);

        Self {
            platform,
            context: EnforcementContext::new(target),
            read_retries: config.read_retries.min(1),
            coalesce_events: config.coalesce_events,
            stats: EnforcementStats::default(),
        }
    }

    pub fn context(&self) -> &EnforcementContext {
        &self.context
    }

    pub fn stats(&self) -> EnforcementStats {
        self.stats
    }

    /// Исправляет состояние, в котором окно было до подписки на уведомления
    pub fn initial_adjust(&mut self) -> PassOutcome {
        info!("Начальная проверка окна {}", self.context.target);
        self.enforce()
    }

    /// Колбэк моста уведомлений. Чужие окна отбрасываются по точному совпадению дескриптора.
    pub fn on_window_changed(&mut self, handle: WindowHandle) -> PassOutcome {
        if handle != self.context.target.handle {
            self.stats.ignored += 1;
            return PassOutcome::IgnoredForeignWindow;
        }

        debug_if_enabled!("Уведомление об изменении окна {}", handle);
        self.enforce()
    }

    /// Единственный потребитель потока уведомлений
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<WindowEvent>,
    ) -> (EnforcerExit, EnforcementStats) {
        if self.context.state == TrackingState::Lost {
            warn!("Окно {} уже потеряно, цикл не запускается", self.context.target);
            return (EnforcerExit::TargetLost, self.stats);
        }

        info!("PlacementEnforcer запущен (coalesce_events: {})", self.coalesce_events);

        while let Some(event) = events.recv().await {
            let mut handle = event.handle;

            if self.coalesce_events {
                while let Ok(next) = events.try_recv() {
                    self.stats.coalesced += 1;
                    if next.handle == self.context.target.handle {
                        handle = next.handle;
                    }
                }
            }

            match self.on_window_changed(handle) {
                PassOutcome::TargetLost | PassOutcome::Suspended => {
                    return (EnforcerExit::TargetLost, self.stats)
                }
                _ => {}
            }
        }

        info!("Поток уведомлений закрыт");
        (EnforcerExit::StreamClosed, self.stats)
    }

    fn enforce(&mut self) -> PassOutcome {
        if self.context.state == TrackingState::Lost {
            return PassOutcome::Suspended;
        }

        self.stats.passes += 1;
        let handle = self.context.target.handle;
        // Один повтор на весь проход, а не на каждое чтение
        let mut retries = self.read_retries;

        let snapshot = match self.read_snapshot(handle, &mut retries) {
            Ok(snapshot) => snapshot,
            Err(e) => return self.pass_failed(handle, "чтение окна", e),
        };

        // Сбой перечисления мониторов = нет кандидатов
        let displays = match with_retry(&mut retries, || self.platform.enumerate_displays()) {
            Ok(displays) => displays,
            Err(e) => {
                warn!("Не удалось получить список мониторов: {}", e);
                Vec::new()
            }
        };

        let decision = decide(&snapshot, &displays);
        if decision.requires_write() {
            debug_if_enabled!("Окно {} ({}): {:?}", handle, snapshot, decision);
        }

        match decision {
            Decision::NoActionNeeded => {
                debug_if_enabled!("Окно {} уже на месте ({})", handle, snapshot);
                PassOutcome::NoActionNeeded
            }
            Decision::StripDecorationsOnly => {
                if let Err(e) = strip_decorations(self.platform.as_ref(), handle) {
                    return self.pass_failed(handle, "снятие рамки", e);
                }
                self.stats.strips += 1;
                info!(
                    "Рамка окна {} снята; монитора с подходящим соотношением сторон нет",
                    handle
                );
                PassOutcome::DecorationsStripped
            }
            Decision::Correct { target } => {
                if let Err(e) = strip_decorations(self.platform.as_ref(), handle) {
                    return self.pass_failed(handle, "снятие рамки", e);
                }
                if let Err(e) = self.platform.move_resize_window(handle, target.bounds) {
                    return self.pass_failed(handle, "перемещение окна", e);
                }
                self.stats.corrections += 1;
                info!(
                    "Окно {} ({:?}, {}) растянуто на монитор {}",
                    handle,
                    snapshot.orientation(),
                    snapshot,
                    target
                );
                PassOutcome::Corrected { display: target }
            }
        }
    }

    fn read_snapshot(
        &self,
        handle: WindowHandle,
        retries: &mut u32,
    ) -> Result<WindowGeometrySnapshot> {
        let style = with_retry(retries, || self.platform.read_window_style(handle))?;
        let client = with_retry(retries, || self.platform.read_client_bounds(handle))?;
        Ok(WindowGeometrySnapshot::new(style, client.width, client.height))
    }

    /// Ошибка внутри прохода никогда не уходит наружу: либо окно потеряно, либо проход брошен
    fn pass_failed(&mut self, handle: WindowHandle, stage: &str, e: PinError) -> PassOutcome {
        if e.is_stale() || !self.platform.window_exists(handle) {
            error!(
                "Окно {} больше не существует ({}: {}); отслеживание приостановлено",
                self.context.target, stage, e
            );
            self.context.state = TrackingState::Lost;
            return PassOutcome::TargetLost;
        }

        warn!("Проход для окна {} брошен ({}): {}", handle, stage, e);
        self.stats.abandoned += 1;
        PassOutcome::Abandoned {
            reason: format!("{}: {}", stage, e),
        }
    }
}

/// Повторяет `op`, пока не исчерпан общий на проход бюджет `retries`;
/// ошибку устаревшего дескриптора не повторяем
fn with_retry<T>(retries: &mut u32, mut op: impl FnMut() -> Result<T>) -> Result<T> {
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_stale() || *retries == 0 => return Err(e),
            Err(e) => {
                debug_if_enabled!("Повтор после ошибки: {}", e);
                *retries -= 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::geometry::Rect;
    use crate::placement::WindowStyleFlags;
    use crate::services::platform::simulated::{
        SimulatedWindow, WriteRecord, SIMULATED_HANDLE, SIMULATED_PID,
    };
    use crate::services::platform::SimulatedPlatform;

    fn landscape() -> Display {
        Display::new("\\\\.\\DISPLAY1", Rect::new(0, 0, 1920, 1080))
    }

    fn portrait() -> Display {
        Display::new("\\\\.\\DISPLAY2", Rect::new(1920, 0, 1080, 1920))
    }

    fn setup() -> (Arc<SimulatedPlatform>, PlacementEnforcer) {
        setup_with(&Config::default())
    }

    fn setup_with(config: &Config) -> (Arc<SimulatedPlatform>, PlacementEnforcer) {
        let platform = Arc::new(SimulatedPlatform::from_config(&config.simulation, "umamusume"));
        let target = platform.find_target_window("umamusume").unwrap();
        let enforcer = PlacementEnforcer::new(platform.clone(), target, &config.enforcement);
        (platform, enforcer)
    }

    fn move_count(platform: &SimulatedPlatform) -> usize {
        platform
            .writes()
            .iter()
            .filter(|w| matches!(w, WriteRecord::MoveResize { .. }))
            .count()
    }

    #[test]
    fn decorated_window_converges_after_one_correction() {
        let (platform, mut enforcer) = setup();

        assert_eq!(
            enforcer.initial_adjust(),
            PassOutcome::Corrected { display: landscape() }
        );
        let window = platform.window().unwrap();
        assert_eq!(window.frame, landscape().bounds);
        assert!(!window.style.is_decorated());
        assert_eq!(move_count(&platform), 1);

        // Повторный проход от собственного уведомления
        platform.clear_writes();
        assert_eq!(
            enforcer.on_window_changed(SIMULATED_HANDLE),
            PassOutcome::NoActionNeeded
        );
        assert!(platform.writes().is_empty());
    }

    #[test]
    fn correction_strips_before_moving() {
        let (platform, mut enforcer) = setup();
        enforcer.initial_adjust();

        let writes = platform.writes();
        assert_eq!(writes.len(), 2);
        assert!(matches!(writes[0], WriteRecord::Style { flags, .. } if !flags.is_decorated()));
        assert_eq!(
            writes[1],
            WriteRecord::MoveResize {
                handle: SIMULATED_HANDLE,
                bounds: landscape().bounds,
            }
        );
    }

    #[test]
    fn user_drag_to_portrait_size_moves_window_to_portrait_display() {
        let (platform, mut enforcer) = setup();
        enforcer.initial_adjust();

        platform.drag_window(Rect::new(300, 200, 700, 1100));
        assert_eq!(
            enforcer.on_window_changed(SIMULATED_HANDLE),
            PassOutcome::Corrected { display: portrait() }
        );
        assert_eq!(platform.window().unwrap().frame, portrait().bounds);
        assert_eq!(
            enforcer.on_window_changed(SIMULATED_HANDLE),
            PassOutcome::NoActionNeeded
        );
    }

    #[test]
    fn foreign_handles_are_ignored_without_reads() {
        let (platform, mut enforcer) = setup();
        platform.fail_next_reads(5);

        assert_eq!(
            enforcer.on_window_changed(WindowHandle::new(0xdead)),
            PassOutcome::IgnoredForeignWindow
        );
        assert!(platform.writes().is_empty());
        assert_eq!(enforcer.stats().ignored, 1);
        assert_eq!(enforcer.stats().passes, 0);
    }

    #[test]
    fn decorated_window_without_candidates_is_only_stripped() {
        let (platform, mut enforcer) = setup();
        platform.set_displays(vec![portrait()]);

        assert_eq!(enforcer.initial_adjust(), PassOutcome::DecorationsStripped);
        assert_eq!(move_count(&platform), 0);
        assert!(!platform.window().unwrap().style.is_decorated());

        assert_eq!(
            enforcer.on_window_changed(SIMULATED_HANDLE),
            PassOutcome::NoActionNeeded
        );
    }

    #[test]
    fn undecorated_window_without_candidates_is_untouched() {
        let mut config = Config::default();
        config.simulation.window.decorated = false;
        let (platform, mut enforcer) = setup_with(&config);
        platform.set_displays(vec![portrait()]);

        assert_eq!(enforcer.initial_adjust(), PassOutcome::NoActionNeeded);
        assert!(platform.writes().is_empty());
    }

    #[test]
    fn display_query_failure_degrades_to_no_candidates() {
        let mut config = Config::default();
        config.simulation.window.decorated = false;
        let (platform, mut enforcer) = setup_with(&config);
        platform.fail_next_display_queries(2);

        assert_eq!(enforcer.initial_adjust(), PassOutcome::NoActionNeeded);
        assert!(platform.writes().is_empty());
    }

    #[test]
    fn transient_read_failure_is_retried_once() {
        let (platform, mut enforcer) = setup();
        platform.fail_next_reads(1);

        assert!(matches!(
            enforcer.initial_adjust(),
            PassOutcome::Corrected { .. }
        ));
    }

    #[test]
    fn persistent_read_failure_abandons_pass() {
        let (platform, mut enforcer) = setup();
        platform.fail_next_reads(2);

        assert!(matches!(
            enforcer.initial_adjust(),
            PassOutcome::Abandoned { .. }
        ));
        assert_eq!(enforcer.context().state, TrackingState::Active);
        assert_eq!(enforcer.stats().abandoned, 1);

        // Следующее событие пробует заново
        assert!(matches!(
            enforcer.on_window_changed(SIMULATED_HANDLE),
            PassOutcome::Corrected { .. }
        ));
    }

    #[test]
    fn no_retry_when_disabled() {
        let mut config = Config::default();
        config.enforcement.read_retries = 0;
        let (platform, mut enforcer) = setup_with(&config);
        platform.fail_next_reads(1);

        assert!(matches!(
            enforcer.initial_adjust(),
            PassOutcome::Abandoned { .. }
        ));
    }

    #[test]
    fn rejected_write_abandons_pass_and_keeps_tracking() {
        let (platform, mut enforcer) = setup();
        platform.reject_writes(true);

        assert!(matches!(
            enforcer.initial_adjust(),
            PassOutcome::Abandoned { .. }
        ));
        assert_eq!(enforcer.context().state, TrackingState::Active);

        platform.reject_writes(false);
        assert!(matches!(
            enforcer.on_window_changed(SIMULATED_HANDLE),
            PassOutcome::Corrected { .. }
        ));
    }

    #[test]
    fn closed_window_suspends_enforcement() {
        let (platform, mut enforcer) = setup();
        platform.close_window();

        assert_eq!(enforcer.initial_adjust(), PassOutcome::TargetLost);
        assert_eq!(enforcer.context().state, TrackingState::Lost);

        // Новое окно с тем же дескриптором не подхватывается автоматически
        platform.spawn_window(SimulatedWindow::new(
            "umamusume",
            Rect::new(0, 0, 800, 600),
            WindowStyleFlags::CAPTION,
        ));
        assert_eq!(
            enforcer.on_window_changed(SIMULATED_HANDLE),
            PassOutcome::Suspended
        );
        assert!(platform.writes().is_empty());
    }

    #[test]
    fn with_retry_stops_on_stale_handle() {
        let mut calls = 0;
        let mut retries = 1;
        let result: Result<()> = with_retry(&mut retries, || {
            calls += 1;
            Err(PinError::StaleHandle(SIMULATED_HANDLE))
        });

        assert!(result.is_err());
        assert_eq!(calls, 1);
        assert_eq!(retries, 1);
    }

    #[test]
    fn retry_budget_is_shared_across_reads_of_one_pass() {
        let (platform, mut enforcer) = setup();
        // Повтор уходит на чтение стиля, на перечисление мониторов повтора уже нет
        platform.fail_next_reads(1);
        platform.fail_next_display_queries(1);

        assert_eq!(enforcer.initial_adjust(), PassOutcome::DecorationsStripped);
        assert_eq!(move_count(&platform), 0);

        // Бюджет восстанавливается к следующему проходу
        platform.fail_next_reads(1);
        assert_eq!(
            enforcer.on_window_changed(SIMULATED_HANDLE),
            PassOutcome::Corrected { display: landscape() }
        );
    }

    #[tokio::test]
    async fn run_settles_after_self_triggered_notifications() {
        let mut config = Config::default();
        config.enforcement.coalesce_events = false;
        let (platform, mut enforcer) = setup_with(&config);
        let (tx, rx) = mpsc::channel(16);
        platform.attach_sink(SIMULATED_PID, tx);

        enforcer.initial_adjust();
        // Стиль + перемещение дали два уведомления; оба должны закончиться без записей
        platform.detach_sink();

        let (exit, stats) = enforcer.run(rx).await;

        assert_eq!(exit, EnforcerExit::StreamClosed);
        assert_eq!(stats.corrections, 1);
        assert_eq!(stats.passes, 3);
        assert_eq!(move_count(&platform), 1);
    }

    #[tokio::test]
    async fn run_coalesces_queued_events_into_one_pass() {
        let (platform, enforcer) = setup();
        let (tx, rx) = mpsc::channel(16);

        tx.send(WindowEvent::location_changed(WindowHandle::new(1))).await.unwrap();
        tx.send(WindowEvent::location_changed(SIMULATED_HANDLE)).await.unwrap();
        tx.send(WindowEvent::parent_changed(SIMULATED_HANDLE)).await.unwrap();
        drop(tx);

        let (exit, stats) = enforcer.run(rx).await;

        assert_eq!(exit, EnforcerExit::StreamClosed);
        assert_eq!(stats.passes, 1);
        assert_eq!(stats.coalesced, 2);
        assert_eq!(stats.corrections, 1);
        assert_eq!(move_count(&platform), 1);
    }

    #[tokio::test]
    async fn run_ends_when_target_is_lost() {
        let (platform, enforcer) = setup();
        let (tx, rx) = mpsc::channel(4);
        platform.close_window();

        tx.send(WindowEvent::location_changed(SIMULATED_HANDLE)).await.unwrap();

        let (exit, _) = enforcer.run(rx).await;
        assert_eq!(exit, EnforcerExit::TargetLost);
    }

    #[tokio::test]
    async fn run_exits_when_target_was_lost_before_start() {
        let (platform, mut enforcer) = setup();
        platform.close_window();
        assert_eq!(enforcer.initial_adjust(), PassOutcome::TargetLost);

        let (tx, rx) = mpsc::channel(4);
        tx.send(WindowEvent::location_changed(SIMULATED_HANDLE)).await.unwrap();

        let (exit, stats) = enforcer.run(rx).await;
        assert_eq!(exit, EnforcerExit::TargetLost);
        assert_eq!(stats.passes, 1);
        assert!(!tx.is_closed());
    }
}
