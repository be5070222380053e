//! The plot supervisor: executes a `Plan` end to end over an
//! `EbbDriver`, reacting to pause/cancel requests from the control channel
//! and preserving the pen-up-on-exit invariant regardless of how the plot
//! ends.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, Mutex as AsyncMutex, Notify};
use tracing::{info, warn};

use crate::device::{Device, ToolingProfile};
use crate::ebb::EbbDriver;
use crate::events::Event;
use crate::motion::{Motion, PenMotion, Plan};

/// Reopens the serial transport after a `TransportError`. Boxed so the
/// supervisor stays generic over `T` without depending on a concrete
/// transport type (production code supplies one backed by
/// `ebb::reconnect_with_backoff`; tests can supply one backed by a fresh
/// `tokio::io::duplex` pair).
type Reconnector<T> = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = T> + Send>> + Send + Sync>;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("a plot is already in progress")]
    PlotInProgress,
}

/// Broadcast channel capacity for plot events; generous enough that a
/// slow subscriber falling a full plot behind only loses history, never
/// blocks the motion loop (the motion loop never awaits a `send`).
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Plotting,
    Paused,
    Cancelling,
}

pub struct PlotSupervisor<T> {
    driver: Arc<AsyncMutex<EbbDriver<T>>>,
    device: Device,
    tooling: ToolingProfile,
    events: broadcast::Sender<Event>,
    state: Arc<StdMutex<State>>,
    cancel_requested: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    resume_notify: Arc<Notify>,
    /// Snapshot of the last `dev`/`plan` events, replayed to a client as
    /// soon as it subscribes so a newly-connected UI doesn't have to wait
    /// for the next plot to learn device/plan state.
    last_firmware: Arc<StdMutex<Option<String>>>,
    last_plan: Arc<StdMutex<Option<Plan>>>,
    /// Current/total motion index of the plot in progress, for
    /// `/plot/status` — mirrors the last `Event::Progress` broadcast
    /// without requiring a caller to hold a subscription open.
    current_motion: Arc<AtomicUsize>,
    total_motions: Arc<AtomicUsize>,
    /// Set via `with_reconnect`; used to recycle the serial port after a
    /// `TransportError` mid-plot (spec §5 "Lifetime", §7 `TransportError`).
    reconnector: Option<Reconnector<T>>,
}

impl<T> Clone for PlotSupervisor<T> {
    fn clone(&self) -> Self {
        Self {
            driver: self.driver.clone(),
            device: self.device,
            tooling: self.tooling,
            events: self.events.clone(),
            state: self.state.clone(),
            cancel_requested: self.cancel_requested.clone(),
            paused: self.paused.clone(),
            resume_notify: self.resume_notify.clone(),
            last_firmware: self.last_firmware.clone(),
            last_plan: self.last_plan.clone(),
            current_motion: self.current_motion.clone(),
            total_motions: self.total_motions.clone(),
            reconnector: self.reconnector.clone(),
        }
    }
}

impl<T> PlotSupervisor<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(driver: EbbDriver<T>, device: Device, tooling: ToolingProfile) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            driver: Arc::new(AsyncMutex::new(driver)),
            device,
            tooling,
            events,
            state: Arc::new(StdMutex::new(State::Idle)),
            cancel_requested: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            resume_notify: Arc::new(Notify::new()),
            last_firmware: Arc::new(StdMutex::new(None)),
            last_plan: Arc::new(StdMutex::new(None)),
            current_motion: Arc::new(AtomicUsize::new(0)),
            total_motions: Arc::new(AtomicUsize::new(0)),
            reconnector: None,
        }
    }

    /// Install a transport-reopening closure, invoked after a
    /// `TransportError` observed mid-plot so the supervisor can keep
    /// accepting plans once the plotter is physically reconnected.
    pub fn with_reconnect<F, Fut>(mut self, reconnect: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        self.reconnector = Some(Arc::new(move || Box::pin(reconnect())));
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// `dev`/`plan` events to replay to a client that just subscribed,
    /// per the "on subscribe" events described alongside the broadcast
    /// stream.
    pub fn subscribe_snapshot(&self) -> (Option<Event>, Option<Event>) {
        let dev = self.last_firmware.lock().unwrap().clone().map(|firmware| Event::Dev { firmware });
        let plan = self.last_plan.lock().unwrap().clone().map(|plan| Event::Plan { plan });
        (dev, plan)
    }

    pub fn is_plotting(&self) -> bool {
        *self.state.lock().unwrap() != State::Idle
    }

    /// `(current_motion_index, total_motions)` of the plot in progress, or
    /// `None` while idle.
    pub fn progress(&self) -> Option<(usize, usize)> {
        if self.is_plotting() {
            Some((self.current_motion.load(Ordering::SeqCst), self.total_motions.load(Ordering::SeqCst)))
        } else {
            None
        }
    }

    /// Accept a plan and start executing it on a background task. Rejects
    /// with `PlotInProgress` unless the supervisor is currently `Idle`;
    /// otherwise returns immediately without waiting for the plot to
    /// finish.
    pub fn submit(&self, plan: Plan) -> Result<(), SupervisorError> {
        {
            let mut state = self.state.lock().unwrap();
            if *state != State::Idle {
                return Err(SupervisorError::PlotInProgress);
            }
            *state = State::Plotting;
        }
        self.cancel_requested.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);

        let supervisor = self.clone();
        tokio::spawn(async move { supervisor.run_plot(plan).await });
        Ok(())
    }

    /// Take effect only at the next pen-up boundary.
    pub fn request_pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// A no-op if the supervisor is not currently paused.
    pub fn request_resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.resume_notify.notify_one();
    }

    /// Cooperative: takes effect at the next motion boundary. A second
    /// cancel observed during post-cancel cleanup is a no-op, since the
    /// flag is cleared once the current plot finishes.
    pub fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
    }

    /// Disable motors immediately so the carriage can be moved by hand.
    /// Only meaningful while `Idle` — during a plot the motion loop owns
    /// the driver, so this is a no-op and the caller should cancel first.
    pub fn request_limp(&self) {
        if self.is_plotting() {
            warn!("ignoring limp request while a plot is in progress");
            return;
        }
        let driver = self.driver.clone();
        tokio::spawn(async move {
            if let Err(e) = driver.lock().await.disable_motors().await {
                warn!(error = %e, "limp request failed");
            }
        });
    }

    /// Cancel any in-progress plot, wait for it to unwind back to `Idle`,
    /// then disable motors directly. Used by the binary's shutdown path so
    /// the process never exits with motors energised or a plot half-run.
    pub async fn shutdown(&self) {
        self.request_cancel();
        while self.is_plotting() {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        if let Err(e) = self.driver.lock().await.disable_motors().await {
            warn!(error = %e, "failed to disable motors during shutdown");
        }
    }

    /// Move the pen servo directly to `height` at `rate`, bypassing the
    /// planner. Forbidden while `Plotting` to keep the protocol simple
    /// (the caller is expected to have already rejected the message; this
    /// is a defensive second check).
    pub fn request_set_pen_height(&self, height: i32, rate: i32) {
        if self.is_plotting() {
            warn!("ignoring setPenHeight request while a plot is in progress");
            return;
        }
        let driver = self.driver.clone();
        let device = self.device;
        tokio::spawn(async move {
            if let Err(e) = driver.lock().await.set_pen_height(height, rate, &device).await {
                warn!(error = %e, "setPenHeight request failed");
            }
        });
    }

    async fn run_plot(&self, plan: Plan) {
        let mut driver = self.driver.lock().await;

        if let Err(e) = self.pre_plot(&mut driver, &plan).await {
            warn!(error = %e, "pre-plot setup failed, aborting plot");
            self.recycle(&mut driver, e.is_transport()).await;
            self.finish(State::Idle);
            let _ = self.events.send(Event::Cancelled);
            return;
        }
        *self.last_plan.lock().unwrap() = Some(plan.clone());
        let _ = self.events.send(Event::Plan { plan: plan.clone() });

        let total = plan.len();
        self.total_motions.store(total, Ordering::SeqCst);
        let mut pen_is_up = true;
        let mut cancelled = false;
        let mut failed: Option<crate::ebb::EbbError> = None;

        for (idx, motion) in plan.motions().iter().enumerate() {
            self.current_motion.store(idx, Ordering::SeqCst);
            let _ = self.events.send(Event::Progress { motion_index: idx, total });

            let result = match motion {
                Motion::Xy(xy) => driver.execute_xy_motion(xy).await,
                Motion::Pen(pen) => {
                    let r = driver.move_pen(pen, &self.device).await;
                    if r.is_ok() {
                        pen_is_up = pen.is_raising();
                    }
                    r
                }
            };
            if let Err(e) = result {
                warn!(error = %e, motion = idx, "motion execution failed, cancelling plot");
                cancelled = true;
                failed = Some(e);
                break;
            }

            if self.cancel_requested.load(Ordering::SeqCst) {
                cancelled = true;
                break;
            }

            if pen_is_up && self.paused.load(Ordering::SeqCst) {
                self.set_state(State::Paused);
                let _ = self.events.send(Event::Pause { paused: true });
                self.resume_notify.notified().await;
                let _ = self.events.send(Event::Pause { paused: false });
                self.set_state(State::Plotting);
            }
        }

        if cancelled {
            self.set_state(State::Cancelling);
            if let Some(e) = &failed {
                self.recycle(&mut driver, e.is_transport()).await;
            }
            self.post_cancel(&mut driver, pen_is_up).await;
            self.post_plot(&mut driver).await;
            let _ = self.events.send(Event::Cancelled);
        } else {
            self.post_plot(&mut driver).await;
            let _ = self.events.send(Event::Finished);
        }

        self.cancel_requested.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        self.finish(State::Idle);
    }

    /// Recycle the serial port after any fatal `EbbError`, transport or
    /// protocol. Every fatal error clears the driver's cached firmware
    /// version/mode/sub-step accumulator, so the next `pre_plot`
    /// re-handshakes before trusting any capability gating or resuming
    /// sub-step accounting against stale state. Only a `TransportError`
    /// (`is_transport`) additionally reopens the physical transport via the
    /// reconnect-with-backoff closure installed by `with_reconnect` — a
    /// `ProtocolError` (malformed reply, rejection) means the port itself is
    /// still open, so reopening it would be wasted work.
    async fn recycle(&self, driver: &mut EbbDriver<T>, is_transport: bool) {
        if !is_transport {
            driver.reset_state();
            return;
        }
        let Some(reconnect) = &self.reconnector else {
            driver.reset_state();
            return;
        };
        warn!("transport error observed, recycling serial port");
        let transport = (reconnect)().await;
        *driver = EbbDriver::new(transport);
    }

    async fn pre_plot(&self, driver: &mut EbbDriver<T>, plan: &Plan) -> Result<(), crate::ebb::EbbError> {
        if driver.firmware_version().is_none() {
            let version = driver.handshake().await?;
            let firmware = format!("{}.{}.{}", version.major, version.minor, version.patch);
            *self.last_firmware.lock().unwrap() = Some(firmware.clone());
            let _ = self.events.send(Event::Dev { firmware });
        }
        driver.enable_motors(1).await?;
        if let Some(first_pen) = plan.pen_motions().next() {
            info!(initial_pos = first_pen.initial_pos, "seeking pen to first motion's starting height");
            let seek = PenMotion::new(first_pen.initial_pos, first_pen.initial_pos, 0.0);
            driver.move_pen(&seek, &self.device).await?;
        }
        Ok(())
    }

    /// Regardless of cancel or normal completion, bring the pen to its
    /// up-position and disable motors before returning to `Idle`.
    async fn post_cancel(&self, driver: &mut EbbDriver<T>, pen_is_up: bool) {
        if !pen_is_up {
            let raise = PenMotion::new(self.tooling.pen_down_pos, self.tooling.pen_up_pos, self.tooling.pen_lift_duration);
            if let Err(e) = driver.move_pen(&raise, &self.device).await {
                warn!(error = %e, "failed to raise pen during post-cancel");
            }
        }
        if let Err(e) = driver.home(4000).await {
            warn!(error = %e, "failed to home carriage during post-cancel");
        }
    }

    async fn post_plot(&self, driver: &mut EbbDriver<T>) {
        if let Err(e) = driver.wait_idle().await {
            warn!(error = %e, "wait_idle failed at end of plot");
        }
        if let Err(e) = driver.disable_motors().await {
            warn!(error = %e, "disable_motors failed at end of plot");
        }
    }

    fn set_state(&self, state: State) {
        *self.state.lock().unwrap() = state;
    }

    fn finish(&self, state: State) {
        self.set_state(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{AccelerationProfile, Hardware};
    use crate::motion::{Block, XYMotion};
    use crate::vec2::Vec2;
    use tokio::io::duplex;

    fn device() -> Device {
        Device::new(5, 21000, 34500, Hardware::V3)
    }

    fn tooling() -> ToolingProfile {
        let profile = AccelerationProfile { acceleration: 1000.0, max_velocity: 250.0, cornering_factor: 0.635 };
        ToolingProfile {
            pen_down_profile: profile,
            pen_up_profile: profile,
            pen_down_pos: 21000,
            pen_up_pos: 34500,
            pen_lift_duration: 0.2,
            pen_drop_duration: 0.2,
        }
    }

    /// Answers a handshake, one enable-motors, one pen seek, then OK to
    /// everything else until the stream closes.
    async fn mock_ebb_stream(mut peer: tokio::io::DuplexStream) {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
        let mut io = BufStream::new(&mut peer);
        loop {
            let mut line = String::new();
            if io.read_line(&mut line).await.unwrap_or(0) == 0 {
                break;
            }
            let reply = if line.starts_with('V') { "EBB Firmware Version 2.7.0\r\n" } else { "OK\r\n" };
            if io.write_all(reply.as_bytes()).await.is_err() {
                break;
            }
            let _ = io.flush().await;
        }
    }

    fn travel(p1: Vec2, p2: Vec2) -> Motion {
        Motion::Xy(XYMotion::new(vec![Block::new(0.0, 0.1, 0.0, p1, p2).unwrap()]).unwrap())
    }

    #[tokio::test]
    async fn rejects_concurrent_plot() {
        let (client, server) = duplex(4096);
        tokio::spawn(mock_ebb_stream(server));
        let driver = EbbDriver::new(client);
        let supervisor = PlotSupervisor::new(driver, device(), tooling());

        let plan = Plan::new(vec![
            travel(Vec2::ZERO, Vec2::new(100.0, 0.0)),
            Motion::Pen(PenMotion::new(34500, 21000, 0.2)),
            travel(Vec2::new(100.0, 0.0), Vec2::ZERO),
        ]);

        supervisor.submit(plan.clone()).unwrap();
        assert!(supervisor.is_plotting());
        assert!(supervisor.progress().is_some());
        assert!(matches!(supervisor.submit(plan), Err(SupervisorError::PlotInProgress)));
    }

    #[tokio::test]
    async fn progress_is_none_while_idle() {
        let (client, server) = duplex(4096);
        tokio::spawn(mock_ebb_stream(server));
        let driver = EbbDriver::new(client);
        let supervisor = PlotSupervisor::new(driver, device(), tooling());
        assert_eq!(supervisor.progress(), None);
    }

    #[tokio::test]
    async fn set_pen_height_is_a_noop_while_plotting() {
        let (client, server) = duplex(4096);
        tokio::spawn(mock_ebb_stream(server));
        let driver = EbbDriver::new(client);
        let supervisor = PlotSupervisor::new(driver, device(), tooling());

        let plan = Plan::new(vec![
            travel(Vec2::ZERO, Vec2::new(100.0, 0.0)),
            Motion::Pen(PenMotion::new(34500, 21000, 0.2)),
            travel(Vec2::new(100.0, 0.0), Vec2::ZERO),
        ]);
        supervisor.submit(plan).unwrap();
        assert!(supervisor.is_plotting());
        // Should log a warning and not touch the driver; nothing to
        // assert on directly beyond "it doesn't panic or deadlock".
        supervisor.request_set_pen_height(30000, 12);
    }

    #[tokio::test]
    async fn shutdown_cancels_an_in_progress_plot_and_returns_to_idle() {
        let (client, server) = duplex(4096);
        tokio::spawn(mock_ebb_stream(server));
        let driver = EbbDriver::new(client);
        let supervisor = PlotSupervisor::new(driver, device(), tooling());

        let plan = Plan::new(vec![
            travel(Vec2::ZERO, Vec2::new(100.0, 0.0)),
            Motion::Pen(PenMotion::new(34500, 21000, 0.2)),
            travel(Vec2::new(100.0, 0.0), Vec2::ZERO),
        ]);
        supervisor.submit(plan).unwrap();
        assert!(supervisor.is_plotting());

        tokio::time::timeout(std::time::Duration::from_secs(2), supervisor.shutdown())
            .await
            .expect("shutdown should not hang");
        assert!(!supervisor.is_plotting());
    }

    #[tokio::test]
    async fn shutdown_while_idle_still_disables_motors() {
        let (client, server) = duplex(4096);
        tokio::spawn(mock_ebb_stream(server));
        let driver = EbbDriver::new(client);
        let supervisor = PlotSupervisor::new(driver, device(), tooling());
        tokio::time::timeout(std::time::Duration::from_secs(2), supervisor.shutdown())
            .await
            .expect("shutdown should not hang");
    }

    #[tokio::test]
    async fn returns_to_idle_on_completion() {
        let (client, server) = duplex(4096);
        tokio::spawn(mock_ebb_stream(server));
        let driver = EbbDriver::new(client);
        let supervisor = PlotSupervisor::new(driver, device(), tooling());

        let plan = Plan::new(vec![travel(Vec2::ZERO, Vec2::ZERO)]);
        let mut events = supervisor.subscribe();
        supervisor.submit(plan).unwrap();

        let mut saw_finished = false;
        for _ in 0..10 {
            match tokio::time::timeout(std::time::Duration::from_secs(1), events.recv()).await {
                Ok(Ok(Event::Finished)) => {
                    saw_finished = true;
                    break;
                }
                Ok(Ok(_)) => continue,
                _ => break,
            }
        }
        assert!(saw_finished);
        assert!(!supervisor.is_plotting());
    }

    /// Answers a handshake and one enable-motors `OK`, then drops the
    /// connection — simulating a mid-plot USB disconnect.
    async fn flaky_ebb_stream(mut peer: tokio::io::DuplexStream) {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
        let mut io = BufStream::new(&mut peer);
        for _ in 0..2 {
            let mut line = String::new();
            if io.read_line(&mut line).await.unwrap_or(0) == 0 {
                return;
            }
            let reply = if line.starts_with('V') { "EBB Firmware Version 2.7.0\r\n" } else { "OK\r\n" };
            if io.write_all(reply.as_bytes()).await.is_err() {
                return;
            }
            let _ = io.flush().await;
        }
        // Drop `peer` here, closing the connection the driver is reading from.
    }

    #[tokio::test]
    async fn transport_error_mid_plot_triggers_reconnect_and_still_reaches_idle() {
        let (client, server) = duplex(4096);
        tokio::spawn(flaky_ebb_stream(server));
        let driver = EbbDriver::new(client);

        let reconnect_calls = Arc::new(AtomicUsize::new(0));
        let calls = reconnect_calls.clone();
        let supervisor = PlotSupervisor::new(driver, device(), tooling()).with_reconnect(move || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let (client, server) = duplex(4096);
                tokio::spawn(mock_ebb_stream(server));
                client
            }
        });

        let plan = Plan::new(vec![
            travel(Vec2::ZERO, Vec2::new(100.0, 0.0)),
            Motion::Pen(PenMotion::new(34500, 21000, 0.2)),
            travel(Vec2::new(100.0, 0.0), Vec2::ZERO),
        ]);
        let mut events = supervisor.subscribe();
        supervisor.submit(plan).unwrap();

        let mut saw_cancelled = false;
        for _ in 0..50 {
            match tokio::time::timeout(std::time::Duration::from_secs(1), events.recv()).await {
                Ok(Ok(Event::Cancelled)) => {
                    saw_cancelled = true;
                    break;
                }
                Ok(Ok(_)) => continue,
                _ => break,
            }
        }
        assert!(saw_cancelled, "expected the plot to end in Cancelled after the transport failure");
        assert!(!supervisor.is_plotting());
        assert_eq!(reconnect_calls.load(Ordering::SeqCst), 1);
    }

    /// Answers a handshake, enable-motors, and pen seek, then rejects the
    /// first `LM` it sees with `!` — simulating a malformed-command reply
    /// with the serial link itself still open.
    async fn protocol_rejecting_ebb_stream(mut peer: tokio::io::DuplexStream) {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
        let mut io = BufStream::new(&mut peer);
        loop {
            let mut line = String::new();
            if io.read_line(&mut line).await.unwrap_or(0) == 0 {
                break;
            }
            let reply = if line.starts_with('V') {
                "EBB Firmware Version 2.7.0\r\n"
            } else if line.starts_with("LM") {
                "!1 Err: malformed LM command\r\n"
            } else {
                "OK\r\n"
            };
            if io.write_all(reply.as_bytes()).await.is_err() {
                break;
            }
            let _ = io.flush().await;
        }
    }

    #[tokio::test]
    async fn protocol_error_mid_plot_resets_driver_state_without_reopening_transport() {
        let (client, server) = duplex(4096);
        tokio::spawn(protocol_rejecting_ebb_stream(server));
        let driver = EbbDriver::new(client);
        // No `with_reconnect` installed: a pure protocol error must still
        // recycle the driver's cached state on its own.
        let supervisor = PlotSupervisor::new(driver, device(), tooling());

        let plan = Plan::new(vec![
            travel(Vec2::ZERO, Vec2::new(100.0, 0.0)),
            Motion::Pen(PenMotion::new(34500, 21000, 0.2)),
            travel(Vec2::new(100.0, 0.0), Vec2::ZERO),
        ]);
        let mut events = supervisor.subscribe();
        supervisor.submit(plan).unwrap();

        let mut saw_cancelled = false;
        for _ in 0..50 {
            match tokio::time::timeout(std::time::Duration::from_secs(1), events.recv()).await {
                Ok(Ok(Event::Cancelled)) => {
                    saw_cancelled = true;
                    break;
                }
                Ok(Ok(_)) => continue,
                _ => break,
            }
        }
        assert!(saw_cancelled, "expected the plot to end in Cancelled after the protocol rejection");
        assert!(!supervisor.is_plotting());
        assert!(supervisor.driver.lock().await.firmware_version().is_none());
    }

    #[tokio::test]
    async fn cancel_requested_before_submit_is_cleared_on_completion() {
        let (client, server) = duplex(4096);
        tokio::spawn(mock_ebb_stream(server));
        let driver = EbbDriver::new(client);
        let supervisor = PlotSupervisor::new(driver, device(), tooling());
        supervisor.request_cancel();

        let plan = Plan::new(vec![travel(Vec2::ZERO, Vec2::ZERO)]);
        let mut events = supervisor.subscribe();
        supervisor.submit(plan).unwrap();

        for _ in 0..10 {
            match tokio::time::timeout(std::time::Duration::from_secs(1), events.recv()).await {
                Ok(Ok(Event::Cancelled)) | Ok(Ok(Event::Finished)) => break,
                Ok(Ok(_)) => continue,
                _ => break,
            }
        }
        assert!(!supervisor.is_plotting());
    }
}
