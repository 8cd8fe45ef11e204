//! Timer controller: one client's countdown, kept in step with its session

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time::{interval_at, Instant, Interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use super::{
    alert::{CompletionAlert, ToneAlert},
    channel::SyncChannel,
    state::{RemoteEffect, TimerSnapshot, TimerState},
};
use crate::protocol::{MessageType, TimerMessage};

const TICK_PERIOD: Duration = Duration::from_secs(1);

pub type TickCallback = Box<dyn FnMut(u32) + Send>;
pub type CompleteCallback = Box<dyn FnMut() + Send>;

/// Construction parameters for a `TimerController`
pub struct TimerOptions {
    pub initial_duration: u32,
    pub exercise_name: String,
    pub session_id: String,
    on_tick: Option<TickCallback>,
    on_complete: Option<CompleteCallback>,
    alert: Option<Box<dyn CompletionAlert>>,
}

impl TimerOptions {
    /// Options with the default completion tone and no callbacks
    pub fn new(initial_duration: u32, exercise_name: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            initial_duration,
            exercise_name: exercise_name.into(),
            session_id: session_id.into(),
            on_tick: None,
            on_complete: None,
            alert: Some(Box::new(ToneAlert::default())),
        }
    }

    /// Called with the new remaining seconds after every local tick
    pub fn on_tick<F>(mut self, callback: F) -> Self
    where
        F: FnMut(u32) + Send + 'static,
    {
        self.on_tick = Some(Box::new(callback));
        self
    }

    /// Called once each time the countdown completes
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Replace the completion tone
    pub fn alert<A>(mut self, alert: A) -> Self
    where
        A: CompletionAlert + 'static,
    {
        self.alert = Some(Box::new(alert));
        self
    }

    /// Complete without any audible alert
    pub fn silent(mut self) -> Self {
        self.alert = None;
        self
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.session_id.is_empty(), "session id must not be empty");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Start,
    Pause,
    Reset,
    Skip,
}

enum Command {
    Action(Action, oneshot::Sender<TimerSnapshot>),
    Shutdown,
}

/// Handle to a running countdown.
///
/// The countdown itself runs on a spawned task that owns the timer state and
/// the sync channel; this handle only sends it commands and reads the
/// published snapshot.
pub struct TimerController {
    session_id: String,
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<TimerSnapshot>,
    connected: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl TimerController {
    /// Start a controller and connect it to the relay at `url`.
    ///
    /// Returns immediately; the connection is made in the background and the
    /// countdown works locally until it is up. If the relay cannot be reached
    /// the controller keeps counting down on local state only. Must be called
    /// from within a tokio runtime.
    pub fn connect(options: TimerOptions, url: &str) -> anyhow::Result<Self> {
        options.validate()?;
        Self::with_channel(options, SyncChannel::open(url))
    }

    /// Start a controller over an already established channel
    pub fn with_channel(options: TimerOptions, channel: SyncChannel) -> anyhow::Result<Self> {
        options.validate()?;

        let state = TimerState::new(options.initial_duration);
        let (snapshot_tx, snapshot_rx) = watch::channel(state.snapshot());
        let (commands, command_rx) = mpsc::unbounded_channel();
        let session_id = options.session_id.clone();
        let connected = channel.connected_flag();

        info!(
            "Timer controller for session {} ({}, {}s) started",
            session_id, options.exercise_name, options.initial_duration
        );

        let countdown = Countdown {
            state,
            session_id: options.session_id,
            exercise_name: options.exercise_name,
            on_tick: options.on_tick,
            on_complete: options.on_complete,
            alert: options.alert,
            channel,
            snapshot_tx,
        };
        let task = tokio::spawn(countdown.run(command_rx));

        Ok(Self {
            session_id,
            commands,
            snapshot: snapshot_rx,
            connected,
            task: Some(task),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Whether the relay connection is currently up
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Start counting down and tell the session
    pub async fn start(&self) -> TimerSnapshot {
        self.act(Action::Start).await
    }

    /// Stop counting down, keeping the remaining time, and tell the session
    pub async fn pause(&self) -> TimerSnapshot {
        self.act(Action::Pause).await
    }

    /// Restore the initial duration and tell the session
    pub async fn reset(&self) -> TimerSnapshot {
        self.act(Action::Reset).await
    }

    /// Jump straight to completion. Local only: the session is not told.
    pub async fn skip(&self) -> TimerSnapshot {
        self.act(Action::Skip).await
    }

    /// Latest published state
    pub fn snapshot(&self) -> TimerSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Watch the published state
    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.snapshot.clone()
    }

    /// Stop the countdown and close the channel.
    ///
    /// Once this returns no callback will fire again. Calling it again is a
    /// no-op.
    pub async fn teardown(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        let _ = self.commands.send(Command::Shutdown);
        if let Err(e) = task.await {
            warn!("Timer controller task ended abnormally: {}", e);
        }
        info!("Timer controller for session {} torn down", self.session_id);
    }

    async fn act(&self, action: Action) -> TimerSnapshot {
        let (reply, response) = oneshot::channel();
        if self.commands.send(Command::Action(action, reply)).is_err() {
            debug!("Ignoring {:?}: controller already torn down", action);
            return self.snapshot();
        }
        response.await.unwrap_or_else(|_| self.snapshot())
    }
}

impl Drop for TimerController {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// State owned by the controller task
struct Countdown {
    state: TimerState,
    session_id: String,
    exercise_name: String,
    on_tick: Option<TickCallback>,
    on_complete: Option<CompleteCallback>,
    alert: Option<Box<dyn CompletionAlert>>,
    channel: SyncChannel,
    snapshot_tx: watch::Sender<TimerSnapshot>,
}

fn ticker() -> Interval {
    let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

impl Countdown {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        // One interval per controller; it is only polled while ticking and is
        // re-phased whenever the countdown (re)starts or adopts a remote value.
        let mut ticker = ticker();
        let mut channel_open = true;

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Action(action, reply)) => {
                        self.handle_action(action, &mut ticker);
                        let _ = reply.send(self.state.snapshot());
                    }
                    Some(Command::Shutdown) | None => break,
                },
                frame = self.channel.recv(), if channel_open => match frame {
                    Some(text) => self.handle_frame(&text, &mut ticker),
                    None => {
                        channel_open = false;
                        warn!("Timer sync channel closed, continuing locally");
                    }
                },
                _ = ticker.tick(), if self.state.is_ticking() => self.handle_tick(),
            }
        }

        self.channel.close().await;
        debug!("Countdown for session {} stopped", self.session_id);
    }

    fn handle_action(&mut self, action: Action, ticker: &mut Interval) {
        debug!("Local {:?} for session {}", action, self.session_id);
        match action {
            Action::Start => {
                let was_running = self.state.is_running();
                if !self.state.start() {
                    debug!("Start ignored: timer already completed");
                    return;
                }
                if !was_running {
                    ticker.reset();
                }
                self.broadcast(TimerMessage::control(
                    MessageType::TimerStart,
                    &self.session_id,
                    &self.exercise_name,
                ));
                if self.state.is_due() {
                    self.finish();
                }
            }
            Action::Pause => {
                self.state.pause();
                self.broadcast(TimerMessage::control(
                    MessageType::TimerPause,
                    &self.session_id,
                    &self.exercise_name,
                ));
            }
            Action::Reset => {
                self.state.reset();
                self.broadcast(TimerMessage::control(
                    MessageType::TimerReset,
                    &self.session_id,
                    &self.exercise_name,
                ));
            }
            Action::Skip => self.finish(),
        }
        self.publish();
    }

    fn handle_tick(&mut self) {
        let Some(remaining) = self.state.tick() else {
            return;
        };

        if self.channel.is_open() {
            self.broadcast(TimerMessage::update(&self.session_id, remaining, &self.exercise_name));
        }
        if let Some(on_tick) = self.on_tick.as_mut() {
            on_tick(remaining);
        }
        if remaining == 0 {
            self.finish();
        }
        self.publish();
    }

    fn handle_frame(&mut self, text: &str, ticker: &mut Interval) {
        let message = match TimerMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Discarding malformed timer message: {}", e);
                return;
            }
        };
        if !message.is_for(&self.session_id) {
            debug!("Ignoring {} for another session", message.kind.as_str());
            return;
        }

        let was_running = self.state.is_running();
        match self.state.apply_remote(&message) {
            RemoteEffect::Ignored => {
                debug!("Remote {} had no effect", message.kind.as_str());
                return;
            }
            RemoteEffect::Started => {
                if !was_running {
                    ticker.reset();
                }
                if self.state.is_due() {
                    self.finish();
                }
            }
            RemoteEffect::Paused | RemoteEffect::Reset => {}
            RemoteEffect::Adopted(remaining) => {
                ticker.reset();
                if remaining == 0 {
                    self.finish();
                }
            }
        }
        debug!("Applied remote {} for session {}", message.kind.as_str(), self.session_id);
        self.publish();
    }

    /// Mark completed; the alert and callback fire only on the transition
    fn finish(&mut self) {
        if !self.state.complete() {
            return;
        }
        info!("Timer for {} in session {} completed", self.exercise_name, self.session_id);

        if let Some(alert) = self.alert.as_mut() {
            if let Err(e) = alert.play() {
                debug!("Completion alert unavailable: {}", e);
            }
        }
        if let Some(on_complete) = self.on_complete.as_mut() {
            on_complete();
        }
    }

    fn broadcast(&self, message: TimerMessage) {
        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to encode {}: {}", message.kind.as_str(), e);
                return;
            }
        };
        if let Err(e) = self.channel.send(text) {
            debug!("Skipping {} broadcast: {}", message.kind.as_str(), e);
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.state.snapshot());
    }
}
