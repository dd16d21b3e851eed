use std::time::Duration;

use {
    fez_channels::{Action, ConnectionState, HandlerTable, Session, ShutdownReason, Signal, Transport},
    fez_feed::{Event, EventStream},
    fez_rules::{Candidate, Decision, RuleSet},
    futures::StreamExt,
    tokio::time::Instant,
    tracing::{debug, info, warn},
};

use crate::{
    format::{MAX_MESSAGE_BYTES, format_event},
    staleness::{DEFAULT_STALE_AFTER_SECS, Freshness, StalenessGuard},
};

/// Source of "now" for the staleness check.
pub trait Clock: Send {
    fn now_unix(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaySettings {
    pub stale_after_secs: i64,
    /// Longest wait for a feed item before servicing the transport again.
    pub idle_poll: Duration,
    /// Longest wait between connecting and joining the channel.
    pub registration_timeout: Duration,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            stale_after_secs: DEFAULT_STALE_AFTER_SECS,
            idle_poll: Duration::from_secs(1),
            registration_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Initializing,
    AwaitingConnection,
    Streaming,
    ShuttingDown,
}

/// Why the relay stopped. Every reason is a failure from the supervisor's
/// point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    Shutdown(ShutdownReason),
    RegistrationTimeout { after: Duration },
    Transport { message: String },
    FeedFailed { message: String },
    FeedEnded,
}

impl ExitReason {
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        1
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shutdown(reason) => write!(f, "{reason}"),
            Self::RegistrationTimeout { after } => {
                write!(f, "not joined after {}s", after.as_secs())
            },
            Self::Transport { message } => write!(f, "transport failed: {message}"),
            Self::FeedFailed { message } => write!(f, "feed failed: {message}"),
            Self::FeedEnded => write!(f, "feed ended"),
        }
    }
}

impl From<fez_channels::Error> for ExitReason {
    fn from(e: fez_channels::Error) -> Self {
        Self::Transport {
            message: e.to_string(),
        }
    }
}

/// Per-run counters, logged on exit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    pub received: u64,
    pub skipped: u64,
    pub stale: u64,
    pub suppressed: u64,
    pub oversized: u64,
    pub forwarded: u64,
}

/// Pulls events from the feed and relays the ones the rules forward, while
/// keeping the transport session serviced.
pub struct Relay<T> {
    transport: T,
    feed: EventStream,
    rules: RuleSet,
    session: Session,
    handlers: HandlerTable,
    guard: StalenessGuard,
    settings: RelaySettings,
    clock: Box<dyn Clock>,
    state: RelayState,
    stats: RelayStats,
}

impl<T: Transport> Relay<T> {
    pub fn new(
        transport: T,
        feed: EventStream,
        rules: RuleSet,
        session: Session,
        handlers: HandlerTable,
        settings: RelaySettings,
    ) -> Self {
        Self {
            transport,
            feed,
            rules,
            session,
            handlers,
            guard: StalenessGuard::new(settings.stale_after_secs),
            settings,
            clock: Box::new(SystemClock),
            state: RelayState::Initializing,
            stats: RelayStats::default(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn stats(&self) -> RelayStats {
        self.stats
    }

    /// Run until the session ends. Never returns success.
    pub async fn run(&mut self) -> ExitReason {
        self.enter(RelayState::AwaitingConnection);
        let exit = match self.await_connection().await {
            Ok(()) => {
                self.enter(RelayState::Streaming);
                self.stream().await
            },
            Err(exit) => exit,
        };
        self.enter(RelayState::ShuttingDown);
        self.shut_down(&exit).await;
        let RelayStats {
            received,
            skipped,
            stale,
            suppressed,
            oversized,
            forwarded,
        } = self.stats;
        info!(
            reason = %exit,
            received,
            skipped,
            stale,
            suppressed,
            oversized,
            forwarded,
            "relay stopped"
        );
        exit
    }

    fn enter(&mut self, state: RelayState) {
        debug!(from = ?self.state, to = ?state, "relay state");
        self.state = state;
    }

    fn pending_exit(&self) -> Option<ExitReason> {
        self.session
            .shutdown_reason()
            .map(|reason| ExitReason::Shutdown(reason.clone()))
    }

    /// Service only the transport until the channel is joined.
    async fn await_connection(&mut self) -> Result<(), ExitReason> {
        self.session.set_state(ConnectionState::Authenticating);
        let deadline = Instant::now() + self.settings.registration_timeout;
        loop {
            if let Some(exit) = self.pending_exit() {
                return Err(exit);
            }
            if self.session.is_joined() {
                return Ok(());
            }
            let signal = tokio::time::timeout_at(deadline, self.transport.recv())
                .await
                .map_err(|_| ExitReason::RegistrationTimeout {
                    after: self.settings.registration_timeout,
                })??;
            self.dispatch(signal).await?;
        }
    }

    async fn stream(&mut self) -> ExitReason {
        loop {
            if let Err(exit) = self.step().await {
                return exit;
            }
        }
    }

    /// One iteration: drain buffered signals, then wait briefly for one
    /// feed item.
    async fn step(&mut self) -> Result<(), ExitReason> {
        while let Some(signal) = self.transport.try_recv()? {
            self.dispatch(signal).await?;
        }
        if let Some(exit) = self.pending_exit() {
            return Err(exit);
        }

        let next = match tokio::time::timeout(self.settings.idle_poll, self.feed.next()).await {
            Ok(next) => next,
            Err(_) => return Ok(()),
        };
        match next {
            None => Err(ExitReason::FeedEnded),
            Some(Err(e)) if e.is_fatal() => Err(ExitReason::FeedFailed {
                message: e.to_string(),
            }),
            Some(Err(e)) => {
                self.stats.skipped += 1;
                warn!(error = %e, "skipping feed record");
                Ok(())
            },
            Some(Ok(event)) => self.relay_event(&event).await,
        }
    }

    async fn relay_event(&mut self, event: &Event) -> Result<(), ExitReason> {
        self.stats.received += 1;

        let now = self.clock.now_unix();
        if self.guard.check(event.timestamp_unix, now) == Freshness::Stale {
            self.stats.stale += 1;
            debug!(
                title = %event.title,
                age_secs = now.saturating_sub(event.timestamp_unix),
                threshold_secs = self.guard.threshold_secs(),
                "stale event dropped"
            );
            return Ok(());
        }

        let verdict = self.rules.evaluate(Candidate {
            actor: &event.actor,
            title: &event.title,
            summary: &event.summary_text,
        });
        debug!(
            title = %event.title,
            actor = %event.actor,
            reason = %verdict.reason,
            decision = ?verdict.decision,
            "classified"
        );
        if verdict.decision == Decision::Suppress {
            self.stats.suppressed += 1;
            return Ok(());
        }

        let text = format_event(event);
        if text.len() >= MAX_MESSAGE_BYTES {
            self.stats.oversized += 1;
            warn!(
                title = %event.title,
                actor = %event.actor,
                len = text.len(),
                "formatted message too long, dropped"
            );
            return Ok(());
        }

        self.transport
            .send(self.session.target_channel(), &text)
            .await?;
        self.stats.forwarded += 1;
        Ok(())
    }

    async fn dispatch(&mut self, signal: Signal) -> Result<(), ExitReason> {
        debug!(kind = ?signal.kind(), "signal");
        let actions = self.handlers.dispatch(&mut self.session, &signal);
        for action in actions {
            self.transport.execute(&action).await?;
            if let Action::Disconnect { reason } = action {
                if !self.session.is_shutting_down() {
                    self.session
                        .request_shutdown(ShutdownReason::Disconnected { reason });
                }
                self.session.set_state(ConnectionState::Disconnected);
            }
        }
        Ok(())
    }

    async fn shut_down(&mut self, exit: &ExitReason) {
        if self.session.state() != ConnectionState::Disconnected {
            if let Err(e) = self.transport.disconnect(&exit.to_string()).await {
                warn!(error = %e, "disconnect failed");
            }
        }
        self.session.request_shutdown(match exit {
            ExitReason::Shutdown(reason) => reason.clone(),
            other => ShutdownReason::Disconnected {
                reason: other.to_string(),
            },
        });
        self.session.set_state(ConnectionState::Disconnected);
    }
}
