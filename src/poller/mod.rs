//! Adaptive multi-rate poller.
//!
//! A single heartbeat drives three refresh streams. While the window is
//! focused every stream refreshes on every tick; in the background each
//! stream waits for its own tick threshold. See [`PollerState`] for the
//! transition rules.

mod state;

pub use state::{PollerEvent, PollerState, Stream, StreamId, TICK_PERIOD};

use tracing::{debug, warn};

/// Error reported by a refresh action that failed before handing off its work.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionError {
    /// Refresh URL could not be built.
    Url(String),
    /// No async runtime is available to run the refresh on.
    Runtime(String),
    /// Any other failure.
    Failed(String),
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionError::Url(msg) => write!(f, "URL error: {}", msg),
            ActionError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
            ActionError::Failed(msg) => write!(f, "Refresh failed: {}", msg),
        }
    }
}

impl std::error::Error for ActionError {}

/// Side effect bound to one stream.
///
/// Implementations are fire-and-forget: they start the refresh and return.
/// An `Err` means the refresh could not even be started.
pub trait RefreshAction: Send {
    fn refresh(&mut self) -> Result<(), ActionError>;
}

impl<F> RefreshAction for F
where
    F: FnMut() -> Result<(), ActionError> + Send,
{
    fn refresh(&mut self) -> Result<(), ActionError> {
        self()
    }
}

/// Poller state plus the three stream actions.
pub struct Poller {
    state: PollerState,
    actions: [Box<dyn RefreshAction>; 3],
}

impl Poller {
    /// Creates an unfocused poller. Actions are given in stream order.
    pub fn new(
        stats: Box<dyn RefreshAction>,
        hits_histogram: Box<dyn RefreshAction>,
        days_histogram: Box<dyn RefreshAction>,
    ) -> Self {
        Self {
            state: PollerState::new(),
            actions: [stats, hits_histogram, days_histogram],
        }
    }

    pub fn state(&self) -> &PollerState {
        &self.state
    }

    pub fn is_focused(&self) -> bool {
        self.state.is_focused()
    }

    /// Populates every stream once at startup.
    pub fn on_init(&mut self) -> Vec<StreamId> {
        self.handle(PollerEvent::Init)
    }

    /// One heartbeat.
    pub fn on_tick(&mut self) -> Vec<StreamId> {
        self.handle(PollerEvent::Tick)
    }

    /// Switches to the fast cadence and refreshes everything immediately.
    pub fn on_focus_gain(&mut self) -> Vec<StreamId> {
        self.handle(PollerEvent::FocusGain)
    }

    /// Switches to the slow cadence, restarting every stream's count.
    pub fn on_focus_loss(&mut self) -> Vec<StreamId> {
        self.handle(PollerEvent::FocusLoss)
    }

    /// Applies `event` and runs the action of every stream that fires.
    ///
    /// Each action runs independently: a failing action is logged and the
    /// remaining streams of the same event still refresh.
    pub fn handle(&mut self, event: PollerEvent) -> Vec<StreamId> {
        let fired = self.state.apply(event);
        for &id in &fired {
            let action = &mut self.actions[id.index()];
            match action.refresh() {
                Ok(()) => debug!(stream = %id, ?event, "stream fired"),
                Err(e) => warn!(stream = %id, ?event, error = %e, "refresh action failed"),
            }
        }
        fired
    }
}
