//! Scheduling state for the adaptive poller.
//!
//! Pure state transitions: every event is applied to an owned [`PollerState`]
//! and yields the list of streams that fire as a result. No side effects
//! happen here; [`super::Poller`] invokes the refresh actions.

use std::time::Duration;

/// Period of the shared heartbeat.
pub const TICK_PERIOD: Duration = Duration::from_secs(6);

/// Identity of one of the three refresh streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamId {
    /// Numeric stats panel (`/stats`).
    Stats,
    /// Hit-count histogram image.
    HitsHistogram,
    /// Entry-age histogram image.
    DaysHistogram,
}

impl StreamId {
    /// All streams, in evaluation order.
    pub fn all() -> &'static [StreamId] {
        &[
            StreamId::Stats,
            StreamId::HitsHistogram,
            StreamId::DaysHistogram,
        ]
    }

    /// Ticks required to fire while unfocused.
    ///
    /// With the 6 s tick: ~1 min for stats, ~10 min for hits, ~2 h for days.
    pub fn slow_threshold(self) -> u32 {
        match self {
            StreamId::Stats => 10,
            StreamId::HitsHistogram => 100,
            StreamId::DaysHistogram => 1200,
        }
    }

    /// Short display name.
    pub fn name(self) -> &'static str {
        match self {
            StreamId::Stats => "stats",
            StreamId::HitsHistogram => "hits-histogram",
            StreamId::DaysHistogram => "days-histogram",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            StreamId::Stats => 0,
            StreamId::HitsHistogram => 1,
            StreamId::DaysHistogram => 2,
        }
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-stream tick counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    pub id: StreamId,
    pub slow_threshold: u32,
    /// Ticks elapsed since the last firing.
    pub counter: u32,
    /// Total number of firings since construction.
    pub fires: u64,
}

impl Stream {
    fn new(id: StreamId) -> Self {
        Self {
            id,
            slow_threshold: id.slow_threshold(),
            counter: 0,
            fires: 0,
        }
    }

    fn fire(&mut self) {
        self.counter = 0;
        self.fires += 1;
    }
}

/// Events that drive the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerEvent {
    /// Startup ("document ready").
    Init,
    /// One heartbeat.
    Tick,
    /// Window gained input focus.
    FocusGain,
    /// Window lost input focus.
    FocusLoss,
}

/// Focus flag plus the three stream counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerState {
    focused: bool,
    streams: [Stream; 3],
}

impl Default for PollerState {
    fn default() -> Self {
        Self::new()
    }
}

impl PollerState {
    /// Unfocused, all counters at zero.
    pub fn new() -> Self {
        Self {
            focused: false,
            streams: [
                Stream::new(StreamId::Stats),
                Stream::new(StreamId::HitsHistogram),
                Stream::new(StreamId::DaysHistogram),
            ],
        }
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    pub fn stream(&self, id: StreamId) -> &Stream {
        &self.streams[id.index()]
    }

    /// Applies one event and returns the streams that fire, in stream order.
    pub fn apply(&mut self, event: PollerEvent) -> Vec<StreamId> {
        match event {
            PollerEvent::Init => self.fire_all(),
            PollerEvent::Tick => self.tick(),
            PollerEvent::FocusGain => {
                self.focused = true;
                self.fire_all()
            }
            PollerEvent::FocusLoss => {
                self.focused = false;
                for stream in &mut self.streams {
                    stream.counter = 0;
                }
                Vec::new()
            }
        }
    }

    fn tick(&mut self) -> Vec<StreamId> {
        let focused = self.focused;
        let mut fired = Vec::with_capacity(self.streams.len());
        for stream in &mut self.streams {
            stream.counter += 1;
            if focused || stream.counter >= stream.slow_threshold {
                stream.fire();
                fired.push(stream.id);
            }
        }
        fired
    }

    fn fire_all(&mut self) -> Vec<StreamId> {
        for stream in &mut self.streams {
            stream.fire();
        }
        StreamId::all().to_vec()
    }
}
