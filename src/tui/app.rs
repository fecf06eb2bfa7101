//! Main TUI application.

use std::io;
use std::time::Duration;

use crossterm::event::{DisableFocusChange, EnableFocusChange};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::watch;
use tracing::debug;

use crate::actions::SharedDashboard;
use crate::host::HostHandle;
use crate::poller::PollerState;

use super::event::{Event, EventHandler};
use super::input::{KeyAction, handle_key};
use super::render::{View, render};

/// How often the screen is redrawn when no terminal event arrives.
const REDRAW_RATE: Duration = Duration::from_millis(500);

/// Main TUI application.
///
/// Forwards terminal focus changes to the poller's host loop and renders the
/// dashboard. Data refreshes themselves happen on the async runtime.
pub struct App {
    server: String,
    tick: Duration,
    host: HostHandle,
    poller: watch::Receiver<PollerState>,
    dashboard: SharedDashboard,
    should_quit: bool,
}

impl App {
    pub fn new(
        server: String,
        tick: Duration,
        host: HostHandle,
        poller: watch::Receiver<PollerState>,
        dashboard: SharedDashboard,
    ) -> Self {
        Self {
            server,
            tick,
            host,
            poller,
            dashboard,
            should_quit: false,
        }
    }

    /// Runs the TUI application until the user quits, then stops the host.
    pub fn run(mut self) -> io::Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let events = EventHandler::new(REDRAW_RATE);

        // Main loop
        let result = loop {
            let poller = self.poller.borrow().clone();
            let dashboard = self.dashboard.snapshot();
            let view = View {
                server: &self.server,
                poller: &poller,
                dashboard: &dashboard,
                tick: self.tick,
            };
            if let Err(e) = terminal.draw(|frame| render(frame, &view)) {
                break Err(e);
            }

            match events.next() {
                Ok(event) => self.handle_event(event),
                Err(_) => self.should_quit = true,
            }

            if self.should_quit {
                break Ok(());
            }
        };

        self.host.shutdown();

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableFocusChange
        )?;
        terminal.show_cursor()?;

        result
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Redraw | Event::Resize => {}
            Event::Key(key) => {
                if handle_key(key) == KeyAction::Quit {
                    self.should_quit = true;
                }
            }
            Event::FocusGained => {
                debug!("terminal focus gained");
                if !self.host.focus_gained() {
                    self.should_quit = true;
                }
            }
            Event::FocusLost => {
                debug!("terminal focus lost");
                if !self.host.focus_lost() {
                    self.should_quit = true;
                }
            }
        }
    }
}
