//! Refresh actions bound to the poller's streams, and the display model
//! they update.
//!
//! Actions only start work: the HTTP request runs on the tokio runtime and
//! writes its result into the shared [`Dashboard`] when it completes.
//! Overlapping requests for the same stream are allowed.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::{DateTime, Local};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::client::{CacheBuster, ClientError, DashboardClient};
use crate::poller::{ActionError, Poller, RefreshAction};
use crate::stats::{StatsPanel, StatsResponse};

/// The two server-rendered histograms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Histogram {
    /// Number of entries per hit count.
    Hits,
    /// Number of entries per age in days.
    Days,
}

impl Histogram {
    pub fn path(self) -> &'static str {
        match self {
            Histogram::Hits => "image/hits_histogram.svg",
            Histogram::Days => "image/days_histogram.svg",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Histogram::Hits => "Hits histogram",
            Histogram::Days => "Age histogram",
        }
    }
}

/// Current source of one histogram image and the outcome of loading it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageSlot {
    /// Cache-busted URL the image is currently pointed at.
    pub src: Option<String>,
    /// Size of the last successful download of `src`.
    pub bytes: Option<usize>,
    pub loaded_at: Option<DateTime<Local>>,
    pub error: Option<String>,
    /// Number of times the source was rewritten.
    pub refreshes: u64,
}

/// Everything the dashboard displays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dashboard {
    pub stats: StatsPanel,
    /// Error of the most recent stats refresh; stale values stay displayed.
    pub stats_error: Option<String>,
    pub hits: ImageSlot,
    pub days: ImageSlot,
}

impl Dashboard {
    pub fn slot(&self, histogram: Histogram) -> &ImageSlot {
        match histogram {
            Histogram::Hits => &self.hits,
            Histogram::Days => &self.days,
        }
    }

    pub fn slot_mut(&mut self, histogram: Histogram) -> &mut ImageSlot {
        match histogram {
            Histogram::Hits => &mut self.hits,
            Histogram::Days => &mut self.days,
        }
    }

    pub fn apply_stats(&mut self, stats: &StatsResponse) {
        self.stats = StatsPanel::from_response(stats, Local::now());
        self.stats_error = None;
    }

    pub fn apply_stats_error(&mut self, error: &ClientError) {
        self.stats_error = Some(error.to_string());
    }

    /// Records the download result for `src`. Results for a source that has
    /// since been replaced are dropped.
    pub fn apply_image(
        &mut self,
        histogram: Histogram,
        src: &str,
        result: Result<usize, ClientError>,
    ) -> bool {
        let slot = self.slot_mut(histogram);
        if slot.src.as_deref() != Some(src) {
            return false;
        }
        match result {
            Ok(bytes) => {
                slot.bytes = Some(bytes);
                slot.loaded_at = Some(Local::now());
                slot.error = None;
            }
            Err(e) => slot.error = Some(e.to_string()),
        }
        true
    }
}

/// [`Dashboard`] shared between the refresh tasks and the renderer.
#[derive(Debug, Clone, Default)]
pub struct SharedDashboard(Arc<Mutex<Dashboard>>);

impl SharedDashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the dashboard. A panic in another holder does not poison it:
    /// every update leaves the model consistent.
    pub fn lock(&self) -> MutexGuard<'_, Dashboard> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> Dashboard {
        self.lock().clone()
    }
}

fn runtime() -> Result<Handle, ActionError> {
    Handle::try_current().map_err(|e| ActionError::Runtime(e.to_string()))
}

impl From<ClientError> for ActionError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Url(msg) => ActionError::Url(msg),
            other => ActionError::Failed(other.to_string()),
        }
    }
}

/// Stats stream: fetches `/stats` and updates the numeric panel.
pub struct MetricsFetcher {
    client: Arc<DashboardClient>,
    buster: Arc<CacheBuster>,
    dashboard: SharedDashboard,
}

impl MetricsFetcher {
    pub fn new(
        client: Arc<DashboardClient>,
        buster: Arc<CacheBuster>,
        dashboard: SharedDashboard,
    ) -> Self {
        Self {
            client,
            buster,
            dashboard,
        }
    }
}

impl RefreshAction for MetricsFetcher {
    fn refresh(&mut self) -> Result<(), ActionError> {
        let url = self.client.endpoint("stats", self.buster.next())?;
        let runtime = runtime()?;
        let client = self.client.clone();
        let dashboard = self.dashboard.clone();

        runtime.spawn(async move {
            let t0 = Instant::now();
            let result = client.fetch_stats(url).await;
            let elapsed_ms = t0.elapsed().as_millis() as u64;
            let mut dashboard = dashboard.lock();
            match result {
                Ok(stats) => {
                    dashboard.apply_stats(&stats);
                    info!(
                        duration_ms = elapsed_ms,
                        hit_rate = %dashboard.stats.hit_rate,
                        cached = %dashboard.stats.cached_count,
                        uptime = %dashboard.stats.uptime,
                        "stats refreshed"
                    );
                }
                Err(e) => {
                    warn!(duration_ms = elapsed_ms, error = %e, "stats refresh failed");
                    dashboard.apply_stats_error(&e);
                }
            }
        });
        Ok(())
    }
}

/// Histogram streams: points the image at a fresh cache-busted URL and
/// downloads it.
pub struct ImageRefresher {
    histogram: Histogram,
    client: Arc<DashboardClient>,
    buster: Arc<CacheBuster>,
    dashboard: SharedDashboard,
}

impl ImageRefresher {
    pub fn new(
        histogram: Histogram,
        client: Arc<DashboardClient>,
        buster: Arc<CacheBuster>,
        dashboard: SharedDashboard,
    ) -> Self {
        Self {
            histogram,
            client,
            buster,
            dashboard,
        }
    }
}

impl RefreshAction for ImageRefresher {
    fn refresh(&mut self) -> Result<(), ActionError> {
        let url = self.client.endpoint(self.histogram.path(), self.buster.next())?;
        let runtime = runtime()?;
        let src = url.to_string();
        {
            let mut dashboard = self.dashboard.lock();
            let slot = dashboard.slot_mut(self.histogram);
            slot.src = Some(src.clone());
            slot.refreshes += 1;
        }

        let histogram = self.histogram;
        let client = self.client.clone();
        let dashboard = self.dashboard.clone();
        runtime.spawn(async move {
            let result = client.fetch_image(url).await;
            if let Err(ref e) = result {
                warn!(image = histogram.path(), error = %e, "image refresh failed");
            }
            let current = dashboard.lock().apply_image(histogram, &src, result);
            if !current {
                debug!(image = histogram.path(), "image superseded before load completed");
            }
        });
        Ok(())
    }
}

/// Wires the stats stream and both histogram streams to one server.
pub fn dashboard_poller(client: Arc<DashboardClient>, dashboard: SharedDashboard) -> Poller {
    let buster = Arc::new(CacheBuster::new());
    Poller::new(
        Box::new(MetricsFetcher::new(client.clone(), buster.clone(), dashboard.clone())),
        Box::new(ImageRefresher::new(
            Histogram::Hits,
            client.clone(),
            buster.clone(),
            dashboard.clone(),
        )),
        Box::new(ImageRefresher::new(Histogram::Days, client, buster, dashboard)),
    )
}
