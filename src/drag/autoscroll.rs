//! Edge auto-scroll while a touch drag hovers near the top or bottom of the
//! viewport.
//!
//! The scroll timer is a tokio task. It is aborted on [`AutoScroller::stop`]
//! and when the scroller is dropped, so an interrupted gesture cannot leave a
//! timer behind.

use std::sync::atomic::{AtomicI8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::TouchConfig;

/// The page being scrolled.
pub trait PageScroll: Send + Sync {
    /// Scroll by `dy` pixels; negative is up.
    fn scroll_by(&self, dy: f64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    fn encode(self) -> i8 {
        match self {
            ScrollDirection::Up => -1,
            ScrollDirection::Down => 1,
        }
    }

    fn decode(raw: i8) -> Option<Self> {
        match raw {
            -1 => Some(ScrollDirection::Up),
            1 => Some(ScrollDirection::Down),
            _ => None,
        }
    }
}

pub struct AutoScroller {
    page: Arc<dyn PageScroll>,
    interval: Duration,
    step: f64,
    direction: Arc<AtomicI8>,
    timer: Option<JoinHandle<()>>,
    warned_no_runtime: bool,
}

impl AutoScroller {
    pub fn new(page: Arc<dyn PageScroll>, interval: Duration, step: f64) -> Self {
        Self {
            page,
            interval,
            step,
            direction: Arc::new(AtomicI8::new(0)),
            timer: None,
            warned_no_runtime: false,
        }
    }

    pub fn from_config(page: Arc<dyn PageScroll>, config: &TouchConfig) -> Self {
        Self::new(
            page,
            Duration::from_millis(config.auto_scroll_interval_ms),
            config.auto_scroll_step_px,
        )
    }

    /// Scroll towards `direction` every interval. Calling again while running
    /// only changes the direction.
    pub fn start(&mut self, direction: ScrollDirection) {
        self.direction.store(direction.encode(), Ordering::Relaxed);
        if self.timer.is_some() {
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            if !self.warned_no_runtime {
                tracing::warn!("no async runtime, auto-scroll direction tracked without a timer");
                self.warned_no_runtime = true;
            }
            return;
        };

        let page = Arc::clone(&self.page);
        let shared = Arc::clone(&self.direction);
        let interval = self.interval;
        let step = self.step;
        self.timer = Some(handle.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let sign = shared.load(Ordering::Relaxed);
                if sign == 0 {
                    break;
                }
                page.scroll_by(f64::from(sign) * step);
            }
        }));
        tracing::debug!(?direction, "auto-scroll started");
    }

    pub fn stop(&mut self) {
        self.direction.store(0, Ordering::Relaxed);
        if let Some(timer) = self.timer.take() {
            timer.abort();
            tracing::debug!("auto-scroll stopped");
        }
    }

    /// Current direction, `None` when stopped.
    pub fn direction(&self) -> Option<ScrollDirection> {
        ScrollDirection::decode(self.direction.load(Ordering::Relaxed))
    }

    pub fn is_active(&self) -> bool {
        self.direction().is_some()
    }

    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }
}

impl Drop for AutoScroller {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
