//! Auto-play Carousel
//!
//! Index state for a slide carousel with one auto-advance task. Manual
//! navigation while playing restarts the interval so a slide never flips
//! right after the user picked it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;

use crate::tasks::TaskHandle;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CarouselState {
    pub index: usize,
    pub playing: bool,
}

struct CarouselInner {
    len: usize,
    interval: Duration,
    state: watch::Sender<CarouselState>,
}

impl CarouselInner {
    fn step(&self, forward: bool) {
        if self.len == 0 {
            return;
        }
        self.state.send_modify(|state| {
            state.index = if forward {
                (state.index + 1) % self.len
            } else {
                (state.index + self.len - 1) % self.len
            };
        });
    }
}

async fn auto_advance(weak: Weak<CarouselInner>, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        let Some(inner) = weak.upgrade() else { return };
        inner.step(true);
    }
}

pub struct Carousel {
    inner: Arc<CarouselInner>,
    timer: Mutex<Option<TaskHandle>>,
}

impl Carousel {
    /// A paused carousel over `len` slides
    pub fn new(len: usize, interval: Duration) -> Self {
        let (state, _) = watch::channel(CarouselState::default());
        Self {
            inner: Arc::new(CarouselInner {
                len,
                interval,
                state,
            }),
            timer: Mutex::new(None),
        }
    }

    fn timer(&self) -> MutexGuard<'_, Option<TaskHandle>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn restart_timer(&self) {
        let handle = TaskHandle::spawn(auto_advance(
            Arc::downgrade(&self.inner),
            self.inner.interval,
        ));
        *self.timer() = Some(handle);
    }

    pub fn len(&self) -> usize {
        self.inner.len
    }

    pub fn is_empty(&self) -> bool {
        self.inner.len == 0
    }

    pub fn current(&self) -> usize {
        self.inner.state.borrow().index
    }

    pub fn is_playing(&self) -> bool {
        self.inner.state.borrow().playing
    }

    pub fn subscribe(&self) -> watch::Receiver<CarouselState> {
        self.inner.state.subscribe()
    }

    /// Start auto-advancing. Needs at least two slides.
    pub fn play(&self) {
        if self.inner.len < 2 || self.is_playing() {
            return;
        }
        self.inner.state.send_modify(|state| state.playing = true);
        self.restart_timer();
    }

    pub fn pause(&self) {
        self.timer().take();
        self.inner.state.send_modify(|state| state.playing = false);
    }

    pub fn toggle(&self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn next(&self) {
        self.inner.step(true);
        self.after_manual_move();
    }

    pub fn prev(&self) {
        self.inner.step(false);
        self.after_manual_move();
    }

    /// Jump to `index`. Returns false when it is out of range.
    pub fn go_to(&self, index: usize) -> bool {
        if index >= self.inner.len {
            return false;
        }
        self.inner.state.send_modify(|state| state.index = index);
        self.after_manual_move();
        true
    }

    fn after_manual_move(&self) {
        if self.is_playing() {
            self.restart_timer();
        }
    }
}
