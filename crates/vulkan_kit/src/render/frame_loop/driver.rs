//! Frame loop driver
//!
//! One iteration of [`FrameLoop::draw_frame`] runs
//!
//! ```text
//! Idle -> wait fence[slot] -> Acquiring -> Recording (reset fence, record)
//!      -> Submitting -> Presenting -> advance slot -> Idle
//! ```
//!
//! A stale acquire or present diverts to `Rebuilding`, which drains the
//! device, rebuilds the swapchain and its targets, notifies the renderer and
//! returns to `Idle` without advancing the slot. The slot fence is only reset
//! once an image is in hand, so a stale acquire leaves it signaled and the
//! retry does not block on it.

use std::thread;

use ash::vk;

use crate::core::FrameLoopConfig;
use super::backend::{
    AcquireOutcome, FrameBackend, FrameInfo, FrameRenderer, FrameWindow, PresentOutcome,
    StaleReason,
};
use super::counter::FrameCounter;
use super::error::{FrameError, FrameResult, FrameState};

/// Which call reported the stale swapchain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildTrigger {
    /// Reported by image acquisition
    Acquire(StaleReason),
    /// Reported by present
    Present(StaleReason),
}

/// What one call to [`FrameLoop::draw_frame`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A frame was presented
    Presented {
        /// Slot that recorded the frame
        slot: usize,
        /// Image the frame went to
        image_index: u32,
    },
    /// The swapchain was rebuilt; no frame was presented this iteration
    Rebuilt(RebuildTrigger),
    /// The swapchain went stale while the window or its surface had no area;
    /// the rebuild runs once the window is restored
    RebuildDeferred(RebuildTrigger),
    /// Window has zero area; nothing was submitted
    Minimized,
}

/// Counters collected while the loop runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames whose present was accepted
    pub frames_presented: u64,
    /// Completed swapchain rebuilds
    pub rebuilds: u64,
    /// Frames submitted but reported stale at present
    pub dropped_frames: u64,
    /// Iterations skipped because the window was minimized
    pub minimized_waits: u64,
    /// Fence waits that hit the configured timeout
    pub fence_timeouts: u64,
}

/// Drives a [`FrameBackend`] through the per-frame state machine
pub struct FrameLoop<B: FrameBackend> {
    backend: B,
    config: FrameLoopConfig,
    counter: FrameCounter,
    state: FrameState,
    stats: FrameStats,
    pending_rebuild: Option<RebuildTrigger>,
}

impl<B: FrameBackend> FrameLoop<B> {
    /// Wrap a backend. Fails unless the backend owns exactly
    /// `config.max_frames_in_flight` frame slots.
    pub fn new(backend: B, config: FrameLoopConfig) -> FrameResult<Self> {
        if backend.frames_in_flight() != config.max_frames_in_flight {
            return Err(FrameError::FrameSlotMismatch {
                backend: backend.frames_in_flight(),
                configured: config.max_frames_in_flight,
            });
        }
        let counter = FrameCounter::new(backend.frames_in_flight());
        log::debug!(
            "Frame loop ready: {} frames in flight, {} swapchain images",
            counter.frames_in_flight(),
            backend.image_count()
        );

        Ok(Self {
            backend,
            config,
            counter,
            state: FrameState::Idle,
            stats: FrameStats::default(),
            pending_rebuild: None,
        })
    }

    /// Run until the window asks to close or a fatal error occurs.
    ///
    /// The device is drained on every exit path. When both the loop and the
    /// final drain fail, the loop's error is returned.
    pub fn run<W, R>(&mut self, window: &mut W, renderer: &mut R) -> FrameResult<FrameStats>
    where
        W: FrameWindow,
        R: FrameRenderer<B>,
    {
        log::info!("Entering frame loop");
        let result = self.run_until_closed(window, renderer);
        let drained = self.shutdown();

        match (result, drained) {
            (Ok(()), Ok(())) => {
                log::info!("Frame loop finished: {:?}", self.stats);
                Ok(self.stats)
            }
            (Ok(()), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(drain_error)) => {
                log::warn!("Device drain after frame loop failure also failed: {}", drain_error);
                Err(e)
            }
        }
    }

    fn run_until_closed<W, R>(&mut self, window: &mut W, renderer: &mut R) -> FrameResult<()>
    where
        W: FrameWindow,
        R: FrameRenderer<B>,
    {
        loop {
            window.poll_events();
            if window.should_close() {
                return Ok(());
            }
            self.draw_frame(&*window, renderer)?;
        }
    }

    /// Wait for the device to drain so the backend can be torn down
    pub fn shutdown(&mut self) -> FrameResult<()> {
        self.backend
            .wait_idle()
            .map_err(|e| FrameError::from_vulkan(FrameState::Idle, e))
    }

    /// Run one iteration of the state machine
    pub fn draw_frame<W, R>(&mut self, window: &W, renderer: &mut R) -> FrameResult<FrameOutcome>
    where
        W: FrameWindow,
        R: FrameRenderer<B>,
    {
        if window.is_minimized() {
            self.stats.minimized_waits += 1;
            log::trace!("Window minimized, sleeping {:?}", self.config.minimized_poll_interval());
            thread::sleep(self.config.minimized_poll_interval());
            return Ok(FrameOutcome::Minimized);
        }

        if let Some(trigger) = self.pending_rebuild.take() {
            log::debug!("Running deferred swapchain rebuild ({:?})", trigger);
            if let Some(outcome) = self.rebuild(window, renderer, trigger)? {
                return Ok(outcome);
            }
        }

        let slot = self.counter.slot();
        self.transition(FrameState::Idle);
        self.wait_for_slot(slot)?;

        self.transition(FrameState::Acquiring);
        let acquired = self
            .backend
            .acquire_image(slot)
            .map_err(|e| FrameError::from_vulkan(FrameState::Acquiring, e))?;
        let image_index = match acquired {
            AcquireOutcome::Acquired(image_index) => image_index,
            AcquireOutcome::Stale(reason) => {
                return self.rebuild_after_stale(window, renderer, RebuildTrigger::Acquire(reason));
            }
        };

        self.transition(FrameState::Recording);
        self.backend
            .reset_slot(slot)
            .map_err(|e| FrameError::from_vulkan(FrameState::Recording, e))?;
        self.record(slot, image_index, renderer)?;

        self.transition(FrameState::Submitting);
        self.backend
            .submit(slot, image_index)
            .map_err(|e| FrameError::from_vulkan(FrameState::Submitting, e))?;

        self.transition(FrameState::Presenting);
        let presented = self
            .backend
            .present(image_index)
            .map_err(|e| FrameError::from_vulkan(FrameState::Presenting, e))?;
        if let PresentOutcome::Stale(reason) = presented {
            self.stats.dropped_frames += 1;
            return self.rebuild_after_stale(window, renderer, RebuildTrigger::Present(reason));
        }

        self.counter.advance();
        self.stats.frames_presented += 1;
        self.transition(FrameState::Idle);
        Ok(FrameOutcome::Presented { slot, image_index })
    }

    fn wait_for_slot(&mut self, slot: usize) -> FrameResult<()> {
        let timeout = self.config.fence_timeout_ns;
        loop {
            let signaled = self
                .backend
                .wait_for_slot(slot, timeout)
                .map_err(|e| FrameError::from_vulkan(FrameState::Idle, e))?;
            if signaled {
                return Ok(());
            }
            self.stats.fence_timeouts += 1;
            log::warn!("Fence wait for frame slot {} timed out after {} ns, retrying", slot, timeout);
        }
    }

    fn record<R: FrameRenderer<B>>(&mut self, slot: usize, image_index: u32, renderer: &mut R) -> FrameResult<()> {
        let frame = FrameInfo {
            slot,
            image_index,
            frame_number: self.stats.frames_presented,
            extent: self.backend.swapchain_info().extent,
        };

        let mut recorder = self
            .backend
            .begin_recording(slot, image_index)
            .map_err(|e| FrameError::from_vulkan(FrameState::Recording, e))?;
        renderer
            .record(&mut recorder, &frame)
            .map_err(FrameError::from_record)?;
        self.backend
            .finish_recording(slot, recorder)
            .map_err(|e| FrameError::from_vulkan(FrameState::Recording, e))
    }

    fn rebuild_after_stale<W, R>(
        &mut self,
        window: &W,
        renderer: &mut R,
        trigger: RebuildTrigger,
    ) -> FrameResult<FrameOutcome>
    where
        W: FrameWindow,
        R: FrameRenderer<B>,
    {
        log::debug!("Swapchain stale ({:?}), rebuilding", trigger);
        let deferred = self.rebuild(window, renderer, trigger)?;
        Ok(deferred.unwrap_or(FrameOutcome::Rebuilt(trigger)))
    }

    /// Returns `Some(RebuildDeferred)` if the window has no area to build for
    fn rebuild<W, R>(
        &mut self,
        window: &W,
        renderer: &mut R,
        trigger: RebuildTrigger,
    ) -> FrameResult<Option<FrameOutcome>>
    where
        W: FrameWindow,
        R: FrameRenderer<B>,
    {
        self.transition(FrameState::Rebuilding);

        if window.is_minimized() {
            log::debug!("Window has no area, deferring swapchain rebuild");
            return Ok(Some(self.defer_rebuild(trigger)));
        }
        let (width, height) = window.framebuffer_size();

        let stage = FrameState::Rebuilding;
        self.backend
            .wait_idle()
            .map_err(|e| FrameError::from_vulkan(stage, e))?;
        let rebuilt = self
            .backend
            .rebuild_swapchain(vk::Extent2D { width, height })
            .map_err(|e| FrameError::from_vulkan(stage, e))?;
        let Some(info) = rebuilt else {
            log::debug!("Surface has no area, deferring swapchain rebuild");
            return Ok(Some(self.defer_rebuild(trigger)));
        };
        self.backend
            .rebuild_targets(&info)
            .map_err(|e| FrameError::from_vulkan(stage, e))?;
        renderer
            .swapchain_rebuilt(&info)
            .map_err(|e| FrameError::from_vulkan(stage, e))?;

        self.stats.rebuilds += 1;
        log::info!(
            "Swapchain rebuilt at {}x{} with {} images",
            info.extent.width,
            info.extent.height,
            info.image_count
        );
        self.transition(FrameState::Idle);
        Ok(None)
    }

    fn defer_rebuild(&mut self, trigger: RebuildTrigger) -> FrameOutcome {
        self.pending_rebuild = Some(trigger);
        self.transition(FrameState::Idle);
        FrameOutcome::RebuildDeferred(trigger)
    }

    fn transition(&mut self, next: FrameState) {
        if self.state != next {
            log::trace!("Frame state {} -> {}", self.state, next);
            self.state = next;
        }
    }

    /// Current state machine state
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Slot the next frame will use
    pub fn frame_index(&self) -> usize {
        self.counter.slot()
    }

    /// Counters so far
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Whether a rebuild is waiting for the window to regain area
    pub fn rebuild_pending(&self) -> bool {
        self.pending_rebuild.is_some()
    }

    /// Backend being driven
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the backend between frames
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Drain the device and hand the backend back
    pub fn into_backend(mut self) -> FrameResult<B> {
        self.shutdown()?;
        Ok(self.backend)
    }
}
