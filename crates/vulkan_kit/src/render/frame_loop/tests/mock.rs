//! Scripted backend, window and renderer that log every call

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use ash::vk;

use crate::core::FrameLoopConfig;
use crate::render::frame_loop::{
    AcquireOutcome, FrameBackend, FrameInfo, FrameLoop, FrameRenderer, FrameWindow,
    PresentOutcome, StaleReason, SwapchainInfo,
};
use crate::render::vulkan::{VulkanError, VulkanResult};

pub type CallLog = Rc<RefCell<Vec<Call>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    WaitFence(usize),
    Acquire(usize),
    ResetFence(usize),
    BeginRecording { slot: usize, image: u32 },
    Record { slot: usize, image: u32, frame_number: u64 },
    FinishRecording(usize),
    Submit { slot: usize, image: u32 },
    Present(u32),
    WaitIdle,
    RebuildSwapchain(u32, u32),
    RebuildTargets,
    RendererNotified(u32, u32),
}

/// Scripted result for one acquire or present call
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Ok,
    Stale(StaleReason),
    Fail(vk::Result),
}

pub struct MockRecorder {
    pub slot: usize,
    pub image: u32,
}

pub struct MockBackend {
    log: CallLog,
    frames_in_flight: usize,
    image_count: u32,
    extent: vk::Extent2D,
    next_image: u32,
    fence_signaled: Vec<bool>,
    present_pending: Vec<bool>,
    violations: Vec<String>,
    pub fence_timeouts: usize,
    pub acquire_script: VecDeque<Step>,
    pub present_script: VecDeque<Step>,
    pub submit_failure: Option<vk::Result>,
    pub rebuild_failure: Option<vk::Result>,
    pub rebuild_image_count: Option<u32>,
    /// Rebuilds that find the surface at 0x0 before one succeeds
    pub zero_area_rebuilds: usize,
}

impl MockBackend {
    pub fn new(log: CallLog, frames_in_flight: usize, image_count: u32) -> Self {
        Self {
            log,
            frames_in_flight,
            image_count,
            extent: vk::Extent2D { width: 800, height: 600 },
            next_image: 0,
            fence_signaled: vec![true; frames_in_flight],
            present_pending: vec![false; image_count as usize],
            violations: Vec::new(),
            fence_timeouts: 0,
            acquire_script: VecDeque::new(),
            present_script: VecDeque::new(),
            submit_failure: None,
            rebuild_failure: None,
            rebuild_image_count: None,
            zero_area_rebuilds: 0,
        }
    }

    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    fn push(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }
}

impl FrameBackend for MockBackend {
    type Recorder = MockRecorder;

    fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    fn image_count(&self) -> usize {
        self.image_count as usize
    }

    fn swapchain_info(&self) -> SwapchainInfo {
        SwapchainInfo {
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            present_mode: vk::PresentModeKHR::FIFO,
            extent: self.extent,
            image_count: self.image_count,
        }
    }

    fn wait_for_slot(&mut self, slot: usize, _timeout_ns: u64) -> VulkanResult<bool> {
        self.push(Call::WaitFence(slot));
        if self.fence_timeouts > 0 {
            self.fence_timeouts -= 1;
            return Ok(false);
        }
        assert!(
            self.fence_signaled[slot],
            "fence for slot {} waited while reset with no submission; this would block forever",
            slot
        );
        Ok(true)
    }

    fn acquire_image(&mut self, slot: usize) -> VulkanResult<AcquireOutcome> {
        self.push(Call::Acquire(slot));
        match self.acquire_script.pop_front().unwrap_or(Step::Ok) {
            Step::Ok => {
                let image = self.next_image;
                self.next_image = (self.next_image + 1) % self.image_count;
                Ok(AcquireOutcome::Acquired(image))
            }
            Step::Stale(reason) => Ok(AcquireOutcome::Stale(reason)),
            Step::Fail(result) => Err(VulkanError::Api(result)),
        }
    }

    fn reset_slot(&mut self, slot: usize) -> VulkanResult<()> {
        self.push(Call::ResetFence(slot));
        self.fence_signaled[slot] = false;
        Ok(())
    }

    fn begin_recording(&mut self, slot: usize, image_index: u32) -> VulkanResult<MockRecorder> {
        self.push(Call::BeginRecording { slot, image: image_index });
        Ok(MockRecorder { slot, image: image_index })
    }

    fn finish_recording(&mut self, slot: usize, _recorder: MockRecorder) -> VulkanResult<()> {
        self.push(Call::FinishRecording(slot));
        Ok(())
    }

    fn submit(&mut self, slot: usize, image_index: u32) -> VulkanResult<()> {
        self.push(Call::Submit { slot, image: image_index });
        if let Some(result) = self.submit_failure.take() {
            return Err(VulkanError::Api(result));
        }
        let pending = &mut self.present_pending[image_index as usize];
        if *pending {
            self.violations
                .push(format!("render-finished semaphore for image {} signaled twice", image_index));
        }
        *pending = true;
        // Work retires immediately.
        self.fence_signaled[slot] = true;
        Ok(())
    }

    fn present(&mut self, image_index: u32) -> VulkanResult<PresentOutcome> {
        self.push(Call::Present(image_index));
        match self.present_script.pop_front().unwrap_or(Step::Ok) {
            Step::Ok => {
                self.present_pending[image_index as usize] = false;
                Ok(PresentOutcome::Presented)
            }
            Step::Stale(reason) => {
                self.present_pending[image_index as usize] = false;
                Ok(PresentOutcome::Stale(reason))
            }
            Step::Fail(result) => Err(VulkanError::Api(result)),
        }
    }

    fn wait_idle(&mut self) -> VulkanResult<()> {
        self.push(Call::WaitIdle);
        Ok(())
    }

    fn rebuild_swapchain(&mut self, window_extent: vk::Extent2D) -> VulkanResult<Option<SwapchainInfo>> {
        self.push(Call::RebuildSwapchain(window_extent.width, window_extent.height));
        if let Some(result) = self.rebuild_failure.take() {
            return Err(VulkanError::Api(result));
        }
        if self.zero_area_rebuilds > 0 {
            self.zero_area_rebuilds -= 1;
            return Ok(None);
        }
        self.extent = window_extent;
        if let Some(count) = self.rebuild_image_count.take() {
            self.image_count = count;
        }
        self.next_image = 0;
        self.present_pending = vec![false; self.image_count as usize];
        Ok(Some(self.swapchain_info()))
    }

    fn rebuild_targets(&mut self, info: &SwapchainInfo) -> VulkanResult<()> {
        self.push(Call::RebuildTargets);
        assert_eq!(info.extent, self.extent);
        Ok(())
    }
}

/// Window whose size can be scripted per `framebuffer_size` call
pub struct MockWindow {
    size: (u32, u32),
    scripted_sizes: RefCell<VecDeque<(u32, u32)>>,
    polls: usize,
    close_after_polls: Option<usize>,
}

impl MockWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            scripted_sizes: RefCell::new(VecDeque::new()),
            polls: 0,
            close_after_polls: None,
        }
    }

    pub fn minimized() -> Self {
        Self::new(0, 0)
    }

    /// `should_close` turns true on the given poll
    pub fn closing_after(mut self, polls: usize) -> Self {
        self.close_after_polls = Some(polls);
        self
    }

    /// Sizes returned by the next `framebuffer_size` calls, before falling
    /// back to the fixed size
    pub fn with_sizes(self, sizes: &[(u32, u32)]) -> Self {
        self.scripted_sizes.borrow_mut().extend(sizes.iter().copied());
        self
    }
}

impl FrameWindow for MockWindow {
    fn poll_events(&mut self) {
        self.polls += 1;
    }

    fn should_close(&self) -> bool {
        self.close_after_polls.map_or(false, |limit| self.polls >= limit)
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        self.scripted_sizes.borrow_mut().pop_front().unwrap_or(self.size)
    }
}

pub struct MockRenderer {
    log: CallLog,
    pub fail_record: Option<VulkanError>,
    pub frames: Vec<FrameInfo>,
}

impl MockRenderer {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            fail_record: None,
            frames: Vec::new(),
        }
    }
}

impl FrameRenderer<MockBackend> for MockRenderer {
    fn record(&mut self, recorder: &mut MockRecorder, frame: &FrameInfo) -> VulkanResult<()> {
        assert_eq!(recorder.slot, frame.slot);
        assert_eq!(recorder.image, frame.image_index);
        self.log.borrow_mut().push(Call::Record {
            slot: frame.slot,
            image: frame.image_index,
            frame_number: frame.frame_number,
        });
        self.frames.push(*frame);
        match self.fail_record.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn swapchain_rebuilt(&mut self, info: &SwapchainInfo) -> VulkanResult<()> {
        self.log
            .borrow_mut()
            .push(Call::RendererNotified(info.extent.width, info.extent.height));
        Ok(())
    }
}

pub fn test_config(frames_in_flight: usize) -> FrameLoopConfig {
    FrameLoopConfig {
        max_frames_in_flight: frames_in_flight,
        fence_timeout_ns: 1_000_000,
        minimized_poll_interval_ms: 1,
    }
}

/// Loop over a fresh mock backend with `frames_in_flight` slots and
/// `image_count` swapchain images
pub fn setup(frames_in_flight: usize, image_count: u32) -> (FrameLoop<MockBackend>, MockRenderer, CallLog) {
    let log: CallLog = Rc::new(RefCell::new(Vec::new()));
    let backend = MockBackend::new(log.clone(), frames_in_flight, image_count);
    let frame_loop = FrameLoop::new(backend, test_config(frames_in_flight)).unwrap();
    let renderer = MockRenderer::new(log.clone());
    (frame_loop, renderer, log)
}

/// Take every call logged so far
pub fn take_calls(log: &CallLog) -> Vec<Call> {
    log.borrow_mut().drain(..).collect()
}
