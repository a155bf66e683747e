//! Interfaces the frame loop drives
//!
//! The driver never touches Vulkan directly. It talks to a [`FrameBackend`]
//! for GPU work, a [`FrameWindow`] for size and close state, and a
//! [`FrameRenderer`] for the caller's recording logic. Slot arguments are
//! frame-in-flight indices (N-wide); image arguments are swapchain image
//! indices (M-wide). Implementations must key fences, acquire semaphores and
//! command buffers by slot, and render-finished semaphores and framebuffers
//! by image.

use ash::vk;

use crate::render::vulkan::VulkanResult;

/// Why the presentation engine rejected the swapchain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// `VK_ERROR_OUT_OF_DATE_KHR`
    OutOfDate,
    /// `VK_SUBOPTIMAL_KHR`
    Suboptimal,
}

/// Result of asking the swapchain for an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Image ready to be rendered once the acquire semaphore signals
    Acquired(u32),
    /// Swapchain must be rebuilt before rendering
    Stale(StaleReason),
}

/// Result of queueing a present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Present queued
    Presented,
    /// Swapchain must be rebuilt; the presented frame may have been dropped
    Stale(StaleReason),
}

/// Swapchain properties after creation or rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainInfo {
    /// Image format
    pub format: vk::Format,
    /// Image color space
    pub color_space: vk::ColorSpaceKHR,
    /// Presentation mode
    pub present_mode: vk::PresentModeKHR,
    /// Image size
    pub extent: vk::Extent2D,
    /// Number of images
    pub image_count: u32,
}

/// What the renderer gets told about the frame it is recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Frame-in-flight slot whose command buffer is being recorded
    pub slot: usize,
    /// Swapchain image the frame will be presented to
    pub image_index: u32,
    /// Frames presented before this one
    pub frame_number: u64,
    /// Current swapchain extent
    pub extent: vk::Extent2D,
}

/// GPU side of the frame loop
pub trait FrameBackend {
    /// Recording surface handed to the renderer for one frame
    type Recorder;

    /// Number of frame slots (N)
    fn frames_in_flight(&self) -> usize;

    /// Number of swapchain images (M)
    fn image_count(&self) -> usize;

    /// Current swapchain properties
    fn swapchain_info(&self) -> SwapchainInfo;

    /// Block on the slot's fence. `Ok(false)` means the timeout elapsed.
    fn wait_for_slot(&mut self, slot: usize, timeout_ns: u64) -> VulkanResult<bool>;

    /// Acquire the next image, signaling the slot's acquire semaphore
    fn acquire_image(&mut self, slot: usize) -> VulkanResult<AcquireOutcome>;

    /// Reset the slot's fence to unsignaled
    fn reset_slot(&mut self, slot: usize) -> VulkanResult<()>;

    /// Begin recording the slot's command buffer against the image's framebuffer
    fn begin_recording(&mut self, slot: usize, image_index: u32) -> VulkanResult<Self::Recorder>;

    /// End recording
    fn finish_recording(&mut self, slot: usize, recorder: Self::Recorder) -> VulkanResult<()>;

    /// Submit the slot's command buffer: wait the slot's acquire semaphore,
    /// signal the image's render-finished semaphore and the slot's fence
    fn submit(&mut self, slot: usize, image_index: u32) -> VulkanResult<()>;

    /// Present the image after its render-finished semaphore signals
    fn present(&mut self, image_index: u32) -> VulkanResult<PresentOutcome>;

    /// Block until every queue has drained
    fn wait_idle(&mut self) -> VulkanResult<()>;

    /// Recreate the swapchain for the given framebuffer size. Only called
    /// after `wait_idle`. `Ok(None)` means the surface has no area yet and
    /// nothing was rebuilt.
    fn rebuild_swapchain(&mut self, window_extent: vk::Extent2D) -> VulkanResult<Option<SwapchainInfo>>;

    /// Regenerate everything that referenced the old swapchain images
    fn rebuild_targets(&mut self, info: &SwapchainInfo) -> VulkanResult<()>;
}

/// Window state the frame loop needs
pub trait FrameWindow {
    /// Process pending window events
    fn poll_events(&mut self);

    /// Whether the user asked to close
    fn should_close(&self) -> bool;

    /// Framebuffer size in pixels
    fn framebuffer_size(&self) -> (u32, u32);

    /// Zero-area framebuffer, usually because the window is minimized
    fn is_minimized(&self) -> bool {
        let (width, height) = self.framebuffer_size();
        width == 0 || height == 0
    }
}

/// Caller render logic
pub trait FrameRenderer<B: FrameBackend> {
    /// Fill the frame's command buffer
    fn record(&mut self, recorder: &mut B::Recorder, frame: &FrameInfo) -> VulkanResult<()>;

    /// Called after a rebuild, once the backend regenerated its targets and
    /// before the next acquire
    fn swapchain_rebuilt(&mut self, _info: &SwapchainInfo) -> VulkanResult<()> {
        Ok(())
    }
}
