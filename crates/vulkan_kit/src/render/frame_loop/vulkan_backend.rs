//! [`FrameBackend`] over a real device and swapchain

use ash::{vk, Device};

use crate::core::KitConfig;
use crate::render::vulkan::{
    ActiveRenderPass, CommandPool, CommandRecorder, FrameSync, PresentSemaphores, RenderPass,
    Swapchain, SwapchainTargets, VulkanContext, VulkanError, VulkanResult,
};
use super::backend::{AcquireOutcome, FrameBackend, PresentOutcome, SwapchainInfo};

/// Command buffer recording for one frame, already bound to the target
/// framebuffer of the acquired image
pub struct VulkanFrameRecorder {
    recorder: CommandRecorder,
    render_pass: vk::RenderPass,
    framebuffer: vk::Framebuffer,
    extent: vk::Extent2D,
}

impl VulkanFrameRecorder {
    /// Begin the presentation render pass, clearing the image to `clear_color`
    pub fn begin_render_pass(&mut self, clear_color: [f32; 4]) -> VulkanResult<ActiveRenderPass<'_>> {
        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue { float32: clear_color },
        }];
        let render_area = self.full_scissor();
        self.recorder
            .begin_render_pass(self.render_pass, self.framebuffer, render_area, &clear_values)
    }

    /// Viewport covering the whole image
    pub fn full_viewport(&self) -> vk::Viewport {
        vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: self.extent.width as f32,
            height: self.extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    /// Scissor covering the whole image
    pub fn full_scissor(&self) -> vk::Rect2D {
        vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: self.extent,
        }
    }

    /// Target image size
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Raw command buffer
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.recorder.handle()
    }

    /// Underlying recorder, for commands outside the render pass
    pub fn recorder(&mut self) -> &mut CommandRecorder {
        &mut self.recorder
    }
}

/// Frame resources for one window: swapchain, per-slot command buffers and
/// sync objects, per-image semaphores and framebuffers.
///
/// Field order is drop order. Everything that borrows the device goes before
/// `context`.
pub struct VulkanFrameBackend {
    frames: Vec<FrameSync>,
    present_semaphores: PresentSemaphores,
    command_buffers: Vec<vk::CommandBuffer>,
    command_pool: CommandPool,
    targets: SwapchainTargets,
    render_pass: RenderPass,
    swapchain: Swapchain,
    context: VulkanContext,
}

impl VulkanFrameBackend {
    /// Create the swapchain and all per-frame resources for `window_extent`
    pub fn new(context: VulkanContext, config: &KitConfig, window_extent: (u32, u32)) -> VulkanResult<Self> {
        let frames_in_flight = config.frame_loop.max_frames_in_flight;
        if frames_in_flight == 0 {
            return Err(VulkanError::InvalidOperation {
                reason: "max_frames_in_flight must be at least 1".to_string(),
            });
        }

        let device = context.raw_device();
        let extent = vk::Extent2D {
            width: window_extent.0,
            height: window_extent.1,
        };
        let swapchain = Swapchain::new(&context, config.swapchain.clone(), extent)?;
        let render_pass = RenderPass::new_present_pass(device.clone(), swapchain.format().format)?;
        let targets = SwapchainTargets::new(&device, &render_pass, &swapchain)?;

        let command_pool = CommandPool::new(device.clone(), context.graphics_queue_family())?;
        let command_buffers = command_pool.allocate_command_buffers(frames_in_flight as u32)?;

        let frames = (0..frames_in_flight)
            .map(|_| FrameSync::new(device.clone()))
            .collect::<VulkanResult<Vec<_>>>()?;
        let present_semaphores = PresentSemaphores::new(&device, swapchain.image_count() as usize)?;

        log::info!(
            "Frame resources created: {} slots, {} swapchain images",
            frames.len(),
            present_semaphores.len()
        );

        Ok(Self {
            frames,
            present_semaphores,
            command_buffers,
            command_pool,
            targets,
            render_pass,
            swapchain,
            context,
        })
    }

    fn device(&self) -> Device {
        self.context.raw_device()
    }

    fn frame(&self, slot: usize) -> VulkanResult<&FrameSync> {
        self.frames.get(slot).ok_or_else(|| VulkanError::InvalidOperation {
            reason: format!("frame slot {} out of range ({} slots)", slot, self.frames.len()),
        })
    }

    fn command_buffer(&self, slot: usize) -> VulkanResult<vk::CommandBuffer> {
        self.command_buffers.get(slot).copied().ok_or_else(|| VulkanError::InvalidOperation {
            reason: format!("no command buffer for frame slot {}", slot),
        })
    }

    /// Vulkan context the backend renders with
    pub fn context(&self) -> &VulkanContext {
        &self.context
    }

    /// Presentation render pass
    pub fn render_pass(&self) -> &RenderPass {
        &self.render_pass
    }

    /// Current swapchain
    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    /// Command pool the slot buffers come from
    pub fn command_pool(&self) -> &CommandPool {
        &self.command_pool
    }
}

impl FrameBackend for VulkanFrameBackend {
    type Recorder = VulkanFrameRecorder;

    fn frames_in_flight(&self) -> usize {
        self.frames.len()
    }

    fn image_count(&self) -> usize {
        self.swapchain.image_count() as usize
    }

    fn swapchain_info(&self) -> SwapchainInfo {
        self.swapchain.info()
    }

    fn wait_for_slot(&mut self, slot: usize, timeout_ns: u64) -> VulkanResult<bool> {
        self.frame(slot)?.in_flight.wait(timeout_ns)
    }

    fn acquire_image(&mut self, slot: usize) -> VulkanResult<AcquireOutcome> {
        let available = self.frame(slot)?.image_available.handle();
        self.swapchain.acquire(u64::MAX, available)
    }

    fn reset_slot(&mut self, slot: usize) -> VulkanResult<()> {
        self.frame(slot)?.in_flight.reset()
    }

    fn begin_recording(&mut self, slot: usize, image_index: u32) -> VulkanResult<Self::Recorder> {
        let mut recorder = CommandRecorder::new(self.command_buffer(slot)?, self.device());
        recorder.begin()?;
        Ok(VulkanFrameRecorder {
            recorder,
            render_pass: self.render_pass.handle(),
            framebuffer: self.targets.for_image(image_index)?,
            extent: self.targets.extent(),
        })
    }

    fn finish_recording(&mut self, _slot: usize, recorder: Self::Recorder) -> VulkanResult<()> {
        recorder.recorder.end()?;
        Ok(())
    }

    fn submit(&mut self, slot: usize, image_index: u32) -> VulkanResult<()> {
        let frame = self.frame(slot)?;
        let wait_semaphores = [frame.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [self.command_buffer(slot)?];
        let signal_semaphores = [self.present_semaphores.for_image(image_index)?.handle()];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        unsafe {
            self.context
                .device
                .device
                .queue_submit(self.context.graphics_queue(), &[submit_info], frame.in_flight.handle())
                .map_err(VulkanError::Api)
        }
    }

    fn present(&mut self, image_index: u32) -> VulkanResult<PresentOutcome> {
        let wait_semaphores = [self.present_semaphores.for_image(image_index)?.handle()];
        self.swapchain
            .present(self.context.present_queue(), &wait_semaphores, image_index)
    }

    fn wait_idle(&mut self) -> VulkanResult<()> {
        self.context.wait_idle()
    }

    fn rebuild_swapchain(&mut self, window_extent: vk::Extent2D) -> VulkanResult<Option<SwapchainInfo>> {
        let Some(info) = self.swapchain.rebuild(window_extent)? else {
            return Ok(None);
        };

        // The image count may change, and a stale acquire can leave an
        // acquire semaphore signaled with nobody waiting on it.
        let device = self.device();
        self.present_semaphores = PresentSemaphores::new(&device, info.image_count as usize)?;
        for frame in &mut self.frames {
            frame.recreate_image_available(device.clone())?;
        }
        Ok(Some(info))
    }

    fn rebuild_targets(&mut self, info: &SwapchainInfo) -> VulkanResult<()> {
        let device = self.device();
        if info.format != self.render_pass.color_format() {
            log::info!(
                "Swapchain format changed {:?} -> {:?}, recreating render pass",
                self.render_pass.color_format(),
                info.format
            );
            self.render_pass = RenderPass::new_present_pass(device.clone(), info.format)?;
        }
        self.targets.regenerate(&device, &self.render_pass, &self.swapchain)
    }
}

impl Drop for VulkanFrameBackend {
    fn drop(&mut self) {
        if let Err(e) = self.context.wait_idle() {
            log::warn!("Device wait idle failed during frame backend teardown: {}", e);
        }
        log::debug!("Destroying frame resources");
    }
}
