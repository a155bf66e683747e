//! Framebuffer management
//!
//! [`SwapchainTargets`] holds one framebuffer per swapchain image. It is
//! indexed by the acquired image index, never by frame slot, and must be
//! regenerated every time the swapchain is rebuilt.

use ash::{vk, Device};
use crate::render::vulkan::{RenderPass, Swapchain, VulkanResult, VulkanError};

/// Framebuffer wrapper with RAII cleanup
pub struct Framebuffer {
    device: Device,
    framebuffer: vk::Framebuffer,
}

impl Framebuffer {
    /// Create a new framebuffer
    pub fn new(
        device: Device,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        let framebuffer_create_info = vk::FramebufferCreateInfo::builder()
            .render_pass(render_pass)
            .attachments(attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe {
            device.create_framebuffer(&framebuffer_create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self {
            device,
            framebuffer,
        })
    }

    /// Get the framebuffer handle
    pub fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}

/// Per-image framebuffers for the current swapchain
pub struct SwapchainTargets {
    framebuffers: Vec<Framebuffer>,
    extent: vk::Extent2D,
}

impl SwapchainTargets {
    /// Build one framebuffer per swapchain image view
    pub fn new(device: &Device, render_pass: &RenderPass, swapchain: &Swapchain) -> VulkanResult<Self> {
        let extent = swapchain.extent();
        let framebuffers = swapchain
            .image_views()
            .iter()
            .map(|&view| Framebuffer::new(device.clone(), render_pass.handle(), &[view], extent))
            .collect::<VulkanResult<Vec<_>>>()?;

        log::debug!("Created {} framebuffers at {}x{}", framebuffers.len(), extent.width, extent.height);
        Ok(Self { framebuffers, extent })
    }

    /// Drop the old framebuffers and build new ones for a rebuilt swapchain
    pub fn regenerate(&mut self, device: &Device, render_pass: &RenderPass, swapchain: &Swapchain) -> VulkanResult<()> {
        self.framebuffers.clear();
        *self = Self::new(device, render_pass, swapchain)?;
        Ok(())
    }

    /// Framebuffer bound to the given swapchain image
    pub fn for_image(&self, image_index: u32) -> VulkanResult<vk::Framebuffer> {
        self.framebuffers
            .get(image_index as usize)
            .map(Framebuffer::handle)
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!(
                    "no framebuffer for image {} ({} targets)",
                    image_index,
                    self.framebuffers.len()
                ),
            })
    }

    /// Extent the framebuffers were created with
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Number of framebuffers
    pub fn len(&self) -> usize {
        self.framebuffers.len()
    }

    /// Whether there are no framebuffers
    pub fn is_empty(&self) -> bool {
        self.framebuffers.is_empty()
    }
}
