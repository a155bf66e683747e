//! Vulkan wrappers
//!
//! RAII wrappers over the ash objects the frame loop needs: instance, device
//! and surface, the swapchain, synchronization primitives, command buffers,
//! the presentation render pass and its framebuffers.

pub mod context;
pub mod window;
pub mod sync;
pub mod swapchain;
pub mod commands;
pub mod render_pass;
pub mod framebuffer;

pub use context::{LogicalDevice, PhysicalDeviceInfo, VulkanContext, VulkanError, VulkanInstance, VulkanResult};
pub use window::{Window, WindowError, WindowResult};
pub use sync::{Fence, FrameSync, PresentSemaphores, Semaphore};
pub use swapchain::{
    choose_extent, choose_image_count, choose_present_mode, choose_surface_format, Swapchain,
    SwapchainSettings, SwapchainSupport,
};
pub use commands::{ActiveRenderPass, CommandPool, CommandRecorder};
pub use render_pass::RenderPass;
pub use framebuffer::{Framebuffer, SwapchainTargets};
