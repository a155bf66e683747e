//! Vulkan synchronization primitives for GPU/CPU coordination
//!
//! RAII wrappers for semaphores and fences, plus the two sets the frame loop
//! indexes differently:
//!
//! - [`FrameSync`]: one per frame in flight (N). Holds the fence that gates
//!   command buffer reuse and the semaphore acquire signals.
//! - [`PresentSemaphores`]: one render-finished semaphore per swapchain
//!   image (M). Present waits on these, so they must be keyed by image: the
//!   number of presents that can be pending at once is bounded by the image
//!   count, not by frames in flight.

use ash::{vk, Device};
use crate::render::vulkan::{VulkanResult, VulkanError};

/// GPU-GPU synchronization primitive with automatic resource management
pub struct Semaphore {
    device: Device,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Create a new binary semaphore
    pub fn new(device: Device) -> VulkanResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();

        let semaphore = unsafe {
            device.create_semaphore(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, semaphore })
    }

    /// Get the semaphore handle
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// Fence wrapper with RAII cleanup
pub struct Fence {
    device: Device,
    fence: vk::Fence,
}

impl Fence {
    /// Create a new fence
    pub fn new(device: Device, signaled: bool) -> VulkanResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::builder().flags(flags);

        let fence = unsafe {
            device.create_fence(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, fence })
    }

    /// Wait for the fence; `Ok(false)` means the timeout elapsed first
    pub fn wait(&self, timeout: u64) -> VulkanResult<bool> {
        match unsafe { self.device.wait_for_fences(&[self.fence], true, timeout) } {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(e) => Err(VulkanError::Api(e)),
        }
    }

    /// Reset fence to unsignaled
    pub fn reset(&self) -> VulkanResult<()> {
        unsafe {
            self.device.reset_fences(&[self.fence])
                .map_err(VulkanError::Api)
        }
    }

    /// Get the fence handle
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

/// Synchronization objects for one frame in flight
pub struct FrameSync {
    /// Signaled by acquire, waited by the graphics submission
    pub image_available: Semaphore,
    /// Signaled when the slot's submission retires
    pub in_flight: Fence,
}

impl FrameSync {
    /// Create frame synchronization objects; the fence starts signaled so the
    /// first wait on a fresh slot returns immediately
    pub fn new(device: Device) -> VulkanResult<Self> {
        let image_available = Semaphore::new(device.clone())?;
        let in_flight = Fence::new(device, true)?;

        Ok(Self {
            image_available,
            in_flight,
        })
    }

    /// Replace the acquire semaphore. Only valid while the device is idle.
    pub fn recreate_image_available(&mut self, device: Device) -> VulkanResult<()> {
        self.image_available = Semaphore::new(device)?;
        Ok(())
    }
}

/// Render-finished semaphores keyed by swapchain image index
pub struct PresentSemaphores {
    render_finished: Vec<Semaphore>,
}

impl PresentSemaphores {
    /// Create one semaphore per swapchain image
    pub fn new(device: &Device, image_count: usize) -> VulkanResult<Self> {
        let render_finished = (0..image_count)
            .map(|_| Semaphore::new(device.clone()))
            .collect::<VulkanResult<Vec<_>>>()?;
        Ok(Self { render_finished })
    }

    /// Semaphore for the given image
    pub fn for_image(&self, image_index: u32) -> VulkanResult<&Semaphore> {
        self.render_finished
            .get(image_index as usize)
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!(
                    "image index {} out of range for {} present semaphores",
                    image_index,
                    self.render_finished.len()
                ),
            })
    }

    /// Number of semaphores (equals the swapchain image count)
    pub fn len(&self) -> usize {
        self.render_finished.len()
    }

    /// Whether no semaphores exist
    pub fn is_empty(&self) -> bool {
        self.render_finished.is_empty()
    }
}
