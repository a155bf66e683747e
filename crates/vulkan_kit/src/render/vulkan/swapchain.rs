//! Vulkan swapchain management
//!
//! Owns the presentable images and their views, and can be rebuilt in place
//! when the presentation engine reports it stale. Selection of format,
//! present mode, extent and image count is done by pure functions over the
//! queried [`SwapchainSupport`] so the policy is reproducible and testable
//! without a device.
//!
//! Rebuilding invalidates every framebuffer created from the old image
//! views. Regenerating those is the caller's job.

use ash::{vk, Device};
use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};

use crate::core::SwapchainConfig;
use crate::render::frame_loop::{AcquireOutcome, PresentOutcome, StaleReason, SwapchainInfo};
use crate::render::vulkan::{VulkanContext, VulkanResult, VulkanError};

/// Pick the surface format: first preference available in `color_space`.
///
/// A single `UNDEFINED` entry means the surface accepts anything, so the
/// first preference is used as is. With no match the first reported format
/// is used.
pub fn choose_surface_format(
    available: &[vk::SurfaceFormatKHR],
    preferred: &[vk::Format],
    color_space: vk::ColorSpaceKHR,
) -> VulkanResult<vk::SurfaceFormatKHR> {
    let first = available.first().ok_or_else(|| {
        VulkanError::SurfaceUnsupported("surface reports no formats".to_string())
    })?;

    if available.len() == 1 && first.format == vk::Format::UNDEFINED {
        let format = preferred.first().copied().unwrap_or(vk::Format::B8G8R8A8_SRGB);
        return Ok(vk::SurfaceFormatKHR { format, color_space });
    }

    let chosen = preferred
        .iter()
        .find_map(|&wanted| {
            available
                .iter()
                .find(|sf| sf.format == wanted && sf.color_space == color_space)
                .copied()
        })
        .unwrap_or(*first);

    Ok(chosen)
}

/// Pick the present mode: first preference available, else FIFO
pub fn choose_present_mode(
    available: &[vk::PresentModeKHR],
    preferred: &[vk::PresentModeKHR],
) -> vk::PresentModeKHR {
    preferred
        .iter()
        .copied()
        .find(|mode| available.contains(mode))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// Pick the extent: the surface's current extent, or the window size clamped
/// to the supported range when the surface leaves it to the application
pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, window_extent: vk::Extent2D) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        caps.current_extent
    } else {
        vk::Extent2D {
            width: window_extent.width.clamp(
                caps.min_image_extent.width,
                caps.max_image_extent.width,
            ),
            height: window_extent.height.clamp(
                caps.min_image_extent.height,
                caps.max_image_extent.height,
            ),
        }
    }
}

/// One more than the minimum, capped by the maximum when there is one
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        desired.min(caps.max_image_count)
    } else {
        desired
    }
}

/// Everything the surface reports about swapchain support
#[derive(Debug, Clone)]
pub struct SwapchainSupport {
    /// Image count, extent and transform limits
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported format/color space pairs
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported presentation modes
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    /// Query the surface for the physical device
    pub fn query(
        surface_loader: &Surface,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VulkanResult<Self> {
        unsafe {
            Ok(Self {
                capabilities: surface_loader
                    .get_physical_device_surface_capabilities(physical_device, surface)?,
                formats: surface_loader
                    .get_physical_device_surface_formats(physical_device, surface)?,
                present_modes: surface_loader
                    .get_physical_device_surface_present_modes(physical_device, surface)?,
            })
        }
    }

    /// Whether the extent the policy would pick has any area. Surfaces of
    /// minimized windows report 0x0 even when the window size lags behind.
    pub fn has_area(&self, window_extent: vk::Extent2D) -> bool {
        let extent = choose_extent(&self.capabilities, window_extent);
        extent.width > 0 && extent.height > 0
    }

    /// Apply the selection policy
    pub fn select(&self, config: &SwapchainConfig, window_extent: vk::Extent2D) -> VulkanResult<SwapchainSettings> {
        let format = choose_surface_format(
            &self.formats,
            &config.vk_formats(),
            config.color_space.to_vk(),
        )?;
        let present_mode = choose_present_mode(&self.present_modes, &config.vk_present_modes());
        let extent = choose_extent(&self.capabilities, window_extent);
        if extent.width == 0 || extent.height == 0 {
            return Err(VulkanError::SurfaceUnsupported(
                "surface extent has zero area".to_string(),
            ));
        }

        Ok(SwapchainSettings {
            format,
            present_mode,
            extent,
            min_image_count: choose_image_count(&self.capabilities),
            pre_transform: self.capabilities.current_transform,
        })
    }
}

/// Parameters a swapchain is created with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainSettings {
    /// Image format and color space
    pub format: vk::SurfaceFormatKHR,
    /// Presentation mode
    pub present_mode: vk::PresentModeKHR,
    /// Image size
    pub extent: vk::Extent2D,
    /// Requested image count; the driver may create more
    pub min_image_count: u32,
    /// Surface transform
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

/// Swapchain wrapper with RAII cleanup and in-place rebuild
pub struct Swapchain {
    device: Device,
    swapchain_loader: SwapchainLoader,
    surface_loader: Surface,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
    config: SwapchainConfig,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    settings: SwapchainSettings,
}

impl Swapchain {
    /// Create a new swapchain for the context's surface
    pub fn new(
        context: &VulkanContext,
        config: SwapchainConfig,
        window_extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        let device = context.raw_device();
        let swapchain_loader = context.swapchain_loader().clone();
        let surface_loader = context.surface_loader.clone();
        let physical_device = context.physical_device.device;

        let support = SwapchainSupport::query(&surface_loader, physical_device, context.surface)?;
        let settings = support.select(&config, window_extent)?;
        let (swapchain, images, image_views) = create_swapchain(
            &device,
            &swapchain_loader,
            context.surface,
            &settings,
            vk::SwapchainKHR::null(),
        )?;

        let swapchain = Self {
            device,
            swapchain_loader,
            surface_loader,
            surface: context.surface,
            physical_device,
            config,
            swapchain,
            images,
            image_views,
            settings,
        };
        log::info!("Swapchain created: {:?}", swapchain.info());
        Ok(swapchain)
    }

    /// Recreate images and views for the current surface state.
    ///
    /// The device must be idle: no submitted work may reference the old
    /// images. Old views are destroyed here; framebuffers built on them are
    /// now dangling and must be regenerated by the caller.
    ///
    /// Returns `Ok(None)` and leaves the swapchain untouched when the surface
    /// currently has no area.
    pub fn rebuild(&mut self, window_extent: vk::Extent2D) -> VulkanResult<Option<SwapchainInfo>> {
        let support = SwapchainSupport::query(&self.surface_loader, self.physical_device, self.surface)?;
        if !support.has_area(window_extent) {
            log::debug!("Surface has no area, swapchain left as is");
            return Ok(None);
        }
        let settings = support.select(&self.config, window_extent)?;

        let (swapchain, images, image_views) = create_swapchain(
            &self.device,
            &self.swapchain_loader,
            self.surface,
            &settings,
            self.swapchain,
        )?;

        self.destroy_resources();
        self.swapchain = swapchain;
        self.images = images;
        self.image_views = image_views;
        self.settings = settings;

        let info = self.info();
        log::info!("Swapchain rebuilt: {:?}", info);
        Ok(Some(info))
    }

    /// Request the next image, signaling `available` when it can be rendered to
    pub fn acquire(&self, timeout: u64, available: vk::Semaphore) -> VulkanResult<AcquireOutcome> {
        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                timeout,
                available,
                vk::Fence::null(),
            )
        };

        match result {
            Ok((image_index, false)) => Ok(AcquireOutcome::Acquired(image_index)),
            Ok((_, true)) => {
                log::warn!("Swapchain suboptimal during acquire");
                Ok(AcquireOutcome::Stale(StaleReason::Suboptimal))
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                log::warn!("Swapchain out of date during acquire");
                Ok(AcquireOutcome::Stale(StaleReason::OutOfDate))
            }
            Err(e) => Err(VulkanError::Api(e)),
        }
    }

    /// Queue presentation of `image_index` once `wait_semaphores` are signaled
    pub fn present(
        &self,
        queue: vk::Queue,
        wait_semaphores: &[vk::Semaphore],
        image_index: u32,
    ) -> VulkanResult<PresentOutcome> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { self.swapchain_loader.queue_present(queue, &present_info) } {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) => {
                log::warn!("Swapchain suboptimal during present");
                Ok(PresentOutcome::Stale(StaleReason::Suboptimal))
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                log::warn!("Swapchain out of date during present");
                Ok(PresentOutcome::Stale(StaleReason::OutOfDate))
            }
            Err(e) => Err(VulkanError::Api(e)),
        }
    }

    /// Summary handed to rebuild listeners
    pub fn info(&self) -> SwapchainInfo {
        SwapchainInfo {
            format: self.settings.format.format,
            color_space: self.settings.format.color_space,
            present_mode: self.settings.present_mode,
            extent: self.settings.extent,
            image_count: self.images.len() as u32,
        }
    }

    /// Get swapchain extent
    pub fn extent(&self) -> vk::Extent2D {
        self.settings.extent
    }

    /// Get surface format
    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.settings.format
    }

    /// Get image views
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Number of images actually created
    pub fn image_count(&self) -> u32 {
        self.images.len() as u32
    }

    fn destroy_resources(&mut self) {
        unsafe {
            for &image_view in &self.image_views {
                self.device.destroy_image_view(image_view, None);
            }
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
        self.image_views.clear();
        self.images.clear();
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        self.destroy_resources();
    }
}

fn create_swapchain(
    device: &Device,
    swapchain_loader: &SwapchainLoader,
    surface: vk::SurfaceKHR,
    settings: &SwapchainSettings,
    old_swapchain: vk::SwapchainKHR,
) -> VulkanResult<(vk::SwapchainKHR, Vec<vk::Image>, Vec<vk::ImageView>)> {
    let create_info = vk::SwapchainCreateInfoKHR::builder()
        .surface(surface)
        .min_image_count(settings.min_image_count)
        .image_format(settings.format.format)
        .image_color_space(settings.format.color_space)
        .image_extent(settings.extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        .pre_transform(settings.pre_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(settings.present_mode)
        .clipped(true)
        .old_swapchain(old_swapchain);

    let swapchain = unsafe { swapchain_loader.create_swapchain(&create_info, None)? };

    let images = match unsafe { swapchain_loader.get_swapchain_images(swapchain) } {
        Ok(images) => images,
        Err(e) => {
            unsafe { swapchain_loader.destroy_swapchain(swapchain, None) };
            return Err(VulkanError::Api(e));
        }
    };

    let mut image_views = Vec::with_capacity(images.len());
    for &image in &images {
        let create_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(settings.format.format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        match unsafe { device.create_image_view(&create_info, None) } {
            Ok(view) => image_views.push(view),
            Err(e) => {
                unsafe {
                    for view in image_views {
                        device.destroy_image_view(view, None);
                    }
                    swapchain_loader.destroy_swapchain(swapchain, None);
                }
                return Err(VulkanError::Api(e));
            }
        }
    }

    Ok((swapchain, images, image_views))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PresentModePreference, SurfaceFormatPreference};

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR { format, color_space }
    }

    fn caps(min: u32, max: u32, current: (u32, u32)) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            current_extent: vk::Extent2D { width: current.0, height: current.1 },
            min_image_extent: vk::Extent2D { width: 16, height: 16 },
            max_image_extent: vk::Extent2D { width: 4096, height: 2160 },
            ..Default::default()
        }
    }

    #[test]
    fn test_format_follows_preference_order() {
        let available = [
            format(vk::Format::R8G8B8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let chosen = choose_surface_format(
            &available,
            &[vk::Format::B8G8R8A8_SRGB, vk::Format::R8G8B8A8_SRGB],
            vk::ColorSpaceKHR::SRGB_NONLINEAR,
        ).unwrap();
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn test_format_filtered_by_color_space() {
        let available = [
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT),
            format(vk::Format::R8G8B8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let chosen = choose_surface_format(
            &available,
            &[vk::Format::B8G8R8A8_SRGB, vk::Format::R8G8B8A8_SRGB],
            vk::ColorSpaceKHR::SRGB_NONLINEAR,
        ).unwrap();
        assert_eq!(chosen, available[1]);
    }

    #[test]
    fn test_single_undefined_format_uses_first_preference() {
        let available = [format(vk::Format::UNDEFINED, vk::ColorSpaceKHR::SRGB_NONLINEAR)];
        let chosen = choose_surface_format(
            &available,
            &[vk::Format::R8G8B8A8_UNORM],
            vk::ColorSpaceKHR::SRGB_NONLINEAR,
        ).unwrap();
        assert_eq!(chosen.format, vk::Format::R8G8B8A8_UNORM);
        assert_eq!(chosen.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn test_no_match_falls_back_to_first_reported() {
        let available = [
            format(vk::Format::A2B10G10R10_UNORM_PACK32, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::R16G16B16A16_SFLOAT, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT),
        ];
        let chosen = choose_surface_format(
            &available,
            &[vk::Format::B8G8R8A8_SRGB],
            vk::ColorSpaceKHR::SRGB_NONLINEAR,
        ).unwrap();
        assert_eq!(chosen, available[0]);
    }

    #[test]
    fn test_empty_format_list_is_an_error() {
        let result = choose_surface_format(&[], &[vk::Format::B8G8R8A8_SRGB], vk::ColorSpaceKHR::SRGB_NONLINEAR);
        assert!(matches!(result, Err(VulkanError::SurfaceUnsupported(_))));
    }

    #[test]
    fn test_present_mode_preference_order() {
        let preferred = [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE];
        let available = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(&available, &preferred), vk::PresentModeKHR::MAILBOX);

        let available = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
        assert_eq!(choose_present_mode(&available, &preferred), vk::PresentModeKHR::IMMEDIATE);
    }

    #[test]
    fn test_present_mode_falls_back_to_fifo() {
        let available = [vk::PresentModeKHR::FIFO];
        let preferred = [vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(&available, &preferred), vk::PresentModeKHR::FIFO);
        assert_eq!(choose_present_mode(&available, &[]), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_extent_uses_current_extent_when_fixed() {
        let caps = caps(2, 3, (1280, 720));
        let extent = choose_extent(&caps, vk::Extent2D { width: 800, height: 600 });
        assert_eq!((extent.width, extent.height), (1280, 720));
    }

    #[test]
    fn test_extent_clamps_window_size_when_surface_defers() {
        let caps = caps(2, 3, (u32::MAX, u32::MAX));
        let extent = choose_extent(&caps, vk::Extent2D { width: 8000, height: 4 });
        assert_eq!((extent.width, extent.height), (4096, 16));
    }

    #[test]
    fn test_image_count_policy() {
        assert_eq!(choose_image_count(&caps(2, 0, (1, 1))), 3);
        assert_eq!(choose_image_count(&caps(2, 8, (1, 1))), 3);
        assert_eq!(choose_image_count(&caps(3, 3, (1, 1))), 3);
    }

    #[test]
    fn test_select_is_consistent_with_capabilities() {
        let support = SwapchainSupport {
            capabilities: caps(2, 4, (1024, 768)),
            formats: vec![format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR)],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
        };
        let config = SwapchainConfig::default();
        let settings = support.select(&config, vk::Extent2D { width: 1, height: 1 }).unwrap();

        assert_eq!(settings.extent, support.capabilities.current_extent);
        assert_eq!(settings.format.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(settings.present_mode, vk::PresentModeKHR::MAILBOX);
        assert!(settings.min_image_count >= support.capabilities.min_image_count);
        assert!(settings.min_image_count <= support.capabilities.max_image_count);
    }

    #[test]
    fn test_select_follows_configured_preferences() {
        let support = SwapchainSupport {
            capabilities: caps(2, 0, (640, 480)),
            formats: vec![
                format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
                format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            ],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE],
        };
        let config = SwapchainConfig {
            preferred_formats: vec![SurfaceFormatPreference::Bgra8Unorm],
            preferred_present_modes: vec![PresentModePreference::Immediate],
            ..SwapchainConfig::default()
        };
        let settings = support.select(&config, vk::Extent2D { width: 640, height: 480 }).unwrap();
        assert_eq!(settings.format.format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(settings.present_mode, vk::PresentModeKHR::IMMEDIATE);
    }

    #[test]
    fn test_select_rejects_zero_area_surface() {
        let support = SwapchainSupport {
            capabilities: caps(2, 3, (0, 0)),
            formats: vec![format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR)],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };
        let result = support.select(&SwapchainConfig::default(), vk::Extent2D { width: 0, height: 0 });
        assert!(matches!(result, Err(VulkanError::SurfaceUnsupported(_))));
    }

    #[test]
    fn test_zero_surface_extent_has_no_area_despite_window_size() {
        let support = SwapchainSupport {
            capabilities: caps(2, 3, (0, 0)),
            formats: vec![format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR)],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };
        assert!(!support.has_area(vk::Extent2D { width: 800, height: 600 }));

        let restored = SwapchainSupport {
            capabilities: caps(2, 3, (800, 600)),
            ..support
        };
        assert!(restored.has_area(vk::Extent2D { width: 800, height: 600 }));
    }
}
