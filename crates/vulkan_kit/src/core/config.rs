//! # Kit Configuration
//!
//! Plain configuration structs replacing builder chains. Every struct has a
//! usable `Default`, can be loaded from TOML or RON through the [`Config`]
//! trait, and is checked once by [`KitConfig::validate`] before any Vulkan
//! object is created.

use ash::vk;
use serde::{Serialize, Deserialize};

pub use crate::config::{Config, ConfigError};

/// Upper bound accepted for frames in flight
pub const MAX_FRAMES_IN_FLIGHT_LIMIT: usize = 8;

/// Surface formats the swapchain may be created with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceFormatPreference {
    /// `B8G8R8A8_SRGB`
    Bgra8Srgb,
    /// `R8G8B8A8_SRGB`
    Rgba8Srgb,
    /// `B8G8R8A8_UNORM`
    Bgra8Unorm,
    /// `R8G8B8A8_UNORM`
    Rgba8Unorm,
}

impl SurfaceFormatPreference {
    /// Vulkan format for this preference
    pub fn to_vk(self) -> vk::Format {
        match self {
            Self::Bgra8Srgb => vk::Format::B8G8R8A8_SRGB,
            Self::Rgba8Srgb => vk::Format::R8G8B8A8_SRGB,
            Self::Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
            Self::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
        }
    }
}

/// Color space every candidate surface format is filtered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSpacePreference {
    /// `SRGB_NONLINEAR_KHR`
    SrgbNonlinear,
    /// `DISPLAY_P3_NONLINEAR_EXT`
    DisplayP3Nonlinear,
    /// `EXTENDED_SRGB_LINEAR_EXT`
    ExtendedSrgbLinear,
}

impl ColorSpacePreference {
    /// Vulkan color space for this preference
    pub fn to_vk(self) -> vk::ColorSpaceKHR {
        match self {
            Self::SrgbNonlinear => vk::ColorSpaceKHR::SRGB_NONLINEAR,
            Self::DisplayP3Nonlinear => vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT,
            Self::ExtendedSrgbLinear => vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
        }
    }
}

/// Presentation modes in order of preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentModePreference {
    /// Low-latency triple buffering
    Mailbox,
    /// No vsync, may tear
    Immediate,
    /// Vsync that tears when late
    FifoRelaxed,
    /// Vsync, always supported
    Fifo,
}

impl PresentModePreference {
    /// Vulkan present mode for this preference
    pub fn to_vk(self) -> vk::PresentModeKHR {
        match self {
            Self::Mailbox => vk::PresentModeKHR::MAILBOX,
            Self::Immediate => vk::PresentModeKHR::IMMEDIATE,
            Self::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
            Self::Fifo => vk::PresentModeKHR::FIFO,
        }
    }
}

/// Swapchain selection policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapchainConfig {
    /// Formats tried in order against what the surface reports
    pub preferred_formats: Vec<SurfaceFormatPreference>,
    /// Fixed color space the format search is filtered by
    pub color_space: ColorSpacePreference,
    /// Present modes tried in order; FIFO is used when none match
    pub preferred_present_modes: Vec<PresentModePreference>,
}

impl SwapchainConfig {
    /// Preferred formats as Vulkan values
    pub fn vk_formats(&self) -> Vec<vk::Format> {
        self.preferred_formats.iter().map(|f| f.to_vk()).collect()
    }

    /// Preferred present modes as Vulkan values
    pub fn vk_present_modes(&self) -> Vec<vk::PresentModeKHR> {
        self.preferred_present_modes.iter().map(|m| m.to_vk()).collect()
    }
}

impl Default for SwapchainConfig {
    fn default() -> Self {
        Self {
            preferred_formats: vec![
                SurfaceFormatPreference::Bgra8Srgb,
                SurfaceFormatPreference::Rgba8Srgb,
            ],
            color_space: ColorSpacePreference::SrgbNonlinear,
            preferred_present_modes: vec![
                PresentModePreference::Mailbox,
                PresentModePreference::Immediate,
            ],
        }
    }
}

/// Frame loop pacing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameLoopConfig {
    /// Number of frames the CPU may record ahead of the GPU
    pub max_frames_in_flight: usize,
    /// Fence wait timeout in nanoseconds; `u64::MAX` never times out
    pub fence_timeout_ns: u64,
    /// How long to sleep per iteration while the window has zero area
    pub minimized_poll_interval_ms: u64,
}

impl FrameLoopConfig {
    /// Sleep interval used while minimized
    pub fn minimized_poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.minimized_poll_interval_ms)
    }
}

impl Default for FrameLoopConfig {
    fn default() -> Self {
        Self {
            max_frames_in_flight: 2,
            fence_timeout_ns: u64::MAX,
            minimized_poll_interval_ms: 100,
        }
    }
}

/// Window creation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial width in screen coordinates
    pub width: u32,
    /// Initial height in screen coordinates
    pub height: u32,
    /// Whether the user can resize the window
    pub resizable: bool,
    /// Whether pressing Escape requests close
    pub close_on_escape: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "vulkan_kit".to_string(),
            width: 800,
            height: 600,
            resizable: true,
            close_on_escape: true,
        }
    }
}

/// Top-level configuration for a windowed Vulkan application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KitConfig {
    /// Application name for Vulkan instance creation
    pub application_name: String,
    /// Whether to enable Vulkan validation layers; `None` follows the build type
    pub enable_validation: Option<bool>,
    /// Window parameters
    pub window: WindowConfig,
    /// Swapchain selection policy
    pub swapchain: SwapchainConfig,
    /// Frame loop pacing
    pub frame_loop: FrameLoopConfig,
}

impl KitConfig {
    /// Create a configuration with defaults for everything but the name
    pub fn new(app_name: impl Into<String>) -> Self {
        let application_name = app_name.into();
        Self {
            window: WindowConfig {
                title: application_name.clone(),
                ..WindowConfig::default()
            },
            application_name,
            ..Self::default()
        }
    }

    /// Set the number of frames in flight
    pub fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frame_loop.max_frames_in_flight = frames;
        self
    }

    /// Set the initial window size
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window.width = width;
        self.window.height = height;
        self
    }

    /// Whether validation layers should be requested
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    /// Check the configuration before it is used
    pub fn validate(&self) -> Result<(), ConfigError> {
        let frames = self.frame_loop.max_frames_in_flight;
        if frames == 0 || frames > MAX_FRAMES_IN_FLIGHT_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_frames_in_flight must be in 1..={}, got {}",
                MAX_FRAMES_IN_FLIGHT_LIMIT, frames
            )));
        }
        if self.frame_loop.fence_timeout_ns == 0 {
            return Err(ConfigError::Invalid("fence_timeout_ns must be non-zero".to_string()));
        }
        if self.swapchain.preferred_formats.is_empty() {
            return Err(ConfigError::Invalid("preferred_formats is empty".to_string()));
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        Ok(())
    }
}

impl Default for KitConfig {
    fn default() -> Self {
        Self {
            application_name: "vulkan_kit".to_string(),
            enable_validation: None,
            window: WindowConfig::default(),
            swapchain: SwapchainConfig::default(),
            frame_loop: FrameLoopConfig::default(),
        }
    }
}

impl Config for KitConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = KitConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frame_loop.max_frames_in_flight, 2);
        assert_eq!(config.frame_loop.fence_timeout_ns, u64::MAX);
        assert_eq!(config.frame_loop.minimized_poll_interval_ms, 100);
    }

    #[test]
    fn test_default_present_mode_order() {
        let modes = SwapchainConfig::default().vk_present_modes();
        assert_eq!(modes, vec![vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]);
    }

    #[test]
    fn test_rejects_zero_frames_in_flight() {
        let config = KitConfig::new("test").with_frames_in_flight(0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_too_many_frames_in_flight() {
        let config = KitConfig::new("test").with_frames_in_flight(MAX_FRAMES_IN_FLIGHT_LIMIT + 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_format_list() {
        let mut config = KitConfig::new("test");
        config.swapchain.preferred_formats.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_new_uses_name_as_title() {
        let config = KitConfig::new("quad").with_window_size(1024, 768);
        assert_eq!(config.window.title, "quad");
        assert_eq!((config.window.width, config.window.height), (1024, 768));
    }

    #[test]
    fn test_parse_partial_toml() {
        let text = r#"
            application_name = "triangle"

            [frame_loop]
            max_frames_in_flight = 3

            [swapchain]
            preferred_present_modes = ["fifo_relaxed"]
        "#;
        let config = KitConfig::parse("kit.toml", text).unwrap();
        assert_eq!(config.application_name, "triangle");
        assert_eq!(config.frame_loop.max_frames_in_flight, 3);
        assert_eq!(config.frame_loop.minimized_poll_interval_ms, 100);
        assert_eq!(
            config.swapchain.preferred_present_modes,
            vec![PresentModePreference::FifoRelaxed]
        );
        assert_eq!(config.swapchain.color_space, ColorSpacePreference::SrgbNonlinear);
    }

    #[test]
    fn test_parse_ron() {
        let text = r#"(application_name: "ron_app", frame_loop: (max_frames_in_flight: 1))"#;
        let config = KitConfig::parse("kit.ron", text).unwrap();
        assert_eq!(config.application_name, "ron_app");
        assert_eq!(config.frame_loop.max_frames_in_flight, 1);
    }

    #[test]
    fn test_escape_closes_by_default() {
        assert!(KitConfig::default().window.close_on_escape);

        let text = r#"
            [window]
            close_on_escape = false
        "#;
        let config = KitConfig::parse("kit.toml", text).unwrap();
        assert!(!config.window.close_on_escape);
        assert_eq!(config.window.width, 800);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = KitConfig::parse("kit.json", "{}");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let config = KitConfig::load_or_default("definitely/not/here/kit.toml").unwrap();
        assert_eq!(config, KitConfig::default());
    }
}
