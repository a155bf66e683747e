//! # Vulkan Kit
//!
//! Per-frame synchronization and swapchain recreation for ash-based renderers.
//!
//! ## Features
//!
//! - **Frames in flight**: fences and acquire semaphores per frame slot,
//!   render-finished semaphores per swapchain image
//! - **Swapchain recreation**: out-of-date and suboptimal results trigger an
//!   in-loop rebuild instead of an error
//! - **Minimized windows**: zero-area framebuffers pause GPU work
//! - **Configuration**: TOML or RON files with serde defaults
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vulkan_kit::prelude::*;
//!
//! struct Clear;
//!
//! impl FrameRenderer<VulkanFrameBackend> for Clear {
//!     fn record(&mut self, recorder: &mut VulkanFrameRecorder, _frame: &FrameInfo) -> VulkanResult<()> {
//!         let _pass = recorder.begin_render_pass([0.1, 0.1, 0.2, 1.0])?;
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = KitConfig::new("Demo");
//!     let mut window = Window::new(&config.window)?;
//!     let context = VulkanContext::new(&mut window, &config.application_name, config.validation_enabled())?;
//!     let backend = VulkanFrameBackend::new(context, &config, window.get_framebuffer_size())?;
//!     let mut frame_loop = FrameLoop::new(backend, config.frame_loop.clone())?;
//!     frame_loop.run(&mut window, &mut Clear)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc
)]

pub mod core;
pub mod config;
pub mod foundation;
pub mod render;

/// Common imports
pub mod prelude {
    pub use crate::config::{Config, ConfigError};
    pub use crate::core::{FrameLoopConfig, KitConfig, SwapchainConfig, WindowConfig};
    pub use crate::render::frame_loop::{
        FrameBackend, FrameError, FrameInfo, FrameLoop, FrameOutcome, FrameRenderer, FrameResult,
        FrameState, FrameStats, FrameWindow, SwapchainInfo, VulkanFrameBackend, VulkanFrameRecorder,
    };
    pub use crate::render::vulkan::{VulkanContext, VulkanError, VulkanResult, Window, WindowError};
}
