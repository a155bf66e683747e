//! Per-frame synchronization and swapchain recreation
//!
//! [`FrameLoop`] owns the ordering: fence wait, acquire, fence reset, record,
//! submit, present, advance. Stale swapchains are handled inside the loop by
//! draining the device and rebuilding. [`VulkanFrameBackend`] is the real
//! implementation of the [`FrameBackend`] seam; tests drive the loop with a
//! scripted backend instead.

mod backend;
mod counter;
mod driver;
mod error;
mod vulkan_backend;

#[cfg(test)]
mod tests;

pub use backend::{
    AcquireOutcome, FrameBackend, FrameInfo, FrameRenderer, FrameWindow, PresentOutcome,
    StaleReason, SwapchainInfo,
};
pub use counter::FrameCounter;
pub use driver::{FrameLoop, FrameOutcome, FrameStats, RebuildTrigger};
pub use error::{FrameError, FrameResult, FrameState};
pub use vulkan_backend::{VulkanFrameBackend, VulkanFrameRecorder};
