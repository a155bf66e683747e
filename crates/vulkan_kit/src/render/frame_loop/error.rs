//! Frame loop states and error taxonomy
//!
//! A stale swapchain is not an error: it never leaves the loop. Everything
//! here is fatal and carries the state the loop was in when it happened.

use std::fmt;
use thiserror::Error;

use crate::render::vulkan::VulkanError;

/// Frame loop state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameState {
    /// Between frames; the slot fence wait happens here
    Idle,
    /// Waiting for the presentation engine to hand out an image
    Acquiring,
    /// Fence reset and command buffer recording
    Recording,
    /// Queue submission
    Submitting,
    /// Queue present
    Presenting,
    /// Device idle wait, swapchain and target recreation
    Rebuilding,
}

impl fmt::Display for FrameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Acquiring => "acquiring",
            Self::Recording => "recording",
            Self::Submitting => "submitting",
            Self::Presenting => "presenting",
            Self::Rebuilding => "rebuilding",
        };
        f.write_str(name)
    }
}

/// Fatal frame loop errors
#[derive(Error, Debug)]
pub enum FrameError {
    /// The device was lost; nothing can be recovered
    #[error("device lost while {stage}")]
    DeviceLost {
        /// State the loop was in
        stage: FrameState,
    },

    /// A Vulkan call failed for a reason other than a stale swapchain
    #[error("Vulkan call failed while {stage}: {source}")]
    Api {
        /// State the loop was in
        stage: FrameState,
        /// Underlying error
        #[source]
        source: VulkanError,
    },

    /// Recreating the swapchain or its dependents failed
    #[error("swapchain rebuild failed: {source}")]
    Rebuild {
        /// Underlying error
        #[source]
        source: VulkanError,
    },

    /// The backend was built with a different slot count than the loop
    /// configuration asks for
    #[error("backend has {backend} frame slots, configuration asks for {configured}")]
    FrameSlotMismatch {
        /// Slots the backend owns
        backend: usize,
        /// `max_frames_in_flight` from the configuration
        configured: usize,
    },

    /// Caller render logic failed
    #[error("frame recording failed: {source}")]
    Record {
        /// Underlying error
        #[source]
        source: VulkanError,
    },
}

impl FrameError {
    /// Classify a Vulkan error raised in `stage`
    pub fn from_vulkan(stage: FrameState, error: VulkanError) -> Self {
        if error.is_device_lost() {
            return Self::DeviceLost { stage };
        }
        match stage {
            FrameState::Rebuilding => Self::Rebuild { source: error },
            _ => Self::Api { stage, source: error },
        }
    }

    /// Classify an error returned by the renderer's record callback
    pub fn from_record(error: VulkanError) -> Self {
        if error.is_device_lost() {
            Self::DeviceLost { stage: FrameState::Recording }
        } else {
            Self::Record { source: error }
        }
    }

    /// State the loop was in when the error happened
    pub fn stage(&self) -> FrameState {
        match self {
            Self::DeviceLost { stage } | Self::Api { stage, .. } => *stage,
            Self::FrameSlotMismatch { .. } => FrameState::Idle,
            Self::Rebuild { .. } => FrameState::Rebuilding,
            Self::Record { .. } => FrameState::Recording,
        }
    }

    /// Whether the device was lost
    pub fn is_device_lost(&self) -> bool {
        matches!(self, Self::DeviceLost { .. })
    }
}

/// Result type for frame loop operations
pub type FrameResult<T> = Result<T, FrameError>;
