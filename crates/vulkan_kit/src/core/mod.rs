//! Core configuration types

pub mod config;

pub use config::{
    ColorSpacePreference, FrameLoopConfig, KitConfig, PresentModePreference,
    SurfaceFormatPreference, SwapchainConfig, WindowConfig,
};
