//! Rendering
//!
//! `vulkan` holds the API wrappers; `frame_loop` drives them once per frame.

pub mod vulkan;
pub mod frame_loop;
