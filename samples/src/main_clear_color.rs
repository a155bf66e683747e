//! Clear-color demo
//!
//! Cycles the background color and draws a centered square with attachment
//! clears. Resize or minimize the window to exercise swapchain rebuilds.
//! Settings are read from `vulkan_kit.toml` when present.

use std::time::Instant;

use ash::vk;
use vulkan_kit::foundation::logging;
use vulkan_kit::prelude::*;

const CONFIG_PATH: &str = "vulkan_kit.toml";

struct ClearColorRenderer {
    start: Instant,
    rebuilds: u32,
}

impl ClearColorRenderer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            rebuilds: 0,
        }
    }

    fn background(&self) -> [f32; 4] {
        let t = self.start.elapsed().as_secs_f32();
        [
            0.5 + 0.5 * (t * 0.7).sin(),
            0.5 + 0.5 * (t * 1.1 + 2.0).sin(),
            0.5 + 0.5 * (t * 1.3 + 4.0).sin(),
            1.0,
        ]
    }
}

fn centered_square(extent: vk::Extent2D) -> vk::ClearRect {
    let side = extent.width.min(extent.height) / 3;
    vk::ClearRect {
        rect: vk::Rect2D {
            offset: vk::Offset2D {
                x: ((extent.width - side) / 2) as i32,
                y: ((extent.height - side) / 2) as i32,
            },
            extent: vk::Extent2D { width: side, height: side },
        },
        base_array_layer: 0,
        layer_count: 1,
    }
}

impl FrameRenderer<VulkanFrameBackend> for ClearColorRenderer {
    fn record(&mut self, recorder: &mut VulkanFrameRecorder, frame: &FrameInfo) -> VulkanResult<()> {
        let background = self.background();
        let square = centered_square(frame.extent);
        let mut pass = recorder.begin_render_pass(background)?;
        if square.rect.extent.width > 0 {
            let inverted = [1.0 - background[0], 1.0 - background[1], 1.0 - background[2], 1.0];
            pass.clear_color_rects(inverted, &[square]);
        }
        Ok(())
    }

    fn swapchain_rebuilt(&mut self, info: &SwapchainInfo) -> VulkanResult<()> {
        self.rebuilds += 1;
        log::info!(
            "Renderer notified of rebuild #{}: {}x{} {:?}",
            self.rebuilds,
            info.extent.width,
            info.extent.height,
            info.format
        );
        Ok(())
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = KitConfig::load_or_default(CONFIG_PATH)?;
    config.validate()?;
    log::info!("Configuration: {:?}", config);

    let mut window = Window::new(&config.window)?;
    let context = VulkanContext::new(&mut window, &config.application_name, config.validation_enabled())?;
    log::info!("Using device {}", context.physical_device.name());

    let backend = VulkanFrameBackend::new(context, &config, window.get_framebuffer_size())?;
    let mut frame_loop = FrameLoop::new(backend, config.frame_loop.clone())?;
    let mut renderer = ClearColorRenderer::new();

    let stats = frame_loop.run(&mut window, &mut renderer)?;
    log::info!(
        "Presented {} frames, {} rebuilds, {} dropped, {} minimized waits",
        stats.frames_presented,
        stats.rebuilds,
        stats.dropped_frames,
        stats.minimized_waits
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_level(log::LevelFilter::Info);

    log::info!("Starting clear-color demo");

    match run() {
        Ok(()) => {
            log::info!("Clear-color demo finished");
            Ok(())
        }
        Err(e) => {
            log::error!("Clear-color demo failed: {}", e);
            Err(e)
        }
    }
}
