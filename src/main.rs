// =============================================================================
// VULKAN BRING-UP
// =============================================================================
//
// Opens a window, creates a Vulkan instance (with validation in debug builds),
// picks a GPU and creates a logical device with one graphics queue. Nothing is
// rendered yet: the loop only pumps window events until the window closes.
//
// PHASES:
// 1. Window
// 2. Instance (+ debug messenger)
// 3. Physical device + logical device + graphics queue
// 4. Event loop, then teardown in reverse order
//
// =============================================================================

mod backend;
mod config;
mod logging;

use anyhow::Result;
use backend::{BringUpError, Validation, VulkanContext};
use config::{Config, CONFIG_PATH};
use logging::init_logging;
use raw_window_handle::HasRawDisplayHandle;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowAttributes},
};

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> Result<()> {
    let (config, config_error) = match Config::load_from_path(CONFIG_PATH) {
        Ok(Some(config)) => (config, None),
        Ok(None) => (Config::default(), None),
        Err(e) => (Config::default(), Some(e)),
    };

    init_logging(config.debug.log_level.as_deref());

    match config_error {
        Some(e) => log::warn!("Failed to load {}: {:#}. Using defaults.", CONFIG_PATH, e),
        None => log::debug!("Config: {:?}", config),
    }

    log::info!("Starting Vulkan bring-up");
    log::info!("Window: {}x{}", config.window.width, config.window.height);

    let event_loop = EventLoop::new()?;
    // Drain pending events and come straight back, like a poll loop
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    // Errors raised inside event callbacks surface here so the exit status is 1
    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// Owns the window and every Vulkan object.
///
/// IMPORTANT: Field order matters for Drop! The Vulkan context must go before
/// the window it was created for.
struct App {
    config: Config,
    validation: Validation,
    context: Option<VulkanContext>,
    window: Option<Window>,
    /// First fatal error, returned from `main` once the loop exits
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: Config) -> Self {
        let validation = Validation::for_build(config.debug.validation_layers);
        Self {
            config,
            validation,
            context: None,
            window: None,
            error: None,
        }
    }

    fn create_window(&self, event_loop: &ActiveEventLoop) -> Result<Window> {
        // winit never attaches a client graphics API context to the window
        let window_attributes = WindowAttributes::default()
            .with_title(&self.config.window.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ))
            .with_resizable(self.config.window.resizable);

        let window = event_loop
            .create_window(window_attributes)
            .map_err(|e| BringUpError::WindowCreation(e.to_string()))?;
        Ok(window)
    }

    /// Window, then Vulkan. Stops at the first failure.
    fn bring_up(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = self.create_window(event_loop)?;
        let validation = if self.validation.enabled { "with" } else { "without" };
        log::info!("Window created ({} validation)", validation);

        let context = VulkanContext::new(
            &self.config.window.title,
            window.raw_display_handle(),
            &self.validation,
            self.config.gpu.selection,
        );
        // The window has to outlive the context either way
        self.window = Some(window);
        let context = context?;

        log::info!(
            "Ready on {}: graphics queue {:?} from family {} (debug messenger: {})",
            context.gpu.candidate,
            context.graphics_queue(),
            context.device.graphics_queue_family,
            context.has_debug_messenger()
        );

        self.context = Some(context);
        Ok(())
    }

    /// Device, messenger, instance (inside the context), then the window.
    fn teardown(&mut self) {
        if self.context.is_some() || self.window.is_some() {
            log::info!("Cleaning up...");
        }
        self.context = None;
        self.window = None;
    }

    /// Reported once, by `main`, after the loop exits.
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
        self.teardown();
        event_loop.exit();
    }
}

// =============================================================================
// EVENT HANDLING
// =============================================================================

impl ApplicationHandler for App {
    /// Called when the application is ready to create windows.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.error.is_some() {
            return;
        }

        if let Err(e) = self.bring_up(event_loop) {
            self.fail(event_loop, e);
        }
    }

    /// Handle window events.
    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        // No rendering yet: closing is the only event with an effect
        if let WindowEvent::CloseRequested = event {
            log::info!("Close requested, shutting down...");
            self.teardown();
            event_loop.exit();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.teardown();
        log::info!("Cleanup complete");
    }
}
