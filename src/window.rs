use std::{sync::Arc, time::Duration};

use raw_window_handle::{HasDisplayHandle, RawDisplayHandle};
use winit::{
    dpi::LogicalSize,
    event::{Event, WindowEvent},
    event_loop::EventLoop,
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::WindowBuilder,
};

use crate::{
    config::WindowConfig,
    error::{ContextError, Result},
    instance::Instance,
    surface::Surface,
};

/// A native window driven by polling rather than by a blocking event loop.
pub struct Window {
    pub handle: winit::window::Window,
    event_loop: EventLoop<()>,
    open: bool,
    resized: bool,
}

impl Window {
    pub fn new(config: &WindowConfig) -> Result<Self> {
        let event_loop =
            EventLoop::new().map_err(|err| ContextError::WindowCreationFailed(err.to_string()))?;
        let handle = WindowBuilder::new()
            .with_title(config.title.as_str())
            .with_inner_size(LogicalSize::new(config.width, config.height))
            .with_resizable(config.resizable)
            .build(&event_loop)
            .map_err(|err| ContextError::WindowCreationFailed(err.to_string()))?;
        Ok(Self {
            handle,
            event_loop,
            open: true,
            resized: false,
        })
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Handles whatever events are pending and returns without waiting.
    pub fn poll_events(&mut self) {
        let open = &mut self.open;
        let resized = &mut self.resized;
        let status = self
            .event_loop
            .pump_events(Some(Duration::ZERO), |event, elwt| {
                if let Event::WindowEvent { event, .. } = event {
                    match event {
                        WindowEvent::CloseRequested => {
                            *open = false;
                            elwt.exit();
                        }
                        WindowEvent::Resized(_) => *resized = true,
                        _ => (),
                    }
                }
            });
        if let PumpStatus::Exit(_) = status {
            self.open = false;
        }
    }

    /// Reports a framebuffer resize since the last call.
    pub fn take_resized(&mut self) -> bool {
        std::mem::take(&mut self.resized)
    }

    pub fn raw_display_handle(&self) -> Result<RawDisplayHandle> {
        Ok(self
            .handle
            .display_handle()
            .map_err(|err| ContextError::UnsupportedPlatform(err.to_string()))?
            .as_raw())
    }

    pub fn create_surface(&self, instance: &Arc<Instance>) -> Result<Surface> {
        Surface::new(&self.handle, instance)
    }
}
