//! Ordered bring-up of a rendering context.
//!
//! Setup runs as discrete steps, each moving the context one [`Stage`] forward:
//! create the instance, create the surface, select a device, build the logical
//! device. [`Context::new`] runs them all; [`ContextSetup`] exposes them one by one.

use std::{ffi::CString, sync::Arc};

use crate::{
    config::ContextConfig,
    debug::DiagnosticCallback,
    device::Device,
    error::{ContextError, Result},
    instance::Instance,
    physical_device::PhysicalDevice,
    surface::Surface,
    window::Window,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Uninitialized,
    InstanceCreated,
    SurfaceCreated,
    DeviceSelected,
    LogicalDeviceReady,
    Destroyed,
}

impl Stage {
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Uninitialized => Some(Self::InstanceCreated),
            Self::InstanceCreated => Some(Self::SurfaceCreated),
            Self::SurfaceCreated => Some(Self::DeviceSelected),
            Self::DeviceSelected => Some(Self::LogicalDeviceReady),
            Self::LogicalDeviceReady => Some(Self::Destroyed),
            Self::Destroyed => None,
        }
    }

    /// Moves one step forward from `expected`. There is no way back.
    pub fn advance(&mut self, expected: Stage) -> Result<()> {
        match self.next() {
            Some(next) if *self == expected => {
                *self = next;
                Ok(())
            }
            _ => Err(ContextError::OutOfOrder {
                expected,
                actual: *self,
            }),
        }
    }
}

/// Step-by-step setup. Each step fails with [`ContextError::OutOfOrder`] when
/// called at the wrong stage; any other failure leaves the setup unusable.
pub struct ContextSetup {
    config: ContextConfig,
    window: Window,
    device_extensions: Vec<CString>,
    stage: Stage,
    instance: Option<Arc<Instance>>,
    surface: Option<Surface>,
    physical_device: Option<PhysicalDevice>,
}

impl ContextSetup {
    pub fn new(config: ContextConfig, window: Window) -> Result<Self> {
        let device_extensions = config.device_extension_names()?;
        Ok(Self {
            config,
            window,
            device_extensions,
            stage: Stage::Uninitialized,
            instance: None,
            surface: None,
            physical_device: None,
        })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn create_instance(&mut self) -> Result<&Arc<Instance>> {
        self.create_instance_with(None)
    }

    /// Like [`Self::create_instance`], routing validation messages to `callback`.
    pub fn create_instance_with(
        &mut self,
        callback: Option<Box<DiagnosticCallback>>,
    ) -> Result<&Arc<Instance>> {
        self.expect(Stage::Uninitialized)?;
        let instance = Instance::with_diagnostics(
            &self.config,
            self.window.raw_display_handle()?,
            callback,
        )?;
        self.stage.advance(Stage::Uninitialized)?;
        Ok(self.instance.insert(Arc::new(instance)))
    }

    pub fn create_surface(&mut self) -> Result<&Surface> {
        self.expect(Stage::InstanceCreated)?;
        let surface = self.window.create_surface(self.instance()?)?;
        self.stage.advance(Stage::InstanceCreated)?;
        Ok(self.surface.insert(surface))
    }

    pub fn select_device(&mut self) -> Result<&PhysicalDevice> {
        self.expect(Stage::SurfaceCreated)?;
        let surface = self.surface.as_ref().ok_or(ContextError::OutOfOrder {
            expected: Stage::SurfaceCreated,
            actual: self.stage,
        })?;
        let physical_device =
            PhysicalDevice::select(self.instance()?, surface, &self.device_extensions)?;
        self.stage.advance(Stage::SurfaceCreated)?;
        Ok(self.physical_device.insert(physical_device))
    }

    pub fn build_logical_device(mut self) -> Result<Context> {
        self.expect(Stage::DeviceSelected)?;
        let instance = self.instance()?.clone();
        let (Some(surface), Some(physical_device)) = (self.surface.take(), self.physical_device.take())
        else {
            return Err(ContextError::OutOfOrder {
                expected: Stage::DeviceSelected,
                actual: self.stage,
            });
        };
        let device = Device::new(instance.clone(), physical_device, &self.device_extensions)?;
        self.stage.advance(Stage::DeviceSelected)?;
        Ok(Context {
            device,
            surface,
            window: self.window,
            config: self.config,
            stage: self.stage,
            instance,
        })
    }

    fn expect(&self, expected: Stage) -> Result<()> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(ContextError::OutOfOrder {
                expected,
                actual: self.stage,
            })
        }
    }

    fn instance(&self) -> Result<&Arc<Instance>> {
        self.instance.as_ref().ok_or(ContextError::OutOfOrder {
            expected: Stage::InstanceCreated,
            actual: self.stage,
        })
    }
}

/// A ready rendering context. Owns its window exclusively.
///
/// Fields drop in declaration order: logical device, surface, window, and the
/// instance last.
pub struct Context {
    pub device: Device,
    pub surface: Surface,
    pub window: Window,
    pub config: ContextConfig,
    stage: Stage,
    instance: Arc<Instance>,
}

impl Context {
    pub fn new(config: ContextConfig) -> Result<Self> {
        let window = Window::new(&config.window)?;
        Self::with_window(config, window)
    }

    pub fn with_window(config: ContextConfig, window: Window) -> Result<Self> {
        let mut setup = ContextSetup::new(config, window)?;
        setup.create_instance()?;
        setup.create_surface()?;
        setup.select_device()?;
        setup.build_logical_device()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    pub fn physical_device(&self) -> &PhysicalDevice {
        &self.device.physical_device
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn poll_events(&mut self) {
        self.window.poll_events();
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.stage = Stage::Destroyed;
        log::info!("destroying rendering context");
    }
}
