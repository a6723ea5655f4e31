//! Vulkan context bring-up: window, instance, surface, device selection and
//! logical device creation.

pub mod config;
pub mod context;
pub mod debug;
pub mod device;
pub mod error;
pub mod instance;
pub mod physical_device;
pub mod queue_family;
pub mod surface;
pub mod swapchain;
pub mod window;

pub use config::{ContextConfig, WindowConfig};
pub use context::{Context, ContextSetup, Stage};
pub use error::{ContextError, Result};
