use ash::vk;
use thiserror::Error;

use crate::context::Stage;

/// Errors raised while bringing up a rendering context.
///
/// Every variant is terminal for the setup procedure: nothing here is retried.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("failed to load the Vulkan library: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error("failed to create the Vulkan instance: {0}")]
    InstanceCreationFailed(vk::Result),

    #[error("validation layers requested but not available: {}", .0.join(", "))]
    MissingValidationLayers(Vec<String>),

    #[error("failed to set up the debug messenger: {0}")]
    DiagnosticsSetupFailed(vk::Result),

    #[error("failed to create the window: {0}")]
    WindowCreationFailed(String),

    #[error("no surface support for this windowing platform: {0}")]
    UnsupportedPlatform(String),

    #[error("failed to create the window surface: {0}")]
    SurfaceCreationFailed(vk::Result),

    #[error("failed to find GPUs with Vulkan support")]
    NoDevicesAvailable,

    #[error("none of the {candidates} GPU(s) found is suitable")]
    NoSuitableDevice { candidates: usize },

    #[error("failed to create the logical device: {0}")]
    DeviceCreationFailed(vk::Result),

    #[error("setup step out of order: expected stage {expected:?}, context is at {actual:?}")]
    OutOfOrder { expected: Stage, actual: Stage },

    #[error("Vulkan call failed: {0}")]
    Vulkan(#[from] vk::Result),

    #[error("invalid layer or extension name: {0}")]
    InvalidName(#[from] std::ffi::NulError),

    #[error("failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ContextError>;
