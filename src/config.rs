//! Settings consumed by context setup.
//!
//! Both name lists are turned into `CString`s once, when the context is built,
//! and stay fixed for the lifetime of that context.

use std::{ffi::CString, path::Path};

use serde::Deserialize;

use crate::error::Result;

pub const KHRONOS_VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";
pub const SWAPCHAIN_EXTENSION: &str = "VK_KHR_swapchain";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "Vulkan App".to_owned(),
            resizable: true,
        }
    }
}

impl WindowConfig {
    pub fn new(width: u32, height: u32, title: impl Into<String>) -> Self {
        Self {
            width,
            height,
            title: title.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Reported to the driver in the application info. Falls back to the window title.
    pub application_name: Option<String>,
    /// Turns on the validation layers and the debug messenger.
    pub enable_validation: bool,
    pub validation_layers: Vec<String>,
    pub device_extensions: Vec<String>,
    pub window: WindowConfig,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            application_name: None,
            enable_validation: cfg!(debug_assertions),
            validation_layers: vec![KHRONOS_VALIDATION_LAYER.to_owned()],
            device_extensions: vec![SWAPCHAIN_EXTENSION.to_owned()],
            window: WindowConfig::default(),
        }
    }
}

impl ContextConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn application_name(&self) -> &str {
        self.application_name.as_deref().unwrap_or(&self.window.title)
    }

    pub fn validation_layer_names(&self) -> Result<Vec<CString>> {
        to_c_strings(&self.validation_layers)
    }

    pub fn device_extension_names(&self) -> Result<Vec<CString>> {
        to_c_strings(&self.device_extensions)
    }
}

fn to_c_strings(names: &[String]) -> Result<Vec<CString>> {
    Ok(names
        .iter()
        .map(|name| CString::new(name.as_str()))
        .collect::<std::result::Result<_, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContextError;

    #[test]
    fn defaults_request_swapchain_and_khronos_validation() {
        let config = ContextConfig::default();
        assert_eq!(config.device_extensions, vec!["VK_KHR_swapchain"]);
        assert_eq!(config.validation_layers, vec!["VK_LAYER_KHRONOS_validation"]);
        assert_eq!(config.enable_validation, cfg!(debug_assertions));
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.application_name(), "Vulkan App");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ContextConfig::from_toml_str(
            r#"
            enable_validation = false

            [window]
            width = 1920
            height = 1080
            title = "Window Title"
            "#,
        )
        .unwrap();
        assert!(!config.enable_validation);
        assert_eq!(config.window, WindowConfig::new(1920, 1080, "Window Title"));
        assert_eq!(config.device_extensions, vec!["VK_KHR_swapchain"]);
        assert_eq!(config.application_name(), "Window Title");
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = ContextConfig::from_toml_str("window = 3").unwrap_err();
        assert!(matches!(err, ContextError::ConfigParse(_)));
    }

    #[test]
    fn interior_nul_in_extension_name_is_rejected() {
        let config = ContextConfig {
            device_extensions: vec!["VK_KHR\0swapchain".to_owned()],
            ..ContextConfig::default()
        };
        assert!(matches!(
            config.device_extension_names(),
            Err(ContextError::InvalidName(_))
        ));
    }
}
