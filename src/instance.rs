use std::ffi::{c_char, c_void, CStr, CString};

use ash::{
    extensions::{ext::DebugUtils, khr},
    vk,
};
use raw_window_handle::RawDisplayHandle;

use crate::{
    config::ContextConfig,
    debug::{self, DebugMessenger, DiagnosticCallback},
    error::{ContextError, Result},
};

pub struct Instance {
    pub entry: ash::Entry,
    pub handle: ash::Instance,
    pub validation_layers: Vec<CString>,
    debug_messenger: Option<DebugMessenger>,
    // Referenced by pointer from the messenger; dropped after the instance is gone.
    _diagnostics: Option<Box<Box<DiagnosticCallback>>>,
}

impl Instance {
    /// Creates the instance with diagnostics forwarded to `log` when validation is enabled.
    pub fn new(config: &ContextConfig, display: RawDisplayHandle) -> Result<Self> {
        Self::with_diagnostics(config, display, None)
    }

    pub fn with_diagnostics(
        config: &ContextConfig,
        display: RawDisplayHandle,
        callback: Option<Box<DiagnosticCallback>>,
    ) -> Result<Self> {
        let entry = unsafe { ash::Entry::load()? };

        let validation_layers = if config.enable_validation {
            let requested = config.validation_layer_names()?;
            let available = entry.enumerate_instance_layer_properties()?;
            let missing = missing_layers(&requested, &available);
            if !missing.is_empty() {
                return Err(ContextError::MissingValidationLayers(missing));
            }
            requested
        } else {
            Vec::new()
        };

        let diagnostics = config.enable_validation.then(|| {
            Box::new(callback.unwrap_or_else(|| {
                Box::new(debug::log_message) as Box<DiagnosticCallback>
            }))
        });
        let user_data = diagnostics
            .as_deref()
            .map_or(std::ptr::null_mut(), |boxed| {
                boxed as *const Box<DiagnosticCallback> as *mut c_void
            });

        let handle = {
            let application_name = CString::new(config.application_name())?;
            let application_version = vk::make_api_version(0, 1, 0, 0);
            let engine_name = CString::new("No Engine")?;
            let engine_version = vk::make_api_version(0, 1, 0, 0);

            let enabled_layer_names: Vec<*const c_char> =
                validation_layers.iter().map(|layer| layer.as_ptr()).collect();
            let enabled_extension_names: Vec<*const c_char> =
                required_extensions(display, config.enable_validation)?
                    .iter()
                    .map(|extension| extension.as_ptr())
                    .collect();

            // Chained so that instance creation and destruction are covered too.
            let mut debug_create_info = debug::messenger_create_info(user_data);
            let application_info = vk::ApplicationInfo::builder()
                .application_name(&application_name)
                .application_version(application_version)
                .engine_name(&engine_name)
                .engine_version(engine_version)
                .api_version(vk::API_VERSION_1_3);
            let mut create_info = vk::InstanceCreateInfo::builder()
                .application_info(&application_info)
                .enabled_layer_names(&enabled_layer_names)
                .enabled_extension_names(&enabled_extension_names);
            if config.enable_validation {
                create_info = create_info.push_next(&mut debug_create_info);
            }

            unsafe {
                entry
                    .create_instance(&create_info, None)
                    .map_err(ContextError::InstanceCreationFailed)?
            }
        };

        let debug_messenger = if config.enable_validation {
            match DebugMessenger::new(&entry, &handle, user_data) {
                Ok(messenger) => Some(messenger),
                Err(err) => {
                    unsafe { handle.destroy_instance(None) };
                    return Err(err);
                }
            }
        } else {
            None
        };

        log::info!(
            "created Vulkan instance (validation {})",
            if config.enable_validation { "on" } else { "off" }
        );

        Ok(Self {
            entry,
            handle,
            validation_layers,
            debug_messenger,
            _diagnostics: diagnostics,
        })
    }

    pub fn has_debug_messenger(&self) -> bool {
        self.debug_messenger.is_some()
    }

    /// Stops forwarding diagnostics. Messages raised afterwards are dropped.
    pub fn detach_debug_messenger(&mut self) {
        if let Some(messenger) = self.debug_messenger.take() {
            unsafe { messenger.destroy() };
        }
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        self.detach_debug_messenger();
        unsafe { self.handle.destroy_instance(None) };
        log::debug!("destroyed Vulkan instance");
    }
}

/// Instance extensions needed to present to a window on `display`, plus the
/// debug-utils extension when diagnostics are requested.
pub fn required_extensions(
    display: RawDisplayHandle,
    enable_validation: bool,
) -> Result<Vec<&'static CStr>> {
    let platform_surface = match display {
        RawDisplayHandle::Windows(_) => khr::Win32Surface::name(),
        RawDisplayHandle::Xlib(_) => khr::XlibSurface::name(),
        RawDisplayHandle::Xcb(_) => khr::XcbSurface::name(),
        RawDisplayHandle::Wayland(_) => khr::WaylandSurface::name(),
        other => return Err(ContextError::UnsupportedPlatform(format!("{other:?}"))),
    };
    let mut extensions = vec![khr::Surface::name(), platform_surface];
    if enable_validation {
        extensions.push(DebugUtils::name());
    }
    Ok(extensions)
}

/// Requested layer names the loader does not report, in request order.
pub fn missing_layers(requested: &[CString], available: &[vk::LayerProperties]) -> Vec<String> {
    requested
        .iter()
        .filter(|layer| {
            !available.iter().any(|properties| {
                let name = unsafe { CStr::from_ptr(properties.layer_name.as_ptr()) };
                name == layer.as_c_str()
            })
        })
        .map(|layer| layer.to_string_lossy().into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use raw_window_handle::{WaylandDisplayHandle, WindowsDisplayHandle};
    use std::ptr::NonNull;

    use super::*;

    fn layer(name: &str) -> vk::LayerProperties {
        let mut properties = vk::LayerProperties::default();
        for (dst, src) in properties.layer_name.iter_mut().zip(name.bytes()) {
            *dst = src as c_char;
        }
        properties
    }

    #[test]
    fn missing_layers_reports_only_absent_names() {
        let requested = vec![
            CString::new("VK_LAYER_KHRONOS_validation").unwrap(),
            CString::new("VK_LAYER_LUNARG_monitor").unwrap(),
        ];
        let available = [layer("VK_LAYER_KHRONOS_validation"), layer("VK_LAYER_MESA_overlay")];
        assert_eq!(missing_layers(&requested, &available), vec!["VK_LAYER_LUNARG_monitor"]);
        assert!(missing_layers(&requested[..1], &available).is_empty());
        assert!(missing_layers(&[], &[]).is_empty());
    }

    #[test]
    fn windows_needs_win32_surface() {
        let display = RawDisplayHandle::Windows(WindowsDisplayHandle::new());
        let extensions = required_extensions(display, false).unwrap();
        assert_eq!(extensions, vec![khr::Surface::name(), khr::Win32Surface::name()]);
    }

    #[test]
    fn validation_adds_debug_utils() {
        let mut wl_display = 0u8;
        let display = RawDisplayHandle::Wayland(WaylandDisplayHandle::new(
            NonNull::from(&mut wl_display).cast(),
        ));
        let extensions = required_extensions(display, true).unwrap();
        assert_eq!(
            extensions,
            vec![
                khr::Surface::name(),
                khr::WaylandSurface::name(),
                DebugUtils::name()
            ]
        );
    }
}
