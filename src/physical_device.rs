use std::{
    collections::BTreeSet,
    ffi::{CStr, CString},
};

use ash::vk;
use thiserror::Error;

use crate::{
    error::{ContextError, Result},
    instance::Instance,
    queue_family::{QueueFamily, QueueFamilyIndices, ResolvedQueueFamilies},
    surface::Surface,
    swapchain::SwapChainSupportDetails,
};

/// The driver queries device selection depends on.
///
/// [`DriverQueries`] answers them from a live instance and surface.
pub trait DeviceQueries {
    fn physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>>;
    fn properties(&self, device: vk::PhysicalDevice) -> vk::PhysicalDeviceProperties;
    fn features(&self, device: vk::PhysicalDevice) -> vk::PhysicalDeviceFeatures;
    fn memory_properties(&self, device: vk::PhysicalDevice) -> vk::PhysicalDeviceMemoryProperties;
    fn queue_family_properties(&self, device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties>;
    fn surface_support(&self, device: vk::PhysicalDevice, queue_family_index: u32) -> Result<bool>;
    fn extension_properties(&self, device: vk::PhysicalDevice) -> Result<Vec<vk::ExtensionProperties>>;
    fn swapchain_support(&self, device: vk::PhysicalDevice) -> Result<SwapChainSupportDetails>;
}

pub struct DriverQueries<'a> {
    pub instance: &'a Instance,
    pub surface: &'a Surface,
}

impl DeviceQueries for DriverQueries<'_> {
    fn physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>> {
        Ok(unsafe { self.instance.handle.enumerate_physical_devices()? })
    }

    fn properties(&self, device: vk::PhysicalDevice) -> vk::PhysicalDeviceProperties {
        unsafe { self.instance.handle.get_physical_device_properties(device) }
    }

    fn features(&self, device: vk::PhysicalDevice) -> vk::PhysicalDeviceFeatures {
        unsafe { self.instance.handle.get_physical_device_features(device) }
    }

    fn memory_properties(&self, device: vk::PhysicalDevice) -> vk::PhysicalDeviceMemoryProperties {
        unsafe {
            self.instance
                .handle
                .get_physical_device_memory_properties(device)
        }
    }

    fn queue_family_properties(&self, device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
        unsafe {
            self.instance
                .handle
                .get_physical_device_queue_family_properties(device)
        }
    }

    fn surface_support(&self, device: vk::PhysicalDevice, queue_family_index: u32) -> Result<bool> {
        self.surface.physical_device_support(device, queue_family_index)
    }

    fn extension_properties(&self, device: vk::PhysicalDevice) -> Result<Vec<vk::ExtensionProperties>> {
        Ok(unsafe {
            self.instance
                .handle
                .enumerate_device_extension_properties(device)?
        })
    }

    fn swapchain_support(&self, device: vk::PhysicalDevice) -> Result<SwapChainSupportDetails> {
        SwapChainSupportDetails::query(self.surface, device)
    }
}

/// Why a candidate device was passed over.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("no queue family for {}", missing_roles(.0))]
    IncompleteQueueFamilies(QueueFamilyIndices),
    #[error("missing device extensions: {}", .0.join(", "))]
    MissingExtensions(Vec<String>),
    #[error("surface offers {formats} format(s) and {present_modes} present mode(s)")]
    InadequateSwapchain { formats: usize, present_modes: usize },
    #[error("no sampler anisotropy")]
    NoSamplerAnisotropy,
}

fn missing_roles(indices: &QueueFamilyIndices) -> &'static str {
    match (indices.graphics_family, indices.present_family) {
        (None, None) => "graphics or present",
        (None, Some(_)) => "graphics",
        _ => "present",
    }
}

#[derive(Debug, Clone)]
pub struct PhysicalDevice {
    pub handle: vk::PhysicalDevice,
    pub name: String,
    pub properties: vk::PhysicalDeviceProperties,
    pub features: vk::PhysicalDeviceFeatures,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    pub queue_families: Vec<QueueFamily>,
    pub queue_family_indices: ResolvedQueueFamilies,
    pub swapchain_support: SwapChainSupportDetails,
    pub msaa_samples: vk::SampleCountFlags,
}

impl PhysicalDevice {
    /// Picks the first device, in driver order, that can render to `surface`.
    pub fn select(
        instance: &Instance,
        surface: &Surface,
        required_extensions: &[CString],
    ) -> Result<Self> {
        Self::select_with(&DriverQueries { instance, surface }, required_extensions)
    }

    /// First match wins: devices are not ranked against each other.
    pub fn select_with(
        queries: &impl DeviceQueries,
        required_extensions: &[CString],
    ) -> Result<Self> {
        let handles = queries.physical_devices()?;
        if handles.is_empty() {
            return Err(ContextError::NoDevicesAvailable);
        }

        for &handle in &handles {
            match Self::evaluate(queries, handle, required_extensions)? {
                Ok(device) => {
                    log::info!(
                        "selected GPU {} ({:?} samples max)",
                        device.name,
                        device.msaa_samples
                    );
                    return Ok(device);
                }
                Err(rejection) => {
                    let name = device_name(&queries.properties(handle));
                    log::debug!("rejected GPU {name}: {rejection}");
                }
            }
        }

        Err(ContextError::NoSuitableDevice {
            candidates: handles.len(),
        })
    }

    /// Checks one candidate. The outer error is a failed driver query, the inner
    /// one the reason the device does not qualify.
    pub fn evaluate(
        queries: &impl DeviceQueries,
        handle: vk::PhysicalDevice,
        required_extensions: &[CString],
    ) -> Result<std::result::Result<Self, Rejection>> {
        let queue_families = QueueFamily::from_properties(&queries.queue_family_properties(handle));
        let indices = QueueFamilyIndices::resolve(&queue_families, |index| {
            queries.surface_support(handle, index).unwrap_or_else(|err| {
                log::warn!("present support query failed for queue family {index}: {err}");
                false
            })
        });
        let Some(queue_family_indices) = indices.complete() else {
            return Ok(Err(Rejection::IncompleteQueueFamilies(indices)));
        };

        let missing = missing_extensions(required_extensions, &queries.extension_properties(handle)?);
        if !missing.is_empty() {
            return Ok(Err(Rejection::MissingExtensions(missing)));
        }

        let swapchain_support = queries.swapchain_support(handle)?;
        if !swapchain_support.is_adequate() {
            return Ok(Err(Rejection::InadequateSwapchain {
                formats: swapchain_support.formats.len(),
                present_modes: swapchain_support.present_modes.len(),
            }));
        }

        let features = queries.features(handle);
        if features.sampler_anisotropy != vk::TRUE {
            return Ok(Err(Rejection::NoSamplerAnisotropy));
        }

        let properties = queries.properties(handle);
        Ok(Ok(Self {
            handle,
            name: device_name(&properties),
            msaa_samples: max_usable_sample_count(&properties.limits),
            properties,
            features,
            memory_properties: queries.memory_properties(handle),
            queue_families,
            queue_family_indices,
            swapchain_support,
        }))
    }
}

pub fn device_name(properties: &vk::PhysicalDeviceProperties) -> String {
    unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

/// Required extension names the device does not expose, sorted. Empty means supported.
pub fn missing_extensions(
    required: &[CString],
    available: &[vk::ExtensionProperties],
) -> Vec<String> {
    let mut missing: BTreeSet<&CStr> = required.iter().map(CString::as_c_str).collect();
    for extension in available {
        let name = unsafe { CStr::from_ptr(extension.extension_name.as_ptr()) };
        missing.remove(name);
    }
    missing
        .into_iter()
        .map(|name| name.to_string_lossy().into_owned())
        .collect()
}

/// Highest sample count usable for both color and depth attachments.
pub fn max_usable_sample_count(limits: &vk::PhysicalDeviceLimits) -> vk::SampleCountFlags {
    let counts = limits.framebuffer_color_sample_counts & limits.framebuffer_depth_sample_counts;
    [
        vk::SampleCountFlags::TYPE_64,
        vk::SampleCountFlags::TYPE_32,
        vk::SampleCountFlags::TYPE_16,
        vk::SampleCountFlags::TYPE_8,
        vk::SampleCountFlags::TYPE_4,
        vk::SampleCountFlags::TYPE_2,
    ]
    .into_iter()
    .find(|&samples| counts.contains(samples))
    .unwrap_or(vk::SampleCountFlags::TYPE_1)
}
