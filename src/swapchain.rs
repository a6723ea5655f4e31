use ash::vk;

use crate::{error::Result, surface::Surface};

/// What a device can present to one particular surface.
#[derive(Debug, Clone, Default)]
pub struct SwapChainSupportDetails {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapChainSupportDetails {
    pub fn query(surface: &Surface, physical_device: vk::PhysicalDevice) -> Result<Self> {
        let capabilities = unsafe {
            surface
                .functions
                .get_physical_device_surface_capabilities(physical_device, surface.handle)?
        };
        let formats = unsafe {
            surface
                .functions
                .get_physical_device_surface_formats(physical_device, surface.handle)?
        };
        let present_modes = unsafe {
            surface
                .functions
                .get_physical_device_surface_present_modes(physical_device, surface.handle)?
        };
        Ok(Self {
            capabilities,
            formats,
            present_modes,
        })
    }

    /// A swapchain can only be built with at least one format and one present mode.
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adequacy_needs_formats_and_present_modes() {
        let format = vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };
        let mut details = SwapChainSupportDetails::default();
        assert!(!details.is_adequate());

        details.formats.push(format);
        assert!(!details.is_adequate());

        details.present_modes.push(vk::PresentModeKHR::FIFO);
        assert!(details.is_adequate());

        details.formats.clear();
        assert!(!details.is_adequate());
    }
}
