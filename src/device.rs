use std::{
    ffi::{c_char, CString},
    sync::Arc,
};

use ash::vk;

use crate::{
    error::{ContextError, Result},
    instance::Instance,
    physical_device::PhysicalDevice,
    queue_family::{QueueFamily, ResolvedQueueFamilies},
};

pub static QUEUE_PRIORITIES: [f32; 1] = [1.0];

#[derive(Debug)]
pub struct Queue {
    pub handle: vk::Queue,
    pub queue_family: QueueFamily,
}

/// One queue-creation request per distinct family, at full priority.
pub fn queue_create_infos(families: &ResolvedQueueFamilies) -> Vec<vk::DeviceQueueCreateInfo> {
    families
        .unique()
        .into_iter()
        .map(|family_index| {
            vk::DeviceQueueCreateInfo::builder()
                .queue_family_index(family_index)
                .queue_priorities(&QUEUE_PRIORITIES)
                .build()
        })
        .collect()
}

/// Anisotropic sampling and sample-rate shading. Selection already checked anisotropy.
pub fn enabled_features() -> vk::PhysicalDeviceFeatures {
    vk::PhysicalDeviceFeatures::builder()
        .sampler_anisotropy(true)
        .sample_rate_shading(true)
        .build()
}

pub struct Device {
    pub handle: ash::Device,
    pub instance: Arc<Instance>,
    pub physical_device: PhysicalDevice,
    pub graphics_queue: Queue,
    pub present_queue: Queue,
}

impl Device {
    /// Creates the logical device on the queue families resolved during selection.
    ///
    /// The instance's validation layers are passed on as device layers; current
    /// drivers ignore them.
    pub fn new(
        instance: Arc<Instance>,
        physical_device: PhysicalDevice,
        required_extensions: &[CString],
    ) -> Result<Self> {
        let families = physical_device.queue_family_indices;
        let queue_create_infos = queue_create_infos(&families);
        let enabled_features = enabled_features();
        let enabled_extension_names: Vec<*const c_char> = required_extensions
            .iter()
            .map(|extension| extension.as_ptr())
            .collect();
        let enabled_layer_names: Vec<*const c_char> = instance
            .validation_layers
            .iter()
            .map(|layer| layer.as_ptr())
            .collect();

        let handle = unsafe {
            instance
                .handle
                .create_device(
                    physical_device.handle,
                    &vk::DeviceCreateInfo::builder()
                        .queue_create_infos(&queue_create_infos)
                        .enabled_features(&enabled_features)
                        .enabled_extension_names(&enabled_extension_names)
                        .enabled_layer_names(&enabled_layer_names),
                    None,
                )
                .map_err(ContextError::DeviceCreationFailed)?
        };

        let queue = |family_index: u32| Queue {
            handle: unsafe { handle.get_device_queue(family_index, 0) },
            queue_family: physical_device.queue_families[family_index as usize],
        };
        let graphics_queue = queue(families.graphics_family);
        let present_queue = queue(families.present_family);

        log::info!(
            "created logical device on {} (graphics family {}, present family {})",
            physical_device.name,
            families.graphics_family,
            families.present_family
        );

        Ok(Self {
            handle,
            instance,
            physical_device,
            graphics_queue,
            present_queue,
        })
    }

    pub fn shares_queue_family(&self) -> bool {
        self.graphics_queue.queue_family.index == self.present_queue.queue_family.index
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            // Nothing useful can be done with a lost device here.
            let _ = self.handle.device_wait_idle();
            self.handle.destroy_device(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_family_gets_one_request() {
        let infos = queue_create_infos(&ResolvedQueueFamilies {
            graphics_family: 2,
            present_family: 2,
        });
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].queue_family_index, 2);
        assert_eq!(infos[0].queue_count, 1);
    }

    #[test]
    fn split_families_get_one_request_each_at_full_priority() {
        let infos = queue_create_infos(&ResolvedQueueFamilies {
            graphics_family: 0,
            present_family: 3,
        });
        let families: Vec<u32> = infos.iter().map(|info| info.queue_family_index).collect();
        assert_eq!(families, vec![0, 3]);
        for info in &infos {
            assert_eq!(info.queue_count, 1);
            let priorities = unsafe {
                std::slice::from_raw_parts(info.p_queue_priorities, info.queue_count as usize)
            };
            assert_eq!(priorities, &[1.0]);
        }
    }

    #[test]
    fn features_enable_anisotropy_and_sample_shading_only() {
        let features = enabled_features();
        assert_eq!(features.sampler_anisotropy, vk::TRUE);
        assert_eq!(features.sample_rate_shading, vk::TRUE);
        assert_eq!(features.geometry_shader, vk::FALSE);
    }
}
