use ash::vk;

#[derive(Debug, Clone, Copy)]
pub struct QueueFamily {
    pub index: u32,
    pub properties: vk::QueueFamilyProperties,
}

impl QueueFamily {
    pub fn from_properties(properties: &[vk::QueueFamilyProperties]) -> Vec<Self> {
        properties
            .iter()
            .enumerate()
            .map(|(index, &properties)| Self {
                index: index as u32,
                properties,
            })
            .collect()
    }

    pub fn supports_graphics(&self) -> bool {
        self.properties
            .queue_flags
            .contains(vk::QueueFlags::GRAPHICS)
    }
}

/// Queue families a device offers for each role. Either may be unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics_family: Option<u32>,
    pub present_family: Option<u32>,
}

/// Both roles resolved. Graphics and present may name the same family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedQueueFamilies {
    pub graphics_family: u32,
    pub present_family: u32,
}

impl QueueFamilyIndices {
    /// Scans every family. The first graphics-capable and the first present-capable
    /// family are taken, unless one family can do both, in which case it takes both roles.
    ///
    /// `can_present` is asked once per family, in index order.
    pub fn resolve(families: &[QueueFamily], mut can_present: impl FnMut(u32) -> bool) -> Self {
        let mut indices = Self::default();
        let mut shared = None;

        for family in families {
            let graphics = family.supports_graphics();
            let present = can_present(family.index);

            if graphics && indices.graphics_family.is_none() {
                indices.graphics_family = Some(family.index);
            }
            if present && indices.present_family.is_none() {
                indices.present_family = Some(family.index);
            }
            if graphics && present && shared.is_none() {
                shared = Some(family.index);
            }
        }

        if let Some(index) = shared {
            indices.graphics_family = Some(index);
            indices.present_family = Some(index);
        }
        indices
    }

    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    pub fn complete(&self) -> Option<ResolvedQueueFamilies> {
        Some(ResolvedQueueFamilies {
            graphics_family: self.graphics_family?,
            present_family: self.present_family?,
        })
    }
}

impl ResolvedQueueFamilies {
    /// Distinct family indices, ascending. Asking for the same family twice is
    /// rejected by the driver.
    pub fn unique(&self) -> Vec<u32> {
        if self.graphics_family == self.present_family {
            vec![self.graphics_family]
        } else {
            let mut families = vec![self.graphics_family, self.present_family];
            families.sort_unstable();
            families
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn families(flags: &[vk::QueueFlags]) -> Vec<QueueFamily> {
        let properties: Vec<_> = flags
            .iter()
            .map(|&queue_flags| vk::QueueFamilyProperties {
                queue_flags,
                queue_count: 1,
                ..Default::default()
            })
            .collect();
        QueueFamily::from_properties(&properties)
    }

    #[test]
    fn empty_family_list_resolves_nothing() {
        let indices = QueueFamilyIndices::resolve(&[], |_| true);
        assert_eq!(indices, QueueFamilyIndices::default());
        assert!(!indices.is_complete());
        assert_eq!(indices.complete(), None);
    }

    #[test]
    fn roles_are_only_assigned_to_capable_families() {
        let families = families(&[
            vk::QueueFlags::TRANSFER,
            vk::QueueFlags::COMPUTE,
            vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE,
        ]);
        let indices = QueueFamilyIndices::resolve(&families, |index| index == 1);
        assert_eq!(indices.graphics_family, Some(2));
        assert_eq!(indices.present_family, Some(1));
        assert!(indices.is_complete());
    }

    #[test]
    fn missing_present_support_is_incomplete() {
        let families = families(&[vk::QueueFlags::GRAPHICS, vk::QueueFlags::GRAPHICS]);
        let indices = QueueFamilyIndices::resolve(&families, |_| false);
        assert_eq!(indices.graphics_family, Some(0));
        assert_eq!(indices.present_family, None);
        assert!(!indices.is_complete());
    }

    #[test]
    fn later_family_doing_both_roles_wins() {
        // 0 graphics only, 1 present only, 2 both: an early exit would stop at 1.
        let families = families(&[
            vk::QueueFlags::GRAPHICS,
            vk::QueueFlags::TRANSFER,
            vk::QueueFlags::GRAPHICS,
        ]);
        let mut asked = Vec::new();
        let indices = QueueFamilyIndices::resolve(&families, |index| {
            asked.push(index);
            index != 0
        });
        assert_eq!(asked, vec![0, 1, 2]);
        assert_eq!(indices.complete().unwrap().unique(), vec![2]);
    }

    #[test]
    fn unique_deduplicates_shared_family() {
        let same = ResolvedQueueFamilies {
            graphics_family: 2,
            present_family: 2,
        };
        assert_eq!(same.unique(), vec![2]);

        let split = ResolvedQueueFamilies {
            graphics_family: 3,
            present_family: 0,
        };
        assert_eq!(split.unique(), vec![0, 3]);
    }
}
