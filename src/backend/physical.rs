// Physical device selection
//
// A GPU is suitable when one of its queue families can run graphics commands.
// Which suitable GPU wins is decided by `GpuSelection`.

use anyhow::Result;
use ash::vk;
use serde::Deserialize;
use std::fmt;

use super::error::BringUpError;
use super::util::name_to_string;

/// Queue families found on a device
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics_family: Option<u32>,
}

impl QueueFamilyIndices {
    /// Scan families in index order, stopping once every slot is filled.
    pub fn find(families: &[vk::QueueFamilyProperties]) -> Self {
        let mut indices = Self::default();

        for (index, family) in (0u32..).zip(families) {
            if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                indices.graphics_family = Some(index);
            }

            if indices.is_complete() {
                break;
            }
        }

        indices
    }

    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some()
    }
}

/// How to choose among several suitable GPUs
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpuSelection {
    /// First suitable device in enumeration order
    #[default]
    FirstSuitable,
    /// Discrete over integrated over virtual over CPU; enumeration order breaks ties
    PreferDiscrete,
}

/// Everything selection needs to know about one enumerated GPU
#[derive(Debug, Clone)]
pub struct DeviceCandidate {
    pub handle: vk::PhysicalDevice,
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub api_version: u32,
    pub queue_families: QueueFamilyIndices,
}

impl DeviceCandidate {
    fn query(instance: &ash::Instance, handle: vk::PhysicalDevice) -> Self {
        let properties = unsafe { instance.get_physical_device_properties(handle) };
        let families = unsafe { instance.get_physical_device_queue_family_properties(handle) };

        Self {
            handle,
            name: name_to_string(&properties.device_name),
            device_type: properties.device_type,
            api_version: properties.api_version,
            queue_families: QueueFamilyIndices::find(&families),
        }
    }

    pub fn is_suitable(&self) -> bool {
        self.queue_families.is_complete()
    }
}

impl fmt::Display for DeviceCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:?}, Vulkan {}.{}.{})",
            self.name,
            self.device_type,
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version),
        )
    }
}

/// Lower is better
fn type_rank(device_type: vk::PhysicalDeviceType) -> u8 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 0,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 1,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
        vk::PhysicalDeviceType::CPU => 3,
        _ => 4,
    }
}

pub fn select_device(
    candidates: &[DeviceCandidate],
    policy: GpuSelection,
) -> Option<&DeviceCandidate> {
    let mut suitable = candidates.iter().filter(|c| c.is_suitable());
    match policy {
        GpuSelection::FirstSuitable => suitable.next(),
        GpuSelection::PreferDiscrete => suitable.min_by_key(|c| type_rank(c.device_type)),
    }
}

/// The chosen GPU and its graphics queue family
#[derive(Debug, Clone)]
pub struct SelectedGpu {
    pub candidate: DeviceCandidate,
    pub graphics_family: u32,
}

pub fn pick_physical_device(instance: &ash::Instance, policy: GpuSelection) -> Result<SelectedGpu> {
    let devices = unsafe { instance.enumerate_physical_devices() }
        .map_err(BringUpError::driver("vkEnumeratePhysicalDevices"))?;

    if devices.is_empty() {
        return Err(BringUpError::NoGpu.into());
    }

    let candidates: Vec<_> = devices
        .into_iter()
        .map(|handle| DeviceCandidate::query(instance, handle))
        .collect();

    for candidate in &candidates {
        log::debug!(
            "GPU candidate: {} - graphics family {:?}",
            candidate,
            candidate.queue_families.graphics_family
        );
    }

    let chosen = select_device(&candidates, policy).ok_or(BringUpError::NoSuitableGpu)?;
    let graphics_family = chosen
        .queue_families
        .graphics_family
        .ok_or(BringUpError::NoSuitableGpu)?;

    log::info!("Selected GPU: {} (policy {:?})", chosen, policy);
    log::info!("Graphics queue family: {}", graphics_family);

    Ok(SelectedGpu {
        candidate: chosen.clone(),
        graphics_family,
    })
}
