// Vulkan Device - logical device and graphics queue
//
// Responsibilities:
// - One graphics queue at maximum priority
// - Device layers mirror instance layers (older loaders still read them)
// - Portability subset where the implementation is a portability one

use anyhow::{Context, Result};
use ash::vk;
use std::ffi::CStr;

use super::error::BringUpError;
use super::instance::Validation;
use super::physical::SelectedGpu;
use super::util::name_matches;

/// No optional features yet
const REQUIRED_DEVICE_FEATURES: vk::PhysicalDeviceFeatures = unsafe { std::mem::zeroed() };

/// Device extensions to enable. The portability subset must be enabled whenever a
/// device advertises it, which is only reachable through portability enumeration.
pub fn device_extension_names(
    available: &[vk::ExtensionProperties],
    portability_enumeration: bool,
) -> Vec<&'static CStr> {
    let portability_subset = vk::KhrPortabilitySubsetFn::name();
    let advertises_subset = available
        .iter()
        .any(|ext| name_matches(&ext.extension_name, portability_subset));

    if portability_enumeration && advertises_subset {
        vec![portability_subset]
    } else {
        vec![]
    }
}

/// Logical device wrapper; destroys the device on drop.
pub struct LogicalDevice {
    pub raw: ash::Device,
    /// Valid until `raw` is destroyed
    pub graphics_queue: vk::Queue,
    pub graphics_queue_family: u32,
}

impl LogicalDevice {
    pub fn new(
        instance: &ash::Instance,
        gpu: &SelectedGpu,
        validation: &Validation,
    ) -> Result<Self> {
        let physical_device = gpu.candidate.handle;
        let graphics_queue_family = gpu.graphics_family;

        let queue_priorities = [1.0];
        let queue_create_info = vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(graphics_queue_family)
            .queue_priorities(&queue_priorities)
            .build();

        let available = unsafe { instance.enumerate_device_extension_properties(physical_device) }
            .map_err(BringUpError::driver("vkEnumerateDeviceExtensionProperties"))?;
        let extensions = device_extension_names(&available, validation.enabled);
        let extension_ptrs: Vec<_> = extensions.iter().map(|name| name.as_ptr()).collect();

        // Deprecated at device level, still honoured by older implementations
        let layer_ptrs: Vec<_> = validation
            .enabled_layers()
            .iter()
            .map(|name| name.as_ptr())
            .collect();

        log::info!("Device extensions: {:?}", extensions);

        #[allow(deprecated)]
        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(std::slice::from_ref(&queue_create_info))
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs)
            .enabled_features(&REQUIRED_DEVICE_FEATURES);

        let raw = unsafe { instance.create_device(physical_device, &create_info, None) }
            .map_err(BringUpError::driver("vkCreateDevice"))
            .context("Failed to create logical device")?;

        let graphics_queue = unsafe { raw.get_device_queue(graphics_queue_family, 0) };

        Ok(Self {
            raw,
            graphics_queue,
            graphics_queue_family,
        })
    }

    /// Wait for device to be idle (e.g., before cleanup)
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.raw.device_wait_idle() }
            .map_err(BringUpError::driver("vkDeviceWaitIdle"))?;
        Ok(())
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        log::info!("Destroying logical device...");

        if let Err(e) = self.wait_idle() {
            log::warn!("{:#}", e);
        }

        // Takes the graphics queue with it
        unsafe { self.raw.destroy_device(None) };
    }
}
