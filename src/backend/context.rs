// Vulkan context - the whole bring-up in one fallible call
//
// Each owned handle lives in its own wrapper with a Drop impl. Struct fields drop
// in declaration order, so they are declared in reverse order of creation:
// device, then messenger, then instance.

use anyhow::{Context, Result};
use ash::vk;
use raw_window_handle::RawDisplayHandle;
use std::ffi::CStr;

use super::debug::{DebugMessenger, DebugUtilsFns, InstanceProcAddr};
use super::device::LogicalDevice;
use super::error::BringUpError;
use super::instance::{Instance, Validation};
use super::physical::{pick_physical_device, GpuSelection, SelectedGpu};

pub struct VulkanContext {
    pub device: LogicalDevice,
    pub gpu: SelectedGpu,
    debug_messenger: Option<DebugMessenger>,
    _instance: Instance,
}

impl VulkanContext {
    /// Create instance, messenger, physical device pick and logical device
    pub fn new(
        app_name: &str,
        display_handle: RawDisplayHandle,
        validation: &Validation,
        gpu_selection: GpuSelection,
    ) -> Result<Self> {
        log::info!("Initializing Vulkan...");

        // Step 1: Instance with the window system's extensions
        let window_extensions = window_extension_names(display_handle)?;
        let instance = Instance::new(app_name, &window_extensions, validation)?;

        // Step 2: Debug messenger if validation enabled
        let debug_messenger = if validation.enabled {
            let lookup = InstanceProcAddr {
                entry: &instance.entry,
                instance: instance.raw.handle(),
            };
            let fns = DebugUtilsFns::resolve(&lookup);
            let messenger = DebugMessenger::new(fns, instance.raw.handle())
                .map_err(BringUpError::driver("vkCreateDebugUtilsMessengerEXT"))
                .context("Failed to set up debug messenger")?;
            Some(messenger)
        } else {
            None
        };

        // Step 3: Pick physical device (GPU)
        let gpu = pick_physical_device(&instance.raw, gpu_selection)
            .context("Failed to pick a physical device")?;

        // Step 4: Logical device and graphics queue
        let device = LogicalDevice::new(&instance.raw, &gpu, validation)?;

        log::info!("Vulkan initialized successfully!");

        Ok(Self {
            device,
            gpu,
            debug_messenger,
            _instance: instance,
        })
    }

    pub fn graphics_queue(&self) -> vk::Queue {
        self.device.graphics_queue
    }

    pub fn has_debug_messenger(&self) -> bool {
        self.debug_messenger.is_some()
    }
}

/// Instance extensions the window system needs, as reported by ash-window
fn window_extension_names(display_handle: RawDisplayHandle) -> Result<Vec<&'static CStr>> {
    let names = ash_window::enumerate_required_extensions(display_handle)
        .map_err(BringUpError::driver("ash_window::enumerate_required_extensions"))?;

    // SAFETY: ash-window hands out pointers to static, nul-terminated extension names
    Ok(names
        .iter()
        .map(|&name| unsafe { CStr::from_ptr(name) })
        .collect())
}
