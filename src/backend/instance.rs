// Vulkan Instance - connection to the driver
//
// Responsibilities:
// - Load the Vulkan library
// - Check that requested validation layers exist
// - Assemble the instance extension list (window system + diagnostics)
// - Create the instance, capturing creation-time validation messages

use anyhow::{Context, Result};
use ash::{prelude::VkResult, vk, Entry};
use std::ffi::{CStr, CString};

use super::debug;
use super::error::BringUpError;
use super::util::name_matches;

/// Layers enabled when validation is on
pub const VALIDATION_LAYERS: &[&CStr] = &[c"VK_LAYER_KHRONOS_validation"];

/// Appended after the window-system extensions when validation is on, in this order.
pub fn diagnostic_extensions() -> [&'static CStr; 3] {
    [
        ash::extensions::ext::DebugUtils::name(),
        vk::KhrPortabilityEnumerationFn::name(),
        vk::KhrGetPhysicalDeviceProperties2Fn::name(),
    ]
}

/// Validation setup, fixed for the lifetime of the process
#[derive(Debug, Clone, Copy)]
pub struct Validation {
    pub enabled: bool,
    pub layers: &'static [&'static CStr],
}

impl Validation {
    /// Release builds never validate; debug builds validate unless `requested` is off.
    pub fn for_build(requested: bool) -> Self {
        Self {
            enabled: cfg!(debug_assertions) && requested,
            layers: VALIDATION_LAYERS,
        }
    }

    /// Layer names to hand to instance and device creation
    pub fn enabled_layers(&self) -> &'static [&'static CStr] {
        if self.enabled {
            self.layers
        } else {
            &[]
        }
    }
}

/// Window-system extensions plus, with validation on, the diagnostic ones.
pub fn required_extension_names(
    window_extensions: &[&'static CStr],
    enable_validation: bool,
) -> Vec<&'static CStr> {
    let mut extensions = window_extensions.to_vec();
    if enable_validation {
        extensions.extend_from_slice(&diagnostic_extensions());
    }
    extensions
}

/// Requested layers absent from `available`, in request order.
pub fn missing_layers(requested: &[&CStr], available: &[vk::LayerProperties]) -> Vec<String> {
    requested
        .iter()
        .filter(|name| {
            !available
                .iter()
                .any(|layer| name_matches(&layer.layer_name, name))
        })
        .map(|name| name.to_string_lossy().into_owned())
        .collect()
}

/// True only when every requested layer is available.
pub fn check_layer_support(requested: &[&CStr], available: &[vk::LayerProperties]) -> bool {
    missing_layers(requested, available).is_empty()
}

pub fn ensure_layers_available(
    requested: &[&CStr],
    available: &[vk::LayerProperties],
) -> Result<(), BringUpError> {
    if check_layer_support(requested, available) {
        return Ok(());
    }
    Err(BringUpError::MissingLayers {
        missing: missing_layers(requested, available),
    })
}

/// Check layers (when validating) before running `create`; a missing layer means
/// `create` never runs.
pub fn create_with_layer_check<T>(
    validation: &Validation,
    available_layers: impl FnOnce() -> VkResult<Vec<vk::LayerProperties>>,
    create: impl FnOnce() -> Result<T>,
) -> Result<T> {
    if validation.enabled {
        let available = available_layers()
            .map_err(BringUpError::driver("vkEnumerateInstanceLayerProperties"))?;
        ensure_layers_available(validation.layers, &available)?;
    }
    create()
}

/// Owns the loader and the instance; destroys the instance on drop.
pub struct Instance {
    pub raw: ash::Instance,
    pub entry: Entry,
}

impl Instance {
    /// Create the Vulkan instance
    ///
    /// # Arguments
    /// * `app_name` - Application name reported to the driver
    /// * `window_extensions` - Extensions the window system needs for presentation
    /// * `validation` - Validation layers and diagnostics
    pub fn new(
        app_name: &str,
        window_extensions: &[&'static CStr],
        validation: &Validation,
    ) -> Result<Self> {
        let entry = unsafe { Entry::load() }
            .context("Failed to load Vulkan library. Is Vulkan installed?")?;

        let raw = create_with_layer_check(
            validation,
            || entry.enumerate_instance_layer_properties(),
            || Self::create_raw(&entry, app_name, window_extensions, validation),
        )?;

        Ok(Self { raw, entry })
    }

    fn create_raw(
        entry: &Entry,
        app_name: &str,
        window_extensions: &[&'static CStr],
        validation: &Validation,
    ) -> Result<ash::Instance> {
        let app_name_cstr = CString::new(app_name)?;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name_cstr)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"No Engine")
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let extensions = required_extension_names(window_extensions, validation.enabled);
        let extension_ptrs: Vec<_> = extensions.iter().map(|name| name.as_ptr()).collect();
        let layer_ptrs: Vec<_> = validation
            .enabled_layers()
            .iter()
            .map(|name| name.as_ptr())
            .collect();

        log::info!("Instance extensions: {:?}", extensions);
        log::info!("Instance layers: {:?}", validation.enabled_layers());

        // Portability enumeration rides along with the diagnostic extensions
        let flags = if validation.enabled {
            vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
        } else {
            vk::InstanceCreateFlags::empty()
        };

        let mut debug_info = debug::messenger_create_info();
        let mut create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs)
            .flags(flags);
        if validation.enabled {
            // Also captures messages from vkCreateInstance / vkDestroyInstance
            create_info = create_info.push_next(&mut debug_info);
        }

        let raw = unsafe { entry.create_instance(&create_info, None) }
            .map_err(BringUpError::driver("vkCreateInstance"))
            .context("Failed to create Vulkan instance")?;

        Ok(raw)
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        log::info!("Destroying Vulkan instance...");
        unsafe { self.raw.destroy_instance(None) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::util::fixed_name;

    fn layer(name: &str) -> vk::LayerProperties {
        vk::LayerProperties {
            layer_name: fixed_name(name),
            ..Default::default()
        }
    }

    const SURFACE: &CStr = c"VK_KHR_surface";
    const XLIB: &CStr = c"VK_KHR_xlib_surface";

    #[test]
    fn validation_off_keeps_only_window_extensions() {
        let names = required_extension_names(&[SURFACE, XLIB], false);
        assert_eq!(names, vec![SURFACE, XLIB]);
    }

    #[test]
    fn validation_on_appends_three_in_order() {
        let names = required_extension_names(&[SURFACE, XLIB], true);
        assert_eq!(
            names,
            vec![
                SURFACE,
                XLIB,
                c"VK_EXT_debug_utils",
                c"VK_KHR_portability_enumeration",
                c"VK_KHR_get_physical_device_properties2",
            ]
        );
    }

    #[test]
    fn layer_support_requires_every_layer() {
        let available = [layer("VK_LAYER_KHRONOS_validation"), layer("VK_LAYER_LUNARG_monitor")];

        assert!(check_layer_support(&[c"VK_LAYER_KHRONOS_validation"], &available));
        assert!(check_layer_support(&[], &available));
        assert!(!check_layer_support(
            &[c"VK_LAYER_KHRONOS_validation", c"VK_LAYER_missing"],
            &available
        ));
        assert!(!check_layer_support(&[c"VK_LAYER_KHRONOS_validation"], &[]));
    }

    #[test]
    fn layer_support_is_case_sensitive() {
        let available = [layer("vk_layer_khronos_validation")];
        assert!(!check_layer_support(VALIDATION_LAYERS, &available));
    }

    #[test]
    fn absent_layer_is_a_configuration_error() {
        let available = [layer("VK_LAYER_LUNARG_monitor")];
        match ensure_layers_available(VALIDATION_LAYERS, &available) {
            Err(BringUpError::MissingLayers { missing }) => {
                assert_eq!(missing, vec!["VK_LAYER_KHRONOS_validation".to_string()]);
            }
            other => panic!("expected MissingLayers, got {other:?}"),
        }
    }

    const ENABLED: Validation = Validation {
        enabled: true,
        layers: VALIDATION_LAYERS,
    };

    #[test]
    fn missing_layer_stops_before_instance_creation() {
        let mut created = false;
        let result = create_with_layer_check(
            &ENABLED,
            || Ok(vec![layer("VK_LAYER_LUNARG_monitor")]),
            || {
                created = true;
                Ok(())
            },
        );

        assert!(!created);
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BringUpError>(),
            Some(BringUpError::MissingLayers { .. })
        ));
    }

    #[test]
    fn present_layers_proceed_to_creation() {
        let result = create_with_layer_check(
            &ENABLED,
            || Ok(vec![layer("VK_LAYER_KHRONOS_validation")]),
            || Ok(7),
        );
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn layer_enumeration_failure_is_a_driver_error() {
        let result = create_with_layer_check(
            &ENABLED,
            || Err(vk::Result::ERROR_OUT_OF_HOST_MEMORY),
            || Ok(()),
        );
        assert!(matches!(
            result.unwrap_err().downcast_ref::<BringUpError>(),
            Some(BringUpError::Driver {
                call: "vkEnumerateInstanceLayerProperties",
                ..
            })
        ));
    }

    #[test]
    fn layers_not_queried_without_validation() {
        let disabled = Validation {
            enabled: false,
            layers: VALIDATION_LAYERS,
        };
        let result = create_with_layer_check(
            &disabled,
            || panic!("layer list queried with validation off"),
            || Ok(()),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn disabled_validation_enables_no_layers() {
        let validation = Validation {
            enabled: false,
            layers: VALIDATION_LAYERS,
        };
        assert!(validation.enabled_layers().is_empty());
    }

    #[test]
    fn config_can_only_turn_validation_off() {
        assert!(!Validation::for_build(false).enabled);
        assert_eq!(Validation::for_build(true).enabled, cfg!(debug_assertions));
    }
}
