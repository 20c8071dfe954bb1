// Debug messenger - validation layer output
//
// vkCreateDebugUtilsMessengerEXT and vkDestroyDebugUtilsMessengerEXT are not
// exported by the loader; they are looked up by name through the instance.
// A missing entry point is reported as VK_ERROR_EXTENSION_NOT_PRESENT.

use ash::{prelude::VkResult, vk, Entry};
use std::ffi::{c_void, CStr};
use std::{mem, ptr};

const CREATE_MESSENGER: &CStr = c"vkCreateDebugUtilsMessengerEXT";
const DESTROY_MESSENGER: &CStr = c"vkDestroyDebugUtilsMessengerEXT";

/// What vkGetInstanceProcAddr hands back when the name resolves
type VoidFn = unsafe extern "system" fn();

/// Log target for everything the validation layers report
pub const VALIDATION_TARGET: &str = "validation_layer";

/// Resolves an instance-level entry point by name
pub trait ProcAddrLookup {
    fn proc_addr(&self, name: &CStr) -> vk::PFN_vkVoidFunction;
}

/// vkGetInstanceProcAddr against a live instance
pub struct InstanceProcAddr<'a> {
    pub entry: &'a Entry,
    pub instance: vk::Instance,
}

impl ProcAddrLookup for InstanceProcAddr<'_> {
    fn proc_addr(&self, name: &CStr) -> vk::PFN_vkVoidFunction {
        unsafe { self.entry.get_instance_proc_addr(self.instance, name.as_ptr()) }
    }
}

/// The two debug-utils entry points, each present only if the driver exposes it
#[derive(Clone, Copy)]
pub struct DebugUtilsFns {
    create: Option<vk::PFN_vkCreateDebugUtilsMessengerEXT>,
    destroy: Option<vk::PFN_vkDestroyDebugUtilsMessengerEXT>,
}

impl DebugUtilsFns {
    pub fn resolve(lookup: &impl ProcAddrLookup) -> Self {
        // SAFETY: the loader returns the entry point registered under this exact name,
        // whose signature is the PFN type named after it.
        let create = lookup.proc_addr(CREATE_MESSENGER).map(|f| unsafe {
            mem::transmute::<VoidFn, vk::PFN_vkCreateDebugUtilsMessengerEXT>(f)
        });
        let destroy = lookup.proc_addr(DESTROY_MESSENGER).map(|f| unsafe {
            mem::transmute::<VoidFn, vk::PFN_vkDestroyDebugUtilsMessengerEXT>(f)
        });
        Self { create, destroy }
    }

    pub fn create_messenger(
        &self,
        instance: vk::Instance,
        create_info: &vk::DebugUtilsMessengerCreateInfoEXT,
    ) -> VkResult<vk::DebugUtilsMessengerEXT> {
        let create = self.create.ok_or(vk::Result::ERROR_EXTENSION_NOT_PRESENT)?;
        let mut messenger = vk::DebugUtilsMessengerEXT::null();
        let result = unsafe { create(instance, create_info, ptr::null(), &mut messenger) };
        result.result_with_success(messenger)
    }
}

/// Owns a debug messenger; must be dropped before its instance.
pub struct DebugMessenger {
    instance: vk::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
    destroy: Option<vk::PFN_vkDestroyDebugUtilsMessengerEXT>,
}

impl DebugMessenger {
    pub fn new(fns: DebugUtilsFns, instance: vk::Instance) -> VkResult<Self> {
        let messenger = fns.create_messenger(instance, &messenger_create_info())?;
        Ok(Self {
            instance,
            messenger,
            destroy: fns.destroy,
        })
    }
}

impl Drop for DebugMessenger {
    fn drop(&mut self) {
        if let Some(destroy) = self.destroy {
            log::info!("Destroying debug messenger...");
            unsafe { destroy(self.instance, self.messenger, ptr::null()) };
        }
    }
}

/// Verbose, warning and error messages of every type go to `debug_callback`.
pub fn messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT {
    vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback))
        .build()
}

// Debug callback for validation layers. Never aborts the triggering call.
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*p_callback_data).p_message).to_string_lossy();

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            log::error!(target: VALIDATION_TARGET, "validation layer: {}", message);
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            log::warn!(target: VALIDATION_TARGET, "validation layer: {}", message);
        }
        _ => {
            log::debug!(target: VALIDATION_TARGET, "validation layer: {}", message);
        }
    }

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    struct NoProcs;

    impl ProcAddrLookup for NoProcs {
        fn proc_addr(&self, _name: &CStr) -> vk::PFN_vkVoidFunction {
            None
        }
    }

    unsafe extern "system" fn fake_create(
        _instance: vk::Instance,
        _create_info: *const vk::DebugUtilsMessengerCreateInfoEXT,
        _allocator: *const vk::AllocationCallbacks,
        messenger: *mut vk::DebugUtilsMessengerEXT,
    ) -> vk::Result {
        *messenger = vk::DebugUtilsMessengerEXT::from_raw(42);
        vk::Result::SUCCESS
    }

    /// Only knows the create entry point
    struct CreateOnly;

    impl ProcAddrLookup for CreateOnly {
        fn proc_addr(&self, name: &CStr) -> vk::PFN_vkVoidFunction {
            (name == CREATE_MESSENGER).then(|| unsafe {
                mem::transmute::<vk::PFN_vkCreateDebugUtilsMessengerEXT, VoidFn>(fake_create)
            })
        }
    }

    #[test]
    fn missing_create_is_extension_not_present() {
        let fns = DebugUtilsFns::resolve(&NoProcs);
        let result = fns.create_messenger(vk::Instance::null(), &messenger_create_info());
        assert_eq!(result, Err(vk::Result::ERROR_EXTENSION_NOT_PRESENT));
    }

    #[test]
    fn resolved_create_is_called() {
        let fns = DebugUtilsFns::resolve(&CreateOnly);
        let messenger = fns
            .create_messenger(vk::Instance::null(), &messenger_create_info())
            .unwrap();
        assert_eq!(messenger.as_raw(), 42);
    }

    #[test]
    fn missing_destroy_is_skipped_on_drop() {
        let fns = DebugUtilsFns::resolve(&CreateOnly);
        let messenger = DebugMessenger::new(fns, vk::Instance::null()).unwrap();
        assert!(messenger.destroy.is_none());
        drop(messenger);
    }

    #[test]
    fn create_info_covers_all_types_and_three_severities() {
        let info = messenger_create_info();
        assert_eq!(
            info.message_severity,
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
        );
        assert!(info
            .message_type
            .contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE));
        assert!(info.pfn_user_callback.is_some());
    }

    #[test]
    fn callback_never_aborts() {
        let data = vk::DebugUtilsMessengerCallbackDataEXT {
            p_message: c"test message".as_ptr(),
            ..Default::default()
        };
        let verdict = unsafe {
            debug_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                &data,
                ptr::null_mut(),
            )
        };
        assert_eq!(verdict, vk::FALSE);
    }
}
