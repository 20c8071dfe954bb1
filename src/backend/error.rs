// Bring-up errors
//
// Every failure during startup is fatal. The variants map onto the three ways
// bring-up can go wrong: something requested is missing, the driver refused a
// call, or no GPU fits.

use ash::vk;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BringUpError {
    /// Validation layers were requested but the loader does not offer them
    #[error("validation layers requested, but not available: {}", missing.join(", "))]
    MissingLayers { missing: Vec<String> },

    /// A Vulkan entry point returned a non-success status
    #[error("{call} failed: {result}")]
    Driver {
        call: &'static str,
        result: vk::Result,
    },

    #[error("failed to find GPUs with Vulkan support")]
    NoGpu,

    #[error("failed to find a suitable GPU")]
    NoSuitableGpu,

    #[error("failed to create window: {0}")]
    WindowCreation(String),
}

impl BringUpError {
    /// Adapter for `map_err` on `VkResult`s.
    pub fn driver(call: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |result| Self::Driver { call, result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_layers_lists_every_name() {
        let err = BringUpError::MissingLayers {
            missing: vec!["VK_LAYER_A".into(), "VK_LAYER_B".into()],
        };
        assert_eq!(
            err.to_string(),
            "validation layers requested, but not available: VK_LAYER_A, VK_LAYER_B"
        );
    }

    #[test]
    fn driver_error_names_the_call() {
        let err = BringUpError::driver("vkCreateDevice")(vk::Result::ERROR_INITIALIZATION_FAILED);
        let message = err.to_string();
        assert!(message.starts_with("vkCreateDevice failed"), "{message}");
    }
}
