// Backend module - Vulkan bring-up
//
// Design: Thin wrapper around ash, one owner per Vulkan handle
// Pure selection logic kept apart from driver calls

pub mod context;
pub mod debug;
pub mod device;
pub mod error;
pub mod instance;
pub mod physical;
mod util;

pub use context::VulkanContext;
pub use error::BringUpError;
pub use instance::Validation;
pub use physical::GpuSelection;
