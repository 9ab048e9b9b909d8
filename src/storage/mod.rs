/// The block device abstraction.
mod block_device;
/// File-backed devices.
mod file;
/// Memory-backed devices.
mod memory;

pub use block_device::*;
pub use file::*;
pub use memory::*;
