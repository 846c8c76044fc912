//! CPU runtime implementation
//!
//! Host memory (device 0) comes from the system allocator at 64-byte
//! alignment and is directly addressable by the host.

mod runtime;

pub use runtime::CpuRuntime;
