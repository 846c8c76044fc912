//! Accelerator runtime implementation
//!
//! Device 1. Memory handed out here is owned by the accelerator: the host
//! never dereferences it directly and data moves only through the
//! `Runtime` copy primitives. Without vendor drivers linked in, the device
//! heap is emulated in a separately accounted region of system memory with
//! an optional per-thread capacity limit.

mod runtime;

pub use runtime::AcceleratorRuntime;
