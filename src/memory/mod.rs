//! Reference-counted, device-aware memory
//!
//! ```text
//! MemArr (view: Rc<MemBlob> + element offset)  ──┐
//! MemArr (sub-view, same blob, offset + k)  ─────┼──► MemBlob (one allocation, one device)
//! DeviceBuffer (sole owner, accelerator only) ───────► MemBlob
//! ```
//!
//! A blob is allocated once and freed once, when its last owner goes away.
//! Views never copy on write: mutation through any alias is visible through
//! all of them.

mod arr;
mod blob;
mod buffer;

pub use arr::MemArr;
pub use blob::MemBlob;
pub use buffer::DeviceBuffer;
