// Randomized device and event generation. Both samplers draw exclusively
// from a caller-owned `Sequence`, in a fixed order, so a run can be replayed
// by re-seeding and fast-forwarding.

pub mod device;
pub mod stream;

pub use device::sample_device;
pub use stream::{FieldPool, StreamSampler};
