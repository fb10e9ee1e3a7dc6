pub mod xxhash;

pub use xxhash::{fingerprint, HashMode};
