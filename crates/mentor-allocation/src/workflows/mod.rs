pub mod allocation;
pub mod counter;
pub mod natural;
pub(crate) mod normalizer;

pub use natural::{natural_key, NaturalKey};
