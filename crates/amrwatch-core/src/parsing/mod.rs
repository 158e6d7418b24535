pub mod normalize;
pub mod values;

pub use normalize::{normalize_antibiotic, normalize_organism};
pub use values::parse_value;
