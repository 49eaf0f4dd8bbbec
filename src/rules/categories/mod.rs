//! Rule categories

pub mod latest;
pub mod marketplace;
pub mod ref_type;
pub mod releases;
pub mod version_tracking;
