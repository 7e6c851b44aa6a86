pub mod edges;
pub mod features;
pub mod gradient;
