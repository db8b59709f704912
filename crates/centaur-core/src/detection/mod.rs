pub mod components;

pub use components::{label_components, ComponentStats, Connectivity, Labelling};
