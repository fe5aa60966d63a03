//! Dimension descriptors and per-view pipeline assembly

pub mod builder;
pub mod dimension;

pub use builder::ListQuery;
pub use dimension::{Dimension, ListSource, View, YearMetric, DIMENSIONS};
