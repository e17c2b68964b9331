//! Working-point combination study for four b-tagged jets.
//!
//! Events carry the b-tag working point reached by each of four jets. Every
//! sorted 4-tuple of levels is a combination with a stable label; events are
//! histogrammed per combination, signal is compared against background bin by
//! bin, and the most significant combination is picked for each mass point.

pub mod aggregate;
pub mod classify;
pub mod combination;
pub mod config;
pub mod error;
pub mod events;
pub mod histogram;
pub mod limits;
pub mod merge;
pub mod pipeline;
pub mod plot;
pub mod report;
pub mod select;
pub mod significance;

pub use error::{Error, Result};
