//! Threshold search for gradual point selection.
//!
//! Given a point-quality metric and a selection goal, the functions here
//! find the numeric threshold to hand a reconstruction engine so that the
//! resulting selection matches the goal. The engine stays behind the
//! [`cull_core::SparseCloudEngine`] trait; its reported counts are
//! authoritative at every step.

mod ramp;
mod search;

pub use ramp::*;
pub use search::*;
