//! Sparse-cloud refinement loop.
//!
//! [`optimize_sparse_cloud`] drives a reconstruction engine through
//! repeated cycles of gradual selection, point culling, and camera
//! optimization until the reprojection-error threshold of the surviving
//! cloud settles under a convergence gate. The two historical culling
//! styles (fixed uncertainty threshold versus fraction-of-cloud target)
//! are configuration variants of the same driver, not separate code paths.

mod refine;

pub use refine::*;
