//! FDK-style filtered backprojection over a distance-driven projection stack.

mod ddbp;
mod parker;
mod pipeline;
mod ramp;
mod weight;

pub use ddbp::{Ddbp, DdbpConfig};
pub use parker::{apply_parker_weights, ParkerOutcome};
pub use pipeline::{FdkPipeline, FdkPipelineConfig, PipelineState};
pub use ramp::{IdentityRamp, RampFilter};
pub use weight::apply_divergence_weights;
