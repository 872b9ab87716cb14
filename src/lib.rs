//! # pct-recon-core -- Proton Computed Tomography Reconstruction Core
//!
//! Reconstruction primitives for proton CT: most-likely-path (MLP)
//! trajectory models, distance-driven proton-pair binning and direct
//! backprojection, and FDK-style filtered backprojection over a divergent
//! projection stack.
//!
//! ## Quick start
//!
//! ```rust
//! use pct_recon::prelude::*;
//!
//! let mut mlp = build(MlpKind::ThirdOrderPolynomial);
//! let endpoints = ProtonEndpoints {
//!     p_in: Vec3::new(0.0, 0.0, 0.0),
//!     p_out: Vec3::new(5.0, -2.0, 150.0),
//!     d_in: Vec3::new(0.02, -0.01, 1.0),
//!     d_out: Vec3::new(0.01, -0.02, 1.0),
//! };
//! mlp.init(endpoints, None).unwrap();
//! let sample = mlp.evaluate(75.0);
//! ```
//!
//! ## Architecture
//!
//! - [`mlp`] -- the three interchangeable MLP evaluators behind one trait
//! - [`binning`] -- PPBin (projection binner) and PPBP (direct backprojector)
//! - [`fdk`] -- PWeight, PParker, the ramp-filter seam, DDBP, and the driver loop
//! - [`holefill`] -- small-hole filler for post-processed volumes
//! - [`zengbp`] -- cosine/sine-weighted combination of DBP slices
//! - [`geom`] -- vector and explicit matrix primitives shared by the above
//! - [`geometry`] -- the per-view acquisition record and its derived queries
//! - [`volume`] / [`projection`] -- the 3D volume and 4D projection-stack data types
//! - [`worker`] -- the scoped-thread worker pool
//! - [`constants`] -- physical and numerical constants
//! - [`error`] -- the crate-wide error type

pub mod binning;
pub mod constants;
pub mod error;
pub mod fdk;
pub mod geom;
pub mod geometry;
pub mod holefill;
pub mod mlp;
pub mod projection;
pub mod volume;
pub mod worker;
pub mod zengbp;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::binning::{
        EnergyToWeplConverter, PpBackProjector, PpBinAccumulator, PpbinConfig, PpbinOutputs, PpbpConfig,
        ProtonPairRecord,
    };
    pub use crate::error::{ReconError, Result};
    pub use crate::fdk::{
        apply_divergence_weights, apply_parker_weights, Ddbp, DdbpConfig, FdkPipeline, FdkPipelineConfig,
        IdentityRamp, ParkerOutcome, PipelineState, RampFilter,
    };
    pub use crate::geom::{Mat2, Mat4, QuadricShape, Vec2, Vec3};
    pub use crate::geometry::{Geometry, GeometryView};
    pub use crate::mlp::{build, MlpKind, MlpModel, MlpSample, ProtonEndpoints, ProtonEnergies, TrackerUncertainty};
    pub use crate::projection::{PanelLayout, ProjectionStack};
    pub use crate::volume::Volume;
    pub use crate::worker::WorkerPool;
}
