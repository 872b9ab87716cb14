//! The FDK driver loop: Extract -> PreFilter (PWeight, PParker) -> Filter
//! (Ramp) -> BackProject (DDBP), one view at a time, reconnecting the
//! backprojector's output volume as the next iteration's accumulation
//! target.
//!
//! The original pipeline framework expresses this as a literal
//! disconnect/reconnect of `itk::ProcessObject`s between iterations; here
//! it is an explicit state machine over one `FdkPipeline::run` call, which
//! reads the same at every call site and needs no graph rewiring.

use super::ddbp::{Ddbp, DdbpConfig};
use super::parker::apply_parker_weights;
use super::ramp::RampFilter;
use super::weight::apply_divergence_weights;
use crate::error::Result;
use crate::geometry::Geometry;
use crate::projection::ProjectionStack;
use crate::volume::Volume;
use crate::worker::WorkerPool;
use log::debug;

/// Observable state of the driver loop, one step per view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    PreFilter(usize),
    Filter(usize),
    BackProject(usize),
    Done,
}

/// Static configuration for one FDK run.
#[derive(Debug, Clone, Copy)]
pub struct FdkPipelineConfig {
    pub ddbp: DdbpConfig,
    /// Disables Parker weighting even when the geometry is a short scan
    /// (the original tool's `--short` opt-out).
    pub disable_parker: bool,
}

impl Default for FdkPipelineConfig {
    fn default() -> Self {
        FdkPipelineConfig { ddbp: DdbpConfig::default(), disable_parker: false }
    }
}

/// Drives the per-view FDK reconstruction over a whole projection stack.
pub struct FdkPipeline {
    config: FdkPipelineConfig,
    state: PipelineState,
}

impl FdkPipeline {
    pub fn new(config: FdkPipelineConfig) -> Self {
        FdkPipeline { config, state: PipelineState::Idle }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Runs the full views-in-order reconstruction, mutating `stack` in
    /// place (PWeight/Parker/Ramp apply in place) and accumulating into a
    /// freshly allocated output volume sized to `volume_template`.
    pub fn run(
        &mut self,
        stack: &mut ProjectionStack,
        geometry: &Geometry,
        ramp: &dyn RampFilter,
        volume_template: &Volume,
        pool: &WorkerPool,
    ) -> Result<Volume> {
        let mut volume =
            Volume::new(volume_template.origin(), volume_template.spacing(), volume_template.size());

        apply_divergence_weights(stack, geometry);
        if self.config.disable_parker {
            debug!("Parker weighting disabled by configuration");
        } else {
            let outcome = apply_parker_weights(stack, geometry);
            debug!("Parker weighting outcome: {outcome:?}");
        }

        let panel = stack.panel();
        let (nu, nv) = (panel.size[0], panel.size[1]);

        for view in 0..geometry.len() {
            self.state = PipelineState::PreFilter(view);
            let mut extracted = stack.extract_view(view);

            self.state = PipelineState::Filter(view);
            ramp.filter_view(&mut extracted, nu, nv, stack.n_slices());
            stack.write_view(view, &extracted);

            self.state = PipelineState::BackProject(view);
            Ddbp::backproject_view(&mut volume, stack, geometry, view, self.config.ddbp, pool)?;
        }

        self.state = PipelineState::Done;
        Ok(volume)
    }
}
