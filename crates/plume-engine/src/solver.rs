//! Quality solver lifecycle and time stepping.
//!
//! [`QualitySolver`] drives a [`QualityState`] through a run. The caller
//! (or [`run()`](QualitySolver::run)) supplies one [`HydraulicState`] per
//! hydraulic interval; the solver advances quality time through that
//! interval in sub-steps of at most `quality_step` seconds.
//!
//! # Time
//!
//! Three clocks are tracked in whole seconds: quality time (how far
//! routing has progressed), hydraulic time (the end of the loaded
//! interval) and the run duration. Quality time never passes either of
//! the other two. When it reaches hydraulic time, new hydraulics must be
//! loaded before the next step.
//!
//! # Lifecycle
//!
//! `open` -> `initialize` -> (`load_hydraulics` -> `step`/`next`)* ->
//! `close`. `initialize` may be called again to restart a run. Any error
//! leaves the solver closable, and `close` is idempotent.

use std::time::Instant;

use log::{debug, info};

use plume_core::{HydraulicSource, HydraulicState, Network, QualityError};
use plume_transport::{QualityMode, QualityState, SubStep};

use crate::config::{ConfigError, QualityConfig};
use crate::metrics::StepMetrics;

// ── Phase ───────────────────────────────────────────────────────

/// Where the solver is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Opened; memory allocated but nothing seeded.
    Opened,
    /// Initialized and ready to accept hydraulics.
    Initialized,
    /// Closed; segment memory released.
    Closed,
}

// ── QualitySolver ───────────────────────────────────────────────

/// Water-quality solver for one network.
///
/// Owns the network, the configuration and all quality state. All
/// methods take `&mut self`; there is no internal synchronization.
pub struct QualitySolver {
    pub(crate) network: Network,
    pub(crate) config: QualityConfig,
    pub(crate) state: QualityState,
    phase: Phase,
    pub(crate) hydraulics: Option<HydraulicState>,
    pub(crate) qtime: u64,
    pending_sort_us: u64,
    pub(crate) metrics: StepMetrics,
}

impl QualitySolver {
    /// Validate `config` against `network` and allocate the solver.
    pub fn open(network: Network, config: QualityConfig) -> Result<Self, ConfigError> {
        config.validate(&network)?;
        let state = QualityState::new(&network, config.transport_params(), config.arena.clone())?;
        info!(
            "quality solver opened: {} nodes, {} links, {} tanks, mode {:?}",
            network.node_count(),
            network.link_count(),
            network.tank_count(),
            config.mode
        );
        Ok(Self {
            network,
            config,
            state,
            phase: Phase::Opened,
            hydraulics: None,
            qtime: 0,
            pending_sort_us: 0,
            metrics: StepMetrics::default(),
        })
    }

    /// Seed initial qualities and segments and rewind to time zero.
    ///
    /// Discards any loaded hydraulics.
    pub fn initialize(&mut self) -> Result<(), QualityError> {
        if self.phase == Phase::Closed {
            return Err(QualityError::Closed);
        }
        self.hydraulics = None;
        self.qtime = 0;
        self.pending_sort_us = 0;
        self.metrics = StepMetrics::default();
        self.state.initialize(&self.network)?;
        self.phase = Phase::Initialized;
        info!(
            "quality solver initialized: {} segments, reactive={}",
            self.state.chains().live_segments(),
            self.state.is_reactive()
        );
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<(), QualityError> {
        match self.phase {
            Phase::Initialized => Ok(()),
            Phase::Opened => Err(QualityError::NotInitialized),
            Phase::Closed => Err(QualityError::Closed),
        }
    }

    /// Accept the hydraulic state for the interval starting at the current
    /// quality time.
    ///
    /// Recomputes wall reaction coefficients, updates flow directions,
    /// reverses the chains of links whose flow changed sign and re-sorts
    /// nodes when any direction changed.
    pub fn load_hydraulics(&mut self, hydraulics: HydraulicState) -> Result<(), QualityError> {
        self.ensure_initialized()?;
        hydraulics.check_dimensions(&self.network)?;

        if self.qtime < self.config.duration
            && self.state.is_reactive()
            && self.config.mode != QualityMode::Age
        {
            self.state
                .update_rate_coefficients(&self.network, &hydraulics);
        }
        let change = self.state.update_directions(&hydraulics);
        if !change.reversed.is_empty() {
            debug!(
                "t={}: {} links reversed flow",
                self.qtime,
                change.reversed.len()
            );
        }
        if self.state.needs_sort() {
            let start = Instant::now();
            let forced = self.state.sort(&self.network)?.forced.len();
            self.pending_sort_us = start.elapsed().as_micros() as u64;
            self.metrics.forced_nodes = forced;
        }
        self.hydraulics = Some(hydraulics);
        Ok(())
    }

    /// End of the loaded hydraulic interval, or the current quality time
    /// when none is loaded.
    pub fn hydraulic_time(&self) -> u64 {
        self.hydraulics
            .as_ref()
            .map_or(self.qtime, HydraulicState::end)
    }

    /// Whether the next step needs new hydraulics first.
    pub fn needs_hydraulics(&self) -> bool {
        self.qtime < self.config.duration && self.qtime >= self.hydraulic_time()
    }

    /// Advance one quality sub-step and return the time left in the run.
    ///
    /// The sub-step is `quality_step` seconds, shortened to end exactly at
    /// the end of the hydraulic interval or of the run. Returns 0 once the
    /// run is complete.
    pub fn step(&mut self) -> Result<u64, QualityError> {
        self.ensure_initialized()?;
        let duration = self.config.duration;
        if self.qtime >= duration {
            return Ok(0);
        }
        let htime = self.loaded_end()?;
        let dt = self
            .config
            .quality_step
            .min(htime - self.qtime)
            .min(duration - self.qtime);

        let start = Instant::now();
        let mut metrics = self.begin_metrics();
        self.advance(dt, htime, &mut metrics)?;
        self.state.evaluate_mass_balance();
        self.finish_metrics(metrics, start);
        Ok(duration - self.qtime)
    }

    /// Advance through the rest of the loaded hydraulic interval and return
    /// its length in seconds.
    ///
    /// Returns 0 when the run is complete.
    pub fn next(&mut self) -> Result<u64, QualityError> {
        self.ensure_initialized()?;
        let duration = self.config.duration;
        if self.qtime >= duration {
            return Ok(0);
        }
        let htime = self.loaded_end()?;
        let interval = htime.min(duration) - self.qtime;

        let start = Instant::now();
        let mut metrics = self.begin_metrics();
        let stop = self.qtime + interval;
        while self.qtime < stop {
            let dt = self.config.quality_step.min(stop - self.qtime);
            self.advance(dt, htime, &mut metrics)?;
        }
        self.state.evaluate_mass_balance();
        self.finish_metrics(metrics, start);
        Ok(interval)
    }

    /// Drive the run to completion, pulling hydraulics from `source`
    /// whenever the loaded interval is used up.
    pub fn run(&mut self, source: &mut dyn HydraulicSource) -> Result<(), QualityError> {
        self.ensure_initialized()?;
        while self.qtime < self.config.duration {
            if self.needs_hydraulics() {
                let hydraulics = source.state_at(self.qtime)?;
                if hydraulics.end() <= self.qtime {
                    return Err(QualityError::HydraulicsUnavailable {
                        reason: format!(
                            "interval ending at {} s does not cover t={} s",
                            hydraulics.end(),
                            self.qtime
                        ),
                    });
                }
                self.load_hydraulics(hydraulics)?;
            }
            self.next()?;
        }
        info!(
            "quality run complete at t={} s, mass balance ratio {:.6}",
            self.qtime,
            self.state.mass_balance().ratio
        );
        Ok(())
    }

    /// Release segment memory. Idempotent; the solver can only be queried
    /// afterwards.
    pub fn close(&mut self) {
        if self.phase == Phase::Closed {
            return;
        }
        self.state.destroy();
        self.hydraulics = None;
        self.phase = Phase::Closed;
        info!("quality solver closed at t={} s", self.qtime);
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The network being simulated.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// The configuration the solver was opened with.
    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// The underlying quality state.
    pub fn state(&self) -> &QualityState {
        &self.state
    }

    // ── internals ───────────────────────────────────────────────

    fn loaded_end(&self) -> Result<u64, QualityError> {
        let htime = self.hydraulic_time();
        if self.hydraulics.is_none() || htime <= self.qtime {
            return Err(QualityError::HydraulicsUnavailable {
                reason: format!("no hydraulics loaded for t={} s", self.qtime),
            });
        }
        Ok(htime)
    }

    /// One reaction-and-routing sub-step of `dt` seconds.
    fn advance(
        &mut self,
        dt: u64,
        htime: u64,
        metrics: &mut StepMetrics,
    ) -> Result<(), QualityError> {
        let Some(hydraulics) = self.hydraulics.as_ref() else {
            return Err(QualityError::HydraulicsUnavailable {
                reason: format!("no hydraulics loaded for t={} s", self.qtime),
            });
        };
        let step = SubStep {
            dt,
            qtime: self.qtime,
            htime,
        };
        if self.state.is_reactive() {
            let start = Instant::now();
            self.state.react(&self.network, step);
            metrics.reaction_us += start.elapsed().as_micros() as u64;
        }
        let start = Instant::now();
        self.state.route(&self.network, hydraulics, step);
        metrics.routing_us += start.elapsed().as_micros() as u64;
        metrics.sub_steps += 1;

        if self.state.is_out_of_memory() {
            return Err(QualityError::OutOfMemory);
        }
        self.qtime += dt;
        Ok(())
    }

    fn begin_metrics(&mut self) -> StepMetrics {
        StepMetrics {
            sort_us: std::mem::take(&mut self.pending_sort_us),
            forced_nodes: self.metrics.forced_nodes,
            ..StepMetrics::default()
        }
    }

    fn finish_metrics(&mut self, mut metrics: StepMetrics, start: Instant) {
        let chains = self.state.chains();
        let stats = chains.stats();
        metrics.live_segments = chains.live_segments();
        metrics.free_segments = chains.free_segments();
        metrics.fresh_allocations = stats.fresh_allocations;
        metrics.reuse_hits = stats.reuse_hits;
        metrics.block_count = chains.block_count();
        metrics.memory_bytes = chains.memory_bytes();
        metrics.total_us = start.elapsed().as_micros() as u64;
        self.metrics = metrics;
    }
}
