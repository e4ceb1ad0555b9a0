//! Tank mixing models.
//!
//! Each tank owns one segment chain. How that chain is used depends on
//! the mixing model:
//!
//! - complete mix: a single segment holding the whole tank;
//! - two-compartment: the head segment is the stagnant zone, the tail
//!   segment the mixed zone next to the inlet/outlet;
//! - FIFO: plug flow, inflow at the tail and outflow from the head;
//! - LIFO: stacked plug flow, inflow and outflow both at the tail.

use plume_arena::ChainStore;
use plume_core::{ChainId, MixModel, Tank};

/// A tank's mixing model bound to its segment chain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TankMixer {
    /// Single well-mixed compartment.
    CompleteMix {
        /// The tank's chain.
        chain: ChainId,
    },
    /// Mixed zone of fixed maximum size plus a stagnant zone.
    TwoCompartment {
        /// The tank's chain.
        chain: ChainId,
        /// Full mixed-zone volume, m³.
        mixing_zone_volume: f64,
    },
    /// First in, first out.
    Fifo {
        /// The tank's chain.
        chain: ChainId,
    },
    /// Last in, first out.
    Lifo {
        /// The tank's chain.
        chain: ChainId,
    },
}

impl TankMixer {
    /// Bind `tank`'s mixing model to `chain`.
    pub fn new(tank: &Tank, chain: ChainId) -> Self {
        match tank.mix_model {
            MixModel::CompleteMix => Self::CompleteMix { chain },
            MixModel::TwoCompartment => Self::TwoCompartment {
                chain,
                mixing_zone_volume: tank.mixing_zone_volume,
            },
            MixModel::Fifo => Self::Fifo { chain },
            MixModel::Lifo => Self::Lifo { chain },
        }
    }

    /// The chain holding this tank's water.
    pub fn chain(&self) -> ChainId {
        match *self {
            Self::CompleteMix { chain }
            | Self::TwoCompartment { chain, .. }
            | Self::Fifo { chain }
            | Self::Lifo { chain } => chain,
        }
    }

    /// Create the initial segments for a tank holding `volume` at `quality`.
    ///
    /// Allocation failure is reported through the store's out-of-memory
    /// flag.
    pub fn fill(&self, chains: &mut ChainStore, volume: f64, quality: f64) {
        match *self {
            Self::TwoCompartment {
                chain,
                mixing_zone_volume,
            } => {
                let stagnant = (volume - mixing_zone_volume).max(0.0);
                let _ = chains.add_segment(chain, stagnant, quality);
                let _ = chains.add_segment(chain, volume - stagnant, quality);
            }
            _ => {
                let _ = chains.add_segment(self.chain(), volume, quality);
            }
        }
    }

    /// Mix one sub-step of exchange into the tank and return the quality
    /// of the water leaving it.
    ///
    /// `vin`/`win` are the inflow volume and mass, `vnet` the net volume
    /// change (inflow minus outflow). A tank whose segments could not be
    /// allocated keeps `current`.
    pub fn mix(
        &self,
        chains: &mut ChainStore,
        vin: f64,
        win: f64,
        vnet: f64,
        tolerance: f64,
        current: f64,
    ) -> f64 {
        match *self {
            Self::CompleteMix { chain } => complete_mix(chains, chain, vin, win, vnet, current),
            Self::TwoCompartment {
                chain,
                mixing_zone_volume,
            } => two_compartment(chains, chain, mixing_zone_volume, vin, win, vnet, current),
            Self::Fifo { chain } => fifo(chains, chain, vin, win, vnet, tolerance, current),
            Self::Lifo { chain } => lifo(chains, chain, vin, win, vnet, tolerance, current),
        }
    }

    /// Volume currently stored.
    pub fn volume(&self, chains: &ChainStore) -> f64 {
        chains.volume(self.chain())
    }
}

fn inflow_quality(vin: f64, win: f64) -> f64 {
    if vin > 0.0 {
        win / vin
    } else {
        0.0
    }
}

fn complete_mix(
    chains: &mut ChainStore,
    chain: ChainId,
    vin: f64,
    win: f64,
    vnet: f64,
    current: f64,
) -> f64 {
    let Some(h) = chains.first_handle(chain) else {
        return current;
    };
    let seg = chains.segment_mut(h);
    let vnew = seg.volume + vin;
    if vnew > 0.0 {
        let cin = if vin > 0.0 { win / vin } else { seg.quality };
        let upper = seg.quality.max(cin);
        seg.quality = ((seg.quality * seg.volume + win) / vnew).clamp(0.0, upper.max(0.0));
    }
    seg.volume = (seg.volume + vnet).max(0.0);
    seg.quality
}

fn two_compartment(
    chains: &mut ChainStore,
    chain: ChainId,
    vmz: f64,
    vin: f64,
    win: f64,
    vnet: f64,
    current: f64,
) -> f64 {
    let (Some(stag_h), Some(mix_h)) = (chains.first_handle(chain), chains.last_handle(chain))
    else {
        return current;
    };
    if stag_h == mix_h {
        return current;
    }
    let mut stag = *chains.segment(stag_h);
    let mut mix = *chains.segment(mix_h);

    if vnet >= 0.0 {
        // Filling (or through-flow): excess over the mixed zone's capacity
        // overflows into the stagnant zone.
        let vt = (mix.volume + vnet - vmz).max(0.0);
        if vin > 0.0 {
            mix.quality = (mix.quality * mix.volume + win) / (mix.volume + vin);
        }
        if vt > 0.0 {
            stag.quality = (stag.quality * stag.volume + mix.quality * vt) / (stag.volume + vt);
            stag.volume += vt;
            mix.volume = vmz;
        } else {
            mix.volume = (mix.volume + vnet).min(vmz);
        }
    } else {
        // Emptying: stagnant water is drawn into the mixed zone.
        let vt = stag.volume.max(0.0).min(-vnet);
        if vin + vt > 0.0 {
            mix.quality =
                (mix.quality * mix.volume + win + stag.quality * vt) / (mix.volume + vin + vt);
        }
        stag.volume = (stag.volume - vt).max(0.0);
        mix.volume = (mix.volume + vnet + vt).clamp(0.0, vmz.max(0.0));
    }

    let s = chains.segment_mut(stag_h);
    s.volume = stag.volume;
    s.quality = stag.quality;
    let m = chains.segment_mut(mix_h);
    m.volume = mix.volume;
    m.quality = mix.quality;
    mix.quality
}

fn fifo(
    chains: &mut ChainStore,
    chain: ChainId,
    vin: f64,
    win: f64,
    vnet: f64,
    tolerance: f64,
    current: f64,
) -> f64 {
    if chains.is_empty(chain) {
        return current;
    }
    if vin > 0.0 {
        chains.append_or_merge_at_tail(chain, vin, win / vin, tolerance);
    }
    let out = chains.drain_head(chain, vin - vnet, true);
    match out.quality() {
        Some(c) => c,
        None => chains.first(chain).map_or(0.0, |s| s.quality),
    }
}

fn lifo(
    chains: &mut ChainStore,
    chain: ChainId,
    vin: f64,
    win: f64,
    vnet: f64,
    tolerance: f64,
    current: f64,
) -> f64 {
    let Some(tail_quality) = chains.last(chain).map(|s| s.quality) else {
        return current;
    };
    if vnet > 0.0 {
        chains.append_or_merge_at_tail(chain, vnet, inflow_quality(vin, win), tolerance);
        chains.last(chain).map_or(tail_quality, |s| s.quality)
    } else if vnet < 0.0 {
        let out = chains.drain_tail(chain, -vnet, true);
        let v = out.volume + vin;
        if v > 0.0 {
            (out.mass + win) / v
        } else {
            tail_quality
        }
    } else {
        tail_quality
    }
}
