//! System-wide constituent mass balance.

/// Mass bookkeeping since the last initialization.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MassBalance {
    /// Mass stored in pipes and tanks at initialization.
    pub initial: f64,
    /// Mass that entered through sources and reservoirs.
    pub inflow: f64,
    /// Mass that left through demands and into reservoirs.
    pub outflow: f64,
    /// Net mass removed by reactions (negative for growth).
    pub reacted: f64,
    /// Mass stored at the last evaluation.
    pub stored: f64,
    /// Mass out over mass in; 1 when nothing entered.
    pub ratio: f64,
}

impl MassBalance {
    /// Start a new balance with `initial` mass in storage.
    pub fn new(initial: f64) -> Self {
        Self {
            initial,
            stored: initial,
            ratio: 1.0,
            ..Self::default()
        }
    }

    /// Record the current stored mass and recompute the ratio.
    ///
    /// Mass lost to reactions counts as outgoing; mass gained counts as
    /// incoming.
    pub fn evaluate(&mut self, stored: f64) {
        self.stored = stored;
        let mut mass_in = self.initial + self.inflow;
        let mut mass_out = self.outflow + self.stored;
        if self.reacted > 0.0 {
            mass_out += self.reacted;
        } else {
            mass_in -= self.reacted;
        }
        self.ratio = if mass_in == 0.0 {
            1.0
        } else {
            mass_out / mass_in
        };
    }
}
