//! Mask-based signal construction.

/// Builds a signal vector from boolean masks.
///
/// Starts all-zero. Each call writes its weight on every tick where the mask
/// is true; later calls overwrite earlier ones where masks overlap.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalBuilder {
    signals: Vec<f64>,
}

impl SignalBuilder {
    pub fn new(len: usize) -> Self {
        Self {
            signals: vec![0.0; len],
        }
    }

    /// Hold at `weight` (normally zero) where `mask` is true.
    pub fn hold(self, mask: &[bool], weight: f64) -> Self {
        self.apply(mask, weight)
    }

    /// Ask for long weight `weight` where `mask` is true.
    pub fn buy(self, mask: &[bool], weight: f64) -> Self {
        self.apply(mask, weight.abs())
    }

    /// Ask to sell `weight` where `mask` is true; stored as `-weight`.
    pub fn sell(self, mask: &[bool], weight: f64) -> Self {
        self.apply(mask, -weight.abs())
    }

    pub fn build(self) -> Vec<f64> {
        self.signals
    }

    fn apply(mut self, mask: &[bool], weight: f64) -> Self {
        for (slot, &on) in self.signals.iter_mut().zip(mask) {
            if on {
                *slot = weight;
            }
        }
        self
    }
}
