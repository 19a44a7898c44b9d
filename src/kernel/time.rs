/// Logical dialog clock. Advances once per reactor step, never by wall time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Tick {
    pub step: u64,
}

impl Tick {
    pub fn new() -> Self {
        Tick { step: 0 }
    }

    pub fn next(&self) -> Self {
        Tick { step: self.step + 1 }
    }

    /// Steps elapsed since `earlier`. Saturates at zero.
    pub fn since(&self, earlier: Tick) -> u64 {
        self.step.saturating_sub(earlier.step)
    }
}
