use serde::{Deserialize, Serialize};
use std::fmt;

/// What the engine did on a tick.
///
/// Serialized as the single-letter codes `B`, `S`, `H` used by downstream
/// ledger consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "B")]
    Buy,
    #[serde(rename = "S")]
    Sell,
    #[serde(rename = "H")]
    Hold,
}

impl Action {
    pub fn code(self) -> &'static str {
        match self {
            Action::Buy => "B",
            Action::Sell => "S",
            Action::Hold => "H",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
