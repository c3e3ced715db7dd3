use serde::{Deserialize, Serialize};

pub type WireId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireOwner {
  GarblerInput,
  EvaluatorInput,
  Internal,
  Output,
}

// A Wire is an id tagged with the party, if any, that feeds it

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wire {
  pub id: WireId,
  pub owner: WireOwner,
}

impl Wire {
  pub fn new(id: WireId, owner: WireOwner) -> Self {
    Wire { id, owner }
  }
}
