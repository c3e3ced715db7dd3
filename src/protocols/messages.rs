use crate::building_block::{
  circuit::Circuit,
  garbler::GarbledTables,
  ot::{OtOffer, OtRequest, OtResponse},
  wire::WireId,
  wire_label::WireLabel,
};
use crate::error::{Error, TransportError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// First message of a session, garbler to evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setup {
  pub circuit: Circuit,
  pub garbled_tables: GarbledTables,
  // None unless output pbits are revealed to the evaluator
  pub output_pbits: Option<BTreeMap<WireId, bool>>,
  pub garbler_labels: BTreeMap<WireId, WireLabel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
  Setup(Box<Setup>),
  Offer(OtOffer),
  Request(OtRequest),
  Response(OtResponse),
  WeakRequest { wire: WireId, choice: bool },
  WeakResponse { wire: WireId, label: WireLabel },
  OutputLabels { labels: BTreeMap<WireId, WireLabel> },
  Outputs { bits: Vec<bool> },
  Ack,
}

impl Message {
  pub fn kind(&self) -> &'static str {
    match self {
      Message::Setup(_) => "Setup",
      Message::Offer(_) => "Offer",
      Message::Request(_) => "Request",
      Message::Response(_) => "Response",
      Message::WeakRequest { .. } => "WeakRequest",
      Message::WeakResponse { .. } => "WeakResponse",
      Message::OutputLabels { .. } => "OutputLabels",
      Message::Outputs { .. } => "Outputs",
      Message::Ack => "Ack",
    }
  }

  pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
    Ok(bincode::serialize(self)?)
  }

  pub fn from_bytes(buf: &[u8]) -> Result<Self, Error> {
    Ok(bincode::deserialize(buf)?)
  }
}

pub(crate) fn unexpected(expected: &'static str, got: &Message) -> Error {
  TransportError::UnexpectedMessage {
    expected,
    got: got.kind().to_string(),
  }.into()
}
