use crate::building_block::wire::WireId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("configuration error: {0}")]
  Configuration(#[from] ConfigurationError),
  #[error("transport error: {0}")]
  Transport(#[from] TransportError),
  #[error("crypto invariant violation: {0}")]
  CryptoInvariantViolation(#[from] CryptoError),
  #[error("privacy violation risk: {0}")]
  PrivacyViolationRisk(String),
  #[error("insufficient entropy: {0}")]
  InsufficientEntropy(#[from] rand::Error),
}

/// Problems with the circuit or the session configuration. Always fatal at
/// startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
  #[error("malformed circuit: {0}")]
  MalformedCircuit(String),
  #[error("unknown gate kind {0:?}")]
  UnknownGateKind(String),
  #[error("gate {gate} references wire {wire} which has no key material")]
  DanglingWire { gate: WireId, wire: WireId },
  #[error("expected {expected} input bits, got {got}")]
  InputLengthMismatch { expected: usize, got: usize },
  #[error("value {value} does not fit in {bit_width} bits")]
  ValueOutOfRange { value: u64, bit_width: usize },
  #[error("invalid option: {0}")]
  InvalidOption(String),
  #[error("failed to read circuit description: {0}")]
  Io(#[from] std::io::Error),
  #[error("failed to parse circuit description: {0}")]
  Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
  #[error("connection lost")]
  ConnectionLost,
  #[error("malformed message: {0}")]
  MalformedMessage(#[from] bincode::Error),
  #[error("expected {expected}, got {got}")]
  UnexpectedMessage { expected: &'static str, got: String },
  #[error("oblivious transfer for wire {wire} aborted: {reason}")]
  TransferAborted { wire: WireId, reason: String },
  #[error("io: {0}")]
  Io(#[from] std::io::Error),
}

/// Signals a protocol bug or tampering. Never recovered from.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
  #[error("row {row} of gate {gate} failed to decrypt")]
  DecryptionMismatch { gate: WireId, row: usize },
  #[error("gate {gate} has {got} rows, expected {expected}")]
  UnexpectedRowShape { gate: WireId, expected: usize, got: usize },
  #[error("no label for wire {0}")]
  MissingLabel(WireId),
  #[error("label returned for output wire {0} is not one of its keys")]
  UnauthenticatedLabel(WireId),
  #[error("malformed oblivious transfer value for wire {0}")]
  MalformedTransfer(WireId),
  #[error("rsa: {0}")]
  Rsa(#[from] rsa::Error),
}

impl From<bincode::Error> for Error {
  fn from(err: bincode::Error) -> Self {
    Error::Transport(TransportError::MalformedMessage(err))
  }
}

impl From<std::io::Error> for Error {
  fn from(err: std::io::Error) -> Self {
    Error::Transport(TransportError::Io(err))
  }
}

impl Error {
  pub(crate) fn transfer_aborted(wire: WireId, reason: impl Into<String>) -> Self {
    Error::Transport(TransportError::TransferAborted {
      wire,
      reason: reason.into(),
    })
  }
}
