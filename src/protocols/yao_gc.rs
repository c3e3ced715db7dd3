use crate::building_block::{
  circuit::{check_len, Circuit},
  evaluator::CircuitEvaluator,
  garbler::CircuitGarbler,
  key_material::KeyMaterial,
  ot::ObliviousTransfer,
  output_decoding_table::OutputDecodingTable,
  wire::WireId,
  wire_label::WireLabel,
};
use crate::config::{PartyInput, ResultMode, Role, SessionConfig};
use crate::error::{ConfigurationError, CryptoError, Result};
use crate::protocols::{
  messages::{unexpected, Message, Setup},
  network::{Channel, MemoryChannel},
  observer::{PhaseObserver, PhaseReport},
};
use rand::{rngs::OsRng, CryptoRng, RngCore};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// Phases both roles go through, in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Phase {
  Setup,
  InputTransfer,
  Evaluation,
  OutputDecoding,
  Done,
}

impl Phase {
  pub fn next(self) -> Option<Phase> {
    match self {
      Phase::Setup => Some(Phase::InputTransfer),
      Phase::InputTransfer => Some(Phase::Evaluation),
      Phase::Evaluation => Some(Phase::OutputDecoding),
      Phase::OutputDecoding => Some(Phase::Done),
      Phase::Done => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
  pub circuit_id: String,
  pub role: Role,
  // this party's own input bits
  pub inputs: Vec<bool>,
  pub outputs: Vec<bool>,
}

// a session with the phase it is currently in
struct Session<'a, O: PhaseObserver + ?Sized> {
  role: Role,
  circuit: &'a Circuit,
  observer: &'a O,
  phase: Phase,
}

impl<'a, O: PhaseObserver + ?Sized> Session<'a, O> {
  fn report(&self) -> PhaseReport {
    PhaseReport::new(&self.circuit.id, self.role, self.phase)
  }

  fn complete(&mut self, report: PhaseReport) -> Result<()> {
    debug!(role = %self.role, phase = ?self.phase, "phase complete");
    self.observer.on_phase(&report)?;
    if let Some(next) = self.phase.next() {
      self.phase = next;
    }
    Ok(())
  }
}

/// One side of a two-party garbled circuit session.
pub struct Party {
  role: Role,
  config: SessionConfig,
  inputs: Vec<bool>,
}

impl Party {
  pub fn new(role: Role, config: SessionConfig, inputs: Vec<bool>) -> Result<Self> {
    config.validate()?;
    Ok(Party { role, config, inputs })
  }

  pub async fn run<C, O>(
    &self,
    channel: &mut C,
    circuit: &Circuit,
    observer: &O,
  ) -> Result<SessionOutcome>
  where
    C: Channel + ?Sized,
    O: PhaseObserver + ?Sized,
  {
    self.run_with_rng(channel, circuit, observer, &mut OsRng).await
  }

  #[instrument(level = "debug", skip_all, fields(role = %self.role, circuit = %circuit.id), err)]
  pub async fn run_with_rng<C, O, R>(
    &self,
    channel: &mut C,
    circuit: &Circuit,
    observer: &O,
    rng: &mut R,
  ) -> Result<SessionOutcome>
  where
    C: Channel + ?Sized,
    O: PhaseObserver + ?Sized,
    R: RngCore + CryptoRng + Send,
  {
    let mut session = Session {
      role: self.role,
      circuit,
      observer,
      phase: Phase::Setup,
    };
    let outputs = match self.role {
      Role::Garbler => self.run_garbler(channel, &mut session, rng).await?,
      Role::Evaluator => self.run_evaluator(channel, &mut session, rng).await?,
    };

    let mut report = session.report();
    report.wires = circuit.outputs.clone();
    report.bits = outputs.clone();
    session.complete(report)?;

    info!(role = %self.role, circuit = %circuit.id, "session finished");
    Ok(SessionOutcome {
      circuit_id: circuit.id.clone(),
      role: self.role,
      inputs: self.inputs.clone(),
      outputs,
    })
  }

  async fn run_garbler<C, O, R>(
    &self,
    channel: &mut C,
    session: &mut Session<'_, O>,
    rng: &mut R,
  ) -> Result<Vec<bool>>
  where
    C: Channel + ?Sized,
    O: PhaseObserver + ?Sized,
    R: RngCore + CryptoRng + Send,
  {
    let circuit = session.circuit;
    check_len(circuit.garbler_wires.len(), self.inputs.len())?;

    // setup: fresh key material for this run only
    let key_material = KeyMaterial::for_circuit(circuit, rng)?;
    let garbled = CircuitGarbler::garble(circuit, &key_material)?;

    let garbler_labels = circuit.garbler_wires
      .iter()
      .zip(self.inputs.iter())
      .map(|(w, v)| {
        key_material.label(*w, *v)
          .map(|l| (*w, l))
          .ok_or(CryptoError::MissingLabel(*w))
      })
      .collect::<std::result::Result<BTreeMap<WireId, WireLabel>, _>>()?;

    let output_pbits = match self.config.result_mode {
      ResultMode::GarblerDecodes => None,
      ResultMode::RevealOutputPbits => Some(garbled.output_pbits().clone()),
    };

    let num_tables = garbled.tables.tables.len();
    let setup = Setup {
      circuit: circuit.clone(),
      garbled_tables: garbled.tables,
      output_pbits,
      garbler_labels,
    };
    channel.send_wait(&Message::Setup(Box::new(setup))).await?;

    let mut report = session.report();
    report.gates = Some(num_tables);
    report.wires = circuit.garbler_wires.clone();
    report.bits = self.inputs.clone();
    session.complete(report)?;

    // one transfer per evaluator wire, in declaration order
    let ot = ObliviousTransfer::new(self.config.ot_mode);
    for w in &circuit.evaluator_wires {
      let labels = key_material.labels(*w).ok_or(CryptoError::MissingLabel(*w))?;
      ot.send(channel, *w, labels, rng).await?;
    }
    session.complete(session.report())?;

    // the garbler does not evaluate
    session.complete(session.report())?;

    let outputs = match self.config.result_mode {
      ResultMode::GarblerDecodes => {
        let labels = match channel.recv().await? {
          Message::OutputLabels { labels } => labels,
          other => return Err(unexpected("OutputLabels", &other)),
        };
        let bits = OutputDecodingTable::authenticate_and_decode(
          &key_material,
          &circuit.outputs,
          &labels,
        )?;
        channel.send_wait(&Message::Outputs { bits: bits.clone() }).await?;
        bits
      },
      ResultMode::RevealOutputPbits => {
        let bits = match channel.recv().await? {
          Message::Outputs { bits } => bits,
          other => return Err(unexpected("Outputs", &other)),
        };
        check_len(circuit.outputs.len(), bits.len())?;
        channel.send_ack().await?;
        bits
      },
    };
    session.complete(session.report())?;
    Ok(outputs)
  }

  async fn run_evaluator<C, O, R>(
    &self,
    channel: &mut C,
    session: &mut Session<'_, O>,
    rng: &mut R,
  ) -> Result<Vec<bool>>
  where
    C: Channel + ?Sized,
    O: PhaseObserver + ?Sized,
    R: RngCore + CryptoRng + Send,
  {
    let circuit = session.circuit;
    check_len(circuit.evaluator_wires.len(), self.inputs.len())?;

    let setup = match channel.recv().await? {
      Message::Setup(setup) => *setup,
      other => return Err(unexpected("Setup", &other)),
    };
    // both parties must agree on the function being computed
    if setup.circuit.clone().validated()? != *circuit {
      return Err(ConfigurationError::MalformedCircuit(format!(
        "garbler sent circuit {:?}, expected {:?}", setup.circuit.id, circuit.id,
      )).into());
    }
    channel.send_ack().await?;

    let mut report = session.report();
    report.gates = Some(setup.garbled_tables.tables.len());
    session.complete(report)?;

    let mut labels = setup.garbler_labels;
    if labels.len() != circuit.garbler_wires.len() {
      return Err(ConfigurationError::InputLengthMismatch {
        expected: circuit.garbler_wires.len(),
        got: labels.len(),
      }.into());
    }

    let ot = ObliviousTransfer::new(self.config.ot_mode);
    for (w, choice) in circuit.evaluator_wires.iter().zip(self.inputs.iter()) {
      let label = ot.receive(channel, *w, *choice, rng).await?;
      labels.insert(*w, label);
    }

    let mut report = session.report();
    report.wires = circuit.evaluator_wires.clone();
    report.bits = self.inputs.clone();
    session.complete(report)?;

    let output_labels = CircuitEvaluator::evaluate(circuit, &setup.garbled_tables.tables, labels)?;
    session.complete(session.report())?;

    let outputs = match self.config.result_mode {
      ResultMode::GarblerDecodes => {
        channel.send(&Message::OutputLabels { labels: output_labels }).await?;
        let bits = match channel.recv().await? {
          Message::Outputs { bits } => bits,
          other => return Err(unexpected("Outputs", &other)),
        };
        check_len(circuit.outputs.len(), bits.len())?;
        channel.send_ack().await?;
        bits
      },
      ResultMode::RevealOutputPbits => {
        let pbits = setup.output_pbits.ok_or(ConfigurationError::InvalidOption(
          "garbler did not reveal the output pbits".to_string(),
        ))?;
        let bits = OutputDecodingTable::new(pbits).decode(&circuit.outputs, &output_labels)?;
        channel.send_wait(&Message::Outputs { bits: bits.clone() }).await?;
        bits
      },
    };
    session.complete(session.report())?;
    Ok(outputs)
  }
}

/// Runs one session per circuit, in order, over a single channel. Every
/// session gets a fresh `Party` and so fresh key material.
pub async fn run_sessions<C, O>(
  role: Role,
  config: SessionConfig,
  input: &PartyInput,
  circuits: &[Circuit],
  channel: &mut C,
  observer: &O,
) -> Result<Vec<SessionOutcome>>
where
  C: Channel + ?Sized,
  O: PhaseObserver + ?Sized,
{
  let mut outcomes = Vec::with_capacity(circuits.len());
  for circuit in circuits {
    let num_inputs = match role {
      Role::Garbler => circuit.garbler_wires.len(),
      Role::Evaluator => circuit.evaluator_wires.len(),
    };
    let party = Party::new(role, config, input.bits_for(num_inputs)?)?;
    outcomes.push(party.run(channel, circuit, observer).await?);
  }
  Ok(outcomes)
}

/// Both parties of a session run in this process, next to the plaintext
/// evaluation of the same inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRun {
  pub garbler: SessionOutcome,
  pub evaluator: SessionOutcome,
  pub expected: Vec<bool>,
}

impl LocalRun {
  pub fn matches_plaintext(&self) -> bool {
    self.garbler.outputs == self.expected && self.evaluator.outputs == self.expected
  }
}

pub async fn run_local<O>(
  circuit: &Circuit,
  config: SessionConfig,
  garbler_input: &PartyInput,
  evaluator_input: &PartyInput,
  observer: &O,
) -> Result<LocalRun>
where
  O: PhaseObserver + ?Sized,
{
  let garbler_bits = garbler_input.bits_for(circuit.garbler_wires.len())?;
  let evaluator_bits = evaluator_input.bits_for(circuit.evaluator_wires.len())?;
  let expected = circuit.evaluate(&garbler_bits, &evaluator_bits)?;

  let garbler = Party::new(Role::Garbler, config, garbler_bits)?;
  let evaluator = Party::new(Role::Evaluator, config, evaluator_bits)?;
  let (mut g_ch, mut e_ch) = MemoryChannel::pair();
  let (g, e) = tokio::join!(
    garbler.run(&mut g_ch, circuit, observer),
    evaluator.run(&mut e_ch, circuit, observer),
  );

  let run = LocalRun { garbler: g?, evaluator: e?, expected };
  if run.matches_plaintext() {
    info!(circuit = %circuit.id, "garbled result matches plaintext evaluation");
  }
  Ok(run)
}
