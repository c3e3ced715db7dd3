use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use yao_gc::{
  building_block::{
    circuit::{Circuit, CircuitFile},
    ot::{InsecureOptIn, OtMode, StrongOtParams, DEFAULT_MODULUS_BITS},
    util::{bits_to_string, from_bits},
  },
  config::{CircuitSource, PartyInput, ResultMode, Role, SessionConfig},
  protocols::{
    network::{Channel, TcpChannel},
    observer::{JsonDumpObserver, PhaseObserver, TracingObserver},
    yao_gc::{run_local, run_sessions},
  },
};

/// Two-party secure computation of boolean circuits with Yao's garbled circuits
#[derive(Parser, Debug)]
#[command(name = "yao-gc")]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Command,

  /// Log level used when RUST_LOG is not set
  #[arg(long, global = true, default_value = "info")]
  log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Garble the circuit and connect to the evaluator
  Garbler(RemoteArgs),
  /// Listen for the garbler and evaluate its circuit
  Evaluator(RemoteArgs),
  /// Run both parties in this process and check against plaintext evaluation
  Local(LocalArgs),
}

#[derive(Args, Debug)]
struct CircuitArgs {
  /// Circuit description file
  #[arg(long, value_name = "PATH", conflicts_with = "circuit_inline")]
  circuit: Option<PathBuf>,

  /// Circuit description as a JSON string
  #[arg(long, value_name = "JSON")]
  circuit_inline: Option<String>,

  /// Run only the circuit with this id
  #[arg(long, value_name = "ID")]
  circuit_id: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OtModeArg {
  Strong,
  Weak,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ResultModeArg {
  GarblerDecodes,
  RevealOutputPbits,
}

#[derive(Args, Debug)]
struct SessionArgs {
  #[arg(long, value_enum, default_value_t = OtModeArg::Strong)]
  ot_mode: OtModeArg,

  /// Required for --ot-mode weak, which sends the evaluator's bits in the clear
  #[arg(long)]
  allow_insecure_ot: bool,

  /// Refuse any setting that reveals private inputs
  #[arg(long)]
  require_privacy: bool,

  #[arg(long, value_enum, default_value_t = ResultModeArg::GarblerDecodes)]
  result_mode: ResultModeArg,

  /// RSA modulus size of the oblivious transfer
  #[arg(long, value_name = "BITS", default_value_t = DEFAULT_MODULUS_BITS)]
  ot_modulus_bits: usize,

  /// Write a JSON dump of every phase into this directory
  #[arg(long, value_name = "DIR")]
  dump_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InputArgs {
  /// Input bits, MSB first, e.g. 1,0,1
  #[arg(long, value_name = "BITS", conflicts_with = "value")]
  bits: Option<String>,

  /// Input as an unsigned integer
  #[arg(long, value_name = "N", requires = "bit_width")]
  value: Option<u64>,

  #[arg(long, value_name = "W")]
  bit_width: Option<usize>,
}

#[derive(Args, Debug)]
struct RemoteArgs {
  #[command(flatten)]
  circuit: CircuitArgs,

  #[command(flatten)]
  session: SessionArgs,

  #[command(flatten)]
  input: InputArgs,

  /// Address the evaluator listens on and the garbler connects to
  #[arg(long, env = "YAO_GC_ADDR", default_value = "127.0.0.1:5555")]
  addr: String,
}

#[derive(Args, Debug)]
struct LocalArgs {
  #[command(flatten)]
  circuit: CircuitArgs,

  #[command(flatten)]
  session: SessionArgs,

  #[arg(long, value_name = "BITS")]
  garbler_bits: Option<String>,

  #[arg(long, value_name = "N")]
  garbler_value: Option<u64>,

  #[arg(long, value_name = "BITS")]
  evaluator_bits: Option<String>,

  #[arg(long, value_name = "N")]
  evaluator_value: Option<u64>,

  /// Bit width of --garbler-value and --evaluator-value
  #[arg(long, value_name = "W")]
  bit_width: Option<usize>,
}

fn party_input(
  bits: Option<&str>,
  value: Option<u64>,
  bit_width: Option<usize>,
) -> anyhow::Result<PartyInput> {
  match (bits, value, bit_width) {
    (Some(bits), None, _) => Ok(PartyInput::Bits(PartyInput::parse_bits(bits)?)),
    (None, Some(value), Some(bit_width)) => Ok(PartyInput::Value { value, bit_width }),
    (None, Some(_), None) => bail!("a value input needs --bit-width"),
    (None, None, _) => Ok(PartyInput::Bits(vec![])),
    (Some(_), Some(_), _) => bail!("give either bits or a value, not both"),
  }
}

fn session_config(args: &SessionArgs) -> anyhow::Result<SessionConfig> {
  let ot_mode = match args.ot_mode {
    OtModeArg::Strong => OtMode::Strong(StrongOtParams { modulus_bits: args.ot_modulus_bits }),
    OtModeArg::Weak if args.allow_insecure_ot => {
      OtMode::Weak(InsecureOptIn::acknowledge_insecure())
    },
    OtModeArg::Weak => bail!("--ot-mode weak reveals the evaluator's input; pass --allow-insecure-ot to use it"),
  };
  let result_mode = match args.result_mode {
    ResultModeArg::GarblerDecodes => ResultMode::GarblerDecodes,
    ResultModeArg::RevealOutputPbits => ResultMode::RevealOutputPbits,
  };
  let config = SessionConfig {
    ot_mode,
    result_mode,
    require_privacy: args.require_privacy,
  };
  config.validate()?;
  Ok(config)
}

fn observer(args: &SessionArgs) -> anyhow::Result<Box<dyn PhaseObserver>> {
  Ok(match &args.dump_dir {
    Some(dir) => Box::new(
      JsonDumpObserver::new(dir).with_context(|| format!("cannot dump into {}", dir.display()))?,
    ),
    None => Box::new(TracingObserver),
  })
}

fn load_circuits(args: &CircuitArgs) -> anyhow::Result<Vec<Circuit>> {
  let source = match (&args.circuit, &args.circuit_inline) {
    (Some(path), None) => CircuitSource::Path(path.clone()),
    (None, Some(json)) => CircuitSource::Inline(json.clone()),
    _ => bail!("give exactly one of --circuit and --circuit-inline"),
  };
  let file: CircuitFile = source.load().context("cannot load the circuit description")?;

  match &args.circuit_id {
    Some(id) => {
      let circuit = file.get(id)
        .ok_or_else(|| anyhow!("{} has no circuit {:?}", file.name, id))?;
      Ok(vec![circuit.clone()])
    },
    None => Ok(file.circuits),
  }
}

fn render(bits: &[bool]) -> String {
  if bits.len() <= 64 {
    format!("{} ({})", bits_to_string(bits), from_bits(bits))
  } else {
    bits_to_string(bits)
  }
}

async fn run_remote(role: Role, args: RemoteArgs) -> anyhow::Result<()> {
  let config = session_config(&args.session)?;
  let circuits = load_circuits(&args.circuit)?;
  let input = party_input(args.input.bits.as_deref(), args.input.value, args.input.bit_width)?;
  let observer = observer(&args.session)?;

  let mut channel: Box<dyn Channel> = match role {
    Role::Garbler => Box::new(TcpChannel::connect(args.addr.as_str()).await
      .with_context(|| format!("cannot connect to the evaluator at {}", args.addr))?),
    Role::Evaluator => Box::new(TcpChannel::listen(args.addr.as_str()).await
      .with_context(|| format!("cannot listen on {}", args.addr))?),
  };

  let outcomes = run_sessions(role, config, &input, &circuits, channel.as_mut(), observer.as_ref())
    .await
    .context("session failed")?;
  for outcome in &outcomes {
    println!(
      "{}: {} input {} -> {}",
      outcome.circuit_id, role, render(&outcome.inputs), render(&outcome.outputs),
    );
  }
  Ok(())
}

async fn run_local_mode(args: LocalArgs) -> anyhow::Result<()> {
  let config = session_config(&args.session)?;
  let circuits = load_circuits(&args.circuit)?;
  let observer = observer(&args.session)?;
  let garbler_input = party_input(args.garbler_bits.as_deref(), args.garbler_value, args.bit_width)?;
  let evaluator_input = party_input(args.evaluator_bits.as_deref(), args.evaluator_value, args.bit_width)?;

  for circuit in &circuits {
    let run = run_local(circuit, config, &garbler_input, &evaluator_input, observer.as_ref())
      .await
      .with_context(|| format!("local run of circuit {:?} failed", circuit.id))?;
    if !run.matches_plaintext() {
      bail!(
        "circuit {:?}: garbled result {} differs from plaintext {}",
        circuit.id, render(&run.evaluator.outputs), render(&run.expected),
      );
    }
    println!("{}: {} (verified)", circuit.id, render(&run.evaluator.outputs));
  }
  Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
  tracing_subscriber::fmt().with_env_filter(filter).init();

  let command = cli.command;
  let run = async move {
    match command {
      Command::Garbler(args) => run_remote(Role::Garbler, args).await,
      Command::Evaluator(args) => run_remote(Role::Evaluator, args).await,
      Command::Local(args) => run_local_mode(args).await,
    }
  };

  // dropping the session aborts it with nothing decoded
  tokio::select! {
    res = run => res,
    _ = tokio::signal::ctrl_c() => bail!("interrupted"),
  }
}
