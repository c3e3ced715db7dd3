use rsa::{
  traits::{PrivateKeyParts, PublicKeyParts},
  BigUint,
  RsaPrivateKey as PrivKey,
};
use crate::building_block::{
  util::xor_bytes,
  wire::WireId,
  wire_label::{WireLabel, LABEL_LEN},
};
use crate::error::{CryptoError, Error, Result};
use crate::protocols::{
  messages::Message,
  network::Channel,
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

pub const DEFAULT_MODULUS_BITS: usize = 2048;
pub const MIN_MODULUS_BITS: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrongOtParams {
  pub modulus_bits: usize,
}

impl Default for StrongOtParams {
  fn default() -> Self {
    StrongOtParams { modulus_bits: DEFAULT_MODULUS_BITS }
  }
}

/// Proof that the caller asked for the non-private transfer on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsecureOptIn(());

impl InsecureOptIn {
  pub fn acknowledge_insecure() -> Self {
    InsecureOptIn(())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtMode {
  /// Even-Goldreich-Lempel over RSA.
  Strong(StrongOtParams),
  /// The receiver's choice travels in the clear. Testing and baselines only.
  Weak(InsecureOptIn),
}

impl Default for OtMode {
  fn default() -> Self {
    OtMode::Strong(StrongOtParams::default())
  }
}

impl OtMode {
  pub fn is_private(&self) -> bool {
    matches!(self, OtMode::Strong(_))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtOffer {
  pub wire: WireId,
  pub n: Vec<u8>,
  pub e: Vec<u8>,
  pub x0: Vec<u8>,
  pub x1: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtRequest {
  pub wire: WireId,
  pub v: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtResponse {
  pub wire: WireId,
  pub c0: [u8; LABEL_LEN],
  pub c1: [u8; LABEL_LEN],
}

// uniform enough in Z_n: 64 extra bits before the reduction
fn random_below<R: RngCore + CryptoRng>(rng: &mut R, n: &BigUint) -> Result<BigUint> {
  let mut buf = vec![0u8; n.to_bytes_be().len() + 8];
  rng.try_fill_bytes(&mut buf)?;
  Ok(BigUint::from_bytes_be(&buf) % n)
}

fn compute_mask(wire: WireId, index: u8, k: &BigUint) -> [u8; LABEL_LEN] {
  let mut hasher = Sha256::new();
  hasher.update(wire.to_be_bytes());
  hasher.update([index]);
  hasher.update(k.to_bytes_be());
  let hash = hasher.finalize();

  let mut mask = [0u8; LABEL_LEN];
  mask.copy_from_slice(&hash[..LABEL_LEN]);
  mask
}

fn check_wire(expected: WireId, got: WireId) -> Result<()> {
  if expected != got {
    return Err(Error::transfer_aborted(
      expected,
      format!("message is for wire {}", got),
    ));
  }
  Ok(())
}

/// Sender half of one transfer, without any transport.
pub struct EglSender {
  wire: WireId,
  sk: PrivKey,
  x: [BigUint; 2],
  messages: [WireLabel; 2],
}

impl EglSender {
  pub fn new<R: RngCore + CryptoRng>(
    rng: &mut R,
    modulus_bits: usize,
    wire: WireId,
    messages: [WireLabel; 2],
  ) -> Result<Self> {
    // a fresh key pair for every wire
    let sk = PrivKey::new(rng, modulus_bits).map_err(CryptoError::from)?;
    let x0 = random_below(rng, sk.n())?;
    let x1 = random_below(rng, sk.n())?;
    Ok(EglSender { wire, sk, x: [x0, x1], messages })
  }

  pub fn offer(&self) -> OtOffer {
    OtOffer {
      wire: self.wire,
      n: self.sk.n().to_bytes_be(),
      e: self.sk.e().to_bytes_be(),
      x0: self.x[0].to_bytes_be(),
      x1: self.x[1].to_bytes_be(),
    }
  }

  pub fn respond(&self, request: &OtRequest) -> Result<OtResponse> {
    check_wire(self.wire, request.wire)?;
    let n = self.sk.n();
    let v = BigUint::from_bytes_be(&request.v);
    if &v >= n {
      return Err(CryptoError::MalformedTransfer(self.wire).into());
    }

    // k_i = (v - x_i)^d mod n; only k_choice equals the receiver's k
    let c = [0u8, 1].map(|i| {
      let x = &self.x[i as usize];
      let k = ((&v + n) - x) % n;
      let k = k.modpow(self.sk.d(), n);
      xor_bytes(&self.messages[i as usize].serialize(), &compute_mask(self.wire, i, &k))
    });
    Ok(OtResponse { wire: self.wire, c0: c[0], c1: c[1] })
  }
}

/// Receiver half of one transfer, without any transport.
pub struct EglReceiver {
  wire: WireId,
  choice: bool,
  k: BigUint,
  v: BigUint,
}

impl EglReceiver {
  pub fn new<R: RngCore + CryptoRng>(
    choice: bool,
    offer: &OtOffer,
    rng: &mut R,
  ) -> Result<Self> {
    let malformed = || Error::from(CryptoError::MalformedTransfer(offer.wire));
    let n = BigUint::from_bytes_be(&offer.n);
    let e = BigUint::from_bytes_be(&offer.e);
    let x0 = BigUint::from_bytes_be(&offer.x0);
    let x1 = BigUint::from_bytes_be(&offer.x1);
    let zero = BigUint::from(0u8);
    if n <= BigUint::from(1u8) || e == zero || x0 >= n || x1 >= n {
      return Err(malformed());
    }

    let k = random_below(rng, &n)?;
    let x = if choice { x1 } else { x0 };
    let v = (x + k.modpow(&e, &n)) % &n;
    Ok(EglReceiver { wire: offer.wire, choice, k, v })
  }

  pub fn request(&self) -> OtRequest {
    OtRequest { wire: self.wire, v: self.v.to_bytes_be() }
  }

  pub fn finish(self, response: &OtResponse) -> Result<WireLabel> {
    check_wire(self.wire, response.wire)?;
    let c = if self.choice { &response.c1 } else { &response.c0 };
    let buf = xor_bytes(c, &compute_mask(self.wire, self.choice as u8, &self.k));
    WireLabel::deserialize(self.wire, &buf)
  }
}

fn unexpected(wire: WireId, expected: &str, got: &Message) -> Error {
  Error::transfer_aborted(wire, format!("expected {}, got {}", expected, got.kind()))
}

// any transport failure in the middle of a transfer aborts it
async fn recv_in_transfer<C: Channel + ?Sized>(channel: &mut C, wire: WireId) -> Result<Message> {
  channel.recv().await.map_err(|e| Error::transfer_aborted(wire, e.to_string()))
}

async fn send_in_transfer<C: Channel + ?Sized>(channel: &mut C, wire: WireId, msg: &Message) -> Result<()> {
  channel.send(msg).await.map_err(|e| Error::transfer_aborted(wire, e.to_string()))
}

/// 1-out-of-2 transfer of wire labels over a channel.
pub struct ObliviousTransfer {
  mode: OtMode,
}

impl ObliviousTransfer {
  pub fn new(mode: OtMode) -> Self {
    if !mode.is_private() {
      warn!("oblivious transfer runs in weak mode: the evaluator's choices are sent in the clear");
    }
    ObliviousTransfer { mode }
  }

  #[instrument(level = "debug", skip(self, channel, messages, rng), err)]
  pub async fn send<C, R>(
    &self,
    channel: &mut C,
    wire: WireId,
    messages: [WireLabel; 2],
    rng: &mut R,
  ) -> Result<()>
  where
    C: Channel + ?Sized,
    R: RngCore + CryptoRng + Send,
  {
    match self.mode {
      OtMode::Strong(params) => {
        let sender = EglSender::new(rng, params.modulus_bits, wire, messages)?;
        send_in_transfer(channel, wire, &Message::Offer(sender.offer())).await?;
        let request = match recv_in_transfer(channel, wire).await? {
          Message::Request(request) => request,
          other => return Err(unexpected(wire, "Request", &other)),
        };
        let response = sender.respond(&request)?;
        send_in_transfer(channel, wire, &Message::Response(response)).await?;
      },
      OtMode::Weak(_) => {
        let choice = match recv_in_transfer(channel, wire).await? {
          Message::WeakRequest { wire: w, choice } => {
            check_wire(wire, w)?;
            choice
          },
          other => return Err(unexpected(wire, "WeakRequest", &other)),
        };
        let label = messages[choice as usize];
        send_in_transfer(channel, wire, &Message::WeakResponse { wire, label }).await?;
      },
    }
    debug!(wire, "sent wire label");
    Ok(())
  }

  #[instrument(level = "debug", skip(self, channel, choice, rng), err)]
  pub async fn receive<C, R>(
    &self,
    channel: &mut C,
    wire: WireId,
    choice: bool,
    rng: &mut R,
  ) -> Result<WireLabel>
  where
    C: Channel + ?Sized,
    R: RngCore + CryptoRng + Send,
  {
    let label = match self.mode {
      OtMode::Strong(_) => {
        let offer = match recv_in_transfer(channel, wire).await? {
          Message::Offer(offer) => offer,
          other => return Err(unexpected(wire, "Offer", &other)),
        };
        check_wire(wire, offer.wire)?;
        let receiver = EglReceiver::new(choice, &offer, rng)?;
        send_in_transfer(channel, wire, &Message::Request(receiver.request())).await?;
        match recv_in_transfer(channel, wire).await? {
          Message::Response(response) => receiver.finish(&response)?,
          other => return Err(unexpected(wire, "Response", &other)),
        }
      },
      OtMode::Weak(_) => {
        send_in_transfer(channel, wire, &Message::WeakRequest { wire, choice }).await?;
        match recv_in_transfer(channel, wire).await? {
          Message::WeakResponse { wire: w, label } => {
            check_wire(wire, w)?;
            label
          },
          other => return Err(unexpected(wire, "WeakResponse", &other)),
        }
      },
    };
    debug!(wire, "received wire label");
    Ok(label)
  }
}
