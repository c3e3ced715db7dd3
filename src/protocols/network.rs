use crate::error::{Result, TransportError};
use crate::protocols::messages::{unexpected, Message};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{debug, trace};

type ValueType = Vec<u8>;

/// One end of a reliable, ordered, two-party link.
#[async_trait]
pub trait Channel: Send {
  async fn send(&mut self, msg: &Message) -> Result<()>;

  async fn recv(&mut self) -> Result<Message>;

  async fn send_wait(&mut self, msg: &Message) -> Result<()> {
    self.send(msg).await?;
    match self.recv().await? {
      Message::Ack => Ok(()),
      other => Err(unexpected("Ack", &other)),
    }
  }

  async fn send_ack(&mut self) -> Result<()> {
    self.send(&Message::Ack).await
  }
}

/// In-process channel. Messages still go through their byte encoding.
pub struct MemoryChannel {
  tx: mpsc::UnboundedSender<ValueType>,
  rx: mpsc::UnboundedReceiver<ValueType>,
}

impl MemoryChannel {
  pub fn pair() -> (Self, Self) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();
    (
      MemoryChannel { tx: a_tx, rx: b_rx },
      MemoryChannel { tx: b_tx, rx: a_rx },
    )
  }
}

#[async_trait]
impl Channel for MemoryChannel {
  async fn send(&mut self, msg: &Message) -> Result<()> {
    trace!(kind = msg.kind(), "send");
    self.tx
      .send(msg.to_bytes()?)
      .map_err(|_| TransportError::ConnectionLost)?;
    Ok(())
  }

  async fn recv(&mut self) -> Result<Message> {
    let buf = self.rx.recv().await.ok_or(TransportError::ConnectionLost)?;
    let msg = Message::from_bytes(&buf)?;
    trace!(kind = msg.kind(), "recv");
    Ok(msg)
  }
}

const CONNECT_ATTEMPTS: usize = 20;
const CONNECT_BACKOFF: Duration = Duration::from_millis(250);

/// Length-delimited bincode frames over TCP.
pub struct TcpChannel {
  framed: Framed<TcpStream, LengthDelimitedCodec>,
}

impl TcpChannel {
  fn new(stream: TcpStream) -> Self {
    TcpChannel {
      framed: LengthDelimitedCodec::builder().new_framed(stream),
    }
  }

  /// Accepts exactly one peer.
  pub async fn listen<A: ToSocketAddrs>(addr: A) -> Result<Self> {
    let listener = TcpListener::bind(addr).await?;
    debug!(addr = ?listener.local_addr()?, "waiting for peer");
    Self::accept(&listener).await
  }

  pub async fn accept(listener: &TcpListener) -> Result<Self> {
    let (stream, peer) = listener.accept().await?;
    debug!(?peer, "peer connected");
    Ok(Self::new(stream))
  }

  /// Retries for a few seconds so that either party may start first.
  pub async fn connect<A: ToSocketAddrs + Clone>(addr: A) -> Result<Self> {
    let mut attempt = 0;
    loop {
      match TcpStream::connect(addr.clone()).await {
        Ok(stream) => break Ok(Self::new(stream)),
        Err(e) if attempt + 1 < CONNECT_ATTEMPTS => {
          attempt += 1;
          trace!(attempt, error = %e, "connect failed, retrying");
          tokio::time::sleep(CONNECT_BACKOFF).await;
        },
        Err(e) => break Err(e.into()),
      }
    }
  }
}

#[async_trait]
impl Channel for TcpChannel {
  async fn send(&mut self, msg: &Message) -> Result<()> {
    trace!(kind = msg.kind(), "send");
    self.framed.send(Bytes::from(msg.to_bytes()?)).await?;
    Ok(())
  }

  async fn recv(&mut self) -> Result<Message> {
    let frame = match self.framed.next().await {
      Some(frame) => frame?,
      None => return Err(TransportError::ConnectionLost.into()),
    };
    let msg = Message::from_bytes(&frame)?;
    trace!(kind = msg.kind(), "recv");
    Ok(msg)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::Error;

  #[tokio::test]
  async fn test_memory_send_wait() {
    let (mut a, mut b) = MemoryChannel::pair();
    let peer = tokio::spawn(async move {
      let msg = b.recv().await?;
      b.send_ack().await?;
      Ok::<_, Error>(msg)
    });
    let msg = Message::Outputs { bits: vec![true, false] };
    a.send_wait(&msg).await.unwrap();
    assert_eq!(peer.await.unwrap().unwrap(), msg);
  }

  #[tokio::test]
  async fn test_memory_connection_lost() {
    let (mut a, b) = MemoryChannel::pair();
    drop(b);
    assert!(matches!(
      a.recv().await,
      Err(Error::Transport(TransportError::ConnectionLost)),
    ));
    assert!(matches!(
      a.send(&Message::Ack).await,
      Err(Error::Transport(TransportError::ConnectionLost)),
    ));
  }

  #[tokio::test]
  async fn test_send_wait_rejects_other_reply() {
    let (mut a, mut b) = MemoryChannel::pair();
    let peer = tokio::spawn(async move {
      b.recv().await?;
      b.send(&Message::Outputs { bits: vec![] }).await
    });
    assert!(matches!(
      a.send_wait(&Message::Ack).await,
      Err(Error::Transport(TransportError::UnexpectedMessage { expected: "Ack", .. })),
    ));
    peer.await.unwrap().unwrap();
  }

  #[tokio::test]
  async fn test_tcp_channel() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
      let mut ch = TcpChannel::accept(&listener).await?;
      let msg = ch.recv().await?;
      ch.send_ack().await?;
      Ok::<_, Error>(msg)
    });

    let mut ch = TcpChannel::connect(addr).await.unwrap();
    let msg = Message::WeakRequest { wire: 11, choice: true };
    ch.send_wait(&msg).await.unwrap();
    assert_eq!(server.await.unwrap().unwrap(), msg);

    // the server dropped its end
    assert!(matches!(
      ch.recv().await,
      Err(Error::Transport(TransportError::ConnectionLost)),
    ));
  }

  #[tokio::test]
  async fn test_tcp_listen_accepts_one_peer() {
    let addr = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let server = tokio::spawn(async move {
      let mut ch = TcpChannel::listen(addr).await?;
      ch.send(&Message::Outputs { bits: vec![true] }).await?;
      ch.recv().await
    });

    // connect retries until the listener is bound
    let mut ch = TcpChannel::connect(addr).await.unwrap();
    assert_eq!(ch.recv().await.unwrap(), Message::Outputs { bits: vec![true] });
    ch.send_ack().await.unwrap();
    assert_eq!(server.await.unwrap().unwrap(), Message::Ack);
  }
}
