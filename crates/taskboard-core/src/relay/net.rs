//! TCP transport - 1 行 1 フレームの JSON
//!
//! # 実装
//! - server: 接続ごとに reader / writer の 2 タスク
//!   - reader: 行 → `ClientMessage` → `LinkEmitter::emit`
//!   - writer: `ServerMessage` → 行
//! - 壊れた行（JSON でない、UTF-8 でない）は warn を出して読み飛ばす（接続は切らない）
//! - 1 フレームは最大 `MAX_FRAME_BYTES`。超えた行は末尾まで捨てて warn
//! - EOF で `disconnect` → coordinator が outbox を捨てる → writer も終わる
//!
//! # 注意
//! - outbox は unbounded。読まない peer がいると、その peer 宛ての
//!   フレームは切断されるまでメモリに溜まり続ける

use std::io;
use std::net::SocketAddr;

use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::runtime::RelayHandle;
use crate::domain::{ClientMessage, ServerMessage, decode_frame, encode_frame};
use crate::error::BoardError;
use crate::impls::ChannelEmitter;
use crate::ports::Emitter;

/// Largest accepted frame, newline excluded.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Newline-delimited frame reader with a length cap.
///
/// Works on raw bytes, so a line that is not UTF-8 surfaces as a decode
/// error for that frame instead of an I/O error for the stream.
struct FrameReader<R> {
    inner: BufReader<R>,
    buf: Vec<u8>,
    limit: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    fn new(read: R) -> Self {
        Self::with_limit(read, MAX_FRAME_BYTES)
    }

    fn with_limit(read: R, limit: usize) -> Self {
        Self {
            inner: BufReader::new(read),
            buf: Vec::new(),
            limit,
        }
    }

    /// Next non-blank frame.
    ///
    /// - `Ok(None)`: EOF
    /// - `Ok(Some(Err(_)))`: this frame is bad; the stream is still usable
    /// - `Err(_)`: the stream itself failed
    async fn next<T: DeserializeOwned>(&mut self) -> io::Result<Option<Result<T, BoardError>>> {
        loop {
            self.buf.clear();
            let cap = self.limit as u64 + 1;
            let n = (&mut self.inner)
                .take(cap)
                .read_until(b'\n', &mut self.buf)
                .await?;
            if n == 0 {
                return Ok(None);
            }
            if self.buf.last() != Some(&b'\n') && self.buf.len() > self.limit {
                self.skip_rest_of_line().await?;
                return Ok(Some(Err(BoardError::FrameTooLarge(self.limit))));
            }
            if self.buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Ok(Some(decode_frame(&self.buf)));
        }
    }

    /// Discard input up to and including the next newline.
    async fn skip_rest_of_line(&mut self) -> io::Result<()> {
        loop {
            let chunk = self.inner.fill_buf().await?;
            if chunk.is_empty() {
                return Ok(());
            }
            match chunk.iter().position(|b| *b == b'\n') {
                Some(i) => {
                    self.inner.consume(i + 1);
                    return Ok(());
                }
                None => {
                    let len = chunk.len();
                    self.inner.consume(len);
                }
            }
        }
    }
}

/// Accept connections until `shutdown` flips to `true`.
pub async fn serve(
    listener: TcpListener,
    relay: RelayHandle,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), BoardError> {
    info!(addr = %listener.local_addr()?, "listening");
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tokio::spawn(handle_connection(stream, peer, relay.clone(), shutdown.clone()));
                }
                Err(e) => warn!(error = %e, "accept failed"),
            },
        }
    }
    info!("listener stopped");
    Ok(())
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    relay: RelayHandle,
    mut shutdown: watch::Receiver<bool>,
) {
    let link = relay.connect();
    let client_id = link.client_id;
    info!(client = %client_id, %peer, "client connected");

    let (emitter, inbound) = link.split();
    let (read_half, write_half) = stream.into_split();
    let writer = tokio::spawn(write_frames(write_half, inbound));

    let mut frames = FrameReader::new(read_half);
    loop {
        let frame = tokio::select! {
            _ = shutdown.changed() => break,
            frame = frames.next::<ClientMessage>() => frame,
        };
        let message = match frame {
            Ok(Some(Ok(message))) => message,
            Ok(Some(Err(e))) => {
                warn!(client = %client_id, error = %e, "malformed frame skipped");
                continue;
            }
            Ok(None) => break,
            Err(e) => {
                warn!(client = %client_id, error = %e, "read failed");
                break;
            }
        };
        debug!(client = %client_id, event = message.event_name(), "frame received");
        if emitter.emit(message).is_err() {
            break;
        }
    }

    emitter.disconnect();
    // outbox is dropped by the coordinator on disconnect, which ends the writer
    if writer.await.is_err() {
        warn!(client = %client_id, "writer task panicked");
    }
    info!(client = %client_id, "client disconnected");
}

async fn write_frames<T: serde::Serialize>(
    mut write_half: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<T>,
) {
    while let Some(message) = outbound.recv().await {
        let mut frame = match encode_frame(&message) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "encode failed");
                continue;
            }
        };
        frame.push('\n');
        if let Err(e) = write_half.write_all(frame.as_bytes()).await {
            debug!(error = %e, "peer closed while writing");
            break;
        }
    }
}

/// Client side of the TCP transport.
///
/// Hand `emitter` to a `ClientStore`; drain `inbound` into
/// `apply_server_message`.
pub struct RemoteLink {
    pub emitter: ChannelEmitter,
    pub inbound: mpsc::UnboundedReceiver<ServerMessage>,
}

/// Connect to a relay started with [`serve`].
///
/// # Errors
/// - `BoardError::Io` if the TCP connect fails.
pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<RemoteLink, BoardError> {
    let stream = TcpStream::connect(addr).await?;
    let (read_half, write_half) = stream.into_split();

    let (emitter, outbound) = ChannelEmitter::pair();
    tokio::spawn(write_frames(write_half, outbound));

    let (inbound_tx, inbound) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut frames = FrameReader::new(read_half);
        loop {
            match frames.next::<ServerMessage>().await {
                Ok(Some(Ok(message))) => {
                    if inbound_tx.send(message).is_err() {
                        break;
                    }
                }
                Ok(Some(Err(e))) => warn!(error = %e, "malformed frame skipped"),
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "read failed");
                    break;
                }
            }
        }
    });

    Ok(RemoteLink { emitter, inbound })
}
