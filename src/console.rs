//! Serial console: the CDC channel used for echo and log text.
//!
//! Outbound text is only written while the host holds the port open and
//! is flushed after every message so partial packets never linger.

use crate::config::LOG_MESSAGE_CAPACITY;
use core::fmt::{self, Write};
use heapless::String;

/// Bidirectional byte stream to the host terminal.
#[allow(async_fn_in_trait)]
pub trait Serial {
    /// Host has opened the port (DTR asserted).
    fn connected(&self) -> bool;

    /// Next buffered inbound byte, if any.  Never waits.
    fn try_read(&mut self) -> Option<u8>;

    /// Queue outbound bytes.
    async fn write(&mut self, bytes: &[u8]);

    /// Push any queued bytes to the host.
    async fn flush(&mut self);
}

/// Write raw bytes and flush, if a host is listening.
pub async fn log_bytes<C: Serial>(console: &mut C, bytes: &[u8]) {
    if !console.connected() {
        return;
    }
    console.write(bytes).await;
    console.flush().await;
}

/// Write a message and flush, if a host is listening.
pub async fn log<C: Serial>(console: &mut C, msg: &str) {
    log_bytes(console, msg.as_bytes()).await
}

/// Format into a fixed buffer and log it.  Overlong messages are cut
/// and end in `...`.
pub async fn log_fmt<C: Serial>(console: &mut C, args: fmt::Arguments<'_>) {
    if !console.connected() {
        return;
    }
    let msg = format_message(args);
    log(console, &msg).await
}

fn format_message(args: fmt::Arguments<'_>) -> String<LOG_MESSAGE_CAPACITY> {
    let mut msg = TruncatingString(String::new(), false);
    let _ = msg.write_fmt(args);
    let TruncatingString(mut text, truncated) = msg;
    if truncated {
        while text.len() > LOG_MESSAGE_CAPACITY - 3 {
            text.pop();
        }
        let _ = text.push_str("...");
    }
    text
}

struct TruncatingString(String<LOG_MESSAGE_CAPACITY>, bool);

impl Write for TruncatingString {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.1 {
            return Ok(());
        }
        for c in s.chars() {
            if self.0.push(c).is_err() {
                self.1 = true;
                return Ok(());
            }
        }
        Ok(())
    }
}

/// The host did not take a packet (stalled reader or detached port).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PacketDropped;

/// Bulk IN endpoint that carries console output.
#[allow(async_fn_in_trait)]
pub trait PacketPort {
    /// Send one packet.  Must give up in bounded time.
    async fn send_packet(&mut self, data: &[u8]) -> Result<(), PacketDropped>;
}

/// Packs console bytes into `N`-byte packets.
///
/// A transfer that ends on a full packet is closed with a zero-length
/// packet on flush.  When the host stops taking packets the rest of the
/// current write is discarded, so one call never waits more than one
/// send attempt.
pub struct PacketWriter<const N: usize> {
    pending: heapless::Vec<u8, N>,
    needs_zlp: bool,
}

impl<const N: usize> Default for PacketWriter<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PacketWriter<N> {
    pub const fn new() -> Self {
        Self {
            pending: heapless::Vec::new(),
            needs_zlp: false,
        }
    }

    pub async fn write<P: PacketPort>(&mut self, port: &mut P, bytes: &[u8]) {
        for &b in bytes {
            // Never full here: a full buffer is sent straight away.
            let _ = self.pending.push(b);
            if self.pending.is_full() && self.send(port).await.is_err() {
                return;
            }
        }
    }

    pub async fn flush<P: PacketPort>(&mut self, port: &mut P) {
        if !self.pending.is_empty() && self.send(port).await.is_err() {
            return;
        }
        if self.needs_zlp {
            let _ = self.send(port).await;
        }
    }

    async fn send<P: PacketPort>(&mut self, port: &mut P) -> Result<(), PacketDropped> {
        let result = port.send_packet(&self.pending).await;
        if result.is_err() {
            warn!("Console: host not reading, dropped {} bytes", self.pending.len());
        }
        self.needs_zlp = result.is_ok() && self.pending.len() == N;
        self.pending.clear();
        result
    }
}
