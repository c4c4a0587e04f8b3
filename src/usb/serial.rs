//! CDC-ACM console: [`Serial`] over the class's bulk endpoints.
//!
//! Inbound bytes are moved off the OUT endpoint by [`rx_task`] into a
//! small queue so the main loop can poll them without blocking.  Outbound
//! bytes go through a [`PacketWriter`]; each packet gets a bounded time
//! to be taken by the host, so a terminal that stops reading costs lost
//! output, never a stalled main loop.

use defmt::{info, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{with_timeout, Duration};
use embassy_usb::class::cdc_acm::{Receiver, Sender};
use embassy_usb::driver::EndpointError;
use hidcap::config::{CDC_MAX_PACKET_SIZE, CDC_WRITE_TIMEOUT_MS};
use hidcap::console::{PacketDropped, PacketPort, PacketWriter, Serial};

use super::UsbDriver;

const PACKET: usize = CDC_MAX_PACKET_SIZE as usize;
const RX_QUEUE: usize = 256;

static RX_BYTES: Channel<CriticalSectionRawMutex, u8, RX_QUEUE> = Channel::new();

/// Drain the OUT endpoint into the inbound queue.  Overflow drops bytes.
pub async fn rx_task(mut receiver: Receiver<'static, UsbDriver>) -> ! {
    let mut buf = [0u8; PACKET];
    loop {
        receiver.wait_connection().await;
        info!("CDC: host attached");
        loop {
            match receiver.read_packet(&mut buf).await {
                Ok(n) => {
                    for &b in &buf[..n] {
                        if RX_BYTES.try_send(b).is_err() {
                            warn!("CDC: rx queue full, dropping input");
                            break;
                        }
                    }
                }
                Err(EndpointError::Disabled) => break,
                Err(e) => warn!("CDC read failed: {}", e),
            }
        }
        info!("CDC: host detached");
    }
}

/// IN endpoint with a per-packet deadline.
struct CdcPort(Sender<'static, UsbDriver>);

impl PacketPort for CdcPort {
    async fn send_packet(&mut self, data: &[u8]) -> Result<(), PacketDropped> {
        let deadline = Duration::from_millis(CDC_WRITE_TIMEOUT_MS);
        match with_timeout(deadline, self.0.write_packet(data)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!("CDC write failed: {}", e);
                Err(PacketDropped)
            }
            Err(_) => Err(PacketDropped),
        }
    }
}

/// Console handle used by the main loop.
pub struct UsbSerial {
    port: CdcPort,
    tx: PacketWriter<PACKET>,
}

impl UsbSerial {
    pub fn new(sender: Sender<'static, UsbDriver>) -> Self {
        Self {
            port: CdcPort(sender),
            tx: PacketWriter::new(),
        }
    }
}

impl Serial for UsbSerial {
    fn connected(&self) -> bool {
        self.port.0.dtr()
    }

    fn try_read(&mut self) -> Option<u8> {
        RX_BYTES.try_receive().ok()
    }

    async fn write(&mut self, bytes: &[u8]) {
        self.tx.write(&mut self.port, bytes).await
    }

    async fn flush(&mut self) {
        self.tx.flush(&mut self.port).await
    }
}
