//! hidcap - keystroke injection + serial line capture for nRF52840.
//!
//! Architecture:
//!
//! ```text
//!  [Trigger button] ─┐
//!                    ├─► Device::poll ─► HID keyboard IN ─► [USB host]
//!  [CDC OUT] ─► rx ──┘        │
//!                             ├─► flash log (log.txt / input.txt)
//!                             └─► CDC IN (echo + status)
//!
//!  [USB bus events, LED reports] ─► event queue ─► Device::handle_usb_event
//! ```
//!
//! All device state lives in one [`Device`] driven from the main task.
//! The USB stack, the LED report reader and the CDC receiver run as
//! their own Embassy tasks and only talk to the main task via queues.
//!
//! Target: nRF52840 (e.g. nRF52840-DK, Nice!Nano, Seeed XIAO nRF52840)

#![no_std]
#![no_main]

mod flash_fs;
mod sched;
mod usb;

use defmt::{info, unwrap};
use embassy_embedded_hal::adapter::BlockingAsync;
use embassy_executor::Spawner;
use embassy_nrf::config::HfclkSource;
use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pull};
use embassy_nrf::nvmc::Nvmc;
use embassy_usb::class::cdc_acm;
use embassy_usb::class::hid::HidReader;
use embassy_usb::UsbDevice;
use hidcap::Device;
use {defmt_rtt as _, panic_probe as _};

use crate::flash_fs::FlashFs;
use crate::sched::EmbassyScheduler;
use crate::usb::hid_device::{self, UsbKeyboard};
use crate::usb::serial::{self, UsbSerial};
use crate::usb::UsbDriver;

#[embassy_executor::task]
async fn usb_task(device: UsbDevice<'static, UsbDriver>) {
    hid_device::run_usb_device(device).await
}

#[embassy_executor::task]
async fn led_report_task(reader: HidReader<'static, UsbDriver, hid_device::LED_REPORT_SIZE>) {
    hid_device::led_report_task(reader).await
}

#[embassy_executor::task]
async fn cdc_rx_task(receiver: cdc_acm::Receiver<'static, UsbDriver>) {
    serial::rx_task(receiver).await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("hidcap starting");

    // USB needs the high-frequency crystal.
    let mut nrf_config = embassy_nrf::config::Config::default();
    nrf_config.hfclk_source = HfclkSource::ExternalXtal;
    let p = embassy_nrf::init(nrf_config);

    let usb = hid_device::init(p.USBD);
    let (cdc_tx, cdc_rx) = usb.serial.split();

    unwrap!(spawner.spawn(usb_task(usb.device)));
    unwrap!(spawner.spawn(led_report_task(usb.keyboard_reader)));
    unwrap!(spawner.spawn(cdc_rx_task(cdc_rx)));

    // Trigger on P0.11 (Button 1 on the DK), active low.
    let trigger = Input::new(p.P0_11, Pull::Up);
    // Status LED on P0.13 (LED 1 on the DK), active low.
    let mut led = Output::new(p.P0_13, Level::High, OutputDrive::Standard);

    let fs = FlashFs::new(BlockingAsync::new(Nvmc::new(p.NVMC)));
    let mut device = Device::new(
        UsbKeyboard::new(usb.keyboard_writer),
        EmbassyScheduler,
        fs,
        UsbSerial::new(cdc_tx),
    );
    let events = usb::events();

    info!("Entering main loop");
    loop {
        while let Ok(event) = events.try_receive() {
            device.handle_usb_event(event);
        }
        if let Some((configured, suspended, leds)) = usb::take_resync() {
            device.resync_usb(configured, suspended, leds);
        }

        device.poll(trigger.is_low()).await;

        led.set_level(if device.led_on() {
            Level::Low
        } else {
            Level::High
        });
    }
}
