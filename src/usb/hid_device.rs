//! USB composite device - boot keyboard + CDC-ACM console.
//!
//! Initialises the Embassy USB stack on the nRF52840 hardware USB
//! peripheral.  The keyboard interface is bidirectional: IN reports carry
//! keystrokes, OUT reports carry the host's lock-key LEDs.

use super::{host_ready, publish, UsbDriver, UsbStateHandler};
use defmt::{debug, info, warn};
use embassy_nrf::usb::vbus_detect::HardwareVbusDetect;
use embassy_nrf::usb::Driver;
use embassy_nrf::{self, bind_interrupts, peripherals};
use embassy_usb::class::cdc_acm::{self, CdcAcmClass};
use embassy_usb::class::hid::{
    Config as HidConfig, HidReader, HidReaderWriter, HidWriter, ReportId, RequestHandler, State,
};
use embassy_usb::control::OutResponse;
use embassy_usb::{Builder, Config, UsbDevice};
use hidcap::config;
use hidcap::hid::keyboard::{KeyboardLeds, KeyboardReport, KEYBOARD_REPORT_SIZE};
use hidcap::hid::KeyboardSink;
use hidcap::status::UsbEvent;
use static_cell::StaticCell;
use usbd_hid::descriptor::{KeyboardReport as KeyboardDescriptor, SerializedDescriptor};

bind_interrupts!(struct Irqs {
    USBD => embassy_nrf::usb::InterruptHandler<peripherals::USBD>;
    CLOCK_POWER => embassy_nrf::usb::vbus_detect::InterruptHandler;
});

/// LED output report is a single byte.
pub const LED_REPORT_SIZE: usize = 1;

static KB_STATE: StaticCell<State> = StaticCell::new();
static CDC_STATE: StaticCell<cdc_acm::State> = StaticCell::new();
static USB_CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_MSOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_CTRL_BUF: StaticCell<[u8; 128]> = StaticCell::new();
static USB_STATE_HANDLER: StaticCell<UsbStateHandler> = StaticCell::new();
static LED_REQUEST_HANDLER: StaticCell<LedReportHandler> = StaticCell::new();

/// Build result: the device runner plus the class halves the tasks own.
pub struct UsbParts {
    pub device: UsbDevice<'static, UsbDriver>,
    pub keyboard_writer: HidWriter<'static, UsbDriver, KEYBOARD_REPORT_SIZE>,
    pub keyboard_reader: HidReader<'static, UsbDriver, LED_REPORT_SIZE>,
    pub serial: CdcAcmClass<'static, UsbDriver>,
}

/// Initialise the USB stack and create the composite device.
///
/// Must be called exactly once.  All static buffers are consumed here.
pub fn init(usbd: peripherals::USBD) -> UsbParts {
    let driver = Driver::new(usbd, Irqs, HardwareVbusDetect::new(Irqs));

    let mut usb_config = Config::new(config::USB_VID, config::USB_PID);
    usb_config.manufacturer = Some(config::USB_MANUFACTURER);
    usb_config.product = Some(config::USB_PRODUCT);
    usb_config.serial_number = Some(config::USB_SERIAL_NUMBER);
    usb_config.max_power = 100; // mA
    usb_config.max_packet_size_0 = 64;

    // CDC needs interface association descriptors.
    usb_config.device_class = 0xEF;
    usb_config.device_sub_class = 0x02;
    usb_config.device_protocol = 0x01;
    usb_config.composite_with_iads = true;

    let config_desc = USB_CONFIG_DESC.init([0u8; 256]);
    let bos_desc = USB_BOS_DESC.init([0u8; 256]);
    let msos_desc = USB_MSOS_DESC.init([0u8; 256]);
    let ctrl_buf = USB_CTRL_BUF.init([0u8; 128]);

    let mut builder = Builder::new(
        driver,
        usb_config,
        config_desc,
        bos_desc,
        msos_desc,
        ctrl_buf,
    );

    builder.handler(USB_STATE_HANDLER.init(UsbStateHandler));

    let kb_state = KB_STATE.init(State::new());
    let kb_config = HidConfig {
        report_descriptor: KeyboardDescriptor::desc(),
        request_handler: Some(LED_REQUEST_HANDLER.init(LedReportHandler)),
        poll_ms: config::USB_HID_POLL_MS,
        max_packet_size: KEYBOARD_REPORT_SIZE as u16,
    };
    let keyboard = HidReaderWriter::<_, LED_REPORT_SIZE, KEYBOARD_REPORT_SIZE>::new(
        &mut builder,
        kb_state,
        kb_config,
    );
    let (keyboard_reader, keyboard_writer) = keyboard.split();

    let cdc_state = CDC_STATE.init(cdc_acm::State::new());
    let serial = CdcAcmClass::new(&mut builder, cdc_state, config::CDC_MAX_PACKET_SIZE);

    let device = builder.build();

    info!("USB composite device initialised (keyboard + CDC)");

    UsbParts {
        device,
        keyboard_writer,
        keyboard_reader,
        serial,
    }
}

/// Run the USB device stack - must be spawned as a dedicated Embassy task.
///
/// Handles enumeration, suspend/resume and endpoint servicing.
pub async fn run_usb_device(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    info!("USB device task started");
    device.run().await
}

/// Turns SET_REPORT on the keyboard interface into LED events.
struct LedReportHandler;

impl RequestHandler for LedReportHandler {
    fn set_report(&mut self, id: ReportId, data: &[u8]) -> OutResponse {
        debug!("Keyboard SET_REPORT {:?}: {=[u8]:x}", defmt::Debug2Format(&id), data);
        if let Some(leds) = KeyboardLeds::from_report(data) {
            publish(UsbEvent::KeyboardLeds(leds));
        }
        OutResponse::Accepted
    }
}

/// Service LED output reports arriving on the interrupt OUT endpoint.
/// Control-pipe SET_REPORTs go through the handler registered in [`init`].
pub async fn led_report_task(reader: HidReader<'static, UsbDriver, LED_REPORT_SIZE>) -> ! {
    let mut handler = LedReportHandler;
    reader.run(false, &mut handler).await
}

/// [`KeyboardSink`] over the keyboard IN endpoint.
pub struct UsbKeyboard {
    writer: HidWriter<'static, UsbDriver, KEYBOARD_REPORT_SIZE>,
}

impl UsbKeyboard {
    pub fn new(writer: HidWriter<'static, UsbDriver, KEYBOARD_REPORT_SIZE>) -> Self {
        Self { writer }
    }
}

impl KeyboardSink for UsbKeyboard {
    fn ready(&self) -> bool {
        host_ready()
    }

    async fn send(&mut self, report: &KeyboardReport) {
        let mut buf = [0u8; KEYBOARD_REPORT_SIZE];
        let n = report.serialize(&mut buf);
        if let Err(e) = self.writer.write(&buf[..n]).await {
            warn!("USB keyboard write failed: {}", e);
        }
    }
}
