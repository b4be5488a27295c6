//! Periscope - Analog Acquisition Firmware
//!
//! Main firmware binary for STM32F072 boards. Exposes the on-chip converter
//! to a host over a framed UART link: live readout, triggered captures,
//! block captures and continuous streams.

#![no_std]
#![no_main]

extern crate alloc;

use defmt::*;
use embassy_executor::Spawner;
use embassy_stm32::rcc::{Hsi48Config, Sysclk};
use embassy_stm32::usart::{BufferedInterruptHandler, BufferedUart};
use embassy_stm32::{bind_interrupts, interrupt, peripherals};
use embedded_alloc::LlffHeap as Heap;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use periscope_core::resources::ResourceRegistry;
use periscope_core::traits::Unit;
use periscope_core::AdcUnit;
use periscope_hal_stm32f0::{StmAdc, UartConfig};

use crate::channels::{with_engine, ReportQueue, ENGINE};

// Heap allocator for the capture buffer
#[global_allocator]
static HEAP: Heap = Heap::empty();

// Heap size: 2KB, enough for the largest accepted capture buffer
const HEAP_SIZE: usize = 2 * 1024;

/// TIM15 kernel clock with the HSI48 system clock
const TIMER_CLOCK_HZ: u32 = 48_000_000;

mod channels;
mod config;
mod tasks;

bind_interrupts!(struct Irqs {
    USART2 => BufferedInterruptHandler<peripherals::USART2>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Periscope firmware starting...");

    // Initialize heap allocator
    init_heap();

    // 48 MHz from the internal oscillator, no crystal needed
    let mut rcc_config = embassy_stm32::Config::default();
    rcc_config.rcc.hsi48 = Some(Hsi48Config {
        sync_from_usb: false,
    });
    rcc_config.rcc.sys = Sysclk::HSI48;
    let p = embassy_stm32::init(rcc_config);
    info!("Peripherals initialized");

    // Host link on USART2 (PA2 TX, PA3 RX, routed to the debugger's VCP)
    let uart_config = UartConfig {
        baudrate: config::HOST_BAUDRATE,
    };
    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 64]);
    let uart = unwrap!(BufferedUart::new(
        p.USART2,
        p.PA3,
        p.PA2,
        tx_buf,
        rx_buf,
        Irqs,
        uart_config.to_usart(),
    ));
    let (tx, rx) = uart.split();

    info!("UART initialized at {} baud", uart_config.baudrate);

    // Pre-init: the unit owns its state from here on
    let unit = AdcUnit::new(StmAdc::new(TIMER_CLOCK_HZ), ReportQueue, config::acquisition());
    let mut registry = ResourceRegistry::new();

    // Installed before init so the first conversion interrupt finds it
    let init = ENGINE.lock(|cell| {
        let mut slot = cell.borrow_mut();
        slot.insert(unit).init(&mut registry)
    });
    match init {
        Ok(()) => info!("ADC unit running"),
        Err(e) => error!("ADC unit init failed: {:?}", e),
    }

    // Spawn tasks
    spawner.spawn(tasks::tick_task()).unwrap();
    spawner.spawn(tasks::host_rx_task(rx)).unwrap();
    spawner.spawn(tasks::host_tx_task(tx)).unwrap();

    info!("All tasks spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Converter end-of-sequence interrupt
///
/// Also carries the DMA half/full events, see `periscope_hal_stm32f0::adc`.
#[allow(non_snake_case)]
#[interrupt]
fn ADC1_COMP() {
    with_engine(|engine| {
        let events = engine.hardware_mut().service_irq();
        if events.group {
            engine.on_group_complete();
        }
        if !events.buffer.is_empty() {
            engine.on_buffer_irq(events.buffer);
        }
    });
}

/// Initialize the heap allocator
fn init_heap() {
    use core::mem::MaybeUninit;
    static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
    #[allow(static_mut_refs)]
    unsafe {
        HEAP.init(HEAP_MEM.as_ptr() as usize, HEAP_SIZE)
    }
}
