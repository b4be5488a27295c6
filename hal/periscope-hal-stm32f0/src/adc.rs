//! Converter backend for STM32F072
//!
//! The acquisition chain is programmed at register level:
//!
//! ```text
//! TIM15 update -> TRGO -> ADC1 sequence (EXTSEL TRG4) -> DMA1 channel 1 (circular)
//! ```
//!
//! Every conversion group raises the ADC end-of-sequence interrupt. The DMA
//! channel's own interrupt vector belongs to embassy-stm32, so the half and
//! full transfer flags are sampled from the ADC interrupt instead: a boundary
//! always coincides with the end of a group, and [`StmAdc::service_irq`]
//! reports which of the two logical interrupts are due.

use embassy_stm32::interrupt::{self, InterruptExt};
use embassy_stm32::pac;
use periscope_core::traits::{AdcHardware, DmaStatus};

/// ADC1 DMA request line on DMA1
const DMA_CHANNEL: usize = 0;

/// TIM15_TRGO external trigger selection
const EXTSEL_TIM15_TRGO: u32 = 0b100;

/// Spin budget for calibration and ready flags
const SPIN_LIMIT: u32 = 100_000;

// ADC_CFGR1 bits
const CFGR1_DMAEN: u32 = 1 << 0;
const CFGR1_DMACFG: u32 = 1 << 1;
const CFGR1_EXTSEL_SHIFT: u32 = 6;
const CFGR1_EXTEN_RISING: u32 = 0b01 << 10;

// DMA_CCR bits
const CCR_EN: u32 = 1 << 0;
const CCR_CIRC: u32 = 1 << 5;
const CCR_MINC: u32 = 1 << 7;
const CCR_PSIZE_16: u32 = 0b01 << 8;
const CCR_MSIZE_16: u32 = 0b01 << 10;
const CCR_PL_HIGH: u32 = 0b10 << 12;

// TIM_CR2 master mode: update event as TRGO
const CR2_MMS_UPDATE: u32 = 0b010 << 4;

/// Logical interrupts due after one ADC interrupt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IrqEvents {
    /// A conversion group completed and the group interrupt is enabled
    pub group: bool,
    /// Half/full flags, empty unless buffer interrupts are enabled
    pub buffer: DmaStatus,
}

/// STM32F072 converter, sample timer and DMA
pub struct StmAdc {
    timer_clock_hz: u32,
    len: usize,
    group_irq: bool,
    buffer_irqs: bool,
}

impl StmAdc {
    /// Take over ADC1, TIM15 and DMA1 channel 1
    ///
    /// `timer_clock_hz` is the TIM15 kernel clock after `embassy_stm32::init`.
    pub fn new(timer_clock_hz: u32) -> Self {
        pac::RCC.ahbenr().modify(|w| w.set_dmaen(true));
        pac::RCC.apb2enr().modify(|w| {
            w.set_adcen(true);
            w.set_tim15en(true);
        });

        // Dedicated 14 MHz converter clock
        pac::RCC.cr2().modify(|w| w.set_hsi14on(true));
        spin_until(|| pac::RCC.cr2().read().hsi14rdy());

        Self {
            timer_clock_hz,
            len: 0,
            group_irq: false,
            buffer_irqs: false,
        }
    }

    /// Acknowledge the ADC interrupt and sample the DMA flags
    ///
    /// Call from the `ADC1_COMP` handler, then dispatch the returned events
    /// to the engine.
    pub fn service_irq(&mut self) -> IrqEvents {
        let adc = pac::ADC1;
        let dma = pac::DMA1;

        let isr = adc.isr().read();
        adc.isr().write(|w| {
            w.set_eos(true);
            w.set_eoc(true);
        });

        let mut events = IrqEvents {
            group: self.group_irq && isr.eos(),
            buffer: DmaStatus::default(),
        };

        if self.buffer_irqs {
            let flags = dma.isr().read();
            events.buffer = DmaStatus {
                half: flags.htif(DMA_CHANNEL),
                full: flags.tcif(DMA_CHANNEL),
            };
            dma.ifcr().write(|w| {
                w.set_htif(DMA_CHANNEL, true);
                w.set_tcif(DMA_CHANNEL, true);
            });
        }

        events
    }

    fn update_eos_irq(&mut self) {
        // End of sequence stays on while either logical interrupt needs it
        let enabled = self.group_irq || self.buffer_irqs;
        pac::ADC1.ier().modify(|w| w.set_eosie(enabled));
    }

    fn calibrate(&mut self) {
        let adc = pac::ADC1;
        if adc.cr().read().aden() {
            adc.cr().modify(|w| w.set_addis(true));
            spin_until(|| !adc.cr().read().aden());
        }
        adc.cr().modify(|w| w.set_adcal(true));
        spin_until(|| !adc.cr().read().adcal());
    }
}

fn spin_until(mut done: impl FnMut() -> bool) {
    for _ in 0..SPIN_LIMIT {
        if done() {
            return;
        }
    }
    #[cfg(feature = "defmt")]
    defmt::warn!("adc: hardware flag timeout");
}

/// Put a converter input pin in analog mode
fn set_analog(channel: u8) {
    let (port, pin) = match channel {
        0..=7 => (pac::GPIOA, channel),
        8..=9 => (pac::GPIOB, channel - 8),
        10..=15 => (pac::GPIOC, channel - 10),
        _ => return,
    };
    port.moder().modify(|w| w.0 |= 0b11 << (2 * pin as u32));
}

impl AdcHardware for StmAdc {
    fn timer_clock_hz(&self) -> u32 {
        self.timer_clock_hz
    }

    fn configure(&mut self, channel_mask: u32, sample_time: u8) {
        let adc = pac::ADC1;

        self.calibrate();

        for channel in 0..16u8 {
            if channel_mask & (1 << channel) != 0 {
                set_analog(channel);
            }
        }
        // Temperature sensor and reference need their buffers switched on
        if channel_mask & (0b11 << 16) != 0 {
            adc.ccr().modify(|w| {
                w.set_tsen(channel_mask & (1 << 16) != 0);
                w.set_vrefen(channel_mask & (1 << 17) != 0);
            });
        }

        adc.chselr().write(|w| w.0 = channel_mask);
        adc.smpr().write(|w| w.0 = sample_time as u32 & 0b111);
        adc.cfgr1().write(|w| {
            w.0 = CFGR1_DMAEN
                | CFGR1_DMACFG
                | (EXTSEL_TIM15_TRGO << CFGR1_EXTSEL_SHIFT)
                | CFGR1_EXTEN_RISING
        });
    }

    fn set_timer(&mut self, prescaler: u16, reload: u16) {
        let tim = pac::TIM15;
        tim.psc().write_value(prescaler);
        tim.arr().write(|w| w.set_arr(reload));
        // Latch the new values without waiting for the old period
        tim.egr().write(|w| w.set_ug(true));
    }

    fn start(&mut self, target: &mut [u16]) {
        let adc = pac::ADC1;
        let dma = pac::DMA1;
        let tim = pac::TIM15;
        self.len = target.len();

        // DMA first, so no conversion is lost
        let ch = dma.ch(DMA_CHANNEL);
        ch.cr().write(|w| w.0 = 0);
        ch.par().write_value(adc.dr().as_ptr() as u32);
        ch.mar().write_value(target.as_mut_ptr() as u32);
        ch.ndtr().write(|w| w.set_ndt(target.len() as u16));
        ch.cr().write(|w| {
            w.0 = CCR_CIRC | CCR_MINC | CCR_PSIZE_16 | CCR_MSIZE_16 | CCR_PL_HIGH | CCR_EN
        });

        // Converter armed on the external trigger
        adc.isr().write(|w| w.set_adrdy(true));
        adc.cr().modify(|w| w.set_aden(true));
        spin_until(|| adc.isr().read().adrdy());
        adc.cr().modify(|w| w.set_adstart(true));

        // Timer last: its first update starts the first group
        tim.cr2().write(|w| w.0 = CR2_MMS_UPDATE);
        tim.cr1().modify(|w| w.set_cen(true));
    }

    fn stop(&mut self) {
        let adc = pac::ADC1;

        pac::TIM15.cr1().modify(|w| w.set_cen(false));
        adc.ier().write(|w| w.0 = 0);
        if adc.cr().read().adstart() {
            adc.cr().modify(|w| w.set_adstp(true));
            spin_until(|| !adc.cr().read().adstp());
        }
        adc.cr().modify(|w| w.set_addis(true));
        pac::DMA1.ch(DMA_CHANNEL).cr().write(|w| w.0 = 0);

        self.group_irq = false;
        self.buffer_irqs = false;
        self.len = 0;
    }

    fn write_position(&self) -> usize {
        if self.len == 0 {
            return 0;
        }
        let left = pac::DMA1.ch(DMA_CHANNEL).ndtr().read().ndt() as usize;
        (self.len - left.min(self.len)) % self.len
    }

    fn set_group_irq(&mut self, enabled: bool) {
        self.group_irq = enabled;
        self.update_eos_irq();
    }

    fn set_buffer_irqs(&mut self, enabled: bool) {
        self.buffer_irqs = enabled;
        self.update_eos_irq();
    }

    fn clear_buffer_flags(&mut self) {
        pac::DMA1.ifcr().write(|w| {
            w.set_htif(DMA_CHANNEL, true);
            w.set_tcif(DMA_CHANNEL, true);
        });
    }

    fn mask_irqs(&mut self) {
        interrupt::ADC1_COMP.disable();
    }

    fn unmask_irqs(&mut self) {
        // SAFETY: the handler only touches the engine through the shared mutex
        unsafe { interrupt::ADC1_COMP.enable() };
    }
}
