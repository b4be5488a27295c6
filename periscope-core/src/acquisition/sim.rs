//! Simulated converter and test bench
//!
//! [`SimAdc`] models the register-visible state of the converter, timer and
//! circular DMA. [`Bench`] drives an initialized unit one conversion group
//! at a time, raising the interrupts the real hardware would, and plays the
//! job consumer into a recording sink.

use heapless::Deque;
use periscope_protocol::{AdcCommand, Response, TriggerEdge, TriggerSetup};

use super::engine::AdcUnit;
use super::report::testing::RecordingSink;
use super::report::ReportJob;
use crate::config::AcquisitionConfig;
use crate::resources::ResourceRegistry;
use crate::traits::{AdcHardware, DmaStatus, Unit};

/// Timer input clock of the simulated part
pub const SIM_CLOCK_HZ: u32 = 48_000_000;

/// Job queue depth used by the bench
pub const QUEUE_DEPTH: usize = 16;

#[derive(Debug, Default)]
pub struct SimAdc {
    pub running: bool,
    pub len: usize,
    pub position: usize,
    pub configured: Option<(u32, u8)>,
    pub timer: (u16, u16),
    pub group_irq: bool,
    pub buffer_irqs: bool,
    pub flags: DmaStatus,
    pub masked: bool,
    pub mask_calls: usize,
    pub stop_calls: usize,
}

impl SimAdc {
    /// Group rate the timer is programmed for
    pub fn timer_hz(&self) -> u32 {
        let divider = (self.timer.0 as u32 + 1) * (self.timer.1 as u32 + 1);
        SIM_CLOCK_HZ / divider
    }
}

impl AdcHardware for SimAdc {
    fn timer_clock_hz(&self) -> u32 {
        SIM_CLOCK_HZ
    }

    fn configure(&mut self, channel_mask: u32, sample_time: u8) {
        self.configured = Some((channel_mask, sample_time));
    }

    fn set_timer(&mut self, prescaler: u16, reload: u16) {
        self.timer = (prescaler, reload);
    }

    fn start(&mut self, target: &mut [u16]) {
        self.len = target.len();
        self.position = 0;
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
        self.group_irq = false;
        self.buffer_irqs = false;
        self.stop_calls += 1;
    }

    fn write_position(&self) -> usize {
        self.position
    }

    fn set_group_irq(&mut self, enabled: bool) {
        self.group_irq = enabled;
    }

    fn set_buffer_irqs(&mut self, enabled: bool) {
        self.buffer_irqs = enabled;
    }

    fn clear_buffer_flags(&mut self) {
        self.flags = DmaStatus::default();
    }

    fn mask_irqs(&mut self) {
        self.masked = true;
        self.mask_calls += 1;
    }

    fn unmask_irqs(&mut self) {
        self.masked = false;
    }
}

pub type SimUnit = AdcUnit<SimAdc, Deque<ReportJob, QUEUE_DEPTH>>;

/// Channel 0 value that stays below 2048 before group `at` and above after
pub fn ramp_crossing(group: u16, at: u16) -> u16 {
    if group < at {
        group
    } else {
        2048 + group
    }
}

pub struct Bench {
    pub unit: SimUnit,
    pub registry: ResourceRegistry,
    pub sink: RecordingSink,
}

impl Bench {
    /// Build and initialize a unit
    pub fn new(config: AcquisitionConfig) -> Self {
        let mut unit = SimUnit::new(SimAdc::default(), Deque::new(), config);
        let mut registry = ResourceRegistry::new();
        unit.init(&mut registry).unwrap();
        Self {
            unit,
            registry,
            sink: RecordingSink::default(),
        }
    }

    /// Let the DMA write one conversion group and raise the interrupts
    pub fn push_group(&mut self, values: &[u16]) {
        let pos = self.unit.hardware().position;
        let memory = self.unit.sample_memory_mut();
        let len = memory.len();
        memory[pos..pos + values.len()].copy_from_slice(values);

        let next = (pos + values.len()) % len;
        let hw = self.unit.hardware_mut();
        hw.position = next;
        if pos + values.len() == len / 2 {
            hw.flags.half = true;
        }
        if next == 0 {
            hw.flags.full = true;
        }

        if self.unit.hardware().group_irq {
            self.unit.on_group_complete();
        }
        self.raise_buffer_irq();
    }

    /// Service latched half/full flags if the interrupt is enabled
    pub fn raise_buffer_irq(&mut self) {
        let hw = self.unit.hardware_mut();
        if !hw.buffer_irqs || hw.flags.is_empty() {
            return;
        }
        let status = core::mem::take(&mut hw.flags);
        self.unit.on_buffer_irq(status);
    }

    /// Run every queued job
    pub fn deliver(&mut self) {
        while let Some(job) = self.unit.queue_mut().pop_front() {
            let layout = *self.unit.layout().unwrap();
            job.execute(self.unit.samples(), &layout, &mut self.sink)
                .unwrap();
            self.unit.report_delivered(&job);
        }
    }

    /// Send a raw request
    pub fn request(&mut self, id: u16, code: u8, payload: &[u8]) -> Result<Response, crate::UnitError> {
        self.unit.handle_request(id, code, payload)
    }

    /// Send a raw request that must succeed
    pub fn request_ok(&mut self, id: u16, code: u8, payload: &[u8]) -> Response {
        self.request(id, code, payload).unwrap()
    }

    /// Send a typed command
    pub fn command(&mut self, id: u16, command: AdcCommand) -> Result<Response, crate::UnitError> {
        let frame = command.to_frame(id).unwrap();
        self.unit.handle_request(id, frame.msg_type, &frame.payload)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn setup_trigger(
        &mut self,
        source: u8,
        level: u16,
        edge: TriggerEdge,
        pretrigger: u16,
        posttrigger: u32,
        holdoff_ms: u16,
        auto_rearm: bool,
    ) {
        let setup = TriggerSetup {
            source,
            level,
            edge: edge.to_byte(),
            pretrigger,
            posttrigger,
            holdoff_ms,
            auto_rearm,
        };
        self.command(1, AdcCommand::SetupTrigger(setup)).unwrap();
    }

    pub fn arm(&mut self, sticky: u8) {
        self.command(2, AdcCommand::Arm { sticky }).unwrap();
    }
}
