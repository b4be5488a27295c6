//! Acquisition engine
//!
//! Owns the capture buffer, live cache, trigger and session, and runs the
//! three interrupt entry points:
//!
//! - [`AdcUnit::on_group_complete`]: end of a conversion group
//! - [`AdcUnit::on_buffer_irq`]: DMA half/full transfer
//! - [`AdcUnit::on_tick`]: periodic millisecond tick
//!
//! None of them block or allocate. Work for the transport is queued as
//! [`ReportJob`] values; a failed enqueue is a hard fault.

use alloc::vec::Vec;

use periscope_protocol::TriggerEdge;

use super::buffer::{Boundary, BufferLayout};
use super::cache::LiveCache;
use super::channels::ChannelTable;
use super::countdown::Countdown;
use super::mode::{ModeEvent, OpMode};
use super::rate::{self, RateSolution};
use super::report::ReportJob;
use super::session::{CaptureSession, SessionKind};
use super::trigger::{TriggerConfig, TriggerDetector};
use crate::config::{AcquisitionConfig, AVERAGING_SCALE};
use crate::error::UnitError;
use crate::traits::{AdcHardware, DmaStatus, JobQueue, Resource};

/// Group rate forced while in emergency shutdown
pub const SAFE_RATE_HZ: u32 = 1000;

/// Time spent in emergency shutdown before recovering
pub const RECOVERY_MS: u32 = 1000;

/// Highest group rate at which smoothing is maintained
pub const AVERAGING_CEILING_HZ: u32 = 20_000;

/// First transaction id handed to trigger sessions
pub const EVENT_ID_BASE: u16 = 0x8000;

/// Most resources a unit claims: converter, DMA, timer and 16 pins
pub(super) const MAX_CLAIMS: usize = 19;

/// The analog acquisition unit
pub struct AdcUnit<H: AdcHardware, Q: JobQueue<ReportJob>> {
    pub(super) hw: H,
    pub(super) queue: Q,
    pub(super) config: AcquisitionConfig,
    pub(super) mode: OpMode,
    pub(super) channels: ChannelTable,
    pub(super) layout: Option<BufferLayout>,
    pub(super) buffer: Vec<u16>,
    pub(super) rate: Option<RateSolution>,
    pub(super) cache: LiveCache,
    pub(super) trigger: TriggerConfig,
    pub(super) detector: TriggerDetector,
    pub(super) session: Option<CaptureSession>,
    /// Chunk queued and not yet delivered, per boundary
    pub(super) pending: [bool; 2],
    pub(super) emergency: Countdown,
    /// Session whose end-of-stream notice is still owed to the host
    pub(super) torn_session: Option<u16>,
    pub(super) next_event_id: u16,
    pub(super) claimed: heapless::Vec<Resource, MAX_CLAIMS>,
}

impl<H: AdcHardware, Q: JobQueue<ReportJob>> AdcUnit<H, Q> {
    /// Pre-init: build the unit with `config`, touching no hardware
    pub fn new(hw: H, queue: Q, config: AcquisitionConfig) -> Self {
        Self {
            hw,
            queue,
            config,
            mode: OpMode::Uninit,
            channels: ChannelTable::default(),
            layout: None,
            buffer: Vec::new(),
            rate: None,
            cache: LiveCache::default(),
            trigger: TriggerConfig::default(),
            detector: TriggerDetector::new(),
            session: None,
            pending: [false; 2],
            emergency: Countdown::new(),
            torn_session: None,
            next_event_id: EVENT_ID_BASE,
            claimed: heapless::Vec::new(),
        }
    }

    /// Current operating mode
    pub fn mode(&self) -> OpMode {
        self.mode
    }

    /// Active configuration
    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    /// Buffer geometry, `None` before init
    pub fn layout(&self) -> Option<&BufferLayout> {
        self.layout.as_ref()
    }

    /// Active channel table
    pub fn channels(&self) -> &ChannelTable {
        &self.channels
    }

    /// Current trigger settings
    pub fn trigger(&self) -> &TriggerConfig {
        &self.trigger
    }

    /// Achieved timer setting, `None` before init
    pub fn rate(&self) -> Option<&RateSolution> {
        self.rate.as_ref()
    }

    /// The live session, if any
    pub fn session(&self) -> Option<&CaptureSession> {
        self.session.as_ref()
    }

    /// Capture buffer contents for report jobs
    pub fn samples(&self) -> &[u16] {
        &self.buffer
    }

    /// Capture buffer as DMA target memory
    pub fn sample_memory_mut(&mut self) -> &mut [u16] {
        &mut self.buffer
    }

    /// Hardware backend
    pub fn hardware(&self) -> &H {
        &self.hw
    }

    /// Hardware backend, mutably
    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    /// Job queue producer
    pub fn queue_mut(&mut self) -> &mut Q {
        &mut self.queue
    }

    /// Consumer acknowledgement that `job` has been sent
    pub fn report_delivered(&mut self, job: &ReportJob) {
        if let Some(boundary) = job.boundary() {
            self.pending[boundary.index()] = false;
        }
    }

    /// Run a mode transition with its side effects
    ///
    /// The peripheral's interrupts are masked and the mode reads
    /// [`OpMode::Transitioning`] while the side effects run. Switching to the
    /// current mode does nothing.
    pub(super) fn switch_mode(&mut self, event: ModeEvent) -> Result<(), UnitError> {
        let from = self.mode;
        let to = from.transition(event).ok_or(UnitError::Busy)?;
        if to == from {
            return Ok(());
        }

        self.hw.mask_irqs();
        self.mode = OpMode::Transitioning;
        self.apply_transition(from, to);
        self.mode = to;
        self.hw.unmask_irqs();

        log_debug!("mode {} -> {}", from, to);
        Ok(())
    }

    fn apply_transition(&mut self, from: OpMode, to: OpMode) {
        if to == OpMode::Uninit {
            self.hw.stop();
            self.session = None;
            self.pending = [false; 2];
            self.emergency.cancel();
            self.torn_session = None;
            return;
        }

        if from == OpMode::Uninit {
            self.hw.start(&mut self.buffer);
            self.hw.set_group_irq(true);
        }

        if to == OpMode::EmergencyShutdown {
            self.hw.set_buffer_irqs(false);
            self.hw.set_group_irq(false);
            if let Some(session) = self.session.take() {
                self.flush_stream_end();
                if let Some(owed) = self.torn_session {
                    log_warn!("end of stream for {} dropped", owed);
                }
                self.torn_session = Some(session.id);
            }
            if let Some(safe) = rate::solve(self.hw.timer_clock_hz(), SAFE_RATE_HZ) {
                self.hw.set_timer(safe.prescaler, safe.reload);
            }
            self.emergency.start(RECOVERY_MS);
            return;
        }

        if from == OpMode::EmergencyShutdown {
            if let Some(rate) = self.rate {
                self.hw.set_timer(rate.prescaler, rate.reload);
            }
            self.pending = [false; 2];
            self.hw.clear_buffer_flags();
            self.cache.reseed();
            self.flush_stream_end();
            self.hw.set_group_irq(true);
        }

        if !from.is_capturing() && to.is_capturing() {
            self.hw.set_group_irq(false);
            self.hw.clear_buffer_flags();
            self.hw.set_buffer_irqs(true);
        }

        if from.is_capturing() && !to.is_capturing() {
            self.hw.set_buffer_irqs(false);
            self.session = None;
            self.hw.set_group_irq(true);
        }

        if to == OpMode::Armed {
            let baseline = self.cache.raw_at(self.trigger.slot).unwrap_or(0);
            self.detector.rebase(baseline);
        }
    }

    /// Queue the end-of-stream notice for `session`
    ///
    /// A full queue defers the notice to the tick instead of losing it.
    pub(super) fn end_stream(&mut self, session: u16) {
        if self.queue.try_enqueue(ReportJob::StreamEnd { session }).is_err() {
            log_warn!("end of stream for {} deferred", session);
            self.torn_session = Some(session);
        }
    }

    /// Retry a deferred end-of-stream notice
    fn flush_stream_end(&mut self) {
        if let Some(session) = self.torn_session {
            if self.queue.try_enqueue(ReportJob::StreamEnd { session }).is_ok() {
                self.torn_session = None;
            }
        }
    }

    /// Hard fault from an interrupt path
    fn fault(&mut self) {
        log_warn!("acquisition fault in {}", self.mode);
        let _ = self.switch_mode(ModeEvent::Fault);
    }

    /// Re-arm once the current session closes
    pub(super) fn rearm_wanted(&self) -> bool {
        self.trigger.auto_rearm && self.trigger.is_configured()
    }

    /// Smoothing coefficient, `None` while smoothing is not maintained
    pub(super) fn smoothing_coefficient(&self) -> Option<f32> {
        let hz = self.rate.map(|r| r.achieved_hz)?;
        if !self.config.averaging_enabled || hz > AVERAGING_CEILING_HZ {
            return None;
        }
        Some(self.config.averaging_factor as f32 / AVERAGING_SCALE as f32)
    }

    fn allocate_event_id(&mut self) -> u16 {
        let id = self.next_event_id;
        self.next_event_id = match id.wrapping_add(1) {
            0 => EVENT_ID_BASE,
            next => next,
        };
        id
    }

    /// End-of-conversion-group interrupt
    pub fn on_group_complete(&mut self) {
        if !self.mode.is_armable() {
            return;
        }
        let Some(layout) = self.layout else {
            return;
        };

        let end = layout.last_group_end(self.hw.write_position());
        let k = self.smoothing_coefficient();
        self.cache.update(&self.buffer[end - layout.channels()..end], k);

        match self.mode {
            OpMode::Armed => {
                let Some(sample) = self.cache.raw_at(self.trigger.slot) else {
                    return;
                };
                let trigger = self.trigger;
                if let Some(edge) = self.detector.detect(&trigger, sample) {
                    self.fire(edge, end);
                }
            }
            OpMode::RearmPending => {
                let event = if self.rearm_wanted() {
                    ModeEvent::Arm
                } else {
                    ModeEvent::Disarm
                };
                let _ = self.switch_mode(event);
            }
            _ => {}
        }
    }

    /// Open a triggered session for a fire at the group ending at `end`
    ///
    /// Returns false if the hold-off dropped the fire or the header could not
    /// be queued.
    pub(super) fn fire(&mut self, edge: TriggerEdge, end: usize) -> bool {
        let Some(layout) = self.layout else {
            return false;
        };
        if !self.detector.admit(self.trigger.holdoff_ms) {
            log_debug!("trigger in hold-off, {} ms left", self.detector.holdoff_remaining());
            return false;
        }

        let id = self.allocate_event_id();
        let channels = layout.channels();
        let post = self.trigger.posttrigger as u64 * channels as u64;
        let mut session = CaptureSession::open(id, SessionKind::Triggered, end % layout.items(), post);

        let header = ReportJob::TriggerHeader {
            session: id,
            serial: session.next_serial(),
            edge,
            pretrigger: self.trigger.pretrigger,
            count: self.trigger.pretrigger as usize * channels,
            end,
        };
        if self.queue.try_enqueue(header).is_err() {
            self.fault();
            return false;
        }

        let event = match edge {
            TriggerEdge::Manual => ModeEvent::ManualTrigger,
            _ => ModeEvent::EdgeDetected,
        };
        self.session = Some(session);
        if self.switch_mode(event).is_err() {
            self.session = None;
            return false;
        }

        log_info!("trigger {} on session {}", edge, id);
        true
    }

    /// DMA half/full transfer interrupt with the flags read and cleared
    pub fn on_buffer_irq(&mut self, status: DmaStatus) {
        if !self.mode.is_capturing() {
            return;
        }
        let Some(layout) = self.layout else {
            return;
        };

        for boundary in layout.ordered(status, self.hw.write_position()) {
            if !self.mode.is_capturing() {
                break;
            }
            self.collect(&layout, boundary);
        }
    }

    /// Queue the samples between the session cursor and `boundary`
    fn collect(&mut self, layout: &BufferLayout, boundary: Boundary) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let end = layout.boundary_offset(boundary);
        let available = layout.distance(session.cursor, end);
        if available == 0 {
            return;
        }
        if self.pending[boundary.index()] {
            log_warn!("overrun at {} boundary", boundary);
            self.fault();
            return;
        }

        let start = session.cursor;
        let count = session.take(available);
        let close = session.is_finished();
        let job = ReportJob::Chunk {
            session: session.id,
            serial: session.next_serial(),
            start,
            count,
            close,
            boundary,
        };
        session.cursor = end;

        if self.queue.try_enqueue(job).is_err() {
            self.fault();
            return;
        }
        self.pending[boundary.index()] = true;

        if close {
            let rearm = self.rearm_wanted();
            let _ = self.switch_mode(ModeEvent::SessionClosed { rearm });
        }
    }

    /// Periodic tick, `elapsed_ms` since the previous one
    pub fn on_tick(&mut self, elapsed_ms: u32) {
        self.detector.tick(elapsed_ms);

        match self.mode {
            OpMode::EmergencyShutdown => {
                if self.emergency.tick(elapsed_ms) {
                    log_info!("recovering from emergency shutdown");
                    let _ = self.switch_mode(ModeEvent::RecoveryElapsed);
                }
            }
            OpMode::Uninit | OpMode::Transitioning => {}
            _ => self.flush_stream_end(),
        }
    }
}
