//! Unit lifecycle and host request handling

use alloc::vec::Vec;

use periscope_protocol::messages::STICKY_UNCHANGED;
use periscope_protocol::{AdcCommand, Response, TriggerEdge, TriggerSetup};

use super::buffer::BufferLayout;
use super::cache::LiveCache;
use super::channels::{channel_pin, ChannelTable};
use super::engine::{AdcUnit, AVERAGING_CEILING_HZ, MAX_CLAIMS};
use super::mode::{ModeEvent, OpMode};
use super::rate::{self, max_sample_rate_hz};
use super::report::ReportJob;
use super::session::{CaptureSession, SessionKind};
use super::trigger::TriggerConfig;
use crate::config::AVERAGING_SCALE;
use crate::error::UnitError;
use crate::traits::{AdcHardware, JobQueue, Resource, ResourceClaim, Unit};

fn resource_list(channels: &ChannelTable) -> heapless::Vec<Resource, MAX_CLAIMS> {
    let mut list = heapless::Vec::new();
    let _ = list.push(Resource::Adc);
    let _ = list.push(Resource::AdcDma);
    let _ = list.push(Resource::SampleTimer);
    for (port, pin) in channels.as_slice().iter().filter_map(|&c| channel_pin(c)) {
        // At most 16 external channels
        let _ = list.push(Resource::Pin(port, pin));
    }
    list
}

impl<H: AdcHardware, Q: JobQueue<ReportJob>> Unit for AdcUnit<H, Q> {
    const TYPE_NAME: &'static str = "ADC";

    fn init(&mut self, resources: &mut dyn ResourceClaim) -> Result<(), UnitError> {
        if self.mode != OpMode::Uninit {
            return Err(UnitError::Busy);
        }

        self.config.validate()?;
        let channels = ChannelTable::from_mask(self.config.channel_mask)?;
        let layout = BufferLayout::new(self.config.buffer_size, channels.len())?;
        let rate = rate::solve(self.hw.timer_clock_hz(), self.config.frequency_hz)
            .ok_or(UnitError::BadConfig)?;

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(layout.items())
            .map_err(|_| UnitError::OutOfMemory)?;
        buffer.resize(layout.items(), 0);

        let claim = resource_list(&channels);
        resources.claim_all(&claim)?;

        self.claimed = claim;
        self.cache = LiveCache::new(channels.len());
        self.channels = channels;
        self.layout = Some(layout);
        self.buffer = buffer;
        self.rate = Some(rate);
        self.trigger = TriggerConfig::default();
        self.trigger.source = self.channels.as_slice().first().copied().unwrap_or(0);

        self.hw.configure(self.config.channel_mask, self.config.sample_time);
        self.hw.set_timer(rate.prescaler, rate.reload);
        self.switch_mode(ModeEvent::InitComplete)?;

        log_info!(
            "adc up: {} channels, {} samples, {} Hz",
            self.channels.len(),
            layout.items(),
            rate.achieved_hz
        );
        Ok(())
    }

    fn deinit(&mut self, resources: &mut dyn ResourceClaim) {
        let _ = self.switch_mode(ModeEvent::Teardown);
        resources.release_all(&self.claimed);
        self.claimed.clear();
        self.buffer = Vec::new();
        self.layout = None;
        self.rate = None;
    }

    fn tick(&mut self, elapsed_ms: u32) {
        self.on_tick(elapsed_ms);
    }

    fn handle_request(&mut self, id: u16, code: u8, payload: &[u8]) -> Result<Response, UnitError> {
        let command = AdcCommand::parse(code, payload)?;
        if self.mode == OpMode::Uninit || self.mode == OpMode::Transitioning {
            return Err(UnitError::Busy);
        }
        let layout = self.layout.ok_or(UnitError::Busy)?;

        match command {
            AdcCommand::GetChannels => {
                let mut list = heapless::Vec::new();
                for &channel in self.channels.as_slice() {
                    let _ = list.push(channel);
                }
                Ok(Response::Channels(list))
            }

            AdcCommand::SetSampleRate { hz } => self.set_sample_rate(hz),

            AdcCommand::GetSampleRate => self.sample_rate(),

            AdcCommand::SetSmoothingFactor { permille } => {
                if permille > AVERAGING_SCALE {
                    return Err(UnitError::BadValue);
                }
                self.config.averaging_factor = permille;
                Ok(Response::Ack)
            }

            AdcCommand::SetSmoothingEnabled { enabled } => {
                if enabled && !self.config.averaging_enabled {
                    self.cache.reseed();
                }
                self.config.averaging_enabled = enabled;
                Ok(Response::Ack)
            }

            AdcCommand::ReadRaw => {
                if !self.mode.allows_readout() {
                    return Err(UnitError::Busy);
                }
                let mut samples = heapless::Vec::new();
                for &sample in self.cache.raw() {
                    let _ = samples.push(sample);
                }
                Ok(Response::Raw(samples))
            }

            AdcCommand::ReadSmoothed => {
                if !self.mode.allows_readout() {
                    return Err(UnitError::Busy);
                }
                let hz = self.rate.map_or(0, |r| r.achieved_hz);
                if hz > AVERAGING_CEILING_HZ {
                    return Err(UnitError::TooFast);
                }
                if !self.config.averaging_enabled {
                    return Err(UnitError::SmoothingDisabled);
                }
                let mut values = heapless::Vec::new();
                for &value in self.cache.smoothed() {
                    let _ = values.push(value);
                }
                Ok(Response::Smoothed(values))
            }

            AdcCommand::SetupTrigger(setup) => self.setup_trigger(&setup, &layout),

            AdcCommand::GetTrigger => Ok(Response::Trigger(self.trigger.to_setup())),

            AdcCommand::Arm { sticky } => {
                if !self.mode.is_armable() {
                    return Err(UnitError::Busy);
                }
                if !self.trigger.is_configured() {
                    return Err(UnitError::BadConfig);
                }
                if sticky != STICKY_UNCHANGED {
                    self.trigger.auto_rearm = sticky != 0;
                }
                self.switch_mode(ModeEvent::Arm)?;
                Ok(Response::Ack)
            }

            AdcCommand::Disarm => {
                self.trigger.auto_rearm = false;
                match self.mode {
                    OpMode::Armed | OpMode::RearmPending => self.switch_mode(ModeEvent::Disarm)?,
                    _ => {}
                }
                Ok(Response::Ack)
            }

            AdcCommand::Abort => {
                if self.mode == OpMode::EmergencyShutdown {
                    return Err(UnitError::Busy);
                }
                let open = self.session.map(|s| s.id);
                self.switch_mode(ModeEvent::Abort)?;
                if let Some(session) = open {
                    self.end_stream(session);
                }
                Ok(Response::Ack)
            }

            AdcCommand::ForceTrigger => {
                if !self.mode.is_armable() {
                    return Err(UnitError::Busy);
                }
                if !self.trigger.is_configured() {
                    return Err(UnitError::BadConfig);
                }
                let end = layout.last_group_end(self.hw.write_position());
                self.fire(TriggerEdge::Manual, end);
                Ok(Response::Ack)
            }

            AdcCommand::BlockCapture { count } => {
                if count == 0 {
                    return Err(UnitError::BadValue);
                }
                let samples = count as u64 * layout.channels() as u64;
                self.open_session(id, SessionKind::Block, samples, ModeEvent::BlockRequested, &layout)
            }

            AdcCommand::StreamStart => {
                self.open_session(id, SessionKind::Stream, 0, ModeEvent::StreamRequested, &layout)
            }

            AdcCommand::StreamStop => {
                let Some(session) = self.session.filter(|s| s.kind == SessionKind::Stream) else {
                    return Err(UnitError::Busy);
                };
                if self.mode != OpMode::Stream {
                    return Err(UnitError::Busy);
                }
                let rearm = self.rearm_wanted();
                self.switch_mode(ModeEvent::SessionClosed { rearm })?;
                self.end_stream(session.id);
                Ok(Response::Ack)
            }

            AdcCommand::GetStatus => Ok(Response::Status {
                opmode: self.mode.to_byte(),
                buffer_items: layout.items() as u32,
                pretrigger_capacity: layout.pretrigger_capacity(),
                channel_count: self.channels.len() as u8,
            }),
        }
    }
}

impl<H: AdcHardware, Q: JobQueue<ReportJob>> AdcUnit<H, Q> {
    fn sample_rate(&self) -> Result<Response, UnitError> {
        let rate = self.rate.ok_or(UnitError::Busy)?;
        Ok(Response::SampleRate {
            hz: rate.achieved_hz,
            hz_f: rate.achieved_hz_f,
        })
    }

    fn set_sample_rate(&mut self, hz: u32) -> Result<Response, UnitError> {
        if !self.mode.is_armable() {
            return Err(UnitError::Busy);
        }
        let max_hz = max_sample_rate_hz(self.config.sample_time, self.channels.len());
        if hz == 0 || hz > max_hz {
            return Err(UnitError::BadValue);
        }
        let solution = rate::solve(self.hw.timer_clock_hz(), hz).ok_or(UnitError::BadValue)?;

        self.hw.mask_irqs();
        self.hw.set_timer(solution.prescaler, solution.reload);
        self.rate = Some(solution);
        self.config.frequency_hz = hz;
        self.cache.reseed();
        self.hw.unmask_irqs();

        log_info!("sample rate {} Hz (asked {})", solution.achieved_hz, hz);
        self.sample_rate()
    }

    fn setup_trigger(&mut self, setup: &TriggerSetup, layout: &BufferLayout) -> Result<Response, UnitError> {
        if !self.mode.is_armable() {
            return Err(UnitError::Busy);
        }
        let trigger = TriggerConfig::from_setup(setup, &self.channels, layout)?;

        self.hw.mask_irqs();
        self.trigger = trigger;
        if let Some(sample) = self.cache.raw_at(trigger.slot) {
            self.detector.rebase(sample);
        }
        self.hw.unmask_irqs();
        Ok(Response::Ack)
    }

    fn open_session(
        &mut self,
        id: u16,
        kind: SessionKind,
        samples: u64,
        event: ModeEvent,
        layout: &BufferLayout,
    ) -> Result<Response, UnitError> {
        if !self.mode.is_armable() {
            return Err(UnitError::Busy);
        }
        let cursor = layout.align_down(self.hw.write_position());
        self.session = Some(CaptureSession::open(id, kind, cursor, samples));
        if let Err(e) = self.switch_mode(event) {
            self.session = None;
            return Err(e);
        }
        log_debug!("session {} opened at {}", id, cursor);
        Ok(Response::Streaming)
    }
}

#[cfg(test)]
mod tests {
    use super::super::sim::{Bench, SimAdc, SimUnit};
    use super::*;
    use crate::config::AcquisitionConfig;
    use crate::resources::ResourceRegistry;
    use crate::traits::Port;
    use heapless::Deque;
    use periscope_protocol::messages::*;
    use std::vec::Vec;

    fn config() -> AcquisitionConfig {
        AcquisitionConfig {
            channel_mask: (1 << 16) | (1 << 9) | 1,
            buffer_size: 300,
            ..Default::default()
        }
    }

    fn trigger_setup() -> TriggerSetup {
        TriggerSetup {
            source: 9,
            level: 1000,
            edge: TriggerEdge::Falling.to_byte(),
            pretrigger: 5,
            posttrigger: 40,
            holdoff_ms: 20,
            auto_rearm: true,
        }
    }

    #[test]
    fn test_requests_busy_before_init() {
        let mut unit = SimUnit::new(SimAdc::default(), Deque::new(), config());
        assert_eq!(unit.handle_request(1, CMD_GET_CHANNELS, &[]), Err(UnitError::Busy));
        assert_eq!(unit.handle_request(1, 0x7F, &[]), Err(UnitError::UnknownCommand));
        assert_eq!(unit.handle_request(1, CMD_SET_SAMPLE_RATE, &[1]), Err(UnitError::Malformed));
    }

    #[test]
    fn test_init_claims_pins() {
        let bench = Bench::new(config());
        assert!(bench.registry.is_claimed(Resource::Adc));
        assert!(bench.registry.is_claimed(Resource::Pin(Port::A, 0)));
        assert!(bench.registry.is_claimed(Resource::Pin(Port::B, 1)));
        assert_eq!(bench.unit.hardware().configured, Some((config().channel_mask, 2)));
    }

    #[test]
    fn test_init_fails_on_claimed_pin() {
        let mut registry = ResourceRegistry::new();
        registry.claim_all(&[Resource::Pin(Port::B, 1)]).unwrap();

        let mut unit = SimUnit::new(SimAdc::default(), Deque::new(), config());
        assert_eq!(unit.init(&mut registry), Err(UnitError::ResourceBusy));
        assert_eq!(unit.mode(), OpMode::Uninit);
        assert!(!registry.is_claimed(Resource::Adc));
    }

    #[test]
    fn test_init_rejects_bad_config() {
        let mut registry = ResourceRegistry::new();
        let bad = AcquisitionConfig {
            frequency_hz: 0,
            ..config()
        };
        let mut unit = SimUnit::new(SimAdc::default(), Deque::new(), bad);
        assert_eq!(unit.init(&mut registry), Err(UnitError::BadConfig));
    }

    #[test]
    fn test_deinit_releases_everything() {
        let mut bench = Bench::new(config());
        let mut registry = core::mem::take(&mut bench.registry);
        bench.unit.deinit(&mut registry);

        assert_eq!(bench.unit.mode(), OpMode::Uninit);
        assert!(!bench.unit.hardware().running);
        assert!(!registry.is_claimed(Resource::Adc));
        assert!(!registry.is_claimed(Resource::Pin(Port::A, 0)));
        assert!(bench.unit.samples().is_empty());

        // Can come back up on the same registry
        bench.unit.init(&mut registry).unwrap();
        assert_eq!(bench.unit.mode(), OpMode::Idle);
    }

    #[test]
    fn test_channels_and_status() {
        let mut bench = Bench::new(config());
        match bench.request_ok(1, CMD_GET_CHANNELS, &[]) {
            Response::Channels(list) => assert_eq!(list.as_slice(), &[0, 9, 16]),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            bench.request_ok(2, CMD_GET_STATUS, &[]),
            Response::Status {
                opmode: OpMode::Idle.to_byte(),
                buffer_items: 300,
                pretrigger_capacity: 50,
                channel_count: 3,
            }
        );
    }

    #[test]
    fn test_set_sample_rate() {
        let mut bench = Bench::new(config());
        let response = bench.request_ok(1, CMD_SET_SAMPLE_RATE, &5000u32.to_le_bytes());
        assert_eq!(
            response,
            Response::SampleRate {
                hz: 5000,
                hz_f: 5000.0
            }
        );
        assert_eq!(bench.unit.hardware().timer_hz(), 5000);
        assert_eq!(bench.request_ok(2, CMD_GET_SAMPLE_RATE, &[]), response);

        assert_eq!(
            bench.request(3, CMD_SET_SAMPLE_RATE, &0u32.to_le_bytes()),
            Err(UnitError::BadValue)
        );
        assert_eq!(
            bench.request(4, CMD_SET_SAMPLE_RATE, &10_000_000u32.to_le_bytes()),
            Err(UnitError::BadValue)
        );
    }

    #[test]
    fn test_read_raw_and_smoothed() {
        let mut bench = Bench::new(config());
        bench.push_group(&[10, 20, 30]);
        bench.push_group(&[20, 40, 60]);

        match bench.request_ok(1, CMD_READ_RAW, &[]) {
            Response::Raw(samples) => assert_eq!(samples.as_slice(), &[20, 40, 60]),
            other => panic!("unexpected {:?}", other),
        }
        // Factor 500: halfway between seed and new sample
        match bench.request_ok(2, CMD_READ_SMOOTHED, &[]) {
            Response::Smoothed(values) => assert_eq!(values.as_slice(), &[15.0, 30.0, 45.0]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_smoothed_too_fast_beats_disabled() {
        let mut bench = Bench::new(config());
        bench.request_ok(1, CMD_SET_SMOOTHING_ENABLED, &[0]);
        assert_eq!(
            bench.request(2, CMD_READ_SMOOTHED, &[]),
            Err(UnitError::SmoothingDisabled)
        );

        bench.request_ok(3, CMD_SET_SAMPLE_RATE, &25_000u32.to_le_bytes());
        assert_eq!(bench.request(4, CMD_READ_SMOOTHED, &[]), Err(UnitError::TooFast));

        bench.request_ok(5, CMD_SET_SMOOTHING_ENABLED, &[1]);
        assert_eq!(bench.request(6, CMD_READ_SMOOTHED, &[]), Err(UnitError::TooFast));
    }

    #[test]
    fn test_smoothing_factor_range() {
        let mut bench = Bench::new(config());
        assert_eq!(
            bench.request_ok(1, CMD_SET_SMOOTHING_FACTOR, &1000u16.to_le_bytes()),
            Response::Ack
        );
        assert_eq!(
            bench.request(2, CMD_SET_SMOOTHING_FACTOR, &1001u16.to_le_bytes()),
            Err(UnitError::BadValue)
        );
    }

    #[test]
    fn test_trigger_read_back() {
        let mut bench = Bench::new(config());
        bench
            .command(1, AdcCommand::SetupTrigger(trigger_setup()))
            .unwrap();
        assert_eq!(
            bench.request_ok(2, CMD_GET_TRIGGER, &[]),
            Response::Trigger(trigger_setup())
        );
    }

    #[test]
    fn test_arm_rules() {
        let mut bench = Bench::new(config());

        // Default trigger has no post-trigger count
        assert_eq!(bench.request(1, CMD_ARM, &[0]), Err(UnitError::BadConfig));

        bench
            .command(2, AdcCommand::SetupTrigger(trigger_setup()))
            .unwrap();
        assert_eq!(bench.request_ok(3, CMD_ARM, &[STICKY_UNCHANGED]), Response::Ack);
        assert_eq!(bench.unit.mode(), OpMode::Armed);
        assert!(bench.unit.trigger().auto_rearm);

        // Re-arming while armed is fine and can change stickiness
        assert_eq!(bench.request_ok(4, CMD_ARM, &[0]), Response::Ack);
        assert!(!bench.unit.trigger().auto_rearm);

        bench.request_ok(5, CMD_STREAM_START, &[]);
        assert_eq!(bench.request(6, CMD_ARM, &[0]), Err(UnitError::Busy));
        assert_eq!(
            bench.command(7, AdcCommand::SetupTrigger(trigger_setup())),
            Err(UnitError::Busy)
        );
    }

    #[test]
    fn test_disarm_is_idempotent() {
        let mut bench = Bench::new(config());
        bench
            .command(1, AdcCommand::SetupTrigger(trigger_setup()))
            .unwrap();
        bench.request_ok(2, CMD_ARM, &[1]);

        assert_eq!(bench.request_ok(3, CMD_DISARM, &[]), Response::Ack);
        assert_eq!(bench.unit.mode(), OpMode::Idle);
        assert!(!bench.unit.trigger().auto_rearm);
        assert_eq!(bench.request_ok(4, CMD_DISARM, &[]), Response::Ack);
        assert_eq!(bench.unit.mode(), OpMode::Idle);
    }

    #[test]
    fn test_setup_rejects_unknown_source() {
        let mut bench = Bench::new(config());
        let setup = TriggerSetup {
            source: 3,
            ..trigger_setup()
        };
        assert_eq!(
            bench.command(1, AdcCommand::SetupTrigger(setup)),
            Err(UnitError::BadValue)
        );
    }

    #[test]
    fn test_block_capture_on_request_id() {
        let mut bench = Bench::new(config());
        assert_eq!(
            bench.request(1, CMD_BLOCK_CAPTURE, &0u32.to_le_bytes()),
            Err(UnitError::BadValue)
        );
        assert_eq!(
            bench.request_ok(42, CMD_BLOCK_CAPTURE, &60u32.to_le_bytes()),
            Response::Streaming
        );
        assert_eq!(bench.unit.mode(), OpMode::BlockCapture);

        for i in 0..100u16 {
            bench.push_group(&[i, i, i]);
            bench.deliver();
        }

        let messages = &bench.sink.messages;
        assert!(messages.iter().all(|m| m.id == 42));
        let serials: Vec<u32> = messages.iter().map(|m| m.serial()).collect();
        assert_eq!(serials, (0..messages.len() as u32).collect::<Vec<_>>());
        let total: usize = messages.iter().map(|m| m.samples(4).len()).sum();
        assert_eq!(total, 180);
        assert_eq!(messages.last().map(|m| m.msg_type), Some(MSG_CAPTURE_DONE));
        assert_eq!(bench.unit.mode(), OpMode::Idle);
    }

    #[test]
    fn test_stream_stop_sends_end() {
        let mut bench = Bench::new(config());
        assert_eq!(bench.request(1, CMD_STREAM_STOP, &[]), Err(UnitError::Busy));

        bench.request_ok(9, CMD_STREAM_START, &[]);
        for i in 0..60u16 {
            bench.push_group(&[i, i, i]);
            bench.deliver();
        }
        assert_eq!(bench.request_ok(10, CMD_STREAM_STOP, &[]), Response::Ack);
        assert_eq!(bench.unit.mode(), OpMode::Idle);
        bench.deliver();

        let last = bench.sink.messages.last().unwrap();
        assert_eq!(last.id, 9);
        assert_eq!(last.msg_type, MSG_CAPTURE_DONE);
        assert!(last.payload.is_empty());
        assert!(bench
            .sink
            .messages
            .iter()
            .rev()
            .skip(1)
            .all(|m| m.msg_type == MSG_CAPTURE_MORE));
    }

    #[test]
    fn test_abort() {
        let mut bench = Bench::new(config());
        // Nothing running: plain ack, no notice
        assert_eq!(bench.request_ok(1, CMD_ABORT, &[]), Response::Ack);
        bench.deliver();
        assert!(bench.sink.messages.is_empty());

        bench.request_ok(5, CMD_BLOCK_CAPTURE, &1000u32.to_le_bytes());
        assert_eq!(bench.request_ok(6, CMD_ABORT, &[]), Response::Ack);
        assert_eq!(bench.unit.mode(), OpMode::Idle);
        assert!(!bench.unit.hardware().buffer_irqs);
        bench.deliver();
        assert_eq!(bench.sink.messages.len(), 1);
        assert_eq!(bench.sink.messages[0].id, 5);
        assert_eq!(bench.sink.messages[0].msg_type, MSG_CAPTURE_DONE);
    }

    #[test]
    fn test_abort_with_full_queue() {
        let mut bench = Bench::new(config());
        bench.request_ok(5, CMD_STREAM_START, &[]);
        while bench
            .unit
            .queue_mut()
            .push_back(ReportJob::StreamEnd { session: 1 })
            .is_ok()
        {}

        assert_eq!(bench.request_ok(6, CMD_ABORT, &[]), Response::Ack);
        assert_eq!(bench.unit.mode(), OpMode::Idle);
        assert!(bench.unit.session().is_none());

        // The notice goes out once the consumer has made room
        bench.unit.queue_mut().clear();
        bench.unit.tick(1);
        bench.deliver();
        assert_eq!(bench.sink.messages.len(), 1);
        assert_eq!(bench.sink.messages[0].id, 5);
        assert_eq!(bench.sink.messages[0].msg_type, MSG_CAPTURE_DONE);
        assert!(bench.sink.messages[0].payload.is_empty());
    }

    #[test]
    fn test_abort_busy_during_emergency() {
        let mut bench = Bench::new(config());
        bench.request_ok(1, CMD_STREAM_START, &[]);
        for i in 0..300u16 {
            bench.push_group(&[i, i, i]);
        }
        assert_eq!(bench.unit.mode(), OpMode::EmergencyShutdown);
        assert_eq!(bench.request(2, CMD_ABORT, &[]), Err(UnitError::Busy));
        assert_eq!(bench.request(3, CMD_READ_RAW, &[]), Err(UnitError::Busy));
    }

    #[test]
    fn test_force_trigger() {
        let mut bench = Bench::new(config());
        assert_eq!(bench.request(1, CMD_FORCE_TRIGGER, &[]), Err(UnitError::BadConfig));

        let setup = TriggerSetup {
            auto_rearm: false,
            ..trigger_setup()
        };
        bench.command(2, AdcCommand::SetupTrigger(setup)).unwrap();
        for i in 0..10u16 {
            bench.push_group(&[i, i, i]);
        }
        assert_eq!(bench.request_ok(3, CMD_FORCE_TRIGGER, &[]), Response::Ack);
        assert_eq!(bench.unit.mode(), OpMode::Triggered);
        bench.deliver();

        let header = &bench.sink.messages[0];
        assert_eq!(header.msg_type, MSG_CAPTURE_START);
        assert_eq!(header.payload[4], TriggerEdge::Manual.to_byte());
        // Five groups ending with the newest one
        let pre = header.samples(7);
        assert_eq!(pre.len(), 15);
        assert_eq!(&pre[12..], &[9, 9, 9]);

        // Forced fires go through the hold-off too
        bench.request_ok(4, CMD_ABORT, &[]);
        bench.request_ok(5, CMD_FORCE_TRIGGER, &[]);
        assert_eq!(bench.unit.mode(), OpMode::Idle);
    }
}
