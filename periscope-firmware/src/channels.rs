//! Inter-task communication channels
//!
//! Defines the statics shared between the converter interrupt, the tick and
//! the host link tasks. The engine itself lives behind a critical-section
//! mutex; everything that leaves it does so as a small job value.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;

use periscope_core::traits::{JobQueue, QueueFull};
use periscope_core::{AdcUnit, ReportJob};
use periscope_hal_stm32f0::StmAdc;
use periscope_protocol::Frame;

/// Report jobs in flight between the interrupt and the host link
const REPORT_QUEUE_SIZE: usize = 16;

/// Replies waiting for the transmitter
const REPLY_CHANNEL_SIZE: usize = 2;

/// Deferred report jobs, produced from interrupt context
pub static REPORT_QUEUE: Channel<CriticalSectionRawMutex, ReportJob, REPORT_QUEUE_SIZE> =
    Channel::new();

/// Request replies from the receive task
pub static REPLY_CHANNEL: Channel<CriticalSectionRawMutex, Frame, REPLY_CHANNEL_SIZE> =
    Channel::new();

/// Producer handle of [`REPORT_QUEUE`]
pub struct ReportQueue;

impl JobQueue<ReportJob> for ReportQueue {
    fn try_enqueue(&mut self, job: ReportJob) -> Result<(), QueueFull> {
        REPORT_QUEUE.try_send(job).map_err(|_| QueueFull)
    }
}

/// The acquisition unit as wired on this board
pub type Engine = AdcUnit<StmAdc, ReportQueue>;

/// Engine shared by the interrupt handler and the tasks
pub static ENGINE: Mutex<CriticalSectionRawMutex, RefCell<Option<Engine>>> =
    Mutex::new(RefCell::new(None));

/// Run `f` on the engine inside a critical section
///
/// Returns `None` before the engine has been installed.
pub fn with_engine<R>(f: impl FnOnce(&mut Engine) -> R) -> Option<R> {
    ENGINE.lock(|cell| cell.borrow_mut().as_mut().map(f))
}
