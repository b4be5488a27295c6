//! System tick for the acquisition unit
//!
//! Drives the trigger hold-off countdown and the emergency recovery timer.

use defmt::*;
use embassy_time::{Duration, Instant, Ticker};

use periscope_core::traits::Unit;

use crate::channels::with_engine;

/// Tick interval in milliseconds
pub const TICK_INTERVAL_MS: u32 = 1;

/// Tick task - hands elapsed milliseconds to the engine
#[embassy_executor::task]
pub async fn tick_task() {
    info!("Tick task started");

    let mut ticker = Ticker::every(Duration::from_millis(TICK_INTERVAL_MS as u64));
    let mut last = Instant::now();

    loop {
        ticker.next().await;

        // A late wakeup still accounts for the full gap
        let now = Instant::now();
        let elapsed_ms = (now - last).as_millis() as u32;
        if elapsed_ms == 0 {
            continue;
        }
        last += Duration::from_millis(elapsed_ms as u64);

        with_engine(|engine| engine.tick(elapsed_ms));
    }
}
