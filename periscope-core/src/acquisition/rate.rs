//! Sample timer solver
//!
//! The timer divides its input clock by `prescaler * reload`, both in
//! 1..=65536 and programmed minus one into 16-bit registers. The solver
//! scans a short window of prescalers above the smallest usable one for the
//! pair with the smallest absolute error `|clk - f * psc * arr|`, stopping
//! early on an exact match.
//!
//! The window keeps the scan short enough for a critical section. At the
//! smallest usable prescaler the reload is already above 32768 whenever a
//! prescaler is needed at all, so rounding the reload costs less than 16 ppm
//! and widening the scan buys nothing the host can measure.

/// Largest divider per timer stage
const MAX_DIVIDER: u64 = 65_536;

/// Prescalers tried above the smallest usable one
const SEARCH_WINDOW: u64 = 64;

/// Converter clock in half-cycles per second (14 MHz)
const ADC_HALF_CYCLES_PER_SEC: u32 = 28_000_000;

/// Successive approximation time in half-cycles (12.5 cycles)
const CONVERSION_HALF_CYCLES: u32 = 25;

/// Sampling time in half-cycles for each sample-time code
const SAMPLE_HALF_CYCLES: [u32; 8] = [3, 15, 27, 57, 83, 111, 143, 479];

/// Register values and achieved rate for a requested frequency
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RateSolution {
    /// Prescaler register value (divider minus one)
    pub prescaler: u16,
    /// Auto-reload register value (divider minus one)
    pub reload: u16,
    /// Achieved frequency, rounded to the nearest Hz
    pub achieved_hz: u32,
    /// Achieved frequency
    pub achieved_hz_f: f32,
}

impl RateSolution {
    /// Total clock division of the solution
    pub fn divider(&self) -> u64 {
        (self.prescaler as u64 + 1) * (self.reload as u64 + 1)
    }
}

/// Find timer dividers for `target_hz` from a `clock_hz` input
///
/// Returns `None` when the target is zero, above the input clock or below
/// what the largest divider pair can reach.
pub fn solve(clock_hz: u32, target_hz: u32) -> Option<RateSolution> {
    if target_hz == 0 || target_hz > clock_hz {
        return None;
    }

    let clock = clock_hz as u64;
    let target = target_hz as u64;
    if target * MAX_DIVIDER * MAX_DIVIDER < clock {
        return None;
    }

    // Smallest prescaler that still lets the reload stage reach the target
    let first = clock.div_ceil(target * MAX_DIVIDER).max(1);

    let mut best: Option<(u64, u64, u64)> = None;
    let last = (first + SEARCH_WINDOW).min(MAX_DIVIDER);
    for psc in first..=last {
        let step = target * psc;
        let count = ((clock + step / 2) / step).clamp(1, MAX_DIVIDER);
        let error = clock.abs_diff(step * count);

        if best.map_or(true, |(_, _, e)| error < e) {
            best = Some((psc, count, error));
        }
        if error == 0 || step >= clock {
            break;
        }
    }

    let (psc, count, _) = best?;
    let divider = psc * count;
    Some(RateSolution {
        prescaler: (psc - 1) as u16,
        reload: (count - 1) as u16,
        achieved_hz: ((clock + divider / 2) / divider) as u32,
        achieved_hz_f: clock_hz as f32 / divider as f32,
    })
}

/// Highest conversion group rate the converter sustains
pub fn max_sample_rate_hz(sample_time: u8, channel_count: usize) -> u32 {
    let Some(&sample) = SAMPLE_HALF_CYCLES.get(sample_time as usize) else {
        return 0;
    };
    if channel_count == 0 {
        return 0;
    }
    ADC_HALF_CYCLES_PER_SEC / (channel_count as u32 * (sample + CONVERSION_HALF_CYCLES))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CLOCK: u32 = 48_000_000;

    #[test]
    fn test_exact_rate() {
        let solution = solve(CLOCK, 1000).unwrap();
        assert_eq!(solution.divider(), 48_000);
        assert_eq!(solution.achieved_hz, 1000);
        assert_eq!(solution.achieved_hz_f, 1000.0);
    }

    #[test]
    fn test_low_rate_needs_prescaler() {
        let solution = solve(CLOCK, 10).unwrap();
        assert!(solution.prescaler > 0);
        assert_eq!(solution.divider(), 4_800_000);
        assert_eq!(solution.achieved_hz, 10);
    }

    #[test]
    fn test_inexact_rate_rounds() {
        // 48 MHz / 7 kHz has no exact divider pair
        let solution = solve(CLOCK, 7_000).unwrap();
        assert_eq!(solution.achieved_hz, 7_000);
        assert!((solution.achieved_hz_f - 7_000.0).abs() < 1.0);
    }

    #[test]
    fn test_awkward_rates_stay_in_window() {
        for target in [13u32, 333, 997, 1001] {
            let solution = solve(CLOCK, target).unwrap();
            let first = (CLOCK as u64).div_ceil(target as u64 * MAX_DIVIDER).max(1);
            let psc = solution.prescaler as u64 + 1;
            assert!(psc >= first && psc <= first + SEARCH_WINDOW, "target {}", target);

            let achieved = CLOCK as f64 / solution.divider() as f64;
            let relative = (achieved - target as f64).abs() / target as f64;
            assert!(relative < 1e-4, "target {} achieved {}", target, achieved);
        }
    }

    #[test]
    fn test_unreachable_rates() {
        assert_eq!(solve(CLOCK, 0), None);
        assert_eq!(solve(CLOCK, CLOCK + 1), None);
        // 48 MHz / 2^32 is about 0.011 Hz, so 1 Hz is still reachable
        assert!(solve(CLOCK, 1).is_some());
    }

    #[test]
    fn test_max_sample_rate() {
        // 13.5 + 12.5 cycles at 14 MHz
        assert_eq!(max_sample_rate_hz(2, 1), 538_461);
        assert_eq!(max_sample_rate_hz(0, 2), 500_000);
        assert_eq!(max_sample_rate_hz(8, 1), 0);
        assert_eq!(max_sample_rate_hz(2, 0), 0);
    }

    proptest! {
        #[test]
        fn prop_solution_is_close(target in 1u32..=100_000) {
            let solution = solve(CLOCK, target).unwrap();
            let achieved = CLOCK as f64 / solution.divider() as f64;
            let relative = (achieved - target as f64).abs() / target as f64;
            prop_assert!(relative < 0.002, "target {} achieved {}", target, achieved);
        }
    }
}
