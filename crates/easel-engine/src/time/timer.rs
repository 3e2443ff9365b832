use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Period used when a caller asks for "the default frame rate".
pub const DEFAULT_PERIOD: Duration = Duration::from_nanos(1_000_000_000 / 60);

#[derive(Debug)]
struct TimerState {
    start: Instant,
    /// Wake target of the last `sleep(true)`; anchors the boundary grid.
    last_wake: Instant,
    period: Duration,
    last_rep: u64,
    time_between_sleeps: Duration,
}

/// Monotonic period-based pacing primitive.
///
/// All methods take `&self`; the timer may be shared between threads. Boundaries
/// are computed on a grid anchored at the last wake target, so repeated
/// `sleep(true)` calls do not accumulate overshoot.
#[derive(Debug)]
pub struct Timer {
    state: Mutex<TimerState>,
}

impl Timer {
    /// Creates a timer with `period`. A zero period falls back to [`DEFAULT_PERIOD`].
    pub fn new(period: Duration) -> Self {
        let now = Instant::now();
        let period = if period.is_zero() { DEFAULT_PERIOD } else { period };

        Self {
            state: Mutex::new(TimerState {
                start: now,
                last_wake: now,
                period,
                last_rep: 0,
                time_between_sleeps: Duration::ZERO,
            }),
        }
    }

    /// Restarts the timer at "now".
    ///
    /// `Some(period)` with a non-zero duration replaces the pacing interval;
    /// `None` or zero keeps the current one.
    pub fn reset(&self, period: Option<Duration>) {
        let mut st = self.state.lock();
        let now = Instant::now();

        st.start = now;
        st.last_wake = now;
        st.last_rep = 0;
        if let Some(p) = period.filter(|p| !p.is_zero()) {
            st.period = p;
        }
    }

    /// Current pacing interval.
    pub fn period(&self) -> Duration {
        self.state.lock().period
    }

    /// Number of whole periods elapsed since the last reset.
    pub fn reps(&self) -> u64 {
        let st = self.state.lock();
        reps_between(st.start, Instant::now(), st.period)
    }

    /// Seconds elapsed since the last reset.
    pub fn time(&self) -> f64 {
        self.state.lock().start.elapsed().as_secs_f64()
    }

    /// Measured interval between the two most recent sleeps.
    pub fn time_between_sleeps(&self) -> Duration {
        self.state.lock().time_between_sleeps
    }

    /// Returns `true` once per period boundary crossing.
    ///
    /// Several boundaries crossed between two polls still report a single `true`.
    pub fn past_period(&self) -> bool {
        let mut st = self.state.lock();
        let reps = reps_between(st.start, Instant::now(), st.period);

        if st.last_rep < reps {
            st.last_rep = reps;
            true
        } else {
            false
        }
    }

    /// Blocks until the next period boundary.
    ///
    /// With `update`, the wake target becomes the new grid anchor so the next call
    /// targets the following boundary. A caller that is already late sleeps zero.
    pub fn sleep(&self, update: bool) {
        let (target, period) = {
            let mut st = self.state.lock();
            let target = next_boundary(st.last_wake, Instant::now(), st.period);
            if update {
                st.last_wake = target;
            }
            (target, st.period)
        };

        let wait = target.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }

        let overshoot = Instant::now().saturating_duration_since(target);
        self.state.lock().time_between_sleeps = overshoot + period;
    }

    /// Blocks the calling thread for `duration`.
    pub fn sleep_for(duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD)
    }
}

fn reps_between(start: Instant, now: Instant, period: Duration) -> u64 {
    let elapsed = now.saturating_duration_since(start).as_nanos();
    (elapsed / period.as_nanos().max(1)) as u64
}

/// First boundary `anchor + k * period` (k >= 0) that is not before `now`.
fn next_boundary(anchor: Instant, now: Instant, period: Duration) -> Instant {
    if anchor >= now {
        return anchor;
    }

    let behind = now.duration_since(anchor).as_nanos();
    let period_ns = period.as_nanos().max(1);
    let steps = behind.div_ceil(period_ns);

    anchor + Duration::from_nanos((steps * period_ns) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: Duration = Duration::from_millis(10);

    #[test]
    fn zero_period_falls_back_to_default() {
        assert_eq!(Timer::new(Duration::ZERO).period(), DEFAULT_PERIOD);
    }

    #[test]
    fn reset_keeps_period_when_none_or_zero() {
        let t = Timer::new(P);
        t.reset(None);
        assert_eq!(t.period(), P);
        t.reset(Some(Duration::ZERO));
        assert_eq!(t.period(), P);
        t.reset(Some(Duration::from_millis(3)));
        assert_eq!(t.period(), Duration::from_millis(3));
    }

    #[test]
    fn reps_are_monotonic() {
        let t = Timer::new(Duration::from_millis(1));
        let mut last = t.reps();
        for _ in 0..20 {
            std::thread::sleep(Duration::from_micros(300));
            let now = t.reps();
            assert!(now >= last);
            last = now;
        }
        assert!(last >= 5);
    }

    #[test]
    fn past_period_fires_once_per_crossing() {
        let t = Timer::new(Duration::from_millis(20));
        assert!(!t.past_period());

        std::thread::sleep(Duration::from_millis(25));
        assert!(t.past_period());
        assert!(!t.past_period());

        // Crossing several boundaries between polls still reports one edge.
        std::thread::sleep(Duration::from_millis(65));
        assert!(t.past_period());
        assert!(!t.past_period());
    }

    #[test]
    fn next_boundary_rounds_up_onto_the_grid() {
        let anchor = Instant::now();
        assert_eq!(next_boundary(anchor, anchor, P), anchor);
        assert_eq!(next_boundary(anchor, anchor + Duration::from_millis(1), P), anchor + P);
        assert_eq!(next_boundary(anchor, anchor + P, P), anchor + P);
        assert_eq!(
            next_boundary(anchor, anchor + Duration::from_millis(31), P),
            anchor + Duration::from_millis(40)
        );
        // Anchor in the future: no rounding, no negative sleep.
        let later = anchor + Duration::from_millis(5);
        assert_eq!(next_boundary(later, anchor, P), later);
    }

    #[test]
    fn sleep_update_is_drift_free() {
        let t = Timer::new(P);
        let begin = Instant::now();
        const N: u32 = 10;

        for _ in 0..N {
            t.sleep(true);
        }

        let elapsed = begin.elapsed();
        // Boundaries are fixed on the grid, so total time tracks N periods instead of
        // N periods plus every individual overshoot.
        assert!(elapsed >= P * (N - 1), "elapsed {elapsed:?}");
        assert!(elapsed < P * N + Duration::from_millis(40), "elapsed {elapsed:?}");
    }

    #[test]
    fn late_caller_does_not_block() {
        let t = Timer::new(Duration::from_millis(50));
        std::thread::sleep(Duration::from_millis(5));
        t.sleep(true);

        // Pretend the caller did 60ms of work; the next boundary is close, not a full
        // period away.
        std::thread::sleep(Duration::from_millis(60));
        let before = Instant::now();
        t.sleep(true);
        assert!(before.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn records_time_between_sleeps() {
        let t = Timer::new(P);
        t.sleep(true);
        assert!(t.time_between_sleeps() >= P);
    }

    #[test]
    fn shared_between_threads() {
        let t = std::sync::Arc::new(Timer::new(Duration::from_millis(2)));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let t = t.clone();
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        t.sleep(true);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(t.reps() >= 5);
    }
}
