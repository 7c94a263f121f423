//! Rational presentation timestamps and per-stream output clocks.

/// A rational timestamp: `value / timescale` seconds.
///
/// Capture sources deliver timestamps against arbitrary timescales
/// (nanosecond host clocks, audio sample clocks); arithmetic here stays
/// in integers so output frame indices are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaTime {
    pub value: i64,
    pub timescale: i32,
}

impl MediaTime {
    pub const fn new(value: i64, timescale: i32) -> Self {
        Self { value, timescale }
    }

    /// Convert to another timescale, truncating toward zero.
    pub fn rescale(self, timescale: i32) -> Self {
        if timescale == self.timescale {
            return self;
        }
        let value = (self.value as i128 * timescale as i128 / self.timescale as i128) as i64;
        Self { value, timescale }
    }

    /// `self - other`, expressed in `self`'s timescale.
    pub fn sub(self, other: MediaTime) -> MediaTime {
        let other = other.rescale(self.timescale);
        MediaTime::new(self.value - other.value, self.timescale)
    }

    /// `self + other`, expressed in `self`'s timescale.
    pub fn add(self, other: MediaTime) -> MediaTime {
        let other = other.rescale(self.timescale);
        MediaTime::new(self.value + other.value, self.timescale)
    }

    /// Integer frame/sample index of this time at `rate` units per
    /// second: `trunc(value * rate / timescale)`.
    pub fn output_index(self, rate: u32) -> i64 {
        (self.value as i128 * rate as i128 / self.timescale as i128) as i64
    }

    /// Approximate seconds, for logging only.
    pub fn seconds(self) -> f64 {
        self.value as f64 / self.timescale as f64
    }
}

/// Per-stream clock: a write-once origin plus the stream's output rate.
///
/// The origin is immutable once set; all elapsed-time computations for
/// the stream are measured from it.
#[derive(Debug, Clone, Copy)]
pub struct StreamClock {
    origin: Option<MediaTime>,
    output_rate: u32,
}

impl StreamClock {
    pub fn new(output_rate: u32) -> Self {
        Self {
            origin: None,
            output_rate,
        }
    }

    pub fn origin(&self) -> Option<MediaTime> {
        self.origin
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Set the origin if unset. Returns whether this call set it; a
    /// second call never overwrites.
    pub fn start_at(&mut self, origin: MediaTime) -> bool {
        if self.origin.is_some() {
            return false;
        }
        self.origin = Some(origin);
        true
    }

    /// Elapsed time of `pts` since the origin, or `None` before start.
    pub fn elapsed(&self, pts: MediaTime) -> Option<MediaTime> {
        self.origin.map(|origin| pts.sub(origin))
    }

    /// Output frame/sample index for `pts`, or `None` before start.
    pub fn output_pts(&self, pts: MediaTime) -> Option<i64> {
        self.elapsed(pts).map(|e| e.output_index(self.output_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rescale_truncates_toward_zero() {
        let t = MediaTime::new(999, 1000);
        assert_eq!(t.rescale(100).value, 99);
        let t = MediaTime::new(-999, 1000);
        assert_eq!(t.rescale(100).value, -99);
    }

    #[test]
    fn sub_handles_mixed_timescales() {
        let a = MediaTime::new(3_000_000_000, 1_000_000_000); // 3s in nanos
        let b = MediaTime::new(44_100, 44_100); // 1s in a sample clock
        let d = a.sub(b);
        assert_eq!(d.timescale, 1_000_000_000);
        assert_eq!(d.value, 2_000_000_000);
    }

    #[test]
    fn output_index_is_floor_of_elapsed_times_rate() {
        // 0.999s at 120 fps -> frame 119
        assert_eq!(MediaTime::new(999, 1000).output_index(120), 119);
        assert_eq!(MediaTime::new(1000, 1000).output_index(120), 120);
        // large nanosecond values do not overflow
        assert_eq!(
            MediaTime::new(10_000_000_000, 1_000_000_000).output_index(48_000),
            480_000
        );
    }

    #[test]
    fn clock_origin_is_write_once() {
        let mut clock = StreamClock::new(120);
        assert!(clock.start_at(MediaTime::new(100, 10)));
        assert!(!clock.start_at(MediaTime::new(200, 10)));
        assert_eq!(clock.origin(), Some(MediaTime::new(100, 10)));
    }

    #[test]
    fn output_pts_before_start_is_none() {
        let clock = StreamClock::new(120);
        assert_eq!(clock.output_pts(MediaTime::new(5, 1)), None);
    }

    #[test]
    fn monotonic_inputs_give_non_decreasing_output() {
        let mut clock = StreamClock::new(120);
        clock.start_at(MediaTime::new(1_000, 1_000_000));
        let mut last = i64::MIN;
        for i in 0..200 {
            // irregular but monotonically increasing arrivals
            let pts = MediaTime::new(1_000 + i * 7_919, 1_000_000);
            let out = clock.output_pts(pts).unwrap();
            assert!(out >= last);
            last = out;
        }
    }
}
