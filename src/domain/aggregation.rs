// Fixed-width time bucket averaging for history points
use super::vehicle::HistoryPoint;

pub const DEFAULT_BUCKET_WIDTH_MS: u64 = 5_000;

/// Accumulates samples of one vehicle and emits one averaged point per bucket.
///
/// Bucket membership is `floor(time / width)`. The reported timestamp of a
/// closed bucket is the time of the last sample added to it. Callers are
/// expected to feed monotonic times; nothing is rejected or reordered here.
#[derive(Debug, Clone)]
pub struct AggregationBuffer {
    width_ms: i64,
    timestamp: i64,
    speed: Vec<f64>,
    state_of_charge: Vec<f64>,
}

impl AggregationBuffer {
    pub fn new(width_ms: u64) -> Self {
        Self {
            width_ms: i64::try_from(width_ms.max(1)).unwrap_or(i64::MAX),
            timestamp: 0,
            speed: Vec::new(),
            state_of_charge: Vec::new(),
        }
    }

    pub fn add(&mut self, time: i64, speed: f64, state_of_charge: f64) -> Option<HistoryPoint> {
        let flushed = if !self.is_empty() && self.bucket_of(self.timestamp) != self.bucket_of(time) {
            Some(self.flush())
        } else {
            None
        };

        self.timestamp = time;
        self.speed.push(speed);
        self.state_of_charge.push(state_of_charge);

        flushed
    }

    pub fn reset(&mut self) {
        self.timestamp = 0;
        self.speed.clear();
        self.state_of_charge.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.speed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.speed.len()
    }

    fn bucket_of(&self, time: i64) -> i64 {
        time.div_euclid(self.width_ms)
    }

    fn flush(&mut self) -> HistoryPoint {
        let point = HistoryPoint {
            timestamp: self.timestamp,
            speed: mean(&self.speed),
            state_of_charge: mean(&self.state_of_charge),
        };
        self.reset();
        point
    }
}

impl Default for AggregationBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKET_WIDTH_MS)
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    // A value aligned with a 5-second tick
    const T0: i64 = 1_700_000_000_000;

    #[test]
    fn test_first_sample_does_not_flush() {
        let mut buffer = AggregationBuffer::default();
        assert_eq!(buffer.add(T0 + 1_234, 20.0, 70.0), None);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_samples_in_same_bucket_do_not_flush() {
        let mut buffer = AggregationBuffer::default();
        assert_eq!(buffer.add(T0, 20.0, 70.0), None);
        assert_eq!(buffer.add(T0 + 100, 30.0, 65.0), None);

        for delta in (200..=4_990).step_by(10) {
            let speed = 20.0 + ((delta % 40) / 10) as f64;
            assert_eq!(buffer.add(T0 + delta, speed, 70.0), None);
        }
    }

    #[test]
    fn test_distant_sample_flushes_single_value() {
        let mut buffer = AggregationBuffer::default();
        let time = T0 + 321;
        buffer.add(time, 20.0, 70.0);

        let point = buffer.add(time + 6_000, 30.0, 65.0);

        assert_eq!(
            point,
            Some(HistoryPoint {
                timestamp: time,
                speed: 20.0,
                state_of_charge: 70.0
            })
        );
    }

    #[test]
    fn test_flush_averages_and_uses_last_timestamp() {
        let mut buffer = AggregationBuffer::new(5_000);
        assert_eq!(buffer.add(T0, 20.0, 70.0), None);
        assert_eq!(buffer.add(T0 + 100, 30.0, 60.0), None);

        let point = buffer.add(T0 + 6_000, 40.0, 58.0);

        assert_eq!(
            point,
            Some(HistoryPoint {
                timestamp: T0 + 100,
                speed: 25.0,
                state_of_charge: 65.0
            })
        );
    }

    #[test]
    fn test_flushing_sample_seeds_next_bucket() {
        let mut buffer = AggregationBuffer::new(5_000);
        buffer.add(T0, 20.0, 70.0);
        buffer.add(T0 + 6_000, 40.0, 58.0);
        assert_eq!(buffer.len(), 1);

        let point = buffer.add(T0 + 11_000, 10.0, 50.0);

        assert_eq!(
            point,
            Some(HistoryPoint {
                timestamp: T0 + 6_000,
                speed: 40.0,
                state_of_charge: 58.0
            })
        );
    }

    #[test]
    fn test_bucket_boundary_uses_floor_division() {
        let mut buffer = AggregationBuffer::new(5_000);
        buffer.add(T0 + 4_999, 10.0, 10.0);

        assert!(buffer.add(T0 + 5_000, 20.0, 20.0).is_some());
    }

    #[test]
    fn test_reset_discards_samples() {
        let mut buffer = AggregationBuffer::new(5_000);
        buffer.add(T0, 20.0, 70.0);
        buffer.reset();

        assert!(buffer.is_empty());
        assert_eq!(buffer.add(T0 + 6_000, 30.0, 60.0), None);
    }
}
