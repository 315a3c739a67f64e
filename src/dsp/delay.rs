/// Longest interleave delay the line can hold, in milliseconds.
pub const MAX_DELAY_MS: f32 = 200.0;

/// Single-channel ring buffer used to stagger the right channel behind the
/// left one.
#[derive(Debug, Clone)]
pub struct InterleaveDelay {
    buffer: Box<[f32]>,
    write_pos: usize,
}

impl InterleaveDelay {
    pub fn new(sample_rate: f32) -> Self {
        let capacity = (sample_rate as f64 * MAX_DELAY_MS as f64 / 1000.0).ceil() as usize;
        let capacity = capacity.max(1);
        Self {
            buffer: vec![0.0; capacity].into_boxed_slice(),
            write_pos: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Largest delay in samples that still reads inside the buffer.
    #[inline]
    pub fn max_delay(&self) -> f32 {
        (self.buffer.len() - 1) as f32
    }

    /// Write `input` and return the sample written `delay` samples ago.
    /// The delay is floored; zero passes `input` straight through.
    #[inline]
    pub fn process(&mut self, input: f32, delay: f32) -> f32 {
        let capacity = self.buffer.len();
        self.buffer[self.write_pos] = input;
        let offset = (delay.max(0.0) as usize) % capacity;
        let read_pos = if offset > self.write_pos {
            self.write_pos + capacity - offset
        } else {
            self.write_pos - offset
        };
        let out = self.buffer[read_pos];
        self.write_pos += 1;
        if self.write_pos == capacity {
            self.write_pos = 0;
        }
        out
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_covers_two_hundred_ms() {
        assert_eq!(InterleaveDelay::new(48_000.0).capacity(), 9_600);
        assert_eq!(InterleaveDelay::new(44_100.0).capacity(), 8_820);
        assert_eq!(InterleaveDelay::new(22_050.5).capacity(), 4_411);
    }

    #[test]
    fn zero_delay_is_passthrough() {
        let mut line = InterleaveDelay::new(1_000.0);
        for i in 0..1_000 {
            let x = i as f32 * 0.001;
            assert_eq!(line.process(x, 0.0), x);
        }
    }

    #[test]
    fn fixed_delay_returns_past_input_across_wraparound() {
        let mut line = InterleaveDelay::new(100.0);
        let d = 7;
        let inputs: Vec<f32> = (0..200).map(|i| i as f32 + 1.0).collect();
        for (n, &x) in inputs.iter().enumerate() {
            let out = line.process(x, d as f32 + 0.75);
            let expected = if n >= d { inputs[n - d] } else { 0.0 };
            assert_eq!(out, expected, "n {n}");
        }
    }

    #[test]
    fn oversized_delay_stays_in_bounds() {
        let mut line = InterleaveDelay::new(100.0);
        for i in 0..100 {
            let _ = line.process(i as f32, 1.0e9);
            let _ = line.process(i as f32, f32::INFINITY);
        }
    }
}
