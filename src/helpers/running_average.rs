use heapless::Deque;

/// Window of the last `window` samples (at most `N`) with a running sum.
#[derive(Debug, Clone)]
pub struct RunningAverage<const N: usize> {
    buffer: Deque<f64, N>,
    window: usize,
    sum: f64,
}

impl<const N: usize> RunningAverage<N> {
    pub fn new() -> Self {
        Self::with_window(N)
    }

    /// `window` is clamped to `1..=N`.
    pub fn with_window(window: usize) -> Self {
        Self {
            buffer: Deque::new(),
            window: window.clamp(1, N.max(1)),
            sum: 0.0,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.buffer.len() >= self.window {
            if let Some(oldest) = self.buffer.pop_front() {
                self.sum -= oldest;
            }
        }
        if self.buffer.push_back(value).is_ok() {
            self.sum += value;
        }
    }

    pub fn average(&self) -> Option<f64> {
        if self.buffer.is_empty() {
            return None;
        }
        Some(self.sum / self.buffer.len() as f64)
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.sum = 0.0;
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.window
    }
}

impl<const N: usize> Default for RunningAverage<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Largest window the CLI can average over.
pub const MAX_WINDOW: usize = 120;

/// Averages the last `window` readings and hands the average out every
/// `every` readings.
#[derive(Debug, Clone)]
pub struct SampleReporter {
    samples: RunningAverage<MAX_WINDOW>,
    every: usize,
    counter: usize,
}

impl SampleReporter {
    /// `window` is clamped to `1..=MAX_WINDOW`, `every` to at least 1.
    pub fn new(window: usize, every: usize) -> Self {
        Self {
            samples: RunningAverage::with_window(window),
            every: every.max(1),
            counter: 0,
        }
    }

    pub fn push(&mut self, value: f64) -> Option<f64> {
        self.samples.push(value);

        self.counter += 1;
        if self.counter == self.every {
            self.counter = 0;
            self.samples.average()
        } else {
            None
        }
    }

    pub fn average(&self) -> Option<f64> {
        self.samples.average()
    }
}
