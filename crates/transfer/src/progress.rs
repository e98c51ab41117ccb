use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default window for throughput estimation.
const DEFAULT_WINDOW: Duration = Duration::from_secs(5);

/// Maximum retained throughput samples.
const MAX_SAMPLES: usize = 100;

/// Whole-percent progress: `round(completed / total * 100)`.
///
/// Returns 0 when `total` is 0.
pub fn progress_percent(completed: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (f64::from(completed) / f64::from(total) * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

struct Sample {
    bytes: u64,
    timestamp: Instant,
}

struct MeterInner {
    completed_parts: u32,
    uploaded_bytes: u64,
    samples: Vec<Sample>,
}

/// Counts completed parts and uploaded bytes for one upload (thread-safe).
///
/// Throughput is averaged over a sliding window of part completions.
pub struct ProgressMeter {
    total_parts: u32,
    total_bytes: u64,
    window: Duration,
    inner: Mutex<MeterInner>,
}

impl ProgressMeter {
    /// Creates a meter for `total_parts` parts covering `total_bytes` bytes.
    pub fn new(total_parts: u32, total_bytes: u64) -> Self {
        Self::with_window(total_parts, total_bytes, DEFAULT_WINDOW)
    }

    /// Same as [`new`](Self::new) with a custom throughput window.
    pub fn with_window(total_parts: u32, total_bytes: u64, window: Duration) -> Self {
        Self {
            total_parts,
            total_bytes,
            window,
            inner: Mutex::new(MeterInner {
                completed_parts: 0,
                uploaded_bytes: 0,
                samples: Vec::new(),
            }),
        }
    }

    /// Records one completed part of `bytes` bytes.
    ///
    /// Returns the new completed-part count.
    pub fn record_part(&self, bytes: u64) -> u32 {
        let mut s = self.lock();
        s.completed_parts += 1;
        s.uploaded_bytes += bytes;

        let now = Instant::now();
        s.samples.push(Sample {
            bytes,
            timestamp: now,
        });
        if let Some(cutoff) = now.checked_sub(self.window) {
            s.samples.retain(|sample| sample.timestamp >= cutoff);
        }
        if s.samples.len() > MAX_SAMPLES {
            let excess = s.samples.len() - MAX_SAMPLES;
            s.samples.drain(..excess);
        }

        s.completed_parts
    }

    pub fn total_parts(&self) -> u32 {
        self.total_parts
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn completed_parts(&self) -> u32 {
        self.lock().completed_parts
    }

    pub fn uploaded_bytes(&self) -> u64 {
        self.lock().uploaded_bytes
    }

    /// Part-based progress in whole percent.
    pub fn percent(&self) -> u8 {
        progress_percent(self.completed_parts(), self.total_parts)
    }

    /// Average throughput in bytes/second within the window.
    ///
    /// Returns 0.0 with fewer than 2 samples.
    pub fn bytes_per_second(&self) -> f64 {
        let s = self.lock();
        if s.samples.len() < 2 {
            return 0.0;
        }
        let first = &s.samples[0];
        let last = &s.samples[s.samples.len() - 1];
        let elapsed = last.timestamp.duration_since(first.timestamp);
        if elapsed.is_zero() {
            return 0.0;
        }
        // The first sample marks the window start; its bytes were sent before it.
        let bytes: u64 = s.samples[1..].iter().map(|sample| sample.bytes).sum();
        bytes as f64 / elapsed.as_secs_f64()
    }

    /// Estimated time to upload the remaining bytes, if throughput is known.
    pub fn eta(&self) -> Option<Duration> {
        let speed = self.bytes_per_second();
        if speed <= 0.0 {
            return None;
        }
        let remaining = self.total_bytes.saturating_sub(self.uploaded_bytes());
        Some(Duration::from_secs_f64(remaining as f64 / speed))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MeterInner> {
        // Counters stay consistent even if a holder panicked.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for ProgressMeter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressMeter")
            .field("total_parts", &self.total_parts)
            .field("completed_parts", &self.completed_parts())
            .field("uploaded_bytes", &self.uploaded_bytes())
            .finish()
    }
}
