use std::collections::VecDeque;

use crate::models::{SensorKind, SensorSample};

/// Sliding window of the most recent readings from one sensor.
#[derive(Debug, Clone)]
pub struct SensorBuffer {
    samples: VecDeque<SensorSample>,
    capacity: usize,
}

impl SensorBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends, evicting the oldest reading once at capacity.
    pub fn push(&mut self, sample: SensorSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &SensorSample> {
        self.samples.iter()
    }
}

/// The three per-sensor windows. They are filled independently and are
/// only aligned by "last N arrivals", not by timestamp.
#[derive(Debug, Clone)]
pub struct SensorBuffers {
    pub accelerometer: SensorBuffer,
    pub gyroscope: SensorBuffer,
    pub magnetometer: SensorBuffer,
}

impl SensorBuffers {
    pub fn new(window_size: usize) -> Self {
        Self {
            accelerometer: SensorBuffer::new(window_size),
            gyroscope: SensorBuffer::new(window_size),
            magnetometer: SensorBuffer::new(window_size),
        }
    }

    pub fn push(&mut self, kind: SensorKind, sample: SensorSample) {
        self.buffer_mut(kind).push(sample);
    }

    pub fn buffer(&self, kind: SensorKind) -> &SensorBuffer {
        match kind {
            SensorKind::Accelerometer => &self.accelerometer,
            SensorKind::Gyroscope => &self.gyroscope,
            SensorKind::Magnetometer => &self.magnetometer,
        }
    }

    fn buffer_mut(&mut self, kind: SensorKind) -> &mut SensorBuffer {
        match kind {
            SensorKind::Accelerometer => &mut self.accelerometer,
            SensorKind::Gyroscope => &mut self.gyroscope,
            SensorKind::Magnetometer => &mut self.magnetometer,
        }
    }

    pub fn all_full(&self) -> bool {
        self.accelerometer.is_full() && self.gyroscope.is_full() && self.magnetometer.is_full()
    }
}
