use crate::models::SensorSample;
use crate::services::sensor_buffer::SensorBuffers;

pub const FEATURE_CHANNELS: usize = 9;

/// Model input of shape `[window_size, 9]`. Each row is
/// `[acc_x, acc_y, acc_z, mag_x, mag_y, mag_z, gyro_x, gyro_y, gyro_z]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureWindow {
    rows: Vec<[f32; FEATURE_CHANNELS]>,
}

impl FeatureWindow {
    pub fn rows(&self) -> &[[f32; FEATURE_CHANNELS]] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn shape(&self) -> [usize; 3] {
        [1, self.rows.len(), FEATURE_CHANNELS]
    }
}

/// Builds the window from the newest `window_size` samples of each sensor.
/// Row `i` pairs the i-th entries of each buffer, oldest first.
pub fn assemble(buffers: &SensorBuffers) -> FeatureWindow {
    let rows = buffers
        .accelerometer
        .iter()
        .zip(buffers.magnetometer.iter())
        .zip(buffers.gyroscope.iter())
        .map(|((acc, mag), gyro)| row(acc, mag, gyro))
        .collect();

    FeatureWindow { rows }
}

fn row(acc: &SensorSample, mag: &SensorSample, gyro: &SensorSample) -> [f32; FEATURE_CHANNELS] {
    [acc.x, acc.y, acc.z, mag.x, mag.y, mag.z, gyro.x, gyro.y, gyro.z]
}
