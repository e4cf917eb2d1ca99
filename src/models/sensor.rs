use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Accelerometer,
    Gyroscope,
    Magnetometer,
}

/// One 3-axis reading.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl SensorSample {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Line format of the sensor feed: `{"sensor":"gyroscope","x":0.1,"y":0.0,"z":-0.2}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SensorEvent {
    pub sensor: SensorKind,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl SensorEvent {
    pub fn sample(&self) -> SensorSample {
        SensorSample::new(self.x, self.y, self.z)
    }
}
