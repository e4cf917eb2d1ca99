pub mod activity;
pub mod sensor;
pub mod settings;
pub mod storage;

pub use activity::*;
pub use sensor::*;
pub use settings::*;
pub use storage::*;
