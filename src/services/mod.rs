pub mod activity_pipeline;
pub mod activity_recorder;
pub mod calorie_estimator;
pub mod confidence;
pub mod duration_aggregator;
pub mod inference;
pub mod sampling_gate;
pub mod sensor_buffer;
pub mod sensor_feed;
pub mod window_assembler;

pub use activity_pipeline::{ActivityPipeline, PassReport, PipelineConfig};
pub use inference::{Classifier, HeuristicClassifier, InferenceError, InferenceOutcome, ModelOutput};
