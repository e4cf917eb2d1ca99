// Inference boundary
//
// The trained sequence model is an external collaborator. The pipeline hands
// it a `[1, window, 9]` tensor and gets back either a class index or one score
// per class. Everything that can go wrong on the far side (no engine, bad
// output, a panic, a hung call) comes back as `InferenceOutcome::Failed`, which
// downstream treats as `unknown` for that pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::models::{ActivityLabel, SensorSample};
use crate::services::window_assembler::FeatureWindow;

/// Number of classes the model was trained on, in output order.
pub const CLASS_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    /// Integer class head (argmax done inside the model).
    ClassIndex(i64),
    /// Per-class probabilities or logits.
    Scores(Vec<f32>),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("inference engine unavailable: {0}")]
    Unavailable(String),
    #[error("malformed model output: {0}")]
    MalformedOutput(String),
    #[error("inference exceeded its {0} ms budget")]
    Timeout(u64),
    #[error("inference task aborted: {0}")]
    Aborted(String),
}

/// A loaded classifier. Any per-call resources (session, input and output
/// tensors) must be created and dropped inside `classify`.
pub trait Classifier: Send + Sync + 'static {
    fn classify(&self, window: &FeatureWindow) -> Result<ModelOutput, InferenceError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum InferenceOutcome {
    Label(ActivityLabel),
    Failed(InferenceError),
}

impl InferenceOutcome {
    /// Label the debouncer should see. Failures count as `unknown`.
    pub fn label(&self) -> ActivityLabel {
        match self {
            Self::Label(label) => *label,
            Self::Failed(_) => ActivityLabel::Unknown,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Maps raw model output to a label. Out-of-range indices map to `Unknown`.
pub fn label_for(output: ModelOutput) -> Result<ActivityLabel, InferenceError> {
    match output {
        ModelOutput::ClassIndex(index) => Ok(ActivityLabel::from_class_index(index)),
        ModelOutput::Scores(scores) => {
            if scores.len() != CLASS_COUNT {
                log::warn!("Model returned {} scores, expected {}", scores.len(), CLASS_COUNT);
            }
            let best = scores
                .iter()
                .enumerate()
                .filter(|(_, v)| !v.is_nan())
                .max_by(|(_, a), (_, b)| a.total_cmp(b))
                .map(|(idx, _)| idx);

            match best {
                Some(idx) => Ok(ActivityLabel::from_class_index(idx as i64)),
                None => Err(InferenceError::MalformedOutput(format!(
                    "no usable score among {} values",
                    scores.len()
                ))),
            }
        }
    }
}

/// Held for as long as a `classify` call is actually running, which can
/// outlive the pass that started it.
struct EngineSlot(Arc<AtomicBool>);

impl Drop for EngineSlot {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct InferenceInvoker {
    classifier: Arc<dyn Classifier>,
    budget: Duration,
    engine_busy: Arc<AtomicBool>,
}

impl InferenceInvoker {
    pub fn new(classifier: Arc<dyn Classifier>, budget: Duration) -> Self {
        Self {
            classifier,
            budget,
            engine_busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True while a classifier call is running, including one abandoned
    /// after its budget elapsed.
    pub fn is_engine_busy(&self) -> bool {
        self.engine_busy.load(Ordering::Acquire)
    }

    fn claim_engine(&self) -> Option<EngineSlot> {
        self.engine_busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| EngineSlot(Arc::clone(&self.engine_busy)))
    }

    fn engine_still_busy() -> InferenceOutcome {
        log::warn!("Inference skipped, engine busy with an earlier window");
        InferenceOutcome::Failed(InferenceError::Unavailable(
            "previous classifier call still running".to_string(),
        ))
    }

    /// Runs the classifier on a blocking worker under the time budget.
    ///
    /// On timeout the worker is abandoned rather than awaited, so a hung
    /// engine cannot hold the caller's in-flight slot forever. The engine
    /// slot stays claimed until that worker returns; passes in the meantime
    /// fail fast instead of starting a second call.
    pub async fn invoke(&self, window: FeatureWindow) -> InferenceOutcome {
        let Some(slot) = self.claim_engine() else {
            return Self::engine_still_busy();
        };
        let classifier = Arc::clone(&self.classifier);
        let task = tokio::task::spawn_blocking(move || {
            let _slot = slot;
            classifier.classify(&window)
        });

        let outcome = match tokio::time::timeout(self.budget, task).await {
            Err(_) => InferenceOutcome::Failed(InferenceError::Timeout(self.budget.as_millis() as u64)),
            Ok(Err(join_err)) => InferenceOutcome::Failed(InferenceError::Aborted(join_err.to_string())),
            Ok(Ok(result)) => Self::settle(result),
        };

        if let InferenceOutcome::Failed(ref e) = outcome {
            log::warn!("Inference failed, treating pass as unknown: {}", e);
        }
        outcome
    }

    /// Same contract without a runtime or time budget. Panics are caught.
    pub fn invoke_blocking(&self, window: &FeatureWindow) -> InferenceOutcome {
        let Some(_slot) = self.claim_engine() else {
            return Self::engine_still_busy();
        };
        let classifier = Arc::clone(&self.classifier);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| classifier.classify(window)));

        let outcome = match result {
            Ok(result) => Self::settle(result),
            Err(_) => InferenceOutcome::Failed(InferenceError::Aborted("classifier panicked".to_string())),
        };

        if let InferenceOutcome::Failed(ref e) = outcome {
            log::warn!("Inference failed, treating pass as unknown: {}", e);
        }
        outcome
    }

    fn settle(result: Result<ModelOutput, InferenceError>) -> InferenceOutcome {
        match result.and_then(label_for) {
            Ok(label) => InferenceOutcome::Label(label),
            Err(e) => InferenceOutcome::Failed(e),
        }
    }
}

/// Stand-in backend used when no trained model is attached. It bands the
/// spread of accelerometer magnitude over the window into
/// standing / walking / running so the rest of the pipeline runs end to end.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicClassifier;

impl Classifier for HeuristicClassifier {
    fn classify(&self, window: &FeatureWindow) -> Result<ModelOutput, InferenceError> {
        if window.is_empty() {
            return Err(InferenceError::MalformedOutput("empty window".to_string()));
        }

        let magnitudes: Vec<f32> = window
            .rows()
            .iter()
            .map(|r| SensorSample::new(r[0], r[1], r[2]).magnitude())
            .collect();
        let n = magnitudes.len() as f32;
        let mean = magnitudes.iter().sum::<f32>() / n;
        let spread = (magnitudes.iter().map(|m| (m - mean).powi(2)).sum::<f32>() / n).sqrt();

        // [downstairs, running, standing, upstairs, walking]
        let scores = if spread < 0.5 {
            vec![0.02, 0.02, 0.90, 0.02, 0.04]
        } else if spread < 3.0 {
            vec![0.05, 0.05, 0.03, 0.05, 0.82]
        } else {
            vec![0.03, 0.88, 0.02, 0.03, 0.04]
        };

        log::debug!("Heuristic inference: |a| mean {:.2}, spread {:.2}", mean, spread);
        Ok(ModelOutput::Scores(scores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SensorKind, SensorSample};
    use crate::services::sensor_buffer::SensorBuffers;
    use crate::services::window_assembler::assemble;

    struct Fixed(Result<ModelOutput, InferenceError>);

    impl Classifier for Fixed {
        fn classify(&self, _window: &FeatureWindow) -> Result<ModelOutput, InferenceError> {
            self.0.clone()
        }
    }

    struct Panics;

    impl Classifier for Panics {
        fn classify(&self, _window: &FeatureWindow) -> Result<ModelOutput, InferenceError> {
            panic!("engine crashed")
        }
    }

    struct Sleeps(Duration);

    impl Classifier for Sleeps {
        fn classify(&self, _window: &FeatureWindow) -> Result<ModelOutput, InferenceError> {
            std::thread::sleep(self.0);
            Ok(ModelOutput::ClassIndex(4))
        }
    }

    fn window_with(acc: impl Fn(usize) -> f32) -> FeatureWindow {
        let mut buffers = SensorBuffers::new(50);
        for i in 0..50 {
            buffers.push(SensorKind::Accelerometer, SensorSample::new(0.0, 0.0, acc(i)));
            buffers.push(SensorKind::Magnetometer, SensorSample::default());
            buffers.push(SensorKind::Gyroscope, SensorSample::default());
        }
        assemble(&buffers)
    }

    fn invoker(classifier: impl Classifier) -> InferenceInvoker {
        InferenceInvoker::new(Arc::new(classifier), Duration::from_millis(200))
    }

    #[test]
    fn scores_take_argmax() {
        let label = label_for(ModelOutput::Scores(vec![0.1, 0.7, 0.1, 0.05, 0.05])).unwrap();
        assert_eq!(label, ActivityLabel::Running);
    }

    #[test]
    fn extra_score_slots_map_to_unknown() {
        let label = label_for(ModelOutput::Scores(vec![0.0, 0.0, 0.0, 0.0, 0.1, 0.9])).unwrap();
        assert_eq!(label, ActivityLabel::Unknown);
    }

    #[test]
    fn empty_or_nan_scores_are_malformed() {
        assert!(label_for(ModelOutput::Scores(vec![])).is_err());
        assert!(label_for(ModelOutput::Scores(vec![f32::NAN, f32::NAN])).is_err());
    }

    #[test]
    fn blocking_path_maps_index() {
        let outcome = invoker(Fixed(Ok(ModelOutput::ClassIndex(2)))).invoke_blocking(&window_with(|_| 9.8));
        assert_eq!(outcome, InferenceOutcome::Label(ActivityLabel::Standing));
    }

    #[test]
    fn blocking_path_absorbs_panics() {
        let outcome = invoker(Panics).invoke_blocking(&window_with(|_| 9.8));
        assert!(outcome.is_failure());
        assert_eq!(outcome.label(), ActivityLabel::Unknown);
    }

    #[tokio::test]
    async fn engine_error_becomes_unknown() {
        let failing = Fixed(Err(InferenceError::Unavailable("model.onnx missing".to_string())));
        let outcome = invoker(failing).invoke(window_with(|_| 9.8)).await;
        assert_eq!(outcome.label(), ActivityLabel::Unknown);
        assert!(outcome.is_failure());
    }

    #[tokio::test]
    async fn panic_in_worker_becomes_unknown() {
        let outcome = invoker(Panics).invoke(window_with(|_| 9.8)).await;
        assert!(matches!(outcome, InferenceOutcome::Failed(InferenceError::Aborted(_))));
    }

    #[tokio::test]
    async fn slow_engine_hits_budget() {
        let outcome = invoker(Sleeps(Duration::from_millis(1_000))).invoke(window_with(|_| 9.8)).await;
        assert_eq!(outcome, InferenceOutcome::Failed(InferenceError::Timeout(200)));
    }

    /// Sleeps past any budget and tracks how many calls overlap.
    #[derive(Default)]
    struct Hangs {
        running: std::sync::atomic::AtomicUsize,
        peak: std::sync::atomic::AtomicUsize,
        calls: std::sync::atomic::AtomicUsize,
    }

    impl Classifier for Hangs {
        fn classify(&self, _window: &FeatureWindow) -> Result<ModelOutput, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(300));
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(ModelOutput::ClassIndex(4))
        }
    }

    #[tokio::test]
    async fn timed_out_call_blocks_a_second_call_until_it_returns() {
        let engine = Arc::new(Hangs::default());
        let invoker = InferenceInvoker::new(engine.clone(), Duration::from_millis(50));

        let first = invoker.invoke(window_with(|_| 9.8)).await;
        assert_eq!(first, InferenceOutcome::Failed(InferenceError::Timeout(50)));
        assert!(invoker.is_engine_busy());

        for _ in 0..4 {
            let again = invoker.invoke(window_with(|_| 9.8)).await;
            assert!(matches!(again, InferenceOutcome::Failed(InferenceError::Unavailable(_))));
            assert!(invoker.invoke_blocking(&window_with(|_| 9.8)).is_failure());
        }

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!invoker.is_engine_busy());
        let later = invoker.invoke(window_with(|_| 9.8)).await;
        assert!(matches!(later, InferenceOutcome::Failed(InferenceError::Timeout(_))));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
        assert_eq!(engine.peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn heuristic_bands_motion() {
        let still = invoker(HeuristicClassifier).invoke_blocking(&window_with(|_| 9.81));
        assert_eq!(still.label(), ActivityLabel::Standing);

        let walk = invoker(HeuristicClassifier)
            .invoke_blocking(&window_with(|i| if i % 2 == 0 { 8.3 } else { 11.3 }));
        assert_eq!(walk.label(), ActivityLabel::Walking);

        let run = invoker(HeuristicClassifier)
            .invoke_blocking(&window_with(|i| if i % 2 == 0 { 4.0 } else { 16.0 }));
        assert_eq!(run.label(), ActivityLabel::Running);
    }
}
