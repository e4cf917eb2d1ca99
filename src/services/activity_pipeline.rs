//! Sensor-to-activity pipeline.
//!
//! Owns every piece of mutable state the flow needs: the three sensor
//! windows, the sampling gate, the confidence history and the recorder
//! state. Producers call [`ActivityPipeline::push`] from any thread; when the
//! gate opens, the window is snapshotted and classified on a worker so the
//! producer never waits on the model.
//!
//! ```text
//! push ─► SensorBuffers ─► SamplingGate ─► assemble ─► InferenceInvoker
//!                                                          │
//!            current label (watch) ◄── ConfidenceDebouncer ◄┘
//!                                            │
//!                                     ActivityRecorder ─► ActivityStore
//! ```
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::database::ActivityStore;
use crate::models::{ActivityLabel, PipelineSettings, SensorKind, SensorSample};
use crate::services::activity_recorder::{ActivityRecorder, RecordDecision};
use crate::services::confidence::ConfidenceDebouncer;
use crate::services::inference::{Classifier, InferenceInvoker, InferenceOutcome};
use crate::services::sampling_gate::{PassGuard, SamplingGate};
use crate::services::sensor_buffer::SensorBuffers;
use crate::services::window_assembler::{self, FeatureWindow};
use crate::utils::Clock;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub window_size: usize,
    pub sample_interval_ms: i64,
    pub confidence_threshold: usize,
    pub record_cooldown_ms: i64,
    pub inference_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&PipelineSettings::default())
    }
}

impl From<&PipelineSettings> for PipelineConfig {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            window_size: settings.window_size,
            sample_interval_ms: settings.sample_interval_ms,
            confidence_threshold: settings.confidence_threshold,
            record_cooldown_ms: settings.record_cooldown_ms,
            inference_timeout: Duration::from_millis(settings.inference_timeout_ms),
        }
    }
}

/// What one completed pass produced.
#[derive(Debug)]
pub struct PassReport {
    pub outcome: InferenceOutcome,
    pub confident: Option<ActivityLabel>,
    pub decision: Option<RecordDecision>,
}

struct Ingest {
    buffers: SensorBuffers,
    gate: SamplingGate,
}

struct Stage {
    debouncer: ConfidenceDebouncer,
    recorder: ActivityRecorder,
}

struct Inner {
    ingest: Mutex<Ingest>,
    stage: Mutex<Stage>,
    invoker: InferenceInvoker,
    store: Arc<dyn ActivityStore>,
    clock: Arc<dyn Clock>,
    current: watch::Sender<Option<ActivityLabel>>,
}

#[derive(Clone)]
pub struct ActivityPipeline {
    inner: Arc<Inner>,
    runtime: Option<Handle>,
}

// A poisoned lock must not stop ingestion.
fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ActivityPipeline {
    /// Builds the pipeline and seeds the recorder from the store's newest
    /// record. Passes run on the ambient tokio runtime when there is one,
    /// otherwise on a dedicated thread per pass.
    pub fn new(
        config: PipelineConfig,
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn ActivityStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut recorder = ActivityRecorder::new(config.record_cooldown_ms);
        match store.most_recent() {
            Ok(last) => recorder.restore(last.as_ref(), clock.local_now(), clock.now_ms()),
            Err(e) => log::warn!("Could not read last record, starting fresh: {}", e),
        }

        let (current, _) = watch::channel(None);
        let inner = Inner {
            ingest: Mutex::new(Ingest {
                buffers: SensorBuffers::new(config.window_size),
                gate: SamplingGate::new(config.sample_interval_ms),
            }),
            stage: Mutex::new(Stage {
                debouncer: ConfidenceDebouncer::new(config.confidence_threshold),
                recorder,
            }),
            invoker: InferenceInvoker::new(classifier, config.inference_timeout),
            store,
            clock,
            current,
        };

        Self {
            inner: Arc::new(inner),
            runtime: Handle::try_current().ok(),
        }
    }

    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Receives every confident label, including ones the recorder skips.
    pub fn subscribe(&self) -> watch::Receiver<Option<ActivityLabel>> {
        self.inner.current.subscribe()
    }

    pub fn current_label(&self) -> Option<ActivityLabel> {
        *self.inner.current.borrow()
    }

    pub fn is_idle(&self) -> bool {
        !relock(&self.inner.ingest).gate.is_in_flight()
    }

    /// Buffers one reading. Returns `true` when it started an inference pass.
    /// Never blocks on the model; an arrival during a pass is simply dropped
    /// as a trigger.
    pub fn push(&self, kind: SensorKind, sample: SensorSample) -> bool {
        let Some((guard, window)) = self.inner.admit(kind, sample) else {
            return false;
        };

        match &self.runtime {
            Some(handle) => {
                let inner = Arc::clone(&self.inner);
                handle.spawn(async move {
                    let _guard = guard;
                    let outcome = inner.invoker.invoke(window).await;
                    inner.complete(outcome);
                });
            }
            None => {
                let inner = Arc::clone(&self.inner);
                let spawned = std::thread::Builder::new()
                    .name("inference".into())
                    .spawn(move || {
                        let _guard = guard;
                        let outcome = inner.invoker.invoke_blocking(&window);
                        inner.complete(outcome);
                    });
                if let Err(e) = spawned {
                    log::error!("Failed to spawn inference thread: {}", e);
                    return false;
                }
            }
        }
        true
    }

    /// Buffers one reading and, if the gate opens, runs the pass on the
    /// calling thread. For offline replays and deterministic tests.
    pub fn push_and_run(&self, kind: SensorKind, sample: SensorSample) -> Option<PassReport> {
        let (_guard, window) = self.inner.admit(kind, sample)?;
        let outcome = self.inner.invoker.invoke_blocking(&window);
        Some(self.inner.complete(outcome))
    }

    /// Waits until no pass is in flight.
    pub async fn drain(&self) {
        while !self.is_idle() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Inner {
    fn admit(&self, kind: SensorKind, sample: SensorSample) -> Option<(PassGuard, FeatureWindow)> {
        let mut ingest = relock(&self.ingest);
        ingest.buffers.push(kind, sample);

        let full = ingest.buffers.all_full();
        let now_ms = self.clock.now_ms();
        let guard = ingest.gate.try_begin(full, now_ms)?;
        let window = window_assembler::assemble(&ingest.buffers);
        log::debug!("Starting inference pass at {}ms on {:?} window", now_ms, window.shape());
        Some((guard, window))
    }

    fn complete(&self, outcome: InferenceOutcome) -> PassReport {
        let raw = outcome.label();
        let mut stage = relock(&self.stage);

        let confident = stage.debouncer.observe(raw);
        let decision = match confident {
            Some(label) => {
                self.current.send_replace(Some(label));
                let now_ms = self.clock.now_ms();
                let local_now = self.clock.local_now();
                Some(stage.recorder.on_confident(label, now_ms, local_now, self.store.as_ref()))
            }
            None => {
                log::debug!("Processed window but not confident yet. Current: {}", raw);
                None
            }
        };

        PassReport {
            outcome,
            confident,
            decision,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryActivityStore;
    use crate::services::inference::{InferenceError, ModelOutput};
    use crate::utils::ManualClock;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a scripted sequence of class indices, one per call.
    struct Scripted {
        script: Vec<Result<i64, InferenceError>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(script: Vec<Result<i64, InferenceError>>) -> Self {
            Self {
                script,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Classifier for Scripted {
        fn classify(&self, _window: &FeatureWindow) -> Result<ModelOutput, InferenceError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self.script[n.min(self.script.len() - 1)].clone();
            step.map(ModelOutput::ClassIndex)
        }
    }

    struct Slow(Duration);

    impl Classifier for Slow {
        fn classify(&self, _window: &FeatureWindow) -> Result<ModelOutput, InferenceError> {
            std::thread::sleep(self.0);
            Ok(ModelOutput::ClassIndex(4))
        }
    }

    fn clock() -> Arc<ManualClock> {
        let origin = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap().and_hms_opt(10, 0, 0).unwrap();
        Arc::new(ManualClock::new(origin))
    }

    fn config(window_size: usize) -> PipelineConfig {
        PipelineConfig {
            window_size,
            ..PipelineConfig::default()
        }
    }

    fn push_round(pipeline: &ActivityPipeline) -> Option<PassReport> {
        let sample = SensorSample::new(0.1, 0.2, 9.8);
        let accel = pipeline.push_and_run(SensorKind::Accelerometer, sample);
        let mag = pipeline.push_and_run(SensorKind::Magnetometer, sample);
        let gyro = pipeline.push_and_run(SensorKind::Gyroscope, sample);
        accel.or(mag).or(gyro)
    }

    #[test]
    fn no_pass_until_every_buffer_is_full() {
        let store = Arc::new(MemoryActivityStore::new());
        let clock = clock();
        let pipeline = ActivityPipeline::new(
            config(4),
            Arc::new(Scripted::new(vec![Ok(4)])),
            store,
            clock.clone(),
        );

        for _ in 0..10 {
            clock.advance_ms(1_000);
            assert!(pipeline.push_and_run(SensorKind::Accelerometer, SensorSample::default()).is_none());
            assert!(pipeline.push_and_run(SensorKind::Gyroscope, SensorSample::default()).is_none());
        }
        for _ in 0..3 {
            assert!(pipeline.push_and_run(SensorKind::Magnetometer, SensorSample::default()).is_none());
        }
        assert!(pipeline.push_and_run(SensorKind::Magnetometer, SensorSample::default()).is_some());
    }

    #[test]
    fn confident_label_is_published_and_recorded() {
        let store = Arc::new(MemoryActivityStore::new());
        let clock = clock();
        let pipeline = ActivityPipeline::new(
            config(2),
            Arc::new(Scripted::new(vec![Ok(4), Ok(4), Ok(4), Ok(1)])),
            store.clone(),
            clock.clone(),
        );
        let receiver = pipeline.subscribe();

        let mut confident = Vec::new();
        for _ in 0..12 {
            clock.advance_ms(500);
            if let Some(report) = push_round(&pipeline) {
                confident.push(report.confident);
            }
        }

        assert_eq!(confident[..3], [None, None, Some(ActivityLabel::Walking)]);
        assert_eq!(*receiver.borrow(), Some(ActivityLabel::Running));
        let labels: Vec<_> = store.all().iter().map(|r| r.label).collect();
        assert_eq!(labels, vec![ActivityLabel::Walking, ActivityLabel::Running]);
    }

    #[test]
    fn inference_failures_debounce_as_unknown() {
        let store = Arc::new(MemoryActivityStore::new());
        let clock = clock();
        let down = || Err(InferenceError::Unavailable("no engine".to_string()));
        let pipeline = ActivityPipeline::new(
            config(1),
            Arc::new(Scripted::new(vec![down(), down(), down()])),
            store.clone(),
            clock.clone(),
        );

        let mut last = None;
        for _ in 0..3 {
            clock.advance_ms(600);
            last = push_round(&pipeline);
        }
        let report = last.unwrap();
        assert!(report.outcome.is_failure());
        assert_eq!(report.confident, Some(ActivityLabel::Unknown));
        assert_eq!(pipeline.current_label(), Some(ActivityLabel::Unknown));
    }

    #[test]
    fn throttle_limits_pass_rate() {
        let store = Arc::new(MemoryActivityStore::new());
        let clock = clock();
        let pipeline = ActivityPipeline::new(
            config(1),
            Arc::new(Scripted::new(vec![Ok(2)])),
            store,
            clock.clone(),
        );

        // 100 rounds 20ms apart span 2s: passes at 0, 500, 1000, 1500.
        let mut passes = 0;
        for _ in 0..100 {
            if push_round(&pipeline).is_some() {
                passes += 1;
            }
            clock.advance_ms(20);
        }
        assert_eq!(passes, 4);
    }

    #[test]
    fn restart_does_not_duplicate_todays_last_record() {
        let store = Arc::new(MemoryActivityStore::new());
        let clock = clock();
        clock.set_ms(5_000);
        store
            .append(&crate::models::ActivityRecord::new(clock.local_now(), ActivityLabel::Standing))
            .unwrap();
        clock.set_ms(10_000);

        let pipeline = ActivityPipeline::new(
            config(1),
            Arc::new(Scripted::new(vec![Ok(2)])),
            store.clone(),
            clock.clone(),
        );
        for _ in 0..3 {
            clock.advance_ms(500);
            push_round(&pipeline);
        }
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn push_does_not_wait_for_the_model() {
        let store = Arc::new(MemoryActivityStore::new());
        let clock = clock();
        let pipeline = ActivityPipeline::new(
            config(1),
            Arc::new(Slow(Duration::from_millis(300))),
            store,
            clock.clone(),
        );

        let sample = SensorSample::default();
        pipeline.push(SensorKind::Accelerometer, sample);
        pipeline.push(SensorKind::Magnetometer, sample);
        let started = std::time::Instant::now();
        assert!(pipeline.push(SensorKind::Gyroscope, sample));
        assert!(started.elapsed() < Duration::from_millis(100));
        assert!(!pipeline.is_idle());

        // In flight: a later eligible arrival is dropped, not queued.
        clock.advance_ms(1_000);
        assert!(!pipeline.push(SensorKind::Gyroscope, sample));

        pipeline.drain().await;
        assert!(pipeline.is_idle());
        clock.advance_ms(1_000);
        assert!(pipeline.push(SensorKind::Gyroscope, sample));
        pipeline.drain().await;
    }

    /// Hangs past the budget and tracks how many calls overlap.
    #[derive(Default)]
    struct Overlap {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Classifier for Overlap {
        fn classify(&self, _window: &FeatureWindow) -> Result<ModelOutput, InferenceError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(300));
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(ModelOutput::ClassIndex(4))
        }
    }

    #[tokio::test]
    async fn hung_engine_is_never_called_twice_at_once() {
        let store = Arc::new(MemoryActivityStore::new());
        let clock = clock();
        let engine = Arc::new(Overlap::default());
        let mut cfg = config(1);
        cfg.inference_timeout = Duration::from_millis(50);
        let pipeline = ActivityPipeline::new(cfg, engine.clone(), store, clock.clone());

        let sample = SensorSample::default();
        pipeline.push(SensorKind::Accelerometer, sample);
        pipeline.push(SensorKind::Magnetometer, sample);
        for _ in 0..5 {
            assert!(pipeline.push(SensorKind::Gyroscope, sample));
            pipeline.drain().await;
            clock.advance_ms(600);
        }

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(engine.peak.load(Ordering::SeqCst), 1);
        assert_eq!(engine.running.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn producer_thread_outside_the_runtime() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let store = Arc::new(MemoryActivityStore::new());
        let clock = clock();
        let pipeline = ActivityPipeline::new(
            config(1),
            Arc::new(Scripted::new(vec![Ok(0)])),
            store,
            clock.clone(),
        )
        .with_runtime(runtime.handle().clone());

        let producer = pipeline.clone();
        let started = std::thread::spawn(move || {
            let sample = SensorSample::default();
            producer.push(SensorKind::Accelerometer, sample);
            producer.push(SensorKind::Magnetometer, sample);
            producer.push(SensorKind::Gyroscope, sample)
        })
        .join()
        .unwrap();

        assert!(started);
        runtime.block_on(pipeline.drain());
        assert!(pipeline.is_idle());
    }

    #[tokio::test]
    async fn hung_model_releases_the_gate_after_budget() {
        let store = Arc::new(MemoryActivityStore::new());
        let clock = clock();
        let mut cfg = config(1);
        cfg.inference_timeout = Duration::from_millis(50);
        let pipeline = ActivityPipeline::new(cfg, Arc::new(Slow(Duration::from_millis(400))), store, clock.clone());

        let sample = SensorSample::default();
        pipeline.push(SensorKind::Accelerometer, sample);
        pipeline.push(SensorKind::Magnetometer, sample);
        assert!(pipeline.push(SensorKind::Gyroscope, sample));

        tokio::time::timeout(Duration::from_millis(250), pipeline.drain())
            .await
            .expect("gate should clear once the budget elapses");
    }
}
