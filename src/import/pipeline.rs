//! Import Pipeline
//!
//! Ties chunking, bounded submission and response folding together.
//!
//! [`ImportPipeline`] runs one import and returns its aggregate.
//! [`ImportController`] owns a pipeline for a consuming view: it starts a
//! run whenever the `(data, data element)` inputs change, publishes
//! progress and outcome through a watch channel, and discards results of
//! runs that have been superseded.

use super::aggregate::AggregateResult;
use super::chunk::{chunk_records, count_numeric};
use super::error::{ImportError, ImportFailure, IMPORT_FAILED_MESSAGE};
use super::record::{DataElement, DataValueSet, Record};
use super::response::BatchResponse;
use super::submit::{map_limit, Progress};
use super::{IMPORT_LIMIT, IMPORT_REQUEST_LIMIT};
use crate::alerts::{Alert, AlertSink};
use crate::dhis2::Dhis2Error;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Mutex};

/// Sends one chunk to the remote system
#[async_trait]
pub trait BatchSubmitter: Send + Sync {
    async fn submit(&self, chunk: &DataValueSet) -> Result<BatchResponse, Dhis2Error>;
}

/// Chunking and concurrency settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    /// Maximum data values per request
    pub chunk_size: usize,
    /// Maximum requests in flight
    pub request_limit: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            chunk_size: IMPORT_LIMIT,
            request_limit: IMPORT_REQUEST_LIMIT,
        }
    }
}

/// Runs import jobs against a [`BatchSubmitter`]
pub struct ImportPipeline {
    submitter: Arc<dyn BatchSubmitter>,
    options: ImportOptions,
}

impl ImportPipeline {
    pub fn new(submitter: Arc<dyn BatchSubmitter>, options: ImportOptions) -> Self {
        Self { submitter, options }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Chunks that a run over these records would submit
    pub fn plan(&self, records: &[Record], data_element: &DataElement) -> Vec<DataValueSet> {
        chunk_records(records, &data_element.id, self.options.chunk_size)
    }

    /// Number of chunks a run over these records would submit
    pub fn chunk_count(&self, records: &[Record]) -> usize {
        count_numeric(records).div_ceil(self.options.chunk_size.max(1))
    }

    /// Import all numeric records as values of `data_element`
    ///
    /// `on_progress` sees every chunk completion. The first failed chunk
    /// fails the run and nothing is aggregated.
    pub async fn run<P>(
        &self,
        records: &[Record],
        data_element: &DataElement,
        on_progress: P,
    ) -> Result<AggregateResult, ImportError>
    where
        P: FnMut(Progress),
    {
        let start = Instant::now();
        let chunks = self.plan(records, data_element);
        let total = chunks.len();

        tracing::info!(
            data_element = %data_element.id,
            records = records.len(),
            chunks = total,
            request_limit = self.options.request_limit,
            "Starting import"
        );

        let submitter = self.submitter.as_ref();
        let responses = map_limit(
            chunks.into_iter().enumerate().collect(),
            self.options.request_limit,
            |(index, chunk): (usize, DataValueSet)| async move {
                tracing::debug!(chunk = index, values = chunk.len(), "Submitting chunk");
                submitter
                    .submit(&chunk)
                    .await
                    .map_err(|source| ImportError::Submission {
                        chunk: index,
                        total,
                        source,
                    })
            },
            on_progress,
        )
        .await?;

        let result = AggregateResult::from_responses(&responses);

        tracing::info!(
            imported = result.import_count.imported,
            updated = result.import_count.updated,
            ignored = result.import_count.ignored,
            conflicts = result.conflicts.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Import completed"
        );

        Ok(result)
    }
}

/// Observable state of the controller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ImportState {
    Idle,
    Importing {
        progress: u8,
        completed: usize,
        total: usize,
    },
    Completed(AggregateResult),
    Failed(ImportFailure),
}

impl ImportState {
    fn importing(progress: Progress) -> Self {
        ImportState::Importing {
            progress: progress.percent(),
            completed: progress.completed,
            total: progress.total,
        }
    }

    pub fn is_importing(&self) -> bool {
        matches!(self, ImportState::Importing { .. })
    }
}

/// State tagged with the run that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSnapshot {
    /// Run counter, 0 before the first trigger
    pub run: u64,
    #[serde(flatten)]
    pub state: ImportState,
}

type Inputs = (Arc<[Record]>, Arc<DataElement>);

/// Drives import runs for one consumer
pub struct ImportController {
    pipeline: ImportPipeline,
    alerts: Arc<dyn AlertSink>,
    state: watch::Sender<ImportSnapshot>,
    inputs: Mutex<Option<Inputs>>,
}

impl ImportController {
    pub fn new(pipeline: ImportPipeline, alerts: Arc<dyn AlertSink>) -> Self {
        let (state, _) = watch::channel(ImportSnapshot {
            run: 0,
            state: ImportState::Idle,
        });

        Self {
            pipeline,
            alerts,
            state,
            inputs: Mutex::new(None),
        }
    }

    pub fn pipeline(&self) -> &ImportPipeline {
        &self.pipeline
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<ImportSnapshot> {
        self.state.subscribe()
    }

    /// Current state
    pub fn snapshot(&self) -> ImportSnapshot {
        self.state.borrow().clone()
    }

    /// Start a run for these inputs and wait for its outcome
    ///
    /// Inputs are compared by reference: if both `Arc`s are the ones of
    /// the previous trigger nothing happens and `None` is returned.
    /// Otherwise prior results are reset, a new run starts and its
    /// outcome is returned once all chunks have resolved.
    pub async fn trigger(
        &self,
        data: Arc<[Record]>,
        data_element: Arc<DataElement>,
    ) -> Option<Result<AggregateResult, ImportError>> {
        let run = self.begin(Arc::clone(&data), Arc::clone(&data_element)).await?;
        Some(self.execute(run, &data, &data_element).await)
    }

    /// Register new inputs and reset state for a new run
    ///
    /// Returns the run id to pass to [`ImportController::execute`], or
    /// `None` when the inputs are unchanged.
    pub async fn begin(&self, data: Arc<[Record]>, data_element: Arc<DataElement>) -> Option<u64> {
        let mut inputs = self.inputs.lock().await;
        if let Some((last_data, last_element)) = inputs.as_ref() {
            if Arc::ptr_eq(last_data, &data) && Arc::ptr_eq(last_element, &data_element) {
                tracing::debug!("Import inputs unchanged, not starting a new run");
                return None;
            }
        }

        let run = self.state.borrow().run + 1;
        let total = self.pipeline.chunk_count(&data);
        *inputs = Some((data, data_element));

        self.state.send_replace(ImportSnapshot {
            run,
            state: ImportState::importing(Progress::new(0, total)),
        });
        Some(run)
    }

    /// Forget inputs and results, as when the consuming view goes away
    pub async fn reset(&self) {
        let mut inputs = self.inputs.lock().await;
        *inputs = None;
        let run = self.state.borrow().run + 1;
        self.state.send_replace(ImportSnapshot {
            run,
            state: ImportState::Idle,
        });
    }

    /// Run the import for a run started with [`ImportController::begin`]
    ///
    /// Progress and outcome are published only while `run` is current.
    pub async fn execute(
        &self,
        run: u64,
        data: &[Record],
        data_element: &DataElement,
    ) -> Result<AggregateResult, ImportError> {
        let outcome = self
            .pipeline
            .run(data, data_element, |progress| {
                self.publish(run, ImportState::importing(progress));
            })
            .await;

        match &outcome {
            Ok(result) => {
                self.publish(run, ImportState::Completed(result.clone()));
            }
            Err(e) => {
                tracing::error!(run, error = %e, "Import failed");
                if self.publish(run, ImportState::Failed(ImportFailure::from(e))) {
                    self.alerts.show(&Alert::critical(IMPORT_FAILED_MESSAGE));
                }
            }
        }

        outcome
    }

    /// Update state if `run` is still the current run
    fn publish(&self, run: u64, state: ImportState) -> bool {
        self.state.send_if_modified(|snapshot| {
            if snapshot.run != run {
                return false;
            }
            snapshot.state = state;
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::MemoryAlertSink;
    use crate::import::response::{BatchSummary, Conflict, ImportCount};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers every chunk with its size as imported count
    struct EchoSubmitter {
        calls: AtomicUsize,
        /// Fail the chunk starting with this org unit
        fail_on: Option<String>,
        delay_ms: u64,
    }

    impl EchoSubmitter {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on: None,
                delay_ms: 1,
            }
        }

        fn failing_on(org_unit: &str) -> Self {
            Self {
                fail_on: Some(org_unit.to_string()),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl BatchSubmitter for EchoSubmitter {
        async fn submit(&self, chunk: &DataValueSet) -> Result<BatchResponse, Dhis2Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;

            let first = chunk.data_values.first().map(|v| v.org_unit.as_str());
            if self.fail_on.is_some() && self.fail_on.as_deref() == first {
                return Err(Dhis2Error::Api {
                    status: 500,
                    message: "Internal error".to_string(),
                    details: Some(serde_json::json!({"httpStatusCode": 500})),
                });
            }

            let conflicts = chunk
                .data_values
                .iter()
                .filter(|v| v.value < 0.0)
                .map(|v| Conflict::new(v.org_unit.clone(), "Negative value"))
                .collect::<Vec<_>>();

            Ok(BatchResponse::Success(BatchSummary {
                import_count: ImportCount::new(
                    (chunk.len() - conflicts.len()) as u64,
                    0,
                    conflicts.len() as u64,
                ),
                conflicts,
            }))
        }
    }

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record::new(i as f64, format!("ou{}", i), "202401"))
            .collect()
    }

    fn pipeline(submitter: Arc<dyn BatchSubmitter>, chunk_size: usize) -> ImportPipeline {
        ImportPipeline::new(
            submitter,
            ImportOptions {
                chunk_size,
                request_limit: 2,
            },
        )
    }

    #[test]
    fn test_default_options() {
        let options = ImportOptions::default();
        assert_eq!(options.chunk_size, 500);
        assert_eq!(options.request_limit, 5);
    }

    #[tokio::test]
    async fn test_run_aggregates_all_chunks() {
        let submitter = Arc::new(EchoSubmitter::new());
        let pipeline = pipeline(submitter.clone(), 10);

        let mut input = records(35);
        input[0].value = "NaN".into();
        input[7].value = (-1.0).into();

        let mut percents = Vec::new();
        let result = pipeline
            .run(&input, &DataElement::new("de1"), |p| percents.push(p.percent()))
            .await
            .unwrap();

        assert_eq!(submitter.calls.load(Ordering::SeqCst), 4);
        assert_eq!(result.import_count, ImportCount::new(33, 0, 1));
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(percents.last(), Some(&100));
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_middle_chunk_failure_discards_everything() {
        let submitter = Arc::new(EchoSubmitter::failing_on("ou10"));
        let pipeline = pipeline(submitter, 10);

        let err = pipeline
            .run(&records(30), &DataElement::new("de1"), |_| {})
            .await
            .unwrap_err();

        match &err {
            ImportError::Submission { chunk, total, .. } => {
                assert_eq!(*chunk, 1);
                assert_eq!(*total, 3);
            }
        }
        assert_eq!(err.details().unwrap()["httpStatusCode"], 500);
    }

    #[tokio::test]
    async fn test_chunk_count() {
        let pipeline = pipeline(Arc::new(EchoSubmitter::new()), 500);
        assert_eq!(pipeline.chunk_count(&records(0)), 0);
        assert_eq!(pipeline.chunk_count(&records(500)), 1);
        assert_eq!(pipeline.chunk_count(&records(501)), 2);
    }

    #[tokio::test]
    async fn test_controller_completes() {
        let alerts = Arc::new(MemoryAlertSink::new());
        let controller = ImportController::new(pipeline(Arc::new(EchoSubmitter::new()), 4), alerts.clone());
        assert_eq!(controller.snapshot().state, ImportState::Idle);

        let data: Arc<[Record]> = records(10).into();
        let element = Arc::new(DataElement::new("de1"));

        let result = controller.trigger(data, element).await.unwrap().unwrap();

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.run, 1);
        assert_eq!(snapshot.state, ImportState::Completed(result.clone()));
        assert_eq!(result.import_count.imported, 10);
        assert!(alerts.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_controller_failure_alerts_and_exposes_details() {
        let alerts = Arc::new(MemoryAlertSink::new());
        let controller =
            ImportController::new(pipeline(Arc::new(EchoSubmitter::failing_on("ou1")), 1), alerts.clone());

        let outcome = controller
            .trigger(records(3).into(), Arc::new(DataElement::new("de1")))
            .await
            .unwrap();
        assert!(outcome.is_err());

        match controller.snapshot().state {
            ImportState::Failed(failure) => {
                assert_eq!(failure.details.unwrap()["httpStatusCode"], 500);
            }
            other => panic!("unexpected {:?}", other),
        }

        let shown = alerts.alerts();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].message, IMPORT_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn test_controller_skips_unchanged_inputs() {
        let submitter = Arc::new(EchoSubmitter::new());
        let controller = ImportController::new(
            pipeline(submitter.clone(), 5),
            Arc::new(MemoryAlertSink::new()),
        );

        let data: Arc<[Record]> = records(5).into();
        let element = Arc::new(DataElement::new("de1"));

        assert!(controller.trigger(data.clone(), element.clone()).await.is_some());
        assert!(controller.trigger(data.clone(), element.clone()).await.is_none());
        assert_eq!(submitter.calls.load(Ordering::SeqCst), 1);

        // equal content, new reference: a new run
        let element2 = Arc::new(DataElement::new("de1"));
        assert!(controller.trigger(data, element2).await.is_some());
        assert_eq!(submitter.calls.load(Ordering::SeqCst), 2);
        assert_eq!(controller.snapshot().run, 2);
    }

    #[tokio::test]
    async fn test_stale_run_does_not_overwrite_newer_state() {
        let slow = Arc::new(EchoSubmitter {
            delay_ms: 50,
            ..EchoSubmitter::new()
        });
        let controller = Arc::new(ImportController::new(
            pipeline(slow, 5),
            Arc::new(MemoryAlertSink::new()),
        ));

        let first = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move {
                controller
                    .trigger(records(5).into(), Arc::new(DataElement::new("de1")))
                    .await
            })
        };

        // let the first run start, then supersede it
        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.reset().await;

        let first_outcome = first.await.unwrap().unwrap();
        assert!(first_outcome.is_ok());

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.run, 2);
        assert_eq!(snapshot.state, ImportState::Idle);
    }

    #[tokio::test]
    async fn test_progress_published_to_subscribers() {
        let controller = ImportController::new(
            pipeline(Arc::new(EchoSubmitter::new()), 1),
            Arc::new(MemoryAlertSink::new()),
        );
        let mut rx = controller.subscribe();

        controller
            .trigger(records(3).into(), Arc::new(DataElement::new("de1")))
            .await
            .unwrap()
            .unwrap();

        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert!(matches!(snapshot.state, ImportState::Completed(_)));
    }

    #[tokio::test]
    async fn test_empty_import_completes_immediately() {
        let submitter = Arc::new(EchoSubmitter::new());
        let controller = ImportController::new(
            pipeline(submitter.clone(), 5),
            Arc::new(MemoryAlertSink::new()),
        );

        let data: Arc<[Record]> = vec![Record::new("NaN", "A", "202401")].into();
        let result = controller
            .trigger(data, Arc::new(DataElement::new("de1")))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result, AggregateResult::default());
        assert_eq!(submitter.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_snapshot_serialization() {
        let snapshot = ImportSnapshot {
            run: 3,
            state: ImportState::Importing {
                progress: 40,
                completed: 2,
                total: 5,
            },
        };

        assert_eq!(
            serde_json::to_value(&snapshot).unwrap(),
            serde_json::json!({"run": 3, "state": "importing", "progress": 40, "completed": 2, "total": 5})
        );
    }
}
