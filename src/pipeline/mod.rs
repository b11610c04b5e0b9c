//! Standings import pipeline.
//!
//! Ties preprocessing, OCR, parsing and record expansion together behind an
//! explicit state machine. At most one recognition runs per pipeline at a
//! time; a second request while one is in flight fails with
//! [`PipelineError::Busy`].
//!
//! The pipeline is `Sync` and is meant to be shared through an `Arc` when a
//! UI thread polls [`ImportPipeline::state`] while a worker runs OCR.

pub mod state;

pub use state::{PipelineState, StateKind};

use image::RgbaImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::config::ImportConfig;
use crate::error::PipelineError;
use crate::ocr::{preprocess, CropSettings, OcrEngine, PreprocessMode, RecognizeOptions};
use crate::records::expand;
use crate::standings::{parse_with_strategy, ParseStrategy, ParsedRow};
use crate::store::{KeyValueStore, MatchStore};

/// Mutable pipeline data, guarded by one mutex.
struct Inner {
    state: PipelineState,
    crop: CropSettings,
    mode: PreprocessMode,
    source: Option<RgbaImage>,
    preview: Option<RgbaImage>,
    text: Option<String>,
    rows: Vec<ParsedRow>,
    strategy: Option<ParseStrategy>,
}

impl Inner {
    fn transition(&mut self, next: PipelineState) -> Result<(), PipelineError> {
        let from = self.state.kind();
        let to = next.kind();
        if !from.can_transition_to(to) {
            return Err(PipelineError::InvalidTransition { from, to });
        }
        if from != to {
            debug!("Pipeline: {} -> {}", self.state, next);
        }
        self.state = next;
        Ok(())
    }

    fn clear_results(&mut self) {
        self.text = None;
        self.rows.clear();
        self.strategy = None;
    }
}

/// Clears the in-flight flag when a recognition finishes, however it ends.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Turns a standings screenshot into match records for one deck.
pub struct ImportPipeline<E: OcrEngine> {
    engine: E,
    options: RecognizeOptions,
    target_width: u32,
    inner: Mutex<Inner>,
    in_flight: AtomicBool,
}

impl<E: OcrEngine> ImportPipeline<E> {
    /// Creates an idle pipeline using the crop, mode and OCR settings of `config`.
    pub fn new(engine: E, config: &ImportConfig) -> Self {
        Self {
            engine,
            options: config.ocr.to_recognize_options(),
            target_width: config.target_width,
            inner: Mutex::new(Inner {
                state: PipelineState::Idle,
                crop: config.crop,
                mode: config.mode,
                source: None,
                preview: None,
                text: None,
                rows: Vec::new(),
                strategy: None,
            }),
            in_flight: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_flight(&self) -> Result<FlightGuard<'_>, PipelineError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(PipelineError::Busy);
        }
        Ok(FlightGuard(&self.in_flight))
    }

    /// Locks the state for an edit that must not race a recognition.
    ///
    /// The flag is read under the lock, so a recognition starting afterwards
    /// waits for this edit and sees its result.
    fn lock_idle(&self) -> Result<MutexGuard<'_, Inner>, PipelineError> {
        let inner = self.lock();
        if self.in_flight.load(Ordering::SeqCst) {
            return Err(PipelineError::Busy);
        }
        Ok(inner)
    }

    pub fn state(&self) -> PipelineState {
        self.lock().state.clone()
    }

    /// Whether a recognition is currently running.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Current parsed (or manually corrected) rows.
    pub fn rows(&self) -> Vec<ParsedRow> {
        self.lock().rows.clone()
    }

    /// Raw text of the last successful recognition.
    pub fn text(&self) -> Option<String> {
        self.lock().text.clone()
    }

    /// Parsing strategy that produced the current rows, if any.
    pub fn strategy(&self) -> Option<ParseStrategy> {
        self.lock().strategy
    }

    /// The binarized image OCR runs on.
    pub fn preview(&self) -> Option<RgbaImage> {
        self.lock().preview.clone()
    }

    pub fn settings(&self) -> (CropSettings, PreprocessMode) {
        let inner = self.lock();
        (inner.crop, inner.mode)
    }

    /// Loads a new source image, preprocesses it and runs recognition once.
    ///
    /// Returns the parsed rows. Fails with `Busy` while another recognition
    /// is running.
    pub fn load_image(&self, image: RgbaImage) -> Result<Vec<ParsedRow>, PipelineError> {
        let _flight = self.begin_flight()?;

        {
            let mut inner = self.lock();
            inner.transition(PipelineState::Preprocessing)?;
            inner.clear_results();
            inner.preview = None;

            let result = preprocess(&image, &inner.crop, self.target_width, inner.mode);
            inner.source = Some(image);

            match result {
                Ok(preview) => {
                    info!(
                        "Preprocessed image to {}x{} ({})",
                        preview.width(),
                        preview.height(),
                        inner.mode
                    );
                    inner.preview = Some(preview);
                }
                Err(e) => {
                    warn!("Preprocessing failed: {}", e);
                    inner.transition(PipelineState::Failed(e.to_string()))?;
                    return Err(e.into());
                }
            }
        }

        self.run_recognition()
    }

    /// Changes crop and mode and recomputes the preview. Never runs OCR.
    ///
    /// Invalid settings are rejected and the previous ones kept.
    pub fn update_settings(
        &self,
        crop: CropSettings,
        mode: PreprocessMode,
    ) -> Result<(), PipelineError> {
        crop.validate()?;

        let mut inner = self.lock();
        if let Some(source) = &inner.source {
            let preview = preprocess(source, &crop, self.target_width, mode)?;
            inner.preview = Some(preview);
        }
        inner.crop = crop;
        inner.mode = mode;
        debug!("Settings updated: {:?}, mode {}", crop, mode);
        Ok(())
    }

    /// Runs recognition again on the current preview.
    pub fn recognize_again(&self) -> Result<Vec<ParsedRow>, PipelineError> {
        let _flight = self.begin_flight()?;
        if self.lock().preview.is_none() {
            return Err(PipelineError::NoImage);
        }
        self.run_recognition()
    }

    /// Caller holds the flight guard.
    fn run_recognition(&self) -> Result<Vec<ParsedRow>, PipelineError> {
        let preview = {
            let mut inner = self.lock();
            let preview = inner.preview.clone().ok_or(PipelineError::NoImage)?;
            inner.transition(PipelineState::Recognizing(0))?;
            preview
        };

        // The lock is not held while OCR runs so state() stays responsive
        let mut report = |progress: u8| {
            let mut inner = self.lock();
            if inner.state.kind() == StateKind::Recognizing {
                inner.state = PipelineState::Recognizing(progress.min(100));
            }
        };
        let result = self.engine.recognize(&preview, &self.options, &mut report);

        let mut inner = self.lock();
        match result {
            Ok(text) => {
                let outcome = parse_with_strategy(&text);
                match outcome.strategy {
                    Some(strategy) => {
                        info!("Parsed {} rows ({} layout)", outcome.rows.len(), strategy)
                    }
                    None => warn!("No standings rows found in recognized text"),
                }

                let count = outcome.rows.len();
                inner.text = Some(text);
                inner.rows = outcome.rows;
                inner.strategy = outcome.strategy;
                inner.transition(PipelineState::Parsed(count))?;
                Ok(inner.rows.clone())
            }
            Err(e) => {
                warn!("Recognition failed: {}", e);
                inner.clear_results();
                inner.transition(PipelineState::Failed(e.to_string()))?;
                Err(e.into())
            }
        }
    }

    /// Replaces the rows with a manual correction. Invalid rows are dropped.
    pub fn set_rows(&self, rows: Vec<ParsedRow>) -> Result<(), PipelineError> {
        let rows: Vec<ParsedRow> = rows.into_iter().filter(ParsedRow::is_valid).collect();
        let mut inner = self.lock_idle()?;
        inner.transition(PipelineState::Parsed(rows.len()))?;
        inner.rows = rows;
        Ok(())
    }

    /// Expands the current rows into matches and adds them to `deck_id`.
    ///
    /// `deck_name` is only used for logging. Returns the number of matches
    /// written.
    pub fn commit<S: KeyValueStore>(
        &self,
        store: &MatchStore<S>,
        deck_id: &str,
        deck_name: Option<&str>,
    ) -> Result<usize, PipelineError> {
        let mut inner = self.lock_idle()?;
        let from = inner.state.kind();
        if !from.can_transition_to(StateKind::Imported) {
            return Err(PipelineError::InvalidTransition {
                from,
                to: StateKind::Imported,
            });
        }
        if inner.rows.is_empty() {
            return Err(PipelineError::NothingToImport);
        }

        let matches = expand(&inner.rows);
        let count = store.bulk_add(deck_id, matches)?;
        inner.transition(PipelineState::Imported(count))?;

        info!(
            "Imported {} matches from {} rows into {}",
            count,
            inner.rows.len(),
            deck_name.unwrap_or(deck_id)
        );
        Ok(count)
    }

    /// Drops the image and results and returns to Idle. Settings are kept.
    pub fn reset(&self) -> Result<(), PipelineError> {
        let mut inner = self.lock_idle()?;
        inner.transition(PipelineState::Idle)?;
        inner.source = None;
        inner.preview = None;
        inner.clear_results();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::records::MatchResult;
    use crate::store::MemoryStore;
    use image::Rgba;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::time::Duration;

    const STANDINGS: &str = "Rank,Player,Points,Record\n1,Alice,9,3-0-0\n2,Bob,6,2-1-0";

    /// Returns fixed text and counts calls.
    struct FakeEngine {
        text: String,
        calls: AtomicUsize,
    }

    impl FakeEngine {
        fn new(text: &str) -> Self {
            Self {
                text: text.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl OcrEngine for FakeEngine {
        fn recognize(
            &self,
            _image: &RgbaImage,
            _options: &RecognizeOptions,
            progress: &mut dyn FnMut(u8),
        ) -> Result<String, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            progress(0);
            progress(100);
            Ok(self.text.clone())
        }
    }

    struct FailingEngine;

    impl OcrEngine for FailingEngine {
        fn recognize(
            &self,
            _image: &RgbaImage,
            _options: &RecognizeOptions,
            _progress: &mut dyn FnMut(u8),
        ) -> Result<String, OcrError> {
            Err(OcrError::TimedOut(10))
        }
    }

    /// Reports 40% progress, signals `started`, then blocks until released.
    struct BlockingEngine {
        started: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl OcrEngine for BlockingEngine {
        fn recognize(
            &self,
            _image: &RgbaImage,
            _options: &RecognizeOptions,
            progress: &mut dyn FnMut(u8),
        ) -> Result<String, OcrError> {
            progress(40);
            self.started.lock().unwrap().send(()).unwrap();
            self.release
                .lock()
                .unwrap()
                .recv_timeout(Duration::from_secs(10))
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            Ok(STANDINGS.to_string())
        }
    }

    fn config() -> ImportConfig {
        ImportConfig {
            target_width: 40,
            ..Default::default()
        }
    }

    fn image() -> RgbaImage {
        RgbaImage::from_pixel(20, 10, Rgba([250, 250, 250, 255]))
    }

    #[test]
    fn test_load_image_runs_ocr_once_and_parses() {
        let pipeline = ImportPipeline::new(FakeEngine::new(STANDINGS), &config());
        assert_eq!(pipeline.state(), PipelineState::Idle);

        let rows = pipeline.load_image(image()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(pipeline.state(), PipelineState::Parsed(2));
        assert_eq!(pipeline.strategy(), Some(ParseStrategy::Tabular));
        assert_eq!(pipeline.engine.calls.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.text().as_deref(), Some(STANDINGS));

        let preview = pipeline.preview().unwrap();
        assert_eq!(preview.dimensions(), (40, 20));
    }

    #[test]
    fn test_update_settings_recomputes_preview_without_ocr() {
        let pipeline = ImportPipeline::new(FakeEngine::new(STANDINGS), &config());
        pipeline.load_image(image()).unwrap();

        pipeline
            .update_settings(CropSettings::new(25.0, 0.0, 25.0, 0.0), PreprocessMode::HighContrast)
            .unwrap();

        assert_eq!(pipeline.preview().unwrap().dimensions(), (40, 10));
        assert_eq!(pipeline.engine.calls.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.state(), PipelineState::Parsed(2));
        assert_eq!(pipeline.settings().1, PreprocessMode::HighContrast);
    }

    #[test]
    fn test_invalid_crop_keeps_previous_settings() {
        let pipeline = ImportPipeline::new(FakeEngine::new(STANDINGS), &config());
        pipeline.load_image(image()).unwrap();

        let err = pipeline
            .update_settings(CropSettings::new(0.0, 0.0, 0.0, 55.0), PreprocessMode::Auto)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Preprocess(_)));
        assert_eq!(pipeline.settings().0, CropSettings::default());
        assert_eq!(pipeline.preview().unwrap().dimensions(), (40, 20));
    }

    #[test]
    fn test_recognize_again() {
        let pipeline = ImportPipeline::new(FakeEngine::new(STANDINGS), &config());
        assert!(matches!(
            pipeline.recognize_again(),
            Err(PipelineError::NoImage)
        ));

        pipeline.load_image(image()).unwrap();
        pipeline.recognize_again().unwrap();
        assert_eq!(pipeline.engine.calls.load(Ordering::SeqCst), 2);
        assert!(!pipeline.is_busy());
    }

    #[test]
    fn test_recognition_failure_leaves_no_rows() {
        let pipeline = ImportPipeline::new(FailingEngine, &config());
        let err = pipeline.load_image(image()).unwrap_err();

        assert!(matches!(err, PipelineError::Recognition(OcrError::TimedOut(10))));
        assert_eq!(pipeline.state().kind(), StateKind::Failed);
        assert!(pipeline.rows().is_empty());
        assert!(!pipeline.is_busy());
    }

    #[test]
    fn test_preprocess_failure_marks_failed() {
        let config = ImportConfig {
            target_width: 0,
            ..Default::default()
        };
        let pipeline = ImportPipeline::new(FakeEngine::new(STANDINGS), &config);
        let err = pipeline.load_image(image()).unwrap_err();

        assert!(matches!(err, PipelineError::Preprocess(_)));
        assert_eq!(pipeline.state().kind(), StateKind::Failed);
        assert_eq!(pipeline.engine.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_commit_writes_expanded_matches() {
        let pipeline = ImportPipeline::new(FakeEngine::new(STANDINGS), &config());
        let store = MatchStore::new(MemoryStore::new());
        pipeline.load_image(image()).unwrap();

        let count = pipeline.commit(&store, "deck-1", Some("Ruby Steel")).unwrap();
        assert_eq!(count, 6);
        assert_eq!(pipeline.state(), PipelineState::Imported(6));

        let records = store.list("deck-1");
        assert_eq!(records.len(), 6);
        assert_eq!(records[0].opponent, "Alice");
        assert_eq!(records[5].result, MatchResult::Loss);

        // A second commit of the same rows is not allowed
        assert!(matches!(
            pipeline.commit(&store, "deck-1", None),
            Err(PipelineError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_commit_without_rows() {
        let pipeline = ImportPipeline::new(FakeEngine::new("no rank here"), &config());
        let store = MatchStore::new(MemoryStore::new());

        assert!(matches!(
            pipeline.commit(&store, "d", None),
            Err(PipelineError::InvalidTransition { .. })
        ));

        pipeline.load_image(image()).unwrap();
        assert_eq!(pipeline.state(), PipelineState::Parsed(0));
        assert!(matches!(
            pipeline.commit(&store, "d", None),
            Err(PipelineError::NothingToImport)
        ));
    }

    #[test]
    fn test_set_rows_and_reset() {
        let pipeline = ImportPipeline::new(FakeEngine::new("no rank here"), &config());
        assert!(matches!(
            pipeline.set_rows(Vec::new()),
            Err(PipelineError::InvalidTransition { .. })
        ));

        pipeline.load_image(image()).unwrap();
        pipeline
            .set_rows(vec![
                ParsedRow {
                    rank: 1,
                    player: "Zoe".to_string(),
                    points: None,
                    record: Some("1-1".to_string()),
                },
                ParsedRow {
                    rank: 0,
                    player: "Dropped".to_string(),
                    points: None,
                    record: None,
                },
            ])
            .unwrap();
        assert_eq!(pipeline.state(), PipelineState::Parsed(1));

        pipeline.reset().unwrap();
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert!(pipeline.rows().is_empty());
        assert!(pipeline.preview().is_none());
    }

    #[test]
    fn test_second_load_while_recognizing_is_busy() {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let engine = BlockingEngine {
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
        };
        let pipeline = Arc::new(ImportPipeline::new(engine, &config()));

        let worker = {
            let pipeline = Arc::clone(&pipeline);
            std::thread::spawn(move || pipeline.load_image(image()))
        };

        started_rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(pipeline.state(), PipelineState::Recognizing(40));
        assert!(matches!(
            pipeline.load_image(image()),
            Err(PipelineError::Busy)
        ));
        assert!(matches!(pipeline.recognize_again(), Err(PipelineError::Busy)));
        assert!(matches!(pipeline.reset(), Err(PipelineError::Busy)));

        release_tx.send(()).unwrap();
        let rows = worker.join().unwrap().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(pipeline.state(), PipelineState::Parsed(2));
    }

    #[test]
    fn test_edits_rejected_once_flight_started() {
        let pipeline = ImportPipeline::new(FakeEngine::new(STANDINGS), &config());
        let store = MatchStore::new(MemoryStore::new());
        pipeline.load_image(image()).unwrap();

        // A load on another thread has claimed the flight but not yet the state lock
        let flight = pipeline.begin_flight().unwrap();
        assert!(matches!(pipeline.set_rows(Vec::new()), Err(PipelineError::Busy)));
        assert!(matches!(
            pipeline.commit(&store, "d", None),
            Err(PipelineError::Busy)
        ));
        assert!(matches!(pipeline.reset(), Err(PipelineError::Busy)));
        assert_eq!(pipeline.state(), PipelineState::Parsed(2));
        assert_eq!(pipeline.rows().len(), 2);
        assert!(store.list("d").is_empty());

        drop(flight);
        pipeline.set_rows(Vec::new()).unwrap();
        assert_eq!(pipeline.state(), PipelineState::Parsed(0));
    }
}
