//! The miner module indexes a music directory into the store.
//!
//! A run makes two passes over the directory. The first only counts audio files, so that progress
//! can be reported as a fraction. The second extracts each file's tags, resolves its performer and
//! album and inserts the track, all of one file's writes happening in a single transaction.
//!
//! A file whose tags cannot be read is logged and skipped. A file that is already indexed is
//! counted and logged. Storage errors abort the run.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::audiotags::MetadataReader;
use crate::config::Config;
use crate::crawler::{count_audio_files, crawl};
use crate::error::{Result, RolasError, RolasExpectedError};
use crate::extractor::Extractor;
use crate::resolver::EntityResolver;
use crate::store::Store;
use crate::tracks::{insert_track, Track};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningState {
    Idle,
    Crawling,
    Extracting,
    Resolving,
    Inserting,
    Done,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    /// Always within [0, 1]. A run over an empty directory is complete.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.processed as f64 / self.total as f64).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MiningEvent {
    Progress(Progress),
    Log(String),
    Finished(MiningState),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MiningReport {
    pub files_seen: usize,
    pub tracks_inserted: usize,
    pub already_present: usize,
    pub failed: usize,
    /// One line per file that was not inserted, and per directory entry the crawl skipped.
    pub log: Vec<String>,
}

pub struct MiningSession<'a, R> {
    store: &'a Store,
    extractor: Extractor<R>,
    resolver: EntityResolver,
    state: MiningState,
    events: Option<Sender<MiningEvent>>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a, R: MetadataReader> MiningSession<'a, R> {
    pub fn new(store: &'a Store, reader: R) -> Self {
        MiningSession {
            store,
            extractor: Extractor::new(reader),
            resolver: EntityResolver::new(),
            state: MiningState::Idle,
            events: None,
            cancel: None,
        }
    }

    pub fn with_events(mut self, events: Sender<MiningEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn state(&self) -> MiningState {
        self.state
    }

    fn emit(&self, event: MiningEvent) {
        if let Some(tx) = &self.events {
            // The receiver may have gone away; mining carries on regardless.
            let _ = tx.send(event);
        }
    }

    fn log(&self, report: &mut MiningReport, line: String) {
        self.emit(MiningEvent::Log(line.clone()));
        report.log.push(line);
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.load(Ordering::Relaxed))
    }

    fn abort(&mut self, err: RolasError) -> Result<MiningReport> {
        self.state = MiningState::Aborted;
        self.emit(MiningEvent::Finished(self.state));
        Err(err)
    }

    pub fn run(&mut self, root: &Path) -> Result<MiningReport> {
        let store = self.store;
        let _guard = store.mining_guard()?;
        info!("mining {}", root.display());
        let mut report = MiningReport::default();

        self.state = MiningState::Crawling;
        let total = match count_audio_files(root) {
            Ok(n) => n,
            Err(e) => return self.abort(e),
        };
        debug!("found {} audio files below {}", total, root.display());
        self.emit(MiningEvent::Progress(Progress { processed: 0, total }));

        let mut files = match crawl(root) {
            Ok(files) => files,
            Err(e) => return self.abort(e),
        };
        for path in files.by_ref() {
            if self.cancelled() {
                self.state = MiningState::Aborted;
                self.log(&mut report, "mining cancelled".to_string());
                break;
            }
            report.files_seen += 1;
            match self.process(&path) {
                Ok(true) => report.tracks_inserted += 1,
                Ok(false) => {
                    report.already_present += 1;
                    self.log(&mut report, format!("{}: already present", path.display()));
                }
                Err(RolasError::Storage(e)) => {
                    self.resolver.clear();
                    warn!("aborting mining run on {}: {}", path.display(), e);
                    return self.abort(e.into());
                }
                Err(e) => {
                    report.failed += 1;
                    let reason = match e {
                        RolasError::Expected(RolasExpectedError::ExtractionFailed { cause, .. }) => cause,
                        e => e.to_string(),
                    };
                    warn!("skipping {}: {}", path.display(), reason);
                    self.log(&mut report, format!("{}: {}", path.display(), reason));
                }
            }
            self.emit(MiningEvent::Progress(Progress { processed: report.files_seen, total }));
        }
        for skipped in files.take_skipped() {
            self.log(&mut report, format!("{}: skipped: {}", skipped.path.display(), skipped.reason));
        }

        if self.state != MiningState::Aborted {
            self.state = MiningState::Done;
        }
        info!(
            "mined {}: {} files, {} new tracks, {} already present, {} failed",
            root.display(),
            report.files_seen,
            report.tracks_inserted,
            report.already_present,
            report.failed
        );
        self.emit(MiningEvent::Finished(self.state));
        Ok(report)
    }

    /// Returns whether a new track was inserted.
    fn process(&mut self, path: &Path) -> Result<bool> {
        self.state = MiningState::Extracting;
        let fields = self.extractor.extract(path)?;

        let store = self.store;
        let resolver = &mut self.resolver;
        let state = &mut self.state;
        let inserted = store.transaction(|conn| {
            *state = MiningState::Resolving;
            let performer_id = resolver.resolve_performer(conn, &fields.performer)?;
            let album_id = resolver.resolve_album(conn, &fields.album, &fields.album_path(), fields.year)?;
            *state = MiningState::Inserting;
            let track = Track {
                id: 0,
                performer_id,
                album_id,
                path: fields.path.clone(),
                title: fields.title.clone(),
                track_number: fields.track_number,
                year: fields.year,
                genre: fields.genre.clone(),
            };
            Ok(insert_track(conn, &track)?.is_new())
        })?;
        debug!("processed {} (track {})", path.display(), fields.track_display());
        Ok(inserted)
    }
}

/// Mines `root` on the calling thread.
pub fn mine<R: MetadataReader>(store: &Store, root: &Path, reader: R) -> Result<MiningReport> {
    MiningSession::new(store, reader).run(root)
}

/// Mines the configured music source directory.
pub fn mine_configured<R: MetadataReader>(store: &Store, config: &Config, reader: R) -> Result<MiningReport> {
    mine(store, &config.music_source_dir, reader)
}

/// A mining run on a background thread.
pub struct MiningHandle {
    events: Receiver<MiningEvent>,
    cancel: Arc<AtomicBool>,
    join: JoinHandle<Result<MiningReport>>,
}

impl MiningHandle {
    pub fn events(&self) -> &Receiver<MiningEvent> {
        &self.events
    }

    /// Asks the run to stop after the file it is working on.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn join(self) -> Result<MiningReport> {
        self.join.join().map_err(|_| RolasError::Generic("mining thread panicked".to_string()))?
    }
}

pub fn spawn_mining<R: MetadataReader + 'static>(store: Arc<Store>, root: PathBuf, reader: R) -> Result<MiningHandle> {
    let (tx, rx) = mpsc::channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    let join = thread::Builder::new().name("rolas-miner".to_string()).spawn(move || {
        let mut session = MiningSession::new(&store, reader).with_events(tx).with_cancel(flag);
        session.run(&root)
    })?;
    Ok(MiningHandle { events: rx, cancel, join })
}
