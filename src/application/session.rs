// Projection sessions - Per-client selection and memoized views
use crate::application::key_service::KeyService;
use crate::application::snapshot_cache::{ParsedSnapshot, SnapshotCache};
use crate::application::snapshot_store::SnapshotVersion;
use crate::application::view_spec::{ViewInput, ViewSpec};
use crate::domain::dashboard::{Dashboard, RenderedView, ViewState};
use crate::domain::error::{Result, TelemetryError};
use crate::domain::record::SeriesRecord;
use futures::Stream;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock, watch};

/// The selected key plus a counter bumped on every change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub key: String,
    pub generation: u64,
}

/// Values of the declared inputs a view was last computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InputStamp {
    version: Option<Option<SnapshotVersion>>,
    selection: Option<u64>,
}

struct MemoEntry<R> {
    stamp: InputStamp,
    state: ViewState<R>,
    computations: usize,
}

/// What the snapshot input resolved to for one refresh
enum SnapshotInput<R> {
    Table {
        snapshot: Arc<ParsedSnapshot<R>>,
        degraded: Option<String>,
    },
    Unavailable {
        reason: TelemetryError,
    },
}

impl<R> SnapshotInput<R> {
    fn version(&self) -> Option<SnapshotVersion> {
        match self {
            Self::Table { snapshot, .. } => Some(snapshot.version),
            Self::Unavailable { .. } => None,
        }
    }
}

pub struct ProjectionSession<R> {
    id: u64,
    cache: Arc<SnapshotCache<R>>,
    views: Arc<[ViewSpec]>,
    selection_tx: watch::Sender<Selection>,
    ended: watch::Sender<bool>,
    memo: Mutex<HashMap<String, MemoEntry<R>>>,
}

impl<R: SeriesRecord> ProjectionSession<R> {
    pub fn new(id: u64, cache: Arc<SnapshotCache<R>>, views: Arc<[ViewSpec]>, initial: String) -> Self {
        let (selection_tx, _) = watch::channel(Selection {
            key: initial,
            generation: 0,
        });
        let (ended, _) = watch::channel(false);
        Self {
            id,
            cache,
            views,
            selection_tx,
            ended,
            memo: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn selection(&self) -> Selection {
        self.selection_tx.borrow().clone()
    }

    /// Change the selected key. Re-selecting the current key is not a change.
    /// Callers validate the key first.
    pub fn select(&self, key: &str) -> bool {
        self.selection_tx.send_if_modified(|current| {
            if current.key == key {
                return false;
            }
            current.key = key.to_string();
            current.generation += 1;
            true
        })
    }

    pub fn subscribe_selection(&self) -> watch::Receiver<Selection> {
        self.selection_tx.subscribe()
    }

    pub fn subscribe_snapshot(&self) -> watch::Receiver<Option<SnapshotVersion>> {
        self.cache.subscribe()
    }

    /// Ends every update stream of this session
    pub fn close(&self) {
        self.ended.send_replace(true);
    }

    /// Bring every view up to date with the newest snapshot and selection.
    ///
    /// The snapshot and the selection are each read once, so all views of one
    /// refresh see the same pair. A view is recomputed only when one of its
    /// declared inputs changed since its last computation. Concurrent
    /// refreshes of one session run one after the other.
    pub async fn refresh(&self) -> Result<Dashboard<R>> {
        // inputs are read under the lock so a memo entry is never replaced
        // by one stamped with older inputs
        let mut memo = self.memo.lock().await;
        let selection = self.selection();
        let input = match self.cache.load().await {
            Ok(read) => SnapshotInput::Table {
                snapshot: read.snapshot,
                degraded: read.degraded,
            },
            Err(err @ (TelemetryError::NotInitialized | TelemetryError::CorruptSnapshot { .. })) => {
                SnapshotInput::Unavailable { reason: err }
            }
            Err(err) => return Err(err),
        };
        let version = input.version();

        let mut views = Vec::with_capacity(self.views.len());
        for spec in self.views.iter() {
            let reads_snapshot = spec.depends_on(ViewInput::Snapshot);
            let stamp = InputStamp {
                version: reads_snapshot.then_some(version),
                selection: spec
                    .depends_on(ViewInput::Selection)
                    .then_some(selection.generation),
            };

            let state = match memo.get(spec.name()) {
                Some(entry) if entry.stamp == stamp => entry.state.clone(),
                previous => {
                    let computations = previous.map_or(0, |entry| entry.computations) + 1;
                    let state = compute(spec, &input, &selection.key)?;
                    memo.insert(
                        spec.name().to_string(),
                        MemoEntry {
                            stamp,
                            state: state.clone(),
                            computations,
                        },
                    );
                    state
                }
            };

            let degraded = match (&input, reads_snapshot) {
                (SnapshotInput::Table { degraded, .. }, true) => degraded.clone(),
                (SnapshotInput::Unavailable { reason: TelemetryError::CorruptSnapshot { reason } }, true) => {
                    Some(reason.clone())
                }
                _ => None,
            };
            views.push(RenderedView {
                name: spec.name().to_string(),
                selection: selection.key.clone(),
                version: if reads_snapshot { version.map(|v| v.0) } else { None },
                state,
                degraded,
            });
        }

        Ok(Dashboard {
            session_id: self.id,
            selection: selection.key,
            version: version.map(|v| v.0),
            views,
        })
    }

    /// Current dashboard, then a fresh one each time the snapshot version or
    /// the selection changes. Several changes between two polls yield one
    /// dashboard built from the newest values. Ends when the session is
    /// closed.
    pub fn updates(self: Arc<Self>) -> impl Stream<Item = Dashboard<R>> + Send + 'static {
        let mut versions = self.subscribe_snapshot();
        let mut selections = self.subscribe_selection();
        let mut ended = self.ended.subscribe();
        async_stream::stream! {
            loop {
                if *ended.borrow_and_update() {
                    break;
                }
                let _ = versions.borrow_and_update();
                let _ = selections.borrow_and_update();
                match self.refresh().await {
                    Ok(dashboard) => yield dashboard,
                    Err(err) => {
                        tracing::error!(session = self.id, error = %err, "ending update stream");
                        break;
                    }
                }
                tokio::select! {
                    changed = versions.changed() => if changed.is_err() { break },
                    changed = selections.changed() => if changed.is_err() { break },
                    _ = ended.changed() => break,
                }
            }
        }
    }

    /// How many times a view has been computed
    pub async fn computations(&self, view: &str) -> usize {
        self.memo
            .lock()
            .await
            .get(view)
            .map_or(0, |entry| entry.computations)
    }
}

fn compute<R: SeriesRecord>(
    spec: &ViewSpec,
    input: &SnapshotInput<R>,
    selection: &str,
) -> Result<ViewState<R>> {
    let rows: &[R] = match (input, spec.depends_on(ViewInput::Snapshot)) {
        (SnapshotInput::Table { snapshot, .. }, true) => &snapshot.rows,
        // no table to show yet, or only a corrupt one with nothing to fall back to
        (SnapshotInput::Unavailable { .. }, true) => return Ok(ViewState::Waiting),
        (_, false) => &[],
    };

    match spec.render(rows, selection) {
        Ok(output) => Ok(ViewState::Ready { output }),
        Err(err) => ViewState::from_error(err),
    }
}

/// All live sessions of one process
pub struct SessionRegistry<R> {
    cache: Arc<SnapshotCache<R>>,
    views: Arc<[ViewSpec]>,
    keys: KeyService,
    default_selection: String,
    sessions: RwLock<HashMap<u64, Arc<ProjectionSession<R>>>>,
    next_id: AtomicU64,
}

impl<R: SeriesRecord> SessionRegistry<R> {
    pub fn new(
        cache: Arc<SnapshotCache<R>>,
        views: Vec<ViewSpec>,
        keys: KeyService,
        default_selection: String,
    ) -> Result<Self> {
        keys.validate(&default_selection)?;
        Ok(Self {
            cache,
            views: views.into(),
            keys,
            default_selection,
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn keys(&self) -> &KeyService {
        &self.keys
    }

    pub async fn create(&self) -> Arc<ProjectionSession<R>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session = Arc::new(ProjectionSession::new(
            id,
            self.cache.clone(),
            self.views.clone(),
            self.default_selection.clone(),
        ));
        self.sessions.write().await.insert(id, session.clone());
        tracing::info!(session = id, selection = %self.default_selection, "session started");
        session
    }

    pub async fn get(&self, id: u64) -> Option<Arc<ProjectionSession<R>>> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Validate `key` and apply it. An unknown key leaves the selection as is.
    pub fn select(&self, session: &ProjectionSession<R>, key: &str) -> Result<Selection> {
        self.keys.validate(key)?;
        if session.select(key) {
            tracing::info!(session = session.id(), selection = key, "selection changed");
        }
        Ok(session.selection())
    }

    /// Forget the session and end its update streams
    pub async fn end(&self, id: u64) -> bool {
        match self.sessions.write().await.remove(&id) {
            Some(session) => {
                session.close();
                tracing::info!(session = id, "session ended");
                true
            }
            None => false,
        }
    }
}
