//! Backend persistence and hardware sync
//!
//! Saves are debounced: each mutation cancels the pending save and schedules
//! a new one, so a burst of commands produces a single save carrying the last
//! state. Syncs are sent immediately. Backend failures are logged and never
//! reach the command sender; without a backend both calls are no-ops.
//!
//! [`BackendWorker`] moves the actual backend I/O onto its own thread so a
//! slow or stuck backend never stalls the command loop.

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::state::{Effects, RgbState};
use crate::types::ProfilePair;

/// Process that stores profiles and drives the lights
pub trait Backend: Send + Sync {
    fn save(&self, rgb_profiles: &HashMap<String, ProfilePair>, current_game_id: &str) -> Result<()>;

    fn sync(&self, current_game_id: &str) -> Result<()>;
}

enum BackendJob {
    Save(HashMap<String, ProfilePair>, String),
    Sync(String),
}

/// Forwards backend calls to a dedicated thread, in submission order.
///
/// Calls return as soon as the job is queued; failures are logged by the
/// worker. Dropping the worker waits for queued jobs to finish.
pub struct BackendWorker {
    tx: Option<mpsc::Sender<BackendJob>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl BackendWorker {
    pub fn spawn(inner: Arc<dyn Backend>) -> Self {
        let (tx, rx) = mpsc::channel::<BackendJob>();
        let thread = thread::spawn(move || {
            for job in rx {
                match job {
                    BackendJob::Save(rgb_profiles, game_id) => {
                        if let Err(err) = inner.save(&rgb_profiles, &game_id) {
                            warn!(error = ?err, game_id = %game_id, "Failed to save RGB profiles");
                        }
                    }
                    BackendJob::Sync(game_id) => {
                        if let Err(err) = inner.sync(&game_id) {
                            warn!(error = ?err, game_id = %game_id, "Failed to sync RGB state");
                        }
                    }
                }
            }
            debug!("Backend worker stopped");
        });
        Self {
            tx: Some(tx),
            thread: Some(thread),
        }
    }

    fn submit(&self, job: BackendJob) -> Result<()> {
        self.tx
            .as_ref()
            .ok_or_else(|| anyhow!("Backend worker is shut down"))?
            .send(job)
            .map_err(|_| anyhow!("Backend worker thread exited"))
    }
}

impl Backend for BackendWorker {
    fn save(&self, rgb_profiles: &HashMap<String, ProfilePair>, current_game_id: &str) -> Result<()> {
        self.submit(BackendJob::Save(rgb_profiles.clone(), current_game_id.to_string()))
    }

    fn sync(&self, current_game_id: &str) -> Result<()> {
        self.submit(BackendJob::Sync(current_game_id.to_string()))
    }
}

impl Drop for BackendWorker {
    fn drop(&mut self) {
        drop(self.tx.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Backend worker panicked");
            }
        }
    }
}

/// Save request captured at scheduling time
#[derive(Debug, Clone)]
struct PendingSave {
    rgb_profiles: HashMap<String, ProfilePair>,
    current_game_id: String,
}

impl PendingSave {
    fn capture(state: &RgbState) -> Self {
        Self {
            rgb_profiles: state.store.profiles().clone(),
            current_game_id: state.current_game_id().to_string(),
        }
    }

    fn send(&self, backend: &dyn Backend) {
        if let Err(err) = backend.save(&self.rgb_profiles, &self.current_game_id) {
            warn!(error = ?err, game_id = %self.current_game_id, "Failed to save RGB profiles");
        } else {
            debug!(profiles = self.rgb_profiles.len(), "Saved RGB profiles");
        }
    }
}

pub struct Persistence {
    backend: Option<Arc<dyn Backend>>,
    window: Duration,
    pending: Option<(JoinHandle<()>, PendingSave)>,
}

impl Persistence {
    pub fn new(backend: Option<Arc<dyn Backend>>, window: Duration) -> Self {
        Self {
            backend,
            window,
            pending: None,
        }
    }

    /// Perform the side effects reported by the reducer.
    /// Must be called from within a tokio runtime.
    pub fn handle(&mut self, effects: Effects, state: &RgbState) {
        if effects.sync {
            self.sync(state.current_game_id());
        }
        if effects.save {
            self.schedule_save(state);
        }
    }

    /// Cancel any pending save and schedule one for the current state
    pub fn schedule_save(&mut self, state: &RgbState) {
        let Some(backend) = self.backend.clone() else {
            return;
        };

        if let Some((handle, _)) = self.pending.take() {
            handle.abort();
        }

        let save = PendingSave::capture(state);
        let window = self.window;
        let task_save = save.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            task_save.send(backend.as_ref());
        });
        self.pending = Some((handle, save));
    }

    pub fn sync(&self, current_game_id: &str) {
        let Some(backend) = &self.backend else {
            return;
        };
        if let Err(err) = backend.sync(current_game_id) {
            warn!(error = ?err, game_id = %current_game_id, "Failed to sync RGB state");
        } else {
            debug!(game_id = %current_game_id, "Sent RGB sync");
        }
    }

    /// Send a still-pending save right away (used on shutdown)
    pub fn flush(&mut self) {
        let Some((handle, save)) = self.pending.take() else {
            return;
        };
        if handle.is_finished() {
            return;
        }
        handle.abort();
        if let Some(backend) = &self.backend {
            save.send(backend.as_ref());
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::state::RgbCommand;
    use crate::types::Zone;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Call {
        Save(HashMap<String, ProfilePair>, String),
        Sync(String),
    }

    #[derive(Default)]
    pub(crate) struct RecordingBackend {
        pub(crate) calls: Mutex<Vec<Call>>,
        pub(crate) fail: bool,
    }

    impl RecordingBackend {
        pub(crate) fn saves(&self) -> Vec<(HashMap<String, ProfilePair>, String)> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter_map(|call| match call {
                    Call::Save(profiles, game) => Some((profiles.clone(), game.clone())),
                    Call::Sync(_) => None,
                })
                .collect()
        }

        pub(crate) fn syncs(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter_map(|call| match call {
                    Call::Sync(game) => Some(game.clone()),
                    Call::Save(..) => None,
                })
                .collect()
        }
    }

    impl Backend for RecordingBackend {
        fn save(&self, rgb_profiles: &HashMap<String, ProfilePair>, current_game_id: &str) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Save(rgb_profiles.clone(), current_game_id.to_string()));
            if self.fail {
                anyhow::bail!("backend offline");
            }
            Ok(())
        }

        fn sync(&self, current_game_id: &str) -> Result<()> {
            self.calls.lock().unwrap().push(Call::Sync(current_game_id.to_string()));
            if self.fail {
                anyhow::bail!("backend offline");
            }
            Ok(())
        }
    }

    const WINDOW: Duration = Duration::from_millis(100);

    fn recording() -> (Arc<RecordingBackend>, Persistence) {
        let backend = Arc::new(RecordingBackend::default());
        let shared: Arc<dyn Backend> = backend.clone();
        (backend, Persistence::new(Some(shared), WINDOW))
    }

    fn brightness(state: &mut RgbState, value: u32) -> Effects {
        state
            .apply(RgbCommand::SetBrightness { zone: Zone::Left, brightness: value })
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_into_one_save() {
        let (backend, mut persistence) = recording();
        let mut state = RgbState::new();

        for value in 1..=5 {
            let effects = brightness(&mut state, value);
            persistence.handle(effects, &state);
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(backend.saves().is_empty());

        tokio::time::sleep(Duration::from_millis(150)).await;
        let saves = backend.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].0["default"].left.brightness, 5);
        assert_eq!(saves[0].1, "default");
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_save_separately() {
        let (backend, mut persistence) = recording();
        let mut state = RgbState::new();

        let effects = brightness(&mut state, 10);
        persistence.handle(effects, &state);
        tokio::time::sleep(Duration::from_millis(150)).await;

        let effects = brightness(&mut state, 20);
        persistence.handle(effects, &state);
        tokio::time::sleep(Duration::from_millis(150)).await;

        let saves = backend.saves();
        assert_eq!(saves.len(), 2);
        assert_eq!(saves[0].0["default"].left.brightness, 10);
        assert_eq!(saves[1].0["default"].left.brightness, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_is_immediate() {
        let (backend, mut persistence) = recording();
        let mut state = RgbState::new();

        let effects = state
            .apply(RgbCommand::SetCurrentGameId { id: "Game1".to_string() })
            .unwrap();
        persistence.handle(effects, &state);

        assert_eq!(backend.syncs(), vec!["Game1".to_string()]);
        assert!(backend.saves().is_empty());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(backend.saves().len(), 1);
        assert_eq!(backend.saves()[0].1, "Game1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_failures_are_swallowed() {
        let backend = Arc::new(RecordingBackend {
            fail: true,
            ..RecordingBackend::default()
        });
        let shared: Arc<dyn Backend> = backend.clone();
        let mut persistence = Persistence::new(Some(shared), WINDOW);
        let state = RgbState::new();

        persistence.handle(Effects { save: true, sync: true }, &state);
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(backend.syncs().len(), 1);
        assert_eq!(backend.saves().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_backend_is_noop() {
        let mut persistence = Persistence::new(None, WINDOW);
        let state = RgbState::new();

        persistence.handle(Effects { save: true, sync: true }, &state);
        tokio::time::sleep(Duration::from_millis(150)).await;
        persistence.flush();
        assert!(persistence.pending.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_sends_pending_save_once() {
        let (backend, mut persistence) = recording();
        let mut state = RgbState::new();

        let effects = brightness(&mut state, 33);
        persistence.handle(effects, &state);
        persistence.flush();
        assert_eq!(backend.saves().len(), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(backend.saves().len(), 1);
        assert_eq!(backend.saves()[0].0["default"].left.brightness, 33);
    }

    /// Blocks every call until the test lets it through
    struct GatedBackend {
        gate: Mutex<std::sync::mpsc::Receiver<()>>,
        inner: RecordingBackend,
    }

    impl Backend for GatedBackend {
        fn save(&self, rgb_profiles: &HashMap<String, ProfilePair>, current_game_id: &str) -> Result<()> {
            self.gate.lock().unwrap().recv()?;
            self.inner.save(rgb_profiles, current_game_id)
        }

        fn sync(&self, current_game_id: &str) -> Result<()> {
            self.gate.lock().unwrap().recv()?;
            self.inner.sync(current_game_id)
        }
    }

    #[test]
    fn test_worker_does_not_wait_for_backend() {
        let (open, gate) = std::sync::mpsc::channel();
        let gated = Arc::new(GatedBackend {
            gate: Mutex::new(gate),
            inner: RecordingBackend::default(),
        });
        let shared: Arc<dyn Backend> = gated.clone();
        let worker = BackendWorker::spawn(shared);

        let profiles = HashMap::from([("default".to_string(), ProfilePair::default())]);
        worker.sync("Game1").unwrap();
        worker.save(&profiles, "Game1").unwrap();
        assert!(gated.inner.calls.lock().unwrap().is_empty());

        open.send(()).unwrap();
        open.send(()).unwrap();
        drop(worker);

        assert_eq!(
            *gated.inner.calls.lock().unwrap(),
            vec![Call::Sync("Game1".to_string()), Call::Save(profiles, "Game1".to_string())]
        );
    }

    #[test]
    fn test_worker_survives_backend_failures() {
        let backend = Arc::new(RecordingBackend {
            fail: true,
            ..RecordingBackend::default()
        });
        let inner: Arc<dyn Backend> = backend.clone();
        let worker = BackendWorker::spawn(inner);

        let profiles = HashMap::from([("default".to_string(), ProfilePair::default())]);
        worker.save(&profiles, "Game1").unwrap();
        worker.sync("Game1").unwrap();
        drop(worker);

        assert_eq!(backend.saves().len(), 1);
        assert_eq!(backend.syncs(), vec!["Game1".to_string()]);
    }
}
