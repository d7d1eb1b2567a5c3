use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use campground::{BookingError, BookingSession, LookupSession};
use tokio::sync::{Mutex as SessionLock, OwnedMutexGuard};
use uuid::Uuid;

/// Sessions idle longer than this are dropped
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Anything kept in a [`SessionStore`]
pub trait KioskSession: Clone + Send {
    /// Key the session is stored under
    fn session_id(&self) -> Uuid;
}

impl KioskSession for BookingSession {
    fn session_id(&self) -> Uuid {
        self.id
    }
}

impl KioskSession for LookupSession {
    fn session_id(&self) -> Uuid {
        self.id
    }
}

/// Exclusive hold on one session; changes made through it are kept
pub type SessionGuard<S> = OwnedMutexGuard<S>;

struct Entry<S> {
    session: Arc<SessionLock<S>>,
    touched: Instant,
}

/// Map of in-flight sessions, each behind its own async lock.
///
/// Handlers [`lock`](Self::lock) a session for the whole workflow operation, so
/// a double-tapped button on one kiosk runs its operations one after the other
/// and the second sees the state the first left behind. Failed operations that
/// halt the session keep the halt, since the guard writes in place.
pub struct SessionStore<S> {
    sessions: Mutex<HashMap<Uuid, Entry<S>>>,
    idle_timeout: Duration,
}

impl<S: KioskSession> Default for SessionStore<S> {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_IDLE_TIMEOUT)
    }
}

impl<S: KioskSession> SessionStore<S> {
    /// Creates an empty store
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Stores a new session, dropping idle ones
    pub fn insert(&self, session: S) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|_, entry| entry.touched.elapsed() < self.idle_timeout);
        if sessions.len() < before {
            log::debug!("Dropped {} idle sessions", before - sessions.len());
        }
        sessions.insert(
            session.session_id(),
            Entry {
                session: Arc::new(SessionLock::new(session)),
                touched: Instant::now(),
            },
        );
    }

    /// Waits for exclusive use of a session
    pub async fn lock(&self, id: Uuid) -> Result<SessionGuard<S>, BookingError> {
        let slot = {
            let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            match sessions.get_mut(&id) {
                Some(entry) if entry.touched.elapsed() < self.idle_timeout => {
                    entry.touched = Instant::now();
                    entry.session.clone()
                }
                Some(_) => {
                    sessions.remove(&id);
                    return Err(BookingError::not_found("session", id));
                }
                None => return Err(BookingError::not_found("session", id)),
            }
        };
        Ok(slot.lock_owned().await)
    }

    /// Copy of the session once no operation is running on it
    pub async fn snapshot(&self, id: Uuid) -> Result<S, BookingError> {
        Ok(self.lock(id).await?.clone())
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether no sessions are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campground::BookingStep;

    #[tokio::test]
    async fn test_changes_through_lock_are_kept() {
        let store = SessionStore::<BookingSession>::default();
        let session = BookingSession::new();
        let id = session.id;
        store.insert(session);

        {
            let mut held = store.lock(id).await.unwrap();
            held.site_type_id = Some("powered".to_string());
            held.step = BookingStep::DateSelection;
        }

        let session = store.snapshot(id).await.unwrap();
        assert_eq!(session.step, BookingStep::DateSelection);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_second_lock_waits_for_first() {
        let store = Arc::new(SessionStore::<BookingSession>::default());
        let session = BookingSession::new();
        let id = session.id;
        store.insert(session);

        let mut first = store.lock(id).await.unwrap();
        let waiting = {
            let store = store.clone();
            tokio::spawn(async move { store.lock(id).await.unwrap().step })
        };
        tokio::task::yield_now().await;
        assert!(!waiting.is_finished());

        first.step = BookingStep::DateSelection;
        drop(first);
        assert_eq!(waiting.await.unwrap(), BookingStep::DateSelection);
    }

    #[tokio::test]
    async fn test_unknown_and_idle_sessions_are_not_found() {
        let store = SessionStore::<BookingSession>::new(Duration::ZERO);
        let session = BookingSession::new();
        let id = session.id;
        store.insert(session);

        assert!(matches!(
            store.lock(id).await,
            Err(BookingError::NotFound { .. })
        ));
        assert!(matches!(
            store.snapshot(Uuid::new_v4()).await,
            Err(BookingError::NotFound { .. })
        ));
        assert!(store.is_empty());
    }
}
