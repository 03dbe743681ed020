//! Session state machine.
//!
//! Owns the client's in-memory identity and keeps it in sync with the
//! persisted session token. States: `Bootstrapping` (visited exactly once,
//! at startup), then cycling between `Authenticated` and `Unauthenticated`
//! for the life of the process.
//!
//! Every transition begins a new generation; an async outcome only commits
//! if no later transition began meanwhile. That makes `logout()` win over a
//! bootstrap validation that is still in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use futures_util::FutureExt;
use tracing::{debug, warn};

use crate::api::{ApiClient, User};
use crate::cache::{QueryCache, QueryState};
use crate::credentials::TokenStore;

/// Query key for the bootstrap validation read.
pub const CURRENT_USER_KEY: &str = "current-user";

/// The client's current belief about who is authenticated.
#[derive(Debug, Clone)]
pub enum SessionState {
    Bootstrapping,
    Authenticated(User),
    Unauthenticated,
}

impl SessionState {
    pub fn identity(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }
}

/// What to do to the credential store while committing a transition.
enum StoreOp<'a> {
    None,
    Save(&'a str),
    Clear,
}

/// Owns identity state; views and the navigation gate read it, only this
/// type writes it. The credential store is written exclusively from here.
pub struct SessionManager {
    state: Mutex<SessionState>,
    generation: AtomicU64,
    store: TokenStore,
    api: Arc<ApiClient>,
    validation: QueryCache<User>,
}

impl SessionManager {
    pub fn new(api: Arc<ApiClient>, store: TokenStore) -> Self {
        Self {
            state: Mutex::new(SessionState::Bootstrapping),
            generation: AtomicU64::new(0),
            store,
            api,
            validation: QueryCache::new(),
        }
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.lock_state().clone()
    }

    /// Returns the authenticated user, if any.
    pub fn identity(&self) -> Option<User> {
        self.lock_state().identity().cloned()
    }

    /// Bootstraps identity from the persisted token.
    ///
    /// No token → `Unauthenticated`. A present token is validated through
    /// the query cache under [`CURRENT_USER_KEY`]; any failure (rejected
    /// token, network, malformed payload) clears the stored token and
    /// downgrades silently to `Unauthenticated`. Never returns an error to
    /// the caller.
    pub async fn start(&self) {
        let generation = self.begin();

        let token = match self.store.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "credential store unreadable, treating as logged out");
                None
            }
        };
        let Some(token) = token else {
            let _ = self.finish(generation, SessionState::Unauthenticated, StoreOp::None);
            return;
        };

        let api = Arc::clone(&self.api);
        let mut handle = self.validation.subscribe(CURRENT_USER_KEY, move || {
            let api = Arc::clone(&api);
            let token = token.clone();
            async move { api.current_user(&token).await }.boxed()
        });

        match handle.wait().await {
            QueryState::Success(user) => {
                let committed =
                    self.finish(generation, SessionState::Authenticated(user), StoreOp::None);
                if !matches!(committed, Ok(true)) {
                    debug!("bootstrap result discarded, a later transition won");
                }
            }
            other => {
                if let QueryState::Failure(e) = &other {
                    debug!(error = %e, "bootstrap validation failed");
                }
                // Normal "not logged in" path: invalidate the stored token
                // unless a later transition already took over.
                if let Err(e) = self.finish(generation, SessionState::Unauthenticated, StoreOp::Clear)
                {
                    warn!(error = %e, "failed to clear rejected session token");
                }
            }
        }
    }

    /// Authenticates against the remote API.
    ///
    /// Bypasses the query cache (login is a mutation). On success the token
    /// is persisted — the only store write on this path — and identity is
    /// set. On failure the state is left untouched and the typed
    /// [`crate::api::ApiError`] is surfaced on the error chain so the view
    /// can render invalid credentials distinctly.
    ///
    /// # Errors
    /// Returns the gateway error, a store error if persisting fails, or an
    /// error if a concurrent transition superseded this login (in which case
    /// neither the state nor the store was touched).
    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        let generation = self.begin();

        // Empty inputs pass through; the server is authoritative.
        let response = self.api.login(username, password).await?;

        let user = response.user.clone();
        let committed = self.finish(
            generation,
            SessionState::Authenticated(response.user),
            StoreOp::Save(&response.token),
        )?;
        if !committed {
            // A concurrent transition (e.g. logout) won; nothing was saved.
            anyhow::bail!("login discarded, a later session transition took over");
        }
        Ok(user)
    }

    /// Clears the persisted token and drops to `Unauthenticated`.
    ///
    /// Unconditional and idempotent; a bootstrap validation still in flight
    /// is discarded even if it later resolves successfully.
    ///
    /// # Errors
    /// Returns an error only if the credential store cannot be rewritten.
    pub async fn logout(&self) -> Result<()> {
        let generation = self.begin();
        self.finish(generation, SessionState::Unauthenticated, StoreOp::Clear)?;
        Ok(())
    }

    /// Begins a new transition generation.
    fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Commits a transition if no later one began meanwhile.
    ///
    /// The store write happens under the state lock so a racing transition
    /// cannot interleave between the write and the state change.
    fn finish(&self, generation: u64, next: SessionState, store_op: StoreOp<'_>) -> Result<bool> {
        let mut state = self.lock_state();
        if self.generation.load(Ordering::SeqCst) != generation {
            return Ok(false);
        }
        match store_op {
            StoreOp::None => {}
            StoreOp::Save(token) => {
                self.store.save(token).context("persist session token")?;
            }
            StoreOp::Clear => {
                self.store.clear().context("clear session token")?;
            }
        }
        *state = next;
        Ok(true)
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
