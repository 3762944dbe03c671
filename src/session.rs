use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::adapter::{Adapter, AdapterError, AdapterFactory, AdapterKind, AdapterOptions};
use crate::command::manager::Quit;
use crate::command::{parse, Command, CommandError, CommandRegistry, Output, ParsedCommand};

/// One token's adapter plus bookkeeping.
///
/// The adapter sits behind its own mutex: commands for the same token run
/// one at a time even if a client opens several connections with it.
pub struct Session {
    token: String,
    adaptee: Option<Mutex<Box<dyn Adapter>>>,
    created_at: Instant,
    last_used: Mutex<Instant>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token)
            .field("has_adaptee", &self.adaptee.is_some())
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl Session {
    pub fn new(token: impl Into<String>, adaptee: Option<Box<dyn Adapter>>) -> Self {
        let now = Instant::now();
        Self {
            token: token.into(),
            adaptee: adaptee.map(Mutex::new),
            created_at: now,
            last_used: Mutex::new(now),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Whether the adapter family provided an adaptee for this session.
    pub fn has_adaptee(&self) -> bool {
        self.adaptee.is_some()
    }

    pub fn touch(&self) {
        *self.last_used.lock() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_used.lock().elapsed()
    }

    /// A command is currently running on this session's adapter.
    pub fn is_busy(&self) -> bool {
        self.adaptee.as_ref().is_some_and(|m| m.is_locked())
    }

    /// Run `command` against the adapter. Without an adaptee this is a
    /// silent no-op.
    pub fn invoke(&self, command: &dyn Command) -> Result<Option<Output>, CommandError> {
        let Some(adaptee) = &self.adaptee else {
            tracing::debug!(token = %self.token, command = command.name(), "no adaptee; skipped");
            return Ok(None);
        };
        let guard = adaptee.lock();
        let result = command.invoke(&**guard);
        drop(guard);
        self.touch();
        result
    }

    /// Ask the adapter to close its client. Used when a session is dropped
    /// without an explicit `Quit` (expiry, shutdown).
    fn close(&self) {
        let Some(adaptee) = &self.adaptee else {
            return;
        };
        let adaptee = adaptee.lock();
        let outcome = catch_unwind(AssertUnwindSafe(|| adaptee.manager().quit()));
        match outcome {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!(token = %self.token, error = %e, "adapter quit failed"),
            Err(_) => tracing::warn!(token = %self.token, "adapter quit panicked"),
        }
    }
}

/// Token → session map.
///
/// Insertion and removal go through the write lock, so a token can never
/// end up with two sessions.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<String, Arc<Session>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a session by token.
    pub fn get(&self, token: &str) -> Option<Arc<Session>> {
        self.inner.read().get(token).cloned()
    }

    /// Return the session for `token`, building it with `create` if absent.
    ///
    /// The bool is `true` when this call inserted the session. Concurrent
    /// callers racing on an unseen token get the same session; `create` runs
    /// for exactly one of them.
    pub fn get_or_create<E>(
        &self,
        token: &str,
        create: impl FnOnce() -> Result<Session, E>,
    ) -> Result<(Arc<Session>, bool), E> {
        if let Some(session) = self.get(token) {
            return Ok((session, false));
        }

        let mut inner = self.inner.write();
        if let Some(session) = inner.get(token) {
            return Ok((session.clone(), false));
        }
        let session = Arc::new(create()?);
        inner.insert(token.to_string(), session.clone());
        Ok((session, true))
    }

    /// Remove a session by token, returning it if it existed.
    pub fn remove(&self, token: &str) -> Option<Arc<Session>> {
        self.inner.write().remove(token)
    }

    /// Remove `token` only while it still maps to `session`. A session that
    /// replaced it in the meantime stays registered.
    pub fn remove_if(&self, token: &str, session: &Arc<Session>) -> bool {
        let mut inner = self.inner.write();
        match inner.get(token) {
            Some(current) if Arc::ptr_eq(current, session) => {
                inner.remove(token);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.inner.read().contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Sorted list of live tokens.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self.inner.read().keys().cloned().collect();
        tokens.sort();
        tokens
    }

    /// Remove sessions idle for at least `max_idle`. Sessions with a command
    /// in flight are kept.
    pub fn remove_idle(&self, max_idle: Duration) -> Vec<Arc<Session>> {
        let mut inner = self.inner.write();
        let expired: Vec<String> = inner
            .iter()
            .filter(|(_, s)| !s.is_busy() && s.idle_for() >= max_idle)
            .map(|(token, _)| token.clone())
            .collect();
        expired
            .iter()
            .filter_map(|token| inner.remove(token))
            .collect()
    }

    /// Remove every session.
    pub fn drain(&self) -> Vec<Arc<Session>> {
        self.inner.write().drain().map(|(_, s)| s).collect()
    }
}

/// Routes command lines to per-token sessions.
///
/// Owns the session registry, the command catalog, and the adapter factory
/// chosen at startup. Construct one per server and share it by `Arc`.
pub struct SessionManager {
    factory: Arc<dyn AdapterFactory>,
    options: AdapterOptions,
    commands: CommandRegistry,
    sessions: SessionRegistry,
}

impl SessionManager {
    pub fn new(factory: Arc<dyn AdapterFactory>, options: AdapterOptions) -> Self {
        Self {
            factory,
            options,
            commands: CommandRegistry::new(),
            sessions: SessionRegistry::new(),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn adapter_kind(&self) -> AdapterKind {
        self.factory.kind()
    }

    /// Execute one raw command line and return the text sent back to the
    /// client. Never fails: every error becomes the returned string.
    pub fn run_command(&self, raw: &str) -> String {
        let ParsedCommand { token, name, args } = match parse(raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(error = %e, "rejected command line");
                return e.to_string();
            }
        };

        let command = match self.commands.build(&name, args) {
            Ok(command) => command,
            Err(e) => {
                tracing::debug!(token = %token, command = %name, error = %e, "bad arguments");
                return e.to_string();
            }
        };
        if command.is_noop() {
            tracing::debug!(token = %token, command = %name, "Unknown command executed.");
            return String::new();
        }

        let session = match self.session_for(&token) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(token = %token, error = %e, "failed to create session");
                return e.to_string();
            }
        };

        let reply = Self::execute(&session, command.as_ref());

        if command.name() == Quit::NAME && self.sessions.remove_if(&token, &session) {
            tracing::info!(token = %token, "session closed");
        }
        reply
    }

    fn session_for(&self, token: &str) -> Result<Arc<Session>, AdapterError> {
        let (session, created) = self.sessions.get_or_create(token, || {
            let adaptee = self.factory.create(token, &self.options)?;
            Ok::<_, AdapterError>(Session::new(token, adaptee))
        })?;
        if created {
            tracing::info!(
                token = %token,
                kind = %self.factory.kind(),
                has_adaptee = session.has_adaptee(),
                "session created"
            );
        } else {
            session.touch();
        }
        Ok(session)
    }

    fn execute(session: &Session, command: &dyn Command) -> String {
        let outcome = catch_unwind(AssertUnwindSafe(|| session.invoke(command)));
        match outcome {
            Ok(Ok(output)) => output.map(|o| o.to_string()).unwrap_or_default(),
            Ok(Err(e)) => {
                tracing::warn!(token = %session.token(), command = command.name(), error = %e, "command failed");
                e.to_string()
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(token = %session.token(), command = command.name(), %message, "command panicked");
                message
            }
        }
    }

    /// Drop sessions idle for at least `max_idle` and close their adapters.
    /// Returns how many were removed.
    pub fn reap_idle(&self, max_idle: Duration) -> usize {
        let expired = self.sessions.remove_idle(max_idle);
        for session in &expired {
            tracing::info!(token = %session.token(), idle = ?session.idle_for(), "session expired");
            session.close();
        }
        expired.len()
    }

    /// Drop every session and close its adapter.
    pub fn shutdown(&self) -> usize {
        let sessions = self.sessions.drain();
        for session in &sessions {
            session.close();
        }
        if !sessions.is_empty() {
            tracing::info!(count = sessions.len(), "closed remaining sessions");
        }
        sessions.len()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "command panicked".to_string()
    }
}
