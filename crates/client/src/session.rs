//! Current-user state derived from the stored token.
//!
//! [`SessionStateHolder`] reads the token kept under [`AUTH_TOKEN_KEY`],
//! turns it into a [`SessionState`], keeps the outgoing bearer credential in
//! step, and tells subscribers every time it computes a state.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};

use velvet_core::claims::{EXPIRES_AT, NAME, ROLE, SUBJECT};

use crate::credential::BearerCredential;
use crate::storage::Storage;
use crate::token::{Claim, find_claim, parse_claims};

/// Storage key holding the session token.
pub const AUTH_TOKEN_KEY: &str = "authToken";

/// Who the client is acting as.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated {
        identity: String,
        roles: BTreeSet<String>,
    },
}

impl SessionState {
    /// Build the authenticated state from token claims.
    ///
    /// The identity comes from `name`, falling back to `sub`.
    #[must_use]
    pub fn from_claims(claims: &[Claim]) -> Self {
        let identity = find_claim(claims, NAME)
            .or_else(|| find_claim(claims, SUBJECT))
            .unwrap_or_default()
            .to_owned();
        let roles = claims
            .iter()
            .filter(|c| c.name == ROLE)
            .map(|c| c.value.clone())
            .collect();

        Self::Authenticated { identity, roles }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { identity, .. } => Some(identity),
        }
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        match self {
            Self::Anonymous => false,
            Self::Authenticated { roles, .. } => roles.contains(role),
        }
    }
}

/// Handle returned by [`SessionStateHolder::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn next(counter: &AtomicU64) -> Self {
        Self(counter.fetch_add(1, Ordering::Relaxed))
    }
}

type Observer = Arc<dyn Fn(&SessionState) + Send + Sync>;

/// Computes session state from storage and broadcasts it.
pub struct SessionStateHolder<S> {
    storage: Arc<S>,
    credential: Arc<BearerCredential>,
    observers: Mutex<Vec<(SubscriptionId, Observer)>>,
    next_id: AtomicU64,
}

impl<S: Storage> SessionStateHolder<S> {
    /// Create a holder reading from `storage` and driving `credential`.
    #[must_use]
    pub fn new(storage: Arc<S>, credential: Arc<BearerCredential>) -> Self {
        Self {
            storage,
            credential,
            observers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Compute the current state from the stored token.
    pub async fn load_state(&self) -> SessionState {
        self.load_state_at(Utc::now()).await
    }

    /// Compute the state as if the current time were `now`.
    ///
    /// An expired token is removed from storage. A token that yields no
    /// claims is left where it is and reads as anonymous.
    pub async fn load_state_at(&self, now: DateTime<Utc>) -> SessionState {
        let state = self.compute_state(now).await;
        self.notify(&state);
        state
    }

    async fn compute_state(&self, now: DateTime<Utc>) -> SessionState {
        self.credential.clear();

        let stored = match self.storage.get_item(AUTH_TOKEN_KEY).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read stored token");
                return SessionState::Anonymous;
            }
        };

        let Some(token) = stored
            .as_deref()
            .map(|t| t.trim_matches('"'))
            .filter(|t| !t.is_empty())
        else {
            return SessionState::Anonymous;
        };

        let claims = parse_claims(token);
        if claims.is_empty() {
            tracing::debug!("Stored token carries no readable claims");
            return SessionState::Anonymous;
        }

        if is_expired(&claims, now) {
            tracing::info!("Stored token has expired, removing it");
            if let Err(e) = self.storage.remove_item(AUTH_TOKEN_KEY).await {
                tracing::warn!(error = %e, "Could not remove expired token");
            }
            return SessionState::Anonymous;
        }

        self.credential.set(token);
        SessionState::from_claims(&claims)
    }

    /// Switch to authenticated for `token` without reading storage.
    pub fn mark_authenticated(&self, token: &str) -> SessionState {
        let state = SessionState::from_claims(&parse_claims(token));
        self.credential.set(token);
        self.notify(&state);
        state
    }

    /// Switch to anonymous. The caller is responsible for erasing the stored token.
    pub fn mark_logged_out(&self) {
        self.credential.clear();
        self.notify(&SessionState::Anonymous);
    }

    /// Call `observer` with every state computed from now on.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        let id = SubscriptionId::next(&self.next_id);
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(observer)));
        id
    }

    /// Stop notifying the observer registered as `id`.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(existing, _)| *existing != id);
    }

    /// The credential this holder drives.
    #[must_use]
    pub fn credential(&self) -> &Arc<BearerCredential> {
        &self.credential
    }

    fn notify(&self, state: &SessionState) {
        // Observers may subscribe or unsubscribe from inside the callback.
        let observers: Vec<Observer> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in observers {
            observer(state);
        }
    }
}

/// Whether the `exp` claim is at or before `now`. Tokens without `exp` never
/// expire here; an `exp` that is not a number counts as expired.
fn is_expired(claims: &[Claim], now: DateTime<Utc>) -> bool {
    let Some(exp) = find_claim(claims, EXPIRES_AT) else {
        return false;
    };

    #[allow(clippy::cast_possible_truncation)]
    let exp = exp
        .parse::<i64>()
        .ok()
        .or_else(|| exp.parse::<f64>().ok().map(|f| f as i64));

    exp.is_none_or(|exp| exp <= now.timestamp())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use chrono::Duration;

    use super::*;
    use crate::storage::{MemoryStorage, StorageError};
    use crate::token::tests::token_with_payload;

    fn holder() -> (Arc<MemoryStorage>, SessionStateHolder<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let holder = SessionStateHolder::new(Arc::clone(&storage), Arc::new(BearerCredential::new()));
        (storage, holder)
    }

    fn token(name: &str, roles: &[&str], exp: DateTime<Utc>) -> String {
        token_with_payload(&serde_json::json!({
            "sub": name,
            "name": name,
            "role": roles,
            "jti": "7d3c1f2e-0000-4000-8000-000000000000",
            "exp": exp.timestamp(),
        }))
    }

    #[tokio::test]
    async fn test_no_token_is_anonymous() {
        let (_, holder) = holder();
        assert_eq!(holder.load_state().await, SessionState::Anonymous);
        assert!(!holder.credential().is_set());
    }

    #[tokio::test]
    async fn test_valid_token_is_authenticated() {
        let (storage, holder) = holder();
        let token = token("alice", &["Admin"], Utc::now() + Duration::hours(3));
        storage.set_item(AUTH_TOKEN_KEY, &token).await.unwrap();

        let state = holder.load_state().await;
        assert_eq!(state.identity(), Some("alice"));
        assert!(state.has_role("Admin"));
        assert!(!state.has_role("Guest"));
        assert_eq!(
            holder.credential().header_value(),
            Some(format!("Bearer {token}"))
        );
    }

    #[tokio::test]
    async fn test_quoted_token_is_unwrapped() {
        let (storage, holder) = holder();
        let token = token("bob", &["Guest"], Utc::now() + Duration::hours(1));
        storage
            .set_item(AUTH_TOKEN_KEY, &format!("\"{token}\""))
            .await
            .unwrap();

        assert_eq!(holder.load_state().await.identity(), Some("bob"));
        assert_eq!(
            holder.credential().header_value(),
            Some(format!("Bearer {token}"))
        );
    }

    #[tokio::test]
    async fn test_expired_token_is_removed() {
        let (storage, holder) = holder();
        let now = Utc::now();
        storage
            .set_item(AUTH_TOKEN_KEY, &token("carol", &[], now - Duration::seconds(1)))
            .await
            .unwrap();

        assert_eq!(holder.load_state_at(now).await, SessionState::Anonymous);
        assert_eq!(storage.get_item(AUTH_TOKEN_KEY).await.unwrap(), None);
        assert!(!holder.credential().is_set());
    }

    #[tokio::test]
    async fn test_token_expiring_exactly_now_is_expired() {
        let (storage, holder) = holder();
        let now = Utc::now();
        storage
            .set_item(AUTH_TOKEN_KEY, &token("dave", &[], now))
            .await
            .unwrap();

        assert_eq!(holder.load_state_at(now).await, SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_unreadable_token_is_left_in_place() {
        let (storage, holder) = holder();
        storage.set_item(AUTH_TOKEN_KEY, "garbage").await.unwrap();

        assert_eq!(holder.load_state().await, SessionState::Anonymous);
        assert_eq!(
            storage.get_item(AUTH_TOKEN_KEY).await.unwrap().as_deref(),
            Some("garbage")
        );
    }

    #[tokio::test]
    async fn test_token_without_expiry_is_accepted() {
        let (storage, holder) = holder();
        let token = token_with_payload(&serde_json::json!({"sub": "erin"}));
        storage.set_item(AUTH_TOKEN_KEY, &token).await.unwrap();

        assert_eq!(holder.load_state().await.identity(), Some("erin"));
    }

    struct BrokenStorage;

    impl Storage for BrokenStorage {
        async fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(std::io::Error::other("disk on fire").into())
        }

        async fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(std::io::Error::other("disk on fire").into())
        }

        async fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
            Err(std::io::Error::other("disk on fire").into())
        }
    }

    #[tokio::test]
    async fn test_storage_failure_is_anonymous() {
        let holder = SessionStateHolder::new(Arc::new(BrokenStorage), Arc::new(BearerCredential::new()));
        assert_eq!(holder.load_state().await, SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_observers_see_every_computation() {
        let (storage, holder) = holder();
        let calls = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(Mutex::new(SessionState::Anonymous));

        let id = {
            let calls = Arc::clone(&calls);
            let last = Arc::clone(&last);
            holder.subscribe(move |state| {
                calls.fetch_add(1, Ordering::SeqCst);
                *last.lock().unwrap() = state.clone();
            })
        };

        holder.load_state().await;
        let token = token("frank", &["Guest"], Utc::now() + Duration::hours(1));
        storage.set_item(AUTH_TOKEN_KEY, &token).await.unwrap();
        holder.load_state().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(last.lock().unwrap().identity(), Some("frank"));

        holder.mark_logged_out();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(*last.lock().unwrap(), SessionState::Anonymous);
        assert!(!holder.credential().is_set());

        holder.unsubscribe(id);
        holder.mark_authenticated(&token);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(holder.credential().is_set());
    }

    #[test]
    fn test_mark_authenticated_reads_claims() {
        let (_, holder) = holder();
        let token = token("grace", &["Admin", "Guest"], Utc::now() + Duration::hours(1));

        let state = holder.mark_authenticated(&token);
        assert_eq!(state.identity(), Some("grace"));
        assert!(state.has_role("Admin") && state.has_role("Guest"));
    }

    #[test]
    fn test_is_expired_handles_odd_values() {
        let now = Utc::now();
        let claim = |v: &str| vec![Claim { name: "exp".into(), value: v.into() }];

        assert!(is_expired(&claim("not-a-number"), now));
        assert!(!is_expired(&claim(&(now.timestamp() + 60).to_string()), now));
        assert!(!is_expired(&claim("4102444800.0"), now));
        assert!(!is_expired(&[], now));
    }
}
