//! The session store: who is signed in, derived from the stored token.

use std::sync::Arc;

use futures::Stream;
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

use crate::store::KeyValueStore;

use super::{AuthError, Identity, JwtDecoder, Navigator, TokenDecoder, SIGN_IN_PATH};

/// Store key of the access token
pub const ACCESS_TOKEN_KEY: &str = "nyc360_token";

/// Store key of the refresh token
pub const REFRESH_TOKEN_KEY: &str = "nyc360_refresh_token";

/// Display name used when nobody is signed in
const GUEST_NAME: &str = "Guest";

/// Reloads buffered per subscriber before a slow one starts skipping.
const IDENTITY_CHANGES_CAPACITY: usize = 16;

/// Last published identity; `None` means anonymous.
pub type CurrentIdentity = Option<Arc<Identity>>;

/// Single source of truth for the signed-in user.
///
/// Construct once at startup and share it (`Arc<SessionStore>`) with every
/// screen. All methods take `&self`; the published identity lives in a
/// watch channel for sampling; every reload is also broadcast so
/// subscribers see one value per reload.
///
/// `store` is `None` when no persistence platform exists (for example when
/// rendering on a server). Every storage access is then a no-op and the
/// session stays anonymous.
pub struct SessionStore {
    store: Option<Arc<dyn KeyValueStore>>,
    decoder: Arc<dyn TokenDecoder>,
    navigator: Arc<dyn Navigator>,
    identity_tx: watch::Sender<CurrentIdentity>,
    changes_tx: broadcast::Sender<CurrentIdentity>,
}

impl SessionStore {
    /// Create the store and load the identity from any stored credential.
    pub fn new(store: Option<Arc<dyn KeyValueStore>>, navigator: Arc<dyn Navigator>) -> Self {
        Self::with_decoder(store, navigator, Arc::new(JwtDecoder))
    }

    pub fn with_decoder(
        store: Option<Arc<dyn KeyValueStore>>,
        navigator: Arc<dyn Navigator>,
        decoder: Arc<dyn TokenDecoder>,
    ) -> Self {
        let (identity_tx, _) = watch::channel(None);
        let (changes_tx, _) = broadcast::channel(IDENTITY_CHANGES_CAPACITY);
        let session = Self {
            store,
            decoder,
            navigator,
            identity_tx,
            changes_tx,
        };
        session.load_from_stored_credential();
        session
    }

    // ===== Loading =====

    /// Re-derive the identity from the stored access token and publish it.
    ///
    /// A missing token publishes anonymous. A token that fails to decode or
    /// has expired is treated like a logout: the credential is cleared,
    /// anonymous is published and the user is sent to sign in.
    pub fn load_from_stored_credential(&self) -> CurrentIdentity {
        let Some(token) = self.access_token() else {
            debug!("No stored access token");
            self.publish(None);
            return None;
        };

        match self.decode(&token) {
            Ok(identity) => {
                info!(
                    subject = %identity.subject_id,
                    roles = identity.roles.len(),
                    minutes_left = identity.minutes_until_expiry(),
                    "Session loaded from stored token"
                );
                let identity = Arc::new(identity);
                self.publish(Some(Arc::clone(&identity)));
                Some(identity)
            }
            Err(e) => {
                warn!(error = %e, "Stored access token rejected, logging out");
                self.logout();
                None
            }
        }
    }

    fn decode(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = self.decoder.decode(token)?;
        let identity = Identity::from_claims(&claims)?;
        if identity.is_expired() {
            return Err(AuthError::Expired {
                expires_at_epoch_millis: identity.expires_at_epoch_millis,
            });
        }
        Ok(identity)
    }

    /// Persist a fresh token pair and reload the identity from it.
    ///
    /// An empty refresh token keeps the previously stored one.
    pub fn save_credential(&self, access_token: &str, refresh_token: &str) -> CurrentIdentity {
        self.store_set(ACCESS_TOKEN_KEY, access_token);
        if !refresh_token.is_empty() {
            self.store_set(REFRESH_TOKEN_KEY, refresh_token);
        }
        self.load_from_stored_credential()
    }

    /// Clear the credential, publish anonymous and go to the sign-in screen.
    pub fn logout(&self) {
        self.store_remove(ACCESS_TOKEN_KEY);
        self.store_remove(REFRESH_TOKEN_KEY);
        self.publish(None);
        info!("Logged out");
        self.navigator.go_to(SIGN_IN_PATH);
    }

    /// Send the user to sign in (used by rejected anonymous actions).
    pub fn redirect_to_sign_in(&self) {
        self.navigator.go_to(SIGN_IN_PATH);
    }

    fn publish(&self, identity: CurrentIdentity) {
        self.identity_tx.send_replace(identity.clone());
        // Err only means nobody is subscribed
        let _ = self.changes_tx.send(identity);
    }

    // ===== Observation =====

    /// Last published identity.
    pub fn current_identity(&self) -> CurrentIdentity {
        self.identity_tx.borrow().clone()
    }

    /// Identity updates: the current value, then one item per reload.
    ///
    /// Every call returns an independent stream. It only ends when the
    /// session store itself is dropped. A subscriber that falls more than
    /// `IDENTITY_CHANGES_CAPACITY` reloads behind loses the oldest ones; a
    /// warning is logged and the stream continues with the rest.
    pub fn identity_changes(&self) -> impl Stream<Item = CurrentIdentity> + Send + Unpin + 'static {
        // Subscribe before sampling so no reload falls in between
        let updates = tokio_stream::StreamExt::filter_map(
            BroadcastStream::new(self.changes_tx.subscribe()),
            |item| match item {
                Ok(identity) => Some(identity),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "Identity subscriber lagged, skipping reloads");
                    None
                }
            },
        );
        let current = tokio_stream::once(self.current_identity());
        Box::pin(tokio_stream::StreamExt::chain(current, updates))
    }

    // ===== Authorization =====

    pub fn has_role(&self, role: &str) -> bool {
        self.identity_tx
            .borrow()
            .as_ref()
            .map(|identity| identity.has_role(role))
            .unwrap_or(false)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.identity_tx
            .borrow()
            .as_ref()
            .map(|identity| identity.has_permission(permission))
            .unwrap_or(false)
    }

    // ===== Convenience getters =====

    pub fn is_logged_in(&self) -> bool {
        self.identity_tx.borrow().is_some()
    }

    pub fn user_id(&self) -> Option<String> {
        self.identity_tx
            .borrow()
            .as_ref()
            .map(|identity| identity.subject_id.clone())
    }

    pub fn username(&self) -> String {
        self.identity_tx
            .borrow()
            .as_ref()
            .map(|identity| identity.username.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| GUEST_NAME.to_string())
    }

    pub fn avatar_url(&self) -> Option<String> {
        self.identity_tx
            .borrow()
            .as_ref()
            .and_then(|identity| identity.avatar_url.clone())
    }

    pub fn access_token(&self) -> Option<String> {
        self.store_get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.store_get(REFRESH_TOKEN_KEY)
    }

    // ===== Storage (no-op without a platform store) =====

    fn store_get(&self, key: &str) -> Option<String> {
        let store = self.store.as_ref()?;
        match store.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key = key, error = %e, "Credential store read failed");
                None
            }
        }
    }

    fn store_set(&self, key: &str, value: &str) {
        if let Some(store) = &self.store {
            if let Err(e) = store.set(key, value) {
                warn!(key = key, error = %e, "Credential store write failed");
            }
        }
    }

    fn store_remove(&self, key: &str) {
        if let Some(store) = &self.store {
            if let Err(e) = store.remove(key) {
                warn!(key = key, error = %e, "Credential store remove failed");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
