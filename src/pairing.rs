//! Device-pairing handshake.
//!
//! The dashboard publishes a short-lived session document under a random
//! key and shows that key to the user (as a QR code). The mobile app
//! writes its user id into the document; the watch here polls until that
//! field appears and resolves to the id. Dropping the watch releases it.

use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use serde_json::{json, Map};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{PairingError, StoreError};
use crate::firestore::{encode_fields, FirestoreClient};

const SESSION_COLLECTION: &str = "login_sessions";
const SESSION_ID_LEN: usize = 13;
const POLL_INTERVAL: Duration = Duration::from_millis(1500);

const SESSION_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// A random base36 session key, matching the ids the dashboard has always
/// issued.
pub fn new_session_id() -> String {
    let mut rng = rand::thread_rng();
    (0..SESSION_ID_LEN)
        .map(|_| SESSION_ALPHABET[rng.gen_range(0..SESSION_ALPHABET.len())] as char)
        .collect()
}

fn session_path(session_id: &str) -> String {
    format!("{}/{}", SESSION_COLLECTION, session_id)
}

/// An open pairing session, not yet watched.
pub struct PairingSession {
    session_id: String,
    store: FirestoreClient,
}

impl PairingSession {
    /// Creates the session document in its initial `waiting` state.
    pub async fn begin(store: &FirestoreClient) -> Result<Self, StoreError> {
        let session_id = new_session_id();
        let body = json!({
            "status": "waiting",
            "created": Utc::now().to_rfc3339(),
        });
        let fields = match body.as_object() {
            Some(map) => encode_fields(map),
            None => Map::new(),
        };

        store
            .patch_document(&session_path(&session_id), fields, &["status", "created"])
            .await?;
        log::debug!("created pairing session {}", session_id);

        Ok(Self {
            session_id,
            store: store.clone(),
        })
    }

    /// The key the user's device must claim.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Starts watching the session document for a `userId` field.
    ///
    /// Polls the store on a fixed interval in a background task. Transient
    /// read failures are logged and polling continues; the task ends once
    /// an id arrives.
    pub fn watch(self) -> SessionWatch {
        let (tx, rx) = watch::channel(None::<String>);
        let store = self.store.clone();
        let path = session_path(&self.session_id);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(POLL_INTERVAL);
            loop {
                ticker.tick().await;
                match store.get_document(&path).await {
                    Ok(doc) => {
                        let data = doc.decoded_fields();
                        if let Some(user_id) = data.get("userId").and_then(|v| v.as_str()) {
                            if !user_id.is_empty() {
                                log::info!("pairing session claimed by {}", user_id);
                                let _ = tx.send(Some(user_id.to_string()));
                                break;
                            }
                        }
                    }
                    // The write may not be visible yet; keep waiting.
                    Err(StoreError::NotFound(_)) => {}
                    Err(err) => log::warn!("pairing poll failed: {}", err),
                }
            }
        });

        SessionWatch {
            session_id: self.session_id,
            store: self.store,
            task,
            rx,
        }
    }
}

/// A live watch on a pairing session.
///
/// Dropping the watch aborts the poll task, so a caller that stops waiting
/// never leaves a background subscription behind.
pub struct SessionWatch {
    session_id: String,
    store: FirestoreClient,
    task: JoinHandle<()>,
    rx: watch::Receiver<Option<String>>,
}

impl SessionWatch {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Resolves to the user id once a device claims the session.
    ///
    /// Callers bound the wait with `tokio::time::timeout`; cancelling the
    /// future leaves the watch intact for a later retry.
    pub async fn wait_for_user(&mut self) -> Result<String, PairingError> {
        loop {
            if let Some(user_id) = self.rx.borrow_and_update().as_ref() {
                return Ok(user_id.clone());
            }
            self.rx.changed().await.map_err(|_| PairingError::Closed)?;
        }
    }

    /// Stops the watch and deletes the session document.
    pub async fn finish(self) -> Result<(), StoreError> {
        self.task.abort();
        self.store
            .delete_document(&session_path(&self.session_id))
            .await
    }
}

impl Drop for SessionWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}
