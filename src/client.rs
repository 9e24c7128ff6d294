use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use serde_json::{json, Map, Value};

use crate::engine;
use crate::error::StoreError;
use crate::firestore::{encode_fields, FirestoreClient};
use crate::models::{Dashboard, LogEntry, Profile, TimeRange, UserRecord, WeightEntry};
use crate::pairing::PairingSession;

/// Client for the MacroTrack per-user records.
///
/// Wraps the document store and the decode layer that turns loosely typed
/// stored fields into the engine's raw model.
#[derive(Clone, Default)]
pub struct MacroTrackClient {
    pub store: FirestoreClient,
}

impl MacroTrackClient {
    pub fn new() -> Self {
        Self {
            store: FirestoreClient::new(),
        }
    }

    /// Fetches the complete record for one user.
    ///
    /// Missing `history`/`weightHistory`/`profile` sections decode to empty
    /// defaults. An unknown id surfaces as [`StoreError::NotFound`].
    pub async fn fetch_record(&self, user_id: &str) -> Result<UserRecord, StoreError> {
        let user_id = user_id.trim();
        let doc = self
            .store
            .get_document(&format!("users/{}", user_id))
            .await?;

        let record = decode_record(&doc.decoded_fields());
        log::debug!(
            "fetched record for {}: {} meals, {} weigh-ins",
            user_id,
            record.history.len(),
            record.weight_history.len()
        );
        Ok(record)
    }

    /// Writes the three record sections back to the user document.
    pub async fn write_record(
        &self,
        user_id: &str,
        record: &UserRecord,
    ) -> Result<(), StoreError> {
        let data = json!({
            "profile": record.profile,
            "history": record.history,
            "weightHistory": record.weight_history,
        });
        let fields = match data.as_object() {
            Some(map) => encode_fields(map),
            None => Map::new(),
        };

        self.store
            .patch_document(
                &format!("users/{}", user_id.trim()),
                fields,
                &["profile", "history", "weightHistory"],
            )
            .await?;
        Ok(())
    }

    /// Fetches a record and runs the full derivation pass against the local
    /// calendar date.
    pub async fn fetch_dashboard(
        &self,
        user_id: &str,
        range: TimeRange,
        selected_date: Option<&str>,
    ) -> Result<Dashboard, StoreError> {
        let record = self.fetch_record(user_id).await?;
        Ok(engine::derive_dashboard(
            &record,
            range,
            selected_date,
            Local::now().date_naive(),
        ))
    }

    /// Runs the full pairing flow: create a session, wait for a device to
    /// claim it, then fetch that user's record.
    ///
    /// The caller displays [`PairingSession::session_id`] (typically as a QR
    /// code) out of band; this method resolves once the mobile app writes
    /// its user id into the session document, or fails after `timeout`.
    pub async fn pair_and_fetch(&self, timeout: Duration) -> anyhow::Result<(String, UserRecord)> {
        let session = PairingSession::begin(&self.store).await?;
        log::info!("pairing session ready: {}", session.session_id());

        let mut watch = session.watch();
        let user_id = tokio::time::timeout(timeout, watch.wait_for_user())
            .await
            .context("no device connected before the timeout")??;
        watch.finish().await?;

        let record = self
            .fetch_record(&user_id)
            .await
            .with_context(|| format!("fetching record for {}", user_id))?;
        Ok((user_id, record))
    }
}

fn parse_num(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(|v| {
        v.as_f64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    })
}

fn parse_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(|v| v.as_str()).map(String::from)
}

fn decode_log_entry(value: &Value) -> Option<LogEntry> {
    let obj = value.as_object()?;
    Some(LogEntry {
        date: parse_str(obj, "date")?,
        name: parse_str(obj, "name"),
        calories: parse_num(obj, "calories"),
        protein: parse_num(obj, "p"),
        carbs: parse_num(obj, "c"),
        fat: parse_num(obj, "f"),
    })
}

fn decode_weight_entry(value: &Value) -> Option<WeightEntry> {
    let obj = value.as_object()?;
    Some(WeightEntry {
        date: parse_str(obj, "date")?,
        weight: parse_num(obj, "weight"),
    })
}

fn decode_profile(value: Option<&Value>) -> Profile {
    let Some(obj) = value.and_then(|v| v.as_object()) else {
        return Profile::default();
    };
    Profile {
        daily_goal: parse_num(obj, "dailyGoal"),
        target_protein: parse_num(obj, "targetP"),
        target_carbs: parse_num(obj, "targetC"),
        target_fat: parse_num(obj, "targetF"),
    }
}

/// Decodes a user document's fields into the raw record model.
///
/// Entries without a date are dropped; every numeric field tolerates
/// number or numeric-string storage and decodes to `None` otherwise.
fn decode_record(data: &Value) -> UserRecord {
    let entries = |key: &str| -> Vec<Value> {
        data.get(key)
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default()
    };

    UserRecord {
        profile: decode_profile(data.get("profile")),
        history: entries("history")
            .iter()
            .filter_map(decode_log_entry)
            .collect(),
        weight_history: entries("weightHistory")
            .iter()
            .filter_map(decode_weight_entry)
            .collect(),
    }
}
