//! Per-conversation session state and the session store
//!
//! A [`Session`] is the whole slot record for one conversation. Its fields are
//! private; the mutators below are the only way to change them and they keep
//! the cache and awaiting-flag invariants intact.
//!
//! The [`SessionStore`] hands out one [`SessionLease`] per session id at a
//! time, so two turns for the same conversation never interleave their
//! read-modify-write.

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::canteen::CanteenId;
use crate::menu::{Menu, MenuQuery};

/// Default idle timeout: 60 minutes
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 3600;

/// Unique session identifier, supplied by the runtime
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(format!("session:{}", Uuid::new_v4()))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Conversation state, derived from session slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    /// Nothing pending
    Idle,
    /// Asked the user which canteen to check
    AwaitingCanteen,
    /// Listed categories, waiting for a choice
    AwaitingCategory,
    /// Showed a category, waiting for another choice
    ShowingCategory,
}

/// Slot record of one conversation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    canteen: Option<CanteenId>,
    date: Option<NaiveDate>,
    category: Option<String>,
    pending_category: Option<String>,
    awaiting_canteen: bool,
    awaiting_category: bool,
    cached_menu: Option<Menu>,
    available_categories: Vec<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn canteen(&self) -> Option<&CanteenId> {
        self.canteen.as_ref()
    }

    /// Explicitly set date, if any
    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// Date the next lookup will use
    pub fn effective_date(&self, today: NaiveDate) -> NaiveDate {
        self.date.unwrap_or(today)
    }

    /// Category most recently shown
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn pending_category(&self) -> Option<&str> {
        self.pending_category.as_deref()
    }

    pub fn is_awaiting_canteen(&self) -> bool {
        self.awaiting_canteen
    }

    pub fn is_awaiting_category(&self) -> bool {
        self.awaiting_category
    }

    pub fn cached_menu(&self) -> Option<&Menu> {
        self.cached_menu.as_ref()
    }

    pub fn available_categories(&self) -> &[String] {
        &self.available_categories
    }

    /// Query the next lookup would issue, if a canteen is known
    pub fn query(&self, today: NaiveDate) -> Option<MenuQuery> {
        self.canteen
            .clone()
            .map(|canteen| MenuQuery::new(canteen, self.effective_date(today)))
    }

    /// Cached menu, but only if it belongs to `query`
    pub fn cached_menu_for(&self, query: &MenuQuery) -> Option<&Menu> {
        self.cached_menu.as_ref().filter(|m| &m.query == query)
    }

    pub fn state(&self) -> DialogueState {
        if self.awaiting_canteen {
            DialogueState::AwaitingCanteen
        } else if self.category.is_some() && self.cached_menu.is_some() {
            DialogueState::ShowingCategory
        } else if self.awaiting_category {
            DialogueState::AwaitingCategory
        } else {
            DialogueState::Idle
        }
    }

    /// A category flow is in progress (categories listed or shown)
    pub fn in_category_flow(&self) -> bool {
        self.awaiting_category || self.cached_menu.is_some()
    }

    /// Set the canteen; returns true (and drops the cache) when it changed
    pub fn set_canteen(&mut self, canteen: CanteenId) -> bool {
        if self.canteen.as_ref() == Some(&canteen) {
            return false;
        }
        self.canteen = Some(canteen);
        self.invalidate_cache();
        true
    }

    /// Set the date; returns true (and drops the cache) when the effective
    /// date changed
    pub fn set_date(&mut self, date: NaiveDate, today: NaiveDate) -> bool {
        let changed = self.effective_date(today) != date;
        self.date = Some(date);
        if changed {
            self.invalidate_cache();
        }
        changed
    }

    /// Drop the cached menu and everything derived from it
    pub fn invalidate_cache(&mut self) {
        self.cached_menu = None;
        self.available_categories.clear();
        self.category = None;
        self.awaiting_category = false;
    }

    pub fn await_canteen(&mut self) {
        self.awaiting_canteen = true;
        self.awaiting_category = false;
    }

    pub fn stop_awaiting_canteen(&mut self) {
        self.awaiting_canteen = false;
    }

    /// Store a freshly parsed menu and start waiting for a category choice
    pub fn cache_menu(&mut self, menu: Menu) {
        self.available_categories = menu.category_names();
        self.cached_menu = Some(menu);
        self.category = None;
        self.awaiting_canteen = false;
        self.awaiting_category = true;
    }

    /// Re-enter the category prompt for an already cached menu
    pub fn await_category(&mut self) {
        if self.cached_menu.is_some() {
            self.awaiting_canteen = false;
            self.awaiting_category = true;
        }
    }

    /// Remember the category just shown
    pub fn show_category(&mut self, name: impl Into<String>) {
        self.category = Some(name.into());
        self.awaiting_canteen = false;
        self.awaiting_category = true;
    }

    pub fn set_pending_category(&mut self, category: impl Into<String>) {
        self.pending_category = Some(category.into());
    }

    pub fn take_pending_category(&mut self) -> Option<String> {
        self.pending_category.take()
    }

    /// Nothing to offer for the current lookup
    pub fn end_flow(&mut self) {
        self.awaiting_canteen = false;
        self.awaiting_category = false;
    }

    /// Forget every slot
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Drop a cached menu that no longer matches the current lookup, e.g.
    /// after midnight for a session without an explicit date
    pub fn drop_stale_cache(&mut self, today: NaiveDate) -> bool {
        let stale = match &self.cached_menu {
            Some(menu) => self.query(today).as_ref() != Some(&menu.query),
            None => false,
        };
        if stale {
            self.invalidate_cache();
        }
        stale
    }

    /// True when the record satisfies the session invariants as of `today`
    pub fn invariants_hold(&self, today: NaiveDate) -> bool {
        let flags_exclusive = !(self.awaiting_canteen && self.awaiting_category);
        let categories_match = match &self.cached_menu {
            Some(menu) => self.available_categories == menu.category_names(),
            None => self.available_categories.is_empty(),
        };
        let cache_matches_slots = match &self.cached_menu {
            Some(menu) => self.query(today).as_ref() == Some(&menu.query),
            None => true,
        };
        flags_exclusive && categories_match && cache_matches_slots
    }

    /// Serialize into the opaque blob kept by the runtime
    pub fn to_blob(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restore from a blob written by [`to_blob`](Self::to_blob)
    pub fn from_blob(blob: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(blob)?)
    }
}

#[derive(Debug)]
struct SessionSlot {
    session: Option<Session>,
    last_activity: DateTime<Utc>,
}

impl SessionSlot {
    fn is_expired(&self, now: DateTime<Utc>, timeout_secs: u64) -> bool {
        let elapsed = (now - self.last_activity).num_seconds().max(0) as u64;
        elapsed > timeout_secs
    }
}

/// Exclusive access to one session for the duration of a turn
#[derive(Debug)]
pub struct SessionLease {
    id: SessionId,
    now: DateTime<Utc>,
    guard: OwnedMutexGuard<SessionSlot>,
}

impl SessionLease {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Current session, or a fresh one when none exists
    pub fn get(&self) -> Session {
        self.guard.session.clone().unwrap_or_default()
    }

    /// Replace the whole session record
    pub fn put(&mut self, session: Session) {
        self.guard.session = Some(session);
        self.guard.last_activity = self.now;
    }
}

/// In-memory session store with per-session locking and idle expiry
#[derive(Debug)]
pub struct SessionStore {
    slots: RwLock<HashMap<SessionId, Arc<Mutex<SessionSlot>>>>,
    timeout_secs: u64,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TIMEOUT_SECS)
    }
}

impl SessionStore {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            timeout_secs,
        }
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    fn slot(&self, id: &SessionId, now: DateTime<Utc>) -> Arc<Mutex<SessionSlot>> {
        if let Some(slot) = self.slots.read().get(id) {
            return slot.clone();
        }
        self.slots
            .write()
            .entry(id.clone())
            .or_insert_with(|| {
                tracing::info!("Session created: {}", id);
                Arc::new(Mutex::new(SessionSlot {
                    session: None,
                    last_activity: now,
                }))
            })
            .clone()
    }

    fn existing_slot(&self, id: &SessionId) -> Option<Arc<Mutex<SessionSlot>>> {
        let slots = self.slots.read();
        slots.get(id).cloned()
    }

    /// Lock a session for one turn
    pub async fn checkout(&self, id: &SessionId) -> SessionLease {
        self.checkout_at(id, Utc::now()).await
    }

    /// Lock a session for one turn, judging expiry against `now`
    pub async fn checkout_at(&self, id: &SessionId, now: DateTime<Utc>) -> SessionLease {
        let mut guard = loop {
            let slot = self.slot(id, now);
            let guard = slot.clone().lock_owned().await;
            // A sweep may have removed the slot while we waited for it
            let live = self
                .existing_slot(id)
                .map_or(false, |current| Arc::ptr_eq(&current, &slot));
            if live {
                break guard;
            }
            tracing::debug!("Session slot was swept while waiting, retrying: {}", id);
        };
        if guard.session.is_some() && guard.is_expired(now, self.timeout_secs) {
            tracing::info!("Session expired, starting fresh: {}", id);
            guard.session = None;
        }
        SessionLease {
            id: id.clone(),
            now,
            guard,
        }
    }

    /// Copy of a stored session, without touching its activity time
    pub async fn snapshot(&self, id: &SessionId) -> Option<Session> {
        let slot = self.existing_slot(id)?;
        let guard = slot.lock().await;
        guard.session.clone()
    }

    /// Forget a session; waits for a running turn on it to finish
    pub async fn reset(&self, id: &SessionId) -> bool {
        let Some(slot) = self.existing_slot(id) else {
            return false;
        };
        let mut guard = slot.lock().await;
        let existed = guard.session.take().is_some();
        tracing::info!("Session reset: {}", id);
        existed
    }

    /// Remove idle sessions; sessions in use are skipped
    pub fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(Utc::now())
    }

    pub fn cleanup_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut slots = self.slots.write();
        let before = slots.len();
        slots.retain(|id, slot| match slot.try_lock() {
            Ok(guard) => {
                let expired = guard.is_expired(now, self.timeout_secs);
                if expired {
                    tracing::info!("Session expired and removed: {}", id);
                }
                !expired
            }
            Err(_) => true,
        });
        before - slots.len()
    }

    pub fn session_count(&self) -> usize {
        self.slots.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::{Category, MenuItem};
    use chrono::Duration;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn menu_for(canteen: &str, date: NaiveDate) -> Menu {
        Menu::new(
            MenuQuery::new(CanteenId::new(canteen), date),
            vec![
                Category::new("Suppen", vec![MenuItem::new("Linsensuppe")]),
                Category::new("Leer", vec![]),
                Category::new("Desserts", vec![MenuItem::new("Obstsalat")]),
            ],
        )
    }

    fn cached_session() -> Session {
        let mut session = Session::new();
        session.set_canteen(CanteenId::new("1004"));
        session.cache_menu(menu_for("1004", day(21)));
        session
    }

    #[test]
    fn test_fresh_session_is_idle() {
        let session = Session::new();
        assert_eq!(session.state(), DialogueState::Idle);
        assert!(session.invariants_hold(day(21)));
        assert_eq!(session.effective_date(day(21)), day(21));
    }

    #[test]
    fn test_cache_menu_derives_categories() {
        let session = cached_session();
        assert_eq!(session.available_categories(), ["Suppen", "Desserts"]);
        assert_eq!(session.state(), DialogueState::AwaitingCategory);
        assert!(session.invariants_hold(day(21)));
    }

    #[test]
    fn test_canteen_change_invalidates() {
        let mut session = cached_session();
        assert!(!session.set_canteen(CanteenId::new("1004")));
        assert!(session.cached_menu().is_some());

        assert!(session.set_canteen(CanteenId::new("1010")));
        assert!(session.cached_menu().is_none());
        assert!(session.available_categories().is_empty());
        assert!(!session.is_awaiting_category());
        assert!(session.invariants_hold(day(21)));
    }

    #[test]
    fn test_date_change_compares_effective_date() {
        let mut session = cached_session();
        // explicit "today" is not a change
        assert!(!session.set_date(day(21), day(21)));
        assert!(session.cached_menu().is_some());

        assert!(session.set_date(day(22), day(21)));
        assert!(session.cached_menu().is_none());
        assert_eq!(session.date(), Some(day(22)));
    }

    #[test]
    fn test_flags_mutually_exclusive() {
        let mut session = cached_session();
        session.await_canteen();
        assert!(session.is_awaiting_canteen());
        assert!(!session.is_awaiting_category());
        session.await_category();
        assert!(!session.is_awaiting_canteen());
        assert!(session.is_awaiting_category());
        assert!(session.invariants_hold(day(21)));
    }

    #[test]
    fn test_show_category_state() {
        let mut session = cached_session();
        session.show_category("Desserts");
        assert_eq!(session.state(), DialogueState::ShowingCategory);
        assert_eq!(session.category(), Some("Desserts"));
    }

    #[test]
    fn test_cache_goes_stale_at_midnight() {
        let mut session = cached_session();
        assert!(!session.drop_stale_cache(day(21)));
        assert!(!session.invariants_hold(day(22)));

        assert!(session.drop_stale_cache(day(22)));
        assert!(session.cached_menu().is_none());
        assert!(session.available_categories().is_empty());
        assert!(!session.is_awaiting_category());
        assert_eq!(session.canteen(), Some(&CanteenId::new("1004")));
        assert!(session.invariants_hold(day(22)));
    }

    #[test]
    fn test_explicit_date_keeps_cache_across_midnight() {
        let mut session = Session::new();
        session.set_canteen(CanteenId::new("1004"));
        session.set_date(day(23), day(21));
        session.cache_menu(menu_for("1004", day(23)));
        assert!(!session.drop_stale_cache(day(22)));
        assert!(session.invariants_hold(day(22)));
    }

    #[test]
    fn test_cached_menu_for_checks_query() {
        let session = cached_session();
        let hit = MenuQuery::new(CanteenId::new("1004"), day(21));
        let miss = MenuQuery::new(CanteenId::new("1004"), day(22));
        assert!(session.cached_menu_for(&hit).is_some());
        assert!(session.cached_menu_for(&miss).is_none());
    }

    #[test]
    fn test_blob_roundtrip_preserves_cache() {
        let mut session = cached_session();
        session.show_category("Suppen");
        let blob = session.to_blob().unwrap();
        let restored = Session::from_blob(&blob).unwrap();
        assert_eq!(restored, session);
        assert!(Session::from_blob("not json").is_err());
    }

    #[tokio::test]
    async fn test_store_get_put() {
        let store = SessionStore::default();
        let id = SessionId::from("abc");

        let mut lease = store.checkout(&id).await;
        let mut session = lease.get();
        assert_eq!(session, Session::new());
        session.set_canteen(CanteenId::new("1010"));
        lease.put(session.clone());
        drop(lease);

        assert_eq!(store.snapshot(&id).await, Some(session));
        assert_eq!(store.session_count(), 1);
    }

    #[tokio::test]
    async fn test_store_expiry_yields_fresh_session() {
        let store = SessionStore::new(3600);
        let id = SessionId::new();
        let start = Utc::now();

        let mut lease = store.checkout_at(&id, start).await;
        let mut session = lease.get();
        session.set_canteen(CanteenId::new("1004"));
        lease.put(session);
        drop(lease);

        let lease = store.checkout_at(&id, start + Duration::minutes(59)).await;
        assert!(lease.get().canteen().is_some());
        drop(lease);

        let lease = store.checkout_at(&id, start + Duration::minutes(61)).await;
        assert_eq!(lease.get(), Session::new());
    }

    #[tokio::test]
    async fn test_store_cleanup_and_reset() {
        let store = SessionStore::new(60);
        let start = Utc::now();
        for name in ["a", "b"] {
            let mut lease = store.checkout_at(&SessionId::from(name), start).await;
            lease.put(Session::new());
        }

        let held = store.checkout_at(&SessionId::from("c"), start).await;
        assert_eq!(store.cleanup_expired_at(start + Duration::seconds(30)), 0);
        // "c" is leased, so it survives the sweep
        assert_eq!(store.cleanup_expired_at(start + Duration::seconds(120)), 2);
        assert_eq!(store.session_count(), 1);
        drop(held);

        assert!(!store.reset(&SessionId::from("missing")).await);
    }

    #[tokio::test]
    async fn test_store_serializes_same_session() {
        let store = Arc::new(SessionStore::default());
        let id = SessionId::from("shared");

        let lease = store.checkout(&id).await;
        let store2 = store.clone();
        let id2 = id.clone();
        let waiter = tokio::spawn(async move {
            let lease = store2.checkout(&id2).await;
            lease.get()
        });

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        let mut lease = lease;
        let mut session = lease.get();
        session.set_canteen(CanteenId::new("2456"));
        lease.put(session);
        drop(lease);

        let seen = waiter.await.unwrap();
        assert_eq!(seen.canteen(), Some(&CanteenId::new("2456")));
    }

    #[tokio::test]
    async fn test_checkout_after_sweep_writes_to_live_slot() {
        let store = Arc::new(SessionStore::default());
        let id = SessionId::from("swept");

        let held = store.checkout(&id).await;
        let store2 = store.clone();
        let id2 = id.clone();
        let waiter = tokio::spawn(async move {
            let mut lease = store2.checkout(&id2).await;
            let mut session = lease.get();
            session.set_canteen(CanteenId::new("1004"));
            lease.put(session);
        });

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        // The waiter already holds the old slot when the entry disappears
        store.slots.write().remove(&id);
        drop(held);
        waiter.await.unwrap();

        let stored = store.snapshot(&id).await.expect("write reached the store");
        assert_eq!(stored.canteen(), Some(&CanteenId::new("1004")));
        assert_eq!(store.session_count(), 1);
    }
}
