//! Subscription storage.

use barline_types::{Bar, Resolution, Symbol};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Opaque identifier handed out by [`Engine::subscribe`](crate::Engine::subscribe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Generates a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubscriptionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Callback receiving every bar produced for a subscription.
pub type BarCallback = Arc<dyn Fn(&Bar) + Send + Sync>;

/// A registered (symbol, resolution, callback) triple and its last bar.
#[derive(Clone)]
pub struct Subscription {
    /// Subscription identifier.
    pub id: SubscriptionId,
    /// Symbol the subscription watches.
    pub symbol: Symbol,
    /// Bar resolution.
    pub resolution: Resolution,
    /// Most recent bar delivered (or the seed bar).
    pub last_bar: Option<Bar>,
    /// Delivery callback.
    pub callback: BarCallback,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("symbol", &self.symbol)
            .field("resolution", &self.resolution)
            .field("last_bar", &self.last_bar)
            .finish_non_exhaustive()
    }
}

/// Thread-safe set of active subscriptions.
///
/// Subscriptions are only ever removed explicitly; nothing expires.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a subscription, replacing any existing one with the same id.
    ///
    /// Returns the replaced subscription, if any.
    pub fn add(
        &self,
        id: SubscriptionId,
        symbol: Symbol,
        resolution: Resolution,
        initial_bar: Option<Bar>,
        callback: BarCallback,
    ) -> Option<Subscription> {
        let subscription = Subscription {
            id,
            symbol,
            resolution,
            last_bar: initial_bar,
            callback,
        };
        self.subscriptions.write().insert(id, subscription)
    }

    /// Removes a subscription. Removing an unknown id is a no-op.
    pub fn remove(&self, id: SubscriptionId) -> Option<Subscription> {
        self.subscriptions.write().remove(&id)
    }

    /// Returns a copy of the subscription with the given id.
    #[must_use]
    pub fn get(&self, id: SubscriptionId) -> Option<Subscription> {
        self.subscriptions.read().get(&id).cloned()
    }

    /// Returns true if at least one subscription watches `symbol`.
    #[must_use]
    pub fn contains_symbol(&self, symbol: &Symbol) -> bool {
        self.subscriptions.read().values().any(|s| &s.symbol == symbol)
    }

    /// Returns a snapshot of every subscription watching `symbol`.
    ///
    /// The snapshot is taken at call time, so callbacks may freely add or
    /// remove subscriptions while it is being iterated.
    #[must_use]
    pub fn for_symbol(&self, symbol: &Symbol) -> std::vec::IntoIter<Subscription> {
        let mut matching: Vec<_> = self
            .subscriptions
            .read()
            .values()
            .filter(|s| &s.symbol == symbol)
            .cloned()
            .collect();
        // stable delivery order between snapshots
        matching.sort_by_key(|s| s.id);
        matching.into_iter()
    }

    /// Runs `f` against the live subscription under the write lock.
    ///
    /// Returns `None` if the subscription no longer exists.
    pub fn update<R>(&self, id: SubscriptionId, f: impl FnOnce(&mut Subscription) -> R) -> Option<R> {
        self.subscriptions.write().get_mut(&id).map(f)
    }

    /// Replaces the last bar of a subscription.
    ///
    /// Returns false if the subscription no longer exists.
    pub fn update_last_bar(&self, id: SubscriptionId, bar: Bar) -> bool {
        self.update(id, |s| s.last_bar = Some(bar)).is_some()
    }

    /// Returns the number of subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Returns true if there are no subscriptions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.read().is_empty()
    }

    /// Returns the number of subscriptions per symbol.
    #[must_use]
    pub fn per_symbol_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for subscription in self.subscriptions.read().values() {
            *counts
                .entry(subscription.symbol.as_str().to_string())
                .or_insert(0) += 1;
        }
        counts
    }

    /// Returns every resolution in use.
    #[must_use]
    pub fn resolutions(&self) -> BTreeSet<Resolution> {
        self.subscriptions
            .read()
            .values()
            .map(|s| s.resolution)
            .collect()
    }
}
