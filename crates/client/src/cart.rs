//! The shopping cart, persisted as a whole under [`CART_KEY`].
//!
//! The cart is read from storage once, on first use, and kept in memory
//! afterwards. Every mutation writes the full list back and then notifies
//! subscribers. Storage failures are logged and never surface to callers: a
//! cart that cannot be read starts empty, and a cart that cannot be written
//! keeps working from memory.

use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex, PoisonError};

use rust_decimal::Decimal;

use velvet_core::{CartItem, Product, ProductId};

use crate::session::SubscriptionId;
use crate::storage::Storage;

/// Storage key holding the serialized cart.
pub const CART_KEY: &str = "cart";

type Observer = Arc<dyn Fn() + Send + Sync>;

/// In-memory cart backed by a [`Storage`].
pub struct CartStore<S> {
    storage: Arc<S>,
    /// `None` until the first hydration from storage.
    items: Mutex<Option<Vec<CartItem>>>,
    observers: Mutex<Vec<(SubscriptionId, Observer)>>,
    next_id: AtomicU64,
}

/// What a mutation did to the cart.
enum Change {
    Changed(Vec<CartItem>),
    Unchanged,
}

impl<S: Storage> CartStore<S> {
    #[must_use]
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            items: Mutex::new(None),
            observers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Every line in the cart, in insertion order.
    pub async fn get_items(&self) -> Vec<CartItem> {
        self.hydrate().await;
        self.lock_items().clone().unwrap_or_default()
    }

    /// Add one unit of `product`.
    pub async fn add_to_cart(&self, product: Product) {
        self.mutate(|items| {
            if let Some(item) = items
                .iter_mut()
                .find(|i| i.product_id() == Some(product.id))
            {
                item.quantity = item.quantity.saturating_add(1);
            } else {
                items.push(CartItem::new(product));
            }
            true
        })
        .await;
    }

    /// Remove one unit of the product; the line goes away at zero.
    /// Does nothing if the product is not in the cart.
    pub async fn remove_from_cart(&self, product_id: ProductId) {
        self.mutate(|items| {
            let Some(item) = items
                .iter_mut()
                .find(|i| i.product_id() == Some(product_id))
            else {
                return false;
            };

            if item.quantity > 1 {
                item.quantity -= 1;
            } else {
                items.retain(|i| i.product_id() != Some(product_id));
            }
            true
        })
        .await;
    }

    /// Remove the product's line whatever its quantity.
    /// Does nothing if the product is not in the cart.
    pub async fn remove_completely(&self, product_id: ProductId) {
        self.mutate(|items| {
            let before = items.len();
            items.retain(|i| i.product_id() != Some(product_id));
            items.len() != before
        })
        .await;
    }

    /// Empty the cart. Always persists and notifies.
    pub async fn clear_cart(&self) {
        self.mutate(|items| {
            items.clear();
            true
        })
        .await;
    }

    /// Total number of units across all lines.
    ///
    /// Reads memory only; zero before the cart has been loaded.
    #[must_use]
    pub fn total_item_count(&self) -> u32 {
        self.lock_items()
            .as_deref()
            .unwrap_or_default()
            .iter()
            .fold(0u32, |total, item| total.saturating_add(item.quantity))
    }

    /// Sum of price times quantity across all lines.
    ///
    /// Reads memory only; lines without a product count as zero. A total
    /// beyond the range of `Decimal` saturates at `Decimal::MAX`.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        let total = self
            .lock_items()
            .as_deref()
            .unwrap_or_default()
            .iter()
            .try_fold(Decimal::ZERO, |total, item| {
                total.checked_add(item.line_total()?)
            });

        total.unwrap_or_else(|| {
            tracing::warn!("Cart total overflowed, stored cart is likely corrupt");
            Decimal::MAX
        })
    }

    /// Call `observer` after every mutation that changes the cart.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
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

    fn lock_items(&self) -> std::sync::MutexGuard<'_, Option<Vec<CartItem>>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load the cart from storage the first time it is needed.
    async fn hydrate(&self) {
        if self.lock_items().is_some() {
            return;
        }

        let loaded = self.read_stored().await;

        let mut items = self.lock_items();
        if items.is_none() {
            tracing::debug!(lines = loaded.len(), "Cart loaded");
            *items = Some(loaded);
        }
    }

    async fn read_stored(&self) -> Vec<CartItem> {
        match self.storage.get_item(CART_KEY).await {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Stored cart is unreadable, starting empty");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read stored cart, starting empty");
                Vec::new()
            }
        }
    }

    /// Apply `edit` to the hydrated cart; if it reports a change, persist the
    /// new contents and notify.
    async fn mutate<F>(&self, edit: F)
    where
        F: FnOnce(&mut Vec<CartItem>) -> bool,
    {
        self.hydrate().await;

        let change = {
            let mut guard = self.lock_items();
            let items = guard.get_or_insert_with(Vec::new);
            if edit(items) {
                Change::Changed(items.clone())
            } else {
                Change::Unchanged
            }
        };

        if let Change::Changed(snapshot) = change {
            self.save(&snapshot).await;
            self.notify();
        }
    }

    async fn save(&self, items: &[CartItem]) {
        let json = match serde_json::to_string(items) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Could not serialize cart");
                return;
            }
        };

        if let Err(e) = self.storage.set_item(CART_KEY, &json).await {
            tracing::warn!(error = %e, "Could not persist cart");
        }
    }

    fn notify(&self) {
        let observers: Vec<Observer> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in observers {
            observer();
        }
    }
}
