//! The cart store: in-memory cart plus write-behind persistence.
//!
//! # Architecture
//!
//! - The [`Cart`] lives behind a mutex; every mutation is applied there
//!   synchronously, so [`CartStore::products`] reflects it immediately
//! - Each mutation snapshots the whole cart (as JSON) under the same lock and
//!   queues it for a single background writer task
//! - The writer applies snapshots strictly in issuance order, so the slot
//!   always ends up holding the latest cart
//! - Every mutation returns a [`PendingWrite`] resolving to the write's
//!   result; it may be awaited or dropped
//!
//! # Hydration
//!
//! On startup the persisted slot is read and, if it holds a cart, replaces the
//! (empty) in-memory cart. [`CartStore::open`] does this in the background and
//! the store is usable right away; [`CartStore::load`] waits for it.
//!
//! Mutations made while hydration is still running are applied to memory at
//! once and recorded. When the snapshot arrives they are replayed on top of it,
//! and only then are their writes queued. Nothing is written to the slot
//! before it has been read.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use pocket_cart_core::{Cart, CatalogItem, ProductId};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::CartConfig;
use crate::error::{CartError, Result};
use crate::storage::{KeyValueStore, StorageKey};

// =============================================================================
// Hydration
// =============================================================================

/// Outcome of loading the persisted cart at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hydration {
    /// A snapshot was found and loaded; holds its number of line items.
    Restored(usize),
    /// The slot was empty; the cart starts empty.
    Empty,
    /// The snapshot could not be used; the cart starts empty.
    Discarded(DiscardReason),
}

/// Why a persisted snapshot was not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// The slot could not be read.
    Unreadable(String),
    /// The slot's contents do not parse as a cart.
    Corrupted(String),
}

/// Handle to a background hydration started by [`CartStore::open`].
///
/// Dropping it does not cancel hydration.
#[derive(Debug)]
pub struct HydrationHandle {
    task: JoinHandle<Result<Hydration>>,
}

impl HydrationHandle {
    /// Wait for hydration to finish.
    ///
    /// # Errors
    ///
    /// Returns the hydration error in strict mode, or
    /// `CartError::Hydration` if the task panicked.
    pub async fn outcome(self) -> Result<Hydration> {
        self.task.await?
    }
}

// =============================================================================
// PendingWrite
// =============================================================================

/// Completion of the persistence write issued by a mutation.
///
/// Resolves once the writer has stored the snapshot taken by that mutation.
/// The in-memory cart is already updated when this is returned; awaiting it
/// only observes persistence. A failed write is never rolled back.
///
/// A mutation made during hydration resolves only after hydration has
/// finished and the merged cart has been written.
#[derive(Debug)]
pub struct PendingWrite {
    done: oneshot::Receiver<Result<()>>,
}

impl Future for PendingWrite {
    type Output = Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().done)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(CartError::WriterClosed)))
    }
}

// =============================================================================
// Writer task
// =============================================================================

enum WriteCommand {
    Save {
        revision: u64,
        payload: String,
        done: oneshot::Sender<Result<()>>,
    },
    Flush(oneshot::Sender<()>),
}

/// Apply queued snapshots in order until every store handle is dropped.
async fn run_writer<S: KeyValueStore>(
    storage: Arc<S>,
    key: StorageKey,
    mut commands: mpsc::UnboundedReceiver<WriteCommand>,
) {
    while let Some(command) = commands.recv().await {
        match command {
            WriteCommand::Save {
                revision,
                payload,
                done,
            } => {
                let result = storage
                    .set_item(key.as_str(), &payload)
                    .await
                    .map_err(CartError::from);

                match &result {
                    Ok(()) => debug!(%key, revision, "Persisted cart"),
                    Err(e) => warn!(%key, revision, error = %e, "Failed to persist cart"),
                }

                // Receiver may have been dropped (fire-and-forget)
                let _ = done.send(result);
            }
            WriteCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    debug!(%key, "Cart writer stopped");
}

// =============================================================================
// CartStore
// =============================================================================

/// Cart state container with write-behind persistence.
///
/// Cheaply cloneable via `Arc`; all clones share one cart and one writer.
///
/// All constructors spawn onto the current Tokio runtime.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    key: StorageKey,
    state: Mutex<CartState>,
    writes: mpsc::UnboundedSender<WriteCommand>,
}

struct CartState {
    cart: Cart,
    /// Number of mutations applied so far.
    revision: u64,
    persistence: Persistence,
}

/// Whether writes may reach the slot yet.
enum Persistence {
    /// The slot has not been read; mutations are recorded for replay.
    Hydrating {
        replay: Vec<CartOp>,
        waiting: Vec<Waiter>,
    },
    Ready,
    /// Strict hydration failed; the slot is left untouched.
    Disabled,
}

/// A caller waiting on a write or flush issued during hydration.
enum Waiter {
    Save(oneshot::Sender<Result<()>>),
    Flush(oneshot::Sender<()>),
}

#[derive(Debug)]
enum CartOp {
    Add(CatalogItem),
    Increment(ProductId),
    Decrement(ProductId),
}

impl CartOp {
    /// Apply to `cart`, returning whether a line changed.
    fn apply(&self, cart: &mut Cart) -> bool {
        match self {
            Self::Add(item) => {
                let outcome = cart.add(item.clone());
                debug!(product = %item.id, ?outcome, "Added to cart");
                true
            }
            Self::Increment(id) => {
                let found = cart.increment(id);
                debug!(product = %id, found, "Incremented quantity");
                found
            }
            Self::Decrement(id) => {
                let found = cart.decrement(id);
                debug!(product = %id, found, "Decremented quantity");
                found
            }
        }
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock_state();
        f.debug_struct("CartStore")
            .field("key", &self.inner.key)
            .field("revision", &state.revision)
            .field("lines", &state.cart.len())
            .finish()
    }
}

impl CartStoreInner {
    fn lock_state(&self) -> MutexGuard<'_, CartState> {
        // Mutations never panic while holding the lock
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a write of `cart`. Must be called with the state lock held so
    /// queue order matches mutation order.
    fn queue_save(&self, revision: u64, cart: &Cart, done: oneshot::Sender<Result<()>>) {
        let payload = match serde_json::to_string(cart) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(revision, error = %e, "Failed to serialize cart");
                let _ = done.send(Err(CartError::Serialization(e)));
                return;
            }
        };

        // On a closed writer `done` is dropped and the caller sees WriterClosed
        let _ = self.writes.send(WriteCommand::Save {
            revision,
            payload,
            done,
        });
    }
}

impl CartStore {
    /// Open a store and hydrate it in the background.
    ///
    /// The returned store is usable immediately and starts empty. Mutations
    /// made before hydration completes are replayed onto the persisted cart.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn open<S>(storage: S, config: &CartConfig) -> (Self, HydrationHandle)
    where
        S: KeyValueStore + 'static,
    {
        let storage = Arc::new(storage);
        let store = Self::spawn(Arc::clone(&storage), config.storage_key());

        let hydrating = store.clone();
        let strict = config.strict_hydration;
        let task = tokio::spawn(async move { hydrating.hydrate(storage.as_ref(), strict).await });

        (store, HydrationHandle { task })
    }

    /// Open a store and wait for hydration to complete.
    ///
    /// # Errors
    ///
    /// In strict mode, returns `CartError::Storage` if the slot cannot be read
    /// and `CartError::CorruptSnapshot` if it does not parse. Otherwise these
    /// are reported as [`Hydration::Discarded`].
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub async fn load<S>(storage: S, config: &CartConfig) -> Result<(Self, Hydration)>
    where
        S: KeyValueStore + 'static,
    {
        let storage = Arc::new(storage);
        let store = Self::spawn(Arc::clone(&storage), config.storage_key());
        let hydration = store
            .hydrate(storage.as_ref(), config.strict_hydration)
            .await?;
        Ok((store, hydration))
    }

    fn spawn<S>(storage: Arc<S>, key: StorageKey) -> Self
    where
        S: KeyValueStore + 'static,
    {
        let (writes, commands) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(storage, key.clone(), commands));

        Self {
            inner: Arc::new(CartStoreInner {
                key,
                state: Mutex::new(CartState {
                    cart: Cart::new(),
                    revision: 0,
                    persistence: Persistence::Hydrating {
                        replay: Vec::new(),
                        waiting: Vec::new(),
                    },
                }),
                writes,
            }),
        }
    }

    #[instrument(skip(self, storage), fields(key = %self.inner.key))]
    async fn hydrate<S>(&self, storage: &S, strict: bool) -> Result<Hydration>
    where
        S: KeyValueStore + ?Sized,
    {
        match read_snapshot(storage, self.inner.key.as_str(), strict).await {
            Ok((snapshot, hydration)) => {
                self.finish_hydration(snapshot);
                Ok(hydration)
            }
            Err(e) => {
                self.disable_persistence();
                Err(e)
            }
        }
    }

    /// Install `snapshot`, replay early mutations onto it and release their
    /// writes.
    fn finish_hydration(&self, snapshot: Option<Cart>) {
        let mut guard = self.inner.lock_state();
        let state = &mut *guard;
        let Persistence::Hydrating { replay, waiting } =
            std::mem::replace(&mut state.persistence, Persistence::Ready)
        else {
            return;
        };

        if let Some(mut cart) = snapshot {
            for op in &replay {
                op.apply(&mut cart);
            }
            state.cart = cart;
        }
        if !replay.is_empty() {
            info!(
                replayed = replay.len(),
                lines = state.cart.len(),
                "Applied cart changes made during hydration"
            );
        }

        for waiter in waiting {
            match waiter {
                Waiter::Save(done) => self.inner.queue_save(state.revision, &state.cart, done),
                Waiter::Flush(done) => {
                    let _ = self.inner.writes.send(WriteCommand::Flush(done));
                }
            }
        }
    }

    /// Stop all writes after a failed strict hydration.
    fn disable_persistence(&self) {
        let mut state = self.inner.lock_state();
        let Persistence::Hydrating { waiting, .. } =
            std::mem::replace(&mut state.persistence, Persistence::Disabled)
        else {
            return;
        };

        warn!("Hydration failed, cart changes will not be persisted");
        for waiter in waiting {
            match waiter {
                Waiter::Save(done) => {
                    let _ = done.send(Err(CartError::PersistenceDisabled));
                }
                Waiter::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
    }

    /// The key of the slot this store persists to.
    #[must_use]
    pub fn key(&self) -> &StorageKey {
        &self.inner.key
    }

    /// Snapshot of the cart's line items.
    #[must_use]
    pub fn products(&self) -> Cart {
        self.inner.lock_state().cart.clone()
    }

    /// Add one unit of `item` to the cart and persist.
    ///
    /// Appends a new line with quantity 1, or increments the existing line
    /// for the same product.
    pub fn add_to_cart(&self, item: CatalogItem) -> PendingWrite {
        self.mutate(CartOp::Add(item))
    }

    /// Increase the quantity of `id` by one and persist.
    ///
    /// An unknown `id` leaves the cart unchanged; the cart is still written.
    pub fn increment(&self, id: &ProductId) -> PendingWrite {
        self.mutate(CartOp::Increment(id.clone()))
    }

    /// Decrease the quantity of `id` by one and persist.
    ///
    /// The quantity may go below zero; the line is kept. An unknown `id`
    /// leaves the cart unchanged; the cart is still written.
    pub fn decrement(&self, id: &ProductId) -> PendingWrite {
        self.mutate(CartOp::Decrement(id.clone()))
    }

    /// Wait until every write issued so far has been applied.
    ///
    /// During hydration this also waits for hydration to finish.
    ///
    /// # Errors
    ///
    /// Returns `CartError::WriterClosed` if the writer task is gone.
    pub async fn flush(&self) -> Result<()> {
        let (done, flushed) = oneshot::channel();
        {
            let mut state = self.inner.lock_state();
            if let Persistence::Hydrating { waiting, .. } = &mut state.persistence {
                waiting.push(Waiter::Flush(done));
            } else {
                self.inner
                    .writes
                    .send(WriteCommand::Flush(done))
                    .map_err(|_| CartError::WriterClosed)?;
            }
        }
        flushed.await.map_err(|_| CartError::WriterClosed)
    }

    fn mutate(&self, op: CartOp) -> PendingWrite {
        let mut guard = self.inner.lock_state();
        let state = &mut *guard;
        let changed = op.apply(&mut state.cart);
        state.revision += 1;
        let revision = state.revision;

        let (done, receiver) = oneshot::channel();
        match &mut state.persistence {
            Persistence::Hydrating { replay, waiting } => {
                replay.push(op);
                waiting.push(Waiter::Save(done));
                debug!(revision, changed, "Deferred cart write until hydration finishes");
            }
            Persistence::Ready => {
                self.inner.queue_save(revision, &state.cart, done);
                debug!(revision, changed, "Queued cart write");
            }
            Persistence::Disabled => {
                let _ = done.send(Err(CartError::PersistenceDisabled));
            }
        }

        PendingWrite { done: receiver }
    }
}

/// Read and parse the slot at `key`.
///
/// Returns the snapshot to install (if any) with the outcome to report.
async fn read_snapshot<S>(
    storage: &S,
    key: &str,
    strict: bool,
) -> Result<(Option<Cart>, Hydration)>
where
    S: KeyValueStore + ?Sized,
{
    let raw = match storage.get_item(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("No persisted cart, starting empty");
            return Ok((None, Hydration::Empty));
        }
        Err(e) if strict => return Err(e.into()),
        Err(e) => {
            warn!(error = %e, "Failed to read persisted cart, starting empty");
            return Ok((
                None,
                Hydration::Discarded(DiscardReason::Unreadable(e.to_string())),
            ));
        }
    };

    match serde_json::from_str::<Cart>(&raw) {
        Ok(cart) => {
            let lines = cart.len();
            info!(lines, "Restored persisted cart");
            Ok((Some(cart), Hydration::Restored(lines)))
        }
        Err(e) if strict => Err(CartError::CorruptSnapshot(e)),
        Err(e) => {
            warn!(error = %e, "Persisted cart is corrupt, starting empty");
            Ok((
                None,
                Hydration::Discarded(DiscardReason::Corrupted(e.to_string())),
            ))
        }
    }
}
