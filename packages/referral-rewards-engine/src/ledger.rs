use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use cosmwasm_std::{MemoryStorage, Order, Record, Storage};

use crate::error::EngineError;

pub type SharedStorage = Box<dyn Storage + Send>;

/// Committed key-value state plus the row-lock table guarding it.
///
/// Every mutation runs inside [`Ledger::transaction`]: writes are buffered in a
/// [`Transaction`] and applied in one step on success. Row locks taken with
/// [`Transaction::lock_row`] are held until the transaction ends.
pub struct Ledger {
    storage: Mutex<SharedStorage>,
    locks: LockTable,
    next_tx: AtomicU64,
    lock_timeout_ms: AtomicU64,
}

impl Ledger {
    pub fn new(storage: SharedStorage, lock_timeout: Duration) -> Self {
        Ledger {
            storage: Mutex::new(storage),
            locks: LockTable::default(),
            next_tx: AtomicU64::new(1),
            lock_timeout_ms: AtomicU64::new(duration_ms(lock_timeout)),
        }
    }

    pub fn in_memory(lock_timeout: Duration) -> Self {
        Ledger::new(Box::new(MemoryStorage::new()), lock_timeout)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms.load(Ordering::Relaxed))
    }

    pub fn set_lock_timeout(&self, lock_timeout: Duration) {
        self.lock_timeout_ms
            .store(duration_ms(lock_timeout), Ordering::Relaxed);
    }

    /// Run `f` in a transaction. Buffered writes are committed when `f`
    /// returns `Ok` and dropped otherwise.
    pub fn transaction<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, EngineError>,
    {
        let mut tx = self.begin();
        let out = f(&mut tx)?;
        tx.commit();
        Ok(out)
    }

    fn begin(&self) -> Transaction<'_> {
        Transaction {
            ledger: self,
            id: self.next_tx.fetch_add(1, Ordering::Relaxed),
            writes: BTreeMap::new(),
            held: Vec::new(),
        }
    }

    /// Read committed state without taking any row lock.
    pub fn read<T>(&self, f: impl FnOnce(&dyn Storage) -> T) -> T {
        let storage = self.latch();
        f(&**storage)
    }

    pub fn into_storage(self) -> SharedStorage {
        self.storage
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn latch(&self) -> MutexGuard<'_, SharedStorage> {
        self.storage.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Buffered unit of work over a [`Ledger`].
///
/// Implements [`Storage`] so typed tables read and write through it. Reads
/// see this transaction's own writes over the committed state.
pub struct Transaction<'a> {
    ledger: &'a Ledger,
    id: u64,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    held: Vec<Vec<u8>>,
}

impl Transaction<'_> {
    /// Take the exclusive row lock on `resource` until this transaction ends.
    /// Re-locking a resource this transaction already holds is a no-op.
    pub fn lock_row(&mut self, resource: &str) -> Result<(), EngineError> {
        let key = resource.as_bytes();
        let timeout = self.ledger.lock_timeout();
        if self.ledger.locks.acquire(key, self.id, timeout)? {
            self.held.push(key.to_vec());
        }
        Ok(())
    }

    pub fn holds(&self, resource: &str) -> bool {
        self.held.iter().any(|key| key == resource.as_bytes())
    }

    fn commit(mut self) {
        let writes = std::mem::take(&mut self.writes);
        if writes.is_empty() {
            return;
        }
        let mut storage = self.ledger.latch();
        for (key, value) in writes {
            match value {
                Some(value) => storage.set(&key, &value),
                None => storage.remove(&key),
            }
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.held.is_empty() {
            self.ledger.locks.release(&self.held, self.id);
        }
    }
}

impl Storage for Transaction<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.writes.get(key) {
            Some(buffered) => buffered.clone(),
            None => self.ledger.latch().get(key),
        }
    }

    fn range<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        order: Order,
    ) -> Box<dyn Iterator<Item = Record> + 'a> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Box::new(std::iter::empty());
            }
        }

        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = {
            let storage = self.ledger.latch();
            let records = storage.range(start, end, Order::Ascending).collect();
            records
        };
        let in_range = |key: &[u8]| {
            start.map_or(true, |start| key >= start) && end.map_or(true, |end| key < end)
        };
        for (key, value) in self.writes.iter().filter(|(key, _)| in_range(key)) {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        match order {
            Order::Ascending => Box::new(merged.into_iter()),
            Order::Descending => Box::new(merged.into_iter().rev()),
        }
    }

    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
    }

    fn remove(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), None);
    }
}

/// Owner table for row locks. One entry per locked resource.
#[derive(Default)]
struct LockTable {
    owners: Mutex<HashMap<Vec<u8>, u64>>,
    released: Condvar,
}

impl LockTable {
    /// Returns `true` when the lock was newly taken, `false` when `tx`
    /// already held it.
    fn acquire(&self, resource: &[u8], tx: u64, timeout: Duration) -> Result<bool, EngineError> {
        let deadline = Instant::now() + timeout;
        let mut owners = self.owners.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match owners.get(resource).copied() {
                None => {
                    owners.insert(resource.to_vec(), tx);
                    return Ok(true);
                }
                Some(owner) if owner == tx => return Ok(false),
                Some(_) => {}
            }

            let now = Instant::now();
            if now >= deadline {
                let resource = String::from_utf8_lossy(resource).into_owned();
                tracing::warn!(%resource, tx, "row lock wait timed out");
                return Err(EngineError::LockTimeout { resource });
            }
            owners = self
                .released
                .wait_timeout(owners, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn release(&self, resources: &[Vec<u8>], tx: u64) {
        let mut owners = self.owners.lock().unwrap_or_else(PoisonError::into_inner);
        for resource in resources {
            if owners.get(resource) == Some(&tx) {
                owners.remove(resource);
            }
        }
        drop(owners);
        self.released.notify_all();
    }
}
