//! In-process store with pessimistic row locks.
//!
//! Committed rows live behind one table mutex that is only held for the
//! instant of a read or of applying a commit. Isolation comes from a
//! separate lock table: a transaction claims a row key before reading it for
//! update and keeps it until commit or drop, so two transactions touching the
//! same pool, level, ticket or account are serialized while unrelated rows
//! proceed in parallel. Waiting longer than the lock timeout surfaces as
//! `TransientStoreConflict`.

use std::collections::{HashMap, HashSet};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Catalog, DebitOutcome, Ledger, Store, Transaction};
use crate::constants::{DEPOSIT_REASON, LOCK_WAIT_TIMEOUT, PURCHASE_DEBIT_REASON};
use crate::error::{LotteryError, Result};
use crate::require;
use crate::state::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RowKey {
    Pool(PoolId),
    Level(LevelId),
    Ticket(TicketId),
    Account(AccountId),
}

#[derive(Debug, Default)]
struct Tables {
    lottery_types: HashMap<LotteryTypeId, LotteryType>,
    pools: HashMap<PoolId, PrizePool>,
    levels: HashMap<LevelId, PrizeLevel>,
    tickets: HashMap<TicketId, Ticket>,
    security_codes: HashMap<String, TicketId>,
    balances: HashMap<AccountId, u64>,
    ledger: Vec<LedgerEntry>,
}

fn poisoned() -> LotteryError {
    LotteryError::Store("memory store lock poisoned".to_string())
}

#[derive(Debug)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    locks: Mutex<HashSet<RowKey>>,
    released: Condvar,
    lock_timeout: Duration,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(LOCK_WAIT_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            locks: Mutex::new(HashSet::new()),
            released: Condvar::new(),
            lock_timeout,
        }
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| poisoned())
    }

    fn acquire(&self, key: RowKey) -> Result<()> {
        let deadline = Instant::now() + self.lock_timeout;
        let mut held = self.locks.lock().map_err(|_| poisoned())?;
        while held.contains(&key) {
            let now = Instant::now();
            if now >= deadline {
                warn!(?key, "row lock wait timed out");
                return Err(LotteryError::TransientStoreConflict);
            }
            held = self
                .released
                .wait_timeout(held, deadline - now)
                .map_err(|_| poisoned())?
                .0;
        }
        held.insert(key);
        Ok(())
    }

    fn release(&self, keys: &[RowKey]) {
        if keys.is_empty() {
            return;
        }
        // rows must be handed back even if another holder panicked
        let mut held = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        };
        for key in keys {
            held.remove(key);
        }
        drop(held);
        self.released.notify_all();
    }

    // Catalog management writes straight to the tables; it runs outside the
    // engine and before any purchase touches the rows.

    pub fn insert_lottery_type(&self, lottery_type: LotteryType) -> Result<()> {
        self.tables()?
            .lottery_types
            .insert(lottery_type.id, lottery_type);
        Ok(())
    }

    pub fn insert_pool(&self, pool: PrizePool) -> Result<()> {
        require!(
            pool.sold_slots <= pool.total_slots,
            LotteryError::Store("pool sells more slots than it holds".to_string())
        );
        require!(
            !pool.is_active() || pool.sold_slots < pool.total_slots,
            LotteryError::Store("an active pool needs an unsold slot".to_string())
        );
        self.tables()?.pools.insert(pool.id, pool);
        Ok(())
    }

    pub fn insert_level(&self, level: PrizeLevel) -> Result<()> {
        require!(
            level.remaining <= level.quantity,
            LotteryError::Store("level has more remaining winners than its quantity".to_string())
        );
        self.tables()?.levels.insert(level.id, level);
        Ok(())
    }

    /// Loads funds onto an account and returns the new balance.
    pub fn deposit(&self, account_id: AccountId, amount: u64) -> Result<u64> {
        let mut tables = self.tables()?;
        let balance = tables.balances.entry(account_id).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(LotteryError::MathOverflow)?;
        let balance = *balance;
        tables.ledger.push(LedgerEntry {
            account_id,
            kind: LedgerEntryKind::Credit,
            amount,
            reason: DEPOSIT_REASON.to_string(),
            reference_id: None,
            created_at: Utc::now(),
        });
        Ok(balance)
    }

    pub fn balance_of(&self, account_id: AccountId) -> Result<u64> {
        Ok(self
            .tables()?
            .balances
            .get(&account_id)
            .copied()
            .unwrap_or(0))
    }

    pub fn pool_snapshot(&self, pool_id: PoolId) -> Result<Option<PrizePool>> {
        Ok(self.tables()?.pools.get(&pool_id).cloned())
    }

    /// Committed levels of a lottery type in ascending rank.
    pub fn levels_snapshot(&self, lottery_type_id: LotteryTypeId) -> Result<Vec<PrizeLevel>> {
        let mut levels: Vec<PrizeLevel> = self
            .tables()?
            .levels
            .values()
            .filter(|level| level.lottery_type_id == lottery_type_id)
            .cloned()
            .collect();
        levels.sort_by_key(|level| (level.rank, level.id));
        Ok(levels)
    }

    pub fn ticket_snapshot(&self, ticket_id: TicketId) -> Result<Option<Ticket>> {
        Ok(self.tables()?.tickets.get(&ticket_id).cloned())
    }

    pub fn tickets_in_pool(&self, pool_id: PoolId) -> Result<Vec<Ticket>> {
        Ok(self
            .tables()?
            .tickets
            .values()
            .filter(|ticket| ticket.pool_id == pool_id)
            .cloned()
            .collect())
    }

    pub fn ledger_entries(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>> {
        Ok(self
            .tables()?
            .ledger
            .iter()
            .filter(|entry| entry.account_id == account_id)
            .cloned()
            .collect())
    }
}

impl Store for MemoryStore {
    type Tx<'a> = MemoryTx<'a>
    where
        Self: 'a;

    fn begin(&self) -> Result<MemoryTx<'_>> {
        Ok(MemoryTx::new(self))
    }

    fn find_ticket_by_security_code(&self, code: &str) -> Result<Option<Ticket>> {
        let tables = self.tables()?;
        Ok(tables
            .security_codes
            .get(code)
            .and_then(|ticket_id| tables.tickets.get(ticket_id))
            .cloned())
    }

    fn find_lottery_type(&self, id: LotteryTypeId) -> Result<Option<LotteryType>> {
        Ok(self.tables()?.lottery_types.get(&id).cloned())
    }
}

/// A transaction against [`MemoryStore`]. Writes are staged here and only
/// reach the tables on [`Transaction::commit`].
pub struct MemoryTx<'a> {
    store: &'a MemoryStore,
    held: Vec<RowKey>,
    pools: HashMap<PoolId, PrizePool>,
    levels: HashMap<LevelId, PrizeLevel>,
    tickets: HashMap<TicketId, Ticket>,
    new_codes: HashSet<String>,
    balances: HashMap<AccountId, u64>,
    ledger: Vec<LedgerEntry>,
    committed: bool,
}

impl<'a> MemoryTx<'a> {
    fn new(store: &'a MemoryStore) -> Self {
        Self {
            store,
            held: Vec::new(),
            pools: HashMap::new(),
            levels: HashMap::new(),
            tickets: HashMap::new(),
            new_codes: HashSet::new(),
            balances: HashMap::new(),
            ledger: Vec::new(),
            committed: false,
        }
    }

    fn lock(&mut self, key: RowKey) -> Result<()> {
        if self.held.contains(&key) {
            return Ok(());
        }
        self.store.acquire(key)?;
        self.held.push(key);
        Ok(())
    }

    fn ensure_locked(&self, key: RowKey) -> Result<()> {
        require!(
            self.held.contains(&key),
            LotteryError::Store(format!("{key:?} written without holding its lock"))
        );
        Ok(())
    }

    fn is_dirty(&self) -> bool {
        !(self.pools.is_empty()
            && self.levels.is_empty()
            && self.tickets.is_empty()
            && self.balances.is_empty()
            && self.ledger.is_empty())
    }

    fn read_pool(&self, pool_id: PoolId) -> Result<Option<PrizePool>> {
        if let Some(pool) = self.pools.get(&pool_id) {
            return Ok(Some(pool.clone()));
        }
        Ok(self.store.tables()?.pools.get(&pool_id).cloned())
    }

    fn read_level(&self, level_id: LevelId) -> Result<Option<PrizeLevel>> {
        if let Some(level) = self.levels.get(&level_id) {
            return Ok(Some(level.clone()));
        }
        Ok(self.store.tables()?.levels.get(&level_id).cloned())
    }

    fn read_ticket(&self, ticket_id: TicketId) -> Result<Option<Ticket>> {
        if let Some(ticket) = self.tickets.get(&ticket_id) {
            return Ok(Some(ticket.clone()));
        }
        Ok(self.store.tables()?.tickets.get(&ticket_id).cloned())
    }

    fn read_balance(&self, account_id: AccountId) -> Result<u64> {
        if let Some(balance) = self.balances.get(&account_id) {
            return Ok(*balance);
        }
        Ok(self
            .store
            .tables()?
            .balances
            .get(&account_id)
            .copied()
            .unwrap_or(0))
    }
}

impl Catalog for MemoryTx<'_> {
    fn lottery_type(&mut self, id: LotteryTypeId) -> Result<Option<LotteryType>> {
        self.store.find_lottery_type(id)
    }

    fn active_pool(&mut self, lottery_type_id: LotteryTypeId) -> Result<Option<PrizePool>> {
        let mut passed_over = HashSet::new();
        loop {
            let candidate = {
                let tables = self.store.tables()?;
                tables
                    .pools
                    .values()
                    .filter(|pool| {
                        pool.lottery_type_id == lottery_type_id && !passed_over.contains(&pool.id)
                    })
                    .map(|pool| self.pools.get(&pool.id).unwrap_or(pool))
                    .filter(|pool| pool.is_active())
                    .min_by_key(|pool| (pool.opened_at, pool.id))
                    .map(|pool| pool.id)
            };
            let Some(pool_id) = candidate else {
                return Ok(None);
            };
            // the pool may have sold out while we waited for its lock
            match self.pool(pool_id)? {
                Some(pool) if pool.is_active() => return Ok(Some(pool)),
                _ => {
                    passed_over.insert(pool_id);
                }
            }
        }
    }

    fn latest_pool(&mut self, lottery_type_id: LotteryTypeId) -> Result<Option<PrizePool>> {
        let tables = self.store.tables()?;
        Ok(tables
            .pools
            .values()
            .filter(|pool| pool.lottery_type_id == lottery_type_id)
            .map(|pool| self.pools.get(&pool.id).unwrap_or(pool))
            .max_by_key(|pool| (pool.opened_at, pool.id))
            .cloned())
    }

    fn levels_for(&mut self, lottery_type_id: LotteryTypeId) -> Result<Vec<PrizeLevel>> {
        let mut order: Vec<(u32, LevelId)> = self
            .store
            .tables()?
            .levels
            .values()
            .filter(|level| level.lottery_type_id == lottery_type_id)
            .map(|level| (level.rank, level.id))
            .collect();
        order.sort();
        for (_, level_id) in &order {
            self.lock(RowKey::Level(*level_id))?;
        }
        order
            .iter()
            .filter_map(|(_, level_id)| self.read_level(*level_id).transpose())
            .collect()
    }
}

impl Ledger for MemoryTx<'_> {
    fn debit(&mut self, account_id: AccountId, amount: u64) -> Result<DebitOutcome> {
        self.lock(RowKey::Account(account_id))?;
        let balance = self.read_balance(account_id)?;
        let Some(remaining) = balance.checked_sub(amount) else {
            return Ok(DebitOutcome::InsufficientFunds);
        };
        self.balances.insert(account_id, remaining);
        self.ledger.push(LedgerEntry {
            account_id,
            kind: LedgerEntryKind::Debit,
            amount,
            reason: PURCHASE_DEBIT_REASON.to_string(),
            reference_id: None,
            created_at: Utc::now(),
        });
        Ok(DebitOutcome::Debited)
    }

    fn credit(
        &mut self,
        account_id: AccountId,
        amount: u64,
        reason: &str,
        reference_id: Uuid,
    ) -> Result<()> {
        self.lock(RowKey::Account(account_id))?;
        let balance = self
            .read_balance(account_id)?
            .checked_add(amount)
            .ok_or(LotteryError::MathOverflow)?;
        self.balances.insert(account_id, balance);
        self.ledger.push(LedgerEntry {
            account_id,
            kind: LedgerEntryKind::Credit,
            amount,
            reason: reason.to_string(),
            reference_id: Some(reference_id),
            created_at: Utc::now(),
        });
        Ok(())
    }

    fn balance(&mut self, account_id: AccountId) -> Result<u64> {
        self.lock(RowKey::Account(account_id))?;
        self.read_balance(account_id)
    }
}

impl Transaction for MemoryTx<'_> {
    fn pool(&mut self, pool_id: PoolId) -> Result<Option<PrizePool>> {
        self.lock(RowKey::Pool(pool_id))?;
        self.read_pool(pool_id)
    }

    fn update_pool(&mut self, pool: &PrizePool) -> Result<()> {
        self.ensure_locked(RowKey::Pool(pool.id))?;
        self.pools.insert(pool.id, pool.clone());
        Ok(())
    }

    fn update_level(&mut self, level: &PrizeLevel) -> Result<()> {
        self.ensure_locked(RowKey::Level(level.id))?;
        self.levels.insert(level.id, level.clone());
        Ok(())
    }

    fn security_code_exists(&mut self, code: &str) -> Result<bool> {
        if self.new_codes.contains(code) {
            return Ok(true);
        }
        Ok(self.store.tables()?.security_codes.contains_key(code))
    }

    fn insert_ticket(&mut self, ticket: &Ticket) -> Result<()> {
        require!(
            !self.tickets.contains_key(&ticket.id),
            LotteryError::Store(format!("ticket {} inserted twice", ticket.id))
        );
        self.new_codes.insert(ticket.security_code.clone());
        self.tickets.insert(ticket.id, ticket.clone());
        Ok(())
    }

    fn ticket(&mut self, ticket_id: TicketId) -> Result<Option<Ticket>> {
        self.read_ticket(ticket_id)
    }

    fn compare_and_set_status(
        &mut self,
        ticket_id: TicketId,
        expected: TicketStatus,
        next: TicketStatus,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        require!(
            expected.can_advance_to(next),
            LotteryError::InvalidTransition {
                from: expected.to_string(),
                to: next.to_string(),
            }
        );
        self.lock(RowKey::Ticket(ticket_id))?;
        let mut ticket = self.read_ticket(ticket_id)?.ok_or(LotteryError::NotFound)?;
        if ticket.status != expected {
            return Ok(false);
        }
        ticket.status = next;
        if next == TicketStatus::Scratched {
            ticket.scratched_at = Some(at);
        }
        self.tickets.insert(ticket_id, ticket);
        Ok(true)
    }

    fn commit(mut self) -> Result<()> {
        let store = self.store;
        let mut tables = store.tables()?;

        for ticket in self.tickets.values() {
            if tables.tickets.contains_key(&ticket.id) {
                continue;
            }
            if tables.security_codes.contains_key(&ticket.security_code) {
                warn!(ticket_id = %ticket.id, "security code taken by a concurrent commit");
                return Err(LotteryError::TransientStoreConflict);
            }
        }
        for pool in self.pools.values() {
            require!(
                pool.sold_slots <= pool.total_slots,
                LotteryError::Store(format!("pool {} would oversell", pool.id))
            );
        }

        tables.pools.extend(self.pools.drain());
        tables.levels.extend(self.levels.drain());
        for (ticket_id, ticket) in self.tickets.drain() {
            tables
                .security_codes
                .insert(ticket.security_code.clone(), ticket_id);
            tables.tickets.insert(ticket_id, ticket);
        }
        tables.balances.extend(self.balances.drain());
        tables.ledger.append(&mut self.ledger);
        drop(tables);

        self.new_codes.clear();
        self.committed = true;
        Ok(())
    }
}

impl Drop for MemoryTx<'_> {
    fn drop(&mut self) {
        if !self.committed && self.is_dirty() {
            debug!(
                pools = self.pools.len(),
                levels = self.levels.len(),
                tickets = self.tickets.len(),
                ledger_entries = self.ledger.len(),
                "transaction rolled back"
            );
        }
        self.store.release(&self.held);
    }
}
