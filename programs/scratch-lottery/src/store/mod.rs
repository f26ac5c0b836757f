//! The durable store seam.
//!
//! The engine never touches storage directly. It opens a [`Transaction`],
//! reads and locks the rows it needs, stages its writes and commits them as
//! one unit. Dropping a transaction without committing rolls every staged
//! write back, ledger movements included.
//!
//! Row locks are taken in a fixed order per path. Purchase locks the pool,
//! then the buyer's ledger account, then the prize levels. Scratch locks the
//! ticket, then the owner's ledger account. No path locks levels before pool.

pub mod memory;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::state::*;

/// Answer to a debit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    Debited,
    InsufficientFunds,
}

/// Player funds, moved inside the same transaction as inventory.
pub trait Ledger {
    /// Takes `amount` from the account, or reports that it cannot.
    fn debit(&mut self, account_id: AccountId, amount: u64) -> Result<DebitOutcome>;

    fn credit(
        &mut self,
        account_id: AccountId,
        amount: u64,
        reason: &str,
        reference_id: Uuid,
    ) -> Result<()>;

    /// Balance as seen by this transaction, staged movements included.
    fn balance(&mut self, account_id: AccountId) -> Result<u64>;
}

/// Read side of catalog management. Rows are never created or edited here.
pub trait Catalog {
    fn lottery_type(&mut self, id: LotteryTypeId) -> Result<Option<LotteryType>>;

    /// Oldest active pool of the lottery type, locked for this transaction.
    fn active_pool(&mut self, lottery_type_id: LotteryTypeId) -> Result<Option<PrizePool>>;

    /// Most recently opened pool of the lottery type in any status. Not locked.
    fn latest_pool(&mut self, lottery_type_id: LotteryTypeId) -> Result<Option<PrizePool>>;

    /// Prize levels of the lottery type in ascending rank, all locked.
    fn levels_for(&mut self, lottery_type_id: LotteryTypeId) -> Result<Vec<PrizeLevel>>;
}

pub trait Transaction: Catalog + Ledger {
    /// Pool by id, locked for this transaction.
    fn pool(&mut self, pool_id: PoolId) -> Result<Option<PrizePool>>;

    /// Stages new pool counters. The row must already be locked.
    fn update_pool(&mut self, pool: &PrizePool) -> Result<()>;

    /// Stages a new remaining count. The row must already be locked.
    fn update_level(&mut self, level: &PrizeLevel) -> Result<()>;

    /// Whether a committed or staged ticket already carries `code`.
    fn security_code_exists(&mut self, code: &str) -> Result<bool>;

    fn insert_ticket(&mut self, ticket: &Ticket) -> Result<()>;

    /// Ticket by id. Not locked.
    fn ticket(&mut self, ticket_id: TicketId) -> Result<Option<Ticket>>;

    /// Moves the ticket from `expected` to `next` if and only if its status is
    /// still `expected`, and locks the row for the rest of the transaction.
    /// Returns `false` when another transaction got there first.
    fn compare_and_set_status(
        &mut self,
        ticket_id: TicketId,
        expected: TicketStatus,
        next: TicketStatus,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    fn commit(self) -> Result<()>;
}

/// A durable store the engine can open transactions on.
pub trait Store: Send + Sync {
    type Tx<'a>: Transaction
    where
        Self: 'a;

    fn begin(&self) -> Result<Self::Tx<'_>>;

    /// Read-only lookup by security code, outside any transaction.
    fn find_ticket_by_security_code(&self, code: &str) -> Result<Option<Ticket>>;

    /// Read-only lookup of a lottery type, outside any transaction.
    fn find_lottery_type(&self, id: LotteryTypeId) -> Result<Option<LotteryType>>;
}
