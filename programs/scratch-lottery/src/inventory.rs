//! Slot reservation against a locked pool.
//!
//! A [`Reservation`] is the only way draws reach the store. It holds the pool
//! and the lottery type's prize levels exactly as locked by the enclosing
//! transaction, lets the caller draw the reserved number of slots against that
//! shrinking view, and writes the counters back in one go.

use rand::{CryptoRng, Rng};
use tracing::{debug, info, warn};

use crate::draw::{self, Outcome};
use crate::error::{LotteryError, Result};
use crate::require;
use crate::state::{PoolId, PoolStatus, PrizeLevel, PrizePool};
use crate::store::Transaction;

#[derive(Debug)]
pub struct Reservation {
    pool: PrizePool,
    levels: Vec<PrizeLevel>,
    original_remaining: Vec<u64>,
    requested: u64,
    drawn: u64,
}

/// Reserves `count` slots of the pool for the current transaction.
///
/// Locks the pool, then the prize levels of its lottery type, in that order.
/// The whole request is refused with `SoldOut` when fewer than `count` slots
/// are left; nothing is reserved partially.
pub fn reserve_slots<T: Transaction>(tx: &mut T, pool_id: PoolId, count: u64) -> Result<Reservation> {
    require!(
        count > 0,
        LotteryError::ReservationMisuse("a reservation needs at least one slot")
    );
    let pool = tx.pool(pool_id)?.ok_or(LotteryError::PoolNotFound)?;
    match pool.status {
        PoolStatus::Active => {}
        PoolStatus::SoldOut => return Err(LotteryError::SoldOut),
        PoolStatus::Closed => return Err(LotteryError::NoActivePool),
    }

    let levels = tx.levels_for(pool.lottery_type_id)?;
    if count > pool.unsold_slots() {
        warn!(
            pool_id = %pool.id,
            requested = count,
            unsold = pool.unsold_slots(),
            "not enough slots left for the request"
        );
        return Err(LotteryError::SoldOut);
    }
    draw::losing_slots(&pool, &levels)?;

    let original_remaining = levels.iter().map(|level| level.remaining).collect();
    Ok(Reservation {
        pool,
        levels,
        original_remaining,
        requested: count,
        drawn: 0,
    })
}

impl Reservation {
    /// Distinct prize amounts of the lottery type, in rank order.
    pub fn prize_table(&self) -> Vec<u64> {
        let mut amounts: Vec<u64> = Vec::with_capacity(self.levels.len());
        for level in &self.levels {
            if !amounts.contains(&level.prize_amount) {
                amounts.push(level.prize_amount);
            }
        }
        amounts
    }

    /// Whether reserved slots are still waiting to be drawn.
    pub fn has_undrawn(&self) -> bool {
        self.drawn < self.requested
    }

    /// Draws the next reserved slot.
    pub fn draw<R>(&mut self, rng: &mut R) -> Result<Outcome>
    where
        R: Rng + CryptoRng + ?Sized,
    {
        require!(
            self.drawn < self.requested,
            LotteryError::ReservationMisuse("every reserved slot is already drawn")
        );
        let outcome = draw::draw(&mut self.pool, &mut self.levels, rng)?;
        self.drawn += 1;
        Ok(outcome)
    }

    /// Stages the new pool and level counters on `tx`, flipping the pool to
    /// sold out when its last slot went. Returns the pool as written.
    pub fn commit<T: Transaction>(mut self, tx: &mut T) -> Result<PrizePool> {
        require!(
            self.drawn == self.requested,
            LotteryError::ReservationMisuse("reserved slots left undrawn")
        );
        if self.pool.sold_slots == self.pool.total_slots {
            self.pool.status = PoolStatus::SoldOut;
            info!(pool_id = %self.pool.id, total_slots = self.pool.total_slots, "pool sold out");
        }
        tx.update_pool(&self.pool)?;
        for (level, original) in self.levels.iter().zip(&self.original_remaining) {
            if level.remaining != *original {
                tx.update_level(level)?;
            }
        }
        Ok(self.pool)
    }

    /// Abandons the reservation. Nothing it drew reaches the store.
    pub fn rollback(self) {
        debug!(
            pool_id = %self.pool.id,
            requested = self.requested,
            drawn = self.drawn,
            "reservation rolled back"
        );
    }
}
