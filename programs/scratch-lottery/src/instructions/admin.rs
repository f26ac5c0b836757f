use tracing::info;

use crate::error::{LotteryError, Result};
use crate::state::*;
use crate::store::{Catalog, Store, Transaction};
use crate::Context;

/// Stops sales from a pool. Tickets already sold stay valid and scratchable.
///
/// Closing a closed pool is a no-op. A sold out pool has nothing left to
/// close and fails with `PoolNotActive`.
///
/// # Arguments
/// * `ctx` - Store, cipher and configuration
/// * `pool_id` - Pool to close
pub fn process_close_pool<S: Store>(ctx: &Context<'_, S>, pool_id: PoolId) -> Result<PrizePool> {
    ctx.with_retries("close_pool", || {
        let mut tx = ctx.store.begin()?;
        let mut pool = tx.pool(pool_id)?.ok_or(LotteryError::PoolNotFound)?;
        match pool.status {
            PoolStatus::Active => {}
            PoolStatus::Closed => return Ok(pool),
            PoolStatus::SoldOut => return Err(LotteryError::PoolNotActive),
        }

        pool.status = PoolStatus::Closed;
        tx.update_pool(&pool)?;
        tx.commit()?;

        info!(
            %pool_id,
            sold_slots = pool.sold_slots,
            total_slots = pool.total_slots,
            "pool closed"
        );
        Ok(pool)
    })
}

/// One prize level as seen by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelReport {
    pub level_id: LevelId,
    pub rank: u32,
    pub prize_amount: u64,
    pub quantity: u64,
    pub remaining: u64,
    pub issued: u64,
}

/// Inventory snapshot of a lottery type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryReport {
    pub lottery_type_id: LotteryTypeId,

    /// The pool currently selling, or the latest one when none is.
    pub pool: Option<PrizePool>,

    pub levels: Vec<LevelReport>,

    /// Winning slots not yet drawn, over all levels.
    pub outstanding_winners: u64,

    /// `false` when the selling pool has fewer unsold slots than outstanding
    /// winners. Purchases fail closed until an operator steps in.
    pub consistent: bool,
}

/// Reads pool counters and level stock in one consistent view.
pub fn process_inventory_report<S: Store>(
    ctx: &Context<'_, S>,
    lottery_type_id: LotteryTypeId,
) -> Result<InventoryReport> {
    ctx.with_retries("inventory_report", || {
        let mut tx = ctx.store.begin()?;
        tx.lottery_type(lottery_type_id)?
            .ok_or(LotteryError::NotFound)?;

        let selling = tx.active_pool(lottery_type_id)?;
        let pool = match selling {
            Some(pool) => Some(pool),
            None => tx.latest_pool(lottery_type_id)?,
        };
        let levels = tx.levels_for(lottery_type_id)?;

        let outstanding_winners = levels
            .iter()
            .try_fold(0u64, |total, level| total.checked_add(level.remaining))
            .ok_or(LotteryError::MathOverflow)?;
        let consistent = pool
            .as_ref()
            .filter(|pool| pool.is_active())
            .map_or(true, |pool| outstanding_winners <= pool.unsold_slots());

        let levels = levels
            .iter()
            .map(|level| LevelReport {
                level_id: level.id,
                rank: level.rank,
                prize_amount: level.prize_amount,
                quantity: level.quantity,
                remaining: level.remaining,
                issued: level.issued(),
            })
            .collect();

        Ok(InventoryReport {
            lottery_type_id,
            pool,
            levels,
            outstanding_winners,
            consistent,
        })
    })
}
