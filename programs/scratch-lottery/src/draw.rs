//! Weighted draw without replacement.
//!
//! Every unsold slot of a pool is one "ball". `Σ remaining` of them carry a
//! prize, the rest lose. Each draw picks a ball uniformly and removes it, so
//! selling the whole pool hands out exactly `quantity` winners per level.

use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{LotteryError, Result};
use crate::require;
use crate::state::{LevelId, PrizeLevel, PrizePool};

/// What one slot turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Losing,
    Prize { level_id: LevelId, prize_amount: u64 },
}

impl Outcome {
    pub fn prize_amount(&self) -> u64 {
        match self {
            Outcome::Losing => 0,
            Outcome::Prize { prize_amount, .. } => *prize_amount,
        }
    }
}

/// Number of losing balls left, or `SoldOut` when the configured winners no
/// longer fit into the unsold slots. A pool in that state is refused rather
/// than paid short or paid over.
pub fn losing_slots(pool: &PrizePool, levels: &[PrizeLevel]) -> Result<u64> {
    let unsold = pool.unsold_slots();
    let winners = levels
        .iter()
        .try_fold(0u64, |acc, level| acc.checked_add(level.remaining))
        .ok_or(LotteryError::MathOverflow)?;
    unsold.checked_sub(winners).ok_or_else(|| {
        error!(
            pool_id = %pool.id,
            unsold,
            winners,
            "prize inventory exceeds unsold slots, refusing to draw"
        );
        LotteryError::SoldOut
    })
}

/// Maps a ball index onto a level position.
///
/// Balls `[0, losing)` lose; the rest are handed to levels in the order given
/// by accumulating their `remaining`. Levels must be in ascending rank so the
/// mapping can be replayed for audit.
pub fn locate(ball: u64, losing: u64, levels: &[PrizeLevel]) -> Option<usize> {
    if ball < losing {
        return None;
    }
    let mut ceiling = losing;
    for (position, level) in levels.iter().enumerate() {
        ceiling = ceiling.saturating_add(level.remaining);
        if ball < ceiling {
            return Some(position);
        }
    }
    None
}

/// Draws one slot of `pool`, consuming it and, on a win, one winner of the
/// drawn level. Both are mutated in place; persisting them is the caller's job.
pub fn draw<R>(pool: &mut PrizePool, levels: &mut [PrizeLevel], rng: &mut R) -> Result<Outcome>
where
    R: Rng + CryptoRng + ?Sized,
{
    let unsold = pool.unsold_slots();
    require!(unsold > 0, LotteryError::SoldOut);
    let losing = losing_slots(pool, levels)?;

    let ball = rng.gen_range(0..unsold);
    pool.sold_slots = pool
        .sold_slots
        .checked_add(1)
        .ok_or(LotteryError::MathOverflow)?;

    let Some(position) = locate(ball, losing, levels) else {
        debug!(pool_id = %pool.id, unsold, "drew a losing slot");
        return Ok(Outcome::Losing);
    };
    let level = &mut levels[position];
    level.remaining -= 1;
    debug!(
        pool_id = %pool.id,
        level_id = %level.id,
        rank = level.rank,
        remaining = level.remaining,
        "drew a prize slot"
    );
    Ok(Outcome::Prize {
        level_id: level.id,
        prize_amount: level.prize_amount,
    })
}
