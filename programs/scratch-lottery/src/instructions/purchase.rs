use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::constants::MIN_TICKETS_PER_PURCHASE;
use crate::error::{LotteryError, Result};
use crate::inventory::{self, Reservation};
use crate::layout;
use crate::require;
use crate::security_code;
use crate::state::*;
use crate::store::{Catalog, DebitOutcome, Ledger, Store, Transaction};
use crate::Context;

/// A ticket as handed to its buyer. Nothing on it gives the outcome away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedTicket {
    pub id: TicketId,

    /// Code printed on the ticket, for public verification.
    pub security_code: String,

    pub purchased_at: DateTime<Utc>,
}

impl From<&Ticket> for IssuedTicket {
    fn from(ticket: &Ticket) -> Self {
        Self {
            id: ticket.id,
            security_code: ticket.security_code.clone(),
            purchased_at: ticket.purchased_at,
        }
    }
}

/// What a successful purchase hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseReceipt {
    /// The pool every ticket of the batch was drawn from.
    pub pool_id: PoolId,

    /// The issued tickets, in draw order.
    pub tickets: Vec<IssuedTicket>,

    /// `unit_price * count`, debited from the buyer.
    pub total_price: u64,

    /// Buyer balance after the debit.
    pub balance: u64,
}

/// Sells `count` tickets of a lottery type to `buyer_id`.
///
/// Steps performed, all in one store transaction:
/// 1. Resolve and lock the lottery type's active pool.
/// 2. Price the batch at `unit_price * count`.
/// 3. Debit the buyer, failing with `InsufficientFunds` if the ledger refuses.
/// 4. Reserve `count` slots and lock the prize levels; `SoldOut` if they don't fit.
/// 5. For every slot: draw, pick a unique security code, print the card, seal it.
/// 6. Write the tickets, the new counters and the debit together.
///
/// Any error drops the transaction, which undoes the debit and every draw.
/// Transient store conflicts retry the whole batch.
///
/// # Arguments
/// * `ctx` - Store, cipher and configuration
/// * `buyer_id` - Ledger account paying for and owning the tickets
/// * `lottery_type_id` - Lottery type being bought
/// * `count` - Tickets in the batch
pub fn process_purchase<S: Store>(
    ctx: &Context<'_, S>,
    buyer_id: AccountId,
    lottery_type_id: LotteryTypeId,
    count: u32,
) -> Result<PurchaseReceipt> {
    let max = ctx.config.max_tickets_per_purchase;
    require!(
        (MIN_TICKETS_PER_PURCHASE..=max).contains(&count),
        LotteryError::InvalidTicketCount {
            requested: count,
            min: MIN_TICKETS_PER_PURCHASE,
            max,
        }
    );

    ctx.with_retries("purchase", || {
        issue_tickets(ctx, &mut OsRng, buyer_id, lottery_type_id, count)
    })
}

fn issue_tickets<S, R>(
    ctx: &Context<'_, S>,
    rng: &mut R,
    buyer_id: AccountId,
    lottery_type_id: LotteryTypeId,
    count: u32,
) -> Result<PurchaseReceipt>
where
    S: Store,
    R: RngCore + CryptoRng,
{
    let mut tx = ctx.store.begin()?;

    let lottery_type = tx
        .lottery_type(lottery_type_id)?
        .ok_or(LotteryError::NoActivePool)?;
    let Some(pool) = tx.active_pool(lottery_type_id)? else {
        return Err(match tx.latest_pool(lottery_type_id)? {
            Some(latest) if latest.status == PoolStatus::SoldOut => LotteryError::SoldOut,
            _ => LotteryError::NoActivePool,
        });
    };
    debug!(%lottery_type_id, pool_id = %pool.id, unsold = pool.unsold_slots(), "pool resolved");

    let total_price = lottery_type
        .unit_price
        .checked_mul(u64::from(count))
        .ok_or(LotteryError::MathOverflow)?;
    if tx.debit(buyer_id, total_price)? == DebitOutcome::InsufficientFunds {
        info!(%buyer_id, total_price, "purchase refused, insufficient funds");
        return Err(LotteryError::InsufficientFunds);
    }

    let mut reservation = inventory::reserve_slots(&mut tx, pool.id, u64::from(count))?;
    let tickets = match print_tickets(
        ctx,
        &mut tx,
        &mut reservation,
        rng,
        &lottery_type,
        pool.id,
        buyer_id,
    ) {
        Ok(tickets) => tickets,
        Err(err) => {
            reservation.rollback();
            return Err(err);
        }
    };

    let pool = reservation.commit(&mut tx)?;
    let balance = tx.balance(buyer_id)?;
    tx.commit()?;

    info!(
        %buyer_id,
        %lottery_type_id,
        pool_id = %pool.id,
        count,
        total_price,
        sold_slots = pool.sold_slots,
        total_slots = pool.total_slots,
        "tickets issued"
    );
    Ok(PurchaseReceipt {
        pool_id: pool.id,
        tickets,
        total_price,
        balance,
    })
}

/// Draws every reserved slot and stages one sealed ticket per draw.
fn print_tickets<S, T, R>(
    ctx: &Context<'_, S>,
    tx: &mut T,
    reservation: &mut Reservation,
    rng: &mut R,
    lottery_type: &LotteryType,
    pool_id: PoolId,
    buyer_id: AccountId,
) -> Result<Vec<IssuedTicket>>
where
    S: Store,
    T: Transaction,
    R: RngCore + CryptoRng,
{
    let prize_table = reservation.prize_table();
    let purchased_at = Utc::now();
    let mut tickets = Vec::new();

    while reservation.has_undrawn() {
        let outcome = reservation.draw(&mut *rng)?;
        let security_code = security_code::generate_unique(
            &mut *rng,
            ctx.config.max_security_code_attempts,
            |code| tx.security_code_exists(code),
        )?;
        let card = layout::build(
            lottery_type.game_kind,
            outcome.prize_amount(),
            &prize_table,
            &mut *rng,
        )?;
        let encrypted_payload = ctx.cipher.encrypt(&card, &security_code, &mut *rng)?;

        let ticket = Ticket {
            id: Uuid::new_v4(),
            owner_id: buyer_id,
            lottery_type_id: lottery_type.id,
            pool_id,
            security_code,
            encrypted_payload,
            prize_amount: outcome.prize_amount(),
            status: TicketStatus::Unscratched,
            purchased_at,
            scratched_at: None,
        };
        tx.insert_ticket(&ticket)?;
        tickets.push(IssuedTicket::from(&ticket));
    }
    Ok(tickets)
}
