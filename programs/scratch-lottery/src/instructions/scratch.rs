use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::constants::SCRATCH_CREDIT_REASON;
use crate::error::{LotteryError, Result};
use crate::layout::Layout;
use crate::require;
use crate::state::*;
use crate::store::{Ledger, Store, Transaction};
use crate::Context;

/// What the player sees after scratching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchResult {
    pub ticket_id: TicketId,

    /// The card as printed at purchase.
    pub content: Layout,

    /// Amount credited for this ticket. Zero for a losing ticket.
    pub prize_amount: u64,

    /// Owner balance after the credit.
    pub new_balance: u64,

    pub scratched_at: DateTime<Utc>,
}

/// Reveals a ticket, once.
///
/// Steps performed:
/// 1. Check the ticket exists and belongs to `owner_id`.
/// 2. Compare-and-set its status from unscratched to scratched.
/// 3. Open the sealed card and check it pays the ticket's prize.
/// 4. Credit the prize, if any, against the ticket.
///
/// A ticket somebody else already scratched fails with `AlreadyScratched`
/// and changes nothing, so clients may retry freely.
///
/// # Arguments
/// * `ctx` - Store, cipher and configuration
/// * `owner_id` - Caller, who must own the ticket
/// * `ticket_id` - Ticket to reveal
pub fn process_scratch<S: Store>(
    ctx: &Context<'_, S>,
    owner_id: AccountId,
    ticket_id: TicketId,
) -> Result<ScratchResult> {
    ctx.with_retries("scratch", || reveal(ctx, owner_id, ticket_id))
}

fn reveal<S: Store>(
    ctx: &Context<'_, S>,
    owner_id: AccountId,
    ticket_id: TicketId,
) -> Result<ScratchResult> {
    let mut tx = ctx.store.begin()?;

    let ticket = tx.ticket(ticket_id)?.ok_or(LotteryError::NotFound)?;
    require!(ticket.owner_id == owner_id, LotteryError::NotOwned);

    let scratched_at = Utc::now();
    if !tx.compare_and_set_status(
        ticket.id,
        TicketStatus::Unscratched,
        TicketStatus::Scratched,
        scratched_at,
    )? {
        info!(%ticket_id, "ticket already scratched");
        return Err(LotteryError::AlreadyScratched);
    }

    let content = ctx
        .cipher
        .decrypt(&ticket.encrypted_payload, &ticket.security_code)?;
    let payout = content.payout()?;
    if payout != ticket.prize_amount {
        error!(
            %ticket_id,
            prize_amount = ticket.prize_amount,
            payout,
            "sealed card disagrees with the ticket's prize"
        );
        return Err(LotteryError::LayoutMismatch {
            expected: ticket.prize_amount,
            actual: payout,
        });
    }

    if ticket.prize_amount > 0 {
        tx.credit(
            owner_id,
            ticket.prize_amount,
            SCRATCH_CREDIT_REASON,
            ticket.id,
        )?;
    }
    let new_balance = tx.balance(owner_id)?;
    tx.commit()?;

    info!(
        %ticket_id,
        %owner_id,
        prize_amount = ticket.prize_amount,
        new_balance,
        "ticket scratched"
    );
    Ok(ScratchResult {
        ticket_id: ticket.id,
        content,
        prize_amount: ticket.prize_amount,
        new_balance,
        scratched_at,
    })
}
