use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AccountId = Uuid;
pub type LotteryTypeId = Uuid;
pub type PoolId = Uuid;
pub type LevelId = Uuid;
pub type TicketId = Uuid;

/// Which card a lottery type prints. Decides how the outcome is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    /// Winning numbers against a row of player spots.
    NumberMatch,
    /// A grid of amounts, three of a kind pays.
    MatchThree,
}

/// A product on sale: one price, one card design, one prize table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotteryType {
    pub id: LotteryTypeId,

    /// Display name, shown on public verification.
    pub name: String,

    /// Price of one ticket, in minor currency units.
    pub unit_price: u64,

    /// Card design used for every ticket of this type.
    pub game_kind: GameKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    /// Slots left and open for sale.
    Active,
    /// Every slot sold. Irreversible.
    SoldOut,
    /// Forced shut by an operator.
    Closed,
}

/// A finite batch of ticket slots sold for one lottery type.
///
/// Slots are scoped to the pool; prize inventory is scoped to the lottery
/// type (see [`PrizeLevel`]) and shared by all of its pools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizePool {
    pub id: PoolId,

    /// The lottery type this pool sells.
    pub lottery_type_id: LotteryTypeId,

    /// Number of tickets this pool will ever issue.
    pub total_slots: u64,

    /// Tickets issued so far. Never exceeds `total_slots`.
    pub sold_slots: u64,

    /// Tickets of this pool already claimed. Maintained by the claim step.
    pub claimed_count: u64,

    pub status: PoolStatus,

    /// When the pool was opened. The oldest active pool sells first.
    pub opened_at: DateTime<Utc>,
}

impl PrizePool {
    /// Slots not sold yet, by this purchase or any earlier one.
    pub fn unsold_slots(&self) -> u64 {
        self.total_slots.saturating_sub(self.sold_slots)
    }

    pub fn is_active(&self) -> bool {
        self.status == PoolStatus::Active
    }
}

/// A payout tier with a fixed number of winners across its lottery type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeLevel {
    pub id: LevelId,

    pub lottery_type_id: LotteryTypeId,

    /// Position in the prize table. Draws walk levels in ascending rank.
    pub rank: u32,

    /// Payout of a ticket drawn at this level, in minor currency units.
    pub prize_amount: u64,

    /// Winners configured for the whole lottery type.
    pub quantity: u64,

    /// Winners still to be drawn. `quantity - remaining` have been issued.
    pub remaining: u64,
}

impl PrizeLevel {
    /// Tickets already issued at this level.
    pub fn issued(&self) -> u64 {
        self.quantity.saturating_sub(self.remaining)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Unscratched,
    Scratched,
    Claimed,
}

impl TicketStatus {
    /// The only status this one may advance to.
    pub fn next(self) -> Option<TicketStatus> {
        match self {
            TicketStatus::Unscratched => Some(TicketStatus::Scratched),
            TicketStatus::Scratched => Some(TicketStatus::Claimed),
            TicketStatus::Claimed => None,
        }
    }

    pub fn can_advance_to(self, to: TicketStatus) -> bool {
        self.next() == Some(to)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TicketStatus::Unscratched => "unscratched",
            TicketStatus::Scratched => "scratched",
            TicketStatus::Claimed => "claimed",
        };
        f.write_str(name)
    }
}

/// One issued ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,

    /// Ledger account of the buyer.
    pub owner_id: AccountId,

    pub lottery_type_id: LotteryTypeId,

    /// Pool whose slot this ticket consumed.
    pub pool_id: PoolId,

    /// Public, unguessable identifier printed on the ticket. Globally unique.
    pub security_code: String,

    /// Sealed card layout. The only source of the reveal content.
    pub encrypted_payload: Vec<u8>,

    /// Payout fixed at issuance. Zero for a losing ticket.
    pub prize_amount: u64,

    pub status: TicketStatus,

    pub purchased_at: DateTime<Utc>,

    /// Set once, when the ticket is scratched.
    pub scratched_at: Option<DateTime<Utc>>,
}

impl Ticket {
    pub fn is_winner(&self) -> bool {
        self.prize_amount > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryKind {
    Debit,
    Credit,
}

/// One movement on a ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub account_id: AccountId,
    pub kind: LedgerEntryKind,
    pub amount: u64,
    pub reason: String,
    /// Ticket the movement pays out for, if any.
    pub reference_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
