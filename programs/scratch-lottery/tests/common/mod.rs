#![allow(dead_code)]

use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use scratch_lottery::constants::CIPHER_KEY_LEN;
use scratch_lottery::store::Transaction;
use scratch_lottery::*;
use uuid::Uuid;

pub const UNIT_PRICE: u64 = 10;
pub const CIPHER_KEY: [u8; CIPHER_KEY_LEN] = [42u8; CIPHER_KEY_LEN];

pub struct Fixture {
    pub engine: ScratchLottery<MemoryStore>,
    pub lottery_type: LotteryType,
    pub pool: PrizePool,
    pub levels: Vec<PrizeLevel>,
}

/// A lottery type selling `total_slots` tickets at `UNIT_PRICE`, with one
/// prize level per `(amount, quantity)` pair, ranked in the given order.
pub fn fixture(game_kind: GameKind, total_slots: u64, prizes: &[(u64, u64)]) -> Fixture {
    let store = MemoryStore::new();
    let lottery_type = LotteryType {
        id: Uuid::new_v4(),
        name: "Lucky Sevens".to_string(),
        unit_price: UNIT_PRICE,
        game_kind,
    };
    store.insert_lottery_type(lottery_type.clone()).unwrap();

    let pool = PrizePool {
        id: Uuid::new_v4(),
        lottery_type_id: lottery_type.id,
        total_slots,
        sold_slots: 0,
        claimed_count: 0,
        status: PoolStatus::Active,
        opened_at: Utc::now() - Duration::hours(1),
    };
    store.insert_pool(pool.clone()).unwrap();

    let levels: Vec<PrizeLevel> = prizes
        .iter()
        .enumerate()
        .map(|(index, (prize_amount, quantity))| PrizeLevel {
            id: Uuid::new_v4(),
            lottery_type_id: lottery_type.id,
            rank: index as u32 + 1,
            prize_amount: *prize_amount,
            quantity: *quantity,
            remaining: *quantity,
        })
        .collect();
    for level in &levels {
        store.insert_level(level.clone()).unwrap();
    }

    let engine = ScratchLottery::new(
        store,
        OutcomeCipher::new(CIPHER_KEY),
        EngineConfig::default(),
    )
    .unwrap();
    Fixture {
        engine,
        lottery_type,
        pool,
        levels,
    }
}

/// The reference scenario: ten slots, a single prize of 100.
pub fn single_prize() -> Fixture {
    fixture(GameKind::NumberMatch, 10, &[(100, 1)])
}

impl Fixture {
    pub fn store(&self) -> &MemoryStore {
        self.engine.store()
    }

    pub fn funded_account(&self, amount: u64) -> AccountId {
        let account_id = Uuid::new_v4();
        self.store().deposit(account_id, amount).unwrap();
        account_id
    }

    pub fn buy(&self, buyer_id: AccountId, count: u32) -> Result<PurchaseReceipt> {
        self.engine.purchase(buyer_id, self.lottery_type.id, count)
    }

    /// Stored rows behind a receipt, in receipt order.
    pub fn rows(&self, receipt: &PurchaseReceipt) -> Vec<Ticket> {
        receipt
            .tickets
            .iter()
            .map(|issued| self.store().ticket_snapshot(issued.id).unwrap().unwrap())
            .collect()
    }

    /// Buys a single ticket and returns its stored row.
    pub fn buy_one(&self, buyer_id: AccountId) -> Ticket {
        let receipt = self.buy(buyer_id, 1).unwrap();
        self.rows(&receipt).remove(0)
    }

    /// Commits `ticket` straight into the store, bypassing the issuer.
    pub fn commit_ticket(&self, ticket: &Ticket) {
        let mut tx = self.store().begin().unwrap();
        tx.insert_ticket(ticket).unwrap();
        tx.commit().unwrap();
    }

    /// A ticket whose sealed card pays `sealed_prize` while its row records
    /// `row_prize`.
    pub fn ticket_with_card(&self, owner_id: AccountId, sealed_prize: u64, row_prize: u64) -> Ticket {
        let mut rng = StdRng::seed_from_u64(sealed_prize ^ row_prize);
        let card = layout::build(self.lottery_type.game_kind, sealed_prize, &[], &mut rng).unwrap();
        let security_code = security_code::generate(&mut rng);
        let encrypted_payload = OutcomeCipher::new(CIPHER_KEY)
            .encrypt(&card, &security_code, &mut rng)
            .unwrap();
        Ticket {
            id: Uuid::new_v4(),
            owner_id,
            lottery_type_id: self.lottery_type.id,
            pool_id: self.pool.id,
            security_code,
            encrypted_payload,
            prize_amount: row_prize,
            status: TicketStatus::Unscratched,
            purchased_at: Utc::now(),
            scratched_at: None,
        }
    }

    pub fn pool_now(&self) -> PrizePool {
        self.store().pool_snapshot(self.pool.id).unwrap().unwrap()
    }

    pub fn levels_now(&self) -> Vec<PrizeLevel> {
        self.store().levels_snapshot(self.lottery_type.id).unwrap()
    }

    pub fn balance(&self, account_id: AccountId) -> u64 {
        self.store().balance_of(account_id).unwrap()
    }

    pub fn ticket_count(&self) -> usize {
        self.store().tickets_in_pool(self.pool.id).unwrap().len()
    }

    /// Opens another pool for the same lottery type, newer than the fixture's.
    pub fn open_pool(&self, total_slots: u64) -> PrizePool {
        let pool = PrizePool {
            id: Uuid::new_v4(),
            lottery_type_id: self.lottery_type.id,
            total_slots,
            sold_slots: 0,
            claimed_count: 0,
            status: PoolStatus::Active,
            opened_at: Utc::now(),
        };
        self.store().insert_pool(pool.clone()).unwrap();
        pool
    }
}
