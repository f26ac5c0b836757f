//! Instant-win ticket issuance.
//!
//! Sells scratch tickets out of finite prize pools, drawing each ticket's
//! outcome without replacement at purchase time, seals the printed card
//! under a server-held key and reveals it exactly once. Funds move through a
//! [`store::Ledger`] in the same transaction as the inventory they pay for.

use tracing::{error, warn};

pub mod cipher;
pub mod config;
pub mod constants;
pub mod draw;
pub mod error;
pub mod instructions;
pub mod inventory;
pub mod layout;
pub mod security_code;
pub mod state;
pub mod store;

pub use cipher::OutcomeCipher;
pub use config::EngineConfig;
pub use error::{LotteryError, Result};
pub use instructions::*;
pub use layout::Layout;
pub use state::*;
pub use store::memory::MemoryStore;
pub use store::Store;

/// Everything an instruction handler works against.
pub struct Context<'a, S: Store> {
    pub store: &'a S,
    pub cipher: &'a OutcomeCipher,
    pub config: &'a EngineConfig,
}

impl<S: Store> Context<'_, S> {
    /// Runs `attempt` until it stops failing with a transient store conflict,
    /// at most `max_tx_attempts` times. Every attempt opens its own
    /// transaction.
    pub(crate) fn with_retries<T>(
        &self,
        operation: &'static str,
        mut attempt: impl FnMut() -> Result<T>,
    ) -> Result<T> {
        let attempts = self.config.max_tx_attempts;
        let mut tried = 0;
        loop {
            tried += 1;
            match attempt() {
                Err(err) if err.is_transient() => {
                    if tried >= attempts {
                        error!(operation, attempts, "store stayed contended, giving up");
                        return Err(LotteryError::StoreBusy { attempts });
                    }
                    warn!(operation, attempt = tried, "transient store conflict, retrying");
                }
                result => return result,
            }
        }
    }
}

/// The engine: a store, the outcome key and the tunables.
///
/// Safe to share between threads; every operation runs in its own store
/// transaction.
#[derive(Debug)]
pub struct ScratchLottery<S: Store> {
    store: S,
    cipher: OutcomeCipher,
    config: EngineConfig,
}

impl<S: Store> ScratchLottery<S> {
    pub fn new(store: S, cipher: OutcomeCipher, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            cipher,
            config,
        })
    }

    fn ctx(&self) -> Context<'_, S> {
        Context {
            store: &self.store,
            cipher: &self.cipher,
            config: &self.config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn purchase(
        &self,
        buyer_id: AccountId,
        lottery_type_id: LotteryTypeId,
        count: u32,
    ) -> Result<PurchaseReceipt> {
        process_purchase(&self.ctx(), buyer_id, lottery_type_id, count)
    }

    pub fn scratch(&self, owner_id: AccountId, ticket_id: TicketId) -> Result<ScratchResult> {
        process_scratch(&self.ctx(), owner_id, ticket_id)
    }

    pub fn verify_by_security_code(&self, code: &str) -> Result<PublicTicketSummary> {
        process_verify_by_security_code(&self.ctx(), code)
    }

    pub fn close_pool(&self, pool_id: PoolId) -> Result<PrizePool> {
        process_close_pool(&self.ctx(), pool_id)
    }

    pub fn inventory_report(&self, lottery_type_id: LotteryTypeId) -> Result<InventoryReport> {
        process_inventory_report(&self.ctx(), lottery_type_id)
    }
}
