use serde::Deserialize;

use crate::constants::*;
use crate::error::{LotteryError, Result};

/// Tunables for the issuer and resolver.
///
/// Every field has a default, so hosts may deserialize a partial document
/// from whatever format they keep settings in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on tickets in one purchase. Never above
    /// `MAX_TICKETS_PER_PURCHASE`.
    pub max_tickets_per_purchase: u32,

    /// Attempts at a transaction before a transient conflict becomes
    /// `StoreBusy`.
    pub max_tx_attempts: u32,

    /// Fresh security codes tried before a purchase gives up.
    pub max_security_code_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_tickets_per_purchase: MAX_TICKETS_PER_PURCHASE,
            max_tx_attempts: MAX_TX_ATTEMPTS,
            max_security_code_attempts: MAX_SECURITY_CODE_ATTEMPTS,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_tickets_per_purchase < MIN_TICKETS_PER_PURCHASE
            || self.max_tickets_per_purchase > MAX_TICKETS_PER_PURCHASE
        {
            return Err(LotteryError::InvalidConfig(format!(
                "max_tickets_per_purchase must be between {} and {}",
                MIN_TICKETS_PER_PURCHASE, MAX_TICKETS_PER_PURCHASE
            )));
        }
        if self.max_tx_attempts == 0 {
            return Err(LotteryError::InvalidConfig(
                "max_tx_attempts must be at least 1".to_string(),
            ));
        }
        if self.max_security_code_attempts == 0 {
            return Err(LotteryError::InvalidConfig(
                "max_security_code_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
