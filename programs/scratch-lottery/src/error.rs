use thiserror::Error;

pub type Result<T, E = LotteryError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum LotteryError {
    #[error("Prize pool is sold out")]
    SoldOut,
    #[error("No active prize pool for this lottery type")]
    NoActivePool,
    #[error("Insufficient funds")]
    InsufficientFunds,
    #[error("Ticket not found")]
    NotFound,
    #[error("Ticket is not owned by the caller")]
    NotOwned,
    #[error("Ticket already scratched")]
    AlreadyScratched,
    #[error("Transient store conflict")]
    TransientStoreConflict,
    #[error("Store stayed busy after {attempts} attempts")]
    StoreBusy { attempts: u32 },
    #[error("Invalid ticket count {requested}: must be between {min} and {max}")]
    InvalidTicketCount { requested: u32, min: u32, max: u32 },
    #[error("Prize pool not found")]
    PoolNotFound,
    #[error("Prize pool is not active")]
    PoolNotActive,
    #[error("Math overflow occurred")]
    MathOverflow,
    #[error("Layout pays {actual} but the drawn prize is {expected}")]
    LayoutMismatch { expected: u64, actual: u64 },
    #[error("Game cannot present a prize of {0}")]
    UnsupportedGame(u64),
    #[error("Outcome payload could not be sealed or opened")]
    Cipher,
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("No unused security code after {0} attempts")]
    SecurityCodeExhausted(u32),
    #[error("Ticket cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("Reservation misuse: {0}")]
    ReservationMisuse(&'static str),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Store error: {0}")]
    Store(String),
}

impl LotteryError {
    /// Whether the failure is worth retrying the whole transaction for.
    pub fn is_transient(&self) -> bool {
        matches!(self, LotteryError::TransientStoreConflict)
    }
}

/// Returns early with `$err` when `$cond` does not hold.
#[macro_export]
macro_rules! require {
    ($cond:expr, $err:expr $(,)?) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}
