use std::time::Duration;

/// Length of the public security code printed on every ticket.
pub const SECURITY_CODE_LEN: usize = 16;

/// Alphabet for security codes. Look-alike glyphs (0/O, 1/l/I) are left out
/// so codes survive being read back over the phone. 57 symbols gives
/// roughly 93 bits of entropy for a 16 character code.
pub const SECURITY_CODE_ALPHABET: &[u8] =
    b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";

/// Number of leading and trailing characters left visible when a code is masked.
pub const SECURITY_CODE_VISIBLE: usize = 4;

/// Fresh draws attempted before giving up on finding an unused security code.
pub const MAX_SECURITY_CODE_ATTEMPTS: u32 = 8;

/// Smallest batch a single purchase may request.
pub const MIN_TICKETS_PER_PURCHASE: u32 = 1;

/// Largest batch a single purchase may request.
pub const MAX_TICKETS_PER_PURCHASE: u32 = 10;

/// Attempts at a purchase or scratch transaction before a transient
/// conflict is escalated.
pub const MAX_TX_ATTEMPTS: u32 = 3;

/// How long a transaction waits on a row lock held by another transaction.
pub const LOCK_WAIT_TIMEOUT: Duration = Duration::from_millis(2_000);

/// Outcome cipher key length in bytes.
pub const CIPHER_KEY_LEN: usize = 32;

/// Nonce length of the outcome cipher.
pub const CIPHER_NONCE_LEN: usize = 12;

/// Leading byte of every encrypted payload.
pub const PAYLOAD_VERSION: u8 = 1;

/// Ledger reason recorded on a purchase debit.
pub const PURCHASE_DEBIT_REASON: &str = "ticket_purchase";

/// Ledger reason recorded when funds are loaded onto an account.
pub const DEPOSIT_REASON: &str = "deposit";

/// Ledger reason recorded on a winning scratch.
pub const SCRATCH_CREDIT_REASON: &str = "scratch_win";

/// Winning numbers drawn on a number match card.
pub const NUMBER_MATCH_WINNING_COUNT: usize = 2;

/// Player spots on a number match card.
pub const NUMBER_MATCH_SPOT_COUNT: usize = 8;

/// Highest number printed on a number match card.
pub const NUMBER_MATCH_MAX: u8 = 30;

/// Cells on a match three card.
pub const MATCH_THREE_CELL_COUNT: usize = 9;

/// Occurrences of an amount on a match three card that pay it out.
pub const MATCH_THREE_RUN: usize = 3;

/// Amounts (minor units) printed as filler when a lottery type has too few
/// distinct prize levels to dress a card.
pub const DECOY_AMOUNTS: [u64; 5] = [100, 500, 1_000, 5_000, 10_000];
