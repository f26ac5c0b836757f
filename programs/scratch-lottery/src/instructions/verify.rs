use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error};

use crate::error::{LotteryError, Result};
use crate::require;
use crate::security_code;
use crate::state::TicketStatus;
use crate::store::Store;
use crate::Context;

/// Outcome as shown to the public.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicResult {
    /// Not scratched yet; the outcome stays sealed.
    Hidden,
    Won,
    Lost,
}

/// Public view of a ticket. Carries no owner and no amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicTicketSummary {
    /// Security code with its middle starred out.
    pub security_code: String,

    /// Name of the lottery type.
    pub lottery_type: String,

    pub status: TicketStatus,

    pub result: PublicResult,

    pub purchased_at: DateTime<Utc>,

    pub scratched_at: Option<DateTime<Utc>>,
}

/// Looks a ticket up by the code printed on it. Needs no login.
pub fn process_verify_by_security_code<S: Store>(
    ctx: &Context<'_, S>,
    code: &str,
) -> Result<PublicTicketSummary> {
    let code = code.trim();
    require!(security_code::is_well_formed(code), LotteryError::NotFound);

    let ticket = ctx
        .store
        .find_ticket_by_security_code(code)?
        .ok_or(LotteryError::NotFound)?;
    let lottery_type = ctx
        .store
        .find_lottery_type(ticket.lottery_type_id)?
        .map(|lottery_type| lottery_type.name)
        .ok_or_else(|| {
            error!(
                lottery_type_id = %ticket.lottery_type_id,
                "ticket refers to a lottery type missing from the catalog"
            );
            LotteryError::Store(format!(
                "lottery type {} not found",
                ticket.lottery_type_id
            ))
        })?;

    let result = match ticket.status {
        TicketStatus::Unscratched => PublicResult::Hidden,
        _ if ticket.is_winner() => PublicResult::Won,
        _ => PublicResult::Lost,
    };
    let masked = security_code::mask(&ticket.security_code);
    debug!(security_code = %masked, ?result, "ticket verified");

    Ok(PublicTicketSummary {
        security_code: masked,
        lottery_type,
        status: ticket.status,
        result,
        purchased_at: ticket.purchased_at,
        scratched_at: ticket.scratched_at,
    })
}
