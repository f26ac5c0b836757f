mod common;

use common::*;
use scratch_lottery::constants::SCRATCH_CREDIT_REASON;
use scratch_lottery::*;
use uuid::Uuid;

fn sure_win(game_kind: GameKind) -> Fixture {
    fixture(game_kind, 1, &[(100, 1)])
}

#[test]
fn winning_ticket_pays_once() {
    for game_kind in [GameKind::NumberMatch, GameKind::MatchThree] {
        let fx = sure_win(game_kind);
        let owner = fx.funded_account(50);
        let ticket = fx.buy_one(owner);
        assert_eq!(ticket.prize_amount, 100);

        let result = fx.engine.scratch(owner, ticket.id).unwrap();

        assert_eq!(result.ticket_id, ticket.id);
        assert_eq!(result.prize_amount, 100);
        assert_eq!(result.new_balance, 140);
        assert_eq!(result.content.game_kind(), game_kind);
        assert_eq!(result.content.payout().unwrap(), 100);

        let stored = fx.store().ticket_snapshot(ticket.id).unwrap().unwrap();
        assert_eq!(stored.status, TicketStatus::Scratched);
        assert_eq!(stored.scratched_at, Some(result.scratched_at));

        assert!(matches!(
            fx.engine.scratch(owner, ticket.id),
            Err(LotteryError::AlreadyScratched)
        ));
        assert_eq!(fx.balance(owner), 140);
    }
}

#[test]
fn prize_credit_references_the_ticket() {
    let fx = sure_win(GameKind::NumberMatch);
    let owner = fx.funded_account(10);
    let ticket = fx.buy_one(owner);

    fx.engine.scratch(owner, ticket.id).unwrap();

    let entries = fx.store().ledger_entries(owner).unwrap();
    let credit = entries.last().unwrap();
    assert_eq!(credit.kind, LedgerEntryKind::Credit);
    assert_eq!(credit.amount, 100);
    assert_eq!(credit.reason, SCRATCH_CREDIT_REASON);
    assert_eq!(credit.reference_id, Some(ticket.id));
}

#[test]
fn losing_ticket_credits_nothing() {
    let fx = fixture(GameKind::MatchThree, 1, &[]);
    let owner = fx.funded_account(10);
    let ticket = fx.buy_one(owner);

    let result = fx.engine.scratch(owner, ticket.id).unwrap();

    assert_eq!(result.prize_amount, 0);
    assert_eq!(result.new_balance, 0);
    assert_eq!(result.content.payout().unwrap(), 0);
    assert_eq!(fx.store().ledger_entries(owner).unwrap().len(), 2);
}

#[test]
fn unknown_ticket_is_not_found() {
    let fx = single_prize();
    let owner = fx.funded_account(10);
    assert!(matches!(
        fx.engine.scratch(owner, Uuid::new_v4()),
        Err(LotteryError::NotFound)
    ));
}

#[test]
fn only_the_owner_may_scratch() {
    let fx = sure_win(GameKind::NumberMatch);
    let owner = fx.funded_account(10);
    let intruder = fx.funded_account(10);
    let ticket = fx.buy_one(owner);

    assert!(matches!(
        fx.engine.scratch(intruder, ticket.id),
        Err(LotteryError::NotOwned)
    ));
    assert_eq!(fx.balance(intruder), 10);

    let stored = fx.store().ticket_snapshot(ticket.id).unwrap().unwrap();
    assert_eq!(stored.status, TicketStatus::Unscratched);
    assert!(fx.engine.scratch(owner, ticket.id).is_ok());
}

#[test]
fn racing_scratches_pay_exactly_once() {
    let fx = sure_win(GameKind::MatchThree);
    let owner = fx.funded_account(10);
    let ticket = fx.buy_one(owner);

    let results: Vec<Result<ScratchResult>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| fx.engine.scratch(owner, ticket.id)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let won = results.iter().filter(|r| r.is_ok()).count();
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(LotteryError::AlreadyScratched)))
        .count();
    assert_eq!(won, 1);
    assert_eq!(refused, 7);
    assert_eq!(fx.balance(owner), 100);
}

#[test]
fn card_disagreeing_with_its_row_is_refused_and_rolled_back() {
    let fx = sure_win(GameKind::NumberMatch);
    let owner = fx.funded_account(10);
    let ticket = fx.ticket_with_card(owner, 0, 100);
    fx.commit_ticket(&ticket);

    let result = fx.engine.scratch(owner, ticket.id);

    assert!(matches!(
        result,
        Err(LotteryError::LayoutMismatch {
            expected: 100,
            actual: 0
        })
    ));
    let stored = fx.store().ticket_snapshot(ticket.id).unwrap().unwrap();
    assert_eq!(stored.status, TicketStatus::Unscratched);
    assert!(stored.scratched_at.is_none());
    assert_eq!(fx.balance(owner), 10);
    assert_eq!(fx.store().ledger_entries(owner).unwrap().len(), 1);
}

#[test]
fn matching_forged_row_still_scratches() {
    let fx = sure_win(GameKind::MatchThree);
    let owner = fx.funded_account(10);
    let ticket = fx.ticket_with_card(owner, 100, 100);
    fx.commit_ticket(&ticket);

    let result = fx.engine.scratch(owner, ticket.id).unwrap();
    assert_eq!(result.prize_amount, 100);
    assert_eq!(result.new_balance, 110);
}
