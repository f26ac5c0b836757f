mod common;

use common::*;
use scratch_lottery::*;

#[test]
fn verify_hides_the_outcome_until_scratched() {
    let fx = fixture(GameKind::NumberMatch, 1, &[(100, 1)]);
    let owner = fx.funded_account(10);
    let ticket = fx.buy_one(owner);

    let before = fx.engine.verify_by_security_code(&ticket.security_code).unwrap();
    assert_eq!(before.result, PublicResult::Hidden);
    assert_eq!(before.status, TicketStatus::Unscratched);
    assert_eq!(before.lottery_type, "Lucky Sevens");
    assert_eq!(before.purchased_at, ticket.purchased_at);
    assert!(before.scratched_at.is_none());
    assert_eq!(&before.security_code[..4], &ticket.security_code[..4]);
    assert_eq!(&before.security_code[12..], &ticket.security_code[12..]);
    assert_eq!(&before.security_code[4..12], "********");

    fx.engine.scratch(owner, ticket.id).unwrap();

    let after = fx.engine.verify_by_security_code(&ticket.security_code).unwrap();
    assert_eq!(after.result, PublicResult::Won);
    assert_eq!(after.status, TicketStatus::Scratched);
    assert!(after.scratched_at.is_some());
}

#[test]
fn verify_reports_losses_without_owner() {
    let fx = fixture(GameKind::MatchThree, 1, &[]);
    let owner = fx.funded_account(10);
    let ticket = fx.buy_one(owner);
    fx.engine.scratch(owner, ticket.id).unwrap();

    let summary = fx.engine.verify_by_security_code(&ticket.security_code).unwrap();
    assert_eq!(summary.result, PublicResult::Lost);

    let json = serde_json::to_string(&summary).unwrap();
    assert!(!json.contains(&owner.to_string()));
    assert!(!json.contains(&ticket.security_code));
}

#[test]
fn unknown_or_malformed_codes_are_not_found() {
    let fx = single_prize();
    for code in ["", "short", "ABCDEFGHJKLMNPQR", "0000000000000000"] {
        assert!(matches!(
            fx.engine.verify_by_security_code(code),
            Err(LotteryError::NotFound)
        ));
    }
}

#[test]
fn closing_a_pool_keeps_sold_tickets_valid() {
    let fx = fixture(GameKind::NumberMatch, 10, &[(100, 10)]);
    let owner = fx.funded_account(100);
    let ticket = fx.buy_one(owner);

    let closed = fx.engine.close_pool(fx.pool.id).unwrap();
    assert_eq!(closed.status, PoolStatus::Closed);
    assert_eq!(closed.sold_slots, 1);
    assert_eq!(fx.pool_now().status, PoolStatus::Closed);

    assert_eq!(fx.engine.close_pool(fx.pool.id).unwrap().status, PoolStatus::Closed);
    assert!(matches!(fx.buy(owner, 1), Err(LotteryError::NoActivePool)));
    assert_eq!(fx.engine.scratch(owner, ticket.id).unwrap().prize_amount, 100);
}

#[test]
fn sold_out_or_unknown_pools_cannot_be_closed() {
    let fx = fixture(GameKind::NumberMatch, 2, &[]);
    let owner = fx.funded_account(100);
    fx.buy(owner, 2).unwrap();

    assert!(matches!(
        fx.engine.close_pool(fx.pool.id),
        Err(LotteryError::PoolNotActive)
    ));
    assert!(matches!(
        fx.engine.close_pool(uuid::Uuid::new_v4()),
        Err(LotteryError::PoolNotFound)
    ));
}

#[test]
fn inventory_report_tracks_issued_prizes() {
    let fx = fixture(GameKind::MatchThree, 20, &[(500, 2), (50, 4)]);
    let owner = fx.funded_account(1_000);

    let fresh = fx.engine.inventory_report(fx.lottery_type.id).unwrap();
    assert_eq!(fresh.pool.as_ref().map(|pool| pool.id), Some(fx.pool.id));
    assert_eq!(fresh.outstanding_winners, 6);
    assert!(fresh.consistent);
    assert_eq!(fresh.levels.len(), 2);
    assert_eq!(fresh.levels[0].rank, 1);
    assert_eq!(fresh.levels[0].prize_amount, 500);

    fx.buy(owner, 10).unwrap();
    fx.buy(owner, 10).unwrap();

    let done = fx.engine.inventory_report(fx.lottery_type.id).unwrap();
    assert_eq!(done.outstanding_winners, 0);
    assert!(done.consistent);
    assert_eq!(done.pool.unwrap().status, PoolStatus::SoldOut);
    for level in &done.levels {
        assert_eq!(level.remaining, 0);
        assert_eq!(level.issued, level.quantity);
    }

    assert!(matches!(
        fx.engine.inventory_report(uuid::Uuid::new_v4()),
        Err(LotteryError::NotFound)
    ));
}

#[test]
fn overcommitted_pool_fails_closed() {
    let fx = fixture(GameKind::NumberMatch, 3, &[(100, 5)]);
    let owner = fx.funded_account(100);

    let report = fx.engine.inventory_report(fx.lottery_type.id).unwrap();
    assert!(!report.consistent);

    assert!(matches!(fx.buy(owner, 1), Err(LotteryError::SoldOut)));
    assert_eq!(fx.balance(owner), 100);
    assert_eq!(fx.pool_now().sold_slots, 0);
}

#[test]
fn ticket_of_a_missing_lottery_type_is_a_store_error() {
    let fx = single_prize();
    let owner = fx.funded_account(10);
    let mut ticket = fx.ticket_with_card(owner, 0, 0);
    ticket.lottery_type_id = uuid::Uuid::new_v4();
    fx.commit_ticket(&ticket);

    assert!(matches!(
        fx.engine.verify_by_security_code(&ticket.security_code),
        Err(LotteryError::Store(_))
    ));
}
