//! Card layouts.
//!
//! A layout is what the player sees once the ticket is scratched. Each game
//! has its own generator, and every generator must print a card whose
//! computed payout is exactly the prize the draw assigned; [`build`] enforces
//! that before a layout is sealed.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{LotteryError, Result};
use crate::require;
use crate::state::GameKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum Layout {
    NumberMatch(NumberMatchCard),
    MatchThree(MatchThreeCard),
}

impl Layout {
    pub fn game_kind(&self) -> GameKind {
        match self {
            Layout::NumberMatch(_) => GameKind::NumberMatch,
            Layout::MatchThree(_) => GameKind::MatchThree,
        }
    }

    /// What the card pays under its game's rules.
    pub fn payout(&self) -> Result<u64> {
        match self {
            Layout::NumberMatch(card) => card.payout(),
            Layout::MatchThree(card) => card.payout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberSpot {
    pub number: u8,
    pub prize: u64,
}

/// Spots whose number is one of the winning numbers pay their prize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberMatchCard {
    pub winning_numbers: Vec<u8>,
    pub spots: Vec<NumberSpot>,
}

impl NumberMatchCard {
    pub fn payout(&self) -> Result<u64> {
        self.spots
            .iter()
            .filter(|spot| self.winning_numbers.contains(&spot.number))
            .try_fold(0u64, |total, spot| total.checked_add(spot.prize))
            .ok_or(LotteryError::MathOverflow)
    }
}

/// Every amount printed at least three times pays once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchThreeCard {
    pub cells: Vec<u64>,
}

impl MatchThreeCard {
    pub fn payout(&self) -> Result<u64> {
        let mut seen: BTreeMap<u64, usize> = BTreeMap::new();
        for amount in &self.cells {
            *seen.entry(*amount).or_default() += 1;
        }
        seen.into_iter()
            .filter(|(_, count)| *count >= MATCH_THREE_RUN)
            .try_fold(0u64, |total, (amount, _)| total.checked_add(amount))
            .ok_or(LotteryError::MathOverflow)
    }
}

/// Prints the card for one game.
pub trait LayoutGenerator: Send + Sync {
    /// Builds a card paying `prize_amount`. `prize_table` holds the lottery
    /// type's prize amounts, used as filler so cards look like the real thing.
    fn generate(&self, prize_amount: u64, prize_table: &[u64], rng: &mut dyn RngCore) -> Result<Layout>;
}

pub struct NumberMatchGenerator;

pub struct MatchThreeGenerator;

pub fn generator_for(game_kind: GameKind) -> &'static dyn LayoutGenerator {
    match game_kind {
        GameKind::NumberMatch => &NumberMatchGenerator,
        GameKind::MatchThree => &MatchThreeGenerator,
    }
}

/// Generates a card for `game_kind` and checks it pays exactly `prize_amount`.
pub fn build(
    game_kind: GameKind,
    prize_amount: u64,
    prize_table: &[u64],
    rng: &mut dyn RngCore,
) -> Result<Layout> {
    let layout = generator_for(game_kind).generate(prize_amount, prize_table, rng)?;
    let actual = layout.payout()?;
    require!(
        actual == prize_amount,
        LotteryError::LayoutMismatch {
            expected: prize_amount,
            actual,
        }
    );
    Ok(layout)
}

/// Non-zero filler amounts: the prize table plus the stock decoys, minus `exclude`.
fn filler_amounts(prize_table: &[u64], exclude: u64) -> Vec<u64> {
    let mut amounts: Vec<u64> = Vec::new();
    for amount in prize_table.iter().chain(DECOY_AMOUNTS.iter()) {
        if *amount != 0 && *amount != exclude && !amounts.contains(amount) {
            amounts.push(*amount);
        }
    }
    amounts
}

fn pick<T: Copy>(items: &[T], rng: &mut dyn RngCore) -> T {
    items[rng.gen_range(0..items.len())]
}

impl LayoutGenerator for NumberMatchGenerator {
    fn generate(&self, prize_amount: u64, prize_table: &[u64], rng: &mut dyn RngCore) -> Result<Layout> {
        let mut numbers: Vec<u8> = (1..=NUMBER_MATCH_MAX).collect();
        numbers.shuffle(rng);
        let (winning, losing) = numbers.split_at(NUMBER_MATCH_WINNING_COUNT);
        let fillers = filler_amounts(prize_table, 0);

        let mut spots: Vec<NumberSpot> = (0..NUMBER_MATCH_SPOT_COUNT)
            .map(|_| NumberSpot {
                number: pick(losing, rng),
                prize: pick(&fillers, rng),
            })
            .collect();
        if prize_amount > 0 {
            let hit = rng.gen_range(0..NUMBER_MATCH_SPOT_COUNT);
            spots[hit] = NumberSpot {
                number: pick(winning, rng),
                prize: prize_amount,
            };
        }

        let mut winning_numbers = winning.to_vec();
        winning_numbers.sort_unstable();
        Ok(Layout::NumberMatch(NumberMatchCard {
            winning_numbers,
            spots,
        }))
    }
}

impl LayoutGenerator for MatchThreeGenerator {
    fn generate(&self, prize_amount: u64, prize_table: &[u64], rng: &mut dyn RngCore) -> Result<Layout> {
        let mut cells: Vec<u64> = Vec::with_capacity(MATCH_THREE_CELL_COUNT);
        if prize_amount > 0 {
            cells.extend(std::iter::repeat(prize_amount).take(MATCH_THREE_RUN));
        }
        let needed = MATCH_THREE_CELL_COUNT - cells.len();

        // each filler at most twice, so none of them completes a run
        let mut fillers: Vec<u64> = filler_amounts(prize_table, prize_amount)
            .into_iter()
            .flat_map(|amount| std::iter::repeat(amount).take(MATCH_THREE_RUN - 1))
            .collect();
        require!(
            fillers.len() >= needed,
            LotteryError::UnsupportedGame(prize_amount)
        );
        fillers.shuffle(rng);
        cells.extend(fillers.into_iter().take(needed));
        cells.shuffle(rng);

        Ok(Layout::MatchThree(MatchThreeCard { cells }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const AMOUNTS: [u64; 6] = [0, 1, 100, 500, 10_000, 123_456];

    #[test]
    fn every_card_pays_its_prize() {
        let mut rng = StdRng::seed_from_u64(17);
        for game_kind in [GameKind::NumberMatch, GameKind::MatchThree] {
            for table in [&[][..], &[100, 500, 50_000][..]] {
                for amount in AMOUNTS {
                    for _ in 0..50 {
                        let layout = build(game_kind, amount, table, &mut rng).unwrap();
                        assert_eq!(layout.payout().unwrap(), amount);
                        assert_eq!(layout.game_kind(), game_kind);
                    }
                }
            }
        }
    }

    #[test]
    fn losing_number_card_has_no_hit() {
        let mut rng = StdRng::seed_from_u64(3);
        let Layout::NumberMatch(card) = build(GameKind::NumberMatch, 0, &[100], &mut rng).unwrap() else {
            panic!("expected a number match card");
        };
        assert_eq!(card.winning_numbers.len(), NUMBER_MATCH_WINNING_COUNT);
        assert_eq!(card.spots.len(), NUMBER_MATCH_SPOT_COUNT);
        assert!(card
            .spots
            .iter()
            .all(|spot| !card.winning_numbers.contains(&spot.number)));
    }

    #[test]
    fn match_three_shows_prize_exactly_three_times() {
        let mut rng = StdRng::seed_from_u64(8);
        let Layout::MatchThree(card) = build(GameKind::MatchThree, 500, &[500, 100], &mut rng).unwrap() else {
            panic!("expected a match three card");
        };
        assert_eq!(card.cells.len(), MATCH_THREE_CELL_COUNT);
        assert_eq!(card.cells.iter().filter(|amount| **amount == 500).count(), 3);
        for amount in card.cells.iter().filter(|amount| **amount != 500) {
            assert!(card.cells.iter().filter(|other| *other == amount).count() <= 2);
        }
    }

    #[test]
    fn payout_rules() {
        let card = MatchThreeCard {
            cells: vec![5, 5, 5, 7, 7, 7, 1, 2, 1],
        };
        assert_eq!(card.payout().unwrap(), 12);

        let card = NumberMatchCard {
            winning_numbers: vec![3, 9],
            spots: vec![
                NumberSpot { number: 3, prize: 40 },
                NumberSpot { number: 4, prize: 1_000 },
                NumberSpot { number: 9, prize: 2 },
            ],
        };
        assert_eq!(card.payout().unwrap(), 42);
    }

    #[test]
    fn layouts_carry_their_game_tag() {
        let layout = Layout::MatchThree(MatchThreeCard { cells: vec![1, 2] });
        let json = serde_json::to_value(&layout).unwrap();
        assert_eq!(json["game"], "match_three");
        let back: Layout = serde_json::from_value(json).unwrap();
        assert_eq!(back, layout);
    }
}
