use super::main::GameStatus;
use crate::store::Module;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Settled bets kept for display. Older ones are dropped so the saved
/// state stays well under one cookie.
pub const SETTLED_HISTORY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    pub game_id: String,
    pub amount: i64,
    pub outcome: Option<GameStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetsState {
    pub balance: i64,
    pub bets: Vec<Bet>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BetsMutation {
    SetBalance(i64),
    PlaceBet { game_id: String, amount: i64 },
    SettleBet { game_id: String, status: GameStatus },
}

impl BetsMutation {
    pub fn name(&self) -> &'static str {
        match self {
            BetsMutation::SetBalance(_) => "SET_BALANCE",
            BetsMutation::PlaceBet { .. } => "PLACE_BET",
            BetsMutation::SettleBet { .. } => "SETTLE_BET",
        }
    }
}

/// What a settled stake returns to the player.
///
/// A win pays even money, a blackjack pays 3:2, a draw returns the stake.
/// `None` when the payout does not fit in an `i64`.
pub fn payout(amount: i64, status: GameStatus) -> Option<i64> {
    match status {
        GameStatus::PlayerWon => amount.checked_mul(2),
        GameStatus::PlayerBj => amount.checked_mul(2)?.checked_add(amount / 2),
        GameStatus::Draw => Some(amount),
        GameStatus::DealerWon | GameStatus::InProgress => Some(0),
    }
}

impl BetsState {
    /// Sum of all unsettled stakes.
    pub fn total_staked(&self) -> i64 {
        self.bets
            .iter()
            .filter(|bet| bet.outcome.is_none())
            .map(|bet| bet.amount)
            .sum()
    }

    pub fn open_bet(&self, game_id: &str) -> Option<&Bet> {
        self.bets
            .iter()
            .find(|bet| bet.game_id == game_id && bet.outcome.is_none())
    }

    fn prune_settled(&mut self) {
        let settled = self.bets.iter().filter(|bet| bet.outcome.is_some()).count();
        let mut excess = settled.saturating_sub(SETTLED_HISTORY);
        self.bets.retain(|bet| {
            if excess > 0 && bet.outcome.is_some() {
                excess -= 1;
                return false;
            }
            true
        });
    }
}

impl Module for BetsState {
    const NAME: &'static str = "bets";
    type Mutation = BetsMutation;

    fn apply(&mut self, mutation: &BetsMutation) {
        match mutation {
            BetsMutation::SetBalance(balance) => self.balance = *balance,
            BetsMutation::PlaceBet { game_id, amount } => {
                if *amount <= 0 || *amount > self.balance {
                    debug!(game = %game_id, amount, balance = self.balance, "bet refused");
                    return;
                }
                if self.open_bet(game_id).is_some() {
                    debug!(game = %game_id, "game already has an open bet");
                    return;
                }
                self.balance -= amount;
                self.bets.push(Bet {
                    game_id: game_id.clone(),
                    amount: *amount,
                    outcome: None,
                });
            }
            BetsMutation::SettleBet { game_id, status } => {
                if *status == GameStatus::InProgress {
                    return;
                }
                let Some(index) = self
                    .bets
                    .iter()
                    .position(|bet| bet.game_id == *game_id && bet.outcome.is_none())
                else {
                    debug!(game = %game_id, "no open bet to settle");
                    return;
                };
                let amount = self.bets[index].amount;
                let Some(balance) =
                    payout(amount, *status).and_then(|won| self.balance.checked_add(won))
                else {
                    debug!(game = %game_id, amount, balance = self.balance, "payout overflows balance");
                    return;
                };
                self.bets[index].outcome = Some(*status);
                self.balance = balance;
                self.prune_settled();
            }
        }
    }

    fn check(&self) -> Result<(), String> {
        if self.balance < 0 {
            return Err(format!("balance is negative: {}", self.balance));
        }
        Ok(())
    }
}
