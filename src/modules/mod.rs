//! Feature modules of the blackjack app.

pub mod bets;
pub mod login;
pub mod main;

pub use bets::{Bet, BetsMutation, BetsState};
pub use login::{LoginMutation, LoginState};
pub use main::{Card, Game, GameStatus, MainMutation, MainState};
