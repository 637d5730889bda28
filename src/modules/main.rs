use crate::store::Module;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Outcome of a blackjack game as reported by the game service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    InProgress,
    PlayerBj,
    DealerWon,
    PlayerWon,
    Draw,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub name: String,
    #[serde(deserialize_with = "card_value")]
    pub value: u32,
}

/// The game service sends card values as strings (`"10"`); saved state
/// holds numbers. Accept both.
fn card_value<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// The game currently on the table.
///
/// `*_alt_sum` counts aces as 1 instead of 11.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub player_cards: Vec<Card>,
    pub dealer_cards: Vec<Card>,
    pub player_sum: u32,
    pub player_alt_sum: u32,
    pub dealer_sum: u32,
    pub dealer_alt_sum: u32,
    pub game_loaded: bool,
    #[serde(rename = "gameStatus")]
    pub status: GameStatus,
    #[serde(rename = "gameFinished")]
    pub finished: bool,
}

impl Game {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            player_cards: Vec::new(),
            dealer_cards: Vec::new(),
            player_sum: 0,
            player_alt_sum: 0,
            dealer_sum: 0,
            dealer_alt_sum: 0,
            game_loaded: true,
            status: GameStatus::InProgress,
            finished: false,
        }
    }
}

/// The best score for a hand: the ace-high sum unless it busts.
pub fn hand_score(sum: u32, alt_sum: u32) -> u32 {
    if sum > 21 {
        alt_sum
    } else {
        sum
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainState {
    pub game: Option<Game>,
    pub games_played: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MainMutation {
    StartGame { game_id: String },
    UpdateGame(Game),
    ResetGame,
}

impl MainMutation {
    pub fn name(&self) -> &'static str {
        match self {
            MainMutation::StartGame { .. } => "START_GAME",
            MainMutation::UpdateGame(_) => "UPDATE_GAME",
            MainMutation::ResetGame => "RESET_GAME",
        }
    }
}

impl MainState {
    pub fn player_score(&self) -> Option<u32> {
        self.game
            .as_ref()
            .map(|game| hand_score(game.player_sum, game.player_alt_sum))
    }

    pub fn dealer_score(&self) -> Option<u32> {
        self.game
            .as_ref()
            .map(|game| hand_score(game.dealer_sum, game.dealer_alt_sum))
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(
            &self.game,
            Some(game) if !game.finished && game.status == GameStatus::InProgress
        )
    }
}

impl Module for MainState {
    const NAME: &'static str = "main";
    type Mutation = MainMutation;

    fn apply(&mut self, mutation: &MainMutation) {
        match mutation {
            MainMutation::StartGame { game_id } => {
                self.game = Some(Game::new(game_id.clone()));
                self.games_played += 1;
            }
            MainMutation::UpdateGame(game) => {
                if let Some(current) = &self.game {
                    if current.id != game.id {
                        debug!(current = %current.id, update = %game.id, "update for another game");
                        return;
                    }
                }
                self.game = Some(game.clone());
            }
            MainMutation::ResetGame => self.game = None,
        }
    }

    fn check(&self) -> Result<(), String> {
        match &self.game {
            Some(game) if game.finished && game.status == GameStatus::InProgress => {
                Err(format!("game {} is finished but still in progress", game.id))
            }
            _ => Ok(()),
        }
    }
}
