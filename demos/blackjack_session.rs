//! A blackjack session that survives a page reload through cookies.
//!
//! Run with `RUST_LOG=debug` to see the store's own logging.

use blackjack_store::modules::{BetsMutation, Game, GameStatus, LoginMutation, MainMutation};
use blackjack_store::{create_store, CookieJar, StoreConfig};
use std::io;

fn init_logger() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();

    let config = StoreConfig::load(None)?;
    let jar = CookieJar::new();

    println!("=== First visit ===\n");
    let store = create_store(jar.clone(), &config);

    store.subscribe(|mutation, state| {
        println!(
            "   [{:?}] balance: {}, staked: {}",
            mutation,
            state.bets.balance,
            state.bets.total_staked()
        );
    });

    store.commit(
        LoginMutation::LoggedIn {
            username: "ann".to_string(),
            token: "eyJhbGciOi".to_string(),
            roles: vec!["ROLE_USER".to_string()],
        }
        .into(),
    )?;
    store.commit(BetsMutation::SetBalance(100).into())?;
    store.commit(MainMutation::StartGame { game_id: "g1".to_string() }.into())?;
    store.commit(
        BetsMutation::PlaceBet {
            game_id: "g1".to_string(),
            amount: 20,
        }
        .into(),
    )?;
    store.commit(
        MainMutation::UpdateGame(Game {
            status: GameStatus::PlayerWon,
            finished: true,
            player_sum: 20,
            player_alt_sum: 20,
            dealer_sum: 18,
            dealer_alt_sum: 18,
            ..Game::new("g1")
        })
        .into(),
    )?;
    store.commit(
        BetsMutation::SettleBet {
            game_id: "g1".to_string(),
            status: GameStatus::PlayerWon,
        }
        .into(),
    )?;

    println!("\nCookie: {}\n", jar.header());

    println!("=== After reload ===\n");
    let reloaded = create_store(jar, &config);
    reloaded.read(|state| {
        println!("   user: {:?}", state.login.username);
        println!("   balance: {}", state.bets.balance);
        println!("   player score: {:?}", state.main.player_score());
    });

    Ok(())
}
