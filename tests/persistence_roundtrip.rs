// tests/persistence_roundtrip.rs
//! Save/load round-trip: a reloaded state resolves identically to the
//! original, and the game directory layout behaves.

use stellar_throne::config::Config;
use stellar_throne::core::rng::TurnRng;
use stellar_throne::core::setup::{self, NewGameParams};
use stellar_throne::persistence::GameDir;
use stellar_throne::systems::DefaultCombatResolver;
use stellar_throne::CommandPacket;

#[test]
fn test_reloaded_state_resolves_identically() {
    let config = Config::builtin();
    let params = NewGameParams {
        seed: 99,
        houses: 3,
        systems: 18,
    };
    let original = setup::new_game(&config, &params).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let game = GameDir::new(dir.path(), "roundtrip");
    game.create(&original, &config).unwrap();

    let mut reloaded = game.load_state().unwrap();
    let mut baseline = original.clone();
    assert_eq!(baseline, reloaded);

    let packets = vec![CommandPacket::empty(0)];
    let seed = TurnRng::turn_seed(baseline.game_seed, baseline.turn);
    let mut r1 = DefaultCombatResolver::new();
    let mut r2 = DefaultCombatResolver::new();
    let out_a = baseline.advance(&packets, seed, &config, &mut r1);
    let out_b = reloaded.advance(&packets, seed, &config, &mut r2);
    assert_eq!(out_a.events, out_b.events);
    assert_eq!(baseline, reloaded);
}

#[test]
fn test_game_dir_lifecycle() {
    let config = Config::builtin();
    let state = setup::new_game(&config, &NewGameParams::default()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let game = GameDir::new(dir.path(), "alpha");
    assert!(!game.exists());
    game.create(&state, &config).unwrap();
    assert!(game.exists());

    // Config snapshot loads and validates.
    let loaded = game.load_config().unwrap();
    assert_eq!(loaded, config);

    // Absent packet files mean an empty submission round.
    assert!(game.load_packets(1).unwrap().is_empty());

    assert!(!game.is_stopped());
    game.mark_stopped().unwrap();
    assert!(game.is_stopped());
    game.clear_stopped().unwrap();
    assert!(!game.is_stopped());

    let games = stellar_throne::persistence::list_games(dir.path()).unwrap();
    assert_eq!(games, vec!["alpha".to_string()]);
}

#[test]
fn test_missing_game_reports_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let game = GameDir::new(dir.path(), "ghost");
    assert!(matches!(
        game.load_state(),
        Err(stellar_throne::persistence::PersistenceError::NotFound(_))
    ));
}
