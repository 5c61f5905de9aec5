// Property tests over random play sequences.

use std::collections::HashMap;

use lane_rhythm::{GameConfig, GameSession, ObjectId, Phase, SpawnMode};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Action {
    Spawn,
    Advance(f64),
    Press(u8),
    Tick(f64),
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::Spawn),
        (0.0f64..0.2).prop_map(Action::Advance),
        (0u8..4).prop_map(Action::Press),
        (0.0f64..300.0).prop_map(Action::Tick),
    ]
}

fn playing() -> GameSession {
    let config = GameConfig {
        spawn_mode: SpawnMode::Random,
        seed: 7,
        ..GameConfig::default()
    };
    let mut s = GameSession::new(config).expect("valid config");
    s.start(-10_000.0);
    s.tick(0.0);
    assert_eq!(s.phase(), Phase::Playing);
    s
}

fn run(s: &mut GameSession, now: &mut f64, action: &Action) {
    match *action {
        Action::Spawn => {
            s.spawn(*now);
        }
        Action::Advance(dt) => {
            s.advance(dt);
        }
        Action::Press(lane) => {
            s.on_lane_press(lane, *now);
        }
        Action::Tick(step) => {
            *now += step;
            s.tick(*now);
        }
    }
    s.drain_events();
}

proptest! {
    #[test]
    fn positions_never_decrease(actions in prop::collection::vec(action(), 1..200)) {
        let mut s = playing();
        let mut now = 0.0;
        let mut last: HashMap<ObjectId, f64> = HashMap::new();
        for a in &actions {
            run(&mut s, &mut now, a);
            for obj in s.objects() {
                if let Some(prev) = last.get(&obj.id) {
                    prop_assert!(obj.position >= *prev);
                }
                last.insert(obj.id, obj.position);
            }
        }
    }

    #[test]
    fn counters_hold_their_invariants(actions in prop::collection::vec(action(), 1..200)) {
        let mut s = playing();
        let mut now = 0.0;
        for a in &actions {
            run(&mut s, &mut now, a);
            let st = s.stats();
            prop_assert!(st.max_combo >= st.combo);
            prop_assert!(st.combo <= st.hits);
            let total = st.hits + st.misses;
            let expected = if total == 0 { 0 } else { st.hits * 100 / total };
            prop_assert_eq!(st.accuracy_pct, expected);
        }
    }

    #[test]
    fn advancing_by_zero_changes_nothing(actions in prop::collection::vec(action(), 1..100)) {
        let mut s = playing();
        let mut now = 0.0;
        for a in &actions {
            run(&mut s, &mut now, a);
        }
        let before: Vec<_> = s.objects().cloned().collect();
        let stats = s.stats();
        prop_assert_eq!(s.advance(0.0), 0);
        let after: Vec<_> = s.objects().cloned().collect();
        prop_assert_eq!(before, after);
        prop_assert_eq!(stats, s.stats());
    }
}
