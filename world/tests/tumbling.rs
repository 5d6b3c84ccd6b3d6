use std::{collections::BTreeSet, time::Duration};

use slot_reels_core::{
    ClearError, Command, DirectionChangeError, DirectionMode, Event, GridRow, ReelConfiguration,
    ReelId, ReelingMode, ResultGrid, SlotId, SymbolId,
};
use slot_reels_world::{self as world, query, ImageHandle, SymbolTable, World};

const TICK: Duration = Duration::from_millis(16);
const MAX_TICKS: usize = 2_000;

fn symbols() -> SymbolTable {
    SymbolTable::from_images(
        ["cherry.png", "plum.jpg", "orange.jpg"]
            .into_iter()
            .map(ImageHandle::new),
    )
    .expect("symbol table")
}

fn tumbling_world() -> World {
    let config = ReelConfiguration::default().with_reeling_mode(ReelingMode::Tumbling);
    World::new(config, symbols(), 0x7u64).expect("valid world")
}

fn send(world: &mut World, command: Command, log: &mut Vec<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, command, &mut events);
    log.extend(events.iter().cloned());
    events
}

fn tick_until(world: &mut World, log: &mut Vec<Event>, done: impl Fn(&World, &[Event]) -> bool) {
    for _ in 0..MAX_TICKS {
        if done(world, log) {
            return;
        }
        let _ = send(world, Command::Tick { dt: TICK }, log);
    }
    panic!("condition not reached within {MAX_TICKS} ticks");
}

fn dropped_world() -> World {
    let mut world = tumbling_world();
    let mut log = Vec::new();
    tick_until(&mut world, &mut log, |_, log| {
        log.contains(&Event::AllSymbolsDropped)
    });
    world
}

/// Slot resting in each row of the reel, top to bottom.
fn occupants(world: &World, reel: ReelId) -> Vec<Option<SlotId>> {
    let snapshot = query::reel(world, reel).expect("reel exists");
    (1..=4)
        .map(|row| {
            snapshot
                .slots
                .iter()
                .find(|slot| slot.grid_position == Some(GridRow::new(row)))
                .map(|slot| slot.id)
        })
        .collect()
}

fn assert_rows_filled_once(world: &World) {
    for reel in query::reel_view(world).iter() {
        let mut rows: Vec<GridRow> = reel
            .slots
            .iter()
            .filter_map(|slot| slot.grid_position)
            .collect();
        rows.sort();
        assert_eq!(rows, (1..=4).map(GridRow::new).collect::<Vec<_>>());

        let ids: BTreeSet<SlotId> = reel.slots.iter().map(|slot| slot.id).collect();
        assert_eq!(ids.len(), 5, "slot identities must be preserved");
    }
}

fn clear_and_settle(world: &mut World, reel: ReelId, rows: &[u32]) -> Vec<Event> {
    let mut log = Vec::new();
    let rows = rows.iter().copied().map(GridRow::new).collect();
    let events = send(world, Command::ClearPositions { reel, rows }, &mut log);
    assert!(events.is_empty(), "unexpected rejection: {events:?}");
    tick_until(world, &mut log, |_, log| {
        log.contains(&Event::TumbleSettled { reel })
    });
    log
}

#[test]
fn initial_drop_fills_every_row_exactly_once() {
    let mut world = tumbling_world();
    let mut log = Vec::new();
    tick_until(&mut world, &mut log, |_, log| {
        log.contains(&Event::AllSymbolsDropped)
    });

    for reel in 0..6 {
        let reel = ReelId::new(reel);
        let finished = Event::SymbolsDropFinished { reel };
        assert_eq!(log.iter().filter(|event| **event == finished).count(), 1);
    }
    assert_rows_filled_once(&world);
    for reel in query::reel_view(&world).iter() {
        assert!(reel.tumble_settled);
        for slot in reel.slots.iter().filter(|slot| slot.grid_position.is_some()) {
            assert_eq!(slot.position.y, slot.lane as f32 * 100.0);
        }
    }
}

#[test]
fn clearing_the_top_row_refills_only_that_row() {
    let mut world = dropped_world();
    let reel = ReelId::new(0);
    let before = occupants(&world, reel);

    let log = clear_and_settle(&mut world, reel, &[1]);
    assert!(log.contains(&Event::SymbolsCleared {
        reel,
        rows: vec![GridRow::new(1)],
    }));

    let after = occupants(&world, reel);
    assert_eq!(after[1..], before[1..]);
    assert!(after[0].is_some());
    assert!(!before[1..].contains(&after[0]));
    assert_rows_filled_once(&world);
}

#[test]
fn clearing_a_middle_row_compacts_survivors_downwards() {
    let mut world = dropped_world();
    let reel = ReelId::new(2);
    let before = occupants(&world, reel);

    let _ = clear_and_settle(&mut world, reel, &[2]);

    let after = occupants(&world, reel);
    assert_eq!(after[1], before[0], "row 1 survivor falls into row 2");
    assert_eq!(after[2..], before[2..], "rows below the gap stay put");
    assert!(!before.contains(&after[0]) || after[0] == before[1]);
    assert_rows_filled_once(&world);
}

#[test]
fn clearing_several_rows_keeps_survivor_order() {
    let mut world = dropped_world();
    let reel = ReelId::new(5);
    let before = occupants(&world, reel);

    let _ = clear_and_settle(&mut world, reel, &[1, 3]);

    let after = occupants(&world, reel);
    assert_eq!(after[3], before[3]);
    assert_eq!(after[2], before[1]);
    assert_rows_filled_once(&world);
    assert!(query::is_settled(&world));
}

#[test]
fn clear_symbol_clears_matches_across_reels() {
    let mut world = dropped_world();
    let symbol = query::visible_column(&world, ReelId::new(0))[0].expect("row 1 filled");
    let matches: Vec<(ReelId, Vec<GridRow>)> = (0..6)
        .map(ReelId::new)
        .map(|reel| {
            let rows = query::visible_column(&world, reel)
                .into_iter()
                .enumerate()
                .filter(|(_, shown)| *shown == Some(symbol))
                .map(|(index, _)| GridRow::new(index as u32 + 1))
                .collect::<Vec<_>>();
            (reel, rows)
        })
        .filter(|(_, rows)| !rows.is_empty())
        .collect();

    let mut log = Vec::new();
    let events = send(&mut world, Command::ClearSymbol { symbol }, &mut log);
    assert!(events.is_empty());
    tick_until(&mut world, &mut log, |world, _| query::is_settled(world));

    for (reel, rows) in matches {
        assert!(log.contains(&Event::SymbolsCleared { reel, rows }));
        assert!(log.contains(&Event::TumbleSettled { reel }));
    }
    assert_rows_filled_once(&world);
}

#[test]
fn clearing_is_rejected_in_regular_mode() {
    let mut world = World::new(ReelConfiguration::default(), symbols(), 1).expect("world");
    let mut log = Vec::new();

    let events = send(
        &mut world,
        Command::ClearSymbol {
            symbol: SymbolId::new(1),
        },
        &mut log,
    );
    assert_eq!(
        events,
        vec![Event::ClearRejected {
            reel: None,
            reason: ClearError::RegularMode
        }]
    );

    let reel = ReelId::new(0);
    let events = send(
        &mut world,
        Command::ClearPositions {
            reel,
            rows: vec![GridRow::new(1)],
        },
        &mut log,
    );
    assert_eq!(
        events,
        vec![Event::ClearRejected {
            reel: Some(reel),
            reason: ClearError::RegularMode
        }]
    );
}

#[test]
fn clearing_rejects_busy_reels_and_bad_targets() {
    let mut world = tumbling_world();
    let mut log = Vec::new();
    let _ = send(&mut world, Command::Tick { dt: TICK }, &mut log);

    let reel = ReelId::new(0);
    let row = vec![GridRow::new(1)];
    let events = send(
        &mut world,
        Command::ClearPositions {
            reel,
            rows: row.clone(),
        },
        &mut log,
    );
    assert_eq!(
        events,
        vec![Event::ClearRejected {
            reel: Some(reel),
            reason: ClearError::ReelBusy
        }]
    );

    tick_until(&mut world, &mut log, |_, log| {
        log.contains(&Event::AllSymbolsDropped)
    });

    let events = send(
        &mut world,
        Command::ClearPositions {
            reel,
            rows: vec![GridRow::new(5)],
        },
        &mut log,
    );
    assert_eq!(
        events,
        vec![Event::ClearRejected {
            reel: Some(reel),
            reason: ClearError::RowOutOfRange(GridRow::new(5))
        }]
    );

    let missing = ReelId::new(9);
    let events = send(
        &mut world,
        Command::ClearPositions {
            reel: missing,
            rows: row.clone(),
        },
        &mut log,
    );
    assert_eq!(
        events,
        vec![Event::ClearRejected {
            reel: Some(missing),
            reason: ClearError::UnknownReel
        }]
    );

    let _ = send(
        &mut world,
        Command::ClearPositions {
            reel,
            rows: row.clone(),
        },
        &mut log,
    );
    let events = send(&mut world, Command::ClearPositions { reel, rows: row }, &mut log);
    assert_eq!(
        events,
        vec![Event::ClearRejected {
            reel: Some(reel),
            reason: ClearError::ReelBusy
        }]
    );

    let events = send(
        &mut world,
        Command::SetDirection {
            mode: DirectionMode::Up,
        },
        &mut log,
    );
    assert_eq!(
        events,
        vec![Event::DirectionChangeRejected {
            reason: DirectionChangeError::ReelsInMotion
        }]
    );
}

#[test]
fn settled_tumbling_reels_can_spin_to_a_result() {
    let mut world = dropped_world();
    let mut log = Vec::new();
    let grid = ResultGrid::from_raw(
        &[
            &[1, 3, 1, 2],
            &[2, 3, 1, 1],
            &[3, 3, 1, 3],
            &[1, 2, 1, 3],
            &[2, 3, 1, 2],
            &[3, 3, 1, 3],
        ],
        &[3],
    );

    let _ = send(&mut world, Command::StartSpinning, &mut log);
    tick_until(&mut world, &mut log, |_, log| {
        log.contains(&Event::AllStartedSpinning)
    });
    let _ = send(
        &mut world,
        Command::StopWithResult { grid: grid.clone() },
        &mut log,
    );
    tick_until(&mut world, &mut log, |_, log| {
        log.contains(&Event::AllStoppedWithResult)
    });

    let expected: Vec<Vec<Option<SymbolId>>> = grid
        .reel_results()
        .iter()
        .map(|column| column.iter().copied().map(Some).collect())
        .collect();
    assert_eq!(query::visible_grid(&world), expected);
    assert_rows_filled_once(&world);
}
