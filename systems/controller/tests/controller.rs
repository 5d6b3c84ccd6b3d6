use std::{collections::VecDeque, time::Duration};

use slot_reels_core::{Command, Event, ReelConfiguration, ResultGrid, ResultSource, SymbolId};
use slot_reels_system_controller::{Config, Controller, Phase};
use slot_reels_world::{self as world, query, ImageHandle, SymbolTable, World};

const TICK: Duration = Duration::from_millis(16);

struct Queue(VecDeque<ResultGrid>);

impl ResultSource for Queue {
    fn next_result(&mut self) -> Option<ResultGrid> {
        self.0.pop_front()
    }
}

fn new_world() -> World {
    let symbols = SymbolTable::from_images(
        ["cherry.png", "plum.jpg", "orange.jpg"]
            .into_iter()
            .map(ImageHandle::new),
    )
    .expect("symbol table");
    World::new(ReelConfiguration::default(), symbols, 42).expect("valid world")
}

fn results() -> Queue {
    Queue(VecDeque::from([
        ResultGrid::from_raw(
            &[
                &[1, 2, 3, 1],
                &[1, 2, 3, 2],
                &[1, 1, 3, 3],
                &[1, 2, 3, 1],
                &[1, 2, 3, 2],
                &[1, 3, 3, 3],
            ],
            &[1, 3],
        ),
        ResultGrid::from_raw(
            &[
                &[1, 2, 2, 1],
                &[2, 2, 3, 2],
                &[1, 3, 3, 3],
                &[1, 2, 3, 1],
                &[1, 2, 1, 2],
                &[1, 2, 3, 3],
            ],
            &[],
        ),
    ]))
}

/// Feeds events to the controller and applies its commands until it goes quiet.
fn process_controller(
    world: &mut World,
    controller: &mut Controller<Queue>,
    pending_events: Vec<Event>,
    log: &mut Vec<Event>,
) {
    let mut events = pending_events;
    loop {
        let mut commands = Vec::new();
        controller.handle(&events, &mut commands);
        if commands.is_empty() {
            break;
        }

        events.clear();
        for command in commands {
            let mut generated = Vec::new();
            world::apply(world, command, &mut generated);
            log.extend(generated.iter().cloned());
            events.extend(generated);
        }
    }
}

fn run_cycle(world: &mut World, controller: &mut Controller<Queue>, log: &mut Vec<Event>) {
    let mut commands = Vec::new();
    assert!(controller.press_spin(&mut commands));
    let mut events = Vec::new();
    for command in commands {
        world::apply(world, command, &mut events);
    }
    log.extend(events.iter().cloned());
    process_controller(world, controller, events, log);

    for _ in 0..2_000 {
        if controller.phase() == Phase::Ready {
            return;
        }
        let mut events = Vec::new();
        world::apply(world, Command::Tick { dt: TICK }, &mut events);
        log.extend(events.iter().cloned());
        process_controller(world, controller, events, log);
    }
    panic!("cycle did not finish");
}

#[test]
fn auto_stop_cycles_settle_on_injected_results() {
    let mut world = new_world();
    let mut controller = Controller::new(Config::default(), results());
    let mut log = Vec::new();

    run_cycle(&mut world, &mut controller, &mut log);
    let expected: Vec<Vec<Option<SymbolId>>> = [
        [1, 2, 3, 1],
        [1, 2, 3, 2],
        [1, 1, 3, 3],
        [1, 2, 3, 1],
        [1, 2, 3, 2],
        [1, 3, 3, 3],
    ]
    .iter()
    .map(|column| column.iter().map(|&id| Some(SymbolId::new(id))).collect())
    .collect();
    assert_eq!(query::visible_grid(&world), expected);
    assert!(query::now(&world) >= Duration::from_millis(2_000));

    run_cycle(&mut world, &mut controller, &mut log);
    assert_eq!(controller.completed_cycles(), 2);
    assert_eq!(
        log.iter()
            .filter(|event| **event == Event::AllWinLinesShown)
            .count(),
        2
    );
}

#[test]
fn exhausted_source_falls_back_to_plain_stop() {
    let mut world = new_world();
    let mut controller = Controller::new(
        Config::new(Duration::from_millis(300)),
        Queue(VecDeque::new()),
    );
    let mut log = Vec::new();

    run_cycle(&mut world, &mut controller, &mut log);
    assert!(log.contains(&Event::AllStoppedSpinning));
    assert!(!log.contains(&Event::AllStoppedWithResult));
    assert!(query::is_settled(&world));
}
