//! End-to-end hunt scenarios on the simulated world.
//!
//! Run with `cargo test -p hunter-test`; filter like libtest, e.g.
//! `cargo test -p hunter-test -- rune`.

use std::sync::mpsc;

use libtest_mimic::{Arguments, Failed, Trial};

use hunter_core::command::{Command, CommandContext, Routine};
use hunter_core::job::Jobs;
use hunter_core::machine::Machine;
use hunter_core::map::MapBook;
use hunter_core::navigator::Navigator;
use hunter_core::platform::hotkey::{self, Hotkey};
use hunter_core::platform::stub::{Sim, StubVision};
use hunter_core::platform::Cue;
use hunter_core::scheduler::RoutineScheduler;
use hunter_core::strategy::StrategyKind;
use hunter_core::types::{Control, HuntingStyle, Point, PointKind, Position, StrategyState};
use hunter_core::worker::{Shared, Worker};

use hunter_test::*;

fn moves(r: &Routine) -> Vec<i32> {
    r.commands
        .iter()
        .filter_map(|c| match c {
            Command::MoveTo { x, .. } => Some(*x),
            _ => None,
        })
        .collect()
}

fn actions(r: &Routine) -> Vec<String> {
    r.commands
        .iter()
        .filter_map(|c| match c {
            Command::KeyPress { action, .. } if action != "attack" && action != "up" => Some(action.clone()),
            _ => None,
        })
        .collect()
}

fn cooldowns_gate_point_revisits() -> Result<(), Failed> {
    let sim = sim();
    let points = vec![
        Point::new(10, 50, PointKind::Summon).with_key("e"),
        Point::new(40, 50, PointKind::Portal).with_key("r").with_cooldown(60.0),
        Point::new(70, 50, PointKind::Summon).with_key("e").with_cooldown(120.0),
    ];
    let mut scheduler = RoutineScheduler::new(sim.session.clone(), points, HuntingStyle::Stationary);

    let first = scheduler.next_routine();
    ensure(moves(&first) == [10, 40, 70], format!("first sweep moves {:?}", moves(&first)))?;
    ensure(actions(&first) == ["e", "r"], format!("first sweep actions {:?}", actions(&first)))?;

    sim.clock.advance(10.0);
    let second = scheduler.next_routine();
    ensure(moves(&second) == [10, 70], format!("second sweep moves {:?}", moves(&second)))?;
    ensure(actions(&second) == ["e"], format!("second sweep actions {:?}", actions(&second)))?;
    ensure(second.hunt_duration == 10.0, format!("hunt duration {}", second.hunt_duration))?;
    ensure(
        second.commands.iter().any(|c| matches!(c, Command::KeyPress { action, .. } if action == "attack")),
        "second routine has no filler",
    )?;
    Ok(())
}

fn move_within_tolerance_completes_at_once() -> Result<(), Failed> {
    let sim = Sim::new(Jobs::single(job()), tuning(), Position::new(94, 50));
    let nav = Navigator::new(sim.session.clone());
    let ctx = CommandContext { session: &sim.session, nav: &nav, position: Some(sim.world.position()) };

    let mut near = Command::move_to(100, None, 5);
    ensure(near.attempt(&ctx), "move 6px away with tolerance 5 did not complete")?;
    ensure(sim.holds().is_empty(), format!("unexpected holds {:?}", sim.holds()))?;

    let mut far = Command::move_to(130, None, 5);
    ensure(!far.attempt(&ctx), "move 36px away completed")?;
    ensure(sim.holds() == ["right"], format!("holds {:?}", sim.holds()))?;
    Ok(())
}

fn non_looping_machine_stops_on_last_command() -> Result<(), Failed> {
    let sim = sim();
    let nav = Navigator::new(sim.session.clone());
    let ctx = CommandContext { session: &sim.session, nav: &nav, position: None };
    let mut machine = Machine::new();
    let commands = ["attack", "e", "r"].iter().map(|a| Command::key(a, 0.1)).collect();
    machine.set_routine(Routine { commands, hunt_duration: 0.0 }, false);

    for _ in 0..3 {
        machine.step(&ctx);
    }
    ensure(machine.index() == 2, format!("index {} after three steps", machine.index()))?;
    ensure(machine.is_finished(), "machine not finished")?;
    let before = sim.presses();
    machine.step(&ctx);
    machine.step(&ctx);
    ensure(machine.index() == 2, "index moved after finishing")?;
    ensure(sim.presses() == before, "finished machine pressed keys")?;
    ensure(before == ["a", "e", "r"], format!("presses {:?}", before))?;
    Ok(())
}

fn portal_rune_resumes_route_in_place() -> Result<(), Failed> {
    let mut t = tuning();
    t.hunt.portal_cycle = 60.0;
    let sim = sim_with(t);
    let (mut hunt, kind) = hunt_on(&sim, "Ridge")?;
    ensure(kind == StrategyKind::Portal, format!("loaded as {}", kind))?;
    hunt.start();
    ensure(
        drive(&sim, &mut hunt, 3000, |h| state(h) == StrategyState::Attacking),
        format!("never attacked, stuck in {}", state(&hunt)),
    )?;

    // 40s left in the 60s cycle.
    let cycle_start = hunt.status().cycle_start;
    let left = cycle_start + 20.0 - sim.session.now();
    if left > 0.0 {
        run_for(&sim, &mut hunt, left);
    }
    ensure(state(&hunt) == StrategyState::Attacking, format!("state {} before the rune", state(&hunt)))?;

    rune_beside(&sim, 30);
    hunt.step(&sim.snapshot());
    ensure(state(&hunt) == StrategyState::RuneSolving, format!("rune seen but state {}", state(&hunt)))?;
    ensure(!sim.world.held().contains(&"a".to_string()), "attack still held during rune")?;
    let index = hunt.status().progress.0;

    let mut seen = vec![StrategyState::RuneSolving];
    for _ in 0..1500 {
        sim.clock.advance(TICK);
        hunt.step(&sim.snapshot());
        let now = state(&hunt);
        if seen.last() != Some(&now) {
            seen.push(now);
        }
        if !now.is_rune() {
            break;
        }
    }
    ensure(
        seen == [StrategyState::RuneSolving, StrategyState::RuneWaiting, StrategyState::Install],
        format!("states {:?}", seen),
    )?;
    ensure(sim.world.rune().is_none(), "rune was not cleared")?;
    ensure(
        sim.alerts() == [Cue::RuneArrived, Cue::RuneSolved],
        format!("operator cues {:?}", sim.alerts()),
    )?;
    ensure(hunt.status().progress.0 == index, format!("route restarted at {} instead of {}", hunt.status().progress.0, index))?;
    ensure(hunt.status().cycle_start == cycle_start, "cycle clock was reset")?;
    Ok(())
}

fn stationary_rune_returns_to_safe_spot() -> Result<(), Failed> {
    let sim = sim();
    let (mut hunt, kind) = hunt_on(&sim, "Camp")?;
    ensure(kind == StrategyKind::Stationary, format!("loaded as {}", kind))?;
    hunt.start();
    ensure(
        drive(&sim, &mut hunt, 3000, |h| state(h) == StrategyState::Hunting),
        format!("never hunted, stuck in {}", state(&hunt)),
    )?;
    let cycle_start = hunt.status().cycle_start;
    run_for(&sim, &mut hunt, 20.0);

    rune_beside(&sim, 30);
    hunt.step(&sim.snapshot());
    ensure(state(&hunt) == StrategyState::RuneSolving, format!("rune seen but state {}", state(&hunt)))?;
    ensure(sim.world.held().iter().all(|k| k != "a"), "attack still held during rune")?;

    let mut seen = vec![StrategyState::RuneSolving];
    for _ in 0..2000 {
        sim.clock.advance(TICK);
        hunt.step(&sim.snapshot());
        let now = state(&hunt);
        if seen.last() != Some(&now) {
            seen.push(now);
        }
        if now == StrategyState::Hunting {
            break;
        }
    }
    ensure(
        seen == [
            StrategyState::RuneSolving,
            StrategyState::RuneWaiting,
            StrategyState::MovingToSafe,
            StrategyState::Hunting,
        ],
        format!("states {:?}", seen),
    )?;
    ensure(hunt.status().cycle_start == cycle_start, "cycle clock was reset by the rune")?;
    ensure((sim.world.position().x - 120).abs() <= 32, format!("ended at {:?}", sim.world.position()))?;
    Ok(())
}

fn pause_keeps_cycle_clock() -> Result<(), Failed> {
    let sim = sim();
    let (mut hunt, _) = hunt_on(&sim, "Camp")?;
    hunt.start();
    ensure(drive(&sim, &mut hunt, 3000, |h| state(h) == StrategyState::Hunting), "never hunted")?;
    run_for(&sim, &mut hunt, 5.0);
    let cycle_start = hunt.status().cycle_start;

    hunt.pause();
    ensure(hunt.status().paused, "not paused")?;
    ensure(sim.world.held().is_empty(), format!("keys held while paused: {:?}", sim.world.held()))?;
    sim.world.clear_calls();
    run_for(&sim, &mut hunt, 30.0);
    ensure(sim.world.calls().is_empty(), "paused hunt touched the keyboard")?;

    hunt.resume();
    ensure(state(&hunt) == StrategyState::Hunting, format!("resumed into {}", state(&hunt)))?;
    ensure(hunt.status().cycle_start == cycle_start, "cycle clock moved across pause")?;
    Ok(())
}

fn stop_is_idempotent() -> Result<(), Failed> {
    let sim = sim();
    let (mut hunt, _) = hunt_on(&sim, "Ridge")?;
    hunt.stop();
    hunt.start();
    drive(&sim, &mut hunt, 60, |_| false);
    hunt.stop();
    hunt.stop();
    ensure(state(&hunt) == StrategyState::Idle, format!("state {}", state(&hunt)))?;
    ensure(!hunt.is_running(), "still running")?;
    ensure(sim.world.held().is_empty(), format!("held after stop: {:?}", sim.world.held()))?;
    ensure(sim.release_all_count() >= 2, "stop did not release everything")?;
    Ok(())
}

fn perception_miss_skips_tick() -> Result<(), Failed> {
    let sim = sim();
    let (mut hunt, _) = hunt_on(&sim, "Ridge")?;
    hunt.start();
    sim.world.clear_calls();
    for _ in 0..10 {
        hunt.step(&sim.blind());
        sim.clock.advance(TICK);
    }
    ensure(sim.world.calls().is_empty(), format!("calls without perception: {:?}", sim.world.calls()))?;
    ensure(state(&hunt) == StrategyState::Install, format!("state {}", state(&hunt)))?;
    Ok(())
}

fn routine_hunt_walks_points_and_fires_actions() -> Result<(), Failed> {
    let sim = sim();
    let (mut hunt, kind) = hunt_on(&sim, "Trail")?;
    ensure(kind == StrategyKind::Routine, format!("loaded as {}", kind))?;
    hunt.start();
    ensure(
        drive(&sim, &mut hunt, 3000, |_| sim.presses().contains(&"e".to_string())),
        format!("summon never pressed, presses {:?}", sim.presses()),
    )?;
    ensure((sim.world.position().x - 90).abs() <= 10, format!("pressed at {:?}", sim.world.position()))?;
    let status = hunt.status();
    ensure(status.cycle_duration == 10.0, format!("planned {}s", status.cycle_duration))?;
    ensure(status.describe().starts_with("routine step"), status.describe())?;
    Ok(())
}

fn routine_move_survives_pause_and_rune() -> Result<(), Failed> {
    let sim = sim();
    let (mut hunt, kind) = hunt_on(&sim, "Ravine")?;
    ensure(kind == StrategyKind::Routine, format!("loaded as {}", kind))?;
    hunt.start();
    drive(&sim, &mut hunt, 10, |_| false);
    let walked_to = sim.world.position().x;

    hunt.pause();
    run_for(&sim, &mut hunt, 20.0);
    hunt.resume();
    drive(&sim, &mut hunt, 30, |_| false);
    ensure(hunt.status().progress.0 == 0, format!("left the move at {:?}", hunt.status().progress))?;
    ensure(sim.world.position().x > walked_to, "stopped walking after resume")?;

    rune_beside(&sim, 20);
    ensure(drive(&sim, &mut hunt, 100, |h| state(h).is_rune()), "rune never taken")?;
    ensure(
        drive(&sim, &mut hunt, 600, |h| state(h) == StrategyState::Hunting),
        format!("rune never resolved, state {}", state(&hunt)),
    )?;
    ensure(!sim.presses().contains(&"e".to_string()), "summon pressed before reaching its point")?;

    ensure(
        drive(&sim, &mut hunt, 600, |_| sim.presses().contains(&"e".to_string())),
        format!("summon never pressed, presses {:?}", sim.presses()),
    )?;
    ensure((sim.world.position().x - 300).abs() <= 8, format!("pressed at {:?}", sim.world.position()))?;
    Ok(())
}

fn worker_follows_switches_and_controls() -> Result<(), Failed> {
    let sim = sim();
    let vision = Box::new(StubVision::new(sim.world.clone(), sim.clock.clone()));
    let shared = Shared::new();
    let (tx, rx) = mpsc::channel();
    let mut worker = Worker::new(sim.session.clone(), vision, MapBook::parse(MAPS)?, shared.clone(), rx);

    tx.send(Control::LoadMap("Camp".into()))?;
    ensure(worker.tick(), "worker quit on load")?;
    ensure(shared.frame.read().status.describe() == "Camp ready (stationary)", shared.frame.read().status.describe())?;

    hotkey::apply(Hotkey::ToggleEnabled, &shared.switches);
    let mut hunting = false;
    for _ in 0..3000 {
        ensure(worker.tick(), "worker quit while hunting")?;
        if shared.frame.read().status.state == StrategyState::Hunting {
            hunting = true;
            break;
        }
        sim.clock.advance(TICK);
    }
    ensure(hunting, format!("frame stuck at {}", shared.frame.read().status.state))?;
    ensure(shared.frame.read().status.describe().starts_with("hunting"), shared.frame.read().status.describe())?;

    tx.send(Control::Pause)?;
    worker.tick();
    ensure(shared.frame.read().status.paused, "pause control ignored")?;
    tx.send(Control::Resume)?;
    worker.tick();
    ensure(!shared.frame.read().status.paused, "resume control ignored")?;

    hotkey::apply(Hotkey::RecordPosition, &shared.switches);
    hotkey::apply(Hotkey::ToggleEnabled, &shared.switches);
    worker.tick();
    ensure(!shared.switches.take_record(), "record request was not consumed")?;
    ensure(shared.frame.read().status.state == StrategyState::Idle, "disable did not stop the hunt")?;
    ensure(sim.world.held().is_empty(), format!("held after disable: {:?}", sim.world.held()))?;

    tx.send(Control::Quit)?;
    ensure(!worker.tick(), "worker ignored quit")?;
    Ok(())
}

fn main() {
    let args = Arguments::from_args();
    let trials = vec![
        Trial::test("scheduler::cooldowns_gate_point_revisits", cooldowns_gate_point_revisits),
        Trial::test("command::move_within_tolerance_completes_at_once", move_within_tolerance_completes_at_once),
        Trial::test("machine::non_looping_machine_stops_on_last_command", non_looping_machine_stops_on_last_command),
        Trial::test("rune::portal_rune_resumes_route_in_place", portal_rune_resumes_route_in_place),
        Trial::test("rune::stationary_rune_returns_to_safe_spot", stationary_rune_returns_to_safe_spot),
        Trial::test("hunt::pause_keeps_cycle_clock", pause_keeps_cycle_clock),
        Trial::test("hunt::stop_is_idempotent", stop_is_idempotent),
        Trial::test("hunt::perception_miss_skips_tick", perception_miss_skips_tick),
        Trial::test("hunt::routine_hunt_walks_points_and_fires_actions", routine_hunt_walks_points_and_fires_actions),
        Trial::test("hunt::routine_move_survives_pause_and_rune", routine_move_survives_pause_and_rune),
        Trial::test("worker::worker_follows_switches_and_controls", worker_follows_switches_and_controls),
    ];
    libtest_mimic::run(&args, trials).exit();
}
