//! Integration tests for the timer-driven run loop
//!
//! Uses tokio's paused clock so every driver ticks deterministically.

use std::time::Duration;

use blockstage::runtime::actor::{Actor, Pose};
use blockstage::runtime::{BlockKind, BlockNode, Stage, StageConfig, StageEvent, World};
use tokio::sync::broadcast::Receiver;

fn stage_with(actors: Vec<Actor>) -> Stage {
    let config = StageConfig {
        seed: Some(11),
        ..StageConfig::default()
    };
    let world = World::with_actors(actors, &config).unwrap();
    Stage::from_world(config, world)
}

fn drain(events: &mut Receiver<StageEvent>) -> Vec<StageEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

fn pose(stage: &Stage, index: usize) -> Pose {
    stage.snapshot().actors[index].pose
}

#[tokio::test(start_paused = true)]
async fn test_move_applies_once_per_run() {
    let a = Actor::new("A", Pose::new(0.0, 0.0, 90.0), "#FF5722");
    let b = Actor::new("B", Pose::new(300.0, 0.0, 270.0), "#2196F3");
    let a_id = a.id;
    let mut stage = stage_with(vec![a, b]);
    stage
        .insert_block(BlockNode::new(BlockKind::move_steps(10.0)), None, a_id)
        .unwrap();

    assert!(stage.run().unwrap());
    tokio::time::sleep(Duration::from_millis(50)).await;

    let after_first = pose(&stage, 0);
    assert!((after_first.x - 10.0).abs() < 1e-9);
    assert!(after_first.y.abs() < 1e-9);

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(pose(&stage, 0), after_first);

    stage.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_repeat_spreads_iterations_over_ticks() {
    let a = Actor::new("A", Pose::new(0.0, 0.0, 90.0), "#FF5722");
    let a_id = a.id;
    let mut stage = stage_with(vec![a]);
    let repeat = stage
        .insert_block(BlockNode::new(BlockKind::repeat(5)), None, a_id)
        .unwrap();
    stage
        .insert_block(BlockNode::new(BlockKind::move_steps(2.0)), Some(repeat), a_id)
        .unwrap();

    stage.run().unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    let partial = pose(&stage, 0).x;
    assert!(partial > 0.0 && partial < 10.0, "expected partial progress, got {partial}");

    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert!((pose(&stage, 0).x - 10.0).abs() < 1e-9);

    stage.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_freezes_positions_and_is_idempotent() {
    let a = Actor::new("A", Pose::new(0.0, 0.0, 90.0), "#FF5722");
    let a_id = a.id;
    let mut stage = stage_with(vec![a]);
    let mut events = stage.subscribe();
    let repeat = stage
        .insert_block(BlockNode::new(BlockKind::repeat(1000)), None, a_id)
        .unwrap();
    stage
        .insert_block(BlockNode::new(BlockKind::move_steps(1.0)), Some(repeat), a_id)
        .unwrap();

    stage.run().unwrap();
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(stage.stop());
    assert!(!stage.stop());

    let frozen = pose(&stage, 0);
    assert!(frozen.x > 0.0);
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(pose(&stage, 0), frozen);

    assert!(!stage.is_running());
    assert!(stage.with_world(|world| world.run_state().is_none()));

    let lifecycle: Vec<_> = drain(&mut events)
        .into_iter()
        .filter(|event| matches!(event, StageEvent::RunStarted { .. } | StageEvent::RunStopped))
        .collect();
    assert_eq!(
        lifecycle,
        vec![StageEvent::RunStarted { actors: 1 }, StageEvent::RunStopped]
    );
}

#[tokio::test(start_paused = true)]
async fn test_rerun_replays_programs() {
    let a = Actor::new("A", Pose::new(0.0, 0.0, 90.0), "#FF5722");
    let a_id = a.id;
    let mut stage = stage_with(vec![a]);
    stage
        .insert_block(BlockNode::new(BlockKind::move_steps(10.0)), None, a_id)
        .unwrap();

    stage.run().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    stage.stop();

    stage.run().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    stage.stop();

    assert!((pose(&stage, 0).x - 20.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_start_emits_one_collision() {
    let a = Actor::new("A", Pose::new(0.0, 0.0, 90.0), "#FF5722");
    let b = Actor::new("B", Pose::new(10.0, 0.0, 270.0), "#2196F3");
    let (a_id, b_id) = (a.id, b.id);
    let mut stage = stage_with(vec![a, b]);
    let mut events = stage.subscribe();
    let say = stage
        .insert_block(BlockNode::new(BlockKind::say("hi")), None, a_id)
        .unwrap();

    stage.run().unwrap();
    tokio::time::sleep(Duration::from_millis(1000)).await;
    stage.shutdown().await;

    let collisions: Vec<_> = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            StageEvent::Collision(collision) => Some(collision),
            _ => None,
        })
        .collect();
    assert_eq!(collisions.len(), 1);
    let mut pair = [collisions[0].first, collisions[0].second];
    pair.sort();
    let mut expected = [a_id, b_id];
    expected.sort();
    assert_eq!(pair, expected);

    stage.with_world(|world| {
        assert_eq!(world.programs().locate(say).unwrap().0, b_id);
    });
}

#[tokio::test(start_paused = true)]
async fn test_reset_stops_and_restores_baseline() {
    let a = Actor::new("A", Pose::new(5.0, 5.0, 90.0), "#FF5722");
    let a_id = a.id;
    let mut stage = stage_with(vec![a]);
    stage
        .insert_block(BlockNode::new(BlockKind::go_to(-80.0, 40.0)), None, a_id)
        .unwrap();
    stage
        .insert_block(BlockNode::new(BlockKind::turn(45.0)), None, a_id)
        .unwrap();

    stage.run().unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(pose(&stage, 0), Pose::new(-80.0, 40.0, 135.0));

    stage.reset();
    assert!(!stage.is_running());
    assert_eq!(pose(&stage, 0), Pose::new(5.0, 5.0, 90.0));
}

#[tokio::test(start_paused = true)]
async fn test_actor_added_mid_run_is_not_driven() {
    let a = Actor::new("A", Pose::new(0.0, 0.0, 90.0), "#FF5722");
    let mut stage = stage_with(vec![a]);

    stage.run().unwrap();
    let late = stage.add_actor();
    stage
        .insert_block(BlockNode::new(BlockKind::go_to(77.0, 77.0)), None, late)
        .unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    let snapshot = stage.snapshot();
    let late_actor = snapshot.actors.iter().find(|actor| actor.id == late).unwrap();
    assert_ne!((late_actor.pose.x, late_actor.pose.y), (77.0, 77.0));

    stage.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_events_follow_run_stopped() {
    let config = StageConfig {
        tick_interval_ms: 5,
        seed: Some(5),
        ..StageConfig::default()
    };
    let actors: Vec<_> = (0..2)
        .map(|i| Actor::new(format!("S{i}"), Pose::new(i as f64 * 200.0, 0.0, 90.0), "#FF5722"))
        .collect();
    let ids: Vec<_> = actors.iter().map(|actor| actor.id).collect();
    let mut world = World::with_actors(actors, &config).unwrap();
    for id in &ids {
        let repeat = world
            .insert_block(BlockNode::new(BlockKind::repeat(1_000_000)), None, *id)
            .unwrap();
        world
            .insert_block(BlockNode::new(BlockKind::say("tick")), Some(repeat), *id)
            .unwrap();
    }
    let mut stage = Stage::from_world(config, world);
    let mut events = stage.subscribe();

    stage.run().unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(stage.stop());
    tokio::time::sleep(Duration::from_millis(20)).await;

    let seen = drain(&mut events);
    let stopped = seen
        .iter()
        .position(|event| *event == StageEvent::RunStopped)
        .unwrap();
    assert_eq!(stopped, seen.len() - 1);
    assert!(seen.iter().any(|event| matches!(event, StageEvent::Said { .. })));
}
