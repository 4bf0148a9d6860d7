//! Integration tests for the Store: feedback loop, action broadcasting and
//! graceful shutdown.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use rentcar_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use rentcar_runtime::{HealthStatus, Store, StoreError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

/// A toy fleet: cars can be reserved once, and a reservation is confirmed
/// by an asynchronous "payment" effect.
#[derive(Debug, Clone, PartialEq)]
enum FleetAction {
    Reserve { car: u32 },
    Confirmed { car: u32 },
    Rejected { car: u32, reason: String },
    Hold { car: u32, millis: u64 },
    Released { car: u32 },
    Batch { cars: Vec<u32> },
}

impl FleetAction {
    fn is_outcome_for(&self, wanted: u32) -> bool {
        matches!(self,
            Self::Confirmed { car } | Self::Rejected { car, .. } if *car == wanted)
    }
}

#[derive(Debug, Clone, Default)]
struct FleetState {
    reserved: HashSet<u32>,
    confirmed: Vec<u32>,
    rejections: usize,
}

#[derive(Clone)]
struct FleetEnvironment;

#[derive(Clone)]
struct FleetReducer;

impl Reducer for FleetReducer {
    type State = FleetState;
    type Action = FleetAction;
    type Environment = FleetEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            FleetAction::Reserve { car } => {
                if !state.reserved.insert(car) {
                    return smallvec![Effect::send(FleetAction::Rejected {
                        car,
                        reason: "already reserved".to_string(),
                    })];
                }
                smallvec![Effect::Future(Box::pin(async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Some(FleetAction::Confirmed { car })
                }))]
            },
            FleetAction::Confirmed { car } => {
                state.confirmed.push(car);
                SmallVec::new()
            },
            FleetAction::Rejected { .. } => {
                state.rejections += 1;
                SmallVec::new()
            },
            FleetAction::Hold { car, millis } => smallvec![Effect::Delay {
                duration: Duration::from_millis(millis),
                action: Box::new(FleetAction::Released { car }),
            }],
            FleetAction::Released { car } => {
                state.reserved.remove(&car);
                SmallVec::new()
            },
            FleetAction::Batch { cars } => smallvec![Effect::chain(
                cars.into_iter()
                    .map(|car| Effect::send(FleetAction::Reserve { car }))
                    .collect()
            )],
        }
    }
}

fn fleet() -> Store<FleetState, FleetAction, FleetEnvironment, FleetReducer> {
    Store::new(FleetState::default(), FleetReducer, FleetEnvironment)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn send_and_wait_for_returns_effect_result() {
    let store = fleet();

    let outcome = store
        .send_and_wait_for(
            FleetAction::Reserve { car: 1 },
            |a| a.is_outcome_for(1),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    assert_eq!(outcome, FleetAction::Confirmed { car: 1 });
    assert_eq!(store.state(|s| s.confirmed.clone()).await, vec![1]);
}

#[tokio::test]
async fn rejections_are_observable() {
    let store = fleet();
    store
        .send_and_wait_for(
            FleetAction::Reserve { car: 7 },
            |a| a.is_outcome_for(7),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    let second = store
        .send_and_wait_for(
            FleetAction::Reserve { car: 7 },
            |a| a.is_outcome_for(7),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    assert!(matches!(second, FleetAction::Rejected { car: 7, .. }));
    // The rejection is also fed back into the reducer.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(store.state(|s| s.rejections).await, 1);
}

#[tokio::test]
async fn times_out_when_nothing_matches() {
    let store = fleet();

    let result = store
        .send_and_wait_for(
            FleetAction::Reserve { car: 2 },
            |a| matches!(a, FleetAction::Released { .. }),
            Duration::from_millis(50),
        )
        .await;

    assert!(matches!(result, Err(StoreError::Timeout)));
}

#[tokio::test]
async fn concurrent_requests_see_only_their_outcome() {
    let store = Arc::new(fleet());
    let mut tasks = Vec::new();

    for car in 10..15 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            store
                .send_and_wait_for(
                    FleetAction::Reserve { car },
                    move |a| a.is_outcome_for(car),
                    Duration::from_secs(2),
                )
                .await
        }));
    }

    for (i, task) in tasks.into_iter().enumerate() {
        let outcome = task.await.expect("task panicked").unwrap();
        let car = 10 + u32::try_from(i).unwrap();
        assert_eq!(outcome, FleetAction::Confirmed { car });
    }
    assert_eq!(store.state(|s| s.confirmed.len()).await, 5);
}

#[tokio::test]
async fn initial_actions_are_not_broadcast() {
    let store = fleet();
    let mut rx = store.subscribe_actions();

    let mut handle = store.send(FleetAction::Reserve { car: 3 }).await.unwrap();
    handle
        .wait_with_timeout(Duration::from_secs(1))
        .await
        .unwrap();

    let actions: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert_eq!(actions, vec![FleetAction::Confirmed { car: 3 }]);
}

#[tokio::test]
async fn delayed_actions_are_broadcast() {
    let store = fleet();
    let mut rx = store.subscribe_actions();

    store
        .send(FleetAction::Hold { car: 4, millis: 10 })
        .await
        .unwrap();

    let action = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timeout waiting for delayed action")
        .expect("channel closed");
    assert_eq!(action, FleetAction::Released { car: 4 });
}

#[tokio::test]
async fn sequential_effects_all_run() {
    let store = fleet();

    store
        .send(FleetAction::Batch {
            cars: vec![21, 22, 23],
        })
        .await
        .unwrap();

    let mut confirmed = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            if store.state(|s| s.confirmed.len()).await == 3 {
                break store.state(|s| s.confirmed.clone()).await;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    confirmed.sort_unstable();
    assert_eq!(confirmed, vec![21, 22, 23]);
}

#[tokio::test]
async fn shutdown_waits_then_rejects() {
    let store = fleet();
    store
        .send(FleetAction::Hold { car: 5, millis: 50 })
        .await
        .unwrap();

    assert_eq!(store.health().status, HealthStatus::Healthy);
    store.shutdown(Duration::from_secs(2)).await.unwrap();

    assert!(store.health().status.is_unhealthy());
    let result = store.send(FleetAction::Reserve { car: 6 }).await;
    assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
}

#[tokio::test]
async fn shutdown_times_out_on_long_effects() {
    let store = fleet();
    store
        .send(FleetAction::Hold { car: 8, millis: 5_000 })
        .await
        .unwrap();

    let result = store.shutdown(Duration::from_millis(150)).await;
    assert!(matches!(result, Err(StoreError::ShutdownTimeout(1))));
}
