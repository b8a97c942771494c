//! Round lifecycle through the public API, including concurrent access
//! from command handlers and the expiry sweeper.

use chrono::{Duration, Utc};
use pokerdice::games::TurnStage;
use pokerdice::{
    DiceRoller, ExpirySweeper, InMemoryResultRepository, PlayerProfile, PokerDiceConfig,
    PokerDiceService, ResultRepository, RoundError, ServiceBuilder,
};
use std::sync::Arc;

const GROUP: i64 = -100_200;

fn service_with_results() -> (Arc<PokerDiceService>, Arc<InMemoryResultRepository>) {
    let results = Arc::new(InMemoryResultRepository::new());
    let service = ServiceBuilder::new()
        .with_config(PokerDiceConfig::default())
        .with_roller(Arc::new(DiceRoller::seeded(31)))
        .with_results(results.clone())
        .build()
        .expect("Failed to build service");
    (Arc::new(service), results)
}

fn profile(id: i64, name: &str) -> PlayerProfile {
    PlayerProfile::new(id, &name.to_lowercase(), name)
}

#[tokio::test]
async fn test_full_round_then_restart() {
    let (service, results) = service_with_results();
    let ann = profile(1, "Ann");
    let bob = profile(2, "Bob");

    service.start_round(GROUP, ann.id).unwrap();
    assert!(service.roll_dice(GROUP, &ann).await.unwrap().is_some());
    assert!(service.roll_dice(GROUP, &bob).await.unwrap().is_some());
    assert!(!service.check_complete(GROUP));

    assert!(service.pass_turn(GROUP, ann.id));
    assert!(!service.check_complete(GROUP));
    assert!(service.pass_turn(GROUP, bob.id));
    assert!(service.check_complete(GROUP));

    let round = service.finalize(GROUP).await.unwrap();
    assert_eq!(round.results.len(), 2);
    assert!(round.results.contains_key(&ann.id));
    assert!(round.results.contains_key(&bob.id));
    assert!(round.winner.is_some());
    assert!(round.players.values().all(|p| p.stage == TurnStage::Resolved));
    assert!(!service.registry().contains(GROUP));

    let now = Utc::now();
    let recorded = results
        .find_between(GROUP, now - Duration::days(1), now + Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(Some(recorded[0].winner_id), round.winner);

    assert!(service.start_round(GROUP, bob.id).is_ok());
}

#[tokio::test]
async fn test_finish_discards_round() {
    let (service, results) = service_with_results();
    service.start_round(GROUP, 1).unwrap();
    service.roll_dice(GROUP, &profile(1, "Ann")).await.unwrap();
    service.roll_dice(GROUP, &profile(2, "Bob")).await.unwrap();

    assert!(!service.finish_round(GROUP, 2));
    assert!(service.finish_round(GROUP, 1));
    assert_eq!(
        service.finalize(GROUP).await.unwrap_err(),
        RoundError::AlreadyFinalized { group_id: GROUP }
    );
    assert_eq!(results.total(), 0);
}

#[tokio::test]
async fn test_late_roll_after_completion_is_rejected() {
    let (service, _) = service_with_results();
    service.start_round(GROUP, 1).unwrap();
    service.roll_dice(GROUP, &profile(1, "Ann")).await.unwrap();
    service.roll_dice(GROUP, &profile(2, "Bob")).await.unwrap();
    service.pass_turn(GROUP, 1);
    service.reroll_dice(GROUP, 2, "/reroll 1 2 3 4 5 6");
    assert!(!service.check_complete(GROUP));

    service.pass_turn(GROUP, 2);
    assert!(service.complete_if_ready(GROUP).await.is_some());
    assert!(service.roll_dice(GROUP, &profile(3, "Cid")).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_starts_create_one_round() {
    let (service, _) = service_with_results();

    let mut handles = Vec::new();
    for initiator in 1..=32 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move { service.start_round(GROUP, initiator) }));
    }

    let mut created = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(RoundError::AlreadyActive { group_id }) => {
                assert_eq!(group_id, GROUP);
                rejected += 1;
            }
            Err(other) => panic!("Unexpected error: {:?}", other),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(rejected, 31);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rolls_keep_pending_count() {
    let (service, _) = service_with_results();
    service.start_round(GROUP, 1).unwrap();

    // Every player tries to roll twice at the same time.
    let mut handles = Vec::new();
    for id in 1..=20 {
        for _ in 0..2 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                let name = format!("P{}", id);
                service.roll_dice(GROUP, &profile(id, &name)).await.unwrap()
            }));
        }
    }

    let mut rolled = 0;
    for handle in handles {
        if handle.await.unwrap().is_some() {
            rolled += 1;
        }
    }
    assert_eq!(rolled, 20);

    let round = service.registry().snapshot(GROUP).unwrap();
    assert_eq!(round.players.len(), 20);
    assert_eq!(round.pending_actions, 20);

    let mut handles = Vec::new();
    for id in 1..=20 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            let passed = service.pass_turn(GROUP, id);
            (passed, service.complete_if_ready(GROUP).await)
        }));
    }

    let mut passes = 0;
    let mut completions = 0;
    for handle in handles {
        let (passed, completed) = handle.await.unwrap();
        passes += passed as usize;
        completions += completed.is_some() as usize;
    }
    assert_eq!(passes, 20);
    assert_eq!(completions, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_finalize_has_one_winner() {
    for _ in 0..20 {
        let (service, results) = service_with_results();
        service.start_round(GROUP, 1).unwrap();
        service.roll_dice(GROUP, &profile(1, "Ann")).await.unwrap();
        service.roll_dice(GROUP, &profile(2, "Bob")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move { service.finalize(GROUP).await }));
        }

        let mut finalized = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(round) => {
                    assert_eq!(round.results.len(), 2);
                    finalized += 1;
                }
                Err(e) => assert_eq!(e, RoundError::AlreadyFinalized { group_id: GROUP }),
            }
        }
        assert_eq!(finalized, 1);
        assert_eq!(results.total(), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sweep_races_command_completion() {
    for _ in 0..20 {
        let (service, results) = service_with_results();
        let registry = service.registry();
        registry
            .start_round_at(GROUP, 1, Utc::now() - Duration::minutes(10))
            .unwrap();
        service.roll_dice(GROUP, &profile(1, "Ann")).await.unwrap();
        service.roll_dice(GROUP, &profile(2, "Bob")).await.unwrap();
        service.pass_turn(GROUP, 1);
        service.pass_turn(GROUP, 2);

        let sweeper = ExpirySweeper::new(Arc::clone(&service));
        let sweep = {
            let sweeper = Arc::clone(&sweeper);
            tokio::spawn(async move { sweeper.sweep_once(Utc::now()).await })
        };
        let command = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.complete_if_ready(GROUP).await })
        };

        let swept = sweep.await.unwrap().len();
        let completed = command.await.unwrap().is_some() as usize;
        assert_eq!(swept + completed, 1);
        assert_eq!(results.total(), 1);
        assert!(!registry.contains(GROUP));
    }
}

#[tokio::test]
async fn test_sweep_leaves_replacement_round_alone() {
    let (service, _) = service_with_results();
    let registry = service.registry();
    let now = Utc::now();

    let old_round = registry
        .start_round_at(GROUP, 1, now - Duration::minutes(10))
        .unwrap();
    let expired = registry.expired_rounds(now);
    assert_eq!(expired, vec![(GROUP, old_round)]);

    // The round is finished and a new one started between scan and act.
    assert!(service.finish_round(GROUP, 1));
    let new_round = service.start_round(GROUP, 2).unwrap();

    assert!(service.finalize_expired(GROUP, old_round, now).await.is_none());
    assert_eq!(registry.snapshot(GROUP).unwrap().round_id, new_round);
}
