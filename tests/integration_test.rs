//! Integration Tests - Settlement Flow Across Ports
//!
//! Tests the interaction between usecases, ports, and mock adapters.
//! Uses mockall for trait mocking and tokio::test for async tests.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::{Duration, Utc};
use mockall::mock;
use mockall::predicate::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_test::{assert_err, assert_ok};

use sportsbook_settler::adapters::metrics::{HealthState, MetricsRegistry};
use sportsbook_settler::adapters::persistence::FileBetStore;
use sportsbook_settler::config::SettlementConfig;
use sportsbook_settler::domain::{
    Bet, BetId, BetSlip, BetStatus, BettingLimits, LifecycleStatus, MatchId, MatchSnapshot,
    Selection, SelectionStatus, SlipEntry, Transaction, TransactionKind,
};
use sportsbook_settler::ports::bet_store::{BetStore, BetUpdate, SettlementTransition};
use sportsbook_settler::ports::match_feed::MatchFeed;
use sportsbook_settler::usecases::{BetPlacement, SettlementRunner, SettlementService};

// ---- Mock Definitions ----

mock! {
    pub Feed {}

    #[async_trait::async_trait]
    impl MatchFeed for Feed {
        async fn snapshot(&self, match_id: MatchId) -> anyhow::Result<MatchSnapshot>;
        async fn is_healthy(&self) -> bool;
    }
}

mock! {
    pub Store {}

    #[async_trait::async_trait]
    impl BetStore for Store {
        async fn balance(&self, user_id: &str) -> anyhow::Result<Decimal>;
        async fn place_bet(&self, bet: &Bet, debit: &Transaction) -> anyhow::Result<Decimal>;
        async fn get_bet(&self, bet_id: BetId) -> anyhow::Result<Option<Bet>>;
        async fn open_bets(&self) -> anyhow::Result<Vec<Bet>>;
        async fn apply_evaluation(&self, update: &BetUpdate) -> anyhow::Result<SettlementTransition>;
        async fn transactions(&self, user_id: &str) -> anyhow::Result<Vec<Transaction>>;
        async fn is_healthy(&self) -> bool;
    }
}

// ---- Helpers ----

fn entry(match_id: MatchId, label: &str, odd: Decimal) -> SlipEntry {
    SlipEntry {
        match_id,
        home_team: "Benfica".to_string(),
        away_team: "Porto".to_string(),
        market_label: label.to_string(),
        odd,
    }
}

fn bet(legs: &[(MatchId, &str)]) -> Bet {
    let selections = legs
        .iter()
        .map(|(id, label)| Selection::from_entry(&entry(*id, label, dec!(2.0))).unwrap())
        .collect();
    Bet::new("punter".to_string(), selections, dec!(10), Utc::now())
}

fn live(h: u32, a: u32) -> MatchSnapshot {
    MatchSnapshot::new(h, a, LifecycleStatus::Live)
}

fn ended(h: u32, a: u32) -> MatchSnapshot {
    MatchSnapshot::new(h, a, LifecycleStatus::Ended)
}

fn service(feed: MockFeed, store: MockStore) -> (SettlementService<MockFeed, MockStore>, Arc<MetricsRegistry>) {
    let metrics = Arc::new(MetricsRegistry::new().unwrap());
    let svc = SettlementService::new(Arc::new(feed), Arc::new(store), Arc::clone(&metrics), 4);
    (svc, metrics)
}

fn temp_dir() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("settler-it-{}", uuid::Uuid::new_v4()))
}

// ---- Settlement Service ----

#[tokio::test]
async fn test_evaluate_settles_early_and_full_time_legs() {
    let mut feed = MockFeed::new();
    feed.expect_snapshot()
        .with(eq(100u64))
        .times(1)
        .returning(|_| Ok(live(2, 1)));
    feed.expect_snapshot()
        .with(eq(101u64))
        .times(1)
        .returning(|_| Ok(ended(1, 0)));

    let (svc, _) = service(feed, MockStore::new());
    let b = bet(&[(100, "Over 2.5"), (101, "1"), (100, "1")]);

    let eval = svc.evaluate(&b).await;
    let statuses: Vec<_> = eval
        .update
        .legs
        .iter()
        .map(|l| (l.index, l.outcome.status(), l.outcome.is_decided()))
        .collect();

    assert_eq!(
        statuses,
        vec![
            (0, SelectionStatus::Won, true),
            (1, SelectionStatus::Won, true),
            (2, SelectionStatus::Pending, false),
        ]
    );
    assert_eq!(eval.provisional_status, BetStatus::Pending);
    assert_eq!(eval.fetch_failures, 0);
    assert_eq!(eval.update.legs[0].outcome.reason(), Some("Total goals: 3 > 2.5"));
}

#[tokio::test]
async fn test_decided_legs_are_not_refetched() {
    let mut feed = MockFeed::new();
    feed.expect_snapshot()
        .with(eq(101u64))
        .times(1)
        .returning(|_| Ok(live(0, 0)));

    let (svc, _) = service(feed, MockStore::new());
    let mut b = bet(&[(100, "BTTS"), (101, "X")]);
    b.selections[0].outcome = sportsbook_settler::domain::SelectionOutcome::won("Both teams scored");

    let eval = svc.evaluate(&b).await;
    assert_eq!(eval.update.legs.len(), 1);
    assert_eq!(eval.update.legs[0].index, 1);
}

#[tokio::test]
async fn test_feed_failure_leaves_leg_pending() {
    let mut feed = MockFeed::new();
    feed.expect_snapshot()
        .returning(|_| Err(anyhow::anyhow!("feed returned 503")));

    let mut store = MockStore::new();
    store
        .expect_apply_evaluation()
        .withf(|u| u.legs.is_empty())
        .times(1)
        .returning(|_| Ok(SettlementTransition::Unchanged));

    let (svc, metrics) = service(feed, store);
    let b = bet(&[(100, "Over 0.5"), (101, "2")]);

    let eval = svc.evaluate(&b).await;
    assert_eq!(eval.fetch_failures, 2);
    assert_eq!(eval.provisional_status, BetStatus::Pending);

    let t = svc.settle(&b).await.unwrap();
    assert_eq!(t, SettlementTransition::Unchanged);

    let text = metrics.render().unwrap();
    assert!(text.contains("sportsbook_settler_snapshot_requests_total{result=\"error\"} 4"));
}

#[tokio::test]
async fn test_unroutable_label_is_reported_and_stays_pending() {
    let mut feed = MockFeed::new();
    feed.expect_snapshot().returning(|_| Ok(ended(3, 3)));

    let mut store = MockStore::new();
    store
        .expect_apply_evaluation()
        .returning(|_| Ok(SettlementTransition::Unchanged));

    let (svc, metrics) = service(feed, store);
    let mut b = bet(&[(100, "1")]);
    b.selections[0].market = None;
    b.selections[0].market_label = "Exact Corners 9".to_string();

    let eval = svc.evaluate(&b).await;
    assert_eq!(eval.unrecognized, 1);
    assert!(!eval.update.legs[0].outcome.is_decided());

    svc.settle(&b).await.unwrap();
    let text = metrics.render().unwrap();
    assert!(text.contains(
        "sportsbook_settler_unrecognized_markets_total{reason=\"unrecognized\"} 2"
    ));
}

#[tokio::test]
async fn test_settle_records_win_metrics() {
    let mut feed = MockFeed::new();
    feed.expect_snapshot().returning(|_| Ok(ended(2, 2)));

    let mut store = MockStore::new();
    store
        .expect_apply_evaluation()
        .withf(|u| u.legs.len() == 2 && u.legs.iter().all(|l| l.outcome.is_decided()))
        .times(1)
        .returning(|_| {
            Ok(SettlementTransition::Settled {
                status: BetStatus::Won,
                credited: Some(dec!(40)),
            })
        });

    let (svc, metrics) = service(feed, store);
    let b = bet(&[(100, "X"), (100, "BTTS Yes")]);

    let t = svc.settle(&b).await.unwrap();
    assert!(t.is_final());

    let text = metrics.render().unwrap();
    assert!(text.contains("sportsbook_settler_bets_settled_total{status=\"won\"} 1"));
    assert!(text.contains("sportsbook_settler_winnings_credited_total 40"));
    assert!(text.contains(
        "sportsbook_settler_selections_decided_total{market=\"match_result\",status=\"won\"} 1"
    ));
}

#[tokio::test]
async fn test_final_bet_is_short_circuited() {
    let (svc, _) = service(MockFeed::new(), MockStore::new());
    let mut b = bet(&[(100, "1")]);
    b.status = BetStatus::Lost;

    let t = assert_ok!(svc.settle(&b).await);
    assert_eq!(t, SettlementTransition::AlreadyFinal(BetStatus::Lost));
}

#[tokio::test]
async fn test_sweep_reports_failures_per_bet() {
    let mut feed = MockFeed::new();
    feed.expect_snapshot().returning(|_| Ok(ended(0, 1)));

    let good = bet(&[(100, "2")]);
    let bad = bet(&[(101, "2")]);
    let good_id = good.id;

    let mut store = MockStore::new();
    store.expect_apply_evaluation().returning(move |u| {
        if u.bet_id == good_id {
            Ok(SettlementTransition::Settled {
                status: BetStatus::Won,
                credited: Some(dec!(20)),
            })
        } else {
            Err(anyhow::anyhow!("disk full"))
        }
    });

    let (svc, _) = service(feed, store);
    let report = svc.sweep(vec![good, bad]).await;

    assert_eq!(report.results.len(), 2);
    assert_eq!(report.bets_won, 1);
    assert_eq!(report.bets_failed, 1);
    assert_eq!(report.total_credited, dec!(20));
    assert_eq!(report.final_bets().collect::<Vec<_>>(), vec![good_id]);
}

// ---- Runner ----

#[tokio::test]
async fn test_runner_polls_due_bets_and_retires_final_ones() {
    let finished = bet(&[(100, "Under 1.5")]);
    let running = bet(&[(101, "Over 4.5")]);
    let finished_id = finished.id;
    let open = vec![finished, running];

    let mut feed = MockFeed::new();
    feed.expect_is_healthy().return_const(true);
    feed.expect_snapshot().returning(|_| Ok(live(1, 1)));

    let mut store = MockStore::new();
    store.expect_is_healthy().return_const(true);
    store
        .expect_open_bets()
        .returning(move || Ok(open.clone()));
    store.expect_apply_evaluation().returning(move |u| {
        if u.bet_id == finished_id {
            Ok(SettlementTransition::Settled {
                status: BetStatus::Lost,
                credited: None,
            })
        } else {
            Ok(SettlementTransition::Unchanged)
        }
    });

    let metrics = Arc::new(MetricsRegistry::new().unwrap());
    let health = Arc::new(HealthState::new());
    let mut runner = SettlementRunner::new(
        Arc::new(feed),
        Arc::new(store),
        Arc::clone(&metrics),
        Arc::clone(&health),
        &SettlementConfig::default(),
    );

    let t0 = Utc::now();
    let first = runner.tick_once(t0).await.unwrap().unwrap();
    assert_eq!(first.results.len(), 2);
    assert_eq!(first.bets_lost, 1);
    assert_eq!(metrics.open_bets.get(), 2);
    assert!(health.is_ready());

    // Inside the poll interval nothing is due.
    assert!(runner.tick_once(t0 + Duration::seconds(5)).await.unwrap().is_none());

    // After it, only the bet that is still running is polled.
    let later = runner.tick_once(t0 + Duration::seconds(61)).await.unwrap().unwrap();
    assert_eq!(later.results.len(), 1);
    assert_ne!(later.results[0].bet_id, finished_id);
}

#[tokio::test]
async fn test_runner_mirrors_adapter_health() {
    let mut feed = MockFeed::new();
    feed.expect_is_healthy().return_const(false);

    let mut store = MockStore::new();
    store.expect_is_healthy().return_const(true);
    store.expect_open_bets().returning(|| Ok(Vec::new()));

    let health = Arc::new(HealthState::new());
    let mut runner = SettlementRunner::new(
        Arc::new(feed),
        Arc::new(store),
        Arc::new(MetricsRegistry::new().unwrap()),
        Arc::clone(&health),
        &SettlementConfig::default(),
    );

    assert!(assert_ok!(runner.tick_once(Utc::now()).await).is_none());
    assert!(!health.feed_healthy.load(Ordering::Relaxed));
    assert!(!health.is_ready());
}

#[tokio::test]
async fn test_runner_tick_fails_when_store_is_unreadable() {
    let mut feed = MockFeed::new();
    feed.expect_is_healthy().return_const(true);

    let mut store = MockStore::new();
    store.expect_is_healthy().return_const(false);
    store
        .expect_open_bets()
        .returning(|| Err(anyhow::anyhow!("permission denied")));

    let health = Arc::new(HealthState::new());
    let mut runner = SettlementRunner::new(
        Arc::new(feed),
        Arc::new(store),
        Arc::new(MetricsRegistry::new().unwrap()),
        Arc::clone(&health),
        &SettlementConfig::default(),
    );

    assert_err!(runner.tick_once(Utc::now()).await);
    assert!(!health.is_ready());
}

// ---- End to end with the file store ----

#[tokio::test]
async fn test_configured_limits_drive_placement() {
    let config = sportsbook_settler::config::loader::parse_config(
        r#"
        [betting]
        max_stake = "20"
        "#,
    )
    .unwrap();

    let dir = temp_dir();
    let store = Arc::new(FileBetStore::from_data_dir(&dir).await.unwrap());
    store.deposit("punter", dec!(100)).await.unwrap();

    let limits = config.betting.limits();
    let mut slip = BetSlip::new(&limits);
    slip.toggle(entry(300, "1", dec!(2.0))).unwrap();

    let placement = BetPlacement::new(Arc::clone(&store), limits);
    assert_err!(placement.place("punter", &slip, dec!(50)).await);
    assert_ok!(placement.place("punter", &slip, dec!(20)).await);
    assert_eq!(store.balance("punter").await.unwrap(), dec!(80));

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_place_then_settle_credits_once() {
    let dir = temp_dir();
    let store = Arc::new(FileBetStore::from_data_dir(&dir).await.unwrap());
    store.deposit("punter", dec!(100)).await.unwrap();

    let limits = BettingLimits::default();
    let mut slip = BetSlip::new(&limits);
    slip.toggle(entry(200, "Over 2.5", dec!(1.9))).unwrap();
    slip.toggle(entry(201, "DC-1X", dec!(1.5))).unwrap();

    let placement = BetPlacement::new(Arc::clone(&store), limits);
    let placed = placement.place("punter", &slip, dec!(50)).await.unwrap();
    assert_eq!(placed.total_odds, dec!(2.85));
    assert_eq!(store.balance("punter").await.unwrap(), dec!(50));

    let mut feed = MockFeed::new();
    feed.expect_is_healthy().return_const(true);
    feed.expect_snapshot().with(eq(200u64)).returning(|_| Ok(live(3, 0)));
    feed.expect_snapshot().with(eq(201u64)).returning(|_| Ok(ended(1, 1)));

    let mut runner = SettlementRunner::new(
        Arc::new(feed),
        Arc::clone(&store),
        Arc::new(MetricsRegistry::new().unwrap()),
        Arc::new(HealthState::new()),
        &SettlementConfig::default(),
    );

    let t0 = Utc::now();
    let report = runner.tick_once(t0).await.unwrap().unwrap();
    assert_eq!(report.bets_won, 1);
    assert_eq!(report.total_credited, dec!(142.50));

    // Settled bets are no longer open, so later ticks do nothing.
    assert!(runner.tick_once(t0 + Duration::seconds(120)).await.unwrap().is_none());

    assert_eq!(store.balance("punter").await.unwrap(), dec!(192.50));
    let stored = store.get_bet(placed.id).await.unwrap().unwrap();
    assert_eq!(stored.status, BetStatus::Won);
    assert!(stored.winnings_credited);

    let kinds: Vec<_> = store
        .transactions("punter")
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.kind)
        .collect();
    assert_eq!(kinds, vec![TransactionKind::Bet, TransactionKind::Winnings]);

    let _ = std::fs::remove_dir_all(&dir);
}
