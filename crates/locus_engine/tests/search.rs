mod test_utils;

use std::time::Duration;

use locus_engine::{Coordinate, error::LocusError, search::Objective};
use tokio_util::sync::CancellationToken;

use test_utils::{Behavior, StubMatrix, batch_params, config, destination, engine};

fn references() -> Vec<Coordinate> {
    vec![Coordinate::new(1.0, 1.0), Coordinate::new(2.0, 2.0)]
}

#[tokio::test]
async fn test_search_ranks_candidates() {
    let (engine, _) = engine(
        vec![StubMatrix::new("working", Behavior::Costs).boxed()],
        vec![],
        &config(batch_params(25, 4, 1)),
    );
    let destinations = vec![destination("x", 2.0, 2.0), destination("y", 1.9, 2.0)];

    let report = engine
        .search(
            &references(),
            0.5,
            &destinations,
            Objective::Distance,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.evaluated, 9);
    assert_eq!(report.failed, 0);
    assert_eq!(report.ranked.len(), 9);
    assert!(!report.cancelled);
    assert_eq!(report.ranked[0].evaluation.coordinate, Coordinate::new(2.0, 2.0));
    assert!(report.ranked.windows(2).all(|w| w[0].score <= w[1].score));
    // The far corner comes last
    assert_eq!(report.ranked[8].evaluation.coordinate, Coordinate::new(1.0, 1.0));
}

#[tokio::test]
async fn test_search_counts_failed_candidates() {
    let poison = Coordinate::new(1.5, 1.5);
    let (engine, _) = engine(
        vec![StubMatrix::new("poisoned", Behavior::Poison(poison)).boxed()],
        vec![],
        &config(batch_params(25, 4, 1)),
    );
    let destinations = vec![destination("x", 2.0, 2.0)];

    let report = engine
        .search(
            &references(),
            0.5,
            &destinations,
            Objective::Duration,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.evaluated, 9);
    assert_eq!(report.failed, 1);
    assert_eq!(report.ranked.len(), 8);
    assert!(
        report
            .ranked
            .iter()
            .all(|c| c.evaluation.coordinate != poison)
    );
}

#[tokio::test]
async fn test_search_stops_when_cancelled() {
    let (engine, _) = engine(
        vec![StubMatrix::new("working", Behavior::Costs).boxed()],
        vec![],
        &config(batch_params(25, 4, 1)),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = engine
        .search(
            &references(),
            0.5,
            &[destination("x", 2.0, 2.0)],
            Objective::Duration,
            &cancel,
        )
        .await
        .unwrap();

    assert!(report.cancelled);
    assert!(report.ranked.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_search_after_cancelled_search_ranks_everything() {
    let (engine, _) = engine(
        vec![
            StubMatrix::new("slow", Behavior::Costs)
                .with_delay(Duration::from_secs(10))
                .boxed(),
        ],
        vec![],
        &config(batch_params(25, 4, 1)),
    );
    let destinations = vec![destination("x", 2.0, 2.0), destination("y", 1.9, 2.0)];

    let first = CancellationToken::new();
    tokio::spawn({
        let first = first.clone();
        async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            first.cancel();
        }
    });
    let report = engine
        .search(&references(), 0.5, &destinations, Objective::Duration, &first)
        .await
        .unwrap();
    assert!(report.cancelled);
    assert!(report.ranked.is_empty());

    let report = engine
        .search(
            &references(),
            0.5,
            &destinations,
            Objective::Duration,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(!report.cancelled);
    assert_eq!(report.evaluated, 9);
    assert_eq!(report.failed, 0);
    assert_eq!(report.ranked.len(), 9);
}

#[tokio::test]
async fn test_search_rejects_bad_input() {
    let (engine, _) = engine(
        vec![StubMatrix::new("working", Behavior::Costs).boxed()],
        vec![],
        &config(batch_params(25, 4, 1)),
    );
    let cancel = CancellationToken::new();

    assert!(matches!(
        engine
            .search(&[], 0.5, &[destination("x", 2.0, 2.0)], Objective::Duration, &cancel)
            .await,
        Err(LocusError::InvalidInput(_))
    ));
    assert!(matches!(
        engine
            .search(&references(), 0.0, &[destination("x", 2.0, 2.0)], Objective::Duration, &cancel)
            .await,
        Err(LocusError::InvalidInput(_))
    ));
    assert_eq!(
        engine
            .search(&references(), 0.5, &[], Objective::Duration, &cancel)
            .await,
        Err(LocusError::NoDestinations)
    );
}
