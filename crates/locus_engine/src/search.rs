use std::{fmt, pin::pin, str::FromStr};

use futures::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    Coordinate, Destination,
    bbox::BoundingBox,
    engine::{CandidateEvaluation, Engine},
    error::LocusError,
    grid::Grid,
    route_table::TravelCost,
};

/// What a candidate is ranked by. Lower is better.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    #[default]
    Duration,
    Distance,
}

impl Objective {
    pub fn score(&self, cost: &TravelCost) -> f64 {
        match self {
            Objective::Duration => cost.duration_seconds,
            Objective::Distance => cost.distance_meters,
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::Duration => write!(f, "duration"),
            Objective::Distance => write!(f, "distance"),
        }
    }
}

impl FromStr for Objective {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "duration" => Ok(Objective::Duration),
            "distance" => Ok(Objective::Distance),
            other => Err(format!("unknown objective '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub evaluation: CandidateEvaluation,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    /// Best candidate first
    pub ranked: Vec<CandidateScore>,
    pub failed: usize,
    pub evaluated: usize,
    pub cancelled: bool,
}

impl Engine {
    /// Evaluates every grid point over the bounding box of `references` and
    /// ranks those with an average travel cost by `objective`.
    ///
    /// Failing candidates are counted, not fatal. On cancellation the
    /// candidates already evaluated are still ranked.
    pub async fn search(
        &self,
        references: &[Coordinate],
        step: f64,
        destinations: &[Destination],
        objective: Objective,
        cancel: &CancellationToken,
    ) -> Result<SearchReport, LocusError> {
        if destinations.is_empty() {
            return Err(LocusError::NoDestinations);
        }

        let bbox = BoundingBox::from_coordinates(references)?;
        let grid = Grid::new(bbox, step)?;

        info!(
            "Search: {} destinations over {:?}, step {}",
            destinations.len(),
            bbox,
            step
        );

        let mut evaluations = pin!(
            stream::iter(grid.iter())
                .map(|coordinate| async move {
                    let result = self
                        .evaluate_candidate(coordinate, destinations, false, cancel)
                        .await;
                    (coordinate, result)
                })
                .buffer_unordered(self.candidate_concurrency)
                .take_until(cancel.cancelled())
        );

        let mut report = SearchReport::default();
        while let Some((coordinate, result)) = evaluations.next().await {
            report.evaluated += 1;

            match result {
                Ok(evaluation) if evaluation.complete => match evaluation.routes.average() {
                    Some(average) => {
                        let score = objective.score(average);
                        debug!("Candidate {}: {} {}", coordinate, objective, score);
                        report.ranked.push(CandidateScore { evaluation, score });
                    }
                    None => debug!("Candidate {}: no average, not ranked", coordinate),
                },
                // Cut short by the search's own cancellation
                Ok(_) | Err(LocusError::Cancelled) if cancel.is_cancelled() => {}
                Ok(evaluation) => {
                    warn!(
                        "Candidate {}: only {} destinations routed before its deadline",
                        coordinate,
                        evaluation.routes.len()
                    );
                    report.failed += 1;
                }
                Err(err) => {
                    warn!("Candidate {}: {}", coordinate, err);
                    report.failed += 1;
                }
            }
        }

        report.cancelled = cancel.is_cancelled();
        report.ranked.sort_by(|a, b| a.score.total_cmp(&b.score));

        info!(
            "Search: {} evaluated, {} ranked, {} failed{}",
            report.evaluated,
            report.ranked.len(),
            report.failed,
            if report.cancelled { ", cancelled" } else { "" }
        );

        Ok(report)
    }
}
