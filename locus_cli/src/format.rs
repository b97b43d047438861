use jiff::SignedDuration;
use locus_engine::route_table::TravelCost;

const METERS_PER_MILE: f64 = 1609.344;

pub fn miles(meters: f64) -> String {
    format!("{:.2} mi", meters / METERS_PER_MILE)
}

/// `1h 02m 05s`, rounded to the second.
pub fn hms(seconds: f64) -> String {
    let duration = SignedDuration::try_from_secs_f64(seconds.round()).unwrap_or(SignedDuration::ZERO);

    format!(
        "{}h {:02}m {:02}s",
        duration.as_hours(),
        duration.as_mins() % 60,
        duration.as_secs() % 60
    )
}

pub fn cost_cells(cost: &TravelCost) -> [String; 2] {
    [miles(cost.distance_meters), hms(cost.duration_seconds)]
}
