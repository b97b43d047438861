use jiff::SpanRelativeTo;

pub fn parse_duration(input: &str) -> Result<jiff::SignedDuration, String> {
    if let Ok(duration) = input.parse::<jiff::SignedDuration>() {
        return Ok(duration);
    }

    if let Ok(duration) = input
        .parse::<jiff::Span>()
        .and_then(|span| span.to_duration(SpanRelativeTo::days_are_24_hours()))
    {
        return Ok(duration);
    }

    if let Ok(seconds) = input.parse::<i64>() {
        return Ok(jiff::SignedDuration::from_secs(seconds.abs()));
    }

    Err(String::from("Invalid duration"))
}

/// Grid step in degrees, strictly positive.
pub fn parse_step(input: &str) -> Result<f64, String> {
    match input.parse::<f64>() {
        Ok(step) if step.is_finite() && step > 0.0 => Ok(step),
        Ok(_) => Err(String::from("Step must be a positive number of degrees")),
        Err(_) => Err(String::from("Invalid step")),
    }
}
