use crate::models::{ActivityLabel, ActivityWithDuration};

/// Upper bound for a single estimate, so one bad interval cannot dominate a day.
pub const MAX_KCAL_PER_ESTIMATE: f64 = 1000.0;

/// Metabolic equivalent for a label name. Unrecognized names get the
/// light-activity value.
pub fn met_for(label: &str) -> f64 {
    match label.trim().to_lowercase().as_str() {
        "walking" => 3.5,
        "running" => 8.0,
        "standing" => 1.5,
        "downstairs" => 3.0,
        "upstairs" => 4.0,
        "unknown" => 1.5,
        _ => 1.5,
    }
}

/// kcal = weight (kg) * MET * hours, clamped to `[0, 1000]`.
pub fn calories(weight_kg: u32, label: &str, minutes: f64) -> f64 {
    if !(minutes > 0.0) {
        log::warn!("Invalid duration {} min for {}", minutes, label);
        return 0.0;
    }

    let met = met_for(label);
    let kcal = weight_kg as f64 * met * (minutes / 60.0);
    log::debug!(
        "Calories for {}: {:.2} kcal ({} kg x MET {} x {:.3} min)",
        label,
        kcal,
        weight_kg,
        met,
        minutes
    );
    kcal.clamp(0.0, MAX_KCAL_PER_ESTIMATE)
}

pub fn calories_for(weight_kg: u32, label: ActivityLabel, minutes: f64) -> f64 {
    calories(weight_kg, label.as_str(), minutes)
}

pub fn total_calories(weight_kg: u32, activities: &[ActivityWithDuration]) -> f64 {
    activities
        .iter()
        .map(|a| calories_for(weight_kg, a.label, a.duration_minutes))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_half_hour() {
        assert_eq!(calories(70, "running", 30.0), 280.0);
    }

    #[test]
    fn unrecognized_label_uses_light_met() {
        assert_eq!(calories(70, "unknown_activity", 10.0), 70.0 * 1.5 * (10.0 / 60.0));
        assert_eq!(met_for("Walking"), 3.5);
    }

    #[test]
    fn non_positive_duration_is_zero() {
        assert_eq!(calories(1, "running", -5.0), 0.0);
        assert_eq!(calories(70, "running", 0.0), 0.0);
        assert_eq!(calories(70, "running", f64::NAN), 0.0);
    }

    #[test]
    fn single_estimate_is_capped() {
        assert_eq!(calories(120, "running", 600.0), MAX_KCAL_PER_ESTIMATE);
    }

    #[test]
    fn day_total_sums_entries() {
        let activities = vec![
            ActivityWithDuration { label: ActivityLabel::Running, duration_minutes: 30.0 },
            ActivityWithDuration { label: ActivityLabel::Standing, duration_minutes: 60.0 },
        ];
        assert_eq!(total_calories(70, &activities), 280.0 + 105.0);
    }
}
