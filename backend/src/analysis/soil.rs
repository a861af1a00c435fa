use std::str::FromStr;

use shared::{ParameterKey, Reading, ReadingStatus, SoilMetric, SoilReport};

use super::thresholds::classify;

/// Classifies every submitted reading and writes the one-line summary shown under the soil table.
pub fn analyze_soil(readings: &[Reading]) -> SoilReport {
    let metrics: Vec<SoilMetric> = readings.iter().map(to_metric).collect();

    let issues: Vec<String> = metrics
        .iter()
        .filter(|m| m.status != ReadingStatus::Normal)
        .map(|m| format!("{} is {}", m.label, m.status))
        .collect();

    let summary = if issues.is_empty() {
        "Analysis: All parameters are within optimal ranges. Continue current management practices."
            .to_string()
    } else {
        format!(
            "Analysis: {} parameter(s) need attention. {}. Consider adjusting fertilization and irrigation schedules.",
            issues.len(),
            issues.join(", ")
        )
    };

    SoilReport {
        attention_count: issues.len(),
        metrics,
        summary,
    }
}

fn to_metric(reading: &Reading) -> SoilMetric {
    let classification = classify(&reading.parameter, reading.value);
    let key = ParameterKey::from_str(reading.parameter.trim()).ok();

    let unit = match (&key, reading.unit.is_empty()) {
        (Some(key), true) => key.unit().to_string(),
        _ => reading.unit.clone(),
    };

    SoilMetric {
        parameter: key
            .map(|k| k.to_string())
            .unwrap_or_else(|| reading.parameter.clone()),
        label: key
            .map(|k| k.label().to_string())
            .unwrap_or_else(|| reading.parameter.clone()),
        value: reading.value,
        unit,
        optimal_range: key.map(|k| k.optimal_range().to_string()),
        status: classification.status,
        color: classification.color,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(parameter: &str, value: f64) -> Reading {
        Reading {
            parameter: parameter.to_string(),
            value,
            unit: String::new(),
        }
    }

    #[test]
    fn lists_parameters_needing_attention() {
        let report = analyze_soil(&[
            reading("moisture", 42.0),
            reading("ph", 6.5),
            reading("nitrogen", 45.0),
            reading("potassium", 35.0),
        ]);

        assert_eq!(report.attention_count, 2);
        assert_eq!(
            report.summary,
            "Analysis: 2 parameter(s) need attention. Nitrogen (N) is low, Potassium (K) is low. \
             Consider adjusting fertilization and irrigation schedules."
        );
        assert_eq!(report.metrics[2].unit, "mg/kg");
        assert_eq!(report.metrics[0].optimal_range.as_deref(), Some("40–60%"));
    }

    #[test]
    fn all_normal_summary() {
        let report = analyze_soil(&[reading("water", 65.0), reading("phosphorus", 20.0)]);
        assert_eq!(report.attention_count, 0);
        assert!(report.summary.contains("All parameters are within optimal ranges"));
    }

    #[test]
    fn unknown_parameters_are_reported_not_dropped() {
        let report = analyze_soil(&[reading("salinity", 3.0)]);
        assert_eq!(report.metrics[0].status, ReadingStatus::Unknown);
        assert_eq!(report.metrics[0].label, "salinity");
        assert!(report.metrics[0].optimal_range.is_none());
        assert_eq!(report.attention_count, 1);
    }
}
