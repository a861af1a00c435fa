use chrono::Utc;
use shared::{EnvironmentAnalysis, EnvironmentReading, MetricLevel};

/// Badge level for air temperature (°C).
pub fn temperature_level(value: f64) -> MetricLevel {
    if value < 15.0 || value > 35.0 {
        MetricLevel::Critical
    } else if value < 18.0 || value > 30.0 {
        MetricLevel::Warning
    } else {
        MetricLevel::Ok
    }
}

/// Badge level for relative humidity (%).
pub fn humidity_level(value: f64) -> MetricLevel {
    if value < 40.0 || value > 80.0 {
        MetricLevel::Critical
    } else if value < 50.0 || value > 70.0 {
        MetricLevel::Warning
    } else {
        MetricLevel::Ok
    }
}

pub fn analyze_environment(reading: EnvironmentReading) -> EnvironmentAnalysis {
    let mut issues = Vec::new();
    let mut warnings = Vec::new();
    let mut positives = Vec::new();

    let temp = reading.temperature;
    if temp < 15.0 {
        issues.push("Temperature too low for optimal growth");
    } else if temp > 35.0 {
        issues.push("Temperature stress risk - consider cooling");
    } else if temp < 18.0 || temp > 30.0 {
        warnings.push("Temperature approaching stress levels");
    } else {
        positives.push("Temperature within optimal range");
    }

    let humidity = reading.humidity;
    if humidity < 40.0 {
        issues.push("Low humidity may cause plant stress");
    } else if humidity > 80.0 {
        issues.push("High humidity increases disease risk");
    } else if humidity < 50.0 || humidity > 70.0 {
        warnings.push("Humidity levels need monitoring");
    } else {
        positives.push("Humidity levels are appropriate");
    }

    let wind = reading.wind_speed;
    if wind > 25.0 {
        issues.push("Strong winds may damage crops");
    } else if wind < 5.0 {
        issues.push("Poor air circulation");
    } else {
        positives.push("Good air circulation");
    }

    let light = reading.light_intensity;
    if light < 400.0 {
        issues.push("Insufficient light for photosynthesis");
    } else if light > 1200.0 {
        issues.push("Excessive light may cause heat stress");
    } else if light < 600.0 || light > 1000.0 {
        warnings.push("Light levels could be optimized");
    } else {
        positives.push("Light levels are adequate");
    }

    if (reading.soil_temp - temp).abs() > 5.0 {
        warnings.push("Large temperature difference between air and soil");
    }

    let mut summary = String::from("Environmental Analysis: ");
    if !issues.is_empty() {
        summary.push_str(&format!("CRITICAL: {}. ", issues.join(". ")));
    }
    if !warnings.is_empty() {
        summary.push_str(&format!("MONITOR: {}. ", warnings.join(". ")));
    }
    if !positives.is_empty() {
        summary.push_str(&format!("GOOD: {}.", positives.join(". ")));
    }

    EnvironmentAnalysis {
        reading,
        recorded_at: Utc::now(),
        issues: issues.into_iter().map(String::from).collect(),
        warnings: warnings.into_iter().map(String::from).collect(),
        positives: positives.into_iter().map(String::from).collect(),
        temperature_level: temperature_level(temp),
        humidity_level: humidity_level(humidity),
        summary: summary.trim_end().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(temperature: f64, humidity: f64, wind: f64, light: f64, soil: f64) -> EnvironmentReading {
        EnvironmentReading {
            temperature,
            humidity,
            wind_speed: wind,
            light_intensity: light,
            soil_temp: soil,
        }
    }

    #[test]
    fn ideal_conditions_are_all_positive() {
        let analysis = analyze_environment(reading(24.5, 65.0, 12.0, 850.0, 22.1));
        assert!(analysis.issues.is_empty());
        assert!(analysis.warnings.is_empty());
        assert_eq!(analysis.positives.len(), 4);
        assert_eq!(analysis.temperature_level, MetricLevel::Ok);
        assert!(analysis.summary.starts_with("Environmental Analysis: GOOD:"));
    }

    #[test]
    fn issues_and_warnings_are_grouped() {
        let analysis = analyze_environment(reading(37.0, 45.0, 2.0, 700.0, 25.0));
        assert_eq!(
            analysis.issues,
            vec!["Temperature stress risk - consider cooling", "Poor air circulation"]
        );
        assert_eq!(
            analysis.warnings,
            vec![
                "Humidity levels need monitoring",
                "Large temperature difference between air and soil"
            ]
        );
        assert_eq!(analysis.temperature_level, MetricLevel::Critical);
        assert_eq!(analysis.humidity_level, MetricLevel::Warning);
        assert!(analysis.summary.contains("CRITICAL: Temperature stress risk"));
        assert!(analysis.summary.contains("MONITOR: Humidity levels need monitoring"));
        assert!(analysis.summary.ends_with("GOOD: Light levels are adequate."));
    }

    #[test]
    fn level_edges() {
        assert_eq!(temperature_level(15.0), MetricLevel::Warning);
        assert_eq!(temperature_level(18.0), MetricLevel::Ok);
        assert_eq!(humidity_level(80.0), MetricLevel::Warning);
        assert_eq!(humidity_level(80.1), MetricLevel::Critical);
    }
}
