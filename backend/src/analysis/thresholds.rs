use std::str::FromStr;

use shared::{Classification, ColorHint, ParameterKey, ReadingStatus};

/// Inclusive optimal band for one parameter and the labels used on either side of it.
struct Band {
    min: Option<f64>,
    max: Option<f64>,
    below: (ReadingStatus, ColorHint),
    above: (ReadingStatus, ColorHint),
}

const NORMAL: (ReadingStatus, ColorHint) = (ReadingStatus::Normal, ColorHint::Green);
const UNKNOWN: (ReadingStatus, ColorHint) = (ReadingStatus::Unknown, ColorHint::Gray);

fn band(key: ParameterKey) -> Band {
    use ColorHint::{Orange, Red};
    use ReadingStatus::*;

    match key {
        ParameterKey::Moisture => Band {
            min: Some(40.0),
            max: Some(60.0),
            below: (Low, Red),
            above: (High, Orange),
        },
        ParameterKey::Ph => Band {
            min: Some(6.0),
            max: Some(7.0),
            below: (Acidic, Red),
            above: (Alkaline, Orange),
        },
        ParameterKey::Nitrogen => Band {
            min: Some(50.0),
            max: Some(80.0),
            below: (Low, Orange),
            above: (High, Orange),
        },
        ParameterKey::Phosphorus => Band {
            min: Some(20.0),
            max: Some(40.0),
            below: (Low, Orange),
            above: (High, Orange),
        },
        ParameterKey::Potassium => Band {
            min: Some(40.0),
            max: Some(60.0),
            below: (Low, Orange),
            above: (High, Orange),
        },
        ParameterKey::Water => Band {
            min: Some(30.0),
            max: None,
            below: (Critical, Red),
            above: NORMAL,
        },
    }
}

/// Classifies a reading for a known parameter. Non-finite values are `unknown`.
pub fn classify_key(key: ParameterKey, value: f64) -> Classification {
    let (status, color) = if !value.is_finite() {
        UNKNOWN
    } else {
        let band = band(key);
        match (band.min, band.max) {
            (Some(min), _) if value < min => band.below,
            (_, Some(max)) if value > max => band.above,
            _ => NORMAL,
        }
    };
    Classification { status, color }
}

/// Classifies a reading by its dashboard key, e.g. `"moisture"` or `"ph"`.
pub fn classify(parameter_key: &str, value: f64) -> Classification {
    match ParameterKey::from_str(parameter_key.trim()) {
        Ok(key) => classify_key(key, value),
        Err(_) => Classification {
            status: UNKNOWN.0,
            color: UNKNOWN.1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReadingStatus::*;

    #[test]
    fn boundaries_are_inclusive() {
        let cases = [
            ("moisture", 40.0, Normal),
            ("moisture", 39.9, Low),
            ("moisture", 60.0, Normal),
            ("moisture", 60.1, High),
            ("ph", 6.0, Normal),
            ("ph", 5.9, Acidic),
            ("ph", 7.0, Normal),
            ("ph", 7.1, Alkaline),
            ("nitrogen", 50.0, Normal),
            ("nitrogen", 45.0, Low),
            ("nitrogen", 80.5, High),
            ("phosphorus", 20.0, Normal),
            ("phosphorus", 41.0, High),
            ("potassium", 35.0, Low),
            ("potassium", 60.0, Normal),
            ("water", 30.0, Normal),
            ("water", 29.9, Critical),
            ("water", 500.0, Normal),
        ];

        for (key, value, expected) in cases {
            assert_eq!(classify(key, value).status, expected, "{key}={value}");
        }
    }

    #[test]
    fn colours_follow_status() {
        assert_eq!(classify("moisture", 10.0).color, ColorHint::Red);
        assert_eq!(classify("moisture", 90.0).color, ColorHint::Orange);
        assert_eq!(classify("ph", 6.5).color, ColorHint::Green);
        assert_eq!(classify("water", 5.0).color, ColorHint::Red);
        assert_eq!(classify("salinity", 5.0).color, ColorHint::Gray);
    }

    #[test]
    fn total_over_odd_inputs() {
        assert_eq!(classify("moisture", f64::NAN).status, Unknown);
        assert_eq!(classify("ph", f64::INFINITY).status, Unknown);
        assert_eq!(classify("nitrogen", -12.0).status, Low);
        assert_eq!(classify("unknown-key", 50.0).status, Unknown);
        assert_eq!(classify("  Moisture ", 50.0).status, Normal);
        assert_eq!(classify("", 50.0).status, Unknown);
    }
}
