// libs/diet-chart-cell/src/services/climate.rs
use shared_config::ClimateThresholds;

use crate::models::{ClimateContext, Dosha, DoshaWeights, Season};

/// Minimum weight for a dosha to count as aggravated by the weather.
pub const DOMINANT_WEIGHT: f64 = 0.25;

/// Open-lower, closed-upper bound on a reading. `None` leaves that side open.
#[derive(Debug, Clone, Copy)]
struct Band {
    above: Option<f64>,
    up_to: Option<f64>,
}

impl Band {
    const ANY: Band = Band { above: None, up_to: None };

    fn above(limit: f64) -> Self {
        Band { above: Some(limit), up_to: None }
    }

    fn up_to(limit: f64) -> Self {
        Band { above: None, up_to: Some(limit) }
    }

    fn between(above: f64, up_to: f64) -> Self {
        Band { above: Some(above), up_to: Some(up_to) }
    }

    fn contains(&self, value: f64) -> bool {
        self.above.map_or(true, |limit| value > limit) && self.up_to.map_or(true, |limit| value <= limit)
    }
}

#[derive(Debug, Clone, Copy)]
struct ClimateRule {
    temperature: Band,
    humidity: Band,
    dosha: Dosha,
    weight: f64,
}

const SEASON_EMPHASIS: &[(Season, Dosha, f64)] = &[
    (Season::Summer, Dosha::Pitta, 0.3),
    (Season::Monsoon, Dosha::Vata, 0.2),
    (Season::Monsoon, Dosha::Kapha, 0.3),
    (Season::Winter, Dosha::Vata, 0.2),
    (Season::Winter, Dosha::Kapha, 0.1),
    (Season::Spring, Dosha::Kapha, 0.3),
];

/// Turns a weather snapshot into per-dosha suppression weights.
#[derive(Debug, Clone)]
pub struct ClimateAdapter {
    rules: Vec<ClimateRule>,
}

impl ClimateAdapter {
    pub fn new(thresholds: &ClimateThresholds) -> Self {
        Self {
            rules: build_rules(thresholds),
        }
    }

    pub fn dosha_weights(&self, climate: &ClimateContext) -> DoshaWeights {
        let mut weights = DoshaWeights::default();

        for rule in &self.rules {
            if rule.temperature.contains(climate.temperature) && rule.humidity.contains(climate.humidity) {
                weights.add(rule.dosha, rule.weight);
            }
        }

        for (season, dosha, weight) in SEASON_EMPHASIS {
            if *season == climate.season {
                weights.add(*dosha, *weight);
            }
        }

        DoshaWeights {
            vata: bound(weights.vata),
            pitta: bound(weights.pitta),
            kapha: bound(weights.kapha),
        }
    }
}

fn build_rules(t: &ClimateThresholds) -> Vec<ClimateRule> {
    let rule = |temperature, humidity, dosha, weight| ClimateRule {
        temperature,
        humidity,
        dosha,
        weight,
    };

    vec![
        // Heat
        rule(Band::above(t.hot_celsius), Band::above(t.humid_percent), Dosha::Pitta, 0.8),
        rule(Band::above(t.hot_celsius), Band::up_to(t.humid_percent), Dosha::Pitta, 0.5),
        rule(Band::above(t.extreme_heat_celsius), Band::ANY, Dosha::Pitta, 0.2),
        rule(Band::between(t.hot_celsius - 4.0, t.hot_celsius), Band::ANY, Dosha::Pitta, 0.2),
        rule(Band::above(t.hot_celsius), Band::above(t.humid_percent), Dosha::Vata, -0.2),
        rule(Band::above(t.hot_celsius), Band::up_to(t.dry_percent), Dosha::Kapha, -0.2),
        // Cold
        rule(Band::up_to(t.cold_celsius), Band::ANY, Dosha::Vata, 0.5),
        rule(Band::up_to(t.freezing_celsius), Band::ANY, Dosha::Vata, 0.3),
        rule(Band::up_to(t.cold_celsius), Band::ANY, Dosha::Pitta, -0.3),
        // Dryness
        rule(Band::ANY, Band::up_to(t.dry_percent), Dosha::Vata, 0.3),
        // Damp
        rule(Band::up_to(t.hot_celsius), Band::above(t.humid_percent), Dosha::Kapha, 0.5),
        rule(Band::up_to(t.cold_celsius), Band::above(t.humid_percent), Dosha::Kapha, 0.2),
    ]
}

/// Dosha with the highest weight of at least [`DOMINANT_WEIGHT`].
/// Ties go Pitta, then Vata, then Kapha.
pub fn dominant_dosha(weights: &DoshaWeights) -> Option<Dosha> {
    [Dosha::Pitta, Dosha::Vata, Dosha::Kapha]
        .into_iter()
        .filter(|d| weights.get(*d) >= DOMINANT_WEIGHT)
        .fold(None, |best: Option<Dosha>, d| match best {
            Some(b) if weights.get(b) >= weights.get(d) => Some(b),
            _ => Some(d),
        })
}

/// Indian-subcontinent season for a month (1-12), overridden by extreme temperatures.
pub fn derive_season(month: u32, temperature: f64) -> Season {
    if temperature >= 35.0 {
        return Season::Summer;
    }
    if temperature <= 12.0 {
        return Season::Winter;
    }
    match month {
        12 | 1 | 2 => Season::Winter,
        3 | 4 => Season::Spring,
        5 | 6 => Season::Summer,
        7..=11 => Season::Monsoon,
        _ if temperature >= 28.0 => Season::Summer,
        _ => Season::Spring,
    }
}

/// Clamps to [-1, 1] and rounds to two decimals.
fn bound(value: f64) -> f64 {
    (value.clamp(-1.0, 1.0) * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(temperature: f64, humidity: f64, season: Season) -> ClimateContext {
        ClimateContext {
            temperature,
            humidity,
            season,
            city: "Test".to_string(),
            description: String::new(),
        }
    }

    fn adapter() -> ClimateAdapter {
        ClimateAdapter::new(&ClimateThresholds::default())
    }

    #[test]
    fn test_hot_humid_pushes_pitta() {
        let weights = adapter().dosha_weights(&context(33.0, 75.0, Season::Monsoon));
        assert!(weights.pitta >= 0.8);
        assert_eq!(dominant_dosha(&weights), Some(Dosha::Pitta));
    }

    #[test]
    fn test_weights_are_clamped() {
        let weights = adapter().dosha_weights(&context(44.0, 90.0, Season::Summer));
        assert_eq!(weights.pitta, 1.0);
        for dosha in Dosha::ALL {
            assert!((-1.0..=1.0).contains(&weights.get(dosha)));
        }
    }

    #[test]
    fn test_cold_dry_winter_pushes_vata() {
        let weights = adapter().dosha_weights(&context(5.0, 30.0, Season::Winter));
        assert_eq!(weights.vata, 1.0);
        assert!(weights.pitta < 0.0);
        assert_eq!(dominant_dosha(&weights), Some(Dosha::Vata));
    }

    #[test]
    fn test_cool_damp_pushes_kapha() {
        let weights = adapter().dosha_weights(&context(22.0, 85.0, Season::Spring));
        assert_eq!(weights.kapha, 0.8);
        assert_eq!(dominant_dosha(&weights), Some(Dosha::Kapha));
    }

    #[test]
    fn test_mild_weather_has_no_dominant_dosha() {
        let weights = adapter().dosha_weights(&context(24.0, 55.0, Season::Winter));
        assert_eq!(weights.pitta, 0.0);
        assert_eq!(weights.vata, 0.2);
        assert_eq!(weights.kapha, 0.1);
        assert_eq!(dominant_dosha(&weights), None);
    }

    #[test]
    fn test_dominant_tie_prefers_pitta() {
        let weights = DoshaWeights {
            vata: 0.5,
            pitta: 0.5,
            kapha: 0.5,
        };
        assert_eq!(dominant_dosha(&weights), Some(Dosha::Pitta));
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = ClimateThresholds {
            hot_celsius: 28.0,
            ..ClimateThresholds::default()
        };
        let weights = ClimateAdapter::new(&thresholds).dosha_weights(&context(30.0, 50.0, Season::Spring));
        assert_eq!(weights.pitta, 0.5);
    }

    #[test]
    fn test_derive_season() {
        assert_eq!(derive_season(1, 22.0), Season::Winter);
        assert_eq!(derive_season(4, 30.0), Season::Spring);
        assert_eq!(derive_season(6, 30.0), Season::Summer);
        assert_eq!(derive_season(10, 28.0), Season::Monsoon);
        assert_eq!(derive_season(1, 36.0), Season::Summer);
        assert_eq!(derive_season(8, 10.0), Season::Winter);
    }
}
