// libs/diet-chart-cell/src/services/portion.rs
use crate::models::{ActivityLevel, AgeBracket, Gender, PatientProfile, PortionInfo};
use ActivityLevel::{High, Low, Moderate};
use AgeBracket::{Adult, Child, Mature, Senior, Teen};

pub const MIN_PORTION_MULTIPLIER: f64 = 0.6;
pub const MAX_PORTION_MULTIPLIER: f64 = 1.6;

/// One row of the portion table. `None` matches any value.
#[derive(Debug, Clone, Copy)]
struct PortionRule {
    bracket: AgeBracket,
    gender: Option<Gender>,
    activity: ActivityLevel,
    multiplier: f64,
}

const fn row(
    bracket: AgeBracket,
    gender: Option<Gender>,
    activity: ActivityLevel,
    multiplier: f64,
) -> PortionRule {
    PortionRule {
        bracket,
        gender,
        activity,
        multiplier,
    }
}

/// First matching row wins.
const PORTION_TABLE: &[PortionRule] = &[
    row(Child, None, Low, 0.6),
    row(Child, None, Moderate, 0.7),
    row(Child, None, High, 0.8),
    row(Teen, Some(Gender::Male), Low, 0.95),
    row(Teen, Some(Gender::Male), Moderate, 1.1),
    row(Teen, Some(Gender::Male), High, 1.3),
    row(Teen, None, Low, 0.9),
    row(Teen, None, Moderate, 1.0),
    row(Teen, None, High, 1.15),
    row(Adult, Some(Gender::Male), Low, 0.95),
    row(Adult, Some(Gender::Male), Moderate, 1.1),
    row(Adult, Some(Gender::Male), High, 1.3),
    row(Adult, Some(Gender::Female), Low, 0.85),
    row(Adult, Some(Gender::Female), Moderate, 1.0),
    row(Adult, Some(Gender::Female), High, 1.15),
    row(Adult, None, Low, 0.9),
    row(Adult, None, Moderate, 1.05),
    row(Adult, None, High, 1.2),
    row(Mature, Some(Gender::Male), Low, 0.9),
    row(Mature, Some(Gender::Male), Moderate, 1.0),
    row(Mature, Some(Gender::Male), High, 1.15),
    row(Mature, None, Low, 0.8),
    row(Mature, None, Moderate, 0.9),
    row(Mature, None, High, 1.05),
    row(Senior, None, Low, 0.7),
    row(Senior, None, Moderate, 0.8),
    row(Senior, None, High, 0.9),
];

/// Age, gender and activity scaling applied to every known serving.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortionScale {
    pub multiplier: f64,
    pub activity_level: ActivityLevel,
}

impl PortionScale {
    pub fn for_profile(profile: &PatientProfile) -> Self {
        Self {
            multiplier: portion_multiplier(profile.age, profile.gender, profile.activity_level),
            activity_level: profile.activity_level,
        }
    }

    pub fn is_adjusted(&self) -> bool {
        (self.multiplier - 1.0).abs() > f64::EPSILON
    }

    pub fn portion_info(&self) -> PortionInfo {
        PortionInfo {
            age_adjusted: self.is_adjusted(),
            activity_level: self.activity_level,
            multiplier: self.multiplier,
        }
    }

    pub fn describe(&self, profile: &PatientProfile) -> String {
        if self.is_adjusted() {
            format!(
                "Scaled x{:.2} for a {}-year-old {} with {} activity",
                self.multiplier, profile.age, profile.gender, self.activity_level
            )
        } else {
            format!(
                "Standard portion for a {}-year-old {} with {} activity",
                profile.age, profile.gender, self.activity_level
            )
        }
    }
}

pub fn portion_multiplier(age: u32, gender: Gender, activity: ActivityLevel) -> f64 {
    let bracket = AgeBracket::from_age(age);
    PORTION_TABLE
        .iter()
        .find(|rule| {
            rule.bracket == bracket
                && rule.activity == activity
                && rule.gender.map_or(true, |g| g == gender)
        })
        .map_or(1.0, |rule| rule.multiplier)
        .clamp(MIN_PORTION_MULTIPLIER, MAX_PORTION_MULTIPLIER)
}
