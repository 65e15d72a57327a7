use super::super::domain::TripCategory;
use super::FeatureParams;
use tracing::trace;

/// Inclusive miles-per-day band that earns the efficiency bonus.
pub const EFFICIENCY_BAND: (f64, f64) = (180.0, 220.0);

/// One entry of a first-match-wins rule table.
#[derive(Debug, Clone, Copy)]
pub struct Rule<I, O> {
    pub label: &'static str,
    pub applies: fn(&I) -> bool,
    pub outcome: O,
}

/// First rule in table order whose predicate holds.
pub fn matching_rule<'a, I, O>(rules: &'a [Rule<I, O>], input: &I) -> Option<&'a Rule<I, O>> {
    rules.iter().find(|rule| (rule.applies)(input))
}

/// Evaluates `rules` in order and returns the outcome of the first match.
pub fn first_match<I, O: Copy>(rules: &[Rule<I, O>], input: &I, fallback: O) -> O {
    matching_rule(rules, input)
        .map(|rule| rule.outcome)
        .unwrap_or(fallback)
}

pub fn in_efficiency_band(miles_per_day: f64) -> bool {
    (EFFICIENCY_BAND.0..=EFFICIENCY_BAND.1).contains(&miles_per_day)
}

/// Inputs the category table looks at.
#[derive(Debug, Clone, Copy)]
pub struct TripShape {
    pub days: u32,
    pub miles_per_day: f64,
}

/// Priority order is part of the contract: reordering changes classification.
pub const CATEGORY_RULES: [Rule<TripShape, TripCategory>; 4] = [
    Rule {
        label: "short trip above 150 miles/day",
        applies: is_quick_high_mileage,
        outcome: TripCategory::QuickTripHighMiles,
    },
    Rule {
        label: "eight days or longer",
        applies: is_long_haul,
        outcome: TripCategory::LongHaul,
    },
    Rule {
        label: "below 50 miles/day",
        applies: is_low_efficiency,
        outcome: TripCategory::LowEfficiency,
    },
    Rule {
        label: "within the efficiency band",
        applies: is_sweet_spot,
        outcome: TripCategory::SweetSpotEfficiency,
    },
];

pub fn classify(shape: &TripShape) -> TripCategory {
    match matching_rule(&CATEGORY_RULES, shape) {
        Some(rule) => {
            trace!(
                rule = rule.label,
                days = shape.days,
                miles_per_day = shape.miles_per_day,
                "category rule matched"
            );
            rule.outcome
        }
        None => TripCategory::Balanced,
    }
}

fn is_quick_high_mileage(shape: &TripShape) -> bool {
    shape.days <= 2 && shape.miles_per_day > 150.0
}

fn is_long_haul(shape: &TripShape) -> bool {
    shape.days >= 8
}

fn is_low_efficiency(shape: &TripShape) -> bool {
    shape.miles_per_day < 50.0
}

fn is_sweet_spot(shape: &TripShape) -> bool {
    in_efficiency_band(shape.miles_per_day)
}

/// Duration-keyed receipt multipliers, evaluated single day, five day, then long trip.
pub fn receipt_multiplier_rules(params: &FeatureParams) -> [Rule<u32, f64>; 3] {
    [
        Rule {
            label: "single day",
            applies: |days| *days == 1,
            outcome: params.single_day_receipt_multiplier,
        },
        Rule {
            label: "five days",
            applies: |days| *days == 5,
            outcome: params.five_day_receipt_multiplier,
        },
        Rule {
            label: "eight days or longer",
            applies: |days| *days >= 8,
            outcome: params.long_trip_receipt_multiplier,
        },
    ]
}

pub fn receipt_multiplier(days: u32, params: &FeatureParams) -> f64 {
    first_match(
        &receipt_multiplier_rules(params),
        &days,
        params.default_receipt_multiplier,
    )
}
