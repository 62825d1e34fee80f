mod comparable_matcher;
mod match_rules;
mod property_types;

pub use comparable_matcher::{ComparableFinder, MatchError};
pub use match_rules::{ClassRule, MatchRules, RatioRule, Ranking, MAX_COMPARABLES};
pub use property_types::{non_blank, parse_numeric, ColumnLayout, FieldRole, PropertyRecord};
