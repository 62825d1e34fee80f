use failure::Fail;
use std::str::FromStr;

pub const DEFAULT_VALUE_BAND: f64 = 100_000.0;
pub const MAX_COMPARABLES: usize = 5;

#[derive(Debug, Fail, PartialEq)]
pub enum RuleError {
    #[fail(display = "Invalid class rule '{}', expected 'match-subject' or 'fixed:<tier>'", _0)]
    InvalidClassRule(String),
    #[fail(display = "Invalid ratio rule '{}', expected 'half-band' or 'upper-150'", _0)]
    InvalidRatioRule(String),
    #[fail(display = "Invalid ranking '{}', expected 'combined' or 'value-ratio'", _0)]
    InvalidRanking(String),
    #[fail(display = "Comparable limit must be between 1 and {}, got {}", _1, _0)]
    InvalidLimit(usize, usize),
    #[fail(display = "Value band must be a non negative number, got {}", _0)]
    InvalidValueBand(f64),
}

/// Which class a candidate must have.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassRule {
    /// Same class as the subject.
    MatchSubject,
    /// A hardcoded tier, whatever the subject's class is.
    Fixed(String),
}

impl ClassRule {
    /// A blank class (`None`) matches nothing, not even another blank class.
    #[inline]
    pub fn accepts(&self, subject_class: Option<&str>, candidate_class: Option<&str>) -> bool {
        match (self, candidate_class) {
            (_, None) => false,
            (ClassRule::MatchSubject, Some(candidate)) => subject_class == Some(candidate),
            (ClassRule::Fixed(tier), Some(candidate)) => candidate == tier.as_str(),
        }
    }
}

impl FromStr for ClassRule {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<ClassRule, RuleError> {
        if s == "match-subject" {
            return Ok(ClassRule::MatchSubject);
        }
        match s.strip_prefix("fixed:") {
            Some(tier) if !tier.is_empty() => Ok(ClassRule::Fixed(tier.to_owned())),
            _ => Err(RuleError::InvalidClassRule(s.to_owned())),
        }
    }
}

/// Band the candidate's value ratio must fall in, relative to the subject's.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RatioRule {
    /// `subject / 2 <= candidate <= subject`, both ends inclusive.
    HalfBand,
    /// `candidate <= subject * 1.5`, no lower bound.
    UpperOneAndHalf,
}

impl RatioRule {
    #[inline]
    pub fn accepts(self, subject_ratio: f64, candidate_ratio: f64) -> bool {
        match self {
            RatioRule::HalfBand => {
                candidate_ratio >= subject_ratio / 2.0 && candidate_ratio <= subject_ratio
            }
            RatioRule::UpperOneAndHalf => candidate_ratio <= subject_ratio * 1.5,
        }
    }
}

impl FromStr for RatioRule {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<RatioRule, RuleError> {
        match s {
            "half-band" => Ok(RatioRule::HalfBand),
            "upper-150" => Ok(RatioRule::UpperOneAndHalf),
            other => Err(RuleError::InvalidRatioRule(other.to_owned())),
        }
    }
}

/// Sort key applied to eligible candidates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ranking {
    /// `(value_diff + ratio_diff, value_diff, ratio_diff)`
    Combined,
    /// `(value_diff, ratio_diff)`
    ValueThenRatio,
}

impl FromStr for Ranking {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Ranking, RuleError> {
        match s {
            "combined" => Ok(Ranking::Combined),
            "value-ratio" => Ok(Ranking::ValueThenRatio),
            other => Err(RuleError::InvalidRanking(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRules {
    pub class_rule: ClassRule,
    pub ratio_rule: RatioRule,
    pub ranking: Ranking,
    pub asset_type: String,
    pub value_band: f64,
    pub limit: usize,
}

impl MatchRules {
    pub fn hotel() -> MatchRules {
        MatchRules {
            class_rule: ClassRule::MatchSubject,
            ratio_rule: RatioRule::HalfBand,
            ranking: Ranking::Combined,
            asset_type: "Hotel".to_owned(),
            value_band: DEFAULT_VALUE_BAND,
            limit: MAX_COMPARABLES,
        }
    }

    pub fn apartment() -> MatchRules {
        MatchRules {
            asset_type: "Apartment".to_owned(),
            ..MatchRules::hotel()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Result<MatchRules, RuleError> {
        if limit == 0 || limit > MAX_COMPARABLES {
            return Err(RuleError::InvalidLimit(limit, MAX_COMPARABLES));
        }
        self.limit = limit;
        Ok(self)
    }

    pub fn with_value_band(mut self, band: f64) -> Result<MatchRules, RuleError> {
        if !band.is_finite() || band < 0.0 {
            return Err(RuleError::InvalidValueBand(band));
        }
        self.value_band = band;
        Ok(self)
    }
}

impl Default for MatchRules {
    fn default() -> Self {
        MatchRules::hotel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_accept_both_ends_of_the_half_band() {
        assert!(RatioRule::HalfBand.accepts(2.0, 1.0));
        assert!(RatioRule::HalfBand.accepts(2.0, 2.0));
        assert!(!RatioRule::HalfBand.accepts(2.0, 0.99));
        assert!(!RatioRule::HalfBand.accepts(2.0, 2.01));
    }

    #[test]
    fn it_should_only_cap_the_upper_side_with_upper_150() {
        assert!(RatioRule::UpperOneAndHalf.accepts(2.0, 0.1));
        assert!(RatioRule::UpperOneAndHalf.accepts(2.0, 3.0));
        assert!(!RatioRule::UpperOneAndHalf.accepts(2.0, 3.01));
    }

    #[test]
    fn it_should_parse_rule_names() {
        assert_eq!("match-subject".parse(), Ok(ClassRule::MatchSubject));
        assert_eq!("fixed:B".parse(), Ok(ClassRule::Fixed("B".to_owned())));
        assert_eq!("upper-150".parse(), Ok(RatioRule::UpperOneAndHalf));
        assert_eq!("value-ratio".parse(), Ok(Ranking::ValueThenRatio));
    }

    #[test]
    fn it_should_reject_unknown_rule_names() {
        assert_matches!(
            "fixed:".parse::<ClassRule>(),
            Err(RuleError::InvalidClassRule(_))
        );
        assert_matches!(
            "quarter".parse::<RatioRule>(),
            Err(RuleError::InvalidRatioRule(_))
        );
    }

    #[test]
    fn it_should_match_a_fixed_tier_regardless_of_subject() {
        let rule = ClassRule::Fixed("B".to_owned());

        assert!(rule.accepts(Some("A"), Some("B")));
        assert!(rule.accepts(None, Some("B")));
        assert!(!rule.accepts(Some("B"), Some("A")));
    }

    #[test]
    fn it_should_never_match_a_blank_class() {
        assert!(!ClassRule::MatchSubject.accepts(None, None));
        assert!(!ClassRule::MatchSubject.accepts(Some("A"), None));
        assert!(!ClassRule::MatchSubject.accepts(None, Some("A")));
        assert!(ClassRule::MatchSubject.accepts(Some("A"), Some("A")));
    }

    #[test]
    fn it_should_bound_the_limit() {
        assert_matches!(
            MatchRules::hotel().with_limit(6),
            Err(RuleError::InvalidLimit(6, 5))
        );
        assert_eq!(MatchRules::hotel().with_limit(3).unwrap().limit, 3);
    }
}
