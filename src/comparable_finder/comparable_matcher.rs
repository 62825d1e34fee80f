use failure::Fail;
use std::cmp::Ordering;

use log::debug;

use super::match_rules::{MatchRules, Ranking};
use super::property_types::PropertyRecord;

#[derive(Debug, Fail, PartialEq)]
pub enum MatchError {
    #[fail(display = "Subject '{}' has no market value", _0)]
    MissingSubjectValue(String),
    #[fail(display = "Subject '{}' has no value ratio", _0)]
    MissingSubjectRatio(String),
}

/// Differences of one eligible candidate against the subject.
#[derive(Debug, Clone, Copy)]
struct Scored<'a> {
    record: &'a PropertyRecord,
    value_diff: f64,
    ratio_diff: f64,
}

impl<'a> Scored<'a> {
    #[inline]
    fn combined(&self) -> f64 {
        self.value_diff + self.ratio_diff
    }

    fn cmp_by(&self, other: &Scored, ranking: Ranking) -> Ordering {
        let by_value_then_ratio = self
            .value_diff
            .total_cmp(&other.value_diff)
            .then_with(|| self.ratio_diff.total_cmp(&other.ratio_diff));

        match ranking {
            Ranking::Combined => self
                .combined()
                .total_cmp(&other.combined())
                .then(by_value_then_ratio),
            Ranking::ValueThenRatio => by_value_then_ratio,
        }
    }
}

pub struct ComparableFinder {
    rules: MatchRules,
}

impl ComparableFinder {
    pub fn new(rules: MatchRules) -> ComparableFinder {
        ComparableFinder { rules }
    }

    /// Returns at most `rules.limit` comparables for `subject`, most similar first.
    ///
    /// The subject is skipped when it is itself part of `dataset`, and every
    /// candidate sharing any identity field with it is ineligible. Ties left
    /// after the ranking keys keep dataset order.
    pub fn find_comparables<'a>(
        &self,
        subject: &PropertyRecord,
        dataset: &'a [PropertyRecord],
    ) -> Result<Vec<&'a PropertyRecord>, MatchError> {
        let subject_value = subject
            .market_value
            .ok_or_else(|| MatchError::MissingSubjectValue(subject.label().to_owned()))?;
        let subject_ratio = subject
            .ratio
            .ok_or_else(|| MatchError::MissingSubjectRatio(subject.label().to_owned()))?;

        let mut scored: Vec<Scored<'a>> = dataset
            .iter()
            .filter(|candidate| !std::ptr::eq(*candidate, subject))
            .filter_map(|candidate| self.score(subject, subject_value, subject_ratio, candidate))
            .collect();

        debug!(
            "{} eligible candidates for '{}'",
            scored.len(),
            subject.label()
        );

        let ranking = self.rules.ranking;
        scored.sort_by(|a, b| a.cmp_by(b, ranking));
        scored.truncate(self.rules.limit);

        Ok(scored.into_iter().map(|s| s.record).collect())
    }

    /// Applies every eligibility predicate; `None` when the candidate fails one.
    fn score<'a>(
        &self,
        subject: &PropertyRecord,
        subject_value: f64,
        subject_ratio: f64,
        candidate: &'a PropertyRecord,
    ) -> Option<Scored<'a>> {
        let value = candidate.market_value?;
        let ratio = candidate.ratio?;

        let eligible = candidate.distinct_identity(subject)
            && self.rules
                .class_rule
                .accepts(subject.class.as_deref(), candidate.class.as_deref())
            && candidate.property_type == self.rules.asset_type
            && value >= subject_value - self.rules.value_band
            && value <= subject_value + self.rules.value_band
            && self.rules.ratio_rule.accepts(subject_ratio, ratio);

        if !eligible {
            return None;
        }

        Some(Scored {
            record: candidate,
            value_diff: (value - subject_value).abs(),
            ratio_diff: (ratio - subject_ratio).abs(),
        })
    }
}
