//! Fuzzy ranking of aggregated records with nucleo-matcher.
//!
//! Each query atom is first matched as a nucleo subsequence. An atom that
//! fails that match may still match with a bounded number of typos
//! (substituted, inserted, deleted or transposed characters) against some
//! substring of the key value, at a lower score.

use nucleo_matcher::pattern::{Atom, AtomKind, CaseMatching, Normalization};
use nucleo_matcher::{Matcher, Utf32String};

use trawl_common::{Record, SearchConfig};

/// A matched record's position in the aggregate and its score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredMatch {
    pub index: usize,
    pub score: u32,
}

/// Scores records against a query over a fixed set of keys.
///
/// A key value matches when every whitespace-separated atom of the query
/// matches it, as a subsequence or within the typo budget. A record's score
/// is its best key score.
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    keys: Vec<String>,
    min_score: u32,
}

impl FuzzyMatcher {
    #[must_use]
    pub const fn new(keys: Vec<String>, min_score: u32) -> Self {
        Self { keys, min_score }
    }

    #[must_use]
    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.keys.clone(), config.min_score)
    }

    /// Scores every record, best first.
    ///
    /// Records that do not match, or score below the threshold, are omitted.
    /// Equal scores keep their aggregate order.
    #[must_use]
    pub fn score_all(&self, query: &str, records: &[Record]) -> Vec<ScoredMatch> {
        let mut matcher = Matcher::new(nucleo_matcher::Config::DEFAULT);
        let atoms: Vec<QueryAtom> = query.split_whitespace().map(QueryAtom::new).collect();

        let mut scored: Vec<ScoredMatch> = records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                let score = self
                    .keys
                    .iter()
                    .filter_map(|key| record.field_text(key))
                    .filter_map(|text| score_text(&atoms, &text, &mut matcher))
                    .max()?;

                (score >= self.min_score).then_some(ScoredMatch { index, score })
            })
            .collect();

        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored
    }

    /// Returns the matching records, best first, moved out of `records` unchanged.
    #[must_use]
    pub fn rank(&self, query: &str, records: Vec<Record>) -> Vec<Record> {
        let scored = self.score_all(query, &records);
        let mut slots: Vec<Option<Record>> = records.into_iter().map(Some).collect();

        scored
            .into_iter()
            .filter_map(|m| slots.get_mut(m.index).and_then(Option::take))
            .collect()
    }
}

/// Score awarded per matched character of an atom matched with typos.
///
/// Kept well below nucleo's per-character score so that exact subsequence
/// matches rank ahead of typo matches.
const TYPO_SCORE_PER_CHAR: u32 = 4;

/// One whitespace-separated term of the query.
struct QueryAtom {
    atom: Atom,
    folded: Vec<char>,
}

impl QueryAtom {
    fn new(term: &str) -> Self {
        Self {
            atom: Atom::new(
                term,
                CaseMatching::Smart,
                Normalization::Smart,
                AtomKind::Fuzzy,
                false,
            ),
            folded: fold(term),
        }
    }

    /// Typos allowed for this atom: none below four characters, then one per
    /// four characters.
    fn typo_budget(&self) -> usize {
        self.folded.len() / 4
    }

    fn score(
        &self,
        haystack: &Utf32String,
        folded: &[char],
        matcher: &mut Matcher,
    ) -> Option<u32> {
        if let Some(score) = self.atom.score(haystack.slice(..), matcher) {
            return Some(u32::from(score));
        }

        let budget = self.typo_budget();
        if budget == 0 {
            return None;
        }
        let typos = substring_distance(&self.folded, folded);
        (typos <= budget).then(|| {
            let matched = u32::try_from(self.folded.len() - typos).unwrap_or(u32::MAX);
            matched.saturating_mul(TYPO_SCORE_PER_CHAR)
        })
    }
}

/// Scores one key value: the sum of its atom scores, if every atom matches.
fn score_text(atoms: &[QueryAtom], text: &str, matcher: &mut Matcher) -> Option<u32> {
    let haystack = Utf32String::from(text);
    let folded = fold(text);

    atoms.iter().try_fold(0_u32, |total, atom| {
        atom.score(&haystack, &folded, matcher)
            .map(|score| total.saturating_add(score))
    })
}

fn fold(text: &str) -> Vec<char> {
    text.chars().flat_map(char::to_lowercase).collect()
}

/// Smallest optimal-string-alignment distance between `needle` and any
/// substring of `haystack`.
///
/// Adjacent transpositions count as a single edit.
fn substring_distance(needle: &[char], haystack: &[char]) -> usize {
    let len = needle.len();
    // Columns of the alignment table for the two previous haystack positions.
    let mut before: Vec<usize> = (0..=len).collect();
    let mut prev: Vec<usize> = (0..=len).collect();
    let mut best = len;

    for (j, &hay) in haystack.iter().enumerate() {
        let mut cur = vec![0; len + 1];
        for i in 1..=len {
            let cost = usize::from(needle[i - 1] != hay);
            let mut distance = (prev[i - 1] + cost).min(prev[i] + 1).min(cur[i - 1] + 1);
            if i > 1 && j > 0 && needle[i - 1] == haystack[j - 1] && needle[i - 2] == hay {
                distance = distance.min(before[i - 2] + 1);
            }
            cur[i] = distance;
        }
        best = best.min(cur[len]);
        before = std::mem::replace(&mut prev, cur);
    }

    best
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::from_config(&SearchConfig::default())
    }
}
