use log::debug;
use rayon::prelude::*;

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};

pub const DISPLAY_LIMIT: usize = 20;
pub const POSITIONS_SHOWN: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RepeatParams {
    pub min_len: usize,
    pub max_len: usize,
    /// Inclusive lower bound on occurrences, at least 2.
    pub min_reps: usize,
}

impl Default for RepeatParams {
    fn default() -> Self {
        RepeatParams {
            min_len: 3,
            max_len: 6,
            min_reps: 2,
        }
    }
}

impl RepeatParams {
    pub fn validate(&self) -> Result<()> {
        if self.min_len == 0 {
            return Err(Error::InvalidParameter(
                "minimum pattern length must be at least 1".to_string(),
            ));
        }
        if self.max_len < self.min_len {
            return Err(Error::InvalidParameter(format!(
                "maximum pattern length {} below minimum {}",
                self.max_len, self.min_len
            )));
        }
        if self.min_reps < 2 {
            return Err(Error::InvalidParameter(format!(
                "minimum repetitions must be at least 2, got {}",
                self.min_reps
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Repeat {
    pattern: Vec<u8>,
    positions: Vec<usize>,
}

impl Repeat {
    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    pub fn pattern_str(&self) -> String {
        String::from_utf8_lossy(&self.pattern).into_owned()
    }

    /// Start offsets, strictly increasing.
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn count(&self) -> usize {
        self.positions.len()
    }

    pub fn len(&self) -> usize {
        self.pattern.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty()
    }
}

/// Repeats in discovery order (length ascending, then first offset),
/// addressable by pattern text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RepeatSet {
    repeats: Vec<Repeat>,
    index: HashMap<Vec<u8>, usize>,
}

impl RepeatSet {
    fn insert(&mut self, repeat: Repeat) {
        self.index.insert(repeat.pattern.clone(), self.repeats.len());
        self.repeats.push(repeat);
    }

    pub fn get(&self, pattern: &[u8]) -> Option<&Repeat> {
        self.index.get(pattern).map(|&i| &self.repeats[i])
    }

    pub fn contains(&self, pattern: &[u8]) -> bool {
        self.index.contains_key(pattern)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Repeat> {
        self.repeats.iter()
    }

    pub fn len(&self) -> usize {
        self.repeats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repeats.is_empty()
    }
}

impl<'a> IntoIterator for &'a RepeatSet {
    type Item = &'a Repeat;
    type IntoIter = std::slice::Iter<'a, Repeat>;

    fn into_iter(self) -> Self::IntoIter {
        self.repeats.iter()
    }
}

fn occurrences(sequence: &[u8], pattern: &[u8]) -> Vec<usize> {
    sequence
        .windows(pattern.len())
        .enumerate()
        .filter_map(|(j, window)| (window == pattern).then_some(j))
        .collect()
}

/// Every substring of length `min_len..=max_len` occurring at least
/// `min_reps` times, with all (possibly overlapping) start offsets.
///
/// Each distinct pattern is scanned once against every start position of
/// its length; later sightings of the same text are skipped.
pub fn find_repeats(sequence: &[u8], params: &RepeatParams) -> Result<RepeatSet> {
    params.validate()?;
    let mut found = RepeatSet::default();

    for len in params.min_len..=params.max_len.min(sequence.len()) {
        let mut rejected: HashSet<&[u8]> = HashSet::new();
        for pattern in sequence.windows(len) {
            if found.contains(pattern) || rejected.contains(pattern) {
                continue;
            }
            let positions = occurrences(sequence, pattern);
            if positions.len() >= params.min_reps {
                found.insert(Repeat {
                    pattern: pattern.to_vec(),
                    positions,
                });
            } else {
                rejected.insert(pattern);
            }
        }
        debug!("length {}: {} repeated patterns so far", len, found.len());
    }

    Ok(found)
}

/// Ranks by occurrence count, then pattern length, both descending.
/// Ties keep discovery order.
pub fn rank_repeats(repeats: &RepeatSet, limit: usize) -> Vec<&Repeat> {
    let mut ranked: Vec<&Repeat> = repeats.iter().collect();
    ranked.sort_by(|a, b| b.count().cmp(&a.count()).then(b.len().cmp(&a.len())));
    ranked.truncate(limit);
    ranked
}

pub fn format_repeat_report(sequence_len: usize, repeats: &RepeatSet, limit: usize) -> String {
    let mut out = format!(
        "\nDNA Sequence Length: {} nucleotides\n\nFound {} repetitive sequences:\n\n",
        sequence_len,
        repeats.len()
    );
    for repeat in rank_repeats(repeats, limit) {
        let shown = &repeat.positions()[..repeat.count().min(POSITIONS_SHOWN)];
        let ellipsis = if repeat.count() > POSITIONS_SHOWN { "..." } else { "" };
        out.push_str(&format!("Pattern: {}\n", repeat.pattern_str()));
        out.push_str(&format!("Length: {} bp\n", repeat.len()));
        out.push_str(&format!("Repetitions: {} times\n", repeat.count()));
        out.push_str(&format!("Positions: {:?}{}\n", shown, ellipsis));
        out.push_str(&"-".repeat(50));
        out.push('\n');
    }
    out
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrequentRepeat {
    pub pattern: String,
    pub count: usize,
}

/// Most frequent substring of length `min_len..=max_len` occurring more
/// than once. Substrings containing `N` are not counted. On equal counts
/// the substring enumerated first (shorter, then earlier) wins.
pub fn most_frequent_repeat(
    sequence: &[u8],
    min_len: usize,
    max_len: usize,
) -> Option<FrequentRepeat> {
    let mut counts: Vec<(&[u8], usize)> = Vec::new();
    let mut slots: HashMap<&[u8], usize> = HashMap::new();

    for len in min_len.max(1)..=max_len.min(sequence.len()) {
        for window in sequence.windows(len) {
            if window.contains(&b'N') {
                continue;
            }
            let next = counts.len();
            let slot = *slots.entry(window).or_insert(next);
            if slot == next {
                counts.push((window, 0));
            }
            counts[slot].1 += 1;
        }
    }

    let mut best: Option<(&[u8], usize)> = None;
    for &(window, count) in &counts {
        if count > best.map_or(1, |(_, c)| c) {
            best = Some((window, count));
        }
    }

    best.map(|(window, count)| FrequentRepeat {
        pattern: String::from_utf8_lossy(window).into_owned(),
        count,
    })
}

/// `most_frequent_repeat` for each genome, computed in parallel, results
/// in input order.
pub fn survey_most_frequent<S>(
    genomes: &[S],
    min_len: usize,
    max_len: usize,
) -> Vec<Option<FrequentRepeat>>
where
    S: AsRef<[u8]> + Sync,
{
    genomes
        .par_iter()
        .map(|genome| most_frequent_repeat(genome.as_ref(), min_len, max_len))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(min_len: usize, max_len: usize, min_reps: usize) -> RepeatParams {
        RepeatParams {
            min_len,
            max_len,
            min_reps,
        }
    }

    #[test]
    fn test_find_repeats_atatat() {
        let found = find_repeats(b"ATATAT", &params(2, 2, 2)).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found.get(b"AT").unwrap().positions(), &[0, 2, 4]);
        assert_eq!(found.get(b"TA").unwrap().positions(), &[1, 3]);
    }

    #[test]
    fn test_find_repeats_overlapping() {
        let found = find_repeats(b"AAAAA", &params(3, 4, 2)).unwrap();
        assert_eq!(found.get(b"AAA").unwrap().positions(), &[0, 1, 2]);
        assert_eq!(found.get(b"AAAA").unwrap().positions(), &[0, 1]);
    }

    #[test]
    fn test_find_repeats_threshold_inclusive() {
        let found = find_repeats(b"ACGTTACGAACG", &params(3, 3, 3)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found.get(b"ACG").unwrap().positions(), &[0, 5, 9]);
        assert!(find_repeats(b"ACGTTACGAACG", &params(3, 3, 4)).unwrap().is_empty());
    }

    #[test]
    fn test_find_repeats_min_len_exceeds_sequence() {
        assert!(find_repeats(b"ACG", &params(4, 6, 2)).unwrap().is_empty());
    }

    #[test]
    fn test_find_repeats_rejects_bad_params() {
        assert!(find_repeats(b"ACGT", &params(0, 3, 2)).is_err());
        assert!(find_repeats(b"ACGT", &params(4, 3, 2)).is_err());
        assert!(find_repeats(b"ACGT", &params(2, 3, 1)).is_err());
    }

    #[test]
    fn test_discovery_order() {
        let found = find_repeats(b"GGATGGAT", &params(2, 3, 2)).unwrap();
        let patterns: Vec<String> = found.iter().map(|r| r.pattern_str()).collect();
        assert_eq!(patterns, vec!["GG", "GA", "AT", "GGA", "GAT"]);
    }

    #[test]
    fn test_rank_repeats() {
        let found = find_repeats(b"ATATATGCGC", &params(2, 3, 2)).unwrap();
        let ranked = rank_repeats(&found, 3);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].pattern(), b"AT");
        assert_eq!(ranked[0].count(), 3);
        // count 2, length 3 outranks count 2, length 2
        assert_eq!(ranked[1].pattern(), b"ATA");
        assert_eq!(ranked[2].pattern(), b"TAT");
    }

    #[test]
    fn test_format_repeat_report() {
        let sequence = b"AT".repeat(12);
        let found = find_repeats(&sequence, &params(2, 2, 2)).unwrap();
        let report = format_repeat_report(sequence.len(), &found, DISPLAY_LIMIT);
        assert!(report.contains("DNA Sequence Length: 24 nucleotides"));
        assert!(report.contains("Found 2 repetitive sequences:"));
        assert!(report.contains("Pattern: AT\nLength: 2 bp\nRepetitions: 12 times\n"));
        assert!(report.contains("Positions: [0, 2, 4, 6, 8, 10, 12, 14, 16, 18]...\n"));
        assert!(report.contains("Positions: [1, 3, 5, 7, 9, 11, 13, 15, 17, 19]...\n"));
    }

    #[test]
    fn test_most_frequent_repeat() {
        let top = most_frequent_repeat(b"ACGACGACGT", 3, 10).unwrap();
        assert_eq!(top.pattern, "ACG");
        assert_eq!(top.count, 3);
    }

    #[test]
    fn test_most_frequent_repeat_tie_first_seen() {
        // ACG and CGT both occur twice
        let top = most_frequent_repeat(b"ACGTTACGT", 3, 3).unwrap();
        assert_eq!(top.pattern, "ACG");
        assert_eq!(top.count, 2);
    }

    #[test]
    fn test_survey_most_frequent() {
        let genomes = vec![b"ACGACGACGT".to_vec(), b"ACGT".to_vec(), b"TTTTT".to_vec()];
        let survey = survey_most_frequent(&genomes, 3, 10);
        assert_eq!(survey.len(), 3);
        assert_eq!(survey[0].as_ref().map(|r| r.pattern.as_str()), Some("ACG"));
        assert_eq!(survey[1], None);
        assert_eq!(
            survey[2],
            Some(FrequentRepeat {
                pattern: "TTT".to_string(),
                count: 3
            })
        );
    }

    #[test]
    fn test_most_frequent_repeat_skips_n() {
        assert_eq!(most_frequent_repeat(b"ANTANTANT", 3, 3), None);
        assert_eq!(most_frequent_repeat(b"ACGT", 3, 4), None);
    }
}
