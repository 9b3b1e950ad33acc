use rand::Rng;

use std::fmt;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Error, Result};

/// Header reported for FASTA text without a `>` line.
pub const UNKNOWN_HEADER: &str = "UNKNOWN";

pub const ALPHABET: &[u8] = b"ACGTN";
pub const UNAMBIGUOUS: &[u8] = b"ACGT";

/// An uppercase nucleotide sequence over `ACGTN`, never empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Sequence(Vec<u8>);

impl Sequence {
    pub fn new(bases: impl Into<Vec<u8>>) -> Result<Self> {
        let mut bases = bases.into();
        bases.make_ascii_uppercase();
        if bases.is_empty() {
            return Err(Error::EmptySequence);
        }
        if let Some(pos) = bases.iter().position(|b| !ALPHABET.contains(b)) {
            return Err(Error::InvalidSequence(format!(
                "unexpected character '{}' at position {}",
                bases[pos] as char, pos
            )));
        }
        Ok(Sequence(bases))
    }

    /// Caller guarantees a non-empty `ACGTN` uppercase buffer.
    pub(crate) fn from_checked(bases: Vec<u8>) -> Self {
        debug_assert!(!bases.is_empty() && bases.iter().all(|b| ALPHABET.contains(b)));
        Sequence(bases)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for Sequence {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // ALPHABET is ASCII
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FastaRecord {
    pub header: String,
    pub sequence: Vec<u8>,
}

/// Header from the first line, bases from every line after it. Malformed input gives the
/// `UNKNOWN` header and an empty sequence instead of an error.
pub fn parse_fasta(text: &str) -> FastaRecord {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    let header = match lines.next().and_then(|l| l.strip_prefix('>')) {
        Some(header) => header.to_string(),
        None => {
            return FastaRecord {
                header: UNKNOWN_HEADER.to_string(),
                sequence: Vec::new(),
            }
        }
    };

    let sequence = lines
        .flat_map(str::bytes)
        .map(|b| b.to_ascii_uppercase())
        .filter(|b| ALPHABET.contains(b))
        .collect();

    FastaRecord { header, sequence }
}

/// A FASTA file read and filtered the same way as [`parse_fasta`].
pub fn read_fasta_record<P: AsRef<Path>>(file_path: P) -> Result<FastaRecord> {
    let text = fs::read_to_string(file_path)?;
    Ok(parse_fasta(&text))
}

/// Concatenates every non-header line of a FASTA file, uppercased.
pub fn read_fasta_file<P: AsRef<Path>>(file_path: P) -> Result<Vec<u8>> {
    let file = File::open(file_path)?;
    let reader = BufReader::new(file);
    let mut sequence = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.starts_with('>') {
            continue;
        }
        sequence.extend(line.trim().bytes().map(|b| b.to_ascii_uppercase()));
    }

    Ok(sequence)
}

pub fn random_dna<R: Rng + ?Sized>(length: usize, rng: &mut R) -> Vec<u8> {
    (0..length)
        .map(|_| UNAMBIGUOUS[rng.gen_range(0..UNAMBIGUOUS.len())])
        .collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NucleotidePercentages {
    pub a: f64,
    pub t: f64,
    pub g: f64,
    pub c: f64,
}

impl NucleotidePercentages {
    pub fn iter(&self) -> impl Iterator<Item = (char, f64)> {
        [('A', self.a), ('T', self.t), ('G', self.g), ('C', self.c)].into_iter()
    }
}

pub fn nucleotide_percentages(sequence: &[u8]) -> NucleotidePercentages {
    if sequence.is_empty() {
        return NucleotidePercentages::default();
    }
    let n = sequence.len() as f64;
    let percent = |base: u8| {
        sequence
            .iter()
            .filter(|b| b.to_ascii_uppercase() == base)
            .count() as f64
            / n
            * 100.0
    };
    NucleotidePercentages {
        a: percent(b'A'),
        t: percent(b'T'),
        g: percent(b'G'),
        c: percent(b'C'),
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DinucleotideFrequency {
    pub percent: f64,
    pub count: usize,
    pub total: usize,
}

/// Overlapping occurrences of `dinuc` over the `len - 1` windows (at least one).
pub fn dinucleotide_percentage(sequence: &[u8], dinuc: &[u8; 2]) -> DinucleotideFrequency {
    let total = sequence.len().saturating_sub(1).max(1);
    let count = sequence.windows(2).filter(|w| w == dinuc).count();
    DinucleotideFrequency {
        percent: count as f64 / total as f64 * 100.0,
        count,
        total,
    }
}

pub fn composition_report(sequence: &[u8]) -> String {
    let percentages = nucleotide_percentages(sequence);
    let cg = dinucleotide_percentage(sequence, b"CG");

    let mut out = format!(
        "Sequence ({} bp):\n{}\n\nNucleotide percentages (%):\n",
        sequence.len(),
        String::from_utf8_lossy(sequence)
    );
    for (base, pct) in percentages.iter() {
        out.push_str(&format!("{}: {:.2}\n", base, pct));
    }
    out.push_str(&format!(
        "\nDinucleotide CG: {}/{} = {:.4}%\n",
        cg.count, cg.total, cg.percent
    ));
    out
}
