use crate::error::{Error, Result};

/// Default [Na+] in mol/L for the salt-adjusted formula.
pub const DEFAULT_NA_MOLAR: f64 = 0.01;
pub const DEFAULT_WINDOW: usize = 8;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct BaseCounts {
    a: usize,
    c: usize,
    g: usize,
    t: usize,
}

impl BaseCounts {
    fn of(sequence: &[u8]) -> Self {
        let mut counts = BaseCounts::default();
        for b in sequence {
            match b.to_ascii_uppercase() {
                b'A' => counts.a += 1,
                b'C' => counts.c += 1,
                b'G' => counts.g += 1,
                b'T' => counts.t += 1,
                _ => {}
            }
        }
        counts
    }
}

/// Wallace rule: 4 °C per G/C, 2 °C per A/T.
pub fn tm_wallace(sequence: &[u8]) -> f64 {
    let counts = BaseCounts::of(sequence);
    (4 * (counts.g + counts.c) + 2 * (counts.a + counts.t)) as f64
}

/// 81.5 + 16.6·log10([Na+]) + 0.41·GC% − 600/len
pub fn tm_salt_adjusted(sequence: &[u8], na_molar: f64) -> Result<f64> {
    if sequence.is_empty() {
        return Err(Error::EmptySequence);
    }
    if na_molar.is_nan() || na_molar <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "sodium concentration must be positive, got {}",
            na_molar
        )));
    }
    let counts = BaseCounts::of(sequence);
    let len = sequence.len() as f64;
    let gc_percent = (counts.g + counts.c) as f64 / len * 100.0;
    Ok(81.5 + 16.6 * na_molar.log10() + 0.41 * gc_percent - 600.0 / len)
}

#[derive(Clone, Debug, PartialEq)]
pub struct WindowTm {
    /// 1-based start of the window.
    pub position: usize,
    pub window: String,
    pub tm_wallace: f64,
    pub tm_salt: f64,
}

pub fn sliding_window_tm(sequence: &[u8], window: usize, na_molar: f64) -> Result<Vec<WindowTm>> {
    if window == 0 {
        return Err(Error::InvalidParameter("window size must be at least 1".to_string()));
    }
    sequence
        .windows(window)
        .enumerate()
        .map(|(i, w)| {
            Ok(WindowTm {
                position: i + 1,
                window: String::from_utf8_lossy(w).into_owned(),
                tm_wallace: tm_wallace(w),
                tm_salt: tm_salt_adjusted(w, na_molar)?,
            })
        })
        .collect()
}

pub fn format_window_table(rows: &[WindowTm]) -> String {
    let mut out = String::from("Pos\tSequence\tTm1(C)\tTm2(C)\n");
    for row in rows {
        out.push_str(&format!(
            "{}\t{}\t{}\t{:.2}\n",
            row.position, row.window, row.tm_wallace, row.tm_salt
        ));
    }
    out
}
