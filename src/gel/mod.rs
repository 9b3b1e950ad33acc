//! ASCII agarose gel simulation.
//!
//! Band rows follow a log10 size axis: the largest fragment in view sits
//! at the wells (row 0), the smallest at the bottom row.

use log::debug;
use ndarray::Array2;
use rand::Rng;

use std::fmt;

use crate::error::{Error, Result};

pub const DEFAULT_LADDER: [usize; 11] =
    [100, 200, 300, 400, 500, 700, 1000, 1500, 2000, 2500, 3000];

/// Lower bound for the size axis, keeps log10 away from tiny values.
pub const MIN_BP_FLOOR: usize = 50;

const PAD: usize = 2;
const BAND_HALF_WIDTH: isize = 2;

pub const WELL_CHAR: u8 = b'-';
pub const LADDER_CHAR: u8 = b'#';
pub const SAMPLE_CHAR: u8 = b'=';

pub const GEL_LEGEND: &str =
    "Legend:\n  = : sample fragment bands\n  # : ladder bands\n  - : wells at top";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GelParams {
    pub ladder: Vec<usize>,
    pub height: usize,
    pub lane_width: usize,
    /// Randomly thicken bands by one row above and below.
    pub smear: bool,
}

impl Default for GelParams {
    fn default() -> Self {
        GelParams {
            ladder: DEFAULT_LADDER.to_vec(),
            height: 40,
            lane_width: 7,
            smear: false,
        }
    }
}

/// Row reached by a fragment of `bp` base pairs on a gel of `height` rows.
///
/// When `max_bp <= min_bp` the size axis is degenerate and every band
/// lands on the bottom row.
pub fn migrate_position(bp: usize, min_bp: usize, max_bp: usize, height: usize) -> usize {
    if height == 0 {
        return 0;
    }
    let bottom = height - 1;
    if max_bp <= min_bp {
        return bottom;
    }
    let log_min = (min_bp.max(1) as f64).log10();
    let log_max = (max_bp.max(1) as f64).log10();
    let val = (log_max - (bp.max(1) as f64).log10()) / (log_max - log_min);
    let y = (val * bottom as f64).round_ties_even();
    if y.is_nan() {
        return bottom;
    }
    y.clamp(0.0, bottom as f64) as usize
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gel {
    grid: Array2<u8>,
    min_bp: usize,
    max_bp: usize,
    lanes: usize,
    lane_width: usize,
}

impl Gel {
    /// Rows by columns, one ASCII byte per cell.
    pub fn grid(&self) -> &Array2<u8> {
        &self.grid
    }

    pub fn height(&self) -> usize {
        self.grid.nrows()
    }

    pub fn width(&self) -> usize {
        self.grid.ncols()
    }

    pub fn min_bp(&self) -> usize {
        self.min_bp
    }

    pub fn max_bp(&self) -> usize {
        self.max_bp
    }

    pub fn lanes(&self) -> usize {
        self.lanes
    }

    pub fn lane_center(&self, lane: usize) -> usize {
        lane_center(lane, self.lane_width)
    }

    pub fn row_for_bp(&self, bp: usize) -> usize {
        migrate_position(bp, self.min_bp, self.max_bp, self.height())
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<char> {
        self.grid.get((row, col)).map(|&b| b as char)
    }
}

impl fmt::Display for Gel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, row) in self.grid.rows().into_iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            let line: String = row.iter().map(|&b| b as char).collect();
            f.write_str(&line)?;
        }
        Ok(())
    }
}

fn lane_center(lane: usize, lane_width: usize) -> usize {
    PAD + lane * lane_width + lane_width / 2
}

fn put(grid: &mut Array2<u8>, row: isize, col: isize, ch: u8) {
    if row < 0 || col < 0 {
        return;
    }
    if let Some(cell) = grid.get_mut((row as usize, col as usize)) {
        *cell = ch;
    }
}

/// Lays out lane 0 as the ladder and lanes 1.. as `fragments` in order.
pub fn render_gel<R: Rng + ?Sized>(
    fragments: &[usize],
    params: &GelParams,
    rng: &mut R,
) -> Result<Gel> {
    if params.height == 0 || params.lane_width == 0 {
        return Err(Error::InvalidParameter(format!(
            "gel height and lane width must be positive, got {}x{}",
            params.height, params.lane_width
        )));
    }
    let all_bp = || params.ladder.iter().chain(fragments.iter()).copied();
    let (Some(smallest), Some(largest)) = (all_bp().min(), all_bp().max()) else {
        return Err(Error::InvalidParameter("gel has no ladder and no fragments".to_string()));
    };
    let min_bp = smallest.max(MIN_BP_FLOOR);
    let max_bp = largest.max(min_bp);

    let lanes = 1 + fragments.len();
    let width = PAD * 2 + lanes * params.lane_width;
    let height = params.height;
    let mut grid = Array2::from_elem((height, width), b' ');

    let lw = params.lane_width as isize;
    for lane in 0..lanes {
        let cx = lane_center(lane, params.lane_width) as isize;
        for dx in (-lw).div_euclid(2) + 1..lw / 2 {
            put(&mut grid, 0, cx + dx, WELL_CHAR);
        }
    }

    let mut draw_band = |bp: usize, lane: usize, ch: u8| {
        let cx = lane_center(lane, params.lane_width) as isize;
        let y = migrate_position(bp, min_bp, max_bp, height) as isize;
        let span: isize = if params.smear { rng.gen_range(0..=1) } else { 0 };
        for dy in -span..=span {
            for dx in -BAND_HALF_WIDTH..=BAND_HALF_WIDTH {
                put(&mut grid, y + dy, cx + dx, ch);
            }
        }
    };

    for &bp in params.ladder.iter().filter(|&&bp| (min_bp..=max_bp).contains(&bp)) {
        draw_band(bp, 0, LADDER_CHAR);
    }
    for (i, &bp) in fragments.iter().enumerate() {
        draw_band(bp, i + 1, SAMPLE_CHAR);
    }

    debug!(
        "rendered {} lanes on a {}x{} gel, size axis {}..{} bp",
        lanes, height, width, min_bp, max_bp
    );

    Ok(Gel {
        grid,
        min_bp,
        max_bp,
        lanes,
        lane_width: params.lane_width,
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    pub id: String,
    pub start: usize,
    pub length: usize,
    pub sequence: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FragmentParams {
    pub count: usize,
    pub min_len: usize,
    pub max_len: usize,
}

impl Default for FragmentParams {
    fn default() -> Self {
        FragmentParams {
            count: 10,
            min_len: 100,
            max_len: 300,
        }
    }
}

/// Cuts `count` random fragments out of `sequence`. Lengths that would not
/// fit are shortened to one base less than the sequence.
pub fn sample_fragments<R: Rng + ?Sized>(
    sequence: &[u8],
    params: &FragmentParams,
    rng: &mut R,
) -> Result<Vec<Fragment>> {
    let n = sequence.len();
    if n < 2 {
        return Err(Error::InvalidParameter(format!(
            "need at least 2 bases to cut fragments, got {}",
            n
        )));
    }
    if params.min_len > params.max_len {
        return Err(Error::InvalidParameter(format!(
            "fragment length range {}..={} is empty",
            params.min_len, params.max_len
        )));
    }

    let fragments = (1..=params.count)
        .map(|i| {
            let mut length = rng.gen_range(params.min_len..=params.max_len);
            if length >= n {
                length = n - 1;
            }
            let start = rng.gen_range(0..=n - length);
            Fragment {
                id: format!("F{}", i),
                start,
                length,
                sequence: sequence[start..start + length].to_vec(),
            }
        })
        .collect();

    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_migrate_position_ends() {
        assert_eq!(migrate_position(3000, 100, 3000, 40), 0);
        assert_eq!(migrate_position(100, 100, 3000, 40), 39);
        // one third of the way down a 10..10000 axis
        assert_eq!(migrate_position(1000, 10, 10000, 40), 13);
    }

    #[test]
    fn test_migrate_position_clamped() {
        assert_eq!(migrate_position(20, 100, 3000, 40), 39);
        assert_eq!(migrate_position(90000, 100, 3000, 40), 0);
        assert_eq!(migrate_position(0, 100, 3000, 40), 39);
    }

    #[test]
    fn test_migrate_position_degenerate() {
        assert_eq!(migrate_position(500, 500, 500, 40), 39);
        assert_eq!(migrate_position(500, 500, 500, 1), 0);
        assert_eq!(migrate_position(30, 50, 30, 10), 9);
    }

    #[test]
    fn test_render_gel_all_below_floor() {
        let params = GelParams {
            ladder: vec![30],
            height: 10,
            ..GelParams::default()
        };
        let mut rng = StdRng::seed_from_u64(6);
        let gel = render_gel(&[30, 30], &params, &mut rng).unwrap();
        assert_eq!((gel.min_bp(), gel.max_bp()), (50, 50));
        assert_eq!(gel.row_for_bp(30), 9);
        for lane in 1..gel.lanes() {
            assert_eq!(gel.cell(9, gel.lane_center(lane)), Some('='));
        }
        assert!(gel.grid().row(0).iter().all(|&b| b == b' ' || b == WELL_CHAR));
    }

    #[test]
    fn test_render_gel_layout() {
        let mut rng = StdRng::seed_from_u64(42);
        let gel = render_gel(&[100, 3000], &GelParams::default(), &mut rng).unwrap();
        assert_eq!(gel.height(), 40);
        assert_eq!(gel.width(), 4 + 3 * 7);
        assert_eq!((gel.min_bp(), gel.max_bp()), (100, 3000));

        // wells span cx-3..=cx+2 for a 7-wide lane; the 3000 bp ladder band
        // sits on the well row
        assert_eq!(gel.cell(0, 1), Some(' '));
        assert_eq!(gel.cell(0, 2), Some('-'));
        assert_eq!(gel.cell(0, 3), Some('#'));
        assert_eq!(gel.cell(0, 7), Some('#'));
        assert_eq!(gel.cell(0, 8), Some(' '));
        assert_eq!(gel.cell(0, 9), Some('-'));
        assert_eq!(gel.cell(0, 14), Some('-'));
        assert_eq!(gel.cell(0, 15), Some(' '));

        let cx = gel.lane_center(1);
        assert_eq!(cx, 12);
        assert_eq!(gel.cell(39, cx - 2), Some('='));
        assert_eq!(gel.cell(39, cx + 2), Some('='));
        assert_eq!(gel.cell(39, cx + 3), Some(' '));
        assert_eq!(gel.cell(39, gel.lane_center(0)), Some('#'));
        assert_eq!(gel.cell(0, gel.lane_center(2)), Some('='));
    }

    #[test]
    fn test_render_gel_to_string() {
        let params = GelParams {
            ladder: vec![100],
            height: 3,
            lane_width: 5,
            smear: false,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let gel = render_gel(&[100], &params, &mut rng).unwrap();
        let expected = [
            "  ---- ----   ",
            "              ",
            "  #####=====  ",
        ]
        .join("\n");
        assert_eq!(gel.to_string(), expected);
    }

    #[test]
    fn test_render_gel_skips_ladder_below_floor() {
        let params = GelParams {
            ladder: vec![20, 400],
            ..GelParams::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let gel = render_gel(&[], &params, &mut rng).unwrap();
        assert_eq!(gel.min_bp(), 50);
        let ladder_cells = gel.grid().iter().filter(|&&b| b == LADDER_CHAR).count();
        assert_eq!(ladder_cells, 5);
    }

    #[test]
    fn test_render_gel_rejects_bad_params() {
        let mut rng = StdRng::seed_from_u64(0);
        let flat = GelParams {
            height: 0,
            ..GelParams::default()
        };
        assert!(render_gel(&[100], &flat, &mut rng).is_err());
        let empty = GelParams {
            ladder: vec![],
            ..GelParams::default()
        };
        assert!(render_gel(&[], &empty, &mut rng).is_err());
    }

    #[test]
    fn test_smear_thickens_bands() {
        let params = GelParams {
            smear: true,
            ..GelParams::default()
        };
        let mut rng = StdRng::seed_from_u64(9);
        let fragments = [150, 250, 350, 450, 550, 650, 750, 850];
        let gel = render_gel(&fragments, &params, &mut rng).unwrap();
        for lane in 1..gel.lanes() {
            let cx = gel.lane_center(lane);
            let rows = (0..gel.height())
                .filter(|&r| gel.cell(r, cx) == Some('='))
                .count();
            assert!(rows == 1 || rows == 3, "lane {} has {} band rows", lane, rows);
        }
    }

    #[test]
    fn test_sample_fragments() {
        let sequence = b"ACGT".repeat(100);
        let mut rng = StdRng::seed_from_u64(42);
        let fragments = sample_fragments(&sequence, &FragmentParams::default(), &mut rng).unwrap();
        assert_eq!(fragments.len(), 10);
        for (i, fragment) in fragments.iter().enumerate() {
            assert_eq!(fragment.id, format!("F{}", i + 1));
            assert!((100..=300).contains(&fragment.length));
            assert_eq!(fragment.sequence.len(), fragment.length);
            assert_eq!(
                &sequence[fragment.start..fragment.start + fragment.length],
                fragment.sequence.as_slice()
            );
        }
    }

    #[test]
    fn test_sample_fragments_short_sequence() {
        let mut rng = StdRng::seed_from_u64(5);
        let params = FragmentParams::default();
        let fragments = sample_fragments(b"ACGTACGT", &params, &mut rng).unwrap();
        assert!(fragments.iter().all(|f| f.length == 7 && f.start <= 1));
        assert!(sample_fragments(b"A", &params, &mut rng).is_err());
    }
}
