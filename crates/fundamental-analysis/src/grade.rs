//! Banded score tables and the 49-level letter grade.

const LETTERS: [char; 7] = ['S', 'A', 'B', 'C', 'D', 'E', 'F'];
const MODIFIERS: [&str; 7] = ["+++", "++", "+", "", "-", "--", "---"];

/// Lowest grade index (`F---`)
pub const MAX_GRADE_INDEX: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Bands are inclusive lower bounds: `value >= threshold`
    AtLeast,
    /// Bands are inclusive upper bounds: `value <= threshold`
    AtMost,
}

/// Step function from a ratio to points. Bands are checked in order; the first hit wins.
#[derive(Debug, Clone, Copy)]
pub struct BandTable {
    pub direction: Direction,
    pub bands: &'static [(f64, f64)],
    pub max_score: f64,
}

impl BandTable {
    /// Points for `value`, zero when no band matches (including NaN)
    pub fn score(&self, value: f64) -> f64 {
        self.bands
            .iter()
            .find(|(threshold, _)| match self.direction {
                Direction::AtLeast => value >= *threshold,
                Direction::AtMost => value <= *threshold,
            })
            .map(|(_, points)| *points)
            .unwrap_or(0.0)
    }
}

pub const ROE_BANDS: BandTable = BandTable {
    direction: Direction::AtLeast,
    bands: &[(20.0, 30.0), (15.0, 25.0), (10.0, 15.0), (5.0, 8.0), (0.0, 3.0)],
    max_score: 30.0,
};

pub const CASH_GENERATION_BANDS: BandTable = BandTable {
    direction: Direction::AtLeast,
    bands: &[(1.5, 25.0), (1.2, 22.0), (1.0, 15.0), (0.7, 8.0), (0.5, 4.0)],
    max_score: 25.0,
};

pub const GROWTH_BANDS: BandTable = BandTable {
    direction: Direction::AtLeast,
    bands: &[(30.0, 20.0), (15.0, 18.0), (5.0, 12.0), (0.0, 6.0), (-15.0, 2.0)],
    max_score: 20.0,
};

pub const INTEREST_COVERAGE_BANDS: BandTable = BandTable {
    direction: Direction::AtLeast,
    bands: &[(5.0, 15.0), (3.0, 12.0), (1.5, 7.0), (1.0, 3.0)],
    max_score: 15.0,
};

pub const DEBT_RATIO_BANDS: BandTable = BandTable {
    direction: Direction::AtMost,
    bands: &[(50.0, 10.0), (100.0, 8.0), (150.0, 5.0), (200.0, 2.0)],
    max_score: 10.0,
};

pub const ROIC_BANDS: BandTable = BandTable {
    direction: Direction::AtLeast,
    bands: &[(20.0, 15.0), (15.0, 12.0), (10.0, 8.0), (5.0, 4.0)],
    max_score: 15.0,
};

pub const OPERATING_MARGIN_BANDS: BandTable = BandTable {
    direction: Direction::AtLeast,
    bands: &[(20.0, 10.0), (15.0, 8.0), (10.0, 6.0), (5.0, 3.0)],
    max_score: 10.0,
};

pub const RETENTION_BANDS: BandTable = BandTable {
    direction: Direction::AtLeast,
    bands: &[(1000.0, 10.0), (500.0, 8.0), (300.0, 5.0), (100.0, 2.0)],
    max_score: 10.0,
};

pub const MARGIN_STABILITY_MAX: f64 = 10.0;

/// Margin stability points from the mean and population standard deviation of the
/// operating margins
pub fn margin_stability_score(mean_margin: f64, std_dev: f64) -> f64 {
    if mean_margin >= 10.0 && std_dev < 3.0 {
        10.0
    } else if mean_margin >= 10.0 && std_dev < 5.0 {
        8.0
    } else if mean_margin >= 7.0 && std_dev < 5.0 {
        5.0
    } else if mean_margin >= 5.0 {
        3.0
    } else {
        0.0
    }
}

/// 0 (`S+++`) through 48 (`F---`)
pub fn grade_index(score: f64, max_score: f64) -> usize {
    let ratio = if max_score > 0.0 { score / max_score } else { 0.0 };
    let index = ((1.0 - ratio) * 49.0).round();
    if index.is_nan() {
        return MAX_GRADE_INDEX;
    }
    index.clamp(0.0, MAX_GRADE_INDEX as f64) as usize
}

pub fn grade_for_index(index: usize) -> String {
    let index = index.min(MAX_GRADE_INDEX);
    format!("{}{}", LETTERS[index / 7], MODIFIERS[index % 7])
}

pub fn score_to_grade(score: f64, max_score: f64) -> String {
    grade_for_index(grade_index(score, max_score))
}
