//! Compass projection and distribution binning.
//!
//! Only economy and governance participate. The y axis is inverted: a higher
//! governance score (more authoritarian) lands lower on the compass.

use partyline_common::{
    CompassHistogram, CompassPoint, Snapshot, COMPASS_GRID_SIZE, MAX_COMPASS_POINTS, NEUTRAL_SCORE,
};

const COMPASS_MIN: i32 = -100;
const COMPASS_MAX: i32 = 100;
const BIN_WIDTH: i32 = (COMPASS_MAX - COMPASS_MIN) / COMPASS_GRID_SIZE as i32;

/// Project a snapshot onto the 2-D compass.
pub fn project(snapshot: &Snapshot) -> CompassPoint {
    let economy = i32::from(snapshot.pillars.economy.score);
    let governance = i32::from(snapshot.pillars.governance.score);
    let neutral = i32::from(NEUTRAL_SCORE);

    CompassPoint {
        x: ((economy - neutral) * 2).clamp(COMPASS_MIN, COMPASS_MAX),
        y: ((neutral - governance) * 2).clamp(COMPASS_MIN, COMPASS_MAX),
    }
}

/// Grid index for one coordinate. The +100 edge folds into the last bin.
pub fn bin_index(coordinate: i32) -> usize {
    let raw = (coordinate - COMPASS_MIN).div_euclid(BIN_WIDTH);
    raw.clamp(0, COMPASS_GRID_SIZE as i32 - 1) as usize
}

/// Bin the first `MAX_COMPASS_POINTS` points into a 10x10 grid.
pub fn histogram(points: impl IntoIterator<Item = CompassPoint>) -> CompassHistogram {
    let mut hist = CompassHistogram::default();
    for point in points.into_iter().take(MAX_COMPASS_POINTS) {
        hist.bins[bin_index(point.x)][bin_index(point.y)] += 1;
        hist.total += 1;
    }
    hist
}
