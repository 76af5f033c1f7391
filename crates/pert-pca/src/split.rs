// ─────────────────────────────────────────────────────────────────────
// PertNet RS — Shot Splitter
// Reduced-order tokamak plasma response model
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! Train/validation/test partitioning by shot identity.
//!
//! Whole shots move together: unique shot identifiers are sorted and
//! assigned to contiguous fraction-sized blocks, then rows are selected
//! per block. Samples from one discharge never straddle two splits.

use std::collections::BTreeSet;

use pert_types::config::SplitFractions;
use pert_types::error::{PertError, PertResult};
use pert_types::state::CoeffTable;

/// Row-membership rule for a split's assigned shot block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    /// Exact set membership by shot identifier. The default.
    ByShot,
    /// Inclusive min/max range test per block, as the historical
    /// pipeline did it. Equivalent to `ByShot` when the selection is
    /// derived from the same table (sorted unique blocks are
    /// contiguous), but misclassifies foreign shot identifiers that
    /// fall numerically inside another block's range; kept only for
    /// validating against previously generated artifacts.
    ByRange,
}

/// Partition a coefficient table into train/validation/test tables.
///
/// Fractions apply to the count of unique shots, rounded down; the
/// remainder lands in test. Fails when any split would receive zero
/// shots.
pub fn split_by_shot(
    table: &CoeffTable,
    fractions: &SplitFractions,
    mode: SplitMode,
) -> PertResult<(CoeffTable, CoeffTable, CoeffTable)> {
    let uniq: Vec<i64> = {
        let set: BTreeSet<i64> = table.shot.iter().copied().collect();
        set.into_iter().collect()
    };
    let u = uniq.len();
    if u == 0 {
        return Err(PertError::ConfigError(
            "cannot split an empty coefficient table".to_string(),
        ));
    }

    let ntrain = (fractions.ftrain * u as f64).floor() as usize;
    let nval = (fractions.fval * u as f64).floor() as usize;
    if ntrain == 0 || nval == 0 || ntrain + nval >= u {
        return Err(PertError::ConfigError(format!(
            "split fractions ({}, {}, {}) leave an empty split over {u} shots",
            fractions.ftrain, fractions.fval, fractions.ftest
        )));
    }

    let train_shots = &uniq[..ntrain];
    let val_shots = &uniq[ntrain..ntrain + nval];
    let test_shots = &uniq[ntrain + nval..];

    let n = table.n_samples();
    let select = |pred: &dyn Fn(i64) -> bool| -> Vec<usize> {
        (0..n).filter(|&i| pred(table.shot[i])).collect()
    };

    let (itrain, ival, itest) = match mode {
        SplitMode::ByShot => {
            let train_set: BTreeSet<i64> = train_shots.iter().copied().collect();
            let val_set: BTreeSet<i64> = val_shots.iter().copied().collect();
            let test_set: BTreeSet<i64> = test_shots.iter().copied().collect();
            (
                select(&|s| train_set.contains(&s)),
                select(&|s| val_set.contains(&s)),
                select(&|s| test_set.contains(&s)),
            )
        }
        SplitMode::ByRange => {
            let train_hi = train_shots[train_shots.len() - 1];
            let (val_lo, val_hi) = (val_shots[0], val_shots[val_shots.len() - 1]);
            let (test_lo, test_hi) = (test_shots[0], test_shots[test_shots.len() - 1]);
            (
                select(&|s| s <= train_hi),
                select(&|s| s >= val_lo && s <= val_hi),
                select(&|s| s >= test_lo && s <= test_hi),
            )
        }
    };

    let train = table.select_rows(&itrain);
    let val = table.select_rows(&ival);
    let test = table.select_rows(&itest);
    train.validate_alignment()?;
    val.validate_alignment()?;
    test.validate_alignment()?;

    Ok((train, val, test))
}
