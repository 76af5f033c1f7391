// ─────────────────────────────────────────────────────────────────────
// PertNet RS — Coefficient Table Persistence
// Reduced-order tokamak plasma response model
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! NPZ persistence for per-split coefficient tables.
//!
//! One archive per split: shared `shot`/`time` columns, one
//! `coeff_<signal>` matrix per signal, and mean/components/EVR
//! diagnostics for PCA-backed signals.

use std::collections::BTreeMap;
use std::fs::File;

use ndarray::{Array1, Array2};
use ndarray_npy::{NpzReader, NpzWriter};
use pert_types::error::{PertError, PertResult};
use pert_types::state::{CoeffTable, SignalBasis};

fn npz_err(path: &str, e: impl std::fmt::Display) -> PertError {
    PertError::ConfigError(format!("npz '{path}': {e}"))
}

// NpzWriter appends a ".npy" suffix to entry names; accept either form
// when reading so archives written by other tools load too.
fn read_array1_i64(
    npz: &mut NpzReader<File>,
    key: &str,
    path: &str,
) -> PertResult<Array1<i64>> {
    npz.by_name::<ndarray::OwnedRepr<i64>, ndarray::Ix1>(&format!("{key}.npy"))
        .or_else(|_| npz.by_name::<ndarray::OwnedRepr<i64>, ndarray::Ix1>(key))
        .map_err(|e| npz_err(path, e))
}

fn read_array1_f64(
    npz: &mut NpzReader<File>,
    key: &str,
    path: &str,
) -> PertResult<Array1<f64>> {
    npz.by_name::<ndarray::OwnedRepr<f64>, ndarray::Ix1>(&format!("{key}.npy"))
        .or_else(|_| npz.by_name::<ndarray::OwnedRepr<f64>, ndarray::Ix1>(key))
        .map_err(|e| npz_err(path, e))
}

fn read_array2_f64(
    npz: &mut NpzReader<File>,
    key: &str,
    path: &str,
) -> PertResult<Array2<f64>> {
    npz.by_name::<ndarray::OwnedRepr<f64>, ndarray::Ix2>(&format!("{key}.npy"))
        .or_else(|_| npz.by_name::<ndarray::OwnedRepr<f64>, ndarray::Ix2>(key))
        .map_err(|e| npz_err(path, e))
}

/// Write one split's coefficient table, with basis diagnostics for the
/// signals that were PCA-projected.
pub fn save_coeff_table(
    table: &CoeffTable,
    bases: &BTreeMap<String, SignalBasis>,
    path: &str,
) -> PertResult<()> {
    table.validate_alignment()?;

    let mut npz = NpzWriter::new(File::create(path)?);
    npz.add_array("shot", &table.shot)
        .map_err(|e| npz_err(path, e))?;
    npz.add_array("time", &table.time)
        .map_err(|e| npz_err(path, e))?;

    for (name, coeff) in &table.signals {
        npz.add_array(&format!("coeff_{name}"), coeff)
            .map_err(|e| npz_err(path, e))?;

        if let Some(SignalBasis::Pca(merged)) = bases.get(name) {
            npz.add_array(&format!("mean_{name}"), &merged.mean)
                .map_err(|e| npz_err(path, e))?;
            npz.add_array(&format!("components_{name}"), &merged.components)
                .map_err(|e| npz_err(path, e))?;
            let evr = &merged.flattop.explained_variance_ratio;
            npz.add_array(&format!("evr_{name}"), evr)
                .map_err(|e| npz_err(path, e))?;
        }
    }

    npz.finish().map_err(|e| npz_err(path, e))?;
    Ok(())
}

/// Read a coefficient table back. Basis diagnostics are ignored here;
/// only the columns the predictor consumes are reconstructed.
pub fn load_coeff_table(path: &str) -> PertResult<CoeffTable> {
    let mut npz = NpzReader::new(File::open(path)?).map_err(|e| npz_err(path, e))?;

    let entry_names: Vec<String> = npz
        .names()
        .map_err(|e| npz_err(path, e))?
        .into_iter()
        .map(|n| n.trim_end_matches(".npy").to_string())
        .collect();

    let shot = read_array1_i64(&mut npz, "shot", path)?;
    let time = read_array1_f64(&mut npz, "time", path)?;

    let mut signals = BTreeMap::new();
    for entry in &entry_names {
        if let Some(name) = entry.strip_prefix("coeff_") {
            let coeff = read_array2_f64(&mut npz, entry, path)?;
            signals.insert(name.to_string(), coeff);
        }
    }

    let table = CoeffTable {
        signals,
        shot,
        time,
    };
    table.validate_alignment()?;
    Ok(table)
}
