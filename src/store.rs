use std::{fs, io, path::Path};

use anyhow::Context;
use csv::StringRecord;

use crate::{
    episode::{FIELDS, Record},
    merge::{Merged, merge},
};

/// Maps each of [`FIELDS`] to its column in `header`.
///
/// The columns may come in any order, but the header must name exactly the six
/// fields, otherwise rewriting the file would lose data.
fn column_order(header: &StringRecord) -> Option<[usize; 6]> {
    if header.len() != FIELDS.len() {
        return None;
    }
    let mut order = [0; 6];
    for (slot, name) in order.iter_mut().zip(FIELDS) {
        *slot = header.iter().position(|h| h == name)?;
    }
    Some(order)
}

fn to_record(row: &StringRecord, order: &[usize; 6]) -> Record {
    // Short rows read as empty trailing fields.
    let field = |i: usize| row.get(order[i]).unwrap_or_default();
    Record {
        episode_number: field(0).into(),
        title: field(1).to_owned(),
        url: field(2).to_owned(),
        date: field(3).to_owned(),
        topic: field(4).to_owned(),
        description: field(5).to_owned(),
    }
}

/// Loads the previously saved table.
///
/// A missing file is the first-run case and yields nothing. Anything that would
/// not survive a rewrite (foreign header, rows with extra columns, bytes that
/// are not UTF-8) is an error so the caller never overwrites the file.
pub fn read_existing(path: &Path) -> anyhow::Result<Vec<Record>> {
    let mut reader = match csv::ReaderBuilder::new().flexible(true).from_path(path) {
        Ok(r) => r,
        Err(e) => {
            if matches!(e.kind(), csv::ErrorKind::Io(err) if err.kind() == io::ErrorKind::NotFound) {
                return Ok(Vec::new());
            }
            return Err(e).with_context(|| format!("cannot open {}", path.display()));
        }
    };

    let header = reader
        .headers()
        .with_context(|| format!("cannot read header of {}", path.display()))?
        .clone();
    if header.is_empty() {
        return Ok(Vec::new());
    }
    let Some(order) = column_order(&header) else {
        anyhow::bail!("{}: unexpected header {header:?}", path.display());
    };

    let mut records = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("{}: cannot read row {idx}", path.display()))?;
        if row.len() > header.len() {
            anyhow::bail!("{}: row {idx} has {} columns", path.display(), row.len());
        }
        if row.len() < header.len() {
            tracing::warn!(target: "store", "{}: row {idx} is short, padding it", path.display());
        }
        records.push(to_record(&row, &order));
    }

    tracing::info!(target: "store", "found {} existing episodes in {}", records.len(), path.display());
    Ok(records)
}

/// Writes the header and every record, replacing the file.
pub fn save(path: &Path, records: &[Record]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(FIELDS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Folds `incoming` into the table at `path` and writes the result back.
///
/// The file is left alone when the stored table cannot be read.
pub fn update(path: &Path, incoming: Vec<Record>) -> anyhow::Result<Merged> {
    let existing = match read_existing(path) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(target: "store", "\x1b[31m{e:#}, not touching the file\x1b[0m");
            return Err(e);
        }
    };
    let merged = merge(existing, incoming);

    save(path, &merged.episodes)?;

    tracing::info!(target: "store", "\x1b[36madded {} new episodes to {}\x1b[0m", merged.inserted, path.display());
    tracing::info!(target: "store", "total episodes in file: {}", merged.episodes.len());
    Ok(merged)
}
