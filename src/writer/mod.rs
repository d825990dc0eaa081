//! Parquet persistence for the three final tables
//!
//! Every table is encoded into an Arrow `RecordBatch` before any file is
//! created. Files are written to `.tmp` siblings and renamed into place only
//! once all three were written; a failed rename rolls the directory back to
//! its previous contents.

use crate::config::{
    PrepConfig, DEMOGRAPHIC_MEASURE_COLUMNS, IN_CATEGORY_MAX_COLUMN, MEASURE_COLUMNS,
    PERCENT_COLUMN,
};
use crate::error::{PrepError, PrepResult};
use crate::types::{Dataset, DemographicRecord, MeasureRecord, SpecificRecord};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub const OVERALL_FILE: &str = "overall.parquet";
pub const SPECIFIC_FILE: &str = "specific.parquet";
pub const DEMOGRAPHIC_FILE: &str = "demo.parquet";

/// Encode all three tables, then commit them into `output_dir`.
/// Returns the committed paths in overall, specific, demographic order.
pub fn write_dataset(
    dataset: &Dataset,
    config: &PrepConfig,
    output_dir: &Path,
) -> PrepResult<Vec<PathBuf>> {
    let batches = [
        (OVERALL_FILE, overall_batch(&dataset.overall, &config.overall_columns)?),
        (
            SPECIFIC_FILE,
            specific_batch(&dataset.specific, &config.specific_columns)?,
        ),
        (
            DEMOGRAPHIC_FILE,
            demographic_batch(&dataset.demographic, &config.demographic_columns)?,
        ),
    ];

    fs::create_dir_all(output_dir).map_err(|e| {
        PrepError::Persistence(format!(
            "cannot create output directory `{}`: {}",
            output_dir.display(),
            e
        ))
    })?;

    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(batches.len());
    for (file_name, batch) in &batches {
        let final_path = output_dir.join(file_name);
        let tmp_path = sibling(&final_path, "tmp");
        if let Err(e) = write_parquet(&tmp_path, batch) {
            let _ = fs::remove_file(&tmp_path);
            discard(&staged);
            return Err(e);
        }
        staged.push((tmp_path, final_path));
    }

    let written = commit(&staged)?;
    for path in &written {
        info!(path = %path.display(), "wrote table");
    }
    Ok(written)
}

/// Rename every staged file into place. Existing outputs are moved aside to
/// `.bak` first; if any rename fails, this run's files are removed, the
/// previous outputs restored and the remaining temporaries deleted.
fn commit(staged: &[(PathBuf, PathBuf)]) -> PrepResult<Vec<PathBuf>> {
    let mut committed: Vec<(PathBuf, Option<PathBuf>)> = Vec::with_capacity(staged.len());
    for (i, (tmp_path, final_path)) in staged.iter().enumerate() {
        match replace(tmp_path, final_path) {
            Ok(backup) => committed.push((final_path.clone(), backup)),
            Err(e) => {
                discard(&staged[i..]);
                roll_back(&committed);
                return Err(e);
            }
        }
    }

    for (_, backup) in &committed {
        if let Some(backup) = backup {
            let _ = fs::remove_file(backup);
        }
    }
    Ok(committed.into_iter().map(|(path, _)| path).collect())
}

/// Move `tmp_path` over `final_path`, returning the backup of the file it replaced
fn replace(tmp_path: &Path, final_path: &Path) -> PrepResult<Option<PathBuf>> {
    let backup = if final_path.is_file() {
        let backup = sibling(final_path, "bak");
        fs::rename(final_path, &backup).map_err(|e| {
            PrepError::Persistence(format!(
                "failed to move aside `{}`: {}",
                final_path.display(),
                e
            ))
        })?;
        Some(backup)
    } else {
        None
    };

    if let Err(e) = fs::rename(tmp_path, final_path) {
        if let Some(backup) = &backup {
            let _ = fs::rename(backup, final_path);
        }
        return Err(PrepError::Persistence(format!(
            "failed to rename `{}` to `{}`: {}",
            tmp_path.display(),
            final_path.display(),
            e
        )));
    }
    Ok(backup)
}

fn roll_back(committed: &[(PathBuf, Option<PathBuf>)]) {
    for (final_path, backup) in committed.iter().rev() {
        let _ = fs::remove_file(final_path);
        if let Some(backup) = backup {
            let _ = fs::rename(backup, final_path);
        }
    }
}

fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (tmp_path, _) in staged {
        let _ = fs::remove_file(tmp_path);
    }
}

/// `overall.parquet` -> `overall.parquet.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Write one batch as a single-row-group Parquet file
pub fn write_parquet(path: &Path, batch: &RecordBatch) -> PrepResult<()> {
    let file = File::create(path).map_err(|e| {
        PrepError::Persistence(format!("could not create `{}`: {}", path.display(), e))
    })?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(BufWriter::new(file), batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// "overall": attribute labels, deaths, rate, year, population type
pub fn overall_batch(records: &[MeasureRecord], columns: &[String]) -> PrepResult<RecordBatch> {
    let measures: Vec<&MeasureRecord> = records.iter().collect();
    let (fields, arrays) = measure_columns("overall", &measures, columns)?;
    batch(fields, arrays)
}

/// "specific": the overall layout plus the in-category maximum and percentage
pub fn specific_batch(records: &[SpecificRecord], columns: &[String]) -> PrepResult<RecordBatch> {
    let measures: Vec<&MeasureRecord> = records.iter().map(|r| &r.measure).collect();
    let (mut fields, mut arrays) = measure_columns("specific", &measures, columns)?;

    fields.push(Field::new(IN_CATEGORY_MAX_COLUMN, DataType::Float64, true));
    arrays.push(Arc::new(Float64Array::from(
        records.iter().map(|r| r.in_category_max).collect::<Vec<_>>(),
    )));
    fields.push(Field::new(PERCENT_COLUMN, DataType::Float64, true));
    arrays.push(Arc::new(Float64Array::from(
        records
            .iter()
            .map(|r| r.percent_of_category)
            .collect::<Vec<_>>(),
    )));

    batch(fields, arrays)
}

/// "demographic": attribute labels, rate, year
pub fn demographic_batch(
    records: &[DemographicRecord],
    columns: &[String],
) -> PrepResult<RecordBatch> {
    let attribute_count = attribute_width("demographic", columns, DEMOGRAPHIC_MEASURE_COLUMNS)?;
    let labels: Vec<&[String]> = records.iter().map(|r| r.attributes.as_slice()).collect();
    let (mut fields, mut arrays) = label_columns("demographic", &labels, &columns[..attribute_count])?;

    let names = &columns[attribute_count..];
    fields.push(Field::new(&names[0], DataType::Float64, true));
    arrays.push(Arc::new(Float64Array::from(
        records.iter().map(|r| r.rate).collect::<Vec<_>>(),
    )));
    fields.push(Field::new(&names[1], DataType::Int64, false));
    arrays.push(Arc::new(Int64Array::from(
        records.iter().map(|r| r.year).collect::<Vec<_>>(),
    )));

    batch(fields, arrays)
}

fn measure_columns(
    table: &str,
    records: &[&MeasureRecord],
    columns: &[String],
) -> PrepResult<(Vec<Field>, Vec<ArrayRef>)> {
    let attribute_count = attribute_width(table, columns, MEASURE_COLUMNS)?;
    let labels: Vec<&[String]> = records.iter().map(|r| r.attributes.as_slice()).collect();
    let (mut fields, mut arrays) = label_columns(table, &labels, &columns[..attribute_count])?;

    let names = &columns[attribute_count..];
    fields.push(Field::new(&names[0], DataType::Float64, true));
    arrays.push(Arc::new(Float64Array::from(
        records.iter().map(|r| r.deaths).collect::<Vec<_>>(),
    )));
    fields.push(Field::new(&names[1], DataType::Float64, true));
    arrays.push(Arc::new(Float64Array::from(
        records.iter().map(|r| r.rate).collect::<Vec<_>>(),
    )));
    fields.push(Field::new(&names[2], DataType::Int64, false));
    arrays.push(Arc::new(Int64Array::from(
        records.iter().map(|r| r.year).collect::<Vec<_>>(),
    )));
    fields.push(Field::new(&names[3], DataType::Utf8, false));
    arrays.push(Arc::new(StringArray::from_iter_values(
        records.iter().map(|r| r.population.label()),
    )));

    Ok((fields, arrays))
}

/// One Utf8 column per attribute position; every record must carry exactly
/// one label per attribute column
fn label_columns(
    table: &str,
    labels: &[&[String]],
    names: &[String],
) -> PrepResult<(Vec<Field>, Vec<ArrayRef>)> {
    if let Some(bad) = labels.iter().find(|l| l.len() != names.len()) {
        return Err(PrepError::mismatch(
            table,
            format!(
                "record {:?} has {} attribute labels, columns expect {}",
                bad,
                bad.len(),
                names.len()
            ),
        ));
    }

    let fields = names
        .iter()
        .map(|name| Field::new(name, DataType::Utf8, false))
        .collect();
    let arrays = (0..names.len())
        .map(|i| {
            Arc::new(StringArray::from_iter_values(
                labels.iter().map(|l| l[i].as_str()),
            )) as ArrayRef
        })
        .collect();
    Ok((fields, arrays))
}

fn attribute_width(table: &str, columns: &[String], measures: usize) -> PrepResult<usize> {
    columns.len().checked_sub(measures).ok_or_else(|| {
        PrepError::mismatch(
            table,
            format!(
                "{} column names configured, need at least {}",
                columns.len(),
                measures
            ),
        )
    })
}

fn batch(fields: Vec<Field>, arrays: Vec<ArrayRef>) -> PrepResult<RecordBatch> {
    let schema = Arc::new(Schema::new(fields));
    Ok(RecordBatch::try_new(schema, arrays)?)
}
