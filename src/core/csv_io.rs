//! CSV encoding of the tables passed between stages.

use crate::domain::model::{
    Dataset, FeatureRecord, FeatureTable, Label, LabeledTable, FILENAME_COLUMN, LABEL_COLUMN,
};
use crate::utils::error::{PipelineError, Result};
use csv::{ReaderBuilder, StringRecord, Writer};

fn finish(writer: Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| PipelineError::IoError(e.into_error()))
}

fn parse_value(raw: &str, column: &str, row: usize) -> Result<f64> {
    raw.trim().parse::<f64>().map_err(|_| {
        PipelineError::validation(format!(
            "row {}: column '{}' has non-numeric value '{}'",
            row + 1,
            column,
            raw
        ))
    })
}

fn parse_label(raw: &str, row: usize) -> Result<Label> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(Label::from_i64)
        .ok_or_else(|| {
            PipelineError::validation(format!("row {}: invalid label '{}'", row + 1, raw))
        })
}

fn headers_of(data: &[u8]) -> Result<(csv::Reader<&[u8]>, StringRecord)> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(data);
    let headers = reader.headers()?.clone();
    Ok((reader, headers))
}

pub fn write_feature_table(table: &FeatureTable) -> Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    let mut header = vec![FILENAME_COLUMN.to_string()];
    header.extend(table.feature_names.iter().cloned());
    writer.write_record(&header)?;

    for record in &table.records {
        let mut row = vec![record.filename.clone()];
        row.extend(record.values.iter().map(|v| v.to_string()));
        writer.write_record(&row)?;
    }
    finish(writer)
}

pub fn write_labeled_table(labeled: &LabeledTable) -> Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    let mut header = vec![FILENAME_COLUMN.to_string()];
    header.extend(labeled.table.feature_names.iter().cloned());
    header.push(LABEL_COLUMN.to_string());
    writer.write_record(&header)?;

    for (record, label) in labeled.table.records.iter().zip(&labeled.labels) {
        let mut row = vec![record.filename.clone()];
        row.extend(record.values.iter().map(|v| v.to_string()));
        row.push(label.as_i64().to_string());
        writer.write_record(&row)?;
    }
    finish(writer)
}

/// Reads a table with a `filename` column; an optional `label` column is returned separately.
fn read_table(data: &[u8]) -> Result<(FeatureTable, Option<Vec<Label>>)> {
    let (mut reader, headers) = headers_of(data)?;

    let filename_idx = headers
        .iter()
        .position(|h| h == FILENAME_COLUMN)
        .ok_or_else(|| PipelineError::validation("CSV has no 'filename' column"))?;
    let label_idx = headers.iter().position(|h| h == LABEL_COLUMN);

    let feature_idx: Vec<usize> = (0..headers.len())
        .filter(|&i| i != filename_idx && Some(i) != label_idx)
        .collect();
    let feature_names: Vec<String> = feature_idx.iter().map(|&i| headers[i].to_string()).collect();

    let mut table = FeatureTable::new(feature_names);
    let mut labels = label_idx.map(|_| Vec::new());

    for (row, result) in reader.records().enumerate() {
        let record = result?;
        let values = feature_idx
            .iter()
            .map(|&i| parse_value(&record[i], &headers[i], row))
            .collect::<Result<Vec<f64>>>()?;
        table.records.push(FeatureRecord {
            filename: record[filename_idx].to_string(),
            values,
        });
        if let (Some(idx), Some(labels)) = (label_idx, labels.as_mut()) {
            labels.push(parse_label(&record[idx], row)?);
        }
    }

    Ok((table, labels))
}

pub fn read_feature_table(data: &[u8]) -> Result<FeatureTable> {
    let (table, _) = read_table(data)?;
    Ok(table)
}

pub fn read_labeled_table(data: &[u8]) -> Result<LabeledTable> {
    let (table, labels) = read_table(data)?;
    let labels = labels.ok_or_else(|| PipelineError::validation("CSV has no 'label' column"))?;
    Ok(LabeledTable { table, labels })
}

/// Writes a purely numeric matrix with its headers.
pub fn write_matrix(feature_names: &[String], rows: &[Vec<f64>]) -> Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(feature_names)?;
    for row in rows {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    finish(writer)
}

pub fn read_matrix(data: &[u8]) -> Result<(Vec<String>, Vec<Vec<f64>>)> {
    let (mut reader, headers) = headers_of(data)?;
    let names: Vec<String> = headers.iter().map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        let values = record
            .iter()
            .zip(&names)
            .map(|(raw, name)| parse_value(raw, name, row))
            .collect::<Result<Vec<f64>>>()?;
        rows.push(values);
    }
    Ok((names, rows))
}

pub fn write_labels(labels: &[Label]) -> Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record([LABEL_COLUMN])?;
    for label in labels {
        writer.write_record([label.as_i64().to_string()])?;
    }
    finish(writer)
}

pub fn read_labels(data: &[u8]) -> Result<Vec<Label>> {
    let (mut reader, headers) = headers_of(data)?;
    let idx = headers
        .iter()
        .position(|h| h == LABEL_COLUMN)
        .ok_or_else(|| PipelineError::validation("CSV has no 'label' column"))?;

    reader
        .records()
        .enumerate()
        .map(|(row, result)| {
            let record = result?;
            parse_label(&record[idx], row)
        })
        .collect()
}

/// Joins `processed_X` and `processed_y` into a dataset; row counts must match.
pub fn read_dataset(x_data: &[u8], y_data: &[u8]) -> Result<Dataset> {
    let (feature_names, rows) = read_matrix(x_data)?;
    let labels = read_labels(y_data)?;
    if rows.len() != labels.len() {
        return Err(PipelineError::validation(format!(
            "X has {} rows but y has {}",
            rows.len(),
            labels.len()
        )));
    }
    Ok(Dataset {
        feature_names,
        rows,
        labels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> FeatureTable {
        FeatureTable {
            feature_names: vec!["mean_pitch_hz".to_string(), "jitter_local".to_string()],
            records: vec![
                FeatureRecord {
                    filename: "03-01-05-01-01-01-01.wav".to_string(),
                    values: vec![212.5, 0.0123],
                },
                FeatureRecord {
                    filename: "03-01-01-01-01-01-01.wav".to_string(),
                    values: vec![180.0, 0.0],
                },
            ],
        }
    }

    #[test]
    fn test_feature_table_layout() {
        let bytes = write_feature_table(&sample_table()).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();

        assert!(text.starts_with("filename,mean_pitch_hz,jitter_local\n"));
        assert!(text.contains("03-01-05-01-01-01-01.wav,212.5,0.0123\n"));
        assert_eq!(read_feature_table(&bytes).unwrap(), sample_table());
    }

    #[test]
    fn test_labeled_table_appends_label_column() {
        let labeled = LabeledTable {
            table: sample_table(),
            labels: vec![Label::Stressed, Label::Neutral],
        };
        let bytes = write_labeled_table(&labeled).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();

        assert!(text.starts_with("filename,mean_pitch_hz,jitter_local,label\n"));
        assert!(text.contains(",0.0123,1\n"));
        assert_eq!(read_labeled_table(&bytes).unwrap(), labeled);
        // 無 label 欄位時視為一般特徵表
        assert!(read_labeled_table(&write_feature_table(&sample_table()).unwrap()).is_err());
    }

    #[test]
    fn test_non_numeric_value_is_rejected() {
        let data = b"filename,a\nx.wav,abc\n";
        let err = read_feature_table(data).unwrap_err();
        assert!(err.to_string().contains("non-numeric"));
    }

    #[test]
    fn test_dataset_row_mismatch() {
        let x = write_matrix(&["a".to_string()], &[vec![1.0], vec![2.0]]).unwrap();
        let y = write_labels(&[Label::Neutral]).unwrap();
        assert!(read_dataset(&x, &y).is_err());

        let y = write_labels(&[Label::Neutral, Label::Stressed]).unwrap();
        let dataset = read_dataset(&x, &y).unwrap();
        assert_eq!(dataset.feature_names, vec!["a"]);
        assert_eq!(dataset.labels, vec![Label::Neutral, Label::Stressed]);
    }

    #[test]
    fn test_invalid_label_value() {
        assert!(read_labels(b"label\n2\n").is_err());
        assert_eq!(read_labels(b"label\n1\n0\n").unwrap(), vec![Label::Stressed, Label::Neutral]);
    }
}
