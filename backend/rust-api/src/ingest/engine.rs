use super::table::{FileFormat, Table};
use super::validator::{validate_row, Record, Schema};
use crate::error::IngestError;
use crate::metrics::ROWS_INGESTED_TOTAL;
use crate::models::ingestion::{IngestionOutcome, RejectedRow};

/// Accepted records of an upload together with its diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested {
    pub records: Vec<Record>,
    pub outcome: IngestionOutcome,
}

/// Decodes `bytes` according to the suffix of `file_name` and ingests the
/// rows. An unknown suffix fails before anything is decoded.
pub fn ingest_upload(
    file_name: &str,
    bytes: &[u8],
    schema: Schema,
) -> Result<Ingested, IngestError> {
    let format = FileFormat::from_file_name(file_name)?;
    let table = Table::decode(format, bytes)?;
    tracing::debug!(
        file_name,
        schema = schema.label(),
        rows = table.rows.len(),
        "Decoded upload"
    );
    ingest(&table, schema)
}

/// Validates every row of `table` in file order. A bad row is recorded and
/// skipped; it never stops the rows after it.
pub fn ingest(table: &Table, schema: Schema) -> Result<Ingested, IngestError> {
    schema.check_columns(&table.columns)?;

    let mut records = Vec::with_capacity(table.rows.len());
    let mut rejected = Vec::new();

    for row in &table.rows {
        match validate_row(schema, row) {
            Ok(record) => records.push(record),
            Err(rejection) => {
                tracing::debug!(
                    row_index = row.index,
                    error_type = %rejection.kind,
                    "Skipping row: {}",
                    rejection.message
                );
                rejected.push(RejectedRow {
                    row_index: row.index,
                    excerpt: schema.excerpt(row),
                    error_type: rejection.kind,
                    error_message: rejection.message,
                });
            }
        }
    }

    ROWS_INGESTED_TOTAL
        .with_label_values(&[schema.label(), "accepted"])
        .inc_by(records.len() as u64);
    ROWS_INGESTED_TOTAL
        .with_label_values(&[schema.label(), "rejected"])
        .inc_by(rejected.len() as u64);

    if records.is_empty() {
        return Err(IngestError::NoValidRows(rejected));
    }

    Ok(Ingested {
        outcome: IngestionOutcome {
            accepted_count: records.len(),
            rejected,
        },
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ingestion::RowErrorKind;

    const MCQ_HEADER: &str = "Question,Option1,Option2,Option3,Option4,CorrectAnswer\n";

    fn mcq_csv(rows: &[&str]) -> Vec<u8> {
        let mut csv = MCQ_HEADER.to_string();
        for row in rows {
            csv.push_str(row);
            csv.push('\n');
        }
        csv.into_bytes()
    }

    #[test]
    fn five_row_upload_partitions_rows() {
        let bytes = mcq_csv(&[
            "Capital of France?,Paris,Rome,Berlin,Madrid,0",
            "2 + 2?,3,4,5,6,1",
            "Largest planet?,Mars,Venus,Jupiter,Earth,2",
            "Smallest prime?,2,3,5,7,5",
            ",a,b,c,d,1",
        ]);
        let ingested = ingest_upload("quiz.csv", &bytes, Schema::Mcq).unwrap();

        assert_eq!(ingested.outcome.accepted_count, 3);
        assert_eq!(ingested.records.len(), 3);
        let rejected = &ingested.outcome.rejected;
        assert_eq!(rejected.len(), 2);
        assert_eq!(rejected[0].row_index, 3);
        assert_eq!(rejected[0].error_type, RowErrorKind::OutOfRange);
        assert_eq!(rejected[0].excerpt, "Smallest prime?");
        assert_eq!(rejected[1].row_index, 4);
        assert_eq!(rejected[1].error_type, RowErrorKind::EmptyField);
        assert_eq!(rejected[1].excerpt, "N/A");
    }

    #[test]
    fn missing_column_fails_the_whole_batch() {
        let csv = "Question,Option1,Option2,Option3,Option4\nq,a,b,c,d\n";
        let err = ingest_upload("quiz.csv", csv.as_bytes(), Schema::Mcq).unwrap_err();
        match err {
            IngestError::MissingColumns(missing) => assert_eq!(missing, vec!["CorrectAnswer"]),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn no_accepted_rows_is_an_error_carrying_diagnostics() {
        let bytes = mcq_csv(&["q,a,b,c,d,9", "q2,a,b,c,d,x"]);
        let err = ingest_upload("quiz.csv", &bytes, Schema::Mcq).unwrap_err();
        match err {
            IngestError::NoValidRows(rejected) => {
                assert_eq!(rejected.len(), 2);
                assert_eq!(rejected[1].error_type, RowErrorKind::InvalidFormat);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn header_only_file_has_no_valid_rows() {
        let err = ingest_upload("quiz.csv", MCQ_HEADER.as_bytes(), Schema::Mcq).unwrap_err();
        assert!(matches!(err, IngestError::NoValidRows(rows) if rows.is_empty()));
    }

    #[test]
    fn unsupported_suffix_fails_before_decoding() {
        let err = ingest_upload("quiz.txt", b"\xff not even text", Schema::Mcq).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat(name) if name == "quiz.txt"));
    }

    #[test]
    fn ingestion_is_idempotent() {
        let bytes = mcq_csv(&["q,a,b,c,d,1", "q2,a,b,c,d,7"]);
        let first = ingest_upload("quiz.csv", &bytes, Schema::Mcq).unwrap();
        let second = ingest_upload("quiz.csv", &bytes, Schema::Mcq).unwrap();
        assert_eq!(first, second);
    }
}
