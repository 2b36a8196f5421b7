//! Chunking
//!
//! Splits records into `dataValueSets` payloads of at most `chunk_size`
//! data values. Records without a numeric value are dropped first, so
//! chunk boundaries are computed on the filtered sequence.

use super::record::{DataValueSet, Record};

/// Partition records into ordered chunks for one data element
///
/// A `chunk_size` of zero is treated as one.
pub fn chunk_records(records: &[Record], data_element: &str, chunk_size: usize) -> Vec<DataValueSet> {
    let chunk_size = chunk_size.max(1);

    let data_values: Vec<_> = records
        .iter()
        .filter_map(|record| record.to_data_value(data_element))
        .collect();

    data_values
        .chunks(chunk_size)
        .map(|values| DataValueSet {
            data_values: values.to_vec(),
        })
        .collect()
}

/// Number of records that survive the numeric filter
pub fn count_numeric(records: &[Record]) -> usize {
    records.iter().filter(|r| r.value.is_numeric()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::IMPORT_LIMIT;

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record::new(i as f64, format!("ou{}", i), "202401"))
            .collect()
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(chunk_records(&[], "de", IMPORT_LIMIT).is_empty());
    }

    #[test]
    fn test_nan_record_dropped() {
        let input = vec![
            Record::new(10.0, "A", "2024Q1"),
            Record::new("NaN", "B", "2024Q1"),
            Record::new(5.0, "C", "2024Q1"),
        ];

        let chunks = chunk_records(&input, "de1", IMPORT_LIMIT);

        assert_eq!(chunks.len(), 1);
        let values: Vec<f64> = chunks[0].data_values.iter().map(|v| v.value).collect();
        assert_eq!(values, vec![10.0, 5.0]);
        assert_eq!(chunks[0].data_values[1].org_unit, "C");
        assert!(chunks[0].data_values.iter().all(|v| v.data_element == "de1"));
    }

    #[test]
    fn test_chunk_sizes() {
        let chunks = chunk_records(&records(1201), "de", 500);

        let sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![500, 500, 201]);
    }

    #[test]
    fn test_exact_multiple() {
        let chunks = chunk_records(&records(1000), "de", 500);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.len() == 500));
    }

    #[test]
    fn test_boundaries_computed_after_filtering() {
        // 4 numeric records interleaved with 4 non-numeric ones
        let mut input = Vec::new();
        for i in 0..4 {
            input.push(Record::new(i as f64, format!("ou{}", i), "202401"));
            input.push(Record::new("n/a", format!("bad{}", i), "202401"));
        }

        let chunks = chunk_records(&input, "de", 2);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].data_values[0].org_unit, "ou0");
        assert_eq!(chunks[0].data_values[1].org_unit, "ou1");
        assert_eq!(chunks[1].data_values[0].org_unit, "ou2");
        assert_eq!(chunks[1].data_values[1].org_unit, "ou3");
    }

    #[test]
    fn test_flattened_chunks_preserve_order() {
        let mut input = records(37);
        input[3].value = "NaN".into();
        input[20].value = crate::import::RecordValue::Missing;

        let flattened: Vec<_> = chunk_records(&input, "de", 5)
            .into_iter()
            .flat_map(|c| c.data_values)
            .collect();

        let expected: Vec<_> = input
            .iter()
            .filter_map(|r| r.to_data_value("de"))
            .collect();

        assert_eq!(flattened, expected);
        assert_eq!(flattened.len(), count_numeric(&input));
    }

    #[test]
    fn test_zero_chunk_size() {
        let chunks = chunk_records(&records(3), "de", 0);
        assert_eq!(chunks.len(), 3);
    }
}
