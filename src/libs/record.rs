#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactRecord {
    pub bin1: usize,
    pub bin2: usize,
    pub counts: f64,
}

/// Dedup key used by record stores
pub fn record_key(bin1: usize, bin2: usize) -> String {
    format!("{}_{}", bin1, bin2)
}

/// Sparse upper-triangle view of a dense `trace_length x trace_length` buffer.
///
/// Records come out bin-major: all of row 0, then row 1, and so on.
///
/// ```
/// use livemap::libs::record::extract_records;
/// let buffer = vec![
///     2.0, 0.0, 1.0,
///     0.0, 0.0, 0.0,
///     1.0, 0.0, 3.0,
/// ];
/// let records = extract_records(&buffer, 3);
/// assert_eq!(records.len(), 3);
/// assert_eq!((records[1].bin1, records[1].bin2, records[1].counts), (0, 2, 1.0));
/// ```
pub fn extract_records(buffer: &[f64], trace_length: usize) -> Vec<ContactRecord> {
    let mut records = vec![];
    for bin1 in 0..trace_length {
        for bin2 in bin1..trace_length {
            let counts = buffer[bin1 * trace_length + bin2];
            if counts > 0.0 {
                records.push(ContactRecord { bin1, bin2, counts });
            }
        }
    }
    records
}
