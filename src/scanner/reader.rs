use memchr::{memchr, memchr2};
use std::sync::Arc;

use crate::scanner::{
    Result, ScanError,
    block::Block,
    column::{Batch, BatchKey, ColumnType, ColumnVector, Schema},
};

/// Decodes the rows of one [`Block`] at a time into typed batches
///
/// Fields are separated by `,` and rows by `\n`; no quoting or escaping.
#[derive(Debug)]
pub struct RowParser {
    reader_index: u64,
    schema: Arc<Schema>,
    block: Block,
    position: usize,
    batches_cut: u64,
}

enum Field {
    Complete(usize),
    EndOfBlock,
}

impl RowParser {
    pub fn new(reader_index: u64, schema: Arc<Schema>, block: Block) -> Self {
        RowParser {
            reader_index,
            schema,
            block,
            position: 0,
            batches_cut: 0,
        }
    }

    pub fn reader_index(&self) -> u64 {
        self.reader_index
    }

    /// Swaps in the next block, releasing the old one.
    pub fn update_block(&mut self, block: Block) {
        self.block = block;
        self.position = 0;
        self.batches_cut = 0;
    }

    /// True once every valid byte of the current block has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.position >= self.block.len()
    }

    /// Starts an empty batch stamped with this reader's identity and the
    /// current block's position in file order.
    pub fn new_batch(&mut self, capacity: usize) -> Batch {
        let mut batch = Batch::new(&self.schema, capacity);
        batch.set_origin(
            self.reader_index,
            BatchKey {
                block_index: self.block.index(),
                sequence: self.batches_cut,
            },
        );
        self.batches_cut += 1;
        batch
    }

    /// Appends up to `max_rows` complete rows from the current block to `batch`.
    ///
    /// Returns the number of rows added. Stops early when the block runs out; a
    /// row is either emitted whole or not at all.
    ///
    /// # Errors
    /// - [`ScanError::Parse`] if a numeric field is malformed or a text field
    ///   is not valid UTF-8
    /// - [`ScanError::FieldCount`] if a row ends before its last column
    pub fn fill(&mut self, batch: &mut Batch, max_rows: usize) -> Result<usize> {
        let data = self.block.data();
        let columns = self.schema.columns();
        let last_col = columns.len() - 1;
        let mut added = 0;

        while added < max_rows && self.position < data.len() {
            let row_start = self.position;
            let mut pos = row_start;

            for (col_idx, column) in columns.iter().enumerate() {
                let len = match Self::find_field(&data[pos..], col_idx == last_col) {
                    Field::Complete(len) => len,
                    Field::EndOfBlock => {
                        // Blocks end on a newline, so this means a truncated final row
                        tracing::warn!(
                            reader = self.reader_index,
                            offset = self.block.offset() + row_start as u64,
                            column = col_idx,
                            "Abandoning incomplete row at end of block"
                        );
                        batch.rollback_partial_row();
                        self.position = data.len();
                        return Ok(added);
                    }
                };

                let field = &data[pos..pos + len];
                let terminator = data.get(pos + len).copied();
                if col_idx < last_col && terminator == Some(b'\n') {
                    batch.rollback_partial_row();
                    return Err(ScanError::FieldCount {
                        offset: self.block.offset() + row_start as u64,
                        expected: columns.len(),
                        found: col_idx + 1,
                    });
                }

                let offset = self.block.offset() + pos as u64;
                if let Err(e) = decode_field(
                    field,
                    &mut batch.columns_mut()[col_idx],
                    &column.name,
                    column.column_type,
                    offset,
                ) {
                    batch.rollback_partial_row();
                    return Err(e);
                }

                pos += len + 1;
            }

            self.position = pos;
            batch.commit_row();
            added += 1;
        }

        Ok(added)
    }

    /// Locates the end of the field at the start of `rest`.
    ///
    /// Inner columns end at `,` (or at a premature `\n`, reported by the
    /// caller); the last column ends at `\n`, or at the end of the block when
    /// the file has no trailing newline.
    fn find_field(rest: &[u8], last: bool) -> Field {
        if rest.is_empty() {
            return Field::EndOfBlock;
        }
        let found = if last {
            memchr(b'\n', rest)
        } else {
            memchr2(b',', b'\n', rest)
        };
        match found {
            Some(len) => Field::Complete(len),
            None if last => Field::Complete(rest.len()),
            None => Field::EndOfBlock,
        }
    }
}

fn decode_field(
    field: &[u8],
    out: &mut ColumnVector,
    column: &str,
    column_type: ColumnType,
    offset: u64,
) -> Result<()> {
    let malformed = || ScanError::Parse {
        offset,
        column: column.to_string(),
        column_type,
        value: String::from_utf8_lossy(field).into_owned(),
    };

    match out {
        ColumnVector::Text(values) => {
            let text = std::str::from_utf8(field).map_err(|_| malformed())?;
            values.push(text.to_owned())
        }
        ColumnVector::Int64(values) => values.push(parse_int(field).ok_or_else(malformed)?),
        ColumnVector::Float64(values) => {
            values.push(fast_float::parse::<f64, _>(field).map_err(|_| malformed())?)
        }
    }
    Ok(())
}

/// Base-10 signed integer with at most one leading sign, `+` or `-`.
fn parse_int(field: &[u8]) -> Option<i64> {
    let digits = match field {
        [b'+', rest @ ..] if !rest.starts_with(b"-") => rest,
        _ => field,
    };
    atoi_simd::parse::<i64>(digits).ok()
}
