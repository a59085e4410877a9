//! Moving grids to and from text files
//!
//! Grids are stored one row per line, one glyph per cell, without any
//! delimiter: `1` is a live cell and `0` is a dead cell. Any other glyph is
//! rejected instead of being silently treated as dead.

use crate::grid::{Cell, Grid};
use ndarray::ArrayView2;
use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::Path,
    str,
};
use thiserror::Error;

/// Glyph used for live cells
pub const ALIVE: char = '1';

/// Glyph used for dead cells
pub const DEAD: char = '0';

/// Result type of text I/O operations
pub type Result<T> = std::result::Result<T, Error>;

/// Load a grid from a text file
pub fn read(path: impl AsRef<Path>) -> Result<Grid> {
    let file = File::open(path)?;
    parse(BufReader::new(file))
}

/// Parse a grid from some text source
///
/// Lines may end with `\n` or `\r\n`. Empty lines at the end of the input are
/// ignored, but empty lines between two rows are an error. Bytes that are not
/// valid UTF-8 are reported as an unrecognized [`char::REPLACEMENT_CHARACTER`]
/// glyph.
pub fn parse(input: impl BufRead) -> Result<Grid> {
    let mut cells = Vec::new();
    let mut num_cols = None;
    let mut num_rows = 0;
    let mut pending_empty_line = None;
    for (idx, bytes) in input.split(b'\n').enumerate() {
        let line_number = idx + 1;
        let bytes = bytes?;
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(&bytes);
        let line = str::from_utf8(bytes).map_err(|e| {
            let valid = String::from_utf8_lossy(&bytes[..e.valid_up_to()]);
            Error::UnrecognizedGlyph {
                line: line_number,
                column: valid.chars().count() + 1,
                glyph: char::REPLACEMENT_CHARACTER,
            }
        })?;

        // Empty lines are only fine if no row comes after them
        if line.is_empty() {
            pending_empty_line.get_or_insert(line_number);
            continue;
        }
        if let Some(empty_line) = pending_empty_line {
            return Err(Error::RaggedRow {
                line: empty_line,
                expected: num_cols.unwrap_or_else(|| line.chars().count()),
                found: 0,
            });
        }

        // Decode the row
        let row_start = cells.len();
        for (col, glyph) in line.chars().enumerate() {
            cells.push(match glyph {
                ALIVE => Cell::Alive,
                DEAD => Cell::Dead,
                _ => {
                    return Err(Error::UnrecognizedGlyph {
                        line: line_number,
                        column: col + 1,
                        glyph,
                    })
                }
            });
        }

        // Make sure that the grid is rectangular
        let row_len = cells.len() - row_start;
        let expected = *num_cols.get_or_insert(row_len);
        if row_len != expected {
            return Err(Error::RaggedRow {
                line: line_number,
                expected,
                found: row_len,
            });
        }
        num_rows += 1;
    }
    let shape = (num_rows, num_cols.unwrap_or(0));
    Ok(Grid::from_shape_vec(shape, cells).expect("cell count should match shape"))
}

/// Format a grid as text, with a trailing newline after each row
pub fn format(grid: ArrayView2<Cell>) -> String {
    let mut output = String::with_capacity(grid.nrows() * (grid.ncols() + 1));
    for row in grid.rows() {
        output.extend(row.iter().map(|&cell| glyph(cell)));
        output.push('\n');
    }
    output
}

/// Save a grid to a text file, truncating any previous file contents
pub fn write(path: impl AsRef<Path>, grid: ArrayView2<Cell>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(format(grid).as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Glyph associated with a cell state
fn glyph(cell: Cell) -> char {
    match cell {
        Cell::Alive => ALIVE,
        Cell::Dead => DEAD,
    }
}

/// Things that can go wrong when loading or saving grids
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to access the underlying file
    #[error("failed to access grid file")]
    Io(#[from] io::Error),

    /// Encountered a character that is neither [`ALIVE`] nor [`DEAD`]
    #[error("malformed grid: unrecognized glyph {glyph:?} at line {line}, column {column}")]
    UnrecognizedGlyph {
        /// 1-based line number
        line: usize,

        /// 1-based column number, in characters
        column: usize,

        /// Offending character
        glyph: char,
    },

    /// Row length does not match that of the first row
    #[error("malformed grid: line {line} has {found} cells, expected {expected}")]
    RaggedRow {
        /// 1-based line number
        line: usize,

        /// Length of the first row
        expected: usize,

        /// Length of this row
        found: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid;

    #[test]
    fn parse_and_format() {
        let text = "00100\n01010\n00000\n";
        let grid = parse(text.as_bytes()).unwrap();
        assert_eq!(grid, grid::with_alive([3, 5], [[0, 2], [1, 1], [1, 3]]));
        assert_eq!(format(grid.view()), text);
    }

    #[test]
    fn line_endings() {
        let grid = parse("10\r\n01\r\n\r\n\n".as_bytes()).unwrap();
        assert_eq!(grid, grid::with_alive([2, 2], [[0, 0], [1, 1]]));

        let no_final_newline = parse("10\n01".as_bytes()).unwrap();
        assert_eq!(no_final_newline, grid);
    }

    #[test]
    fn empty_input() {
        let grid = parse("".as_bytes()).unwrap();
        assert_eq!(grid.shape(), &[0, 0]);
        assert_eq!(format(grid.view()), "");
    }

    #[test]
    fn unrecognized_glyph() {
        let result = parse("000\n0.0\n".as_bytes());
        assert!(matches!(
            result,
            Err(Error::UnrecognizedGlyph {
                line: 2,
                column: 2,
                glyph: '.'
            })
        ));
    }

    #[test]
    fn invalid_utf8() {
        let result = parse(&b"010\n0\xff0\n"[..]);
        assert!(matches!(
            result,
            Err(Error::UnrecognizedGlyph {
                line: 2,
                column: 2,
                glyph: char::REPLACEMENT_CHARACTER
            })
        ));

        // Column counts characters, not bytes
        let result = parse(&b"01\n\xc3\xa9\xc0\n"[..]);
        assert!(matches!(
            result,
            Err(Error::UnrecognizedGlyph {
                line: 2,
                column: 2,
                glyph: char::REPLACEMENT_CHARACTER
            })
        ));
    }

    #[test]
    fn ragged_rows() {
        let result = parse("000\n00\n".as_bytes());
        assert!(matches!(
            result,
            Err(Error::RaggedRow {
                line: 2,
                expected: 3,
                found: 2
            })
        ));

        let interior_blank = parse("000\n\n000\n".as_bytes());
        assert!(matches!(
            interior_blank,
            Err(Error::RaggedRow {
                line: 2,
                expected: 3,
                found: 0
            })
        ));
    }

    #[test]
    fn file_round_trip() {
        let path = std::env::temp_dir().join(format!("life-text-{}.txt", std::process::id()));
        let grid = grid::with_alive([4, 3], [[0, 1], [3, 2]]);
        write(&path, grid.view()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "010\n000\n000\n001\n");
        assert_eq!(read(&path).unwrap(), grid);
        std::fs::remove_file(path).unwrap();
    }
}
