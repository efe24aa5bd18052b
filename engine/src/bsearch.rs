//! Random-access lookups over delimited files, such as Unix
//! newline-delimited records. Nothing here loads a file into memory; every
//! operation works through positional reads of fixed-size chunks.

use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;

use thiserror::Error;

/// A positional reader. Reads return bytes at an explicit offset without
/// moving any cursor, so concurrent lookups can share one handle.
pub trait ReadAt {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;
}

impl ReadAt for File {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        FileExt::read_at(self, buf, offset)
    }
}

/// In-memory reader, mainly for tests.
impl ReadAt for [u8] {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let offset = offset.min(self.len() as u64) as usize;
        let n = buf.len().min(self.len() - offset);
        buf[..n].copy_from_slice(&self[offset..offset + n]);
        Ok(n)
    }
}

/// One record of a delimited file: the byte range `[start, end)` and its
/// payload, including the trailing delimiter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub start: u64,
    pub end: u64,
    pub data: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum Error {
    /// The scan ran off the end of the file before finding a delimiter.
    /// Carries the bytes gathered so far. Callers that walk a file
    /// sequentially treat this as "no more records".
    #[error("unexpected end of file at offset {}", .0.end)]
    UnexpectedEof(Record),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Configures read operations.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// The amount of data fetched by each positional read.
    pub chunk_size: usize,
    /// The record delimiter, typically `\n`.
    pub delimiter: u8,
}

/// Reads the record containing `pos`. If `pos` lands on a delimiter, the
/// record starting right after it is returned.
///
/// A single chunk centered on `pos` is fetched first; the scans below
/// extend it with further chunks only when a record straddles the chunk
/// boundary.
pub fn read<R: ReadAt + ?Sized>(cfg: &Config, r: &R, pos: u64) -> Result<Record, Error> {
    let start = pos.saturating_sub(cfg.chunk_size as u64 / 2);
    let pos_in_cur = (pos - start) as usize;

    let mut first = vec![0u8; cfg.chunk_size];
    let n = read_full(r, &mut first, start)?;
    first.truncate(n);
    if first.is_empty() {
        return Err(Error::UnexpectedEof(Record::default()));
    }

    let head = scan_back(cfg, r, first[..pos_in_cur].to_vec(), pos)?;
    let (tail, hit_eof) = scan_forward(cfg, r, first[pos_in_cur..].to_vec(), pos)?;

    let mut data = head;
    let start = pos - data.len() as u64;
    let end = pos + tail.len() as u64;
    data.extend_from_slice(&tail);

    let rec = Record { start, end, data };
    if hit_eof {
        return Err(Error::UnexpectedEof(rec));
    }
    Ok(rec)
}

/// Fills `buf` from successive positional reads; stops early only at end
/// of file. Returns the number of bytes placed in `buf`.
fn read_full<R: ReadAt + ?Sized>(r: &R, buf: &mut [u8], mut off: u64) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = r.read_at(&mut buf[filled..], off)?;
        if n == 0 {
            break;
        }
        filled += n;
        off += n as u64;
    }
    Ok(filled)
}

/// Extends `buf` (the bytes from `pos` onward) until it contains a
/// delimiter, then truncates just past it. The boolean is true when the
/// file ended first.
fn scan_forward<R: ReadAt + ?Sized>(
    cfg: &Config,
    r: &R,
    mut buf: Vec<u8>,
    pos: u64,
) -> Result<(Vec<u8>, bool), Error> {
    let mut scanned = 0;
    loop {
        if let Some(i) = buf[scanned..].iter().position(|&b| b == cfg.delimiter) {
            buf.truncate(scanned + i + 1);
            return Ok((buf, false));
        }
        scanned = buf.len();

        let mut chunk = vec![0u8; cfg.chunk_size];
        let n = read_full(r, &mut chunk, pos + scanned as u64)?;
        if n == 0 {
            return Ok((buf, true));
        }
        chunk.truncate(n);
        buf.extend_from_slice(&chunk);
    }
}

/// Extends `buf` (the bytes ending at `pos`) backwards until a delimiter
/// is found or the start of the file is reached, then drops everything
/// through the delimiter.
fn scan_back<R: ReadAt + ?Sized>(
    cfg: &Config,
    r: &R,
    mut buf: Vec<u8>,
    pos: u64,
) -> Result<Vec<u8>, Error> {
    let mut unscanned = buf.len();
    loop {
        if let Some(i) = buf[..unscanned].iter().rposition(|&b| b == cfg.delimiter) {
            buf.drain(..=i);
            return Ok(buf);
        }

        let end = pos - buf.len() as u64;
        if end == 0 {
            return Ok(buf);
        }
        let size = (cfg.chunk_size as u64).min(end) as usize;
        let mut chunk = vec![0u8; size];
        let n = read_full(r, &mut chunk, end - size as u64)?;
        if n < size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "short positional read inside file",
            )
            .into());
        }
        unscanned = chunk.len();
        chunk.extend_from_slice(&buf);
        buf = chunk;
    }
}

/// Returns the last record strictly less than `value` under `less`,
/// bisecting byte offsets in `[0, end)`. `None` means no record compares
/// less. The first not-less record, when one exists, starts at the
/// returned record's `end` (offset 0 for `None`); sequential callers
/// resume there.
///
/// `less` receives the full record bytes, trailing delimiter included.
pub fn lower_bound<R, F>(
    cfg: &Config,
    r: &R,
    mut end: u64,
    value: &[u8],
    less: F,
) -> Result<Option<Record>, Error>
where
    R: ReadAt + ?Sized,
    F: Fn(&[u8], &[u8]) -> bool,
{
    let mut start = 0u64;
    let mut last = None;
    loop {
        let pos = start + (end - start) / 2;
        let rec = read(cfg, r, pos)?;
        if less(&rec.data, value) {
            start = rec.end;
            last = Some(rec);
        } else {
            end = rec.start;
        }
        if start == end {
            return Ok(last);
        }
    }
}

/// Returns the first record strictly greater than `value` under `less`,
/// or `None` when no record compares greater.
pub fn upper_bound<R, F>(
    cfg: &Config,
    r: &R,
    mut end: u64,
    value: &[u8],
    less: F,
) -> Result<Option<Record>, Error>
where
    R: ReadAt + ?Sized,
    F: Fn(&[u8], &[u8]) -> bool,
{
    let mut start = 0u64;
    let mut first = None;
    loop {
        let pos = start + (end - start) / 2;
        let rec = read(cfg, r, pos)?;
        if less(value, &rec.data) {
            end = rec.start;
            first = Some(rec);
        } else {
            start = rec.end;
        }
        if start == end {
            return Ok(first);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CFG: Config = Config {
        chunk_size: 4,
        delimiter: b'.',
    };

    fn rec(start: u64, end: u64, data: &str) -> Record {
        Record {
            start,
            end,
            data: data.as_bytes().to_vec(),
        }
    }

    #[test]
    fn read_records() {
        let cases: &[(&str, &str, u64, Record)] = &[
            ("minimal file with just a delimiter", ".", 0, rec(0, 1, ".")),
            ("two records", "..", 1, rec(1, 2, ".")),
            ("three records", "...", 2, rec(2, 3, ".")),
            ("four records", "....", 3, rec(3, 4, ".")),
            (
                "a long record, reading a long tail",
                "a.01234567890.abcdef",
                3,
                rec(2, 14, "01234567890."),
            ),
            (
                "a long record, reading a long head",
                "a.01234567890.abcdef",
                11,
                rec(2, 14, "01234567890."),
            ),
            (
                "a long record, reading both a long head and tail",
                "abc.012345678901234567890.abc.",
                10,
                rec(4, 26, "012345678901234567890."),
            ),
        ];
        for (desc, data, pos, want) in cases {
            let got = read(&CFG, data.as_bytes(), *pos).unwrap_or_else(|e| panic!("{desc}: {e}"));
            assert_eq!(&got, want, "{desc}");
        }
    }

    #[test]
    fn read_empty_file_is_eof() {
        match read(&CFG, &[] as &[u8], 0) {
            Err(Error::UnexpectedEof(partial)) => assert!(partial.data.is_empty()),
            other => panic!("want UnexpectedEof, got {other:?}"),
        }
    }

    #[test]
    fn read_without_trailing_delimiter_keeps_partial_bytes() {
        match read(&CFG, b"aa.bbb" as &[u8], 4) {
            Err(Error::UnexpectedEof(partial)) => assert_eq!(partial, rec(3, 6, "bbb")),
            other => panic!("want UnexpectedEof, got {other:?}"),
        }
    }

    const SORTED: &str = "01.02.03.04.05.06.07.08.09.10.";

    fn byte_less(l: &[u8], r: &[u8]) -> bool {
        l < r
    }

    #[test]
    fn lower_bound_finds_last_less() {
        let cases: &[(&str, &str, Option<Record>)] = &[
            ("longer example", "02x.", Some(rec(3, 6, "02."))),
            ("finds the first less than the request", "04.", Some(rec(6, 9, "03."))),
            ("no result", "01.", None),
            ("find last", "10x.", Some(rec(27, 30, "10."))),
        ];
        for (desc, req, want) in cases {
            let got = lower_bound(
                &CFG,
                SORTED.as_bytes(),
                SORTED.len() as u64,
                req.as_bytes(),
                byte_less,
            )
            .unwrap_or_else(|e| panic!("{desc}: {e}"));
            assert_eq!(&got, want, "{desc}");
        }
    }

    #[test]
    fn lower_bound_empty_input_is_eof() {
        let got = lower_bound(&CFG, &[] as &[u8], 0, b"x", byte_less);
        assert!(matches!(got, Err(Error::UnexpectedEof(_))));
    }

    #[test]
    fn upper_bound_finds_first_greater() {
        let cases: &[(&str, &str, Option<Record>)] = &[
            ("longer example", "02x.", Some(rec(6, 9, "03."))),
            ("finds the first greater than the request", "04.", Some(rec(12, 15, "05."))),
            ("match first entry", "", Some(rec(0, 3, "01."))),
            ("match last entry (none greater)", "10.", None),
        ];
        for (desc, req, want) in cases {
            let got = upper_bound(
                &CFG,
                SORTED.as_bytes(),
                SORTED.len() as u64,
                req.as_bytes(),
                byte_less,
            )
            .unwrap_or_else(|e| panic!("{desc}: {e}"));
            assert_eq!(&got, want, "{desc}");
        }
    }

    #[test]
    fn upper_bound_empty_input_is_eof() {
        let got = upper_bound(&CFG, &[] as &[u8], 0, b"x", byte_less);
        assert!(matches!(got, Err(Error::UnexpectedEof(_))));
    }

    #[test]
    fn read_covers_every_offset() {
        let data = b"ab.c.defgh..i." as &[u8];
        for pos in 0..data.len() as u64 {
            let r = read(&CFG, data, pos).unwrap();
            assert!(r.start <= pos && pos < r.end, "pos {pos}: {r:?}");
            assert_eq!(&data[r.start as usize..r.end as usize], &r.data[..], "pos {pos}");
        }
    }
}
