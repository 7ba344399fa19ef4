//! Compressed line-delimited JSON files: one record per line, gzip by default
//! (zstd optional). Writes land in a `.inprogress` sibling and are promoted with
//! a rename, so an existing output file is always complete.

use crate::normalize::Record;
use anyhow::{bail, Context, Result};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Codec {
    #[default]
    Gzip,
    Zstd,
}

impl Codec {
    pub fn extension(&self) -> &'static str {
        match self {
            Codec::Gzip => "json.gz",
            Codec::Zstd => "json.zst",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".gz") {
            Some(Codec::Gzip)
        } else if name.ends_with(".zst") {
            Some(Codec::Zstd)
        } else {
            None
        }
    }
}

/// `<dir>/<stem>.json.gz` (or `.json.zst`).
pub fn output_path(dir: &Path, stem: &str, codec: Codec) -> PathBuf {
    dir.join(format!("{}.{}", stem, codec.extension()))
}

/// File stem with the codec extension removed (`2020-01-01_2020-01-08.json.gz` -> `2020-01-01_2020-01-08`).
pub fn record_file_stem(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let stem = name
        .strip_suffix(".json.gz")
        .or_else(|| name.strip_suffix(".json.zst"))
        .unwrap_or(name);
    Some(stem.to_string())
}

fn write_lines<W: Write>(w: &mut W, records: &[Record]) -> Result<()> {
    for rec in records {
        serde_json::to_writer(&mut *w, rec)?;
        w.write_all(b"\n")?;
    }
    Ok(())
}

/// Write `records` to `path` atomically. Returns the number of lines written.
pub fn write_records(path: &Path, records: &[Record], codec: Codec) -> Result<usize> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let tmp = inprogress_path(path);
    let file = File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
    let buf = BufWriter::with_capacity(256 * 1024, file);

    match codec {
        Codec::Gzip => {
            let mut enc = GzEncoder::new(buf, Compression::default());
            write_lines(&mut enc, records)?;
            enc.finish()?.flush()?;
        }
        Codec::Zstd => {
            let mut enc = zstd::stream::write::Encoder::new(buf, 3)?;
            write_lines(&mut enc, records)?;
            enc.finish()?.flush()?;
        }
    }

    promote(&tmp, path)?;
    Ok(records.len())
}

/// Read every record from a `.json.gz`/`.json.zst` file (empty lines skipped).
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader: Box<dyn Read> = match Codec::from_path(path) {
        Some(Codec::Gzip) => Box::new(MultiGzDecoder::new(file)),
        Some(Codec::Zstd) => Box::new(zstd::stream::read::Decoder::new(file)?),
        None => bail!("unrecognized record file extension: {}", path.display()),
    };
    let reader = BufReader::with_capacity(64 * 1024, reader);

    let mut out = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line)? {
            Value::Object(map) => out.push(map),
            _ => tracing::warn!("{}:{}: skipping non-object line", path.display(), i + 1),
        }
    }
    Ok(out)
}

fn inprogress_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".inprogress");
    path.with_file_name(name)
}

/// Rename `tmp` over `dest`, retrying briefly on transient failures and falling
/// back to copy + remove (e.g. across volumes).
fn promote(tmp: &Path, dest: &Path) -> Result<()> {
    let tries = 10u64;
    let mut last: Option<io::Error> = None;
    for i in 0..tries {
        match fs::rename(tmp, dest) {
            Ok(()) => return Ok(()),
            Err(e) => {
                last = Some(e);
                sleep(Duration::from_millis(25 * (i + 1)));
            }
        }
    }
    tracing::debug!(
        "rename {} -> {} failed ({:?}); copying instead",
        tmp.display(),
        dest.display(),
        last
    );
    fs::copy(tmp, dest).with_context(|| format!("copy {} -> {}", tmp.display(), dest.display()))?;
    fs::remove_file(tmp).with_context(|| format!("remove {}", tmp.display()))?;
    Ok(())
}
