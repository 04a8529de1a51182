//! Reading raw allocation records from source files
//!
//! Sources produce `(start, end, country)` triples for one address family.
//! Two interchange formats are supported:
//!
//! - **CSV**: `start,end,country` with `#` comment lines, the layout of
//!   tor-style geoip files. IPv4 columns may be dotted-quad or plain
//!   decimal (registries publish both); IPv6 columns are textual.
//! - **JSON**: an array of `{"start": ..., "end": ..., "country": ...}`
//!   objects.
//!
//! Files ending in `.gz` are decompressed transparently. Any failure —
//! unreadable file, malformed record, unknown country code — is fatal to
//! the caller's build: a silently incomplete dataset is worse than a
//! failed one.

use crate::addr::Address;
use crate::country::CountryCode;
use crate::error::{AtlasError, Result};
use crate::normalize::RawRecord;
use flate2::read::GzDecoder;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::Path;
use std::str::FromStr;

/// Interchange format of a record source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceFormat {
    /// `start,end,country` lines with `#` comments
    #[default]
    Csv,
    /// JSON array of `{start, end, country}` objects
    Json,
}

impl SourceFormat {
    /// Guess the format from a file extension, ignoring a trailing `.gz`
    pub fn detect<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let stem = if has_extension(path, "gz") {
            path.file_stem().map(Path::new).unwrap_or(path)
        } else {
            path
        };
        if has_extension(stem, "json") {
            SourceFormat::Json
        } else {
            SourceFormat::Csv
        }
    }
}

impl FromStr for SourceFormat {
    type Err = AtlasError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "csv" => Ok(SourceFormat::Csv),
            "json" => Ok(SourceFormat::Json),
            other => Err(AtlasError::Fetch(format!(
                "unknown source format '{}' (expected csv or json)",
                other
            ))),
        }
    }
}

/// Read IPv4 records from a source file
pub fn read_v4_records<P: AsRef<Path>>(
    path: P,
    format: SourceFormat,
) -> Result<Vec<RawRecord<Ipv4Addr>>> {
    read_records(path.as_ref(), format)
}

/// Read IPv6 records from a source file
pub fn read_v6_records<P: AsRef<Path>>(
    path: P,
    format: SourceFormat,
) -> Result<Vec<RawRecord<Ipv6Addr>>> {
    read_records(path.as_ref(), format)
}

/// An address field in a source file
///
/// Private extension over [`Address`]: textual form for both families,
/// plus the bare-integer form some registries use for IPv4.
trait FieldParse: Address {
    fn parse_field(text: &str) -> Option<Self>;
}

impl FieldParse for Ipv4Addr {
    fn parse_field(text: &str) -> Option<Self> {
        if let Ok(addr) = text.parse::<Ipv4Addr>() {
            return Some(addr);
        }
        text.parse::<u32>().ok().map(Ipv4Addr::from)
    }
}

impl FieldParse for Ipv6Addr {
    fn parse_field(text: &str) -> Option<Self> {
        if let Ok(addr) = text.parse::<Ipv6Addr>() {
            return Some(addr);
        }
        text.parse::<u128>().ok().map(Ipv6Addr::from)
    }
}

fn read_records<A: FieldParse>(path: &Path, format: SourceFormat) -> Result<Vec<RawRecord<A>>> {
    let reader = open_reader(path)?;
    match format {
        SourceFormat::Csv => read_csv(reader, path),
        SourceFormat::Json => read_json(reader, path),
    }
}

/// Open a source file, decompressing `.gz` transparently
fn open_reader(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path)
        .map_err(|e| AtlasError::Fetch(format!("failed to open {}: {}", path.display(), e)))?;

    if has_extension(path, "gz") {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(wanted))
        .unwrap_or(false)
}

fn read_csv<A: FieldParse>(reader: Box<dyn Read>, path: &Path) -> Result<Vec<RawRecord<A>>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (index, row) in csv_reader.records().enumerate() {
        let row = row.map_err(|e| {
            AtlasError::Fetch(format!("{}: read failed at record {}: {}", path.display(), index, e))
        })?;
        if row.len() != 3 {
            return Err(AtlasError::InvalidRecord(format!(
                "{}: record {} has {} fields, expected 3",
                path.display(),
                index,
                row.len()
            )));
        }
        records.push(make_record::<A>(&row[0], &row[1], &row[2], path, index)?);
    }

    Ok(records)
}

/// One entry of a JSON source file
#[derive(Debug, Clone, Deserialize)]
struct JsonEntry {
    start: String,
    end: String,
    country: String,
}

fn read_json<A: FieldParse>(reader: Box<dyn Read>, path: &Path) -> Result<Vec<RawRecord<A>>> {
    let entries: Vec<JsonEntry> = serde_json::from_reader(BufReader::new(reader))
        .map_err(|e| AtlasError::InvalidRecord(format!("{}: {}", path.display(), e)))?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            make_record::<A>(&entry.start, &entry.end, &entry.country, path, index)
        })
        .collect()
}

fn make_record<A: FieldParse>(
    start: &str,
    end: &str,
    country: &str,
    path: &Path,
    index: usize,
) -> Result<RawRecord<A>> {
    let start = A::parse_field(start).ok_or_else(|| {
        AtlasError::InvalidRecord(format!(
            "{}: record {}: bad {} start address '{}'",
            path.display(),
            index,
            A::FAMILY,
            start
        ))
    })?;
    let end = A::parse_field(end).ok_or_else(|| {
        AtlasError::InvalidRecord(format!(
            "{}: record {}: bad {} end address '{}'",
            path.display(),
            index,
            A::FAMILY,
            end
        ))
    })?;
    let country = country.parse::<CountryCode>()?;

    RawRecord::new(start, end, country)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_detect_format() {
        assert_eq!(SourceFormat::detect("geoip.csv"), SourceFormat::Csv);
        assert_eq!(SourceFormat::detect("geoip"), SourceFormat::Csv);
        assert_eq!(SourceFormat::detect("ranges.json"), SourceFormat::Json);
        assert_eq!(SourceFormat::detect("ranges.json.gz"), SourceFormat::Json);
        assert_eq!(SourceFormat::detect("geoip.csv.gz"), SourceFormat::Csv);
    }

    #[test]
    fn test_csv_dotted_quad() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# comment line").unwrap();
        writeln!(file, "10.0.0.0,10.0.0.255,US").unwrap();
        writeln!(file, "192.0.2.0,192.0.2.255,CA").unwrap();
        file.flush().unwrap();

        let records = read_v4_records(file.path(), SourceFormat::Csv).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].start(), Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(records[1].country().to_string(), "CA");
    }

    #[test]
    fn test_csv_decimal_ipv4() {
        // tor geoip files carry IPv4 addresses as plain integers
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "16777216,16777471,AU").unwrap();
        file.flush().unwrap();

        let records = read_v4_records(file.path(), SourceFormat::Csv).unwrap();
        assert_eq!(records[0].start(), Ipv4Addr::new(1, 0, 0, 0));
        assert_eq!(records[0].end(), Ipv4Addr::new(1, 0, 0, 255));
    }

    #[test]
    fn test_csv_ipv6() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "2001:db8::,2001:db8::ffff,SE").unwrap();
        file.flush().unwrap();

        let records = read_v6_records(file.path(), SourceFormat::Csv).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].country().to_string(), "SE");
    }

    #[test]
    fn test_json_source() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        write!(
            file,
            r#"[
                {{"start": "10.0.0.0", "end": "10.0.0.255", "country": "US"}},
                {{"start": "10.0.1.0", "end": "10.0.1.255", "country": "??"}}
            ]"#
        )
        .unwrap();
        file.flush().unwrap();

        let records = read_v4_records(file.path(), SourceFormat::Json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].country(), CountryCode::Unassigned);
    }

    #[test]
    fn test_gzip_source() {
        let mut file = NamedTempFile::with_suffix(".csv.gz").unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        writeln!(encoder, "10.0.0.0,10.0.0.255,US").unwrap();
        let compressed = encoder.finish().unwrap();
        file.write_all(&compressed).unwrap();
        file.flush().unwrap();

        let records = read_v4_records(file.path(), SourceFormat::Csv).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_unknown_country_is_fatal() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "10.0.0.0,10.0.0.255,US").unwrap();
        writeln!(file, "10.0.1.0,10.0.1.255,QQ").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            read_v4_records(file.path(), SourceFormat::Csv),
            Err(AtlasError::InvalidCountryCode(_))
        ));
    }

    #[test]
    fn test_inverted_range_is_fatal() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "10.0.0.255,10.0.0.0,US").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            read_v4_records(file.path(), SourceFormat::Csv),
            Err(AtlasError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_wrong_field_count_is_fatal() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "10.0.0.0,10.0.0.255").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            read_v4_records(file.path(), SourceFormat::Csv),
            Err(AtlasError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_v6_address_in_v4_source_is_fatal() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "2001:db8::,2001:db8::ffff,SE").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            read_v4_records(file.path(), SourceFormat::Csv),
            Err(AtlasError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            read_v4_records("/nonexistent/geoip.csv", SourceFormat::Csv),
            Err(AtlasError::Fetch(_))
        ));
    }
}
