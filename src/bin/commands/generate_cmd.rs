use anyhow::Result;
use ipatlas::{DatasetBuilder, OverlapPolicy, SourceFormat};
use std::path::{Path, PathBuf};

use crate::cli_utils::or_fail;

pub fn cmd_generate(
    ipv4: Vec<PathBuf>,
    ipv6: Vec<PathBuf>,
    output: PathBuf,
    format: Option<String>,
    policy: String,
    verbose: bool,
) -> Result<()> {
    let policy: OverlapPolicy = or_fail(policy.parse());
    let mut builder = DatasetBuilder::with_policy(policy);

    for path in &ipv4 {
        let format = source_format(format.as_deref(), path);
        let count = or_fail(builder.add_v4_source(path, format));
        if verbose {
            eprintln!("{}: {} IPv4 records", path.display(), count);
        }
    }
    for path in &ipv6 {
        let format = source_format(format.as_deref(), path);
        let count = or_fail(builder.add_v6_source(path, format));
        if verbose {
            eprintln!("{}: {} IPv6 records", path.display(), count);
        }
    }

    let raw_v4 = builder.v4_record_count();
    let raw_v6 = builder.v6_record_count();
    let atlas = or_fail(builder.build_snapshot(&output));

    println!(
        "Wrote {}: {} IPv4 ranges (from {} records), {} IPv6 ranges (from {} records)",
        output.display(),
        atlas.v4().len(),
        raw_v4,
        atlas.v6().len(),
        raw_v6,
    );
    Ok(())
}

/// Explicit `--format` wins; otherwise sniff the file extension
fn source_format(explicit: Option<&str>, path: &Path) -> SourceFormat {
    match explicit {
        Some(value) => or_fail(value.parse()),
        None => SourceFormat::detect(path),
    }
}
