use anyhow::Result;
use ipatlas::{snapshot, Address, Atlas, AtlasError, CountryCode, IpFamily, Range};
use rustc_hash::FxHashMap;
use serde_json::json;
use std::path::PathBuf;

use crate::cli_utils::or_fail;

pub fn cmd_inspect(
    snapshot_path: PathBuf,
    json: bool,
    top: usize,
    country: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let atlas = or_fail(snapshot::load(&snapshot_path));

    if let Some(selector) = country {
        let code = or_fail(parse_country(&selector));
        return list_country(&atlas, code, json, limit);
    }

    let countries = country_stats(&atlas);

    // Largest address footprint first
    let mut ranked: Vec<(&CountryCode, &CountryStat)> = countries.iter().collect();
    ranked.sort_by(|a, b| b.1.addresses.cmp(&a.1.addresses).then(a.0.cmp(b.0)));
    ranked.truncate(top);

    if json {
        let entries: Vec<_> = ranked
            .iter()
            .map(|(code, stat)| {
                json!({
                    "country": code.to_string(),
                    "name": code.name(),
                    "ranges": stat.ranges,
                    // u128 coverage exceeds JSON number precision
                    "addresses": stat.addresses.to_string(),
                })
            })
            .collect();
        let report = json!({
            "path": snapshot_path.display().to_string(),
            "ipv4_ranges": atlas.v4().len(),
            "ipv6_ranges": atlas.v6().len(),
            "ipv4_coverage": atlas.v4().coverage().to_string(),
            "ipv6_coverage": atlas.v6().coverage().to_string(),
            "countries": countries.len(),
            "top_countries": entries,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Snapshot: {}", snapshot_path.display());
        println!(
            "  IPv4: {} ranges covering {} addresses",
            atlas.v4().len(),
            atlas.v4().coverage()
        );
        println!(
            "  IPv6: {} ranges covering {} addresses",
            atlas.v6().len(),
            atlas.v6().coverage()
        );
        println!("  Countries: {}", countries.len());
        if !ranked.is_empty() {
            println!("  Top countries by coverage:");
            for (code, stat) in ranked {
                match code.name() {
                    Some(name) => println!(
                        "    {} {:<30} {:>8} ranges, {} addresses",
                        code, name, stat.ranges, stat.addresses
                    ),
                    None => println!(
                        "    {} {:<30} {:>8} ranges, {} addresses",
                        code, "(unassigned)", stat.ranges, stat.addresses
                    ),
                }
            }
        }
    }
    Ok(())
}

/// A country selector is an alpha-2 code, the `??` sentinel, or an
/// English short name from the embedded table
fn parse_country(selector: &str) -> ipatlas::Result<CountryCode> {
    selector
        .parse()
        .or_else(|err| CountryCode::from_name(selector).ok_or(err))
        .map_err(|_| AtlasError::InvalidCountryCode(selector.to_string()))
}

/// One listed range, family-tagged for mixed v4/v6 output
struct RangeRow {
    family: IpFamily,
    start: String,
    end: String,
    addresses: u128,
}

fn rows_for<A: Address>(ranges: &[Range<A>], code: CountryCode, out: &mut Vec<RangeRow>) {
    for range in ranges.iter().filter(|r| r.country() == code) {
        out.push(RangeRow {
            family: A::FAMILY,
            start: range.start().to_string(),
            end: range.end().to_string(),
            addresses: range.len(),
        });
    }
}

/// List the address blocks belonging to one country
fn list_country(atlas: &Atlas, code: CountryCode, json: bool, limit: Option<usize>) -> Result<()> {
    let mut rows = Vec::new();
    rows_for(atlas.v4().ranges(), code, &mut rows);
    rows_for(atlas.v6().ranges(), code, &mut rows);

    let total_ranges = rows.len();
    let total_addresses: u128 = rows.iter().map(|row| row.addresses).sum();
    if let Some(cap) = limit {
        rows.truncate(cap);
    }

    if json {
        let entries: Vec<_> = rows
            .iter()
            .map(|row| {
                json!({
                    "family": row.family.to_string(),
                    "start": row.start,
                    "end": row.end,
                    "addresses": row.addresses.to_string(),
                })
            })
            .collect();
        let report = json!({
            "country": code.to_string(),
            "name": code.name(),
            "ranges": total_ranges,
            "addresses": total_addresses.to_string(),
            "entries": entries,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match code.name() {
            Some(name) => println!(
                "{} ({}): {} ranges, {} addresses",
                code, name, total_ranges, total_addresses
            ),
            None => println!(
                "{} (unassigned): {} ranges, {} addresses",
                code, total_ranges, total_addresses
            ),
        }
        let shown = rows.len();
        for row in rows {
            println!(
                "  {} {} - {}  ({} addresses)",
                row.family, row.start, row.end, row.addresses
            );
        }
        if shown < total_ranges {
            println!("  ... {} more (raise --limit to see them)", total_ranges - shown);
        }
    }
    Ok(())
}

#[derive(Default)]
struct CountryStat {
    ranges: usize,
    addresses: u128,
}

fn country_stats(atlas: &Atlas) -> FxHashMap<CountryCode, CountryStat> {
    let mut stats = FxHashMap::default();
    tally(atlas.v4().ranges(), &mut stats);
    tally(atlas.v6().ranges(), &mut stats);
    stats
}

fn tally<A: Address>(
    ranges: &[ipatlas::Range<A>],
    stats: &mut FxHashMap<CountryCode, CountryStat>,
) {
    for range in ranges {
        let entry = stats.entry(range.country()).or_default();
        entry.ranges += 1;
        entry.addresses += range.len();
    }
}
