use anyhow::Result;
use ipatlas::{parse_ip, snapshot, IpFamily};
use std::path::PathBuf;

use crate::cli_utils::or_fail;

pub fn cmd_resolve(
    address: String,
    data: PathBuf,
    only_v4: bool,
    only_v6: bool,
    name: bool,
    quiet: bool,
) -> Result<()> {
    let atlas = or_fail(snapshot::load(&data));
    let addr = or_fail(parse_ip(&address));

    let pinned = if only_v4 {
        Some(IpFamily::V4)
    } else if only_v6 {
        Some(IpFamily::V6)
    } else {
        None
    };

    let resolved = match pinned {
        Some(family) => or_fail(atlas.resolve_in_family(addr, family)),
        None => atlas.resolve(addr),
    };

    match resolved {
        Some(country) => {
            if !quiet {
                match country.name().filter(|_| name) {
                    Some(country_name) => println!("{} {}", country, country_name),
                    None => println!("{}", country),
                }
            }
            Ok(())
        }
        None => {
            // Unallocated space: a clean miss, not an error
            if !quiet {
                eprintln!("{}: no matching range", address);
            }
            std::process::exit(1);
        }
    }
}
