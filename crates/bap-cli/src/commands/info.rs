use anyhow::Result;
use bap_core::catalog::{SensorDescriptor, SensorId};
use bap_core::priority::{is_slc_off, satellites_for};
use clap::Args;

#[derive(Args)]
pub struct InfoArgs {
    /// Show the priority list of this year instead of the whole catalog
    pub year: Option<i32>,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    print_header();
    match args.year {
        Some(year) => {
            let sensors = satellites_for(year)?;
            for id in sensors {
                let note = if is_slc_off(*id, year) { "SLC-off" } else { "" };
                print_row(id.descriptor(), note);
            }
        }
        None => {
            for id in SensorId::ALL {
                print_row(id.descriptor(), "");
            }
        }
    }
    Ok(())
}

fn print_header() {
    println!(
        "{:<6}{:<10}{:<26}{:<7}{:<8}{:<11}{}",
        "Code", "Name", "Collection", "Level", "Scale", "Years", "Bands"
    );
}

fn print_row(d: &SensorDescriptor, note: &str) {
    let years = match d.last_year {
        Some(last) => format!("{}-{}", d.first_year, last),
        None => format!("{}-", d.first_year),
    };
    println!(
        "{:<6}{:<10}{:<26}{:<7}{:<8}{:<11}{} {}",
        d.code,
        d.short_name,
        d.id.as_str(),
        format!("{:?}", d.process),
        d.scale,
        years,
        d.canonical_bands().join(","),
        note
    );
}
