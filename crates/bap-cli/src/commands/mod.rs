pub mod config;
pub mod info;
pub mod run;
pub mod scene;
pub mod season;

use clap::ValueEnum;

use bap_core::season::Season;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SeasonArg {
    /// 11-15 to 03-15, best day 01-15
    South,
    /// 05-15 to 09-15, best day 07-15
    North,
}

impl From<SeasonArg> for Season {
    fn from(arg: SeasonArg) -> Self {
        match arg {
            SeasonArg::South => Season::growing_south(),
            SeasonArg::North => Season::growing_north(),
        }
    }
}
