use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "serial-matrix")]
#[command(about = "Twelve-tone matrix generator and sequencer")]
pub struct Cli {
    /// Engine configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the 12x12 matrix generated from a row
    Matrix {
        /// Row offsets (format: 0,11,7,8,...)
        #[arg(short, long)]
        row: String,
        /// Reduce every cell to one octave
        #[arg(long)]
        single_octave: bool,
    },
    /// Teach a row from a list of pitch voltages
    Teach {
        /// Pitch voltages, one trigger per value (format: 1.0,1.0833,...)
        #[arg(long, allow_hyphen_values = true)]
        volts: String,
        /// Accept repeated pitch classes
        #[arg(long)]
        allow_repetition: bool,
        /// Save the taught row to a JSON file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Address a saved row with external row/column voltages
    Play {
        /// Taught row JSON file
        #[arg(long)]
        row_file: PathBuf,
        /// Row address voltage (0V to +10V)
        #[arg(long)]
        row_cv: f32,
        /// Column address voltage (0V to +10V)
        #[arg(long)]
        col_cv: f32,
        /// Reduce every cell to one octave
        #[arg(long)]
        single_octave: bool,
    },
}

pub fn parse_volts(input: &str) -> Result<Vec<f32>, String> {
    input
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<f32>()
                .map_err(|_| format!("Invalid voltage '{}'. Expected a number", part))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_volts() {
        assert_eq!(parse_volts("1.0, 1.5,-0.25").unwrap(), vec![1.0, 1.5, -0.25]);
        assert!(parse_volts("1.0,,2.0").is_err());
        assert!(parse_volts("abc").is_err());
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["serial-matrix", "-vv", "matrix", "--row", "0,1,2", "--single-octave"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Matrix { single_octave: true, .. }));

        let cli = Cli::parse_from([
            "serial-matrix", "play", "--row-file", "row.json", "--row-cv", "5.0", "--col-cv", "0",
        ]);
        match cli.command {
            Commands::Play { row_cv, col_cv, .. } => {
                assert_eq!(row_cv, 5.0);
                assert_eq!(col_cv, 0.0);
            }
            _ => panic!("expected play"),
        }
    }
}
