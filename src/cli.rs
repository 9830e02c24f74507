use std::path::PathBuf;

use chrono::FixedOffset;
use clap::{Args, Parser, Subcommand};

use crate::{casters::parse_utc_offset, pipeline::EmptyCellPolicy};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Map CSV rows into typed records using a YAML record definition",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check every data row against the definition's rules without casting
    Validate(ValidateArgs),
    /// Validate and cast every data row, printing the resulting records
    Parse(ParseArgs),
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// YAML record definition describing header, columns, and field types
    #[arg(short = 'd', long = "definition")]
    pub definition: PathBuf,
    /// Input CSV file ('-' reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Which mandatory cells count as empty when deciding to skip a row
    #[arg(long = "empty-cells", value_enum, default_value_t = EmptyCellPolicy::Falsy)]
    pub empty_cells: EmptyCellPolicy,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Args)]
pub struct ParseArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Read floats written as `1 234,56`
    #[arg(long = "european-numbers", conflicts_with = "us_numbers")]
    pub european_numbers: bool,
    /// Read floats written as `1,234.56`
    #[arg(long = "us-numbers")]
    pub us_numbers: bool,
    /// Offset applied to parsed dates (UTC, Z, +02:00, -0530)
    #[arg(long, value_parser = parse_timezone)]
    pub timezone: Option<FixedOffset>,
    /// Extra chrono format tried for date cells (repeatable)
    #[arg(long = "date-format", action = clap::ArgAction::Append)]
    pub date_formats: Vec<String>,
    /// Restrict booleans to true/1/yes/on and false/0/no/off
    #[arg(long = "strict-booleans")]
    pub strict_booleans: bool,
    /// Stop at the first failed row instead of skipping it
    #[arg(long = "fail-fast")]
    pub fail_fast: bool,
    /// Emit one JSON object per record instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn parse_timezone(value: &str) -> Result<FixedOffset, String> {
    parse_utc_offset(value)
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn delimiter_names_and_single_characters() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("semicolon"), Ok(b';'));
        assert_eq!(parse_delimiter("#"), Ok(b'#'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("é").is_err());
    }

    #[test]
    fn parse_flags_reach_their_fields() {
        let cli = Cli::try_parse_from([
            "cellcast",
            "parse",
            "-d",
            "people.yaml",
            "-i",
            "people.csv",
            "--timezone",
            "+02:00",
            "--date-format",
            "%d.%m.%Y",
            "--empty-cells",
            "blank",
            "--json",
        ])
        .unwrap();
        let Commands::Parse(args) = cli.command else {
            panic!("expected parse subcommand");
        };
        assert_eq!(args.timezone, FixedOffset::east_opt(7200));
        assert_eq!(args.date_formats, vec!["%d.%m.%Y".to_string()]);
        assert_eq!(args.input.empty_cells, EmptyCellPolicy::Blank);
        assert!(args.json);
    }

    #[test]
    fn number_styles_conflict() {
        let result = Cli::try_parse_from([
            "cellcast",
            "parse",
            "-d",
            "a.yaml",
            "-i",
            "a.csv",
            "--european-numbers",
            "--us-numbers",
        ]);
        assert!(result.is_err());
    }
}
