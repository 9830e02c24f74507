//! Map spreadsheet and CSV rows into typed records.
//!
//! A [`RecordDefinition`] binds input columns to record fields, names each field's type, and
//! attaches validation rules. A [`Parser`] assembles it into a [`schema::Schema`], then for
//! every row skips headers and empty mandatory rows, validates, casts each cell through the
//! [`CasterRegistry`] and builds the record. Parsing is lazy and reports [`Stats`] as it goes.

pub mod casters;
pub mod cli;
pub mod definition;
pub mod error;
pub mod io_utils;
pub mod parser;
pub mod pipeline;
pub mod record;
pub mod registry;
pub mod result;
pub mod schema;
pub mod schema_file;
pub mod stats;
pub mod table;
pub mod types;
pub mod validator;
pub mod value;

use std::{env, ops::ControlFlow, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser as _;
use log::{LevelFilter, debug, info, warn};

pub use crate::{
    casters::{Caster, CastFailure},
    definition::{Column, ColumnRef, FieldSpec, Header, RecordDefinition},
    error::{Error, RowError, RowErrorKind},
    parser::Parser,
    pipeline::EmptyCellPolicy,
    record::{AssignError, DynamicRecord, FromRow, Record},
    registry::CasterRegistry,
    result::{ParseIter, ParseResult},
    stats::{Stats, StatsSnapshot},
    types::{CastTarget, DeclaredType, TypeKey},
    validator::{AcceptAll, RuleValidator, Validation, Validator},
    value::{FieldValue, FieldValues, Value},
};

use crate::cli::{Cli, Commands, InputArgs, ParseArgs, ValidateArgs};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("cellcast", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Validate(args) => handle_validate(&args),
        Commands::Parse(args) => handle_parse(&args),
    }
}

fn load_definition(args: &InputArgs) -> Result<RecordDefinition> {
    schema_file::load_definition(&args.definition)
        .with_context(|| format!("Loading record definition from {:?}", args.definition))
}

fn open_rows(args: &InputArgs) -> Result<impl Iterator<Item = Result<Vec<Value>>> + use<>> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Reading '{}' with delimiter '{}' and encoding {}",
        args.input.display(),
        printable_delimiter(delimiter),
        encoding.name()
    );
    io_utils::read_rows(&args.input, delimiter, encoding)
}

fn handle_validate(args: &ValidateArgs) -> Result<()> {
    let parser = Parser::<DynamicRecord>::from_definition(
        load_definition(&args.input)?,
        RuleValidator::new(),
    )
    .context("Assembling record definition")?
    .with_empty_cell_policy(args.input.empty_cells);
    let rows = open_rows(&args.input)?;
    let errors = itertools::process_results(rows, |rows| parser.validate_all(rows))?;
    if errors.is_empty() {
        info!("All rows of {:?} passed validation", args.input.input);
        return Ok(());
    }
    print!("{}", table::render_errors(&errors));
    bail!(
        "{} row(s) of {:?} failed validation",
        errors.len(),
        args.input.input
    );
}

fn handle_parse(args: &ParseArgs) -> Result<()> {
    let mut definition = load_definition(&args.input)?;
    if args.fail_fast
        && let Some(header) = definition.header.as_mut()
    {
        header.stop_on_first_failure = true;
    }
    let parser = configure_parser(
        Parser::<DynamicRecord>::from_definition(definition, RuleValidator::new())
            .context("Assembling record definition")?,
        args,
    );

    let mut fields = parser
        .schema()
        .fields
        .iter()
        .map(|field| field.name.clone())
        .collect::<Vec<_>>();
    fields.extend(parser.schema().unbound_defaults.keys().cloned());

    let rows = open_rows(&args.input)?;
    let mut failures = Vec::new();
    let mut records = Vec::new();
    let mut stopped_at = None;
    let stats_report = itertools::process_results(rows, |rows| -> Result<String> {
        let result = parser.parse_with(rows, |error: &RowError, _stats: &Stats| {
            warn!("{error}");
            failures.push(error.clone());
            ControlFlow::Continue(())
        })?;
        for item in result.iter()? {
            match item {
                Ok(record) => records.push(record),
                Err(err) => match err.row_error() {
                    Some(row_error) => stopped_at = Some(row_error.clone()),
                    None => return Err(err.into()),
                },
            }
        }
        debug!("Parsed {} record(s) from {:?}", records.len(), args.input.input);
        if args.json {
            Ok(serde_json::to_string(&result.stats().snapshot())?)
        } else {
            Ok(table::render_stats(result.stats()))
        }
    })??;
    let stopped = stopped_at.is_some();
    failures.extend(stopped_at);

    if args.json {
        for record in &records {
            println!("{}", serde_json::to_string(record)?);
        }
        eprintln!("{stats_report}");
    } else {
        print!("{}", table::render_records(&fields, &records));
        println!();
        print!("{stats_report}");
    }
    if !failures.is_empty() {
        eprint!("{}", table::render_errors(&failures));
    }
    if stopped {
        bail!("Parsing stopped at the first failed row");
    }
    Ok(())
}

fn configure_parser(parser: Parser<DynamicRecord>, args: &ParseArgs) -> Parser<DynamicRecord> {
    let mut parser = parser.with_empty_cell_policy(args.input.empty_cells);
    if args.european_numbers {
        parser = parser.with_european_numbers();
    } else if args.us_numbers {
        parser = parser.with_us_numbers();
    }
    if args.timezone.is_some() || !args.date_formats.is_empty() {
        parser = parser.with_date_caster(args.timezone, args.date_formats.iter().cloned());
    }
    if args.strict_booleans {
        parser = parser.with_strict_booleans();
    }
    parser
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
