//! Public entry point: configure casters, then validate or parse rows into records.

use std::{collections::BTreeMap, fmt, marker::PhantomData, ops::ControlFlow, sync::Arc};

use chrono::FixedOffset;
use itertools::Itertools;
use log::debug;

use crate::{
    casters::{
        BoolCaster, Caster, DateCaster, FloatCaster, IntCaster, LetterCase, StringCaster,
    },
    definition::RecordDefinition,
    error::{Error, Result, RowError},
    pipeline::{EmptyCellPolicy, Pipeline, Rows},
    record::{FromRow, Record},
    registry::CasterRegistry,
    result::{ErrorCallback, ParseResult},
    schema::{BoundField, Schema},
    stats::Stats,
    types::{CastTarget, TypeKey},
    validator::Validator,
    value::Value,
};

/// Maps rows into records of type `R`.
///
/// A parser is a value: every `with_*` method returns a configured copy and leaves the
/// receiver as it was, so one base parser can be branched into several configurations.
pub struct Parser<R> {
    schema: Arc<Schema>,
    definition_casters: Arc<BTreeMap<String, Arc<dyn Caster>>>,
    registry: CasterRegistry,
    validator: Arc<dyn Validator>,
    empty_cells: EmptyCellPolicy,
    record: PhantomData<fn() -> R>,
}

impl<R> Clone for Parser<R> {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            definition_casters: Arc::clone(&self.definition_casters),
            registry: self.registry.clone(),
            validator: Arc::clone(&self.validator),
            empty_cells: self.empty_cells,
            record: PhantomData,
        }
    }
}

impl<R> fmt::Debug for Parser<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("schema", &self.schema)
            .field("definition_casters", &self.definition_casters.keys().collect::<Vec<_>>())
            .field("registry", &self.registry)
            .field("empty_cells", &self.empty_cells)
            .finish()
    }
}

impl<R: Record> Parser<R> {
    /// Builds a parser from the record type's own definition.
    pub fn new(validator: impl Validator + 'static) -> Result<Self> {
        Self::from_definition(R::definition(), validator)
    }
}

impl<R: FromRow> Parser<R> {
    /// Assembles the definition's schema; fails on any configuration error.
    pub fn from_definition(
        definition: RecordDefinition,
        validator: impl Validator + 'static,
    ) -> Result<Self> {
        let schema = Schema::assemble(&definition)?;
        Ok(Self {
            schema: Arc::new(schema),
            definition_casters: Arc::new(definition.casters),
            registry: CasterRegistry::default(),
            validator: Arc::new(validator),
            empty_cells: EmptyCellPolicy::default(),
            record: PhantomData,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn registry(&self) -> &CasterRegistry {
        &self.registry
    }

    fn with_registry(&self, registry: CasterRegistry) -> Self {
        let mut next = self.clone();
        next.registry = registry;
        next
    }

    pub fn with_cast<I, T>(&self, caster: impl Caster + 'static, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<CastTarget>,
    {
        self.with_registry(self.registry.with_cast(caster, targets))
    }

    pub fn without_cast<I, T>(&self, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<CastTarget>,
    {
        self.with_registry(self.registry.without_cast(targets))
    }

    /// Drops every registry customisation.
    pub fn with_default_casters(&self) -> Self {
        self.with_registry(self.registry.reset())
    }

    pub fn has_caster_for(&self, target: impl Into<CastTarget>) -> bool {
        self.registry.has_caster_for(target)
    }

    pub fn registered_types(&self) -> Vec<TypeKey> {
        self.registry.registered_types()
    }

    /// Replaces the caster of every date/time type.
    pub fn with_date_caster<I>(&self, timezone: Option<FixedOffset>, fallback_formats: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let caster = DateCaster::new()
            .timezone(timezone)
            .fallback_formats(fallback_formats);
        self.with_cast(caster, [CastTarget::Date])
    }

    /// Floats written as `1 234,56`.
    pub fn with_european_numbers(&self) -> Self {
        self.with_cast(FloatCaster::european(), [TypeKey::Float])
    }

    /// Floats written as `1,234.56`.
    pub fn with_us_numbers(&self) -> Self {
        self.with_cast(FloatCaster::us(), [TypeKey::Float])
    }

    pub fn with_number_separators(&self, decimal: &str, thousands: &str) -> Self {
        self.with_cast(
            FloatCaster::new().separators(decimal, thousands),
            [TypeKey::Float],
        )
    }

    /// Booleans limited to `true 1 yes on` / `false 0 no off` and blank.
    pub fn with_strict_booleans(&self) -> Self {
        self.with_cast(BoolCaster::strict_vocabulary(), [TypeKey::Bool])
    }

    pub fn with_int_range(&self, min: Option<i64>, max: Option<i64>) -> Self {
        self.with_cast(IntCaster::new().range(min, max), [TypeKey::Int])
    }

    /// Rounds every float half away from zero to `places` decimals.
    pub fn with_float_precision(&self, places: u32) -> Self {
        self.with_cast(FloatCaster::new().precision(Some(places)), [TypeKey::Float])
    }

    pub fn with_string_processing(&self, trim: bool, case: Option<LetterCase>) -> Self {
        self.with_cast(StringCaster::new().trim(trim).case(case), [TypeKey::String])
    }

    pub fn with_empty_cell_policy(&self, policy: EmptyCellPolicy) -> Self {
        let mut next = self.clone();
        next.empty_cells = policy;
        next
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::new(
            Arc::clone(&self.schema),
            Arc::clone(&self.validator),
            self.empty_cells,
        )
    }

    /// Resolves the caster of one bound field: its alias, then the definition's caster for
    /// the type, then the registry. An alias that is not configured resolves to nothing.
    fn caster_for(&self, field: &BoundField) -> Option<Arc<dyn Caster>> {
        if let Some(alias) = &field.caster {
            let key = TypeKey::parse(alias);
            return self.definition_casters.get(key.name()).cloned();
        }
        self.definition_casters
            .get(field.type_key.name())
            .or_else(|| self.registry.get(&field.type_key))
            .cloned()
    }

    fn resolve_casters(&self) -> Result<Vec<Arc<dyn Caster>>> {
        let mut resolved = Vec::with_capacity(self.schema.fields.len());
        let mut missing = Vec::new();
        for field in &self.schema.fields {
            match self.caster_for(field) {
                Some(caster) => resolved.push(caster),
                None => missing.push(match &field.caster {
                    Some(alias) => format!("{} (caster `{alias}`)", field.name),
                    None => format!("{} ({})", field.name, field.type_key),
                }),
            }
        }
        if missing.is_empty() {
            Ok(resolved)
        } else {
            Err(Error::configuration(format!(
                "no caster registered for field(s): {}",
                missing.iter().join(", ")
            )))
        }
    }

    /// Filters and validates every row without casting. Never fails; returns one error per
    /// rejected row, in input order.
    pub fn validate_all<I, C, V>(&self, rows: I) -> Vec<RowError>
    where
        I: IntoIterator<Item = C>,
        C: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let pipeline = self.pipeline();
        rows.into_iter()
            .map(collect_row)
            .enumerate()
            .filter(|(index, row)| pipeline.accepts(*index, row))
            .filter_map(|(index, row)| pipeline.validate(index, row).err())
            .collect()
    }

    /// Starts a lazy parse. Fails before any row is read when a bound field has no caster.
    pub fn parse<'a, I, C, V>(&self, rows: I) -> Result<ParseResult<'a, R>>
    where
        I: IntoIterator<Item = C>,
        I::IntoIter: 'a,
        C: IntoIterator<Item = V> + 'a,
        V: Into<Value> + 'a,
        R: 'a,
    {
        self.start(rows, None)
    }

    /// Like [`Parser::parse`], calling `callback` for every failed row.
    pub fn parse_with<'a, I, C, V, F>(&self, rows: I, callback: F) -> Result<ParseResult<'a, R>>
    where
        I: IntoIterator<Item = C>,
        I::IntoIter: 'a,
        C: IntoIterator<Item = V> + 'a,
        V: Into<Value> + 'a,
        R: 'a,
        F: FnMut(&RowError, &Stats) -> ControlFlow<String> + 'a,
    {
        self.start(rows, Some(Box::new(callback)))
    }

    fn start<'a, I, C, V>(
        &self,
        rows: I,
        callback: Option<ErrorCallback<'a>>,
    ) -> Result<ParseResult<'a, R>>
    where
        I: IntoIterator<Item = C>,
        I::IntoIter: 'a,
        C: IntoIterator<Item = V> + 'a,
        V: Into<Value> + 'a,
        R: 'a,
    {
        let casters = self.resolve_casters()?;
        debug!(
            "Starting parse of {} field(s) with {} header row(s)",
            self.schema.fields.len(),
            self.schema.header_rows
        );
        let source = Box::new(rows.into_iter().map(collect_row));
        let rows = Rows::new(source, self.pipeline().with_casters(casters));
        Ok(ParseResult::new(rows, callback))
    }
}

fn collect_row<C, V>(row: C) -> Vec<Value>
where
    C: IntoIterator<Item = V>,
    V: Into<Value>,
{
    row.into_iter().map(Into::into).collect()
}
