use anyhow::{Context, Result};
use gridscale_core::{BusId, GenType, GridError, GridResult};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Asset category a change-table entry edits.
///
/// Ordering follows application order: generation types in canonical order,
/// then branch, dcline, storage, new_dcline, demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Generation(GenType),
    Branch,
    DcLine,
    Storage,
    NewDcLine,
    Demand,
}

impl Category {
    pub fn name(&self) -> &'static str {
        match self {
            Category::Generation(gen_type) => gen_type.as_str(),
            Category::Branch => "branch",
            Category::DcLine => "dcline",
            Category::Storage => "storage",
            Category::NewDcLine => "new_dcline",
            Category::Demand => "demand",
        }
    }

    /// Scopes an entry of this category may be keyed by. Empty for
    /// `new_dcline`, which carries descriptors instead.
    pub fn allowed_scopes(&self) -> &'static [Scope] {
        match self {
            Category::Generation(_) => &[Scope::ZoneId, Scope::PlantId],
            Category::Branch => &[Scope::ZoneId, Scope::BranchId],
            Category::DcLine => &[Scope::DcLineId],
            Category::Storage => &[Scope::BusId],
            Category::NewDcLine => &[],
            Category::Demand => &[Scope::ZoneId],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = GridError;

    fn from_str(s: &str) -> GridResult<Self> {
        match s {
            "branch" => Ok(Category::Branch),
            "dcline" => Ok(Category::DcLine),
            "storage" => Ok(Category::Storage),
            "new_dcline" => Ok(Category::NewDcLine),
            "demand" => Ok(Category::Demand),
            other => other.parse::<GenType>().map(Category::Generation).map_err(|_| {
                GridError::Validation(format!("unknown change table category '{}'", other))
            }),
        }
    }
}

/// Key an entry's ids refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    ZoneId,
    PlantId,
    BranchId,
    BusId,
    #[serde(rename = "dcline_id")]
    DcLineId,
}

impl Scope {
    pub fn name(&self) -> &'static str {
        match self {
            Scope::ZoneId => "zone_id",
            Scope::PlantId => "plant_id",
            Scope::BranchId => "branch_id",
            Scope::BusId => "bus_id",
            Scope::DcLineId => "dcline_id",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scope {
    type Err = GridError;

    fn from_str(s: &str) -> GridResult<Self> {
        match s {
            "zone_id" => Ok(Scope::ZoneId),
            "plant_id" => Ok(Scope::PlantId),
            "branch_id" => Ok(Scope::BranchId),
            "bus_id" => Ok(Scope::BusId),
            "dcline_id" => Ok(Scope::DcLineId),
            other => Err(GridError::Validation(format!(
                "unknown change table scope '{}'",
                other
            ))),
        }
    }
}

/// Raw id → value map of one scope. For storage the value is a capacity
/// (MW); everywhere else it is a multiplier, 0 meaning remove.
pub type ScaleFactors = BTreeMap<usize, f64>;

/// Descriptor of a DC line to build from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDcLine {
    pub from_bus_id: BusId,
    pub to_bus_id: BusId,
    /// Transfer capacity in MW
    pub capacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CategoryEdits {
    Scale(BTreeMap<Scope, ScaleFactors>),
    NewDcLines(Vec<NewDcLine>),
}

/// Validated set of edits keyed by category.
///
/// Absent categories and absent scopes are explicit `None` lookups; the
/// appliers treat them as "no edits".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChangeTable {
    entries: BTreeMap<Category, CategoryEdits>,
}

impl ChangeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a raw category → scope → id → value document.
    pub fn from_document(document: &Value) -> GridResult<Self> {
        let object = match document {
            Value::Null => return Ok(Self::new()),
            Value::Object(object) => object,
            other => {
                return Err(GridError::Validation(format!(
                    "change table must be a mapping, found {}",
                    json_kind(other)
                )))
            }
        };

        let mut table = Self::new();
        for (key, value) in object {
            let category: Category = key.parse()?;
            let edits = if category == Category::NewDcLine {
                let lines: Vec<NewDcLine> = serde_json::from_value(value.clone()).map_err(|e| {
                    GridError::Validation(format!("invalid new_dcline entries: {}", e))
                })?;
                for line in &lines {
                    validate_value(category, None, line.capacity)?;
                }
                CategoryEdits::NewDcLines(lines)
            } else {
                let scopes = value.as_object().ok_or_else(|| {
                    GridError::Validation(format!(
                        "category '{}' must map scopes to ids, found {}",
                        category,
                        json_kind(value)
                    ))
                })?;
                let mut parsed = BTreeMap::new();
                for (scope_key, factors) in scopes {
                    let scope: Scope = scope_key.parse()?;
                    check_scope(category, scope)?;
                    let factors: ScaleFactors = serde_json::from_value(factors.clone())
                        .map_err(|e| {
                            GridError::Validation(format!(
                                "invalid {} entries for '{}': {}",
                                scope, category, e
                            ))
                        })?;
                    for factor in factors.values() {
                        validate_value(category, Some(scope), *factor)?;
                    }
                    parsed.insert(scope, factors);
                }
                CategoryEdits::Scale(parsed)
            };
            table.entries.insert(category, edits);
        }
        Ok(table)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, category: Category) -> bool {
        self.entries.contains_key(&category)
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.entries.keys().copied()
    }

    pub fn edits(&self, category: Category) -> Option<&CategoryEdits> {
        self.entries.get(&category)
    }

    /// Generation types with an entry, in canonical order.
    pub fn generation_types(&self) -> impl Iterator<Item = GenType> + '_ {
        GenType::ALL
            .into_iter()
            .filter(move |gen_type| self.contains(Category::Generation(*gen_type)))
    }

    /// The id → value map for one scope of a category, if present.
    pub fn factors(&self, category: Category, scope: Scope) -> Option<&ScaleFactors> {
        match self.entries.get(&category)? {
            CategoryEdits::Scale(scopes) => scopes.get(&scope),
            CategoryEdits::NewDcLines(_) => None,
        }
    }

    pub fn new_dclines(&self) -> &[NewDcLine] {
        match self.entries.get(&Category::NewDcLine) {
            Some(CategoryEdits::NewDcLines(lines)) => lines,
            _ => &[],
        }
    }

    pub fn set_factor(
        &mut self,
        category: Category,
        scope: Scope,
        id: usize,
        factor: f64,
    ) -> GridResult<&mut Self> {
        check_scope(category, scope)?;
        validate_value(category, Some(scope), factor)?;
        let edits = self
            .entries
            .entry(category)
            .or_insert_with(|| CategoryEdits::Scale(BTreeMap::new()));
        if let CategoryEdits::Scale(scopes) = edits {
            scopes.entry(scope).or_default().insert(id, factor);
        }
        Ok(self)
    }

    pub fn add_new_dcline(&mut self, line: NewDcLine) -> GridResult<&mut Self> {
        validate_value(Category::NewDcLine, None, line.capacity)?;
        let edits = self
            .entries
            .entry(Category::NewDcLine)
            .or_insert_with(|| CategoryEdits::NewDcLines(Vec::new()));
        if let CategoryEdits::NewDcLines(lines) = edits {
            lines.push(line);
        }
        Ok(self)
    }
}

impl Serialize for ChangeTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (category, edits) in &self.entries {
            map.serialize_entry(category.name(), edits)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ChangeTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let document = Value::deserialize(deserializer)?;
        ChangeTable::from_document(&document).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<&Value> for ChangeTable {
    type Error = GridError;

    fn try_from(document: &Value) -> GridResult<Self> {
        ChangeTable::from_document(document)
    }
}

/// Load a change table from a `.json`, `.yaml` or `.yml` file.
pub fn load_change_table_from_path(path: &Path) -> GridResult<ChangeTable> {
    Ok(read_change_table(path)?)
}

fn read_change_table(path: &Path) -> Result<ChangeTable> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading change table '{}'", path.display()))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(&data).context("parsing change table yaml")
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(&data).context("parsing change table json")
        }
        _ => serde_yaml::from_str(&data)
            .or_else(|_| serde_json::from_str(&data))
            .context("parsing change table"),
    }
}

fn check_scope(category: Category, scope: Scope) -> GridResult<()> {
    if category.allowed_scopes().contains(&scope) {
        Ok(())
    } else {
        Err(GridError::Validation(format!(
            "scope '{}' is not valid for category '{}'",
            scope, category
        )))
    }
}

fn validate_value(category: Category, scope: Option<Scope>, value: f64) -> GridResult<()> {
    if value.is_finite() && value >= 0.0 {
        return Ok(());
    }
    let location = match scope {
        Some(scope) => format!("{}/{}", category, scope),
        None => category.to_string(),
    };
    Err(GridError::Validation(format!(
        "{} value {} must be finite and non-negative",
        location, value
    )))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
