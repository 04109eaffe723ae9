// Package records as returned by the RPC read endpoints, plus the fixed
// category ordinal table. Wire records carry most scalars as strings
// ("NumVotes": "12", "OutOfDate": "1"); `Package::from_wire` turns them
// into typed values once, so nothing downstream re-parses strings.

use crate::error::{AurError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Category ordinals used by the repository. Indices 0 and 1 are reserved.
pub const CATEGORIES: [Option<&str>; 20] = [
    None,
    None,
    Some("daemons"),
    Some("devel"),
    Some("editors"),
    Some("emulators"),
    Some("games"),
    Some("gnome"),
    Some("i18n"),
    Some("kde"),
    Some("lib"),
    Some("modules"),
    Some("multimedia"),
    Some("network"),
    Some("office"),
    Some("science"),
    Some("system"),
    Some("x11"),
    Some("xfce"),
    Some("kernels"),
];

/// Category used for uploads when none is given ("system").
pub const DEFAULT_CATEGORY: &str = "16";

/// Resolve a category ordinal to its name. Reserved and out-of-range
/// ordinals have no name; this never fails.
pub fn category_name(index: usize) -> Option<&'static str> {
    CATEGORIES.get(index).copied().flatten()
}

/// Resolve a category name to the ordinal string the submit form expects.
pub fn category_index(name: &str) -> Result<String> {
    CATEGORIES
        .iter()
        .position(|c| c.is_some_and(|c| c.eq_ignore_ascii_case(name)))
        .map(|i| i.to_string())
        .ok_or_else(|| {
            AurError::UnknownCategory(format!(
                "{name} (expected one of {})",
                category_names().collect::<Vec<_>>().join(", ")
            ))
        })
}

/// Names of all assignable categories, in ordinal order.
pub fn category_names() -> impl Iterator<Item = &'static str> {
    CATEGORIES.iter().filter_map(|c| *c)
}

/// A normalized search/info record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "CategoryID")]
    pub category: Option<&'static str>,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "License")]
    pub license: String,
    #[serde(rename = "NumVotes")]
    pub num_votes: u64,
    #[serde(rename = "OutOfDate")]
    pub out_of_date: bool,
    #[serde(rename = "Maintainer", skip_serializing_if = "Option::is_none")]
    pub maintainer: Option<String>,
}

/// Record shape on the wire. Every field is kept loose because the service
/// mixes strings, numbers and nulls for the same key.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct WirePackage {
    #[serde(rename = "ID", default)]
    id: Value,
    #[serde(rename = "Name", default)]
    name: Value,
    #[serde(rename = "Version", default)]
    version: Value,
    #[serde(rename = "CategoryID", default)]
    category_id: Value,
    #[serde(rename = "Description", default)]
    description: Value,
    #[serde(rename = "URL", default)]
    url: Value,
    #[serde(rename = "License", default)]
    license: Value,
    #[serde(rename = "NumVotes", default)]
    num_votes: Value,
    #[serde(rename = "OutOfDate", default)]
    out_of_date: Value,
    #[serde(rename = "Maintainer", default)]
    maintainer: Value,
}

impl Package {
    pub(crate) fn from_wire(wire: WirePackage) -> Self {
        let category = usize::try_from(leading_number(&wire.category_id))
            .ok()
            .and_then(category_name);
        let maintainer = match wire.maintainer {
            Value::Null => None,
            other => Some(text(&other)),
        };
        Package {
            id: leading_number(&wire.id),
            name: text(&wire.name),
            version: text(&wire.version),
            category,
            description: text(&wire.description),
            url: text(&wire.url),
            license: text(&wire.license),
            num_votes: leading_number(&wire.num_votes),
            out_of_date: is_flagged(&wire.out_of_date),
            maintainer,
        }
    }

    /// Decode and normalize one wire object.
    pub fn from_json(value: Value) -> Result<Self> {
        let wire: WirePackage = serde_json::from_value(value)
            .map_err(|e| AurError::BadResponse(format!("malformed package record: {e}")))?;
        Ok(Package::from_wire(wire))
    }
}

/// Only the literal string "1" marks a package out of date.
fn is_flagged(value: &Value) -> bool {
    matches!(value, Value::String(s) if s == "1")
}

fn text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(text).collect::<Vec<_>>().join(" "),
        other => other.to_string(),
    }
}

/// Numeric value of a wire scalar. Strings contribute their leading decimal
/// digits, so "12" is 12 and "abc" or "-3" is 0.
fn leading_number(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => leading_digits(s),
        _ => 0,
    }
}

pub(crate) fn leading_digits(s: &str) -> u64 {
    s.trim_start()
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0u64, |acc, d| {
            acc.saturating_mul(10).saturating_add(u64::from(d - b'0'))
        })
}

/// Field a result collection can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Name,
    Version,
    Category,
    NumVotes,
    OutOfDate,
    Maintainer,
}

impl SortField {
    fn compare(self, a: &Package, b: &Package) -> Ordering {
        match self {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Name => a.name.cmp(&b.name),
            SortField::Version => a.version.cmp(&b.version),
            SortField::Category => a.category.cmp(&b.category),
            SortField::NumVotes => a.num_votes.cmp(&b.num_votes),
            SortField::OutOfDate => a.out_of_date.cmp(&b.out_of_date),
            SortField::Maintainer => a.maintainer.cmp(&b.maintainer),
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "id" => Ok(SortField::Id),
            "name" => Ok(SortField::Name),
            "version" => Ok(SortField::Version),
            "category" | "categoryid" => Ok(SortField::Category),
            "votes" | "numvotes" => Ok(SortField::NumVotes),
            "outofdate" => Ok(SortField::OutOfDate),
            "maintainer" => Ok(SortField::Maintainer),
            other => Err(format!("cannot sort by '{other}'")),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortField::Id => "ID",
            SortField::Name => "Name",
            SortField::Version => "Version",
            SortField::Category => "CategoryID",
            SortField::NumVotes => "NumVotes",
            SortField::OutOfDate => "OutOfDate",
            SortField::Maintainer => "Maintainer",
        };
        f.write_str(name)
    }
}

/// Stable ascending sort; equal keys keep their original order.
pub fn sort_packages(packages: &mut [Package], field: SortField) {
    packages.sort_by(|a, b| field.compare(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn named(name: &str, votes: u64) -> Package {
        Package {
            id: 0,
            name: name.to_string(),
            version: "1.0-1".to_string(),
            category: None,
            description: String::new(),
            url: String::new(),
            license: String::new(),
            num_votes: votes,
            out_of_date: false,
            maintainer: None,
        }
    }

    #[test]
    fn category_round_trips_by_name() {
        for i in 2..=18 {
            let name = category_name(i).unwrap();
            assert_eq!(category_index(name).unwrap(), i.to_string());
        }
        assert_eq!(category_name(0), None);
        assert_eq!(category_name(1), None);
        assert_eq!(category_name(400), None);
    }

    #[test]
    fn unknown_category_name_is_an_error() {
        assert!(matches!(
            category_index("spreadsheets"),
            Err(AurError::UnknownCategory(_))
        ));
    }

    #[test]
    fn normalizes_wire_record() {
        let pkg = Package::from_json(json!({
            "ID": "4521",
            "Name": "ffcast",
            "Version": "0.2-1",
            "CategoryID": "12",
            "Description": "Take screencasts",
            "URL": "http://example.org",
            "License": "GPL",
            "NumVotes": "37",
            "OutOfDate": "0"
        }))
        .unwrap();
        assert_eq!(pkg.id, 4521);
        assert_eq!(pkg.category, Some("multimedia"));
        assert_eq!(pkg.num_votes, 37);
        assert!(!pkg.out_of_date);
        assert_eq!(pkg.maintainer, None);
    }

    #[test]
    fn vote_counts_coerce_from_strings() {
        assert_eq!(leading_digits("0"), 0);
        assert_eq!(leading_digits("1234"), 1234);
        assert_eq!(leading_digits("12abc"), 12);
        assert_eq!(leading_digits("-3"), 0);
        assert_eq!(leading_digits(""), 0);
    }

    #[test]
    fn out_of_date_only_for_literal_one() {
        assert!(is_flagged(&json!("1")));
        assert!(!is_flagged(&json!("0")));
        assert!(!is_flagged(&json!("11")));
        assert!(!is_flagged(&json!(1)));
        assert!(!is_flagged(&Value::Null));
    }

    #[test]
    fn reserved_category_ordinal_has_no_name() {
        let pkg = Package::from_json(json!({"Name": "x", "CategoryID": "1"})).unwrap();
        assert_eq!(pkg.category, None);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let mut pkgs = vec![named("c", 5), named("a", 1), named("b", 5), named("d", 1)];
        sort_packages(&mut pkgs, SortField::NumVotes);
        let names: Vec<_> = pkgs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a", "d", "c", "b"]);
    }

    #[test]
    fn parses_sort_field_names() {
        assert_eq!("NumVotes".parse(), Ok(SortField::NumVotes));
        assert_eq!("name".parse(), Ok(SortField::Name));
        assert!("size".parse::<SortField>().is_err());
    }
}
