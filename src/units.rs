//! Unit key to display name lookup.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::{self, ConfigFile};
use crate::pivot::Filter;

pub type UnitKey = u32;

pub const UNIT_NAMES_FILE: ConfigFile = ConfigFile {
    file_name: "unit_names.txt",
    component: "unit_names",
    embedded: include_bytes!("../default_unit_names.txt"),
};

#[derive(Debug, Clone, Default)]
pub struct UnitDirectory {
    names: BTreeMap<UnitKey, String>,
}

/// Parse a `<key> = <display name>` line.
pub fn parse_unit_name(line: &str) -> Result<(UnitKey, String)> {
    let (key, name) = line
        .split_once('=')
        .context("Expected `<unit key> = <display name>`")?;
    let key: UnitKey = key
        .trim()
        .parse()
        .with_context(|| format!("Invalid unit key {:?}", key.trim()))?;
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Unit {} has an empty display name", key);
    }
    Ok((key, name.to_string()))
}

impl UnitDirectory {
    pub fn new(entries: impl IntoIterator<Item = (UnitKey, String)>) -> Self {
        Self {
            names: entries.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, unit: UnitKey) -> Option<&str> {
        self.names.get(&unit).map(String::as_str)
    }

    /// Display name for `unit`, or the raw integer when it is not mapped.
    pub fn display(&self, unit: UnitKey) -> String {
        match self.name(unit) {
            Some(name) => name.to_string(),
            None => unit.to_string(),
        }
    }

    pub fn display_filter(&self, filter: Filter) -> String {
        match filter {
            Filter::Total => "Total".to_string(),
            Filter::Unit(unit) => match self.name(unit) {
                Some(name) => format!("{} ({})", name, unit),
                None => unit.to_string(),
            },
        }
    }
}

pub fn load_unit_names(unit_names_path: Option<&Path>) -> Result<UnitDirectory> {
    let entries = config::load_entries(&UNIT_NAMES_FILE, unit_names_path, parse_unit_name)?;
    Ok(UnitDirectory::new(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmapped_unit_displays_raw_key() {
        let units = UnitDirectory::new([(111, "Northgate Payments".to_string())]);
        assert_eq!(units.display(111), "Northgate Payments");
        assert_eq!(units.display(999), "999");
    }

    #[test]
    fn test_display_filter() {
        let units = UnitDirectory::new([(111, "Northgate Payments".to_string())]);
        assert_eq!(units.display_filter(Filter::Total), "Total");
        assert_eq!(
            units.display_filter(Filter::Unit(111)),
            "Northgate Payments (111)"
        );
        assert_eq!(units.display_filter(Filter::Unit(7)), "7");
    }

    #[test]
    fn test_parse_unit_name() {
        assert_eq!(
            parse_unit_name(" 204 =  Harbor Merchant Group ").unwrap(),
            (204, "Harbor Merchant Group".to_string())
        );
        assert!(parse_unit_name("abc = Nope").is_err());
        assert!(parse_unit_name("12 =").is_err());
        assert!(parse_unit_name("12 Nope").is_err());
    }

    #[test]
    fn test_embedded_names_parse() {
        let content = std::str::from_utf8(UNIT_NAMES_FILE.embedded).unwrap();
        let entries: Vec<_> = config::config_lines(content)
            .map(|(_, line)| parse_unit_name(line).unwrap())
            .collect();
        assert!(entries.len() >= 20);
        let units = UnitDirectory::new(entries);
        assert_eq!(units.display(111), "Northgate Payments");
    }
}
