//! Minimal typed INI codec for addon descriptor files
//!
//! Values are scanned into booleans, integers and strings the same way a
//! typed INI scanner would: `1`/`0` become integers, `true`/`on`/`yes` and
//! `false`/`off`/`no`/`none` become booleans, `null` is null. Array keys of
//! the form `rewrite[post/view] = ...` are folded into a section named after
//! the key, so both spellings of a nested mapping read the same.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum IniValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl IniValue {
    fn scan(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.len() >= 2
            && ((raw.starts_with('"') && raw.ends_with('"'))
                || (raw.starts_with('\'') && raw.ends_with('\'')))
        {
            return IniValue::Str(raw[1..raw.len() - 1].to_string());
        }

        match raw.to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" => return IniValue::Bool(true),
            "false" | "off" | "no" | "none" => return IniValue::Bool(false),
            "null" => return IniValue::Null,
            _ => {}
        }

        let digits = raw.strip_prefix('-').unwrap_or(raw);
        let leading_zero = digits.len() > 1 && digits.starts_with('0');
        match raw.parse::<i64>() {
            Ok(n) if !raw.starts_with('+') && !leading_zero => IniValue::Int(n),
            _ => IniValue::Str(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            IniValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness as seen by a state flag
    pub fn as_flag(&self) -> bool {
        match self {
            IniValue::Null => false,
            IniValue::Bool(b) => *b,
            IniValue::Int(n) => *n != 0,
            IniValue::Str(s) => !s.is_empty() && s != "0",
        }
    }
}

impl fmt::Display for IniValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IniValue::Null => Ok(()),
            IniValue::Bool(true) => write!(f, "true"),
            IniValue::Bool(false) => write!(f, "false"),
            IniValue::Int(n) => write!(f, "{n}"),
            IniValue::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for IniValue {
    fn from(value: &str) -> Self {
        IniValue::Str(value.to_string())
    }
}

pub type IniSection = IndexMap<String, IniValue>;

/// Parsed INI file: top-level keys plus named sections, in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IniDocument {
    pub root: IniSection,
    pub sections: IndexMap<String, IniSection>,
}

impl IniDocument {
    pub fn parse(source: &str) -> Result<Self> {
        let mut doc = IniDocument::default();
        let mut current: Option<String> = None;

        for (index, line) in source.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let name = rest.strip_suffix(']').ok_or_else(|| {
                    Error::Descriptor(format!("line {}: unterminated section header", index + 1))
                })?;
                let name = name.trim().to_string();
                doc.sections.entry(name.clone()).or_default();
                current = Some(name);
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| {
                Error::Descriptor(format!("line {}: expected `key = value`", index + 1))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(Error::Descriptor(format!("line {}: empty key", index + 1)));
            }
            let value = IniValue::scan(value);

            // `name[sub] = value` outside a section nests under `name`
            if current.is_none() {
                if let Some((outer, inner)) = split_array_key(key) {
                    doc.sections
                        .entry(outer.to_string())
                        .or_default()
                        .insert(inner.to_string(), value);
                    continue;
                }
            }

            let target = match &current {
                Some(section) => doc.sections.entry(section.clone()).or_default(),
                None => &mut doc.root,
            };
            target.insert(key.to_string(), value);
        }

        Ok(doc)
    }

    /// Renders top-level keys first so section headers never capture them
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.root {
            out.push_str(&format!("{key} = {}\n", quote_if_needed(value)));
        }
        for (name, section) in &self.sections {
            out.push_str(&format!("[{name}]\n"));
            for (key, value) in section {
                out.push_str(&format!("{key} = {}\n", quote_if_needed(value)));
            }
        }
        out
    }
}

fn split_array_key(key: &str) -> Option<(&str, &str)> {
    let open = key.find('[')?;
    let inner = key[open + 1..].strip_suffix(']')?;
    let outer = key[..open].trim();
    if outer.is_empty() || inner.is_empty() {
        return None;
    }
    Some((outer, inner))
}

/// Strings that would scan back as another type are quoted
fn quote_if_needed(value: &IniValue) -> String {
    match value {
        IniValue::Str(s) if !matches!(IniValue::scan(s), IniValue::Str(ref back) if back == s) => {
            format!("\"{s}\"")
        }
        other => other.to_string(),
    }
}
