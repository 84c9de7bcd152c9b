//! Script conversion between writing-system variants (traditional to
//! simplified), applied once to each title and once to each cleaned body.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Error, Result};

pub trait ScriptConverter: Send + Sync {
    fn convert(&self, text: &str) -> String;
}

/// Leaves text as it is.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl ScriptConverter for Passthrough {
    fn convert(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Character-for-character substitution from an OpenCC-style table.
///
/// Each line is `source<TAB>target [alternatives...]`; the first target is
/// used. Blank lines and `#` comments are skipped. Multi-character sources
/// are not supported by this converter and are ignored.
#[derive(Debug, Default, Clone)]
pub struct CharTableConverter {
    table: HashMap<char, String>,
}

impl CharTableConverter {
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut table = HashMap::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (source, targets) = line.split_once('\t').ok_or_else(|| Error::ConversionTable {
                path: path.to_path_buf(),
                line: index + 1,
            })?;
            let target = targets.split_whitespace().next().ok_or_else(|| Error::ConversionTable {
                path: path.to_path_buf(),
                line: index + 1,
            })?;

            let mut chars = source.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                table.insert(c, target.to_string());
            }
        }

        Ok(Self { table })
    }

    #[cfg(test)]
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (char, &'a str)>) -> Self {
        Self {
            table: pairs.into_iter().map(|(c, t)| (c, t.to_string())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }
}

impl ScriptConverter for CharTableConverter {
    fn convert(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            match self.table.get(&c) {
                Some(target) => out.push_str(target),
                None => out.push(c),
            }
        }
        out
    }
}
