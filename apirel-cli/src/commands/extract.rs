//! Extract command - list the exported symbols of a snapshot
//!
//! A debugging aid for snapshot producers: shows what the differ will see
//! for each package, or the load errors that keep it from seeing anything.

use std::path::Path;

use anyhow::Context;
use apirel_core::differ::typestring::type_string;
use apirel_core::{extract, Snapshot};
use colored::Colorize;
use serde::Serialize;

use crate::output::{JsonOutput, Output, OutputConfig, Outputter};

#[derive(Debug, Serialize)]
pub struct SymbolEntry {
    pub name: String,
    pub kind: String,
    #[serde(rename = "type")]
    pub type_string: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PackageEntry {
    pub path: String,
    pub symbols: Vec<SymbolEntry>,
    /// Unexported types whose structure is part of the exported API.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inlined: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ExtractResult {
    pub module_path: String,
    pub packages: Vec<PackageEntry>,
}

impl ExtractResult {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let packages = snapshot
            .packages
            .iter()
            .map(|pkg| match extract(snapshot, pkg) {
                Ok(table) => PackageEntry {
                    path: pkg.path.clone(),
                    symbols: table
                        .symbols
                        .iter()
                        .map(|s| SymbolEntry {
                            name: s.name.clone(),
                            kind: s.kind.as_str().to_string(),
                            type_string: type_string(snapshot, s.ty, &pkg.path),
                            value: s.value.clone(),
                        })
                        .collect(),
                    inlined: table.reachable_unexported_names(),
                    errors: Vec::new(),
                },
                Err(errors) => PackageEntry {
                    path: pkg.path.clone(),
                    symbols: Vec::new(),
                    inlined: Vec::new(),
                    errors,
                },
            })
            .collect();

        Self {
            module_path: snapshot.module_path.clone(),
            packages,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.packages.iter().any(|p| !p.errors.is_empty())
    }
}

impl Outputter for ExtractResult {
    fn to_text(&self, config: &OutputConfig) -> String {
        let mut output = String::new();
        let heading = |s: &str| {
            if config.use_colors() {
                s.bold().to_string()
            } else {
                s.to_string()
            }
        };

        output.push_str(&format!("module {}\n", heading(&self.module_path)));
        for pkg in &self.packages {
            output.push_str(&format!("\n{}\n", heading(&pkg.path)));
            for e in &pkg.errors {
                output.push_str(&format!("\terror: {}\n", e));
            }
            for s in &pkg.symbols {
                match &s.value {
                    Some(value) => output.push_str(&format!(
                        "\t{} {} {} = {}\n",
                        s.kind, s.name, s.type_string, value
                    )),
                    None => output.push_str(&format!(
                        "\t{} {} {}\n",
                        s.kind, s.name, s.type_string
                    )),
                }
            }
            if !pkg.inlined.is_empty() {
                output.push_str(&format!("\tinlined: {}\n", pkg.inlined.join(", ")));
            }
        }
        output
    }

    fn to_json(&self, config: &OutputConfig) -> String {
        JsonOutput::format_envelope(self, !self.has_errors(), config)
    }
}

pub async fn run(path: &Path, config: OutputConfig) -> anyhow::Result<bool> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("could not read snapshot {}", path.display()))?;
    let mut snapshot = Snapshot::from_json(&text)
        .with_context(|| format!("{} is not a valid snapshot", path.display()))?;
    snapshot.validate()?;
    snapshot.sort_packages();

    let result = ExtractResult::from_snapshot(&snapshot);
    let success = !result.has_errors();
    Output::with_config(result, config).render()?;
    Ok(success)
}
