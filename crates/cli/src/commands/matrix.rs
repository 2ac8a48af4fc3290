//! Matrix Command

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use storecheck_harness::ProbeMatrix;

use crate::commands::probe::load_matrix;
use crate::output::{print_list, OutputFormat, TableDisplay};

#[derive(Args, Clone)]
pub struct MatrixArgs {
    /// Matrix YAML file or directory (defaults to the built-in store matrix)
    #[arg(short, long)]
    pub matrix: Option<PathBuf>,
}

/// One probe row for display
#[derive(Serialize)]
pub struct ProbeRow {
    pub group: String,
    pub method: String,
    pub path: String,
    pub identity: String,
    pub expected_status: u16,
    pub payload: bool,
}

impl TableDisplay for ProbeRow {
    fn headers() -> Vec<&'static str> {
        vec!["Group", "Method", "Path", "Identity", "Expected", "Payload"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.group.clone(),
            self.method.clone(),
            self.path.clone(),
            self.identity.clone(),
            self.expected_status.to_string(),
            if self.payload { "yes" } else { "-" }.to_string(),
        ]
    }
}

pub fn rows(matrix: &ProbeMatrix) -> Vec<ProbeRow> {
    matrix
        .groups
        .iter()
        .flat_map(|group| {
            group.probes.iter().map(move |probe| ProbeRow {
                group: group.title.clone(),
                method: probe.method.clone(),
                path: probe.path.clone(),
                identity: probe.identity_label().to_string(),
                expected_status: probe.expected_status,
                payload: probe.payload.is_some(),
            })
        })
        .collect()
}

pub fn execute(args: MatrixArgs, format: OutputFormat) -> Result<()> {
    let matrix = load_matrix(args.matrix.as_ref())?;
    print_list(&rows(&matrix), format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_follow_declaration_order() {
        let rows = rows(&ProbeMatrix::store_default());
        assert_eq!(rows.len(), 17);
        assert_eq!(rows[0].row(), vec!["User Management (/users)", "GET", "/users", "admin", "200", "-"]);
        assert_eq!(rows[2].identity, "Unauth");
        assert!(rows[3].payload);
        assert_eq!(rows[16].group, "Orders");
    }
}
