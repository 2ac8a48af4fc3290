//! Declared probe matrices
//!
//! A matrix is an ordered list of resource-area groups, each an ordered list
//! of probes. It encodes the authorization policy under test. The store
//! default is built in; additional matrices are read from YAML:
//!
//! ```yaml
//! name: store-permissions
//! groups:
//!   - title: Roles (/admin/roles)
//!     probes:
//!       - { method: GET, path: /admin/roles, identity: admin, expected_status: 200 }
//!       - { method: GET, path: /admin/roles, expected_status: 401 }
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{HarnessError, HarnessResult};
use crate::probe::Probe;

/// Probes for one resource area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeGroup {
    pub title: String,
    pub probes: Vec<Probe>,
}

impl ProbeGroup {
    pub fn new(title: impl Into<String>, probes: Vec<Probe>) -> Self {
        Self {
            title: title.into(),
            probes,
        }
    }
}

/// Full set of probes, grouped and ordered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeMatrix {
    #[serde(default = "default_matrix_name")]
    pub name: String,
    pub groups: Vec<ProbeGroup>,
}

fn default_matrix_name() -> String {
    "unnamed".to_string()
}

impl ProbeMatrix {
    /// Authorization policy of the store API
    pub fn store_default() -> Self {
        let new_user = json!({
            "name": "New User",
            "email": "newuser@example.com",
            "password": "password123",
            "phone": "1234567890"
        });
        let new_product = json!({
            "name": "Test Product",
            "price": 100,
            "description": "A test product"
        });

        Self {
            name: "store-permissions".to_string(),
            groups: vec![
                ProbeGroup::new(
                    "User Management (/users)",
                    vec![
                        Probe::new("GET", "/users", Some("admin"), 200),
                        Probe::new("GET", "/users", Some("customer"), 403),
                        Probe::new("GET", "/users", None, 401),
                        Probe::new("POST", "/users", Some("admin"), 201).with_payload(new_user),
                    ],
                ),
                ProbeGroup::new(
                    "Roles (/admin/roles)",
                    vec![
                        Probe::new("GET", "/admin/roles", Some("admin"), 200),
                        Probe::new("GET", "/admin/roles", Some("customer"), 403),
                        Probe::new("GET", "/admin/roles", None, 401),
                    ],
                ),
                ProbeGroup::new(
                    "Permissions (/admin/permissions)",
                    vec![
                        Probe::new("GET", "/admin/permissions", Some("admin"), 200),
                        Probe::new("GET", "/admin/permissions", Some("customer"), 403),
                        Probe::new("GET", "/admin/permissions", None, 401),
                    ],
                ),
                ProbeGroup::new(
                    "Products (/shop)",
                    vec![
                        Probe::new("GET", "/shop/getall", None, 200),
                        Probe::new("POST", "/shop/create", Some("admin"), 201)
                            .with_payload(new_product.clone()),
                        Probe::new("POST", "/shop/create", Some("customer"), 403)
                            .with_payload(new_product),
                    ],
                ),
                ProbeGroup::new(
                    "Orders",
                    vec![
                        Probe::new("GET", "/orders/last", Some("customer"), 200),
                        Probe::new("GET", "/orders/last", None, 401),
                        Probe::new("GET", "/admin/orders", Some("admin"), 200),
                        Probe::new("GET", "/admin/orders", Some("customer"), 403),
                    ],
                ),
            ],
        }
    }

    pub fn from_yaml(yaml: &str) -> HarnessResult<Self> {
        let matrix: Self = serde_yaml::from_str(yaml)?;
        matrix.validate()?;
        Ok(matrix)
    }

    pub fn from_file(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| {
            HarnessError::MatrixParse(format!("{}: {}", path.display(), e))
        })
    }

    /// Load a single file, or merge every YAML file of a directory in path order
    pub fn load(path: &Path) -> HarnessResult<Self> {
        if path.is_file() {
            return Self::from_file(path);
        }

        let mut files: Vec<_> = walkdir::WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(HarnessError::MatrixParse(format!(
                "no matrix files found in {}",
                path.display()
            )));
        }

        let mut merged = Self {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(default_matrix_name),
            groups: Vec::new(),
        };
        for file in files {
            merged.groups.extend(Self::from_file(&file)?.groups);
        }
        Ok(merged)
    }

    fn validate(&self) -> HarnessResult<()> {
        for group in &self.groups {
            if group.title.trim().is_empty() {
                return Err(HarnessError::MatrixParse("group with empty title".to_string()));
            }
            for probe in &group.probes {
                if !(100..=599).contains(&probe.expected_status) {
                    return Err(HarnessError::MatrixParse(format!(
                        "{} {}: expected status {} is not an HTTP status",
                        probe.method, probe.path, probe.expected_status
                    )));
                }
            }
        }
        Ok(())
    }

    /// Keep only groups whose title contains `filter` (case-insensitive)
    pub fn filter_groups(mut self, filter: &str) -> Self {
        let needle = filter.to_lowercase();
        self.groups
            .retain(|g| g.title.to_lowercase().contains(&needle));
        self
    }

    pub fn probe_count(&self) -> usize {
        self.groups.iter().map(|g| g.probes.len()).sum()
    }

    pub fn probes(&self) -> impl Iterator<Item = &Probe> {
        self.groups.iter().flat_map(|g| g.probes.iter())
    }

    /// Identity names referenced by any probe
    pub fn referenced_identities(&self) -> BTreeSet<&str> {
        self.probes()
            .filter_map(|p| p.identity.as_deref())
            .collect()
    }

    /// Referenced identities missing from `declared`
    pub fn undeclared_identities<'m>(&'m self, declared: &[&str]) -> Vec<&'m str> {
        self.referenced_identities()
            .into_iter()
            .filter(|name| !declared.contains(name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_default_shape() {
        let matrix = ProbeMatrix::store_default();
        assert_eq!(matrix.groups.len(), 5);
        assert_eq!(matrix.probe_count(), 17);

        let first = &matrix.groups[0].probes[0];
        assert_eq!(first.method, "GET");
        assert_eq!(first.path, "/users");
        assert_eq!(first.identity.as_deref(), Some("admin"));
        assert_eq!(first.expected_status, 200);
    }

    #[test]
    fn test_store_default_policy_boundaries() {
        let matrix = ProbeMatrix::store_default();
        let find = |path: &str, identity: Option<&str>| {
            matrix
                .probes()
                .find(|p| p.path == path && p.identity.as_deref() == identity)
                .map(|p| p.expected_status)
        };

        // Authenticated but forbidden vs. not authenticated
        assert_eq!(find("/admin/roles", Some("customer")), Some(403));
        assert_eq!(find("/users", None), Some(401));
        assert_eq!(find("/shop/getall", None), Some(200));
    }

    #[test]
    fn test_payloads_only_on_create_probes() {
        let matrix = ProbeMatrix::store_default();
        for probe in matrix.probes() {
            assert_eq!(probe.payload.is_some(), probe.method == "POST", "{}", probe.path);
        }
    }

    #[test]
    fn test_referenced_identities() {
        let matrix = ProbeMatrix::store_default();
        let referenced: Vec<&str> = matrix.referenced_identities().into_iter().collect();
        assert_eq!(referenced, vec!["admin", "customer"]);
        assert_eq!(matrix.undeclared_identities(&["admin"]), vec!["customer"]);
    }

    #[test]
    fn test_filter_groups() {
        let matrix = ProbeMatrix::store_default().filter_groups("admin/");
        let titles: Vec<&str> = matrix.groups.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["Roles (/admin/roles)", "Permissions (/admin/permissions)"]);
    }

    #[test]
    fn test_parse_yaml_matrix() {
        let yaml = r#"
name: super-admin
groups:
  - title: Super admin
    probes:
      - method: GET
        path: /admin/roles
        identity: super_admin
        expected_status: 200
      - method: DELETE
        path: /admin/roles/1
        identity: customer
        expected_status: 403
"#;
        let matrix = ProbeMatrix::from_yaml(yaml).unwrap();
        assert_eq!(matrix.name, "super-admin");
        assert_eq!(matrix.probe_count(), 2);
        assert_eq!(matrix.groups[0].probes[1].method, "DELETE");
    }

    #[test]
    fn test_invalid_status_rejected() {
        let yaml = r#"
groups:
  - title: Broken
    probes:
      - { method: GET, path: /users, expected_status: 42 }
"#;
        let err = ProbeMatrix::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, HarnessError::MatrixParse(_)));
    }

    #[test]
    fn test_load_directory_merges_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b-orders.yaml"),
            "groups:\n  - title: Orders\n    probes:\n      - { method: GET, path: /orders/last, expected_status: 401 }\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a-users.yml"),
            "groups:\n  - title: Users\n    probes:\n      - { method: GET, path: /users, expected_status: 401 }\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let matrix = ProbeMatrix::load(dir.path()).unwrap();
        let titles: Vec<&str> = matrix.groups.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["Users", "Orders"]);
    }

    #[test]
    fn test_load_empty_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ProbeMatrix::load(dir.path()).is_err());
    }
}
