//! The `inaccel` block of a cloud-config document.
//!
//! ```yaml
//! #cloud-config
//! inaccel:
//!   xilinx.com/fpga-xilinx_u250: 2
//!   intel.com/fpga-arria10: "1"
//! packages:
//!   - htop
//! ```
//!
//! Every other key belongs to cloud-init and is ignored here.

use crate::error::DeclarationError;
use crate::quantity::{parse_quantity, QuantityError};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Top-level cloud-config keys this crate understands
#[derive(Debug, Default, Deserialize)]
struct CloudConfig {
    #[serde(default)]
    inaccel: Option<Mapping>,
}

/// Requested number of devices per accelerator resource name.
///
/// Iterates in lexicographic order of resource names, so the same
/// declaration always yields the same device numbering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceDeclaration {
    resources: BTreeMap<String, u64>,
}

impl ResourceDeclaration {
    /// Parse the `inaccel` block out of cloud-init user data.
    ///
    /// A document without `inaccel` (or with `inaccel: null`) is an empty
    /// declaration. A document that is not a mapping, an `inaccel` value that
    /// is not a mapping, or a quantity that is not a whole non-negative
    /// number is an error.
    pub fn from_user_data(user_data: &str) -> Result<Self, DeclarationError> {
        let document: Value = serde_yaml::from_str(user_data)?;
        if document.is_null() {
            debug!("cloud-config document is empty");
            return Ok(Self::default());
        }

        let config: CloudConfig = serde_yaml::from_value(document)?;
        let mut resources = BTreeMap::new();
        for (key, value) in config.inaccel.unwrap_or_default() {
            let resource = resource_name(&key)?;
            if resources.contains_key(&resource) {
                return Err(DeclarationError::DuplicateResource { resource });
            }
            let quantity = quantity_from_value(&value).map_err(|source| {
                DeclarationError::InvalidQuantity {
                    resource: resource.clone(),
                    value: render_value(&value),
                    source,
                }
            })?;
            resources.insert(resource, quantity);
        }

        debug!(resources = resources.len(), "parsed accelerator declaration");
        Ok(Self { resources })
    }

    /// Resource names with their quantities, in iteration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.resources.iter().map(|(name, quantity)| (name.as_str(), *quantity))
    }

    /// Quantity declared for `resource`
    #[cfg(test)]
    pub(crate) fn get(&self, resource: &str) -> Option<u64> {
        self.resources.get(resource).copied()
    }

    /// Number of declared resource names (including zero quantities)
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether no resource is declared
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Total number of owned devices this declaration produces
    pub fn total_devices(&self) -> u64 {
        self.resources
            .values()
            .fold(0u64, |total, quantity| total.saturating_add(*quantity))
    }

    /// Reject declarations that would produce more than `limit` devices.
    pub fn ensure_within(&self, limit: u64) -> Result<(), DeclarationError> {
        let requested = self.total_devices();
        if requested > limit {
            return Err(DeclarationError::TooManyDevices { requested, limit });
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for ResourceDeclaration {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        Self {
            resources: iter
                .into_iter()
                .map(|(name, quantity)| (name.into(), quantity))
                .collect(),
        }
    }
}

/// Resource names are mapping keys; scalar keys such as `1` or `true` are
/// read as their string form.
fn resource_name(key: &Value) -> Result<String, DeclarationError> {
    match key {
        Value::String(name) => Ok(name.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        other => Err(DeclarationError::InvalidResourceName {
            key: render_value(other),
        }),
    }
}

/// Quantities may be written as YAML numbers or as quantity strings.
/// `null` counts as zero, like an unset `resource.Quantity`.
fn quantity_from_value(value: &Value) -> Result<u64, QuantityError> {
    match value {
        Value::Null => Ok(0),
        Value::Number(number) => parse_quantity(&number.to_string()),
        Value::String(text) => parse_quantity(text),
        _ => Err(QuantityError::Malformed),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        other => serde_yaml::to_string(other)
            .map(|rendered| rendered.trim_end().to_string())
            .unwrap_or_else(|_| format!("{other:?}")),
    }
}
