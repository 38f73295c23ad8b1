//! Typed argument schemas, rendered in the host's signature syntax.

use serde_json::{Map, Value};
use std::fmt;

use super::FilterError;

/// Type of one filter argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// A frame source, passed out of band by the host.
    Clip,
    Int,
    Float,
    /// String or binary blob.
    Data,
}

impl ParamType {
    fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::Clip => false,
            ParamType::Int => value.is_i64() || value.is_u64(),
            ParamType::Float => value.is_number(),
            ParamType::Data => value.is_string(),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Clip => f.write_str("clip"),
            ParamType::Int => f.write_str("int"),
            ParamType::Float => f.write_str("float"),
            ParamType::Data => f.write_str("data"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub ty: ParamType,
    pub optional: bool,
}

impl ParamSpec {
    pub const fn required(name: &'static str, ty: ParamType) -> Self {
        Self {
            name,
            ty,
            optional: false,
        }
    }

    pub const fn optional(name: &'static str, ty: ParamType) -> Self {
        Self {
            name,
            ty,
            optional: true,
        }
    }
}

/// Name and argument list of one filter constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSignature {
    pub name: &'static str,
    pub params: &'static [ParamSpec],
}

impl FilterSignature {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Render as `name:type[:opt];...`.
    pub fn to_signature_string(&self) -> String {
        self.params
            .iter()
            .map(|p| {
                if p.optional {
                    format!("{}:{}:opt;", p.name, p.ty)
                } else {
                    format!("{}:{};", p.name, p.ty)
                }
            })
            .collect()
    }

    /// Check `args` against the schema: every name known, every value of
    /// the declared type, every required argument present.
    ///
    /// Clip arguments are supplied separately and must not appear in `args`.
    pub fn check_args(&self, args: &Map<String, Value>) -> Result<(), FilterError> {
        for (name, value) in args {
            let Some(spec) = self.param(name) else {
                return Err(FilterError::UnknownArgument {
                    filter: self.name,
                    name: name.clone(),
                });
            };
            if !spec.ty.matches(value) {
                return Err(FilterError::ArgumentType {
                    filter: self.name,
                    name: spec.name,
                    expected: spec.ty,
                });
            }
        }

        let missing = self
            .params
            .iter()
            .filter(|p| !p.optional && p.ty != ParamType::Clip)
            .find(|p| !args.contains_key(p.name));
        if let Some(spec) = missing {
            return Err(FilterError::MissingArgument {
                filter: self.name,
                name: spec.name,
            });
        }
        Ok(())
    }
}

/// Accept host integers as booleans (non-zero is true).
pub(crate) fn int_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = <i64 as serde::Deserialize>::deserialize(deserializer)?;
    Ok(value != 0)
}
