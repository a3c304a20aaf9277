//! The shared instance variable behind every facade function.
//!
//! The variable input accepts an optional shape sigil and explicit type
//! arguments:
//!
//! ```text
//! Instance            auto shape
//! *Instance           value:      var Instance T
//! &Instance           reference:  var Instance *T
//! &Cache[int, *os.File]
//! ```

use lazy_static::lazy_static;
use regex::Regex;

use crate::emit::TypeWriter;
use crate::error::{FacadeError, Result};
use crate::syntax::{is_scalar, TypeExpr, TypeKind};

/// Variable name used when none is given.
pub const DEFAULT_VARIABLE: &str = "Instance";

lazy_static! {
    static ref VARIABLE_PATTERN: Regex =
        Regex::new(r"^([*&]?)\s*([A-Za-z_][A-Za-z0-9_]*)?\s*(?:\[(.*)\])?$").unwrap();
}

/// Declaration shape of the instance variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Decided from the target type.
    Auto,
    Value,
    Reference,
}

impl Shape {
    /// Whether the declaration is a pointer.
    ///
    /// `first_receiver` is the pointer flag of the first exported method.
    pub fn is_reference(&self, kind: TypeKind, first_receiver: Option<bool>) -> bool {
        match self {
            Shape::Value => false,
            Shape::Reference => true,
            Shape::Auto if kind.is_value_shaped() => false,
            Shape::Auto => first_receiver.unwrap_or(true),
        }
    }
}

/// Parsed variable input.
#[derive(Debug, Clone)]
pub struct InstanceSpec {
    pub name: String,
    pub shape: Shape,
    /// Concrete type arguments for a generic target (output form).
    pub arguments: Vec<TypeExpr>,
}

impl InstanceSpec {
    /// Parse the variable input; `package` qualifies bare non-builtin names.
    pub fn parse(input: &str, package: &str) -> Result<Self> {
        let input = input.trim();
        let captures = VARIABLE_PATTERN.captures(input).ok_or_else(|| {
            FacadeError::parser_warning(format!("invalid variable declaration {:?}", input))
        })?;

        let shape = match captures.get(1).map(|m| m.as_str()) {
            Some("*") => Shape::Value,
            Some("&") => Shape::Reference,
            _ => Shape::Auto,
        };
        let name = captures
            .get(2)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| DEFAULT_VARIABLE.to_string());
        let arguments = match captures.get(3) {
            Some(list) if !list.as_str().trim().is_empty() => split_top_level(list.as_str())
                .into_iter()
                .map(|arg| parse_type_argument(arg, package))
                .collect::<Result<Vec<_>>>()?,
            _ => Vec::new(),
        };

        Ok(Self {
            name,
            shape,
            arguments,
        })
    }
}

impl Default for InstanceSpec {
    fn default() -> Self {
        Self {
            name: DEFAULT_VARIABLE.to_string(),
            shape: Shape::Auto,
            arguments: Vec::new(),
        }
    }
}

/// Resolved instance declaration: `var <name> [*]<target>[args]`.
#[derive(Debug, Clone)]
pub struct InstanceDecl {
    pub name: String,
    pub target: TypeExpr,
    pub reference: bool,
}

impl InstanceDecl {
    pub fn new(spec: &InstanceSpec, package: &str, target: &str, reference: bool) -> Self {
        let base = TypeExpr::Qualified {
            path: package.to_string(),
            name: target.to_string(),
        };
        let target = if spec.arguments.is_empty() {
            base
        } else {
            TypeExpr::Generic {
                base: Box::new(base),
                args: spec.arguments.clone(),
            }
        };
        Self {
            name: spec.name.clone(),
            target,
            reference,
        }
    }

    pub fn render(&self, writer: &mut TypeWriter<'_>) -> Result<String> {
        let ty = writer.write_type(&self.target, 0)?;
        let pointer = if self.reference { "*" } else { "" };
        Ok(format!("var {} {}{}", self.name, pointer, ty))
    }
}

/// Split on commas that are not nested inside brackets.
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, c) in list.char_indices() {
        match c {
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(list[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(list[start..].trim());
    parts
}

/// Parse a type argument written on the command line.
///
/// Qualified names use the full import path: `github.com/x/y.Name`.
fn parse_type_argument(text: &str, package: &str) -> Result<TypeExpr> {
    let text = text.trim();
    let invalid = || FacadeError::parser_warning(format!("invalid type argument {:?}", text));

    if text.is_empty() {
        return Err(invalid());
    }
    if let Some(rest) = text.strip_prefix('*') {
        return Ok(TypeExpr::Pointer(Box::new(parse_type_argument(rest, package)?)));
    }
    if let Some(rest) = text.strip_prefix("[]") {
        return Ok(TypeExpr::Slice(Box::new(parse_type_argument(rest, package)?)));
    }
    if let Some(rest) = text.strip_prefix('[') {
        let close = rest.find(']').ok_or_else(invalid)?;
        return Ok(TypeExpr::Array {
            len: rest[..close].trim().to_string(),
            elem: Box::new(parse_type_argument(&rest[close + 1..], package)?),
        });
    }
    if let Some(rest) = text.strip_prefix("map[") {
        let close = matching_bracket(rest).ok_or_else(invalid)?;
        return Ok(TypeExpr::Map {
            key: Box::new(parse_type_argument(&rest[..close], package)?),
            value: Box::new(parse_type_argument(&rest[close + 1..], package)?),
        });
    }
    if text.ends_with(']') {
        if let Some(open) = text.find('[') {
            let base = parse_type_argument(&text[..open], package)?;
            let args = split_top_level(&text[open + 1..text.len() - 1])
                .into_iter()
                .map(|arg| parse_type_argument(arg, package))
                .collect::<Result<Vec<_>>>()?;
            return Ok(TypeExpr::Generic {
                base: Box::new(base),
                args,
            });
        }
    }
    if text.starts_with("func") || text.starts_with("chan") || text.contains(' ') {
        return Ok(TypeExpr::Raw(text.to_string()));
    }

    let last_slash = text.rfind('/').map(|i| i + 1).unwrap_or(0);
    match text[last_slash..].rfind('.') {
        Some(dot) => {
            let dot = last_slash + dot;
            Ok(TypeExpr::Qualified {
                path: text[..dot].to_string(),
                name: text[dot + 1..].to_string(),
            })
        }
        None if is_scalar(text) => Ok(TypeExpr::Named(text.to_string())),
        None => Ok(TypeExpr::Qualified {
            path: package.to_string(),
            name: text.to_string(),
        }),
    }
}

/// Index of the `]` closing an already opened bracket.
fn matching_bracket(text: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (index, c) in text.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}
