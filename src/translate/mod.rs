//! Bidirectional conversion between typed values and their textual
//! representation, keyed by a datatype identifier.
//!
//! Readers use translators to turn metadata text into typed [ObjectValue]s;
//! writers use them for the reverse. Every translator funnels native parse
//! failures into the single
//! [InvalidObjectData](crate::error::StreamErrorKind::InvalidObjectData)
//! error kind, which is recoverable at the call site and never silently
//! substituted.
//!
//! The scalar translators here cover the types the built-in formats need;
//! the bracketed list syntax shared between formats lives in
//! [list](crate::translate::list).

pub mod list;

pub use list::ListTranslator;

use crate::error::StreamError;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

// =#========================================================================#=
// OBJECT VALUE
// =#========================================================================#=
/// A typed value produced or consumed by a translator.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectValue {
    Text(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    List(Vec<ObjectValue>),
}

impl fmt::Display for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ObjectValue::Text(text) => write!(f, "{text}"),
            ObjectValue::Integer(value) => write!(f, "{value}"),
            ObjectValue::Double(value) => write!(f, "{value}"),
            ObjectValue::Boolean(value) => write!(f, "{value}"),
            ObjectValue::List(items) => {
                write!(f, "{}", list::format_list(items))
            }
        }
    }
}

// =#========================================================================#=
// OBJECT TRANSLATOR (Trait)
// =#========================================================================#=
/// A registered bidirectional converter for one datatype identifier.
///
/// Datatype identifiers follow the XML Schema qualified names used in
/// phylogenetic metadata (`xsd:int`, `xsd:double`, ...).
///
/// Types without a faithful string form may additionally support a richer
/// XML path; [supports_xml](ObjectTranslator::supports_xml) reports whether
/// one exists. None of the built-in scalar translators need it.
pub trait ObjectTranslator: Send + Sync {
    /// The datatype identifier this translator is registered under.
    fn datatype(&self) -> &str;

    /// Converts a value to its textual representation.
    ///
    /// # Errors
    /// Returns InvalidObjectData if the value's variant does not match this
    /// translator's datatype.
    fn to_text(&self, value: &ObjectValue) -> Result<String, StreamError>;

    /// Parses a textual representation into a typed value.
    ///
    /// # Errors
    /// Returns InvalidObjectData if the text is not a valid representation.
    fn from_text(&self, text: &str) -> Result<ObjectValue, StreamError>;

    /// Whether this translator offers an XML read/write path beyond the
    /// string form.
    fn supports_xml(&self) -> bool {
        false
    }
}

// =#========================================================================#=
// SCALAR TRANSLATORS
// =#========================================================================#=
/// Identity translator for plain strings (`xsd:string`).
#[derive(Debug, Default)]
pub struct StringTranslator;

impl ObjectTranslator for StringTranslator {
    fn datatype(&self) -> &str {
        "xsd:string"
    }

    fn to_text(&self, value: &ObjectValue) -> Result<String, StreamError> {
        match value {
            ObjectValue::Text(text) => Ok(text.clone()),
            other => Err(StreamError::invalid_object_data(format!(
                "expected a string value, got {other:?}"
            ))),
        }
    }

    fn from_text(&self, text: &str) -> Result<ObjectValue, StreamError> {
        Ok(ObjectValue::Text(text.to_string()))
    }
}

/// Translator for signed integers (`xsd:int`).
#[derive(Debug, Default)]
pub struct IntegerTranslator;

impl ObjectTranslator for IntegerTranslator {
    fn datatype(&self) -> &str {
        "xsd:int"
    }

    fn to_text(&self, value: &ObjectValue) -> Result<String, StreamError> {
        match value {
            ObjectValue::Integer(value) => Ok(value.to_string()),
            other => Err(StreamError::invalid_object_data(format!(
                "expected an integer value, got {other:?}"
            ))),
        }
    }

    fn from_text(&self, text: &str) -> Result<ObjectValue, StreamError> {
        text.trim()
            .parse::<i64>()
            .map(ObjectValue::Integer)
            .map_err(|_| StreamError::invalid_object_data(format!("not an integer: '{text}'")))
    }
}

/// Translator for double-precision floats (`xsd:double`).
#[derive(Debug, Default)]
pub struct DoubleTranslator;

impl ObjectTranslator for DoubleTranslator {
    fn datatype(&self) -> &str {
        "xsd:double"
    }

    fn to_text(&self, value: &ObjectValue) -> Result<String, StreamError> {
        match value {
            ObjectValue::Double(value) => Ok(value.to_string()),
            ObjectValue::Integer(value) => Ok(value.to_string()),
            other => Err(StreamError::invalid_object_data(format!(
                "expected a numeric value, got {other:?}"
            ))),
        }
    }

    fn from_text(&self, text: &str) -> Result<ObjectValue, StreamError> {
        text.trim()
            .parse::<f64>()
            .map(ObjectValue::Double)
            .map_err(|_| StreamError::invalid_object_data(format!("not a number: '{text}'")))
    }
}

/// Translator for booleans (`xsd:boolean`), accepting `true/false/1/0`.
#[derive(Debug, Default)]
pub struct BooleanTranslator;

impl ObjectTranslator for BooleanTranslator {
    fn datatype(&self) -> &str {
        "xsd:boolean"
    }

    fn to_text(&self, value: &ObjectValue) -> Result<String, StreamError> {
        match value {
            ObjectValue::Boolean(value) => Ok(value.to_string()),
            other => Err(StreamError::invalid_object_data(format!(
                "expected a boolean value, got {other:?}"
            ))),
        }
    }

    fn from_text(&self, text: &str) -> Result<ObjectValue, StreamError> {
        match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(ObjectValue::Boolean(true)),
            "false" | "0" => Ok(ObjectValue::Boolean(false)),
            other => Err(StreamError::invalid_object_data(format!(
                "not a boolean: '{other}'"
            ))),
        }
    }
}

// =#========================================================================#=
// TRANSLATOR REGISTRY
// =#========================================================================#=
/// Lookup of translators by datatype identifier.
///
/// [TranslatorRegistry::default] carries the built-in scalar and list
/// translators; applications register additional datatypes on top.
///
/// # Example
/// ```
/// use phylostream::translate::{default_registry, ObjectValue};
///
/// let translator = default_registry().translator("xsd:int").unwrap();
/// assert_eq!(translator.from_text("42").unwrap(), ObjectValue::Integer(42));
/// ```
pub struct TranslatorRegistry {
    translators: HashMap<String, Arc<dyn ObjectTranslator>>,
}

impl TranslatorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self { translators: HashMap::new() }
    }

    /// Registers a translator under its datatype identifier, replacing any
    /// previous registration for the same identifier.
    pub fn register(&mut self, translator: Arc<dyn ObjectTranslator>) {
        self.translators
            .insert(translator.datatype().to_string(), translator);
    }

    /// Looks up the translator for a datatype identifier.
    pub fn translator(&self, datatype: &str) -> Option<&Arc<dyn ObjectTranslator>> {
        self.translators.get(datatype)
    }
}

impl Default for TranslatorRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(StringTranslator));
        registry.register(Arc::new(IntegerTranslator));
        registry.register(Arc::new(DoubleTranslator));
        registry.register(Arc::new(BooleanTranslator));
        registry.register(Arc::new(ListTranslator));
        registry
    }
}

static DEFAULT_REGISTRY: Lazy<TranslatorRegistry> = Lazy::new(TranslatorRegistry::default);

/// The shared registry of built-in translators.
pub fn default_registry() -> &'static TranslatorRegistry {
    &DEFAULT_REGISTRY
}
