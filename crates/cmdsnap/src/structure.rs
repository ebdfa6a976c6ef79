use std::io::{Cursor, Read, Write};

use crate::error::{Result, SnapshotError};
use crate::format::FieldTag;
use crate::io::{ReadBeExt, WriteBeExt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Bytes(Vec<u8>),
    Text(String),
    TextList(Vec<String>),
}

impl Value {
    pub fn tag(&self) -> FieldTag {
        match self {
            Value::Integer(_) => FieldTag::Integer,
            Value::Bytes(_) => FieldTag::Bytes,
            Value::Text(_) => FieldTag::Text,
            Value::TextList(_) => FieldTag::TextList,
        }
    }

    fn encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<()> {
        match self {
            Value::Integer(n) => w.write_int_be(*n),
            Value::Bytes(bytes) => w.write_blob_be(bytes),
            Value::Text(text) => w.write_text_be(text),
            Value::TextList(items) => {
                w.write_len_be(items.len(), "list count")?;
                for item in items {
                    w.write_text_be(item)?;
                }
                Ok(())
            }
        }
    }
}

/// One `(tag, key, value)` entry of a [`Structure`]. The tag always agrees with the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    key: String,
    value: Value,
}

impl Parameter {
    /// # Panics
    ///
    /// Panics if `tag` is [`FieldTag::End`] or does not describe `value`. Both are caller bugs,
    /// not data errors.
    pub fn new(tag: FieldTag, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        assert!(
            tag != FieldTag::End,
            "parameter {key:?}: the end sentinel cannot be stored as a parameter"
        );
        assert_eq!(
            value.tag(),
            tag,
            "parameter {key:?}: value shape does not match its tag"
        );
        Self { key, value }
    }

    pub fn tag(&self) -> FieldTag {
        self.value.tag()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Ordered, sentinel-terminated sequence of tagged parameters.
///
/// Insertion order is wire order. Keys may repeat; lookups return the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Structure {
    params: Vec<Parameter>,
}

impl Structure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Owning builder form of [`Structure::push`].
    pub fn with(mut self, tag: FieldTag, key: impl Into<String>, value: Value) -> Self {
        self.push(tag, key, value);
        self
    }

    /// Appends a parameter. See [`Parameter::new`] for the panic conditions.
    pub fn push(&mut self, tag: FieldTag, key: impl Into<String>, value: Value) -> &mut Self {
        self.params.push(Parameter::new(tag, key, value));
        self
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, key: &str) -> Result<&Parameter> {
        self.params
            .iter()
            .find(|p| p.key == key)
            .ok_or_else(|| SnapshotError::KeyNotFound(key.to_string()))
    }

    pub fn integer(&self, key: &str) -> Result<i64> {
        match self.typed(key, FieldTag::Integer)? {
            Value::Integer(n) => Ok(*n),
            _ => unreachable!("typed() checked the tag"),
        }
    }

    pub fn bytes(&self, key: &str) -> Result<&[u8]> {
        match self.typed(key, FieldTag::Bytes)? {
            Value::Bytes(bytes) => Ok(bytes),
            _ => unreachable!("typed() checked the tag"),
        }
    }

    pub fn text(&self, key: &str) -> Result<&str> {
        match self.typed(key, FieldTag::Text)? {
            Value::Text(text) => Ok(text),
            _ => unreachable!("typed() checked the tag"),
        }
    }

    pub fn text_list(&self, key: &str) -> Result<&[String]> {
        match self.typed(key, FieldTag::TextList)? {
            Value::TextList(items) => Ok(items),
            _ => unreachable!("typed() checked the tag"),
        }
    }

    fn typed(&self, key: &str, expected: FieldTag) -> Result<&Value> {
        let param = self.get(key)?;
        if param.tag() != expected {
            return Err(SnapshotError::TypeMismatch {
                key: key.to_string(),
                expected,
                found: param.tag(),
            });
        }
        Ok(param.value())
    }

    /// Writes every parameter in order, then the sentinel with an empty key.
    ///
    /// An `OutOfRange` failure leaves the fields before it already written; callers that need
    /// all-or-nothing output should encode into a buffer first (see [`Structure::to_bytes`]).
    pub fn encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<()> {
        for param in &self.params {
            w.write_field_header(param.tag(), &param.key)?;
            param.value.encode(w)?;
        }
        w.write_field_header(FieldTag::End, "")
    }

    /// Reads fields until the sentinel. Bytes after the sentinel are left unread.
    pub fn decode<R: Read + ?Sized>(r: &mut R) -> Result<Self> {
        let mut params = Vec::new();
        loop {
            let (tag, key) = r.read_field_header()?;
            let value = match tag {
                FieldTag::Integer => Value::Integer(i64::from(r.read_int_be()?)),
                FieldTag::Bytes => Value::Bytes(r.read_blob_be()?),
                FieldTag::Text => Value::Text(r.read_text_be()?),
                FieldTag::TextList => {
                    let count = r.read_len_be("list count")?;
                    let mut items = Vec::with_capacity((count as usize).min(64));
                    for _ in 0..count {
                        items.push(r.read_text_be()?);
                    }
                    Value::TextList(items)
                }
                // The sentinel key is ignored; older writers stored "\0" there.
                FieldTag::End => break,
            };
            params.push(Parameter { key, value });
        }
        Ok(Self { params })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode(&mut out)?;
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::decode(&mut Cursor::new(bytes))
    }
}

impl<'a> IntoIterator for &'a Structure {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}
