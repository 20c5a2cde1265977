//! Tagged wire value with positional accessors.
//!
//! Response trees are nested JSON arrays where position, not name, carries
//! meaning. `Value` models exactly the leaf types the wire permits and
//! makes every positional access explicit and fallible, so a shape change
//! upstream surfaces as a typed error at the access site rather than a
//! panic or a silently-propagated null.

use crate::ProtocolError;

/// One node of a wire value tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Null,
	Bool(bool),
	Number(serde_json::Number),
	String(String),
	Seq(Vec<Value>),
}

impl Value {
	/// Builds a sequence node from anything yielding values.
	pub fn seq<I>(items: I) -> Self
	where
		I: IntoIterator<Item = Value>,
	{
		Value::Seq(items.into_iter().collect())
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	fn kind(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Bool(_) => "bool",
			Value::Number(_) => "number",
			Value::String(_) => "string",
			Value::Seq(_) => "sequence",
		}
	}

	/// Borrows the elements of a sequence node.
	pub fn elements(&self) -> Result<&[Value], ProtocolError> {
		match self {
			Value::Seq(items) => Ok(items),
			other => Err(ProtocolError::Type {
				expected: "sequence",
				found: other.kind(),
			}),
		}
	}

	/// Positional access into a sequence node. Out-of-range and non-sequence
	/// access both fail loudly.
	pub fn get(&self, index: usize) -> Result<&Value, ProtocolError> {
		let items = self.elements()?;
		items.get(index).ok_or(ProtocolError::Index {
			index,
			len: items.len(),
		})
	}

	/// Positional access that tolerates short or missing rows. `Null` nodes
	/// also read as absent, matching how the wire pads optional slots.
	pub fn get_opt(&self, index: usize) -> Option<&Value> {
		match self {
			Value::Seq(items) => items.get(index).filter(|v| !v.is_null()),
			_ => None,
		}
	}

	pub fn str(&self) -> Result<&str, ProtocolError> {
		match self {
			Value::String(s) => Ok(s),
			other => Err(ProtocolError::Type {
				expected: "string",
				found: other.kind(),
			}),
		}
	}

	pub fn number(&self) -> Result<f64, ProtocolError> {
		match self {
			Value::Number(n) => n.as_f64().ok_or(ProtocolError::Type {
				expected: "finite number",
				found: "number",
			}),
			other => Err(ProtocolError::Type {
				expected: "number",
				found: other.kind(),
			}),
		}
	}

	pub fn integer(&self) -> Result<i64, ProtocolError> {
		match self {
			Value::Number(n) => n.as_i64().ok_or(ProtocolError::Type {
				expected: "integer",
				found: "number",
			}),
			other => Err(ProtocolError::Type {
				expected: "integer",
				found: other.kind(),
			}),
		}
	}

	pub fn boolean(&self) -> Result<bool, ProtocolError> {
		match self {
			Value::Bool(b) => Ok(*b),
			other => Err(ProtocolError::Type {
				expected: "bool",
				found: other.kind(),
			}),
		}
	}

	/// Converts a parsed JSON tree into a wire value. Objects are rejected:
	/// the protocol carries positional arrays only, and an object in a frame
	/// means the assumed shape is wrong.
	pub fn from_json(json: serde_json::Value) -> Result<Self, ProtocolError> {
		match json {
			serde_json::Value::Null => Ok(Value::Null),
			serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
			serde_json::Value::Number(n) => Ok(Value::Number(n)),
			serde_json::Value::String(s) => Ok(Value::String(s)),
			serde_json::Value::Array(items) => items
				.into_iter()
				.map(Value::from_json)
				.collect::<Result<Vec<_>, _>>()
				.map(Value::Seq),
			serde_json::Value::Object(_) => Err(ProtocolError::UnexpectedObject),
		}
	}

	pub fn from_json_str(raw: &str) -> Result<Self, ProtocolError> {
		let json: serde_json::Value = serde_json::from_str(raw)?;
		Self::from_json(json)
	}

	pub fn to_json(&self) -> serde_json::Value {
		match self {
			Value::Null => serde_json::Value::Null,
			Value::Bool(b) => serde_json::Value::Bool(*b),
			Value::Number(n) => serde_json::Value::Number(n.clone()),
			Value::String(s) => serde_json::Value::String(s.clone()),
			Value::Seq(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
		}
	}

	/// Compact JSON rendering, as the wire expects (no whitespace).
	pub fn to_json_string(&self) -> String {
		self.to_json().to_string()
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Value::Bool(b)
	}
}

impl From<i64> for Value {
	fn from(n: i64) -> Self {
		Value::Number(n.into())
	}
}

impl From<i32> for Value {
	fn from(n: i32) -> Self {
		Value::Number(n.into())
	}
}

impl From<u32> for Value {
	fn from(n: u32) -> Self {
		Value::Number(n.into())
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Value::String(s.to_string())
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Value::String(s)
	}
}

impl From<Vec<Value>> for Value {
	fn from(items: Vec<Value>) -> Self {
		Value::Seq(items)
	}
}

impl<T> From<Option<T>> for Value
where
	T: Into<Value>,
{
	fn from(opt: Option<T>) -> Self {
		match opt {
			Some(v) => v.into(),
			None => Value::Null,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn integers_round_trip_without_float_rendering() {
		let v = Value::seq([Value::from(1), Value::from(2)]);
		assert_eq!(v.to_json_string(), "[1,2]");
	}

	#[test]
	fn get_fails_loudly_out_of_range() {
		let v = Value::seq([Value::Null]);
		let err = v.get(3).unwrap_err();
		assert!(matches!(err, ProtocolError::Index { index: 3, len: 1 }));
	}

	#[test]
	fn get_fails_loudly_on_non_sequence() {
		let v = Value::from("leaf");
		assert!(matches!(v.get(0), Err(ProtocolError::Type { .. })));
	}

	#[test]
	fn get_opt_treats_null_slots_as_absent() {
		let v = Value::seq([Value::Null, Value::from("x")]);
		assert!(v.get_opt(0).is_none());
		assert_eq!(v.get_opt(1).unwrap().str().unwrap(), "x");
		assert!(v.get_opt(9).is_none());
	}

	#[test]
	fn objects_are_rejected() {
		let err = Value::from_json_str(r#"[{"a":1}]"#).unwrap_err();
		assert!(matches!(err, ProtocolError::UnexpectedObject));
	}

	#[test]
	fn json_round_trip_preserves_nesting() {
		let raw = r#"[null,[["a",1],[true,2.5]],"b"]"#;
		let v = Value::from_json_str(raw).unwrap();
		assert_eq!(v.to_json_string(), raw);
	}
}
