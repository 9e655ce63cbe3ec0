use std::fmt;
use std::fmt::Formatter;

/// Represents an Ember user-function record. The function's code lives in the
/// chunk that defined it; `entry_ip` is the offset of its first instruction.
/// A record deserialized from a compiled file has no entry point, and can only
/// be called in the process that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct UserFunc {
   pub name: String,
   pub params: Vec<String>,
   pub entry_ip: Option<usize>,
}

/// Represents an Ember function value. Built-ins are identified by name and
/// resolved against the embedder-provided environment at call time.
#[derive(Clone, Debug, PartialEq)]
pub enum FuncValue {
   Builtin(String),
   User(UserFunc),
}

impl fmt::Display for FuncValue {
   fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
      match self {
         FuncValue::Builtin(name) => write!(f, "<NativeFunc '{}'>", name),
         FuncValue::User(func) if func.name == "fn" => write!(f, "<Func '<lambda>'>"),
         FuncValue::User(func) => write!(f, "<Func '{}'>", func.name),
      }
   }
}

/// Represents an Ember object: an ordered mapping from string keys to values.
/// Insertion order is preserved, and overwriting a key keeps its position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectValue {
   entries: Vec<(String, Value)>,
}

impl ObjectValue {
   pub fn new() -> Self {
      Self { entries: vec![] }
   }

   pub fn len(&self) -> usize {
      self.entries.len()
   }

   pub fn is_empty(&self) -> bool {
      self.entries.is_empty()
   }

   /// Looks up the value stored under the given key.
   pub fn get(&self, key: &str) -> Option<&Value> {
      self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
   }

   pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
      self.entries.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
   }

   /// Inserts or replaces the value stored under the given key. Replacing a
   /// key does not change its position in the insertion order.
   pub fn insert(&mut self, key: String, value: Value) {
      match self.entries.iter().position(|(k, _)| *k == key) {
         Some(idx) => self.entries[idx].1 = value,
         None => self.entries.push((key, value)),
      }
   }

   /// The object's keys, in insertion order.
   pub fn keys(&self) -> impl Iterator<Item = &str> {
      self.entries.iter().map(|(k, _)| k.as_str())
   }

   pub fn iter(&self) -> impl Iterator<Item = &(String, Value)> {
      self.entries.iter()
   }

   /// Copies every entry of `source` into this object, overwriting on
   /// conflict. Used to apply mixins.
   pub fn merge_from(&mut self, source: &ObjectValue) {
      for (key, value) in source.iter() {
         self.insert(key.clone(), value.clone());
      }
   }
}

/// All types of values in Ember. Every container variant owns its contents:
/// cloning a value is a deep copy, and two distinct values never share
/// storage.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
   Null,
   Bool(bool),
   Number(f64),
   String(String),
   Array(Vec<Value>),
   Object(ObjectValue),
   Function(FuncValue),
}

impl Value {
   /// Gets the string type name of this value.
   pub fn type_name(&self) -> &'static str {
      match self {
         Value::Null => "Null",
         Value::Bool(_) => "Boolean",
         Value::Number(_) => "Number",
         Value::String(_) => "String",
         Value::Array(_) => "Array",
         Value::Object(_) => "Object",
         Value::Function(_) => "Function",
      }
   }

   /// Checks that this value is falsey. The falsey values are `false`, `0`,
   /// `null`, and the empty string; everything else is truthy.
   pub fn is_falsey(&self) -> bool {
      match self {
         Value::Null => true,
         Value::Bool(b) => !b,
         Value::Number(n) => *n == 0f64,
         Value::String(s) => s.is_empty(),
         _ => false,
      }
   }

   /// Compares two values according to Ember's equality rules: values of
   /// unequal kind are never equal; null equals null; booleans, numbers, and
   /// strings compare by value. Arrays, objects, and functions compare by
   /// identity, and since every value owns its storage outright, two
   /// distinct values of those kinds are never equal.
   pub fn equals(&self, other: &Value) -> bool {
      match (self, other) {
         (Value::Null, Value::Null) => true,
         (Value::Bool(a), Value::Bool(b)) => a == b,
         (Value::Number(a), Value::Number(b)) => a == b,
         (Value::String(a), Value::String(b)) => a == b,
         _ => false,
      }
   }

   /// Converts this value to its canonical string form: the form used by
   /// `print`, string concatenation, and `to_string`.
   pub fn to_display_string(&self) -> String {
      match self {
         Value::Null => String::from("null"),
         Value::Bool(b) => String::from(if *b { "true" } else { "false" }),
         Value::Number(n) => number_to_string(*n),
         Value::String(s) => s.clone(),
         Value::Array(elements) => {
            let inner: Vec<String> = elements.iter().map(|e| e.to_display_string()).collect();
            format!("[{}]", inner.join(", "))
         }
         Value::Object(obj) => {
            let inner: Vec<String> = obj
               .iter()
               .map(|(k, v)| format!("{}: {}", k, v.to_display_string()))
               .collect();
            format!("{{{}}}", inner.join(", "))
         }
         Value::Function(func) => format!("{}", func),
      }
   }
}

/// Formats a number with minimal precision: whole numbers print without a
/// fractional part.
pub fn number_to_string(n: f64) -> String {
   if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
      format!("{}", n as i64)
   } else {
      format!("{}", n)
   }
}

/// Implements the `Display` trait so that values can be printed in a
/// console-friendly way.
impl fmt::Display for Value {
   fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
      write!(f, "{}", self.to_display_string())
   }
}
