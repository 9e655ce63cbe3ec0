use std::time::{SystemTime, UNIX_EPOCH};

use hashbrown::{HashMap, HashSet};

use crate::errors::RuntimeErrorType;
use crate::values::Value;
use crate::virtual_machine::RuntimeResult;

/// Represents the body of an Ember native function.
pub type NativeFn = fn(Vec<Value>) -> Result<Value, RuntimeResult>;

/// Represents an Ember native function record.
#[derive(Clone)]
pub struct NativeFuncObj {
   pub name: String,
   pub min_arity: u8,
   pub max_arity: u8,
   pub function: NativeFn,
}

/// The environment of native functions available to an Ember program. The
/// embedder registers natives before execution; the VM resolves them by
/// name and treats their bodies opaquely.
pub struct Builtins(HashMap<String, NativeFuncObj>);

impl Default for Builtins {
   fn default() -> Self {
      let mut builtins = Builtins(HashMap::new());

      // >>>>>>>>>>>>>>>> Native functions to be added after this line
      builtins.add_native_function("clock", 0, 0, native_clock as NativeFn);
      builtins.add_native_function("iter_items", 1, 1, native_iter_items as NativeFn);
      builtins.add_native_function("keys", 1, 1, native_keys as NativeFn);
      builtins.add_native_function("len", 1, 1, native_len as NativeFn);
      builtins.add_native_function("random", 0, 0, native_random as NativeFn);
      builtins.add_native_function("to_string", 1, 1, native_to_string as NativeFn);
      builtins.add_native_function("type_of", 1, 1, native_type_of as NativeFn);
      // <<<<<<<<<<<<<<<< Native functions to be added before this line

      builtins
   }
}

impl Builtins {
   /// Adds a native function definition to the environment.
   pub fn add_native_function(&mut self, name: &str, min_arity: u8, max_arity: u8, body: NativeFn) {
      let name = String::from(name);

      if self.0.contains_key(&name) {
         panic!("Cannot duplicate native function '{}'.", name);
      }

      self.0.insert(
         name.clone(),
         NativeFuncObj {
            name,
            min_arity,
            max_arity,
            function: body,
         },
      );
   }

   /// The names of the registered natives. The compiler uses this set to
   /// resolve call targets.
   pub fn names(&self) -> HashSet<String> {
      self.0.keys().cloned().collect()
   }

   /// Finds and executes a native function by name. The native receives
   /// owned copies of its arguments and returns an owned value.
   pub fn call_native(&self, name: &str, args: Vec<Value>) -> Result<Value, RuntimeResult> {
      let native = match self.0.get(name) {
         Some(f) => f,
         None => {
            return Err(RuntimeResult::Error {
               error: RuntimeErrorType::ReferenceError,
               message: format!("No native function named '{}'.", name),
            })
         }
      };

      let argc = args.len() as u8;
      if argc < native.min_arity || argc > native.max_arity {
         let expected = if native.min_arity == native.max_arity {
            format!("{}", native.min_arity)
         } else {
            format!("{} to {}", native.min_arity, native.max_arity)
         };

         return Err(RuntimeResult::Error {
            error: RuntimeErrorType::ArgumentError,
            message: format!(
               "Expected {} arguments for '{}' but got {} instead.",
               expected, name, argc
            ),
         });
      }

      (native.function)(args)
   }
}

/// The number of seconds since the Unix epoch.
fn native_clock(_args: Vec<Value>) -> Result<Value, RuntimeResult> {
   let now = SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .expect("Time went backwards");

   Ok(Value::Number(now.as_secs_f64()))
}

/// A uniformly distributed number in `[0, 1)`.
fn native_random(_args: Vec<Value>) -> Result<Value, RuntimeResult> {
   Ok(Value::Number(rand::random::<f64>()))
}

/// The length of a string (bytes), an array, or an object.
fn native_len(mut args: Vec<Value>) -> Result<Value, RuntimeResult> {
   let value = args.remove(0);

   let len = match &value {
      Value::String(s) => s.len(),
      Value::Array(elements) => elements.len(),
      Value::Object(obj) => obj.len(),
      _ => {
         return Err(RuntimeResult::Error {
            error: RuntimeErrorType::TypeError,
            message: format!("Value of type '{}' has no length.", value.type_name()),
         })
      }
   };

   Ok(Value::Number(len as f64))
}

/// The keys of an object, in insertion order.
fn native_keys(mut args: Vec<Value>) -> Result<Value, RuntimeResult> {
   match args.remove(0) {
      Value::Object(obj) => Ok(Value::Array(
         obj.keys().map(|k| Value::String(k.to_string())).collect(),
      )),
      other => Err(RuntimeResult::Error {
         error: RuntimeErrorType::TypeError,
         message: format!("Expected an object but got '{}'.", other.type_name()),
      }),
   }
}

/// The iteration sequence of a collection: arrays iterate their values,
/// objects iterate their keys.
fn native_iter_items(mut args: Vec<Value>) -> Result<Value, RuntimeResult> {
   match args.remove(0) {
      array @ Value::Array(_) => Ok(array),
      Value::Object(obj) => native_keys(vec![Value::Object(obj)]),
      other => Err(RuntimeResult::Error {
         error: RuntimeErrorType::TypeError,
         message: format!("Value of type '{}' is not iterable.", other.type_name()),
      }),
   }
}

/// The canonical string form of a value.
fn native_to_string(mut args: Vec<Value>) -> Result<Value, RuntimeResult> {
   Ok(Value::String(args.remove(0).to_display_string()))
}

/// The type name of a value.
fn native_type_of(mut args: Vec<Value>) -> Result<Value, RuntimeResult> {
   Ok(Value::String(args.remove(0).type_name().to_string()))
}
