use std::fmt;
use std::fs;
use std::path::Path;

use crate::chunk::Chunk;
use crate::values::{FuncValue, UserFunc, Value};

// Constant-pool tags in the on-disk form. Integers are little-endian
// throughout; code offsets and loop jumps inside the code bytes keep their
// in-memory big-endian encoding.
const TAG_NULL: u32 = 0;
const TAG_BOOLEAN: u32 = 1;
const TAG_NUMBER: u32 = 2;
const TAG_STRING: u32 = 3;
const TAG_ARRAY: u32 = 4;
const TAG_FUNCTION: u32 = 6;

const FUNC_KIND_BUILTIN: i32 = 0;
const FUNC_KIND_USER: i32 = 1;

/// The errors the chunk codec can produce.
#[derive(Debug)]
pub enum CodecError {
   /// The input ended early or an integer field held a nonsensical value.
   Malformed(String),
   /// The chunk holds a constant the on-disk form cannot represent.
   Unsupported(String),
   Io(std::io::Error),
}

impl fmt::Display for CodecError {
   fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
      match self {
         CodecError::Malformed(msg) => write!(f, "malformed chunk file: {}", msg),
         CodecError::Unsupported(msg) => write!(f, "unsupported constant: {}", msg),
         CodecError::Io(e) => write!(f, "{}", e),
      }
   }
}

impl From<std::io::Error> for CodecError {
   fn from(e: std::io::Error) -> Self {
      CodecError::Io(e)
   }
}

/// Serializes a chunk into its binary file form:
///
/// ```text
/// i32 code_count
/// i32 constants_count
/// u8  code[code_count]
/// constants...
/// ```
pub fn serialize(chunk: &Chunk) -> Result<Vec<u8>, CodecError> {
   let mut out: Vec<u8> = Vec::with_capacity(chunk.len() + 64);

   out.extend_from_slice(&(chunk.len() as i32).to_le_bytes());
   out.extend_from_slice(&(chunk.get_pool_size() as i32).to_le_bytes());
   out.extend_from_slice(&chunk.code);

   for constant in chunk.constants() {
      write_value(&mut out, constant)?;
   }

   Ok(out)
}

fn write_value(out: &mut Vec<u8>, value: &Value) -> Result<(), CodecError> {
   match value {
      Value::Null => out.extend_from_slice(&TAG_NULL.to_le_bytes()),
      Value::Bool(b) => {
         out.extend_from_slice(&TAG_BOOLEAN.to_le_bytes());
         out.push(*b as u8);
      }
      Value::Number(n) => {
         out.extend_from_slice(&TAG_NUMBER.to_le_bytes());
         out.extend_from_slice(&n.to_le_bytes());
      }
      Value::String(s) => {
         out.extend_from_slice(&TAG_STRING.to_le_bytes());
         write_str(out, s);
      }
      Value::Array(elements) => {
         out.extend_from_slice(&TAG_ARRAY.to_le_bytes());
         out.extend_from_slice(&(elements.len() as i32).to_le_bytes());
         for element in elements {
            write_value(out, element)?;
         }
      }
      Value::Object(_) => {
         return Err(CodecError::Unsupported(
            "object values cannot appear in a constant pool".to_string(),
         ));
      }
      Value::Function(FuncValue::Builtin(name)) => {
         out.extend_from_slice(&TAG_FUNCTION.to_le_bytes());
         out.extend_from_slice(&FUNC_KIND_BUILTIN.to_le_bytes());
         write_str(out, name);
      }
      Value::Function(FuncValue::User(func)) => {
         out.extend_from_slice(&TAG_FUNCTION.to_le_bytes());
         out.extend_from_slice(&FUNC_KIND_USER.to_le_bytes());
         write_str(out, &func.name);

         out.extend_from_slice(&(func.params.len() as i32).to_le_bytes());
         for param in &func.params {
            write_str(out, param);
         }

         // Function bodies are not portable in this format; the flag only
         // records whether the producing process had one.
         let has_body: i32 = i32::from(func.entry_ip.is_some());
         out.extend_from_slice(&has_body.to_le_bytes());
      }
   }

   Ok(())
}

fn write_str(out: &mut Vec<u8>, s: &str) {
   out.extend_from_slice(&(s.len() as i32).to_le_bytes());
   out.extend_from_slice(s.as_bytes());
}

/// A byte cursor over the serialized form.
struct Reader<'a> {
   bytes: &'a [u8],
   at: usize,
}

impl<'a> Reader<'a> {
   fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
      if self.at + n > self.bytes.len() {
         return Err(CodecError::Malformed("unexpected end of input".to_string()));
      }

      let slice = &self.bytes[self.at..self.at + n];
      self.at += n;
      Ok(slice)
   }

   fn read_i32(&mut self) -> Result<i32, CodecError> {
      let bytes = self.take(4)?;
      Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
   }

   fn read_u32(&mut self) -> Result<u32, CodecError> {
      let bytes = self.take(4)?;
      Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
   }

   fn read_f64(&mut self) -> Result<f64, CodecError> {
      let bytes = self.take(8)?;
      let mut buf = [0u8; 8];
      buf.copy_from_slice(bytes);
      Ok(f64::from_le_bytes(buf))
   }

   fn read_u8(&mut self) -> Result<u8, CodecError> {
      Ok(self.take(1)?[0])
   }

   fn read_str(&mut self) -> Result<String, CodecError> {
      let len = self.read_i32()?;
      if len < 0 {
         return Err(CodecError::Malformed("negative string length".to_string()));
      }

      let bytes = self.take(len as usize)?;
      Ok(String::from_utf8_lossy(bytes).into_owned())
   }

   fn read_count(&mut self, what: &str) -> Result<usize, CodecError> {
      let count = self.read_i32()?;
      if count < 0 {
         return Err(CodecError::Malformed(format!("negative {} count", what)));
      }
      Ok(count as usize)
   }
}

/// Deserializes a chunk from its binary file form. The chunk's source
/// locations are not part of the format and come back zeroed.
pub fn deserialize(bytes: &[u8]) -> Result<Chunk, CodecError> {
   let mut reader = Reader { bytes, at: 0 };

   let code_count = reader.read_count("code")?;
   let constants_count = reader.read_count("constants")?;

   let code = reader.take(code_count)?.to_vec();

   let mut chunk = Chunk::new();
   chunk.locations = vec![(0, 0); code.len()];
   chunk.code = code;

   for _ in 0..constants_count {
      let value = read_value(&mut reader)?;
      chunk.push_constant_raw(value);
   }

   Ok(chunk)
}

fn read_value(reader: &mut Reader) -> Result<Value, CodecError> {
   let tag = reader.read_u32()?;

   match tag {
      TAG_NULL => Ok(Value::Null),
      TAG_BOOLEAN => Ok(Value::Bool(reader.read_u8()? != 0)),
      TAG_NUMBER => Ok(Value::Number(reader.read_f64()?)),
      TAG_STRING => Ok(Value::String(reader.read_str()?)),
      TAG_ARRAY => {
         let count = reader.read_count("array element")?;
         let mut elements = Vec::with_capacity(count);
         for _ in 0..count {
            elements.push(read_value(reader)?);
         }
         Ok(Value::Array(elements))
      }
      TAG_FUNCTION => {
         let kind = reader.read_i32()?;

         match kind {
            FUNC_KIND_BUILTIN => Ok(Value::Function(FuncValue::Builtin(reader.read_str()?))),
            FUNC_KIND_USER => {
               let name = reader.read_str()?;
               let param_count = reader.read_count("parameter")?;

               let mut params = Vec::with_capacity(param_count);
               for _ in 0..param_count {
                  params.push(reader.read_str()?);
               }

               // A body flag of 1 refers to code in the producing process;
               // the entry point cannot be reconstructed here.
               let _has_body = reader.read_i32()?;

               Ok(Value::Function(FuncValue::User(UserFunc {
                  name,
                  params,
                  entry_ip: None,
               })))
            }
            _ => Err(CodecError::Malformed(format!("unknown function kind {}", kind))),
         }
      }
      _ => Err(CodecError::Malformed(format!("unknown constant tag {}", tag))),
   }
}

/// Writes a chunk to a `.embc` file.
pub fn write_chunk_file(path: &Path, chunk: &Chunk) -> Result<(), CodecError> {
   let bytes = serialize(chunk)?;
   fs::write(path, bytes)?;
   Ok(())
}

/// Reads a chunk from a `.embc` file.
pub fn read_chunk_file(path: &Path) -> Result<Chunk, CodecError> {
   let bytes = fs::read(path)?;
   deserialize(&bytes)
}
