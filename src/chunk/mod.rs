use crate::values::Value;
use op_codes::OpCode;

// Submodules
pub mod codec;
pub mod op_codes;

/// Contains all the necessary information about the instructions to be
/// executed: the raw code bytes and the literal constant values they
/// reference.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Chunk {
   /// The encoded instruction stream.
   pub code: Vec<u8>,
   /// The literal constant values found in this chunk of code.
   constants: Vec<Value>,
   /// The source line and column of each code byte. This is useful when
   /// throwing runtime errors.
   pub locations: Vec<(usize, usize)>,
}

impl Chunk {
   /// Creates a new, empty chunk.
   pub fn new() -> Self {
      Self::default()
   }

   /// The size of the instruction stream in bytes.
   pub fn len(&self) -> usize {
      self.code.len()
   }

   pub fn is_empty(&self) -> bool {
      self.code.is_empty()
   }

   /// Adds a raw byte to the instruction stream.
   pub fn push_byte(&mut self, byte: u8, pos: (usize, usize)) {
      self.code.push(byte);
      self.locations.push(pos);
   }

   /// Adds an opcode to the instruction stream.
   pub fn push_op_code(&mut self, op: OpCode, pos: (usize, usize)) {
      self.push_byte(op as u8, pos);
   }

   /// Splits a 16-bit integer into two big-endian bytes and adds the pair to
   /// the instruction stream.
   pub fn push_short(&mut self, value: u16, pos: (usize, usize)) {
      let bytes = value.to_be_bytes();
      self.push_byte(bytes[0], pos);
      self.push_byte(bytes[1], pos);
   }

   /// Modifies the byte at the specified chunk index.
   pub fn patch(&mut self, idx: usize, byte: u8) {
      self.code[idx] = byte;
   }

   pub fn get_byte(&self, idx: usize) -> u8 {
      self.code[idx]
   }

   /// Decodes the byte at the given index as an opcode.
   pub fn get_op_code(&self, idx: usize) -> Option<OpCode> {
      OpCode::from_byte(self.code[idx])
   }

   /// Reads the two bytes at the given index as a big-endian 16-bit integer.
   pub fn get_short(&self, idx: usize) -> u16 {
      u16::from_be_bytes([self.code[idx], self.code[idx + 1]])
   }

   /// The source position associated with the byte at the given index.
   pub fn get_location(&self, idx: usize) -> Option<(usize, usize)> {
      self.locations.get(idx).copied()
   }

   /// Adds a constant to this chunk's constant pool and returns its index.
   /// Scalar and string constants are deduplicated.
   ///
   /// # Returns
   /// - `Ok(u8)`: The position of the value in the pool.
   /// - `Err(())`: The pool is full.
   pub fn add_constant(&mut self, value: Value) -> Result<u8, ()> {
      let duplicable = matches!(
         value,
         Value::Null
            | Value::Bool(_)
            | Value::Number(_)
            | Value::String(_)
            | Value::Function(crate::values::FuncValue::Builtin(_))
      );

      if duplicable {
         if let Some(idx) = self.constants.iter().position(|c| *c == value) {
            return Ok(idx as u8);
         }
      }

      if self.constants.len() >= u8::MAX as usize + 1 {
         return Err(());
      }

      self.constants.push(value);
      Ok((self.constants.len() - 1) as u8)
   }

   /// Appends a constant without deduplication. Used by the codec, which
   /// must preserve pool indices exactly.
   pub(crate) fn push_constant_raw(&mut self, value: Value) {
      self.constants.push(value);
   }

   /// Retrieves a constant from this chunk's constant pool.
   pub fn get_constant(&self, idx: usize) -> Option<&Value> {
      self.constants.get(idx)
   }

   /// The constants stored in this chunk, in pool order.
   pub fn constants(&self) -> &[Value] {
      &self.constants
   }

   /// Gets the size of the constant pool for this chunk.
   pub fn get_pool_size(&self) -> usize {
      self.constants.len()
   }

   /// Disassembles the chunk, printing each instruction and its related
   /// information.
   ///
   /// # Parameters
   /// - `name`: The name to print for the current chunk.
   pub fn disassemble(&self, name: &str) {
      println!("==== {} ====", name);

      let mut i = 0;
      while i < self.code.len() {
         print!("{:>04} ", i);

         let op = match self.get_op_code(i) {
            Some(op) => op,
            None => {
               println!("\x1b[31m{:#04X} <unknown>\x1b[0m", self.code[i]);
               i += 1;
               continue;
            }
         };

         print!("\x1b[32m{:#04X}\x1b[0m – \x1b[36m{:?}\x1b[0m", op as u8, op);

         match op {
            OpCode::LoadConstant => {
               let idx = self.get_byte(i + 1) as usize;
               match self.get_constant(idx) {
                  Some(c) => println!("\t\t---> {}", c),
                  None => println!("\t\t---> <bad constant {}>", idx),
               }
            }
            OpCode::CallMethod => {
               println!("\t{} args", self.get_byte(i + 1));
            }
            OpCode::FuncCall => {
               println!("\tconst {}, {} args", self.get_byte(i + 1), self.get_byte(i + 2));
            }
            OpCode::LoadVar | OpCode::StoreVar => {
               println!("\tslot {}", self.get_short(i + 1));
            }
            OpCode::JumpForward | OpCode::JumpIfFalse => {
               let offset = self.get_short(i + 1) as usize;
               println!("\t---> {}", i + 3 + offset);
            }
            OpCode::LoopJump => {
               let offset = self.get_short(i + 1) as usize;
               println!("\t---> {}", (i + 3).saturating_sub(offset));
            }
            _ => println!(),
         }

         i += 1 + op.operand_width();
      }
   }
}
