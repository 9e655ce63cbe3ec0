use num_traits::FromPrimitive;

/// The set of instructions supported by the virtual machine.
///
/// **NOTE:** Changing the order in which members are declared creates
/// incompatibilities between different versions of the interpreter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
#[derive(num_derive::FromPrimitive)]
pub enum OpCode {
   // Instructions with zero chunk operands. While these instructions do
   // not have bytecode operands, most of them have value operands that
   // they take from the stack.
   NoOp,
   Pop,
   DupTop,
   Swap,
   Add,
   Subtract,
   Multiply,
   Divide,
   Modulus,
   Negate,
   LogicNot,
   Equals,
   NotEquals,
   LessThan,
   GreaterThan,
   LessThanEq,
   GreaterThanEq,
   NewArray,
   ArrayPush,
   Subscript,
   SubscriptAssign,
   NewObject,
   GetProperty,
   SetProperty,
   SetNestedProperty,
   CopyProperties,
   Print,
   Return,
   EndVirtualMachine,

   // Instructions with one chunk operand. These instructions use the next
   // byte from the chunk as their operand.
   LoadConstant,
   CallMethod,

   // Instructions with two single-byte chunk operands: the callee's
   // constant-pool index and the argument count.
   FuncCall,

   // Instructions with one 16-bit chunk operand, stored big-endian.
   LoadVar,
   StoreVar,
   JumpForward,
   JumpIfFalse,
   LoopJump,
}

impl OpCode {
   /// Decodes an opcode from its byte form.
   ///
   /// # Parameters
   /// - `byte`: The raw instruction byte.
   ///
   /// # Returns
   /// `Option<OpCode>`: The decoded opcode, or `None` for an unknown byte.
   pub fn from_byte(byte: u8) -> Option<OpCode> {
      FromPrimitive::from_u8(byte)
   }

   /// The number of operand bytes that follow this opcode in a chunk.
   pub fn operand_width(&self) -> usize {
      match self {
         OpCode::LoadConstant | OpCode::CallMethod => 1,
         OpCode::FuncCall
         | OpCode::LoadVar
         | OpCode::StoreVar
         | OpCode::JumpForward
         | OpCode::JumpIfFalse
         | OpCode::LoopJump => 2,
         _ => 0,
      }
   }
}
