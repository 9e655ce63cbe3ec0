use proptest::prelude::*;

use crate::chunk::codec::{deserialize, read_chunk_file, serialize, write_chunk_file};
use crate::chunk::Chunk;
use crate::tests::compile_str;
use crate::values::{FuncValue, UserFunc, Value};

fn chunk_with_constants(code: Vec<u8>, constants: Vec<Value>) -> Chunk {
   let mut chunk = Chunk::new();
   chunk.locations = vec![(0, 0); code.len()];
   chunk.code = code;

   for constant in constants {
      chunk.push_constant_raw(constant);
   }

   chunk
}

#[test]
fn scalar_constants_round_trip() {
   let chunk = chunk_with_constants(
      vec![0, 1, 2, 3],
      vec![
         Value::Null,
         Value::Bool(true),
         Value::Bool(false),
         Value::Number(3.5),
         Value::Number(-0.0),
         Value::String(String::from("hello\nworld")),
         Value::String(String::new()),
      ],
   );

   let bytes = serialize(&chunk).unwrap();
   let restored = deserialize(&bytes).unwrap();

   assert_eq!(restored.code, chunk.code);
   assert_eq!(restored.constants(), chunk.constants());
}

#[test]
fn nested_array_constants_round_trip() {
   let chunk = chunk_with_constants(
      vec![],
      vec![Value::Array(vec![
         Value::Number(1.0),
         Value::Array(vec![Value::String(String::from("x")), Value::Null]),
         Value::Bool(true),
      ])],
   );

   let bytes = serialize(&chunk).unwrap();
   let restored = deserialize(&bytes).unwrap();

   assert_eq!(restored.constants(), chunk.constants());
}

#[test]
fn builtin_function_constants_keep_their_name() {
   let chunk = chunk_with_constants(
      vec![],
      vec![Value::Function(FuncValue::Builtin(String::from("len")))],
   );

   let bytes = serialize(&chunk).unwrap();
   let restored = deserialize(&bytes).unwrap();

   assert_eq!(
      restored.constants(),
      &[Value::Function(FuncValue::Builtin(String::from("len")))]
   );
}

#[test]
fn user_function_constants_lose_their_entry_point() {
   let chunk = chunk_with_constants(
      vec![],
      vec![Value::Function(FuncValue::User(UserFunc {
         name: String::from("greet"),
         params: vec![String::from("who")],
         entry_ip: Some(17),
      }))],
   );

   let bytes = serialize(&chunk).unwrap();
   let restored = deserialize(&bytes).unwrap();

   match &restored.constants()[0] {
      Value::Function(FuncValue::User(func)) => {
         assert_eq!(func.name, "greet");
         assert_eq!(func.params, vec![String::from("who")]);
         assert_eq!(func.entry_ip, None);
      }
      other => panic!("expected a user function, got {:?}", other),
   }
}

#[test]
fn truncated_input_is_rejected() {
   let chunk = chunk_with_constants(vec![1, 2, 3], vec![Value::Number(9.0)]);
   let bytes = serialize(&chunk).unwrap();

   for cut in [0, 3, 7, bytes.len() - 1] {
      assert!(deserialize(&bytes[..cut]).is_err(), "cut at {} should fail", cut);
   }
}

#[test]
fn unknown_tags_are_rejected() {
   // code_count = 0, constants_count = 1, then a bogus tag.
   let mut bytes = vec![];
   bytes.extend_from_slice(&0i32.to_le_bytes());
   bytes.extend_from_slice(&1i32.to_le_bytes());
   bytes.extend_from_slice(&99u32.to_le_bytes());

   assert!(deserialize(&bytes).is_err());
}

#[test]
fn compiled_program_survives_a_file_round_trip() {
   let chunk = compile_str("x: 1\nprint(x + 2)\n").unwrap();

   let dir = tempfile::tempdir().unwrap();
   let path = dir.path().join("out.embc");

   write_chunk_file(&path, &chunk).unwrap();
   let restored = read_chunk_file(&path).unwrap();

   assert_eq!(restored.code, chunk.code);
   assert_eq!(restored.constants(), chunk.constants());
}

// Constant values the portable format round-trips byte-for-byte. NaN is
// excluded only because the structural comparison below cannot see it;
// the bit pattern itself would survive.
fn portable_value() -> impl Strategy<Value = Value> {
   let scalar = prop_oneof![
      Just(Value::Null),
      any::<bool>().prop_map(Value::Bool),
      any::<f64>()
         .prop_filter("NaN breaks structural equality", |n| !n.is_nan())
         .prop_map(Value::Number),
      "[a-zA-Z0-9 _\\.\\-]{0,24}".prop_map(Value::String),
   ];

   scalar.prop_recursive(3, 24, 6, |inner| {
      proptest::collection::vec(inner, 0..6).prop_map(Value::Array)
   })
}

proptest! {
   /// Round-trip: for any chunk of Null/Boolean/Number/String/Array
   /// constants, `deserialize(serialize(C))` matches byte-for-byte in code
   /// and structurally in constants, and re-serializing is byte-stable.
   #[test]
   fn serialization_round_trips(
      code in proptest::collection::vec(any::<u8>(), 0..64),
      constants in proptest::collection::vec(portable_value(), 0..8)
   ) {
      let chunk = chunk_with_constants(code, constants);

      let bytes = serialize(&chunk).unwrap();
      let restored = deserialize(&bytes).unwrap();

      prop_assert_eq!(&restored.code, &chunk.code);
      prop_assert_eq!(restored.constants(), chunk.constants());

      let bytes_again = serialize(&restored).unwrap();
      prop_assert_eq!(bytes, bytes_again);
   }
}
