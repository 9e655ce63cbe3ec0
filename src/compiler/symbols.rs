use hashbrown::HashMap;

/// The number of global variable slots. Slots at and above this bound are
/// parameter slots inside function bodies.
pub const GLOBAL_SLOT_COUNT: u16 = 256;

/// The first parameter slot.
pub const PARAM_SLOT_BASE: u16 = 256;

/// Represents a name known to the compiler. For variables, `slot` is the
/// storage slot in the VM's global array; for functions, it is the index of
/// the constant holding the function's entry point.
#[derive(Clone, Debug)]
pub struct Symbol {
   pub name: String,
   pub slot: u16,
   pub is_function: bool,
   pub is_mutable: bool,
}

/// The ways a declaration can fail.
#[derive(Debug, PartialEq, Eq)]
pub enum DeclareError {
   /// The name is already bound to a variable.
   Redeclaration,
   /// The name is already bound to a function.
   FunctionCollision,
   /// All global slots are in use.
   TooManyVariables,
}

/// The shadow record produced when a function parameter takes over a name
/// for the duration of a body's compilation.
pub struct ShadowedSymbol {
   name: String,
   previous: Option<Symbol>,
}

/// Maps names to storage slots. Names are unique within a table.
#[derive(Default)]
pub struct SymbolTable {
   symbols: Vec<Symbol>,
   by_name: HashMap<String, usize>,
   next_slot: u16,
}

impl SymbolTable {
   pub fn new() -> Self {
      Self::default()
   }

   /// Looks up a name in the table.
   pub fn lookup(&self, name: &str) -> Option<&Symbol> {
      self.by_name.get(name).map(|&i| &self.symbols[i])
   }

   /// Returns the existing slot for `name`, or allocates the next free slot.
   ///
   /// # Parameters
   /// - `name`: The name to resolve.
   /// - `is_function`: Whether a newly created symbol describes a function.
   ///
   /// # Returns
   /// - `Ok(u16)`: The symbol's slot.
   /// - `Err(DeclareError::TooManyVariables)`: No free slots remain.
   pub fn get_or_add(&mut self, name: &str, is_function: bool) -> Result<u16, DeclareError> {
      if let Some(&i) = self.by_name.get(name) {
         return Ok(self.symbols[i].slot);
      }

      self.allocate(name, is_function, true)
   }

   /// Declares a new variable.
   ///
   /// # Returns
   /// - `Ok(u16)`: The slot assigned to the variable.
   /// - `Err(DeclareError)`: The name is taken or the table is full.
   pub fn declare_variable(&mut self, name: &str, is_mutable: bool) -> Result<u16, DeclareError> {
      if let Some(symbol) = self.lookup(name) {
         return if symbol.is_function {
            Err(DeclareError::FunctionCollision)
         } else {
            Err(DeclareError::Redeclaration)
         };
      }

      self.allocate(name, false, is_mutable)
   }

   /// Binds a name to a function, recording the constant-pool index that
   /// holds the function's entry point. Redefining a function replaces the
   /// previous definition.
   pub fn define_function(&mut self, name: &str, const_idx: u16) {
      match self.by_name.get(name).copied() {
         Some(i) => {
            let symbol = &mut self.symbols[i];
            symbol.slot = const_idx;
            symbol.is_function = true;
            symbol.is_mutable = false;
         }
         None => {
            self.insert(Symbol {
               name: name.to_string(),
               slot: const_idx,
               is_function: true,
               is_mutable: false,
            });
         }
      }
   }

   /// The stored mutability flag for a name. Functions and unknown names
   /// report as immutable.
   pub fn is_mutable(&self, name: &str) -> bool {
      match self.lookup(name) {
         Some(symbol) => !symbol.is_function && symbol.is_mutable,
         None => false,
      }
   }

   pub fn is_function(&self, name: &str) -> bool {
      self.lookup(name).map(|s| s.is_function).unwrap_or(false)
   }

   /// Maps each parameter name to its local slot `256 + index`, shadowing
   /// any outer binding with the same name for the duration of a function
   /// body's compilation.
   ///
   /// # Returns
   /// The shadow records to hand back to [`SymbolTable::end_function_scope`].
   pub fn begin_function_scope(&mut self, params: &[String]) -> Vec<ShadowedSymbol> {
      let mut shadows = Vec::with_capacity(params.len());

      for (i, param) in params.iter().enumerate() {
         let slot = PARAM_SLOT_BASE + i as u16;
         let previous = self.lookup(param).cloned();

         let replacement = Symbol {
            name: param.clone(),
            slot,
            is_function: false,
            is_mutable: true,
         };

         match self.by_name.get(param).copied() {
            Some(idx) => self.symbols[idx] = replacement,
            None => self.insert(replacement),
         }

         shadows.push(ShadowedSymbol {
            name: param.clone(),
            previous,
         });
      }

      shadows
   }

   /// Restores the bindings shadowed by a function's parameters.
   pub fn end_function_scope(&mut self, shadows: Vec<ShadowedSymbol>) {
      // Restore in reverse so duplicated parameter names unwind correctly.
      for shadow in shadows.into_iter().rev() {
         match shadow.previous {
            Some(symbol) => {
               let idx = self.by_name[&shadow.name];
               self.symbols[idx] = symbol;
            }
            None => self.remove(&shadow.name),
         }
      }
   }

   fn allocate(&mut self, name: &str, is_function: bool, is_mutable: bool) -> Result<u16, DeclareError> {
      if self.next_slot >= GLOBAL_SLOT_COUNT {
         return Err(DeclareError::TooManyVariables);
      }

      let slot = self.next_slot;
      self.next_slot += 1;

      self.insert(Symbol {
         name: name.to_string(),
         slot,
         is_function,
         is_mutable,
      });

      Ok(slot)
   }

   fn insert(&mut self, symbol: Symbol) {
      self.by_name.insert(symbol.name.clone(), self.symbols.len());
      self.symbols.push(symbol);
   }

   fn remove(&mut self, name: &str) {
      if let Some(idx) = self.by_name.remove(name) {
         self.symbols.remove(idx);

         // Re-index the entries that shifted down.
         for (i, symbol) in self.symbols.iter().enumerate().skip(idx) {
            self.by_name.insert(symbol.name.clone(), i);
         }
      }
   }
}
