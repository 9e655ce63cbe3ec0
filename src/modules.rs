use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// The default registry file maintained by the package tool. The core only
/// ever reads it.
pub const REGISTRY_FILE: &str = "ember_packages.json";

/// One installed package in the registry document.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PackageEntry {
   pub name: String,
   pub version: String,
}

/// The registry document: `{"packages":[{"name":"…","version":"…"}, …]}`.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PackageRegistry {
   pub packages: Vec<PackageEntry>,
}

/// The outcome of resolving a module reference at compile time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleResolution {
   Installed,
   NotInstalled,
}

/// The installed-module lookup consulted by the compiler for every import
/// that is not a local `.ember` file.
#[derive(Debug, Default)]
pub struct Registry {
   packages: PackageRegistry,
}

impl Registry {
   /// Loads the registry from the default file in the working directory. A
   /// missing file means an empty registry.
   pub fn load_default() -> Registry {
      Self::load(Path::new(REGISTRY_FILE)).unwrap_or_default()
   }

   /// Loads a registry document from the given path.
   ///
   /// # Returns
   /// - `Ok(Registry)`: The parsed registry; empty when the file is absent.
   /// - `Err(String)`: The file exists but does not parse.
   pub fn load(path: &Path) -> Result<Registry, String> {
      let contents = match fs::read_to_string(path) {
         Ok(contents) => contents,
         Err(_) => return Ok(Registry::default()),
      };

      let packages: PackageRegistry = serde_json::from_str(&contents)
         .map_err(|e| format!("Malformed package registry '{}': {}", path.display(), e))?;

      Ok(Registry { packages })
   }

   /// A registry with the given entries. Used by tests and embedders.
   pub fn from_entries(entries: Vec<PackageEntry>) -> Registry {
      Registry {
         packages: PackageRegistry { packages: entries },
      }
   }

   /// Checks whether a module reference names an installed package.
   pub fn resolve(&self, name: &str) -> ModuleResolution {
      if self.packages.packages.iter().any(|p| p.name == name) {
         ModuleResolution::Installed
      } else {
         ModuleResolution::NotInstalled
      }
   }
}
