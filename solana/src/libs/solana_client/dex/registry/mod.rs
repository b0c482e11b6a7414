pub mod core;
pub mod definitions;
pub mod traits;

pub use core::{AccountDecode, DexRegistry, RegistryItem};

pub use traits::{DexParser, ParserFn, RegistryLookup};

/// Global, thread-safe registry holding all supported venue parsers.
pub static DEX_REGISTRY: std::sync::LazyLock<DexRegistry> = std::sync::LazyLock::new(|| {
    let mut reg = DexRegistry::new();
    definitions::fill_registry(&mut reg);
    reg
});
