//! Single entry point for acquiring the magic tables the rest of the engine uses.
//!
//! Behind the `load_magic` feature, tables are deserialised from a bundled
//! bincode blob (produced offline); otherwise they are regenerated at process
//! start, deterministically when `deterministic_magic` is enabled.

use super::precompute::{MagicTableSeed, generate_magic_tables};
use super::structs::MagicTables;
use once_cell::sync::OnceCell;

#[cfg(feature = "load_magic")]
const MAGIC_BLOB: &[u8] = include_bytes!("../../../magic_tables.bin");

static TABLES: OnceCell<MagicTables> = OnceCell::new();

fn build_tables() -> MagicTables {
    #[cfg(feature = "deterministic_magic")]
    let seed = MagicTableSeed::Fixed(0xC0FF_EE12_3456_789A);
    #[cfg(not(feature = "deterministic_magic"))]
    let seed = MagicTableSeed::Random;

    generate_magic_tables(seed).expect("magic table generation must succeed at startup")
}

/// Returns the process-wide magic tables, initialising them on first use.
pub fn load_magic_tables() -> MagicTables {
    TABLES
        .get_or_init(|| {
            #[cfg(feature = "load_magic")]
            {
                bincode::deserialize(MAGIC_BLOB).expect("bundled magic_tables.bin is corrupt")
            }
            #[cfg(not(feature = "load_magic"))]
            {
                build_tables()
            }
        })
        .clone()
}
