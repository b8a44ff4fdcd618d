//! Magic-number search and magic-table construction.
//!
//! Builds the dense per-square attack tables consumed by [`super::structs::MagicTables`]
//! by enumerating every occupancy subset of a square's relevant-blocker mask and
//! searching for a magic multiplier that hashes each subset to a unique slot.

use super::attacks::{bishop_attacks_per_square, rook_attacks_per_square};
use super::search::find_magic_number_for_square;
use super::structs::{BishopMagicTables, MagicEntry, MagicTables, RookMagicTables};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Selects how the magic-number search is seeded.
pub enum MagicTableSeed {
    /// Reproducible search, used by tests and the `deterministic_magic` feature.
    Fixed(u64),
    /// Seed from OS entropy.
    Random,
}

fn rook_mask(square: usize) -> u64 {
    let rank = (square / 8) as i32;
    let file = (square % 8) as i32;
    let mut mask = 0u64;

    for r in (rank + 1)..7 {
        mask |= 1u64 << (r * 8 + file);
    }
    for r in (1..rank).rev() {
        mask |= 1u64 << (r * 8 + file);
    }
    for f in (file + 1)..7 {
        mask |= 1u64 << (rank * 8 + f);
    }
    for f in (1..file).rev() {
        mask |= 1u64 << (rank * 8 + f);
    }
    mask
}

fn bishop_mask(square: usize) -> u64 {
    let rank = (square / 8) as i32;
    let file = (square % 8) as i32;
    let mut mask = 0u64;

    let mut r = rank + 1;
    let mut f = file + 1;
    while r < 7 && f < 7 {
        mask |= 1u64 << (r * 8 + f);
        r += 1;
        f += 1;
    }
    r = rank - 1;
    f = file - 1;
    while r > 0 && f > 0 {
        mask |= 1u64 << (r * 8 + f);
        r -= 1;
        f -= 1;
    }
    r = rank + 1;
    f = file - 1;
    while r < 7 && f > 0 {
        mask |= 1u64 << (r * 8 + f);
        r += 1;
        f -= 1;
    }
    r = rank - 1;
    f = file + 1;
    while r > 0 && f < 7 {
        mask |= 1u64 << (r * 8 + f);
        r -= 1;
        f += 1;
    }
    mask
}

/// Enumerates every subset of `mask`, including the empty and full subsets.
fn subsets_of(mask: u64) -> Vec<u64> {
    let mut subsets = Vec::with_capacity(1 << mask.count_ones());
    let mut subset = 0u64;
    loop {
        subsets.push(subset);
        if subset == mask {
            break;
        }
        subset = (subset.wrapping_sub(mask)) & mask;
    }
    subsets
}

fn build_entry<R: rand::RngCore>(
    square: usize,
    mask: u64,
    slider_attacks: fn(usize, u64) -> u64,
    rng: &mut R,
) -> Result<MagicEntry, String> {
    let blockers = subsets_of(mask);
    let attacks: Vec<u64> = blockers.iter().map(|&b| slider_attacks(square, b)).collect();

    let shift = 64 - mask.count_ones();
    let magic = find_magic_number_for_square(&blockers, &attacks, shift, rng)?;

    let table_size = 1usize << mask.count_ones();
    let mut table = vec![0u64; table_size];
    for (b, a) in blockers.iter().zip(attacks.iter()) {
        let index = ((b.wrapping_mul(magic)) >> shift) as usize;
        table[index] = *a;
    }

    Ok(MagicEntry {
        magic,
        shift,
        mask,
        table: table.into_boxed_slice(),
    })
}

pub fn generate_magic_tables(seed: MagicTableSeed) -> Result<MagicTables, String> {
    let mut rng = match seed {
        MagicTableSeed::Fixed(s) => StdRng::seed_from_u64(s),
        MagicTableSeed::Random => StdRng::from_os_rng(),
    };

    let mut rook_entries = Vec::with_capacity(64);
    let mut bishop_entries = Vec::with_capacity(64);

    for square in 0..64 {
        rook_entries.push(build_entry(
            square,
            rook_mask(square),
            rook_attacks_per_square,
            &mut rng,
        )?);
        bishop_entries.push(build_entry(
            square,
            bishop_mask(square),
            bishop_attacks_per_square,
            &mut rng,
        )?);
    }

    Ok(MagicTables {
        rook: RookMagicTables {
            entries: rook_entries,
        },
        bishop: BishopMagicTables {
            entries: bishop_entries,
        },
    })
}
