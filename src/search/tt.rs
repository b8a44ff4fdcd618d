use crate::moves::types::Move;

// Make sure MATE_THRESHOLD matches what we define in search.rs (30000)
pub const MATE_THRESHOLD: i32 = 30000;

const CLUSTER_SIZE: usize = 4;

/// Multiplicative hash mixer (Fibonacci hashing). Scrambling the key before
/// taking its high bits, rather than masking the low bits directly, spreads
/// entries evenly across clusters even when Zobrist keys share low-bit
/// structure (e.g. from incremental XOR updates).
const MIX: u64 = 0x9E3779B97F4A7C15;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeType {
    Exact = 0,
    LowerBound = 1, // Beta cutoff (failed high)
    UpperBound = 2, // Alpha cutoff (failed low)
}

#[derive(Clone, Copy, Debug)]
struct TTEntry {
    best_move: Option<Move>,
    score: i16,
    key16: u16,
    depth: u8,
    bound: u8, // 0=Exact, 1=Lower, 2=Upper, 0xFF=empty
    generation: u8,
}

const EMPTY_BOUND: u8 = 0xFF;

impl TTEntry {
    const EMPTY: Self = Self {
        best_move: None,
        score: 0,
        key16: 0,
        depth: 0,
        bound: EMPTY_BOUND,
        generation: 0,
    };

    fn is_empty(&self) -> bool {
        self.bound == EMPTY_BOUND
    }
}

/// One cache-line-sized bucket of entries sharing an index. Collisions
/// within a cluster are resolved by partial-key match first, then by
/// replacement (see `TranspositionTable::save`), instead of evicting the
/// whole bucket.
#[derive(Clone, Copy)]
struct Cluster {
    entries: [TTEntry; CLUSTER_SIZE],
}

impl Cluster {
    const EMPTY: Self = Self {
        entries: [TTEntry::EMPTY; CLUSTER_SIZE],
    };
}

pub struct TranspositionTable {
    clusters: Vec<Cluster>,
    mask: u64,
    shift: u32,
    size_mb: usize,
    pub generation: u8,
}

impl TranspositionTable {
    pub fn new(size_mb: usize) -> Self {
        let bytes = (size_mb.max(1)) * 1024 * 1024;
        let cluster_size = std::mem::size_of::<Cluster>();
        let requested = (bytes / cluster_size).max(1);

        // Round down to a power of two so `index()` can take the mixed
        // key's high bits directly instead of computing a modulus.
        let mut num_clusters: u64 = 1;
        while (num_clusters * 2) as usize <= requested {
            num_clusters *= 2;
        }

        let shift = 64 - num_clusters.trailing_zeros();

        Self {
            clusters: vec![Cluster::EMPTY; num_clusters as usize],
            mask: num_clusters - 1,
            shift,
            size_mb,
            generation: 0,
        }
    }

    #[inline(always)]
    fn index(&self, key: u64) -> usize {
        (key.wrapping_mul(MIX) >> self.shift) as usize
    }

    pub fn new_search(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Rebuilds the table at a new size, discarding all entries. Used when
    /// `setoption name Hash value <mb>` changes the configured size.
    pub fn resize(&mut self, size_mb: usize) {
        *self = Self::new(size_mb);
    }

    pub fn size_mb(&self) -> usize {
        self.size_mb
    }

    pub fn clear(&mut self) {
        for cluster in self.clusters.iter_mut() {
            *cluster = Cluster::EMPTY;
        }
        self.generation = 0;
    }

    pub fn save(&mut self, key: u64, mv: Option<Move>, score: i32, depth: u8, bound: u8, _ply: i32) {
        let score_i16 = score.clamp(-32000, 32000) as i16;
        let key16 = (key >> 48) as u16;

        let idx = self.index(key);
        let cluster = &mut self.clusters[idx & self.mask as usize];

        // Replacement: prefer the entry already holding this position (a
        // transposition hit), else the entry with the stalest generation,
        // breaking ties toward the shallowest stored depth.
        let generation = self.generation;
        let mut target = 0usize;
        for (i, entry) in cluster.entries.iter().enumerate() {
            if entry.key16 == key16 && !entry.is_empty() {
                target = i;
                break;
            }
            if entry.generation != generation || entry.depth < cluster.entries[target].depth {
                target = i;
            }
        }

        let slot = &mut cluster.entries[target];
        // Preserve an existing best-move if this store doesn't carry one
        // (e.g. a fail-low that only refines the bound).
        let best_move = if mv.is_some() { mv } else { slot.best_move };

        *slot = TTEntry {
            best_move,
            score: score_i16,
            key16,
            depth,
            bound,
            generation,
        };
    }

    pub fn probe(
        &self,
        key: u64,
        _depth: u8,
        _alpha: i32,
        _beta: i32,
        _ply: i32,
    ) -> Option<(Option<Move>, i32, u8, u8)> {
        let idx = self.index(key);
        let key16 = (key >> 48) as u16;
        let cluster = &self.clusters[idx & self.mask as usize];

        for entry in cluster.entries.iter() {
            if entry.key16 == key16 && !entry.is_empty() {
                return Some((entry.best_move, entry.score as i32, entry.depth, entry.bound));
            }
        }
        None
    }
}
