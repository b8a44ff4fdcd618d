//! The `option`/`setoption` surface of the UCI-style protocol: the engine's
//! configurable knobs, their defaults and ranges, and the parser that turns
//! a `setoption name <N> value <V>` line into a validated update. Grounded
//! in `examples/original_source/include/uci_options.hpp`'s `UCIOptions`
//! struct, widened to the three options this engine actually exposes.

const DEFAULT_THREADS: usize = 1;
const DEFAULT_HASH_MB: usize = 64;
const MAX_HASH_MB: usize = 4096;

/// Mutable engine configuration, held by the dispatcher and threaded into
/// `ThreadPool::new`/`resize`/`resize_hash` whenever an option changes.
#[derive(Clone, Debug)]
pub struct EngineOptions {
    pub threads: usize,
    pub hash_mb: usize,
    pub debug: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            hash_mb: DEFAULT_HASH_MB,
            debug: false,
        }
    }
}

impl EngineOptions {
    /// Clamps `threads` to `1..=max_threads` (the host's reported
    /// parallelism, or 1 if that can't be determined).
    pub fn max_threads() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    /// Applies one `setoption name <N> value <V>` line. Unknown option
    /// names are reported but not fatal, matching §7's "Unknown option
    /// name" policy of surfacing an `info string` rather than a panic.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), String> {
        match name.to_ascii_lowercase().as_str() {
            "threads" => {
                let requested: usize = value
                    .parse()
                    .map_err(|_| format!("invalid Threads value: {value}"))?;
                let clamped = requested.clamp(1, Self::max_threads());
                if clamped != requested {
                    self.threads = clamped;
                    return Err(format!(
                        "Threads value {requested} out of range, clamped to {clamped}"
                    ));
                }
                self.threads = clamped;
                Ok(())
            }
            "hash" => {
                let requested: usize = value
                    .parse()
                    .map_err(|_| format!("invalid Hash value: {value}"))?;
                let clamped = requested.clamp(1, MAX_HASH_MB);
                if clamped != requested {
                    self.hash_mb = clamped;
                    return Err(format!(
                        "Hash value {requested} out of range, clamped to {clamped}"
                    ));
                }
                self.hash_mb = clamped;
                Ok(())
            }
            "debug" => {
                self.debug = value.eq_ignore_ascii_case("true");
                Ok(())
            }
            other => Err(format!("unknown option name: {other}")),
        }
    }

    /// Prints the `option …` lines a `uci` command must emit, per §6.
    pub fn print_option_list() {
        let max_threads = Self::max_threads();
        println!(
            "option name Threads type spin default {DEFAULT_THREADS} min 1 max {max_threads}"
        );
        println!(
            "option name Hash type spin default {DEFAULT_HASH_MB} min 1 max {MAX_HASH_MB}"
        );
        println!("option name Debug type check default false");
    }
}

/// Parses a `setoption name <N> value <V>` command's tokens (everything
/// after `setoption`). Returns `(name, value)`, joining multi-word values
/// the way `name`/`value` tokens can straddle spaces.
pub fn parse_setoption(parts: &[&str]) -> Result<(String, String), String> {
    let name_idx = parts
        .iter()
        .position(|&p| p == "name")
        .ok_or_else(|| "missing 'name' token".to_string())?;
    let value_idx = parts.iter().position(|&p| p == "value");

    let name_end = value_idx.unwrap_or(parts.len());
    if name_idx + 1 >= name_end {
        return Err("missing option name".to_string());
    }
    let name = parts[name_idx + 1..name_end].join(" ");

    let value = match value_idx {
        Some(vi) if vi + 1 < parts.len() => parts[vi + 1..].join(" "),
        Some(_) => return Err("missing option value".to_string()),
        None => String::new(),
    };

    Ok((name, value))
}
