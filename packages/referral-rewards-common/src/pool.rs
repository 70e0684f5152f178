use cosmwasm_schema::cw_serde;
use sha2::{Digest, Sha256};

use crate::types::{PoolKey, PoolToken};

/// Primary pool: 1,000 cells = 980 Common / 19 Occasional / 1 Rare.
pub const PRIMARY_COMPOSITION: [(PoolToken, u32); 3] = [
    (PoolToken::Common, 980),
    (PoolToken::Occasional, 19),
    (PoolToken::Rare, 1),
];

/// Jackpot pool: 100,000 cells = 99,999 NO_HIT / 1 Jackpot.
pub const JACKPOT_COMPOSITION: [(PoolToken, u32); 2] =
    [(PoolToken::NoHit, 99_999), (PoolToken::Jackpot, 1)];

pub fn composition(key: PoolKey) -> &'static [(PoolToken, u32)] {
    match key {
        PoolKey::Primary => &PRIMARY_COMPOSITION,
        PoolKey::Jackpot => &JACKPOT_COMPOSITION,
    }
}

/// How the cells of a composition are ordered inside a pool.
#[cw_serde]
#[derive(Copy, Eq, Default)]
pub enum PoolLayout {
    /// Composition order: every Common, then every Occasional, then Rare.
    #[default]
    Contiguous,
    /// Round-robin across tokens, most frequent first, to avoid clusters.
    Interleaved,
}

/// A run of `count` identical cells.
#[cw_serde]
#[derive(Copy, Eq)]
pub struct Run {
    pub token: PoolToken,
    pub count: u32,
}

/// Expand a composition into run-length encoded cells for `layout`.
pub fn build_runs(composition: &[(PoolToken, u32)], layout: PoolLayout) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    match layout {
        PoolLayout::Contiguous => {
            for &(token, count) in composition {
                push_cells(&mut runs, token, count);
            }
        }
        PoolLayout::Interleaved => {
            let mut groups: Vec<(PoolToken, u32)> = composition
                .iter()
                .copied()
                .filter(|(_, count)| *count > 0)
                .collect();
            // stable: ties keep composition order
            groups.sort_by(|a, b| b.1.cmp(&a.1));

            let rounds = groups.first().map_or(0, |(_, count)| *count);
            for round in 0..rounds {
                for &(token, count) in &groups {
                    if count > round {
                        push_cells(&mut runs, token, 1);
                    }
                }
            }
        }
    }
    runs
}

fn push_cells(runs: &mut Vec<Run>, token: PoolToken, count: u32) {
    if count == 0 {
        return;
    }
    match runs.last_mut() {
        Some(last) if last.token == token => last.count += count,
        _ => runs.push(Run { token, count }),
    }
}

pub fn total_cells(runs: &[Run]) -> u32 {
    runs.iter().map(|run| run.count).sum()
}

/// Hex SHA-256 over the ordered runs. Two pools share a digest iff their
/// cell sequences are identical.
pub fn layout_digest(runs: &[Run]) -> String {
    let mut hasher = Sha256::new();
    for run in runs {
        hasher.update([run.token.tag()]);
        hasher.update(run.count.to_be_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Iterate cells cyclically starting at `start`, wrapping at the end.
///
/// Yields nothing for an empty layout; otherwise never terminates on its own,
/// so callers bound it with `take`.
pub fn cycle_from(runs: &[Run], start: u32) -> CycleFrom<'_> {
    let size = total_cells(runs);
    let mut run = 0;
    let mut offset = if size == 0 { 0 } else { start % size };
    while run < runs.len() && offset >= runs[run].count {
        offset -= runs[run].count;
        run += 1;
    }
    CycleFrom { runs, run, offset, empty: size == 0 }
}

pub struct CycleFrom<'a> {
    runs: &'a [Run],
    run: usize,
    offset: u32,
    empty: bool,
}

impl Iterator for CycleFrom<'_> {
    type Item = PoolToken;

    fn next(&mut self) -> Option<PoolToken> {
        if self.empty {
            return None;
        }
        // skip zero-length runs and wrap
        while self.run >= self.runs.len() || self.offset >= self.runs[self.run].count {
            if self.run >= self.runs.len() {
                self.run = 0;
            } else {
                self.run += 1;
            }
            self.offset = 0;
        }
        let token = self.runs[self.run].token;
        self.offset += 1;
        Some(token)
    }
}

/// Scan at most one full cycle from `cursor` for the first token in `allowed`.
///
/// Returns the token found (if any) and the number of cells consumed,
/// counting the accepted cell. A miss consumes exactly `size` cells.
pub fn scan(runs: &[Run], cursor: u32, allowed: &[PoolToken]) -> (Option<PoolToken>, u32) {
    let size = total_cells(runs);
    match cycle_from(runs, cursor)
        .take(size as usize)
        .enumerate()
        .find(|(_, token)| allowed.contains(token))
    {
        Some((index, token)) => (Some(token), index as u32 + 1),
        None => (None, size),
    }
}
