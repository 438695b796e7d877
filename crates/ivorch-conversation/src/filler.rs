//! Deterministic filler-phrase selection (spec.md §4.2 filler masking).

const FILLERS: &[&str] = &["Let me think about that.", "One moment.", "Give me a second."];

/// Pick a filler phrase for the given candidate turn sequence number,
/// cycling deterministically through a small pool so repeated nudges
/// into the same turn never repeat consecutively by chance alone being
/// avoided — tests can assert on which phrase a given `turn_seq` gets.
pub fn pick_filler(turn_seq: u64) -> &'static str {
    FILLERS[(turn_seq as usize) % FILLERS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_deterministically() {
        assert_eq!(pick_filler(0), pick_filler(FILLERS.len() as u64));
        assert_ne!(pick_filler(0), pick_filler(1));
    }
}
