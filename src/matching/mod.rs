//! Fuzzy resolution of free-text names against a reference catalog.
//!
//! Matching is strict: exact normalized equality, then containment, then
//! token overlap. Anything weaker is reported as not found.

use crate::rules::names::{name_tokens, normalize_name};
use std::collections::HashSet;

/// Shared words needed for a token-overlap match, unless the input has fewer
pub const MIN_SHARED_TOKENS: usize = 2;

/// Which step produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Contains,
    Tokens,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceMatch {
    /// Position in the catalog slice
    pub index: usize,
    pub kind: MatchKind,
}

/// Normalized catalog, built once per batch
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    names: Vec<String>,
}

impl ReferenceIndex {
    pub fn new<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            names: names.into_iter().map(|n| normalize_name(n.as_ref())).collect(),
        }
    }

    pub fn push(&mut self, name: &str) {
        self.names.push(normalize_name(name));
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Resolve `input` against the catalog
    pub fn find(&self, input: &str) -> Option<ReferenceMatch> {
        let needle = normalize_name(input);
        if needle.is_empty() {
            return None;
        }

        if let Some(index) = self.names.iter().position(|n| *n == needle) {
            return Some(ReferenceMatch {
                index,
                kind: MatchKind::Exact,
            });
        }

        // Containment either way; the longest catalog name is the most specific
        let contained = self
            .names
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.is_empty() && (n.contains(&needle) || needle.contains(n.as_str())))
            .max_by(|(ia, a), (ib, b)| a.len().cmp(&b.len()).then(ib.cmp(ia)));
        if let Some((index, _)) = contained {
            return Some(ReferenceMatch {
                index,
                kind: MatchKind::Contains,
            });
        }

        let input_tokens: HashSet<&str> = name_tokens(&needle).into_iter().collect();
        if input_tokens.is_empty() {
            return None;
        }

        let mut best: Option<(usize, usize)> = None;
        for (index, name) in self.names.iter().enumerate() {
            let catalog_tokens: HashSet<&str> = name_tokens(name).into_iter().collect();
            let shared = input_tokens.intersection(&catalog_tokens).count();
            let accepted =
                shared >= MIN_SHARED_TOKENS || (shared > 0 && shared == input_tokens.len());
            if accepted && best.map_or(true, |(_, s)| shared > s) {
                best = Some((index, shared));
            }
        }

        best.map(|(index, _)| ReferenceMatch {
            index,
            kind: MatchKind::Tokens,
        })
    }
}

/// One-shot helper over a plain list of names
pub fn find_reference<S: AsRef<str>>(input: &str, catalog: &[S]) -> Option<ReferenceMatch> {
    ReferenceIndex::new(catalog.iter().map(|s| s.as_ref())).find(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_variants_resolve_to_same_entry() {
        let catalog = ["SEIXO BRITADO Nº1"];
        for input in ["SEIXO BRITADO N.1", "seixo britado n 1", "SEIXO BRITADO Nº 1"] {
            let found = find_reference(input, &catalog).expect(input);
            assert_eq!(found.index, 0);
            assert_eq!(found.kind, MatchKind::Exact);
        }
    }

    #[test]
    fn test_unknown_name_has_no_match() {
        let catalog = ["SEIXO BRITADO Nº1"];
        assert_eq!(find_reference("AREIA GROSSA", &catalog), None);
    }

    #[test]
    fn test_containment_prefers_longest() {
        let catalog = ["AREIA", "AREIA GROSSA LAVADA", "CIMENTO"];
        let found = find_reference("areia grossa", &catalog).unwrap();
        assert_eq!(found.index, 1);
        assert_eq!(found.kind, MatchKind::Contains);
    }

    #[test]
    fn test_token_overlap_needs_two_tokens() {
        let catalog = ["TIJOLO CERAMICO 8 FUROS", "TELHA CERAMICA"];
        let found = find_reference("Cerâmico tijolo", &catalog).unwrap();
        assert_eq!(found.index, 0);
        assert_eq!(found.kind, MatchKind::Tokens);

        // One shared token out of two is not enough
        assert_eq!(find_reference("TIJOLO BAIANO", &catalog), None);
    }

    #[test]
    fn test_single_token_input_fully_covered() {
        let catalog = ["CIMENTO CP II 50KG"];
        let found = find_reference("50KG CIMENTO", &catalog).unwrap();
        assert_eq!(found.kind, MatchKind::Tokens);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(find_reference("   ", &["A"]), None);
    }
}
