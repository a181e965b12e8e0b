//! Fuzzy and prefix matching with highlight markup.
//!
//! Wraps the skim algorithm from `fuzzy-matcher` and keeps the matched
//! character positions so titles can be rendered with `<b>` highlights.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

/// A candidate that matched a query, with matched char positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<'a, T> {
    /// The matched element.
    pub elem: &'a T,
    /// Char indices of the key that matched the query.
    pub indices: Vec<usize>,
}

/// Ranks candidate lists against query fragments.
pub struct Matcher {
    skim: SkimMatcherV2,
}

impl Matcher {
    /// Create a case-insensitive matcher.
    pub fn new() -> Self {
        Self {
            skim: SkimMatcherV2::default().ignore_case(),
        }
    }

    /// Fuzzy-match `items` against `query`.
    ///
    /// Returns matches sorted by score (highest first). Equal scores keep
    /// their input order.
    pub fn fuzzy<'a, T, F>(&self, items: &'a [T], query: &str, key: F) -> Vec<Match<'a, T>>
    where
        F: Fn(&T) -> &str,
    {
        let mut scored: Vec<(i64, Match<'a, T>)> = items
            .iter()
            .filter_map(|elem| {
                self.skim
                    .fuzzy_indices(key(elem), query)
                    .map(|(score, indices)| (score, Match { elem, indices }))
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().map(|(_, m)| m).collect()
    }

    /// Return the items whose key starts with `prefix` (case-insensitive).
    pub fn head<'a, T, F>(&self, items: &'a [T], prefix: &str, key: F) -> Vec<Match<'a, T>>
    where
        F: Fn(&T) -> &str,
    {
        let prefix_lower: Vec<char> = prefix.to_lowercase().chars().collect();

        items
            .iter()
            .filter_map(|elem| {
                prefix_len(key(elem), &prefix_lower).map(|len| Match {
                    elem,
                    indices: (0..len).collect(),
                })
            })
            .collect()
    }

    /// Wrap each run of matched characters in `<b>` tags.
    pub fn bold_html(text: &str, indices: &[usize]) -> String {
        let mut out = String::with_capacity(text.len() + indices.len() * 7);
        let mut open = false;

        for (i, c) in text.chars().enumerate() {
            let matched = indices.contains(&i);
            if matched && !open {
                out.push_str("<b>");
                open = true;
            } else if !matched && open {
                out.push_str("</b>");
                open = false;
            }
            out.push(c);
        }

        if open {
            out.push_str("</b>");
        }
        out
    }
}

/// Number of chars of `key` covered by the lowercased prefix, or `None` if
/// `key` does not start with it. A key char may lowercase to several chars.
fn prefix_len(key: &str, prefix_lower: &[char]) -> Option<usize> {
    let mut rest = prefix_lower;
    let mut count = 0;

    for c in key.chars() {
        if rest.is_empty() {
            break;
        }
        for lower in c.to_lowercase() {
            let Some((first, tail)) = rest.split_first() else {
                break;
            };
            if *first != lower {
                return None;
            }
            rest = tail;
        }
        count += 1;
    }

    rest.is_empty().then_some(count)
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new()
    }
}
