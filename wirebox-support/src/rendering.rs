//! Text rendering utilities for human-friendly error messages.
//!
//! Provides helpers to format resolution chains, class paths,
//! and "did you mean?" suggestions in error output.

/// Renders a resolution chain as a readable string.
///
/// # Examples
/// ```
/// use wirebox_support::rendering::render_chain;
///
/// let chain = vec!["Mailer", "ILogger", "FileLogger"];
/// assert_eq!(render_chain(&chain), "Mailer → ILogger → FileLogger");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Renders only the last `keep` entries of a chain, prefixed with an
/// ellipsis when entries were dropped.
///
/// Deep resolution chains run into the hundreds of entries; the tail is
/// where the repetition shows.
///
/// ```
/// use wirebox_support::rendering::render_chain_tail;
///
/// let chain = vec!["A", "B", "A", "B", "A"];
/// assert_eq!(render_chain_tail(&chain, 3), "… → A → B → A");
/// assert_eq!(render_chain_tail(&chain, 10), "A → B → A → B → A");
/// ```
pub fn render_chain_tail(chain: &[impl AsRef<str>], keep: usize) -> String {
    if chain.len() <= keep {
        return render_chain(chain);
    }

    let tail = render_chain(&chain[chain.len() - keep..]);
    format!("… → {tail}")
}

/// Shortens a class path to its last segment.
///
/// Both `::` and `\` are accepted as separators.
///
/// ```
/// use wirebox_support::rendering::shorten_class_name;
///
/// assert_eq!(shorten_class_name("app::mail::Mailer"), "Mailer");
/// assert_eq!(shorten_class_name("App\\Mail\\Mailer"), "Mailer");
/// assert_eq!(shorten_class_name("Mailer"), "Mailer");
/// ```
pub fn shorten_class_name(full_name: &str) -> &str {
    let after_colons = full_name.rsplit("::").next().unwrap_or(full_name);
    after_colons.rsplit('\\').next().unwrap_or(after_colons)
}

/// Levenshtein distance over chars.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Picks up to `limit` names from `available` that look like `requested`.
///
/// Substring matches on the short name rank first, then names within a
/// small edit distance, closest first. Comparison ignores case.
pub fn suggest_similar<'a>(
    requested: &str,
    available: impl IntoIterator<Item = &'a str>,
    limit: usize,
) -> Vec<String> {
    let wanted = shorten_class_name(requested).to_lowercase();
    if wanted.is_empty() {
        return Vec::new();
    }
    let tolerance = (wanted.chars().count() / 3).max(2);

    let mut scored: Vec<(usize, &str)> = available
        .into_iter()
        .filter(|name| *name != requested)
        .filter_map(|name| {
            let short = shorten_class_name(name).to_lowercase();
            if short.contains(&wanted) || wanted.contains(&short) {
                return Some((0, name));
            }
            let distance = edit_distance(&wanted, &short);
            (distance <= tolerance).then_some((distance, name))
        })
        .collect();

    scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    scored.dedup_by(|a, b| a.1 == b.1);
    scored
        .into_iter()
        .take(limit)
        .map(|(_, name)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_empty_chain() {
        let chain: Vec<&str> = vec![];
        assert_eq!(render_chain(&chain), "");
    }

    #[test]
    fn tail_keeps_short_chains_whole() {
        assert_eq!(render_chain_tail(&["A"], 1), "A");
        assert_eq!(render_chain_tail(&["A", "B"], 1), "… → B");
    }

    #[test]
    fn edit_distance_basics() {
        assert_eq!(edit_distance("", ""), 0);
        assert_eq!(edit_distance("Mailer", "Mailer"), 0);
        assert_eq!(edit_distance("Mailer", "Mialer"), 2);
        assert_eq!(edit_distance("Logger", "Loger"), 1);
        assert_eq!(edit_distance("abc", ""), 3);
    }

    #[test]
    fn suggest_typo() {
        let available = ["app::Mailer", "app::FileLogger", "app::Database"];
        let suggestions = suggest_similar("app::Mialer", available, 3);
        assert_eq!(suggestions, vec!["app::Mailer".to_string()]);
    }

    #[test]
    fn suggest_substring_first() {
        let available = ["Logger", "ILogger", "Loggers"];
        let suggestions = suggest_similar("Logger2", available, 2);
        assert_eq!(suggestions.len(), 2);
        assert!(suggestions.iter().all(|s| s.contains("Logger")));
    }

    #[test]
    fn suggest_skips_exact_and_unrelated() {
        let available = ["Database", "Mailer"];
        assert!(suggest_similar("Database", available, 3).is_empty());
        assert!(suggest_similar("XyzQwerty", available, 3).is_empty());
    }
}
