/// What to tell an author whose reference did not resolve.
#[derive(Debug, Clone, PartialEq)]
pub enum Suggestion {
    /// A defined name that contains, or is contained by, the bad reference.
    DidYouMean(String),
    /// No close match; every defined name, sorted.
    Available(Vec<String>),
    /// Nothing is defined at all.
    NoneDefined,
}

/// Look for a near match by substring containment.
///
/// Substring containment only: `count` matches `counter-state`, while a
/// transposition typo like `conuter` matches nothing and falls back to
/// listing every candidate.
pub fn suggest<'a>(reference: &str, available: impl IntoIterator<Item = &'a str>) -> Suggestion {
    let mut names: Vec<&str> = available.into_iter().collect();
    names.sort_unstable();
    names.dedup();

    if names.is_empty() {
        return Suggestion::NoneDefined;
    }

    if !reference.is_empty() {
        if let Some(found) = names
            .iter()
            .find(|name| name.contains(reference) || reference.contains(**name))
        {
            return Suggestion::DidYouMean(found.to_string());
        }
    }

    Suggestion::Available(names.into_iter().map(str::to_string).collect())
}
