use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("missing_identifier")]
    MissingIdentifier,

    #[error("no_project_match")]
    NoProjectMatch,

    #[error("ambiguous_identifier:{}", .0.join(","))]
    Ambiguous(Vec<String>),
}

/// Map a free-text identifier onto exactly one configured pipeline name.
///
/// Order: exact match wins outright; otherwise every name that contains the
/// identifier or ends with it (both case-insensitive) is a candidate, and
/// exactly one candidate is required. Candidates in the ambiguity error are
/// sorted.
pub fn resolve_project<'a, I>(names: I, identifier: Option<&str>) -> Result<String, ResolveError>
where
    I: IntoIterator<Item = &'a str>,
{
    let identifier = match identifier {
        Some(id) if !id.is_empty() => id,
        _ => return Err(ResolveError::MissingIdentifier),
    };

    let names: Vec<&str> = names.into_iter().collect();
    if names.contains(&identifier) {
        return Ok(identifier.to_string());
    }

    let needle = identifier.to_lowercase();
    let mut candidates: Vec<String> = names
        .iter()
        .filter(|name| {
            let hay = name.to_lowercase();
            hay.contains(&needle) || hay.ends_with(&needle)
        })
        .map(|name| name.to_string())
        .collect();
    candidates.sort();
    candidates.dedup();

    match candidates.len() {
        0 => Err(ResolveError::NoProjectMatch),
        1 => Ok(candidates.remove(0)),
        _ => Err(ResolveError::Ambiguous(candidates)),
    }
}
