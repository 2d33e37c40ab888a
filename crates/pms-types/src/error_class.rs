/// Derives a bounded-cardinality metric label from an adapter error's
/// message: strip everything that isn't alphanumeric or whitespace, then
/// collapse whitespace runs to a single `_`.
pub fn normalize_error_class(message: &str) -> String {
    let stripped: String = message
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join("_")
}
