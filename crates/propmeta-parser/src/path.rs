//! Dotted key path splitting.

/// Split a dotted key path into segments.
///
/// Bracketed indexes become their own segment (`hosts[0].name` gives
/// `hosts`, `0`, `name`). A trailing dot yields a trailing empty segment,
/// which is the prefix being completed.
pub fn split_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        let mut rest = part;
        loop {
            match rest.find('[') {
                Some(open) => {
                    let head = &rest[..open];
                    if !head.is_empty() {
                        segments.push(head.to_string());
                    }
                    let after = &rest[open + 1..];
                    match after.find(']') {
                        Some(close) => {
                            segments.push(after[..close].to_string());
                            rest = &after[close + 1..];
                            if rest.is_empty() {
                                break;
                            }
                        }
                        None => {
                            // unterminated index while typing
                            segments.push(after.to_string());
                            break;
                        }
                    }
                }
                None => {
                    segments.push(rest.to_string());
                    break;
                }
            }
        }
    }
    segments
}

/// Join segments back into a dotted path.
pub fn join_path<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<&str>>()
        .join(".")
}
