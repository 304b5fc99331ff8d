//! Text rendering helpers for human-friendly diagnostics.
//!
//! Type names coming from [`std::any::type_name`] are fully qualified and
//! noisy; these helpers turn them into something a reader can scan.

/// Characters that separate path tokens inside a rendered type name.
const DELIMITERS: &[char] = &['<', '>', ',', ' ', '(', ')', '[', ']', ';', '&', '*'];

/// Shortens a fully qualified type name for display.
///
/// Every path keeps only its last segment; generic structure is preserved.
///
/// ```
/// use infuse_support::rendering::shorten_type_name;
///
/// assert_eq!(shorten_type_name("my_app::services::Mailer"), "Mailer");
/// assert_eq!(
///     shorten_type_name("alloc::sync::Arc<dyn my_app::ports::Clock>"),
///     "Arc<dyn Clock>"
/// );
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut out = String::with_capacity(full_name.len());
    let mut token = String::new();

    for ch in full_name.chars() {
        if DELIMITERS.contains(&ch) {
            out.push_str(last_segment(&token));
            out.push(ch);
            token.clear();
        } else {
            token.push(ch);
        }
    }

    out.push_str(last_segment(&token));
    out
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Picks registered type names that look like the one that was requested.
///
/// Used to build the "did you mean" list of a missing-dependency error.
/// Candidates are ranked by how closely their short names match, best first.
pub fn suggest_similar(requested: &str, available: &[&str], max_suggestions: usize) -> Vec<String> {
    let wanted = shorten_type_name(requested).to_lowercase();

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .filter(|name| **name != requested)
        .filter_map(|&name| {
            let candidate = shorten_type_name(name).to_lowercase();

            // Same short name living in another module.
            if candidate == wanted {
                return Some((name, 100));
            }

            if candidate.contains(&wanted) || wanted.contains(&candidate) {
                return Some((name, 80));
            }

            let common = candidate
                .chars()
                .zip(wanted.chars())
                .take_while(|(a, b)| a == b)
                .count();

            (common >= 3).then(|| (name, (common * 10).min(79)))
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Renders `(field, type)` pairs as `field: Type, other: Other`.
///
/// ```
/// use infuse_support::rendering::render_fields;
///
/// let rendered = render_fields(&[("clock", "app::Clock"), ("mailer", "app::Mailer")]);
/// assert_eq!(rendered, "clock: Clock, mailer: Mailer");
/// ```
pub fn render_fields(fields: &[(impl AsRef<str>, impl AsRef<str>)]) -> String {
    fields
        .iter()
        .map(|(field, ty)| format!("{}: {}", field.as_ref(), shorten_type_name(ty.as_ref())))
        .collect::<Vec<_>>()
        .join(", ")
}
