//! Text rendering utilities for human-friendly error messages.
//!
//! Formats bean creation chains, Rust type names and "did you mean"
//! suggestions for the container's error output.

/// Renders a creation chain as a readable string.
///
/// # Examples
/// ```
/// use sunduq_support::rendering::render_chain;
///
/// let chain = vec!["orderService", "paymentGateway", "orderService"];
/// assert_eq!(render_chain(&chain), "orderService → paymentGateway → orderService");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Shortens a fully qualified Rust type name for display.
///
/// ```
/// use sunduq_support::rendering::shorten_type_name;
///
/// let short = shorten_type_name("shop::services::OrderService");
/// assert_eq!(short, "OrderService");
///
/// let short = shorten_type_name("alloc::sync::Arc<dyn shop::clock::Clock>");
/// assert_eq!(short, "Arc<dyn Clock>");
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut chars = full_name.chars().peekable();
    let mut current_segment = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                current_segment.clear();
            }
            '<' | '>' | ',' | ' ' => {
                result.push_str(&current_segment);
                result.push(ch);
                current_segment.clear();
            }
            _ => current_segment.push(ch),
        }
    }

    result.push_str(&current_segment);
    result
}

/// Suggests registered names close to a requested one.
///
/// Works for bean names (`orderServce` → `orderService`) and for dotted type
/// names, where the last segment is compared as well.
///
/// ```
/// use sunduq_support::rendering::suggest_similar;
///
/// let known = ["orderService", "paymentGateway", "clock"];
/// assert_eq!(suggest_similar("orderServise", known, 3), vec!["orderService"]);
/// ```
pub fn suggest_similar<'a>(
    requested: &str,
    available: impl IntoIterator<Item = &'a str>,
    max_suggestions: usize,
) -> Vec<String> {
    let requested_lower = requested.to_lowercase();
    let requested_tail = last_segment(&requested_lower).to_string();

    let mut scored: Vec<(&str, usize)> = available
        .into_iter()
        .filter(|name| *name != requested)
        .filter_map(|name| {
            let name_lower = name.to_lowercase();
            let name_tail = last_segment(&name_lower);

            if name_lower.contains(&requested_lower) || requested_lower.contains(&name_lower) {
                return Some((name, 100));
            }

            if name_tail.contains(&requested_tail) || requested_tail.contains(name_tail) {
                return Some((name, 80));
            }

            let common = name_tail
                .chars()
                .zip(requested_tail.chars())
                .take_while(|(a, b)| a == b)
                .count();

            if common >= 3 {
                return Some((name, common * 10));
            }

            None
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}

fn last_segment(name: &str) -> &str {
    name.rsplit(['.', ':']).next().unwrap_or(name)
}
