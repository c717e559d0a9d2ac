//! Naming rules for namespaces, type names and bean names.
//!
//! Type names are dotted (`shop.order.OrderService`); the namespace of a type
//! is everything before the last dot and maps to a slash-separated path on a
//! search root.

/// Returns the last dotted segment of a qualified type name.
///
/// ```
/// use sunduq_support::naming::simple_name;
///
/// assert_eq!(simple_name("shop.order.OrderService"), "OrderService");
/// assert_eq!(simple_name("Standalone"), "Standalone");
/// ```
pub fn simple_name(qualified: &str) -> &str {
    match qualified.rfind('.') {
        Some(idx) => &qualified[idx + 1..],
        None => qualified,
    }
}

/// Returns the namespace part of a qualified type name (empty for top-level types).
///
/// ```
/// use sunduq_support::naming::namespace_of;
///
/// assert_eq!(namespace_of("shop.order.OrderService"), "shop.order");
/// assert_eq!(namespace_of("Standalone"), "");
/// ```
pub fn namespace_of(qualified: &str) -> &str {
    match qualified.rfind('.') {
        Some(idx) => &qualified[..idx],
        None => "",
    }
}

/// Lower-cases the first character, leaving the rest untouched.
///
/// ```
/// use sunduq_support::naming::decapitalize;
///
/// assert_eq!(decapitalize("OrderService"), "orderService");
/// assert_eq!(decapitalize("createClock"), "createClock");
/// ```
pub fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Derives the default bean name of a type: its simple name, lower-camel-cased.
pub fn default_bean_name(qualified: &str) -> String {
    decapitalize(simple_name(qualified))
}

/// Translates a dotted namespace into a relative, slash-separated path.
pub fn namespace_to_path(namespace: &str) -> String {
    namespace.replace('.', "/")
}

/// Converts a logical resource path into a dotted type name.
///
/// Returns `None` when the path does not end with `suffix`.
///
/// ```
/// use sunduq_support::naming::path_to_type_name;
///
/// assert_eq!(
///     path_to_type_name("shop/order/OrderService.type", ".type").as_deref(),
///     Some("shop.order.OrderService"),
/// );
/// assert_eq!(path_to_type_name("shop/readme.md", ".type"), None);
/// ```
pub fn path_to_type_name(path: &str, suffix: &str) -> Option<String> {
    let stem = path.strip_suffix(suffix)?;
    if stem.is_empty() || stem.ends_with('/') || stem.ends_with('\\') {
        return None;
    }
    Some(stem.replace(['/', '\\'], "."))
}
