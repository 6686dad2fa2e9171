// src/sema/heuristics.rs
//
// Parameter-name type heuristics. Applied by the finalizer to parameters
// whose accumulated type sets came up empty, when the run enables them.

/// Infer types for a parameter list from the names alone. Returns one
/// entry per parameter; None means no rule matched. Names are matched
/// after stripping one leading underscore.
pub fn parameter_types(names: &[String]) -> Vec<Option<&'static str>> {
    let stripped: Vec<&str> = names
        .iter()
        .map(|n| n.strip_prefix('_').unwrap_or(n))
        .collect();

    let has = |name: &str| stripped.iter().any(|&n| n == name);

    // Group rules look at the whole list
    let delta_pair = has("dx") && has("dy");

    const DIMENSIONS: &[&str] = &["x", "y", "z", "w", "h", "width", "height"];
    let dimension_count = stripped
        .iter()
        .filter(|n| DIMENSIONS.contains(*n))
        .count();
    let dimension_group = dimension_count >= 2;

    const CHANNELS: &[&str] = &["r", "g", "b", "a"];
    let channel_count = stripped.iter().filter(|n| CHANNELS.contains(*n)).count();
    let channel_group = channel_count >= 3;

    stripped
        .iter()
        .map(|&name| {
            if delta_pair && (name == "dx" || name == "dy") {
                return Some("number");
            }
            if dimension_group && DIMENSIONS.contains(&name) {
                return Some("number");
            }
            if channel_group && CHANNELS.contains(&name) {
                return Some("number");
            }
            single_name_type(name)
        })
        .collect()
}

fn single_name_type(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        return None;
    }

    // is<Upper>... reads as a predicate
    if let Some(rest) = name.strip_prefix("is") {
        if rest.chars().next().is_some_and(|c| c.is_uppercase()) {
            return Some("boolean");
        }
    }

    if name == "target" || generic_placeholder(name, "param") || generic_placeholder(name, "arg") {
        return Some("unknown");
    }

    let starts_with_do = name.starts_with("do");
    if !starts_with_do {
        let lower = name.to_lowercase();
        if lower.starts_with("num") || lower.ends_with("num") {
            return Some("number");
        }
        if lower.ends_with("str") || lower.ends_with("name") || lower.ends_with("title") {
            return Some("string");
        }
    }

    None
}

/// `param1`, `arg2`, ... placeholder names
fn generic_placeholder(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}
