//! File paths for planned pages and components.

const HOME_PAGES: [&str; 3] = ["home", "index", "/"];

/// Route file for a page name.
///
/// `home`, `index` and `/` map to the root page; anything else becomes a
/// slugged route segment (`"Account Settings"` -> `app/account-settings/page.tsx`).
/// A name with no letters or digits gets a segment derived from its bytes
/// so it never lands on the root page.
pub fn page_path(name: &str) -> String {
    let trimmed = name.trim();
    if HOME_PAGES.contains(&trimmed.to_lowercase().as_str()) {
        return "app/page.tsx".to_string();
    }

    let route: Vec<String> = trimmed.split('/').map(slug).filter(|s| !s.is_empty()).collect();
    if route.is_empty() {
        return format!("app/page-{}/page.tsx", hex::encode(trimmed.as_bytes()));
    }
    format!("app/{}/page.tsx", route.join("/"))
}

/// Source file for a component name, or None when nothing usable remains.
pub fn component_path(name: &str) -> Option<String> {
    let pascal = pascal_case(name);
    (!pascal.is_empty()).then(|| format!("components/{}.tsx", pascal))
}

/// Lower-case, alphanumeric words joined with `-`. Letters outside ASCII
/// are kept.
pub fn slug(text: &str) -> String {
    words(text).map(|w| w.to_lowercase()).collect::<Vec<_>>().join("-")
}

/// `"navigation bar"` -> `NavigationBar`; existing capitals are kept.
pub fn pascal_case(text: &str) -> String {
    words(text)
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty())
}
