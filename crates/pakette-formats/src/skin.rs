//! Skin file parser
//!
//! `.skin` files assign textures to the surfaces of a player model, one
//! `surface,texture_path` pair per line. Only the texture paths matter for
//! dependency resolution.

/// Parse a `.skin` file and return its non-empty texture paths in order
pub fn parse(text: &str) -> Vec<String> {
    let mut textures = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        let Some((_, path)) = line.split_once(',') else {
            continue;
        };
        let path = path.trim();
        if !path.is_empty() {
            textures.push(path.to_string());
        }
    }

    textures
}
