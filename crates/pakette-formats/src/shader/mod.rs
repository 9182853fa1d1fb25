//! Shader script parser
//!
//! Parses the brace-scoped material definition format found in
//! `scripts/*.shader` files, collecting the texture-map references each
//! definition declares. Rendering state directives (blend functions, culling
//! and the like) carry no file dependencies and are ignored.
//!
//! The format tolerates compact brace placement (`{ map foo.tga`), `//`
//! line comments and `/* */` block comments spanning physical lines, all of
//! which appear in shipped game data.

/// A parsed shader definition and its texture dependencies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderDef {
    /// Shader name, as written in the script
    pub name: String,
    /// Raw texture references in source order; may legitimately be empty,
    /// in which case the engine falls back to the shader name itself as an
    /// implicit texture
    pub textures: Vec<String>,
}

/// Skybox face suffixes appended to a `skyparms` base name
const SKY_SUFFIXES: [&str; 6] = ["_rt", "_lf", "_bk", "_ft", "_up", "_dn"];

/// Parse a shader script and return its definitions in source order
pub fn parse(text: &str) -> Vec<ShaderDef> {
    let mut shaders = Vec::new();
    let mut current: Option<ShaderDef> = None;
    let mut depth = 0i32;
    let mut in_block_comment = false;

    for raw_line in text.lines() {
        let mut line = raw_line.to_string();

        if in_block_comment {
            match line.find("*/") {
                Some(idx) => {
                    line = line[idx + 2..].to_string();
                    in_block_comment = false;
                }
                None => continue,
            }
        }

        strip_comments(&mut line, &mut in_block_comment);

        let mut rest = line.trim();
        while !rest.is_empty() {
            if let Some(stripped) = rest.strip_prefix('{') {
                depth += 1;
                rest = stripped.trim_start();
                continue;
            }
            if let Some(stripped) = rest.strip_prefix('}') {
                depth -= 1;
                if depth == 0 {
                    if let Some(def) = current.take() {
                        shaders.push(def);
                    }
                }
                rest = stripped.trim_start();
                continue;
            }

            // Free text up to the next brace (or end of line)
            let content = match rest.find(['{', '}']) {
                Some(idx) => {
                    let content = rest[..idx].trim();
                    rest = &rest[idx..];
                    content
                }
                None => {
                    let content = rest;
                    rest = "";
                    content
                }
            };

            if content.is_empty() {
                continue;
            }

            if depth == 0 {
                current = Some(ShaderDef {
                    name: content.to_string(),
                    textures: Vec::new(),
                });
                continue;
            }

            if let Some(def) = current.as_mut() {
                collect_directive(content, def);
            }
        }
    }

    shaders
}

/// Remove `//` and `/* */` comments from a single physical line
///
/// Whichever marker occurs first wins; an unterminated `/*` sets the
/// cross-line block-comment state.
fn strip_comments(line: &mut String, in_block_comment: &mut bool) {
    loop {
        let slash_slash = line.find("//");
        let slash_star = line.find("/*");

        match (slash_star, slash_slash) {
            (Some(star), line_pos) if line_pos.is_none_or(|ss| star < ss) => {
                match line[star + 2..].find("*/") {
                    Some(end) => {
                        let after = line[star + 2 + end + 2..].to_string();
                        line.truncate(star);
                        line.push_str(&after);
                    }
                    None => {
                        line.truncate(star);
                        *in_block_comment = true;
                        return;
                    }
                }
            }
            (_, Some(ss)) => {
                line.truncate(ss);
                return;
            }
            _ => return,
        }
    }
}

/// Apply one content segment inside a definition to its texture list
fn collect_directive(content: &str, def: &mut ShaderDef) {
    let tokens: Vec<&str> = content.split_whitespace().collect();
    let Some(directive) = tokens.first() else {
        return;
    };

    match directive.to_ascii_lowercase().as_str() {
        "map" | "clampmap" | "diffusemap" | "normalmap" | "specularmap" => {
            if let Some(&path) = tokens.get(1) {
                // '$'-prefixed sources (e.g. $lightmap) are render targets,
                // not files
                if !path.starts_with('$') {
                    def.textures.push(path.to_string());
                }
            }
        }
        "animmap" => {
            // animMap <frequency> <path>...
            for &path in tokens.iter().skip(2) {
                if !path.starts_with('$') {
                    def.textures.push(path.to_string());
                }
            }
        }
        "skyparms" => {
            // skyparms <farbox|-> <cloudheight> <nearbox|->
            if let Some(&base) = tokens.get(1) {
                if base != "-" {
                    for suffix in SKY_SUFFIXES {
                        def.textures.push(format!("{base}{suffix}"));
                    }
                }
            }
        }
        _ => {}
    }
}
