use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]+)-([A-Za-z0-9-]+)\.([A-Za-z0-9]+)$").expect("valid filename pattern")
});

/// Components of a migration filename such as `1734567890-create-users.sql`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFilename {
    pub timestamp: i64,
    /// Slug with hyphens rendered as spaces
    pub name: String,
    pub extension: String,
}

/// Parse a migration filename. Returns `None` for anything that does not look
/// like `<digits>-<slug>.<ext>`, including timestamps that overflow an `i64`.
pub fn parse_migration_filename(filename: &str) -> Option<ParsedFilename> {
    let captures = FILENAME.captures(filename)?;
    let timestamp = captures[1].parse::<i64>().ok()?;

    Some(ParsedFilename {
        timestamp,
        name: captures[2].replace('-', " "),
        extension: captures[3].to_string(),
    })
}

/// Parse the final component of `path` as a migration filename
pub fn parse_migration_path(path: &Path) -> Option<ParsedFilename> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(parse_migration_filename)
}

/// Turn a free-form description into a filename slug: lowercase ASCII
/// alphanumerics with every other run of characters collapsed to one `-`.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_separator = false;

    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}
