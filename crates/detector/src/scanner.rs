use crate::error::ScanMiss;
use crate::marker::Marker;
use crate::path_guard::PathGuard;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const NAME: &str = r"[A-Za-z_][A-Za-z0-9_]*";

/// Parenthesized arguments: quoted strings may hold any bracket, and one
/// level of nested parentheses is allowed.
const ARGS: &str = r#"\((?:[^()'"]|'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*"|\((?:[^()'"]|'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*")*\))*\)"#;

static ATTRIBUTE_REGEX: OnceLock<Regex> = OnceLock::new();
static ATTRIBUTE_ITEM_REGEX: OnceLock<Regex> = OnceLock::new();
static FUNCTION_HEADER_REGEX: OnceLock<Regex> = OnceLock::new();

fn item_pattern() -> String {
    format!(r"\\?{NAME}(?:\\{NAME})*\s*(?:{ARGS})?")
}

/// One attribute group: `#[`, a comma-separated list of optionally namespaced
/// identifiers with optional arguments, `]`. Capture group 1 is the list.
pub fn attribute_regex() -> &'static Regex {
    ATTRIBUTE_REGEX.get_or_init(|| {
        let item = item_pattern();
        Regex::new(&format!(r"#\[\s*({item}(?:\s*,\s*{item})*)\s*,?\s*\]"))
            .expect("attribute pattern is valid")
    })
}

fn attribute_item_regex() -> &'static Regex {
    ATTRIBUTE_ITEM_REGEX.get_or_init(|| {
        Regex::new(&format!(r"\\?({NAME}(?:\\{NAME})*)\s*(?:{ARGS})?"))
            .expect("attribute item pattern is valid")
    })
}

fn function_header_regex() -> &'static Regex {
    FUNCTION_HEADER_REGEX.get_or_init(|| {
        Regex::new(&format!(r"\bfunction\s+&?({NAME})\s*\("))
            .expect("function header pattern is valid")
    })
}

/// Every annotation identifier declared immediately before `method`'s header,
/// in source order.
///
/// Comments are ignored. The search window runs from the last `{`, `}` or `;`
/// outside strings and attribute groups, so annotations of an earlier member
/// are never attributed to this one.
pub fn scan_annotations(source: &str, method: &str) -> Result<Vec<String>, ScanMiss> {
    let code = strip_comments(source);
    let Some(header_start) = function_header_regex()
        .captures_iter(&code)
        .find(|caps| &caps[1] == method)
        .and_then(|caps| caps.get(0))
        .map(|m| m.start())
    else {
        return Err(ScanMiss::NoMethod(method.to_string()));
    };

    let before = &code[..header_start];
    let window = &before[member_start(before)..];

    let identifiers: Vec<String> = attribute_regex()
        .captures_iter(window)
        .filter_map(|caps| caps.get(1))
        .flat_map(|list| {
            attribute_item_regex()
                .captures_iter(list.as_str())
                .filter_map(|item| item.get(1))
                .map(|name| name.as_str().to_string())
                .collect::<Vec<_>>()
        })
        .collect();

    if identifiers.is_empty() {
        return Err(ScanMiss::NoAnnotation(method.to_string()));
    }
    Ok(identifiers)
}

/// The marker annotation on `method`, if any.
///
/// Prefers the first identifier naming a known [`Marker`]; otherwise the first
/// identifier found, so custom markers can still be mapped.
pub fn scan_marker(source: &str, method: &str) -> Option<String> {
    let identifiers = scan_annotations(source, method).ok()?;
    pick_marker(identifiers)
}

/// Replace `//`, `#` and `/* */` comments with whitespace. String literals
/// and `#[` attribute openers are kept.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        let next = chars.peek().copied();
        if (c == '/' && next == Some('/')) || (c == '#' && next != Some('[')) {
            while chars.next_if(|&n| n != '\n').is_some() {}
            out.push(' ');
        } else if c == '/' && next == Some('*') {
            chars.next();
            let mut prev = '\0';
            for n in chars.by_ref() {
                if prev == '*' && n == '/' {
                    break;
                }
                prev = n;
            }
            out.push(' ');
        } else {
            if matches!(c, '\'' | '"') {
                quote = Some(c);
            }
            out.push(c);
        }
    }
    out
}

/// Byte offset just past the last member delimiter (`{`, `}` or `;`) that
/// sits outside string literals and attribute groups.
fn member_start(code: &str) -> usize {
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0usize;
    let mut prev = '\0';

    for (idx, c) in code.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            prev = c;
            continue;
        }

        match c {
            '\'' | '"' => quote = Some(c),
            '[' if prev == '#' || depth > 0 => depth += 1,
            ']' if depth > 0 => depth -= 1,
            '{' | '}' | ';' if depth == 0 => start = idx + 1,
            _ => {}
        }
        prev = c;
    }
    start
}

fn pick_marker(identifiers: Vec<String>) -> Option<String> {
    identifiers
        .iter()
        .find(|id| id.parse::<Marker>().is_ok())
        .cloned()
        .or_else(|| identifiers.into_iter().next())
}

/// Namespace → file convention of the scanned source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    /// Root namespace of application code (e.g. `App`)
    pub app_namespace: String,

    /// Directory holding that namespace, relative to the root (e.g. `app`)
    pub app_directory: String,

    /// Source file extension without the dot
    pub extension: String,
}

impl Default for SourceLayout {
    fn default() -> Self {
        Self {
            app_namespace: "App".to_string(),
            app_directory: "app".to_string(),
            extension: "php".to_string(),
        }
    }
}

impl SourceLayout {
    /// Map `App\Jobs\SyncUsers` to `app/Jobs/SyncUsers.php`.
    ///
    /// Classes outside the application namespace have no path. Segments are
    /// carried over verbatim; the path guard decides whether the result is
    /// acceptable.
    pub fn relative_path(&self, class: &str) -> Option<PathBuf> {
        let class = class.trim().trim_start_matches('\\');
        let mut segments = class.split('\\');
        if segments.next()? != self.app_namespace {
            return None;
        }

        let rest: Vec<&str> = segments.collect();
        if rest.is_empty() || rest.iter().any(|segment| segment.is_empty()) {
            return None;
        }

        let mut path = PathBuf::from(&self.app_directory);
        for segment in &rest {
            path.push(segment);
        }
        path.set_extension(&self.extension);
        Some(path)
    }
}

/// Best-effort marker lookup over a source tree snapshot.
#[derive(Debug, Clone)]
pub struct SourceScanner {
    layout: SourceLayout,
    guard: PathGuard,
    max_bytes: u64,
}

impl SourceScanner {
    pub fn new(root: impl AsRef<Path>, layout: SourceLayout, max_bytes: u64) -> Self {
        Self {
            layout,
            guard: PathGuard::new(root),
            max_bytes,
        }
    }

    pub fn layout(&self) -> &SourceLayout {
        &self.layout
    }

    /// Read the file defining `class` and return the marker annotating
    /// `method`. Never panics and never touches a file outside the root.
    pub fn scan_class(&self, class: &str, method: &str) -> Result<String, ScanMiss> {
        let relative = self
            .layout
            .relative_path(class)
            .ok_or_else(|| ScanMiss::Unmapped(class.to_string()))?;
        let path = self.guard.check(&relative)?;
        let display = path.display().to_string();

        let meta = fs::metadata(&path).map_err(|source| ScanMiss::Unreadable {
            path: display.clone(),
            source,
        })?;
        if meta.len() > self.max_bytes {
            return Err(ScanMiss::TooLarge {
                path: display,
                size: meta.len(),
                limit: self.max_bytes,
            });
        }

        let bytes = fs::read(&path).map_err(|source| ScanMiss::Unreadable {
            path: display,
            source,
        })?;
        let source = String::from_utf8_lossy(&bytes);
        let identifiers = scan_annotations(&source, method)?;
        pick_marker(identifiers).ok_or_else(|| ScanMiss::NoAnnotation(method.to_string()))
    }
}
