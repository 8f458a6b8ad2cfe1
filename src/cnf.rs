// src/cnf.rs
//
// Structured editor for MariaDB option files (`[section]` + `key = value`).
// Lines we do not touch are written back byte-for-byte.

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Result, ToolError};

#[derive(Clone, Debug, PartialEq, Eq)]
enum Line {
    Section { name: String, raw: String },
    Option { key: String, value: Option<String>, raw: String },
    Other(String),
}

impl Line {
    fn raw(&self) -> &str {
        match self {
            Line::Section { raw, .. } | Line::Option { raw, .. } => raw,
            Line::Other(raw) => raw,
        }
    }
}

/// MariaDB treats `bind-address` and `bind_address` as the same option.
fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase().replace('-', "_")
}

fn parse_line(raw: &str) -> Line {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') || trimmed.starts_with('!') {
        return Line::Other(raw.to_string());
    }
    if let Some(rest) = trimmed.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            return Line::Section { name: rest[..end].trim().to_string(), raw: raw.to_string() };
        }
    }
    let active = strip_trailing_comment(trimmed);
    match active.split_once('=') {
        Some((key, value)) => Line::Option {
            key: normalize_key(key),
            value: Some(value.trim().trim_matches('"').to_string()),
            raw: raw.to_string(),
        },
        None => Line::Option { key: normalize_key(active), value: None, raw: raw.to_string() },
    }
}

/// `bind-address = 127.0.0.1 # local only` carries a trailing comment; a
/// `#` inside single or double quotes is part of the value.
fn strip_trailing_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    for (i, c) in line.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '#') => return line[..i].trim_end(),
            (None, _) => {}
        }
    }
    line
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerCnf {
    lines: Vec<Line>,
}

impl ServerCnf {
    pub fn parse(text: &str) -> Self {
        Self { lines: text.lines().map(parse_line).collect() }
    }

    /// A missing file parses as empty; the first `set` creates the section.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(Self::parse(&text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ToolError::io(path, e)),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line.raw());
            out.push('\n');
        }
        out
    }

    /// Atomic replace: temp file in the same directory, original mode kept,
    /// then rename over the target.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir).map_err(|e| ToolError::io(dir, e))?;

        let mode = std::fs::metadata(path).map(|m| m.permissions().mode()).unwrap_or(0o644);
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ToolError::io(dir, e))?;
        tmp.write_all(self.render().as_bytes()).map_err(|e| ToolError::io(tmp.path(), e))?;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(mode))
            .map_err(|e| ToolError::io(tmp.path(), e))?;
        tmp.persist(path).map_err(|e| ToolError::io(path, e.error))?;
        Ok(())
    }

    /// Indices of the lines that belong to `section` (header excluded).
    fn section_span(&self, section: &str) -> Vec<usize> {
        let mut current: Option<&str> = None;
        let mut span = Vec::new();
        for (i, line) in self.lines.iter().enumerate() {
            match line {
                Line::Section { name, .. } => current = Some(name.as_str()),
                _ if current == Some(section) => span.push(i),
                _ => {}
            }
        }
        span
    }

    /// Value of the last active `key` line in `section`. A bare flag such as
    /// `skip-networking` reads as an empty string.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        let wanted = normalize_key(key);
        self.section_span(section)
            .into_iter()
            .filter_map(|i| match &self.lines[i] {
                Line::Option { key, value, .. } if *key == wanted => Some(value.as_deref().unwrap_or("")),
                _ => None,
            })
            .last()
    }

    pub fn contains(&self, section: &str, key: &str) -> bool {
        self.get(section, key).is_some()
    }

    /// Removes every line for `key` in `section`. Returns how many were dropped.
    pub fn unset(&mut self, section: &str, key: &str) -> usize {
        let wanted = normalize_key(key);
        let doomed: Vec<usize> = self
            .section_span(section)
            .into_iter()
            .filter(|&i| matches!(&self.lines[i], Line::Option { key, .. } if *key == wanted))
            .collect();
        for &i in doomed.iter().rev() {
            self.lines.remove(i);
        }
        doomed.len()
    }

    /// Replaces every `key` line in `section` with a single `key = value`
    /// placed right after the section header.
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.unset(section, key);

        let header = self
            .lines
            .iter()
            .position(|l| matches!(l, Line::Section { name, .. } if name == section));
        let header = match header {
            Some(i) => i,
            None => {
                if self.lines.last().is_some_and(|l| !l.raw().trim().is_empty()) {
                    self.lines.push(Line::Other(String::new()));
                }
                let raw = format!("[{section}]");
                self.lines.push(Line::Section { name: section.to_string(), raw });
                self.lines.len() - 1
            }
        };

        let raw = format!("{key} = {value}");
        self.lines.insert(
            header + 1,
            Line::Option { key: normalize_key(key), value: Some(value.to_string()), raw },
        );
    }
}
