//! NiCad classes-report parser.
//!
//! The report is XML-shaped but line-oriented: one `<class ...>` element
//! per clone class, each containing one `<source file=.. startline=..
//! endline=..>` element per clone. A line scanner with two anchored
//! regexes is enough; a full XML reader would only add failure modes for
//! the entity-escaping NiCad never emits.

use crate::errors::DetectError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

static CLASS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<class\s+classid="(\d+)""#).unwrap()
});

static SOURCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<source\s+file="([^"]+)"\s+startline="(\d+)"\s+endline="(\d+)""#).unwrap()
});

/// One clone as located by the detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneSpan {
    pub file: PathBuf,
    pub start_line: usize,
    pub end_line: usize,
}

/// One clone class from the report, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneGroup {
    pub id: usize,
    pub members: Vec<CloneSpan>,
}

pub fn parse_report(path: &Path) -> Result<Vec<CloneGroup>, DetectError> {
    let text = fs::read_to_string(path).map_err(|_| DetectError::MissingReport {
        path: path.to_path_buf(),
    })?;
    parse_report_text(path, &text)
}

fn parse_report_text(path: &Path, text: &str) -> Result<Vec<CloneGroup>, DetectError> {
    let malformed = |line: usize, detail: &str| DetectError::MalformedReport {
        path: path.to_path_buf(),
        line,
        detail: detail.to_string(),
    };

    let mut groups: Vec<CloneGroup> = Vec::new();
    let mut open: Option<CloneGroup> = None;

    for (index, line) in text.lines().enumerate() {
        let lineno = index + 1;
        if let Some(caps) = CLASS_RE.captures(line) {
            if open.is_some() {
                return Err(malformed(lineno, "nested <class> element"));
            }
            let id = caps[1]
                .parse()
                .map_err(|_| malformed(lineno, "classid is not a number"))?;
            open = Some(CloneGroup {
                id,
                members: Vec::new(),
            });
        } else if let Some(caps) = SOURCE_RE.captures(line) {
            let group = open
                .as_mut()
                .ok_or_else(|| malformed(lineno, "<source> outside a <class> element"))?;
            let parse = |n: usize, what: &str| {
                caps[n]
                    .parse::<usize>()
                    .map_err(|_| malformed(lineno, what))
            };
            group.members.push(CloneSpan {
                file: PathBuf::from(&caps[1]),
                start_line: parse(2, "startline is not a number")?,
                end_line: parse(3, "endline is not a number")?,
            });
        } else if line.contains("</class>") {
            let group = open
                .take()
                .ok_or_else(|| malformed(lineno, "unmatched </class>"))?;
            groups.push(group);
        }
    }

    if open.is_some() {
        return Err(malformed(
            text.lines().count(),
            "unterminated <class> element",
        ));
    }
    Ok(groups)
}
