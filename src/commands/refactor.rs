//! One refactoring run: stage, detect, resolve clone groups against
//! parsed sources, drive each clone class, and write the results.

use crate::ast::parse::parse_source;
use crate::ast::{FileId, SourceTree};
use crate::config::Config;
use crate::detect::report::{parse_report, CloneGroup};
use crate::detect::{staging, Detector};
use crate::refactor::{Clone, CloneClass, RefactorOutcome, SkipReason};
use anyhow::{Context, Result};
use log::{error, info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub struct RefactorOptions {
    pub path: PathBuf,
    pub report: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub dry_run: bool,
}

pub fn run(options: RefactorOptions) -> Result<()> {
    let config = Config::load(options.config.as_deref())?;

    let groups = match &options.report {
        Some(report) => parse_report(report)
            .with_context(|| format!("failed to read clone report {}", report.display()))?,
        None => detect(&options.path, &config)?,
    };
    if groups.is_empty() {
        info!("no clone classes reported, nothing to do");
        return Ok(());
    }
    info!("{} clone class(es) reported", groups.len());

    let mut tree = SourceTree::new();
    let mut file_ids: HashMap<PathBuf, FileId> = HashMap::new();
    let mut merged = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for group in &groups {
        let clones = match resolve_group(&mut tree, &mut file_ids, group) {
            Ok(clones) => clones,
            Err(e) => {
                error!("clone class {}: {e:#}", group.id);
                failed += 1;
                continue;
            }
        };
        let mut class = CloneClass::new(group.id, clones);
        // One class failing must not abort the rest of the run; classes
        // merged before the failure keep their edits.
        match class.refactor(&mut tree) {
            Ok(RefactorOutcome::Merged {
                target, detached, ..
            }) => {
                info!(
                    "clone class {}: merged into `{target}` ({detached} clone(s) removed)",
                    group.id
                );
                merged += 1;
            }
            Ok(RefactorOutcome::Skipped(reason)) => {
                let why = match reason {
                    SkipReason::InsufficientClones => "fewer than two mergeable clones",
                    SkipReason::NothingToExtract => "clones are identical",
                };
                info!("clone class {}: skipped, {why}", group.id);
                skipped += 1;
            }
            Ok(RefactorOutcome::AlreadyMerged) => {}
            Err(e) => {
                error!("clone class {}: {e}", group.id);
                failed += 1;
            }
        }
    }

    emit(&tree, options.dry_run)?;
    info!("{merged} class(es) merged, {skipped} skipped, {failed} failed");
    Ok(())
}

/// Run the external detector over a staged copy of the candidate tree and
/// map the reported paths back to the original files.
fn detect(path: &Path, config: &Config) -> Result<Vec<CloneGroup>> {
    let staged = staging::stage(path, &config.staging.include)?;
    let report_path = Detector::new(&config.detector).run(staged.root())?;
    let mut groups = parse_report(&report_path)?;
    for group in &mut groups {
        for member in &mut group.members {
            if let Some(original) = staged.unstage(&member.file, path) {
                member.file = original;
            }
        }
    }
    Ok(groups)
}

/// Parse (once) every file a group references and pick out the reported
/// function definitions. A member whose lines match no function is
/// dropped with a warning; the rest of the group still merges.
fn resolve_group(
    tree: &mut SourceTree,
    file_ids: &mut HashMap<PathBuf, FileId>,
    group: &CloneGroup,
) -> Result<Vec<Clone>> {
    let mut clones = Vec::new();
    for member in &group.members {
        let file = match file_ids.get(&member.file) {
            Some(id) => *id,
            None => {
                let text = fs::read_to_string(&member.file)
                    .with_context(|| format!("failed to read {}", member.file.display()))?;
                let id = parse_source(tree, member.file.clone(), &text)
                    .with_context(|| format!("failed to parse {}", member.file.display()))?;
                file_ids.insert(member.file.clone(), id);
                id
            }
        };
        let located = tree
            .functions_with_parents(file)
            .into_iter()
            .find(|(node, _)| {
                let line = tree.node(*node).line;
                (member.start_line..=member.end_line).contains(&line)
            });
        match located {
            Some((node, parent)) => clones.push(Clone::from_function(tree, node, parent)?),
            None => warn!(
                "no function at {}:{}-{}, dropping clone",
                member.file.display(),
                member.start_line,
                member.end_line
            ),
        }
    }
    Ok(clones)
}

/// Write every modified file back in place, or print the rewritten text
/// on a dry run.
fn emit(tree: &SourceTree, dry_run: bool) -> Result<()> {
    for file in tree.files() {
        if !tree.is_modified(file) {
            continue;
        }
        let path = tree.file(file).path.clone();
        let rendered = tree
            .rendered(file)
            .with_context(|| format!("failed to render {}", path.display()))?;
        if dry_run {
            println!("--- {}\n{rendered}", path.display());
        } else {
            fs::write(&path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("rewrote {}", path.display());
        }
    }
    Ok(())
}
