//! The per-entity inspection engine.
//!
//! [`Inspector::inspect_file`] runs one entity through the drift state
//! machine:
//!
//! 1. an entity locked with `value-requires-reviewing` is skipped without
//!    consulting any resolver;
//! 2. an entity with neither `value-deps` nor `value-ref` is of no interest;
//! 3. each dependency is inspected - by diffing pin against tip when the
//!    resolver is versioning-capable and the dependency is commit-pinned,
//!    by re-hashing content otherwise (SHAKE-128, 4 bytes). Pins advance to
//!    the tip commit; plain content gets its fingerprint recorded in
//!    `value-deps-hashes` (positionally, empty string for pinned entries);
//! 4. the value reference is inspected the same way, and the value behind
//!    it is re-extracted through the single capturing group of
//!    `value-regexp`, recording a drifted result in `value-new`;
//! 5. when anything semantically meaningful changed, the entity is locked
//!    for human review; when anything changed at all, the root's children
//!    are re-sorted and the file is rewritten in canonical form.
//!
//! The extraction pattern uses the `regex` crate dialect. A missing or
//! unusable pattern, an unparseable reference, or an unknown scheme is a
//! model error that aborts inspection of that entity; resolver-level
//! failures merely count as "no content this time".

use crate::core::InspectorError;
use crate::model::Entity;
use crate::reference::{strip_pin, Reference};
use crate::resolver::{Content, DiffOutcome, ResolverRegistry};
use crate::utils::{content_hash, redact_url, NONE_SENTINEL};
use anyhow::Result;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info};

/// Property key: `;`-separated dependency reference URLs.
pub const PROP_VALUE_DEPS: &str = "pwrt:inspector:value-deps";
/// Property key: positional content fingerprints for unpinned dependencies.
pub const PROP_VALUE_DEPS_HASHES: &str = "pwrt:inspector:value-deps-hashes";
/// Property key: the authoritative source of this entity's value.
pub const PROP_VALUE_REF: &str = "pwrt:inspector:value-ref";
/// Property key: extraction pattern applied to the value-ref content.
pub const PROP_VALUE_REGEXP: &str = "pwrt:inspector:value-regexp";
/// Property key: the last human-reviewed value.
pub const PROP_VALUE: &str = "pwrt:inspector:value";
/// Property key: newly observed value awaiting review.
pub const PROP_VALUE_NEW: &str = "pwrt:inspector:value-new";
/// Property key: review lock; while present the entity is not inspected.
pub const PROP_REQUIRES_REVIEWING: &str = "pwrt:inspector:value-requires-reviewing";

#[derive(Debug, Default)]
struct Flags {
    changed: bool,
    requires_reviewing: bool,
}

/// The inspection engine. Owns nothing but the resolver registry; entities
/// pass through one at a time.
pub struct Inspector {
    registry: ResolverRegistry,
}

impl Inspector {
    /// Creates an engine dispatching through `registry`.
    pub fn new(registry: ResolverRegistry) -> Self {
        Self { registry }
    }

    /// Inspects an entity file in place. Returns whether the file was
    /// rewritten.
    pub async fn inspect_file(&self, file: &Path) -> Result<bool> {
        self.inspect_file_to(file, file).await
    }

    /// Inspects an entity file, writing the annotated form to `out` when
    /// drift was detected. The input file is untouched unless it is also
    /// the output.
    pub async fn inspect_file_to(&self, file: &Path, out: &Path) -> Result<bool> {
        info!("Processing file: {}", file.display());
        let mut entity = Entity::parse_file(file)?;
        let origin = file.display().to_string();
        let changed = self.inspect_entity(&mut entity, &origin).await?;
        if changed {
            info!("  Changes detected. Writing {}", out.display());
            entity.write_file(out)?;
        } else {
            info!("  No changes detected");
        }
        Ok(changed)
    }

    /// Runs the state machine against an in-memory entity. On change the
    /// entity comes back review-flagged (when warranted) and canonically
    /// sorted, ready for the writer.
    pub async fn inspect_entity(&self, entity: &mut Entity, origin: &str) -> Result<bool> {
        if entity.has_property(PROP_REQUIRES_REVIEWING) {
            // Locked pending human review; not even resolvers are consulted.
            return Ok(false);
        }
        if entity.property(PROP_VALUE_DEPS).is_none() && entity.property(PROP_VALUE_REF).is_none()
        {
            debug!("  No inspector references. Skipping this file");
            return Ok(false);
        }

        let mut flags = Flags::default();
        self.process_deps(entity, &mut flags).await?;
        self.process_value_ref(entity, origin, &mut flags).await?;

        if flags.changed {
            if flags.requires_reviewing {
                debug!("  Setting {PROP_REQUIRES_REVIEWING}=true");
                entity.upsert_property(PROP_REQUIRES_REVIEWING, "true");
            }
            entity.sort_children();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn process_deps(&self, entity: &mut Entity, flags: &mut Flags) -> Result<()> {
        let Some(deps_value) = entity.property(PROP_VALUE_DEPS).map(ToString::to_string) else {
            return Ok(());
        };
        let hashes_value = entity
            .property(PROP_VALUE_DEPS_HASHES)
            .map(ToString::to_string);

        let deps: Vec<&str> = deps_value.split(';').collect();
        let known_hashes: Option<Vec<&str>> =
            hashes_value.as_deref().map(|h| h.split(';').collect());

        let mut new_deps: Vec<String> = Vec::with_capacity(deps.len());
        let mut new_hashes: Vec<String> = Vec::with_capacity(deps.len());
        let mut use_hashes = false;
        let mut mismatches: Vec<String> = Vec::new();

        for (i, dep_url) in deps.iter().enumerate() {
            debug!("  Processing value dependency: {}", redact_url(dep_url));
            let reference = Reference::parse(dep_url)?;
            let resolver = self.registry.get(reference.scheme(), dep_url)?;

            if resolver.supports_versioning() && reference.is_pinned() {
                new_hashes.push(String::new());
                let outcome = resolver.diff(dep_url).await?;
                debug!("    Diff: {outcome:?}");
                match outcome {
                    // Comparison failed upstream; keep the pin as-is this run.
                    None | Some(DiffOutcome::NoChange) => {
                        new_deps.push((*dep_url).to_string());
                    }
                    Some(DiffOutcome::LinesMoved { updated_url, .. }) => {
                        new_deps.push(updated_url);
                        mismatches.push((*dep_url).to_string());
                    }
                    Some(DiffOutcome::ContentChanged { updated_url, .. }) => {
                        new_deps.push(updated_url);
                        mismatches.push((*dep_url).to_string());
                        flags.requires_reviewing = true;
                    }
                }
            } else {
                let known = known_hashes
                    .as_ref()
                    .and_then(|h| h.get(i))
                    .copied()
                    .unwrap_or(NONE_SENTINEL);
                let content = resolver.resolve(dep_url).await?;
                let calculated = match content.as_ref().and_then(Content::content) {
                    Some(bytes) => content_hash(bytes),
                    None => NONE_SENTINEL.to_string(),
                };
                debug!(
                    "    Hash of resolved content: {calculated}. Known hash: {known}{}",
                    if calculated != known { ". Mismatch!" } else { "" }
                );
                if calculated != known {
                    mismatches.push((*dep_url).to_string());
                    flags.requires_reviewing = true;
                }
                match content.as_ref().and_then(Content::last_commit_id) {
                    Some(commit) => {
                        // First contact with a versioned source: pin it.
                        new_deps.push(reference.with_pin_appended(commit));
                        new_hashes.push(String::new());
                    }
                    None => {
                        new_deps.push((*dep_url).to_string());
                        use_hashes = true;
                        new_hashes.push(calculated);
                    }
                }
            }
        }

        if mismatches.is_empty() {
            debug!("  No dependency changes detected");
        } else {
            debug!(
                "  Changes detected in: {:?}",
                mismatches.iter().map(|u| redact_url(u)).collect::<Vec<_>>()
            );
            flags.changed = true;
            entity.upsert_property(PROP_VALUE_DEPS, &new_deps.join(";"));
            if use_hashes {
                entity.upsert_property(PROP_VALUE_DEPS_HASHES, &new_hashes.join(";"));
            }
        }
        Ok(())
    }

    async fn process_value_ref(
        &self,
        entity: &mut Entity,
        origin: &str,
        flags: &mut Flags,
    ) -> Result<()> {
        let Some(ref_url) = entity.property(PROP_VALUE_REF).map(ToString::to_string) else {
            return Ok(());
        };
        debug!("  Processing value ref: {}", redact_url(&ref_url));

        let reference = Reference::parse(&ref_url)?;
        let resolver = self.registry.get(reference.scheme(), &ref_url)?;

        let pattern_text = entity
            .property(PROP_VALUE_REGEXP)
            .ok_or_else(|| InspectorError::MissingValuePattern {
                file: origin.to_string(),
            })?
            .to_string();
        let pattern = compile_value_pattern(&pattern_text)?;
        debug!("    Ref regexp (in quotes \"): \"{pattern_text}\"");

        let known = entity.property(PROP_VALUE).map(ToString::to_string);
        let known_value = known.clone().unwrap_or_else(|| NONE_SENTINEL.to_string());

        if resolver.supports_versioning() && reference.is_pinned() {
            let mut new_value = NONE_SENTINEL.to_string();
            let outcome = resolver.diff(&ref_url).await?;
            debug!("    Diff: {outcome:?}");
            let Some(outcome) = outcome else {
                // Comparison failed upstream; leave the reference untouched
                // this run rather than reporting phantom drift.
                return Ok(());
            };
            match outcome {
                DiffOutcome::NoChange => {
                    if known.is_none() {
                        if let Some(content) = resolver.resolve(&ref_url).await? {
                            if let Some(bytes) =
                                content.content().filter(|bytes| !bytes.is_empty())
                            {
                                flags.changed = true;
                                let text = String::from_utf8_lossy(bytes);
                                debug!("    Ref resolved to content: {text}");
                                if let Some(value) = extract_value(&pattern, &text) {
                                    new_value = value;
                                }
                            }
                            if let Some(commit) = content.last_commit_id() {
                                entity.upsert_property(
                                    PROP_VALUE_REF,
                                    &reference.with_pin_replaced(commit),
                                );
                            }
                        }
                    } else {
                        new_value = known_value.clone();
                    }
                }
                DiffOutcome::LinesMoved {
                    updated_url,
                    current_lines_content,
                }
                | DiffOutcome::ContentChanged {
                    updated_url,
                    current_lines_content,
                    ..
                } => {
                    flags.changed = true;
                    entity.upsert_property(PROP_VALUE_REF, &updated_url);
                    let current = match current_lines_content {
                        Some(text) => Some(text),
                        None => {
                            // The range moved past every hunk, so the diff
                            // carried no content; re-fetch the tip with the
                            // pin stripped and the new locator kept.
                            let refetch = strip_pin(&updated_url);
                            resolver.resolve(&refetch).await?.and_then(|content| {
                                content
                                    .content()
                                    .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                            })
                        }
                    };
                    if let Some(text) = current {
                        if let Some(value) = extract_value(&pattern, &text) {
                            new_value = value;
                        }
                    }
                }
            }
            if known.is_none() || new_value != known_value {
                flags.changed = true;
                flags.requires_reviewing = true;
                entity.upsert_property(PROP_VALUE_NEW, &new_value);
            }
        } else {
            let mut new_value = NONE_SENTINEL.to_string();
            if let Some(content) = resolver.resolve(&ref_url).await? {
                if let Some(commit) = content.last_commit_id() {
                    // First contact with a versioned source: pin the ref.
                    flags.changed = true;
                    flags.requires_reviewing = true;
                    entity
                        .upsert_property(PROP_VALUE_REF, &reference.with_pin_appended(commit));
                }
                if let Some(bytes) = content.content().filter(|bytes| !bytes.is_empty()) {
                    let text = String::from_utf8_lossy(bytes);
                    debug!("    Ref resolved to content: {text}");
                    if let Some(value) = extract_value(&pattern, &text) {
                        new_value = value;
                    }
                }
            }
            if new_value != known_value {
                flags.changed = true;
                flags.requires_reviewing = true;
                entity.upsert_property(PROP_VALUE_NEW, &new_value);
            }
        }
        Ok(())
    }
}

/// Compiles a `value-regexp`, rejecting patterns without a capturing group
/// up front; extraction takes the first group, so a groupless pattern is a
/// model error whether or not it would match.
fn compile_value_pattern(pattern: &str) -> Result<Regex, InspectorError> {
    let compiled = Regex::new(pattern).map_err(|e| InspectorError::InvalidValuePattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;
    if compiled.captures_len() < 2 {
        return Err(InspectorError::InvalidValuePattern {
            pattern: pattern.to_string(),
            reason: "pattern has no capturing group".to_string(),
        });
    }
    Ok(compiled)
}

fn extract_value(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|group| group.as_str().to_string())
}
