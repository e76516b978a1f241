// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural search over the accessibility forest.

use crate::dump::dump_accessible;
use crate::providers::{Candidate, Children, ChildrenBackwards, Descendants};
use regex::Regex;
use tracing::{error, info};
use uiprobe_backend::{BackendRegistry, BackendResult, ObjectId};
use uiprobe_core::{Accessible, Fields, ObjectPath, SearchMethod, SearchPredicates};

/// The resolution of a successful search, fed back into the per-connection
/// cache so a follow-up mutation can skip re-walking the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Index of the owning back-end.
    pub backend: usize,
    /// The matched object, absent for a back-end virtual root.
    pub object: Option<ObjectId>,
    /// Address of the match.
    pub path: ObjectPath,
}

/// Search result: the response extras plus the cacheable resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Whether a match was found.
    pub status: bool,
    /// The fully serialised match, or a bare placeholder.
    pub accessible: Accessible,
    /// The match resolution, present iff `status` is true.
    pub hit: Option<SearchHit>,
}

impl SearchOutcome {
    fn miss(path: ObjectPath) -> Self {
        Self {
            status: false,
            accessible: Accessible::bare(path),
            hit: None,
        }
    }
}

/// A compiled string predicate.
///
/// A leading `&` selects regex matching: the pattern is compiled dot-all
/// and must cover the entire property value.  Everything else compares
/// literally.
enum TextMatcher {
    Literal(String),
    Pattern(Regex),
}

impl TextMatcher {
    fn compile(predicate: &str) -> Option<Self> {
        match predicate.strip_prefix('&') {
            Some(pattern) => Regex::new(&format!(r"\A(?s:{pattern})\z"))
                .ok()
                .map(Self::Pattern),
            None => Some(Self::Literal(predicate.to_owned())),
        }
    }

    fn matches(&self, value: Option<&str>) -> bool {
        match (self, value) {
            (_, None) => false,
            (Self::Literal(expected), Some(value)) => expected == value,
            (Self::Pattern(pattern), Some(value)) => pattern.is_match(value),
        }
    }
}

struct CompiledPredicates<'p> {
    name: Option<TextMatcher>,
    description: Option<TextMatcher>,
    text: Option<TextMatcher>,
    raw: &'p SearchPredicates,
}

impl<'p> CompiledPredicates<'p> {
    fn compile(predicates: &'p SearchPredicates) -> Option<Self> {
        let compile_opt = |value: &Option<String>| -> Option<Option<TextMatcher>> {
            match value {
                None => Some(None),
                Some(predicate) => TextMatcher::compile(predicate).map(Some),
            }
        };
        Some(Self {
            name: compile_opt(&predicates.name)?,
            description: compile_opt(&predicates.description)?,
            text: compile_opt(&predicates.text)?,
            raw: predicates,
        })
    }

    /// Whether any predicate beyond `name`/`count`/`index` is specified.
    /// Such predicates disqualify back-end virtual roots outright.
    fn beyond_root_scope(&self) -> bool {
        self.description.is_some()
            || self.text.is_some()
            || self.raw.role.is_some()
            || self.raw.action.is_some()
            || self.raw.relation.is_some()
            || self.raw.state.is_some()
    }
}

/// Search below `(backend, object)` at `path` with the given method.
///
/// Emits the `(nth+1)`-th passing candidate, serialised with every field at
/// depth zero.  An unknown method, an invalid regex, or a back-end failure
/// mid-iteration all end the search with `status=false`.
pub fn search_accessible(
    registry: &BackendRegistry,
    backend: Option<usize>,
    object: Option<ObjectId>,
    path: &ObjectPath,
    method: &str,
    predicates: &SearchPredicates,
) -> SearchOutcome {
    let Some(method) = SearchMethod::parse(method) else {
        error!(method, "unknown search method");
        return SearchOutcome::miss(ObjectPath::root());
    };
    let Some(compiled) = CompiledPredicates::compile(predicates) else {
        error!(path = %path, "invalid regular expression in search predicates");
        return SearchOutcome::miss(path.clone());
    };

    type Provider<'r> = Box<dyn Iterator<Item = BackendResult<Candidate>> + 'r>;
    let provider: BackendResult<Provider<'_>> = match method {
        SearchMethod::Simple => Children::new(registry, backend, object, path)
            .map(|iter| Box::new(iter) as Provider<'_>),
        SearchMethod::Backwards => ChildrenBackwards::new(registry, backend, object, path)
            .map(|iter| Box::new(iter) as Provider<'_>),
        SearchMethod::Deep => Descendants::new(registry, backend, object, path)
            .map(|iter| Box::new(iter) as Provider<'_>),
    };
    let provider = match provider {
        Ok(provider) => provider,
        Err(err) => {
            error!(path = %path, error = %err, "search traversal failed to start");
            return SearchOutcome::miss(path.clone());
        }
    };

    let mut matched = 0i64;
    for candidate in provider {
        let candidate = match candidate {
            Ok(candidate) => candidate,
            Err(err) => {
                error!(path = %path, error = %err, "search traversal failed");
                return SearchOutcome::miss(path.clone());
            }
        };
        let passes = match candidate_matches(registry, &candidate, &compiled) {
            Ok(passes) => passes,
            Err(err) => {
                error!(path = %candidate.path, error = %err, "search candidate check failed");
                return SearchOutcome::miss(path.clone());
            }
        };
        if !passes {
            continue;
        }
        matched += 1;
        if predicates.nth < matched {
            let accessible = dump_accessible(
                registry,
                Some(candidate.backend),
                candidate.object,
                &candidate.path,
                0,
                &Fields::all(),
            );
            return SearchOutcome {
                status: true,
                accessible,
                hit: Some(SearchHit {
                    backend: candidate.backend,
                    object: candidate.object,
                    path: candidate.path,
                }),
            };
        }
    }
    info!(path = %path, "search found no matching accessible");
    SearchOutcome::miss(path.clone())
}

fn candidate_matches(
    registry: &BackendRegistry,
    candidate: &Candidate,
    predicates: &CompiledPredicates<'_>,
) -> BackendResult<bool> {
    if let Some(index) = predicates.raw.index
        && candidate.path.index() != Some(index)
    {
        return Ok(false);
    }

    let Some(object) = candidate.object else {
        // Back-end virtual root: only name and count apply, anything else
        // disqualifies the candidate.
        if predicates.beyond_root_scope() {
            return Ok(false);
        }
        if let Some(ref name) = predicates.name
            && !name.matches(registry.name(candidate.backend))
        {
            return Ok(false);
        }
        if let Some(count) = predicates.raw.count {
            let actual = crate::providers::with_backend(registry, candidate.backend, |a11y| {
                a11y.count_children(None)
            })?;
            if actual as u32 != count {
                return Ok(false);
            }
        }
        return Ok(true);
    };

    let mut guard = match registry.lock(candidate.backend) {
        Some(guard) => guard,
        None => return Ok(false),
    };
    let a11y = &mut *guard;

    if let Some(ref name) = predicates.name
        && !name.matches(Some(&a11y.object_name(object)?))
    {
        return Ok(false);
    }
    if let Some(ref description) = predicates.description
        && !description.matches(Some(&a11y.description(object)?))
    {
        return Ok(false);
    }
    if let Some(ref role) = predicates.raw.role
        && a11y.role_name(object)? != *role
    {
        return Ok(false);
    }
    if let Some(count) = predicates.raw.count
        && a11y.count_children(Some(object))? as u32 != count
    {
        return Ok(false);
    }
    if let Some(ref action) = predicates.raw.action
        && !a11y.action_names(object)?.iter().any(|a| a == action)
    {
        return Ok(false);
    }
    if let Some(ref relation) = predicates.raw.relation
        && !a11y.relation_names(object)?.iter().any(|r| r == relation)
    {
        return Ok(false);
    }
    if let Some(ref state) = predicates.raw.state {
        let value = a11y.constants().states.lookup(state);
        match value {
            Some(value) if a11y.in_state(object, value)? => {}
            _ => return Ok(false),
        }
    }
    if let Some(ref text) = predicates.text
        && !text.matches(a11y.text(object)?.as_deref())
    {
        return Ok(false);
    }
    Ok(true)
}
