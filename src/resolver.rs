//! Dependency ordering.
//!
//! Keys are placed depth-first, dependencies before dependents, in the order
//! the keys and their dependency lists are given. Dependencies outside the key
//! set are ignored. The traversal is iterative and keeps track of the keys
//! currently being visited, so a cycle is reported as
//! [`Error::DependencyCycle`] instead of recursing forever.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};

struct Frame<'a> {
    key: &'a str,
    next_dep: usize,
}

/// Order `keys` so every key comes after the keys it depends on.
///
/// `deps` maps a key to its declared dependencies; keys missing from `deps`
/// have none. Each key appears exactly once in the result.
///
/// # Errors
///
/// Returns [`Error::DependencyCycle`] with the offending path (first key
/// repeated at the end) if the dependency graph contains a cycle.
pub fn resolve(keys: &[String], deps: &HashMap<String, Vec<String>>) -> Result<Vec<String>> {
    let known: HashSet<&str> = keys.iter().map(String::as_str).collect();
    let mut placed: HashSet<&str> = HashSet::with_capacity(keys.len());
    let mut order: Vec<String> = Vec::with_capacity(keys.len());

    let mut visiting: HashSet<&str> = HashSet::new();
    let mut stack: Vec<Frame<'_>> = Vec::new();

    for root in keys {
        if placed.contains(root.as_str()) {
            continue;
        }
        visiting.insert(root.as_str());
        stack.push(Frame {
            key: root.as_str(),
            next_dep: 0,
        });

        while let Some(frame) = stack.last_mut() {
            let declared = deps.get(frame.key).map_or(&[][..], Vec::as_slice);

            let mut descend = None;
            while frame.next_dep < declared.len() {
                let dep = declared[frame.next_dep].as_str();
                frame.next_dep += 1;
                if !known.contains(dep) || placed.contains(dep) {
                    continue;
                }
                if visiting.contains(dep) {
                    return Err(cycle(&stack, dep));
                }
                descend = Some(dep);
                break;
            }

            if let Some(dep) = descend {
                visiting.insert(dep);
                stack.push(Frame {
                    key: dep,
                    next_dep: 0,
                });
            } else {
                let key = frame.key;
                stack.pop();
                visiting.remove(key);
                if placed.insert(key) {
                    order.push(key.to_string());
                }
            }
        }
    }

    Ok(order)
}

fn cycle(stack: &[Frame<'_>], dep: &str) -> Error {
    let start = stack.iter().position(|f| f.key == dep).unwrap_or(0);
    let mut path: Vec<String> = stack[start..].iter().map(|f| f.key.to_string()).collect();
    path.push(dep.to_string());
    Error::dependency_cycle(path)
}
