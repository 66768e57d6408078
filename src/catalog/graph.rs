use std::collections::{BTreeMap, HashMap};

use super::FlagDefinition;
use crate::error::{FlagError, FlagResult};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Depth-first topological sort with a three-colour visited set.
///
/// Dependencies are emitted before their dependents. A back edge to a flag
/// that is still `InProgress` is a cycle; the returned path runs from that
/// flag around the cycle and back to it.
pub(super) fn topological_order(
    flags: &BTreeMap<String, FlagDefinition>,
) -> FlagResult<Vec<String>> {
    let mut marks: HashMap<&str, Mark> = flags
        .keys()
        .map(|k| (k.as_str(), Mark::Unvisited))
        .collect();
    let mut order = Vec::with_capacity(flags.len());
    let mut path = Vec::new();

    for key in flags.keys() {
        visit(key, flags, &mut marks, &mut path, &mut order)?;
    }

    Ok(order)
}

fn visit<'a>(
    key: &'a str,
    flags: &'a BTreeMap<String, FlagDefinition>,
    marks: &mut HashMap<&'a str, Mark>,
    path: &mut Vec<&'a str>,
    order: &mut Vec<String>,
) -> FlagResult<()> {
    match marks.get(key).copied().unwrap_or(Mark::Unvisited) {
        Mark::Done => return Ok(()),
        Mark::InProgress => {
            let start = path.iter().position(|k| *k == key).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].iter().map(|k| k.to_string()).collect();
            cycle.push(key.to_string());
            return Err(FlagError::CyclicDependency { cycle });
        }
        Mark::Unvisited => {}
    }

    marks.insert(key, Mark::InProgress);
    path.push(key);

    if let Some(flag) = flags.get(key) {
        for dependency in &flag.dependencies {
            visit(dependency, flags, marks, path, order)?;
        }
    }

    path.pop();
    marks.insert(key, Mark::Done);
    order.push(key.to_string());
    Ok(())
}
