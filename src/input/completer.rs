use crate::core::commands::PluginRegistry;
use crate::core::config::AliasTable;
use crate::core::rank::RankLevel;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    NoMatch,
    /// Exactly one candidate; the verb becomes it plus a trailing space.
    Unique(String),
    /// Several candidates sharing a longer prefix than what was typed.
    Partial(String),
    /// Several candidates and nothing more to add.
    Ambiguous(Vec<String>),
}

/// Completes a verb against the plugins visible at `rank` and the aliases.
pub fn complete_verb(
    prefix: &str,
    registry: &PluginRegistry,
    aliases: &AliasTable,
    rank: RankLevel,
) -> Completion {
    let mut candidates: Vec<String> = registry
        .visible_to(rank)
        .iter()
        .map(|descriptor| descriptor.name.to_string())
        .chain(aliases.names().map(str::to_string))
        .filter(|name| starts_with_ignore_case(name, prefix))
        .collect();
    candidates.sort();
    candidates.dedup();

    match candidates.len() {
        0 => Completion::NoMatch,
        1 => Completion::Unique(format!("{} ", candidates[0])),
        _ => {
            let common = common_prefix(&candidates);
            if common.chars().count() > prefix.chars().count() {
                Completion::Partial(common)
            } else {
                Completion::Ambiguous(candidates)
            }
        }
    }
}

fn starts_with_ignore_case(name: &str, prefix: &str) -> bool {
    let mut chars = name.chars();
    prefix.chars().all(|p| {
        chars
            .next()
            .is_some_and(|c| c.eq_ignore_ascii_case(&p))
    })
}

/// Longest case-insensitive common prefix, spelled as in the first candidate.
fn common_prefix(candidates: &[String]) -> String {
    let Some((first, rest)) = candidates.split_first() else {
        return String::new();
    };
    let mut len = first.chars().count();
    for other in rest {
        len = first
            .chars()
            .zip(other.chars())
            .take(len)
            .take_while(|(a, b)| a.eq_ignore_ascii_case(b))
            .count();
    }
    first.chars().take(len).collect()
}
