//! Assembles the model-ready prompt for one turn: the tenant persona, an
//! optional knowledge block, and the trailing window of recent turns. Older
//! turns are dropped, not summarized — the personas here are short-lived
//! sales/support assistants, not long-running analysts.

use charla_core::turns::Turn;

/// Recent-turn window size used when a tenant does not configure one.
pub const DEFAULT_HISTORY_WINDOW: usize = 5;

pub fn assemble(persona: &str, knowledge: &str, turns: &[Turn], window: usize) -> Vec<Turn> {
    let mut prompt = Vec::with_capacity(window + 2);
    prompt.push(Turn::system(persona));

    if !knowledge.trim().is_empty() {
        prompt.push(Turn::system(format!("Contexto:\n{knowledge}")));
    }

    let start = turns.len().saturating_sub(window);
    prompt.extend_from_slice(&turns[start..]);
    prompt
}
