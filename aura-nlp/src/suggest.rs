/// Example commands offered as completions.
pub const SUGGESTIONS: [&str; 8] = [
    "deploy organism MyOrganism.dna",
    "spawn quantum optimizer agent",
    "list all agents",
    "optimize circuit for low decoherence",
    "generate typescript component",
    "check system status",
    "commit mutation with message",
    "run quantum job on ibm_fez with 2048 shots",
];

/// Suggestions containing `partial`, case-insensitively. Blank input matches all.
pub fn suggest(partial: &str) -> Vec<&'static str> {
    let needle = partial.trim().to_lowercase();
    SUGGESTIONS
        .iter()
        .copied()
        .filter(|s| s.to_lowercase().contains(&needle))
        .collect()
}
