/// Shown in place of game data when the feed stays unreachable.
pub const FALLBACK_HEADLINE: &str =
    "We're currently unable to fetch game data. Here's some general NBA information:";

pub const FALLBACK_FACTS: [&str; 4] = [
    "The NBA was founded on June 6, 1946.",
    "There are 30 teams in the NBA, divided into two conferences.",
    "The NBA season typically runs from October to April, followed by playoffs.",
    "The Boston Celtics have won the most NBA championships (17).",
];

pub fn fallback_lines() -> impl Iterator<Item = String> {
    std::iter::once(FALLBACK_HEADLINE.to_string())
        .chain(FALLBACK_FACTS.iter().map(|f| format!("- {}", f)))
}
