use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

/// Rating handed out for any team missing from the table.
pub const DEFAULT_RATING: f64 = 1500.0;

/// Team strength table keyed by display name.
///
/// Lookups never fail: the upstream feed can introduce or rename franchises
/// mid-season, and those teams get [`DEFAULT_RATING`].
#[derive(Debug, Clone, Default)]
pub struct TeamRatings {
    ratings: HashMap<String, f64>,
}

impl TeamRatings {
    pub fn new(ratings: HashMap<String, f64>) -> Self {
        TeamRatings { ratings }
    }

    /// Load a `name,rating` table. A missing file yields an empty table.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(
                "No rating table at {}, every team rated {}",
                path.display(),
                DEFAULT_RATING
            );
            return Ok(TeamRatings::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read rating table {}", path.display()))?;
        let table = TeamRatings::parse(&raw)
            .with_context(|| format!("Invalid rating table {}", path.display()))?;
        info!("Loaded {} team ratings from {}", table.len(), path.display());
        Ok(table)
    }

    /// Parse a two-column table. Blank lines and `#` comments are skipped. The
    /// first line is a header only when its name column reads `team` or `name`.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut ratings = HashMap::new();
        let mut seen_row = false;

        for (idx, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (name, value) = line
                .rsplit_once(',')
                .with_context(|| format!("line {}: expected `team,rating`", idx + 1))?;
            let name = name.trim().trim_matches('"');
            let value = value.trim();

            match value.parse::<f64>() {
                Ok(rating) if rating.is_finite() => {
                    if name.is_empty() {
                        anyhow::bail!("line {}: empty team name", idx + 1);
                    }
                    ratings.insert(name.to_string(), rating);
                }
                _ if !seen_row && is_header(name) => {
                    debug!("Skipping rating table header: {}", line);
                }
                _ => anyhow::bail!("line {}: invalid rating '{}'", idx + 1, value),
            }
            seen_row = true;
        }

        Ok(TeamRatings { ratings })
    }

    pub fn rating_of(&self, team_name: &str) -> f64 {
        self.ratings
            .get(team_name)
            .copied()
            .unwrap_or(DEFAULT_RATING)
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }
}

fn is_header(name: &str) -> bool {
    ["team", "name", "team_name"]
        .iter()
        .any(|h| name.eq_ignore_ascii_case(h))
}
