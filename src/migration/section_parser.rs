use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Matches a trimmed tag line: `-- { <section>: <label> }`
static TAG_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^--\s*\{\s*([A-Za-z0-9_]+):\s*([A-Za-z0-9_\s]*)\}$").expect("valid tag pattern")
});

/// Which half of a stage a script belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            _ => Err(anyhow::anyhow!("Unknown section direction: {}", s)),
        }
    }
}

/// Scripts found in one migration file, keyed by stage label
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageScripts {
    pub up: HashMap<String, String>,
    pub down: HashMap<String, String>,
}

impl StageScripts {
    fn commit(&mut self, direction: Direction, stage: String, body: &str) {
        let body = body.trim_end_matches('\n').to_string();
        match direction {
            Direction::Up => self.up.insert(stage, body),
            Direction::Down => self.down.insert(stage, body),
        };
    }
}

/// A recognised tag line. `direction` is `None` for sections other than
/// up/down, `stage` is `None` when the label is blank.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Tag {
    direction: Option<Direction>,
    stage: Option<String>,
}

fn parse_tag(line: &str) -> Option<Tag> {
    let captures = TAG_LINE.captures(line)?;
    let label = captures[2].trim();

    Some(Tag {
        direction: captures[1].parse().ok(),
        stage: (!label.is_empty()).then(|| label.to_string()),
    })
}

/// Split migration content into per-stage up and down scripts.
///
/// Every tag line closes the section before it. Only `up`/`down` tags with a
/// non-blank label open a new one; lines outside an open section are dropped,
/// as are blank lines. A later section with the same stage replaces an earlier one.
pub fn parse_stage_scripts(content: &str) -> StageScripts {
    let mut scripts = StageScripts::default();
    let mut current: Option<(Direction, String)> = None;
    let mut body = String::new();

    for line in content.lines() {
        if let Some(tag) = parse_tag(line.trim()) {
            if let Some((direction, stage)) = current.take() {
                scripts.commit(direction, stage, &body);
            }
            body.clear();

            current = match tag {
                Tag {
                    direction: Some(direction),
                    stage: Some(stage),
                } => Some((direction, stage)),
                _ => None,
            };
        } else if current.is_some() && !line.trim().is_empty() {
            body.push_str(line);
            body.push('\n');
        }
    }

    if let Some((direction, stage)) = current {
        scripts.commit(direction, stage, &body);
    }

    scripts
}
