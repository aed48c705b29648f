//! CLI enum types for preview options.

use clap::ValueEnum;

use crate::preview;

/// ASCII character set for preview rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CharacterSet {
    #[default]
    Standard,
    Blocks,
    Minimal,
}

impl From<CharacterSet> for preview::CharSet {
    fn from(c: CharacterSet) -> Self {
        match c {
            CharacterSet::Standard => preview::CharSet::Standard,
            CharacterSet::Blocks => preview::CharSet::Blocks,
            CharacterSet::Minimal => preview::CharSet::Minimal,
        }
    }
}
