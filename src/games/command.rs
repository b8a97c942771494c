//! Chat command grammar.
//!
//! The chat adapter hands over raw message text; this module decides which
//! command it is and extracts the faces of a reroll request.

use crate::games::types::DICE_COUNT;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bot commands, each invoked as `/name` or `/name@botname`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Start,
    Roll,
    Reroll,
    Pass,
    Finish,
    Help,
    Combination,
    Statistics,
}

impl Command {
    pub const ALL: [Command; 8] = [
        Command::Start,
        Command::Roll,
        Command::Reroll,
        Command::Pass,
        Command::Finish,
        Command::Help,
        Command::Combination,
        Command::Statistics,
    ];

    /// Keyword typed after the slash
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::Start => "poker",
            Command::Roll => "roll",
            Command::Reroll => "reroll",
            Command::Pass => "pass",
            Command::Finish => "finish",
            Command::Help => "help",
            Command::Combination => "combo",
            Command::Statistics => "stat",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Command> {
        Self::ALL.iter().copied().find(|c| c.keyword() == keyword)
    }

    /// Recognise the command at the start of a message.
    ///
    /// Arguments after the command word are ignored here; see
    /// [`parse_reroll_faces`] for the reroll arguments.
    pub fn parse(text: &str) -> Option<Command> {
        let word = text.split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let keyword = match name.split_once('@') {
            Some((keyword, bot)) if !bot.is_empty() => keyword,
            Some(_) => return None,
            None => name,
        };
        Self::from_keyword(keyword)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.keyword())
    }
}

/// Faces requested by a `/reroll` message.
///
/// Accepts exactly `/reroll` (or `/reroll@botname`, as [`Command::parse`]
/// does) followed by one to five whitespace-separated faces, each a single
/// digit from 1 to 6, with nothing after the last face. Any other shape
/// yields an empty list.
pub fn parse_reroll_faces(text: &str) -> Vec<u8> {
    let Some(mut rest) = text.strip_prefix("/reroll") else {
        return Vec::new();
    };
    if let Some(addressed) = rest.strip_prefix('@') {
        let bot_len = addressed.find(char::is_whitespace).unwrap_or(addressed.len());
        if bot_len == 0 {
            return Vec::new();
        }
        rest = &addressed[bot_len..];
    }
    if !rest.starts_with(char::is_whitespace) || rest.ends_with(char::is_whitespace) {
        return Vec::new();
    }

    let mut faces = Vec::with_capacity(DICE_COUNT);
    for token in rest.split_whitespace() {
        match token.as_bytes() {
            [digit @ b'1'..=b'6'] => faces.push(digit - b'0'),
            _ => return Vec::new(),
        }
        if faces.len() > DICE_COUNT {
            return Vec::new();
        }
    }
    faces
}
