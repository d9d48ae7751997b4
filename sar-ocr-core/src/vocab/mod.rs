//! Character vocabulary and label encoding.
//!
//! The vocabulary is the 94 printable ASCII symbols (digits, lowercase,
//! uppercase, punctuation) followed by the three control tokens END, PAD and
//! UNK. Its order is part of the model contract: indices are baked into label
//! sequences and into the size of the classifier layer.
//!
//! [`LabelCodec`] turns label strings into fixed-length [`LabelSequence`]s
//! and [`Vocabulary::strip_trailing`] renders index sequences back to text.

mod codec;

pub use codec::{EndPlacement, LabelCodec, LabelSequence, UnknownPolicy};

use crate::core::constants::{END_TOKEN, PAD_TOKEN, UNK_TOKEN};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

/// Printable characters in vocabulary order: 10 digits, 26 lowercase,
/// 26 uppercase and 32 punctuation marks.
const PRINTABLE: &str = concat!(
    "0123456789",
    "abcdefghijklmnopqrstuvwxyz",
    "ABCDEFGHIJKLMNOPQRSTUVWXYZ",
    "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~",
);

static DEFAULT_VOCABULARY: Lazy<Vocabulary> = Lazy::new(build_vocabulary);

/// One entry of the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// A real character.
    Char(char),
    /// End of sequence.
    End,
    /// Padding after the end of a label.
    Pad,
    /// Placeholder for characters outside the vocabulary.
    Unk,
}

impl Symbol {
    /// Returns true for END, PAD and UNK.
    pub fn is_control(&self) -> bool {
        !matches!(self, Symbol::Char(_))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Char(c) => write!(f, "{}", c),
            Symbol::End => f.write_str(END_TOKEN),
            Symbol::Pad => f.write_str(PAD_TOKEN),
            Symbol::Unk => f.write_str(UNK_TOKEN),
        }
    }
}

/// Bidirectional symbol/index mapping.
///
/// Built once and never mutated; share it behind an `Arc` or use
/// [`Vocabulary::shared`].
#[derive(Debug, Clone)]
pub struct Vocabulary {
    symbols: Vec<Symbol>,
    symbol_to_index: HashMap<Symbol, u32>,
}

/// Builds the default vocabulary.
///
/// Always succeeds and always yields the same ordering.
pub fn build_vocabulary() -> Vocabulary {
    let mut symbols: Vec<Symbol> = PRINTABLE.chars().map(Symbol::Char).collect();
    symbols.extend([Symbol::End, Symbol::Pad, Symbol::Unk]);

    let symbol_to_index = symbols
        .iter()
        .enumerate()
        .map(|(i, s)| (*s, i as u32))
        .collect();

    Vocabulary {
        symbols,
        symbol_to_index,
    }
}

impl Vocabulary {
    /// Returns the process-wide default vocabulary.
    pub fn shared() -> &'static Vocabulary {
        &DEFAULT_VOCABULARY
    }

    /// Number of symbols, i.e. the model's `output_classes`.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns true if the vocabulary has no symbols.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// All symbols in index order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// The symbol to index map.
    pub fn symbol_to_index(&self) -> &HashMap<Symbol, u32> {
        &self.symbol_to_index
    }

    /// Looks up the symbol stored at `index`.
    pub fn index_to_symbol(&self, index: u32) -> Option<Symbol> {
        self.symbols.get(index as usize).copied()
    }

    /// Looks up the index of a symbol.
    pub fn index_of(&self, symbol: Symbol) -> Option<u32> {
        self.symbol_to_index.get(&symbol).copied()
    }

    /// Looks up the index of a real character.
    pub fn index_of_char(&self, c: char) -> Option<u32> {
        self.index_of(Symbol::Char(c))
    }

    /// Looks up an entry by its display name: `"END"`, `"PAD"`, `"UNK"` or a
    /// single character.
    pub fn index_of_token(&self, token: &str) -> Option<u32> {
        match token {
            END_TOKEN => Some(self.end_index()),
            PAD_TOKEN => Some(self.pad_index()),
            UNK_TOKEN => Some(self.unk_index()),
            _ => {
                let mut chars = token.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => self.index_of_char(c),
                    _ => None,
                }
            }
        }
    }

    /// Index of the END token.
    pub fn end_index(&self) -> u32 {
        self.control_index(Symbol::End)
    }

    /// Index of the PAD token.
    pub fn pad_index(&self) -> u32 {
        self.control_index(Symbol::Pad)
    }

    /// Index of the UNK token.
    pub fn unk_index(&self) -> u32 {
        self.control_index(Symbol::Unk)
    }

    fn control_index(&self, symbol: Symbol) -> u32 {
        // Control tokens are appended by `build_vocabulary` in a fixed order.
        let offset = match symbol {
            Symbol::End => 3,
            Symbol::Pad => 2,
            _ => 1,
        };
        (self.symbols.len() - offset) as u32
    }

    /// Renders an index sequence as text.
    ///
    /// Scans `indices` in order and stops at the first END (END itself is not
    /// emitted). UNK and PAD found before END are skipped without stopping
    /// the scan, as are indices outside the vocabulary. This is a lossy
    /// decode: it is not a strict inverse of [`LabelCodec::encode`].
    pub fn strip_trailing(&self, indices: &[u32]) -> String {
        let end = self.end_index();
        indices
            .iter()
            .take_while(|&&id| id != end)
            .filter_map(|&id| match self.index_to_symbol(id) {
                Some(Symbol::Char(c)) => Some(c),
                _ => None,
            })
            .collect()
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        build_vocabulary()
    }
}

/// Free-function form of [`Vocabulary::strip_trailing`].
pub fn strip_trailing(indices: &[u32], vocabulary: &Vocabulary) -> String {
    vocabulary.strip_trailing(indices)
}
