use serde::{Deserialize, Serialize};

/// One vocabulary-encoded word of a sentence.
///
/// Encoding is done upstream; `char_ids` is empty when the model has no
/// character features.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "TokenRepr", into = "TokenRepr")]
pub struct Token {
    pub word_id: u32,
    pub char_ids: Vec<u32>,
}

/// A sentence is an ordered sequence of encoded tokens.
pub type Sentence = Vec<Token>;

/// Wire form: a bare word id, or a `[char_ids, word_id]` pair.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TokenRepr {
    Word(u32),
    WithChars(Vec<u32>, u32),
}

impl Token {
    /// A token without character ids.
    pub fn word(word_id: u32) -> Self {
        Self {
            word_id,
            char_ids: Vec::new(),
        }
    }

    pub fn with_chars(word_id: u32, char_ids: Vec<u32>) -> Self {
        Self { word_id, char_ids }
    }
}

impl From<TokenRepr> for Token {
    fn from(repr: TokenRepr) -> Self {
        match repr {
            TokenRepr::Word(word_id) => Token::word(word_id),
            TokenRepr::WithChars(char_ids, word_id) => Token::with_chars(word_id, char_ids),
        }
    }
}

impl From<Token> for TokenRepr {
    fn from(token: Token) -> Self {
        if token.char_ids.is_empty() {
            TokenRepr::Word(token.word_id)
        } else {
            TokenRepr::WithChars(token.char_ids, token.word_id)
        }
    }
}
