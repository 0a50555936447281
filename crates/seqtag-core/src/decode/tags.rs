//! # Tag Vocabulary
//!
//! Maps label ids returned by the decoder to tag names, extracts entity
//! chunks under the BIO (Begin-Inside-Outside) scheme and derives the
//! transition mask used for constrained decoding.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{NerError, Result};

/// Name of the tag for tokens outside any entity.
pub const OUTSIDE: &str = "O";

/// Ordered tag vocabulary; a tag's position is its label id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct TagSet {
    tags: Vec<String>,
}

/// Prefix of a tag name under the BIO scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagClass {
    Begin,
    Inside,
    Outside,
    /// Tags without a `B-`/`I-` prefix, e.g. `PER` or `E-PER`.
    Other,
}

/// A contiguous entity span, `end` exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chunk {
    pub entity_type: String,
    pub start: usize,
    pub end: usize,
}

impl TagSet {
    /// Build a tag set from names ordered by label id.
    ///
    /// # Errors
    ///
    /// Returns `NerError::InvalidConfig` for an empty list or duplicate names.
    pub fn new<S: Into<String>>(tags: impl IntoIterator<Item = S>) -> Result<Self> {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        if tags.is_empty() {
            return Err(NerError::InvalidConfig("tag set is empty".into()));
        }
        for (i, tag) in tags.iter().enumerate() {
            if tags[..i].contains(tag) {
                return Err(NerError::InvalidConfig(format!("duplicate tag {tag:?}")));
            }
        }
        Ok(Self { tags })
    }

    /// The CoNLL-2003 tag set.
    pub fn conll() -> Self {
        let tags = [
            "O", "B-PER", "I-PER", "B-LOC", "I-LOC", "B-ORG", "I-ORG", "B-MISC", "I-MISC",
        ];
        Self {
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Label id of a tag name.
    pub fn index(&self, name: &str) -> Option<usize> {
        self.tags.iter().position(|t| t == name)
    }

    /// Tag name of a label id.
    pub fn name(&self, idx: usize) -> Option<&str> {
        self.tags.get(idx).map(String::as_str)
    }

    /// Label id of the outside tag, if the vocabulary has one.
    pub fn outside(&self) -> Option<usize> {
        self.index(OUTSIDE)
    }

    /// Convert a decoded label sequence into tag names.
    pub fn names(&self, labels: &[usize]) -> Result<Vec<String>> {
        labels
            .iter()
            .map(|&idx| {
                self.name(idx)
                    .map(str::to_string)
                    .ok_or(NerError::UnknownTag(idx))
            })
            .collect()
    }

    /// Class and entity type of a label id.
    ///
    /// The class is the text before the first `-`, the type the text after
    /// the last one; tags without `-` are their own type.
    pub fn split(&self, idx: usize) -> Result<(TagClass, &str)> {
        let name = self.name(idx).ok_or(NerError::UnknownTag(idx))?;
        if name == OUTSIDE {
            return Ok((TagClass::Outside, name));
        }
        let entity_type = name.rsplit('-').next().unwrap_or(name);
        let class = match name.split('-').next() {
            Some(_) if !name.contains('-') => TagClass::Other,
            Some("B") => TagClass::Begin,
            Some("I") => TagClass::Inside,
            _ => TagClass::Other,
        };
        Ok((class, entity_type))
    }

    /// Extract entity chunks from a label sequence.
    ///
    /// A chunk opens on any non-outside tag when none is open and closes on
    /// the outside tag, on a change of entity type, or on a `B-` tag.
    pub fn chunks(&self, labels: &[usize]) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        let mut open: Option<(&str, usize)> = None;

        for (pos, &label) in labels.iter().enumerate() {
            let (class, entity_type) = self.split(label)?;

            if class == TagClass::Outside {
                if let Some((ty, start)) = open.take() {
                    chunks.push(Chunk::new(ty, start, pos));
                }
                continue;
            }

            match open {
                None => open = Some((entity_type, pos)),
                Some((ty, start)) if ty != entity_type || class == TagClass::Begin => {
                    chunks.push(Chunk::new(ty, start, pos));
                    open = Some((entity_type, pos));
                }
                Some(_) => {}
            }
        }

        if let Some((ty, start)) = open {
            chunks.push(Chunk::new(ty, start, labels.len()));
        }

        Ok(chunks)
    }

    /// Check if transitioning from label `from` to label `to` is valid.
    ///
    /// `I-X` may only follow `B-X` or `I-X`; every other transition is allowed.
    pub fn is_valid_transition(&self, from: usize, to: usize) -> bool {
        let (Ok((from_class, from_type)), Ok((to_class, to_type))) =
            (self.split(from), self.split(to))
        else {
            return false;
        };

        if to_class != TagClass::Inside {
            return true;
        }
        matches!(from_class, TagClass::Begin | TagClass::Inside) && from_type == to_type
    }

    /// Allowed-transition mask of shape `[ntags, ntags]`.
    pub fn transition_mask(&self) -> Vec<Vec<bool>> {
        (0..self.len())
            .map(|from| {
                (0..self.len())
                    .map(|to| self.is_valid_transition(from, to))
                    .collect()
            })
            .collect()
    }
}

impl Chunk {
    pub fn new(entity_type: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            entity_type: entity_type.into(),
            start,
            end,
        }
    }
}

impl TryFrom<Vec<String>> for TagSet {
    type Error = NerError;

    fn try_from(tags: Vec<String>) -> Result<Self> {
        Self::new(tags)
    }
}

impl From<TagSet> for Vec<String> {
    fn from(set: TagSet) -> Self {
        set.tags
    }
}

impl Default for TagSet {
    fn default() -> Self {
        Self::conll()
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.tags.join(", "))
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}..{})", self.entity_type, self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(set: &TagSet, names: &[&str]) -> Vec<usize> {
        names.iter().map(|n| set.index(n).unwrap()).collect()
    }

    #[test]
    fn test_index_name_lookup() {
        let set = TagSet::conll();
        for (idx, name) in set.iter().enumerate() {
            assert_eq!(set.index(name), Some(idx));
        }
        assert_eq!(set.outside(), Some(0));
        assert_eq!(set.name(99), None);
    }

    #[test]
    fn test_names_rejects_unknown_ids() {
        let set = TagSet::conll();
        assert_eq!(set.names(&[1, 0]).unwrap(), vec!["B-PER", "O"]);
        assert!(matches!(set.names(&[42]), Err(NerError::UnknownTag(42))));
    }

    #[test]
    fn test_new_rejects_empty_and_duplicates() {
        assert!(TagSet::new(Vec::<String>::new()).is_err());
        assert!(TagSet::new(["O", "B-PER", "O"]).is_err());
        assert!(TagSet::new(["O", "PER"]).is_ok());
    }

    #[test]
    fn test_split() {
        let set = TagSet::new(["O", "B-PER", "I-PER", "LOC", "E-ORG"]).unwrap();
        assert_eq!(set.split(0).unwrap(), (TagClass::Outside, "O"));
        assert_eq!(set.split(1).unwrap(), (TagClass::Begin, "PER"));
        assert_eq!(set.split(2).unwrap(), (TagClass::Inside, "PER"));
        assert_eq!(set.split(3).unwrap(), (TagClass::Other, "LOC"));
        assert_eq!(set.split(4).unwrap(), (TagClass::Other, "ORG"));
    }

    #[test]
    fn test_chunks_basic() {
        let set = TagSet::conll();
        let labels = ids(&set, &["B-PER", "I-PER", "O", "B-LOC"]);

        let chunks = set.chunks(&labels).unwrap();
        assert_eq!(
            chunks,
            vec![Chunk::new("PER", 0, 2), Chunk::new("LOC", 3, 4)]
        );
    }

    #[test]
    fn test_chunks_split_on_begin_and_type_change() {
        let set = TagSet::conll();
        let labels = ids(&set, &["B-PER", "B-PER", "I-LOC", "I-LOC", "O"]);

        let chunks = set.chunks(&labels).unwrap();
        assert_eq!(
            chunks,
            vec![
                Chunk::new("PER", 0, 1),
                Chunk::new("PER", 1, 2),
                Chunk::new("LOC", 2, 4),
            ]
        );
    }

    #[test]
    fn test_chunks_inside_without_begin_opens_chunk() {
        let set = TagSet::conll();
        let labels = ids(&set, &["O", "I-ORG", "I-ORG"]);
        assert_eq!(set.chunks(&labels).unwrap(), vec![Chunk::new("ORG", 1, 3)]);
    }

    #[test]
    fn test_chunks_empty() {
        let set = TagSet::conll();
        assert!(set.chunks(&[]).unwrap().is_empty());
        assert!(set.chunks(&[0, 0, 0]).unwrap().is_empty());
    }

    #[test]
    fn test_valid_transitions() {
        let set = TagSet::conll();
        let b_per = set.index("B-PER").unwrap();
        let i_per = set.index("I-PER").unwrap();
        let i_loc = set.index("I-LOC").unwrap();
        let o = set.outside().unwrap();

        assert!(set.is_valid_transition(b_per, i_per));
        assert!(set.is_valid_transition(i_per, i_per));
        assert!(set.is_valid_transition(o, b_per));
        assert!(set.is_valid_transition(i_per, o));
        assert!(!set.is_valid_transition(o, i_per));
        assert!(!set.is_valid_transition(b_per, i_loc));
        assert!(!set.is_valid_transition(i_per, i_loc));
    }

    #[test]
    fn test_transition_mask_shape() {
        let set = TagSet::conll();
        let mask = set.transition_mask();
        assert_eq!(mask.len(), set.len());
        assert!(mask.iter().all(|row| row.len() == set.len()));
        assert!(!mask[0][set.index("I-PER").unwrap()]);
    }

    #[test]
    fn test_serde_as_plain_list() {
        let set = TagSet::new(["O", "B-PER"]).unwrap();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["O","B-PER"]"#);

        let back: TagSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
