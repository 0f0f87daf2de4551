use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Precomputed hash of an identifier, the key of every scope index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NameHash(pub u64);

impl NameHash {
  pub fn of(text: &str) -> Self {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    NameHash(hasher.finish())
  }
}

#[derive(Clone)]
pub struct Name {
  text: Arc<str>,
  hash: NameHash,
}

impl Name {
  pub fn new(text: &str) -> Self {
    Self {
      text: Arc::from(text),
      hash: NameHash::of(text),
    }
  }

  pub fn as_str(&self) -> &str {
    &self.text
  }

  pub fn hash_value(&self) -> NameHash {
    self.hash
  }

  pub fn is_empty(&self) -> bool {
    self.text.is_empty()
  }
}

impl From<&str> for Name {
  fn from(text: &str) -> Self {
    Name::new(text)
  }
}

impl PartialEq for Name {
  fn eq(
    &self,
    other: &Self,
  ) -> bool {
    self.hash == other.hash && self.text == other.text
  }
}

impl Eq for Name {}

impl Hash for Name {
  fn hash<H: Hasher>(
    &self,
    state: &mut H,
  ) {
    self.hash.hash(state);
  }
}

impl PartialOrd for Name {
  fn partial_cmp(
    &self,
    other: &Self,
  ) -> Option<std::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Name {
  fn cmp(
    &self,
    other: &Self,
  ) -> std::cmp::Ordering {
    self.text.cmp(&other.text)
  }
}

impl fmt::Debug for Name {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "{:?}", &*self.text)
  }
}

impl fmt::Display for Name {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.write_str(&self.text)
  }
}
