use bitflags::bitflags;

bitflags! {
    /// Storage classes and protection attributes attached to a declaration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DeclAttributes: u32 {
        const NONE       = 0;
        const PUBLIC     = 1 << 0;
        const PRIVATE    = 1 << 1;
        const PROTECTED  = 1 << 2;
        const PACKAGE    = 1 << 3;
        const STATIC     = 1 << 4;
        const CONST      = 1 << 5;
        const IMMUTABLE  = 1 << 6;
        const OVERRIDE   = 1 << 7;
        const ABSTRACT   = 1 << 8;
        const FINAL      = 1 << 9;
        const PROPERTY   = 1 << 10;
        const DEPRECATED = 1 << 11;
        const ENUM       = 1 << 12;
    }
}

bitflags! {
    /// Storage classes of a function or delegate parameter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ParamAttributes: u8 {
        const NONE  = 0;
        const REF   = 1 << 0;
        const OUT   = 1 << 1;
        const IN    = 1 << 2;
        const LAZY  = 1 << 3;
        const SCOPE = 1 << 4;
    }
}

impl DeclAttributes {
  /// Declarations without an explicit protection attribute are public.
  pub fn is_public(&self) -> bool {
    !self.intersects(DeclAttributes::PRIVATE | DeclAttributes::PROTECTED | DeclAttributes::PACKAGE)
  }

  /// `const`/`immutable`/`enum` storage makes a variable's initializer a compile-time constant.
  pub fn is_manifest_constant(&self) -> bool {
    self.intersects(DeclAttributes::CONST | DeclAttributes::IMMUTABLE | DeclAttributes::ENUM)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_protection_is_public() {
    assert!(DeclAttributes::NONE.is_public());
    assert!(DeclAttributes::STATIC.is_public());
    assert!(!(DeclAttributes::PRIVATE | DeclAttributes::STATIC).is_public());
  }

  #[test]
  fn test_manifest_constant() {
    assert!(DeclAttributes::IMMUTABLE.is_manifest_constant());
    assert!(!DeclAttributes::STATIC.is_manifest_constant());
  }
}
