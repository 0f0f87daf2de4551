//! Per-request resolution state.
//!
//! A `ResolutionContext` carries a stack of frames (scope, location,
//! template substitutions, option flags). Frames are pushed through
//! [`ResolutionContext::push`], which hands back a [`FrameGuard`]; dropping the
//! guard pops the frame, so the stack stays balanced on every exit path.

use std::collections::{HashMap, HashSet};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bitflags::bitflags;
use sema_ast::{BytePosition, DeclRef, Name, NodeId, ParseCacheView};
use sema_config::{DebugTrace, SemaConfig};
use sema_diagnostics::diagnostic_report::Diagnostic;
use sema_diagnostics::message::DiagnosticMessage;
use sema_log::{log_trc, trace_dbg};
use sema_type::{SemanticResult, TemplateBindings};

bitflags! {
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
  pub struct ResolutionOptions: u32 {
    const DONT_RESOLVE_ALIASES = 1 << 0;
    /// Only function declarations survive identifier lookup.
    const RETURN_METHOD_REFERENCES_ONLY = 1 << 1;
    const NO_TEMPLATE_PARAMETER_DEDUCTION = 1 << 2;
    const IGNORE_ALL_PROTECTION_ATTRIBUTES = 1 << 3;
    /// Block locals are visible regardless of where they are declared.
    const IGNORE_DECLARATION_CONDITIONS = 1 << 4;
    /// Variables resolve without their declared type.
    const DONT_RESOLVE_BASE_TYPES = 1 << 5;
    const DONT_RESOLVE_BASE_CLASSES = 1 << 6;
  }
}

/// Shared flag a caller flips to abort a running request.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }
}

#[derive(Debug, Clone)]
pub struct ContextFrame {
  /// Module, aggregate or function the lookup starts from.
  pub scope: DeclRef,
  /// Caret or statement position inside `scope`.
  pub location: Option<BytePosition>,
  pub substitutions: TemplateBindings,
  pub options: ResolutionOptions,
}

impl ContextFrame {
  pub fn new(
    scope: DeclRef,
    location: Option<BytePosition>,
  ) -> Self {
    Self {
      scope,
      location,
      substitutions: TemplateBindings::new(),
      options: ResolutionOptions::empty(),
    }
  }
}

pub struct ResolutionContext {
  config: Arc<SemaConfig>,
  cache: ParseCacheView,
  current: ContextFrame,
  stack: Vec<ContextFrame>,
  /// Flags that apply to every frame, on top of the frame's own.
  independent_options: ResolutionOptions,
  memo: HashMap<(NodeId, u32), SemanticResult>,
  in_progress: HashSet<NodeId>,
  cancellation: CancellationToken,
  diagnostics: Vec<Diagnostic>,
  ctfe_depth: u32,
}

impl ResolutionContext {
  pub fn new(
    scope: DeclRef,
    cache: ParseCacheView,
    config: Arc<SemaConfig>,
  ) -> Self {
    Self {
      config,
      cache,
      current: ContextFrame::new(scope, None),
      stack: Vec::new(),
      independent_options: ResolutionOptions::empty(),
      memo: HashMap::new(),
      in_progress: HashSet::new(),
      cancellation: CancellationToken::new(),
      diagnostics: Vec::new(),
      ctfe_depth: 0,
    }
  }

  pub fn at(
    mut self,
    location: BytePosition,
  ) -> Self {
    self.current.location = Some(location);
    self
  }

  pub fn with_cancellation(
    mut self,
    token: CancellationToken,
  ) -> Self {
    self.cancellation = token;
    self
  }

  pub fn config(&self) -> &SemaConfig {
    &self.config
  }

  pub fn cache(&self) -> &ParseCacheView {
    &self.cache
  }

  pub fn frame(&self) -> &ContextFrame {
    &self.current
  }

  pub fn scope(&self) -> &DeclRef {
    &self.current.scope
  }

  pub fn location(&self) -> Option<BytePosition> {
    self.current.location
  }

  pub fn options(&self) -> ResolutionOptions {
    self.independent_options | self.current.options
  }

  pub fn has_option(
    &self,
    option: ResolutionOptions,
  ) -> bool {
    self.options().contains(option)
  }

  pub fn independent_options(&self) -> ResolutionOptions {
    self.independent_options
  }

  pub fn set_independent_options(
    &mut self,
    options: ResolutionOptions,
  ) {
    self.independent_options = options;
  }

  /// Adds `options` to the independent flags until the guard is dropped.
  pub fn push_options(
    &mut self,
    options: ResolutionOptions,
  ) -> OptionsGuard<'_> {
    let saved = self.independent_options;
    self.independent_options |= options;
    OptionsGuard { ctx: self, saved }
  }

  /// Runs `f` with `options` added to the independent flags, then restores them.
  pub fn with_options<R>(
    &mut self,
    options: ResolutionOptions,
    f: impl FnOnce(&mut Self) -> R,
  ) -> R {
    let mut guard = self.push_options(options);
    f(&mut guard)
  }

  /// Adds flags to the current frame only.
  pub fn add_frame_options(
    &mut self,
    options: ResolutionOptions,
  ) {
    self.current.options |= options;
  }

  pub fn substitution(
    &self,
    name: &Name,
  ) -> Option<&SemanticResult> {
    self.current.substitutions.get(name)
  }

  pub fn substitutions(&self) -> &TemplateBindings {
    &self.current.substitutions
  }

  /// Number of frames saved below the current one.
  pub fn depth(&self) -> usize {
    self.stack.len()
  }

  pub fn push(
    &mut self,
    scope: DeclRef,
    location: Option<BytePosition>,
  ) -> FrameGuard<'_> {
    self.push_frame(ContextFrame::new(scope, location))
  }

  pub fn push_with_substitutions(
    &mut self,
    scope: DeclRef,
    location: Option<BytePosition>,
    substitutions: TemplateBindings,
  ) -> FrameGuard<'_> {
    let mut frame = ContextFrame::new(scope, location);
    frame.substitutions = substitutions;
    self.push_frame(frame)
  }

  pub fn push_frame(
    &mut self,
    frame: ContextFrame,
  ) -> FrameGuard<'_> {
    let previous = std::mem::replace(&mut self.current, frame);
    self.stack.push(previous);
    FrameGuard { ctx: self }
  }

  fn pop_frame(&mut self) {
    if let Some(previous) = self.stack.pop() {
      self.current = previous;
    }
  }

  fn memo_key(
    &self,
    id: NodeId,
  ) -> Option<(NodeId, u32)> {
    if !self.config.resolution.enable_cache || !self.current.substitutions.is_empty() {
      return None;
    }
    Some((id, self.options().bits()))
  }

  pub fn cached(
    &self,
    id: NodeId,
  ) -> Option<SemanticResult> {
    let hit = self.memo_key(id).and_then(|key| self.memo.get(&key).cloned());
    if hit.is_some() {
      log_trc!(&self.config, "memo hit for node {:?} at depth {}", id, self.depth());
    }
    hit
  }

  pub fn memoize(
    &mut self,
    id: NodeId,
    result: &SemanticResult,
  ) {
    if let Some(key) = self.memo_key(id) {
      self.memo.insert(key, result.clone());
    }
  }

  pub fn clear_caches(&mut self) {
    self.memo.clear();
  }

  pub fn cancellation(&self) -> &CancellationToken {
    &self.cancellation
  }

  pub fn is_cancelled(&self) -> bool {
    let cancelled = self.cancellation.is_cancelled();
    if cancelled {
      trace_dbg!(&self.config, DebugTrace::Resolver, "request cancelled at depth {}", self.depth());
    }
    cancelled
  }

  /// Marks `id` as being resolved; false if it already is, which means a cycle.
  pub fn begin_resolving(
    &mut self,
    id: NodeId,
  ) -> bool {
    self.in_progress.insert(id)
  }

  pub fn end_resolving(
    &mut self,
    id: NodeId,
  ) {
    self.in_progress.remove(&id);
  }

  pub(crate) fn enter_ctfe(&mut self) -> bool {
    if self.ctfe_depth >= self.config.resolution.ctfe_max_depth {
      return false;
    }
    self.ctfe_depth += 1;
    true
  }

  pub(crate) fn leave_ctfe(&mut self) {
    self.ctfe_depth = self.ctfe_depth.saturating_sub(1);
  }

  pub fn report(
    &mut self,
    message: DiagnosticMessage,
  ) {
    self.diagnostics.push(message.report());
  }

  pub fn diagnostics(&self) -> &[Diagnostic] {
    &self.diagnostics
  }

  pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
    std::mem::take(&mut self.diagnostics)
  }
}

/// Restores the previous frame when dropped.
pub struct FrameGuard<'a> {
  ctx: &'a mut ResolutionContext,
}

impl Deref for FrameGuard<'_> {
  type Target = ResolutionContext;

  fn deref(&self) -> &Self::Target {
    self.ctx
  }
}

impl DerefMut for FrameGuard<'_> {
  fn deref_mut(&mut self) -> &mut Self::Target {
    self.ctx
  }
}

impl Drop for FrameGuard<'_> {
  fn drop(&mut self) {
    self.ctx.pop_frame();
  }
}

/// Restores the independent flags when dropped.
pub struct OptionsGuard<'a> {
  ctx: &'a mut ResolutionContext,
  saved: ResolutionOptions,
}

impl Deref for OptionsGuard<'_> {
  type Target = ResolutionContext;

  fn deref(&self) -> &Self::Target {
    self.ctx
  }
}

impl DerefMut for OptionsGuard<'_> {
  fn deref_mut(&mut self) -> &mut Self::Target {
    self.ctx
  }
}

impl Drop for OptionsGuard<'_> {
  fn drop(&mut self) {
    self.ctx.independent_options = self.saved;
  }
}
