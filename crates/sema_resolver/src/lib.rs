//! Semantic resolution for a generic, statically typed language.
//!
//! Given a parsed symbol tree and a [`ResolutionContext`] positioned at a
//! scope, the resolver turns identifiers, type declarations and expressions
//! into [`SemanticResult`]s. It deduces template parameters, orders competing
//! specializations, rewrites `a.f(b)` into `f(a, b)` when `a` has no member
//! `f`, and folds constants through a small compile-time interpreter.
//!
//! Editors use [`loose::resolve_type_loosely`] to get a best-effort answer and
//! the [`completion`] consumers to list candidates.

pub mod completion;
pub mod context;
pub mod ctfe;
pub mod dump;
pub mod expressions;
pub mod loose;
pub mod properties;
pub mod resolver;
pub mod search;
pub mod templates;
pub mod ufcs;

pub use context::{CancellationToken, ContextFrame, FrameGuard, ResolutionContext, ResolutionOptions};
pub use expressions::{evaluate_callee, evaluate_type, evaluate_value, resolve_call};
pub use loose::{resolve_type_loosely, LooseResolution, LooseTier};
pub use resolver::{declaration_to_result, lookup_identifier, resolve_member, resolve_type};
pub use search::{search_nodes_by_name, SymbolMatch};
pub use sema_type::SemanticResult;
pub use templates::{deduce_template, most_specialized, resolve_template_instance};
pub use ufcs::resolve_ufcs;
