use std::fmt;

use sema_ast::Span;

use super::diagnostic_report::{Diagnostic, Severity};

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticMessage {
  CtfeFailed {
    function: String,
    reason: String,
    span: Span,
  },
  AmbiguousResult {
    name: String,
    count: usize,
    span: Span,
  },
  DeductionFailed {
    template: String,
    parameter: String,
    span: Span,
  },
  AmbiguousSpecialization {
    template: String,
    candidates: Vec<Span>,
    span: Span,
  },
  UnresolvedIdentifier {
    name: String,
    span: Span,
  },
}

impl fmt::Display for DiagnosticMessage {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      DiagnosticMessage::CtfeFailed { function, reason, .. } => {
        write!(f, "Cannot evaluate '{}' at compile time: {}", function, reason)
      },
      DiagnosticMessage::AmbiguousResult { name, count, .. } => {
        write!(f, "'{}' is ambiguous, {} candidates match", name, count)
      },
      DiagnosticMessage::DeductionFailed { template, parameter, .. } => {
        write!(f, "Cannot deduce template parameter '{}' of '{}'", parameter, template)
      },
      DiagnosticMessage::AmbiguousSpecialization { template, .. } => {
        write!(f, "No specialization of '{}' is more specialized than the others", template)
      },
      DiagnosticMessage::UnresolvedIdentifier { name, .. } => write!(f, "Undefined identifier '{}'", name),
    }
  }
}

impl DiagnosticMessage {
  pub fn primary_span(&self) -> Span {
    match self {
      DiagnosticMessage::CtfeFailed { span, .. }
      | DiagnosticMessage::AmbiguousResult { span, .. }
      | DiagnosticMessage::DeductionFailed { span, .. }
      | DiagnosticMessage::AmbiguousSpecialization { span, .. }
      | DiagnosticMessage::UnresolvedIdentifier { span, .. } => *span,
    }
  }

  pub fn code(&self) -> String {
    match self {
      DiagnosticMessage::UnresolvedIdentifier { .. } => "R0001",
      DiagnosticMessage::AmbiguousResult { .. } => "R0002",
      DiagnosticMessage::DeductionFailed { .. } => "R0003",
      DiagnosticMessage::AmbiguousSpecialization { .. } => "R0004",
      DiagnosticMessage::CtfeFailed { .. } => "R0005",
    }
    .to_string()
  }

  fn level(&self) -> Severity {
    match self {
      DiagnosticMessage::CtfeFailed { .. } | DiagnosticMessage::AmbiguousResult { .. } => Severity::Warning,
      DiagnosticMessage::DeductionFailed { .. } => Severity::Info,
      _ => Severity::Error,
    }
  }

  fn secondary_labels(&self) -> Vec<(Span, String)> {
    match self {
      DiagnosticMessage::AmbiguousSpecialization { candidates, .. } => candidates
        .iter()
        .map(|span| (*span, "Candidate specialization".to_string()))
        .collect(),
      _ => vec![],
    }
  }

  fn notes(&self) -> Vec<String> {
    match self {
      DiagnosticMessage::CtfeFailed { .. } => {
        vec!["Only parameter binding, blocks and return statements are evaluated".to_string()]
      },
      _ => vec![],
    }
  }

  pub fn report(&self) -> Diagnostic {
    self.report_with_severity(self.level())
  }

  pub fn report_with_severity(
    &self,
    severity: Severity,
  ) -> Diagnostic {
    let mut diagnostic = Diagnostic::new(severity, self.to_string(), self.code(), self.primary_span());
    for (span, message) in self.secondary_labels() {
      diagnostic = diagnostic.with_label(span, message);
    }
    for note in self.notes() {
      diagnostic = diagnostic.with_note(note);
    }
    diagnostic
  }
}
