use std::fmt::{self, Write};

use ascii_table::AsciiTable;
use sema_diagnostics::diagnostic_report::Diagnostic;
use sema_type::{SemanticResult, TypeKind};
use serde_json::{json, Value};

use crate::completion::CompletionItem;
use crate::loose::LooseResolution;

/// Completion candidates as an ascii table, in the order they were reported.
pub fn completion_table(items: &[CompletionItem]) -> String {
  let mut table = AsciiTable::default();
  table.column(0).set_header("#");
  table.column(1).set_header("Kind");
  table.column(2).set_header("Label");
  table.column(3).set_header("Detail");

  let rows: Vec<Vec<String>> = items
    .iter()
    .enumerate()
    .map(|(i, item)| vec![i.to_string(), item.kind().to_string(), item.label(), item.detail()])
    .collect();

  table.format(rows)
}

fn kind_name(result: &SemanticResult) -> &'static str {
  match result {
    SemanticResult::Value(_) => "value",
    SemanticResult::Ambiguous(_) => "ambiguous",
    SemanticResult::Unknown => "unknown",
    SemanticResult::Type(t) => match &t.kind {
      TypeKind::Primitive(_) => "primitive",
      TypeKind::Null => "null",
      TypeKind::Pointer(_) => "pointer",
      TypeKind::Array { .. } => "array",
      TypeKind::AssocArray { .. } => "assoc_array",
      TypeKind::Delegate(_) => "delegate",
      TypeKind::Vector(_) => "vector",
      TypeKind::Tuple(_) => "tuple",
      TypeKind::UserDefined(_) => "user_defined",
      TypeKind::Alias(_) => "alias",
      TypeKind::Member(_) => "member",
      TypeKind::TemplateParameter(_) => "template_parameter",
      TypeKind::ArrayAccess(_) => "array_access",
      TypeKind::DelegateCall(_) => "delegate_call",
      TypeKind::Module(_) => "module",
      TypeKind::Package(_) => "package",
    },
  }
}

pub fn result_to_json(result: &SemanticResult) -> Value {
  match result {
    SemanticResult::Ambiguous(candidates) => json!({
      "kind": kind_name(result),
      "candidates": candidates.iter().map(result_to_json).collect::<Vec<Value>>(),
    }),
    SemanticResult::Value(value) => json!({
      "kind": kind_name(result),
      "value": value.value.to_string(),
      "type": value.ty.to_string(),
    }),
    SemanticResult::Unknown => json!({ "kind": kind_name(result) }),
    SemanticResult::Type(t) => {
      let mut object = json!({
        "kind": kind_name(result),
        "display": t.to_string(),
      });
      if let Some(definition) = t.definition() {
        object["definition"] = json!(definition.qualified_name());
      }
      if let Some(deduced) = t.deduced().filter(|d| !d.is_empty()) {
        let bindings: serde_json::Map<String, Value> = deduced
          .iter()
          .map(|(name, bound)| (name.to_string(), result_to_json(bound)))
          .collect();
        object["deduced"] = Value::Object(bindings);
      }
      if let Some(tag) = &t.tag {
        object["ufcs_argument"] = result_to_json(&tag.first_argument);
      }
      object
    },
  }
}

pub fn loose_to_json(resolution: &LooseResolution) -> Value {
  json!({
    "tier": resolution.tier.map(|tier| tier as u8),
    "result": result_to_json(&resolution.result),
  })
}

pub fn diagnostics_to_json(diagnostics: &[Diagnostic]) -> Value {
  serde_json::to_value(diagnostics).unwrap_or(Value::Null)
}

/// Indented tree of a result and its nested candidates.
pub fn dump_result(result: &SemanticResult) -> String {
  let mut output = String::new();
  // Writing into a String cannot fail.
  let _ = write_result(&mut output, result, 0);
  output
}

fn write_result(
  output: &mut String,
  result: &SemanticResult,
  indent: usize,
) -> fmt::Result {
  writeln!(output, "{:indent$}{}: {}", "", kind_name(result), result, indent = indent)?;
  if let SemanticResult::Ambiguous(candidates) = result {
    for candidate in candidates {
      write_result(output, candidate, indent + 2)?;
    }
  }
  Ok(())
}
