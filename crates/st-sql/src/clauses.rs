//! WHERE/HAVING predicates, GROUP BY expressions and semantic outputs

use crate::ast::{AstNode, NodeData, NodeKind};
use serde::{Deserialize, Serialize};

/// Output slots understood by dashboards: `x`, `y`, `label`, `value`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Outputs {
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.label.is_none() && self.value.is_none()
    }

    /// Expression behind the measure slot, `value` before `y`
    pub fn measure(&self) -> Option<&str> {
        self.value.as_deref().or(self.y.as_deref())
    }

    fn slot_mut(&mut self, alias: &str) -> Option<&mut Option<String>> {
        match alias.to_lowercase().as_str() {
            "x" => Some(&mut self.x),
            "y" => Some(&mut self.y),
            "label" => Some(&mut self.label),
            "value" => Some(&mut self.value),
            _ => None,
        }
    }
}

/// WHERE predicates followed by HAVING predicates, as written
pub fn collect_filters(root: &AstNode) -> Vec<String> {
    root.find_all(NodeKind::Where)
        .into_iter()
        .chain(root.find_all(NodeKind::Having))
        .map(|n| n.sql().to_string())
        .collect()
}

/// Every GROUP BY expression, one entry per expression
pub fn collect_group_by(root: &AstNode) -> Vec<String> {
    root.find_all(NodeKind::Group)
        .into_iter()
        .flat_map(|g| g.children.iter().map(|e| e.sql().to_string()))
        .collect()
}

/// Projections of the outermost SELECT aliased to an output slot.
///
/// The first projection claiming a slot wins.
pub fn collect_outputs(root: &AstNode) -> Outputs {
    let mut outputs = Outputs::default();
    let Some(select) = root.main_select() else {
        return outputs;
    };
    for projection in select.children.iter().filter(|c| c.kind() == NodeKind::Projection) {
        let NodeData::Projection {
            alias: Some(alias), ..
        } = &projection.data
        else {
            continue;
        };
        let Some(expr) = projection.children.first() else {
            continue;
        };
        if let Some(slot) = outputs.slot_mut(alias) {
            if slot.is_none() {
                *slot = Some(expr.sql().to_string());
            }
        }
    }
    outputs
}
