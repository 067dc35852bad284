use std::fmt;

use crate::kind::NodeKind;

/// One hop from a parent node into one of its slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    /// Kind of the parent node.
    pub kind: NodeKind,
    /// Slot index in the parent's schema, or `None` for an undeclared attribute.
    pub slot: Option<usize>,
    /// Attribute name.
    pub name: String,
    /// Position inside a list, or key inside a map.
    pub element: Option<Element>,
}

/// Element selector inside a list or map slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// List position.
    Index(usize),
    /// Map key.
    Key(String),
}

/// Chain of kind+slot steps from the document root, carried by every error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePath {
    steps: Vec<PathStep>,
}

impl NodePath {
    /// The empty path (the root itself).
    pub fn root() -> Self {
        Self::default()
    }

    /// Builds a path from steps ordered root first.
    pub fn from_steps(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }

    /// Extends the path by one step.
    pub fn push(&self, step: PathStep) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }

    /// Steps from the root.
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Number of steps.
    pub fn depth(&self) -> usize {
        self.steps.len()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return write!(f, "root");
        }
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}.{}", step.kind, step.name)?;
            match &step.element {
                Some(Element::Index(idx)) => write!(f, "[{idx}]")?,
                Some(Element::Key(key)) => write!(f, "[{key:?}]")?,
                None => {}
            }
        }
        Ok(())
    }
}
