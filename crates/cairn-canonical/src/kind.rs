use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::canonicalizer::CanonicalizationError;

/// Namespace prefix mixed into every fully-qualified kind name.
pub const KIND_NAMESPACE: &str = "cairn.node.v1";

macro_rules! node_kinds {
    ($($variant:ident => $doc:expr),+ $(,)?) => {
        /// The closed set of node kinds. Adding a kind is a breaking protocol change.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum NodeKind {
            $(
                #[doc = $doc]
                $variant,
            )+
        }

        impl NodeKind {
            /// Every kind, in wire-contract order.
            pub const ALL: &'static [NodeKind] = &[$(NodeKind::$variant),+];

            /// Short kind name (`"BinOp"`).
            pub fn short_name(self) -> &'static str {
                match self {
                    $(NodeKind::$variant => stringify!($variant),)+
                }
            }

            /// Fully-qualified kind name (`"cairn.node.v1.BinOp"`).
            pub fn qualified_name(self) -> &'static str {
                match self {
                    $(NodeKind::$variant => concat!("cairn.node.v1.", stringify!($variant)),)+
                }
            }
        }
    };
}

node_kinds! {
    Unit => "Top-level artifact: a named, parameterised body.",
    Block => "Sequence of statements with an optional result expression.",
    Literal => "Constant scalar value with an optional type name.",
    Var => "Reference to a local binding by name.",
    Call => "Invocation of another `Unit`, referenced by CID.",
    BinOp => "Binary operator applied to two expressions.",
    Loop => "Repeated block guarded by an optional condition.",
    Match => "Positional pattern/arm dispatch over a scrutinee.",
    PrimitiveType => "Built-in scalar type.",
    CompositeType => "Record type with named fields.",
    FunctionType => "Function signature type.",
    ArrayType => "Homogeneous array type with optional fixed length.",
    ReferenceType => "Reference to a type artifact, by CID.",
    Constraint => "Named predicate over a type with scalar parameters.",
}

impl NodeKind {
    /// Parses a short or fully-qualified kind name.
    ///
    /// Anything outside the closed set fails with
    /// [`CanonicalizationError::UnknownNodeKind`].
    pub fn parse(name: &str) -> Result<Self, CanonicalizationError> {
        let short = name
            .strip_prefix(KIND_NAMESPACE)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(name);
        NodeKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.short_name() == short)
            .ok_or_else(|| CanonicalizationError::UnknownNodeKind(name.to_string()))
    }

    /// Returns `true` for expression kinds.
    pub fn is_expression(self) -> bool {
        KindSet::EXPR.contains(self)
    }

    /// Returns `true` for type kinds.
    pub fn is_type(self) -> bool {
        KindSet::TYPE.contains(self)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for NodeKind {
    type Err = CanonicalizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::parse(s)
    }
}

/// A set of node kinds accepted by a child or reference slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindSet {
    name: &'static str,
    kinds: &'static [NodeKind],
}

impl KindSet {
    /// Expression kinds.
    pub const EXPR: KindSet = KindSet {
        name: "Expression",
        kinds: &[
            NodeKind::Block,
            NodeKind::Literal,
            NodeKind::Var,
            NodeKind::Call,
            NodeKind::BinOp,
            NodeKind::Loop,
            NodeKind::Match,
        ],
    };

    /// Type kinds.
    pub const TYPE: KindSet = KindSet {
        name: "Type",
        kinds: &[
            NodeKind::PrimitiveType,
            NodeKind::CompositeType,
            NodeKind::FunctionType,
            NodeKind::ArrayType,
            NodeKind::ReferenceType,
        ],
    };

    /// Only `Unit`.
    pub const UNIT: KindSet = KindSet {
        name: "Unit",
        kinds: &[NodeKind::Unit],
    };

    /// Only `Block`.
    pub const BLOCK: KindSet = KindSet {
        name: "Block",
        kinds: &[NodeKind::Block],
    };

    /// Only `Constraint`.
    pub const CONSTRAINT: KindSet = KindSet {
        name: "Constraint",
        kinds: &[NodeKind::Constraint],
    };

    /// Returns `true` if `kind` belongs to the set.
    pub fn contains(&self, kind: NodeKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Human-readable set name used in diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }
}
