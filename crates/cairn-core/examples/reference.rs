use cairn_canonical::{FieldValue, Node, NodeArena, NodeKind};
use cairn_core::ContentHasher;

fn main() {
    let hasher = ContentHasher::default();

    let mut library = NodeArena::new();
    let one = library.insert(Node::new(NodeKind::Literal).with("value", 1));
    let unit = library.insert(
        Node::new(NodeKind::Unit)
            .with("name", "one")
            .with("params", FieldValue::Map(Vec::new()))
            .with("body", one)
            .with("constraints", FieldValue::List(Vec::new())),
    );
    let callee = match hasher.hash(&library, unit) {
        Ok(output) => output,
        Err(err) => {
            eprintln!("hashing failed: {}", err);
            std::process::exit(1);
        }
    };

    let mut program = NodeArena::new();
    let call = program.insert(
        Node::new(NodeKind::Call)
            .with("target", callee.reference())
            .with("args", FieldValue::List(Vec::new()))
            .with("named_args", FieldValue::Map(Vec::new())),
    );
    match hasher.hash(&program, call) {
        Ok(caller) => {
            println!("unit {}", callee.root);
            println!("call {}", caller.root);
        }
        Err(err) => {
            eprintln!("hashing failed: {}", err);
            std::process::exit(1);
        }
    }
}
