use crate::{
    error::Error,
    tree::{NodeId, Payload, Tree},
    vars::VariableTable,
};
use std::fmt::Write;

const BG_COLOR: &str = "#FFFFFF";
const OP_CELL: &str = "#98D26B";
const NUM_CELL: &str = "#7CA0CE";
const VAR_CELL: &str = "#8673BA";
const BAD_CELL: &str = "#F02222";
const OK_EDGE: &str = "#2222E0";
const BAD_EDGE: &str = "#E02222";

/**
Render the tree as a Graphviz digraph. Every node becomes a record listing
its kind, value and link slots. An intact parent/child bond is drawn as a
double-headed edge; a child whose parent back-reference does not point at
the traversing parent gets the failure color instead, and its stray parent
link is drawn explicitly. The corruption is only rendered, never repaired.
*/
pub fn write_dot(tree: &Tree, vars: &VariableTable) -> Result<String, Error> {
    let mut out = String::new();
    push(
        &mut out,
        format_args!(
            "digraph G {{\n\
             rankdir=TB;\n\
             graph [bgcolor=\"{BG_COLOR}\", pad=0.25, nodesep=0.55, ranksep=0.9, splines=ortho, ordering=\"in\"];\n\
             node [shape=box, style=\"rounded, filled\", fontname=\"monospace\", fontsize=14, penwidth=2.1];\n\
             edge [penwidth=2.5, arrowsize=0.8, arrowhead=vee];\n"
        ),
    );
    if let Some(root) = tree.root() {
        declare_node(tree, vars, root, false, &mut out);
        declare_ranks(tree, root, &mut out);
    }
    out.push_str("}\n");
    Ok(out)
}

fn declare_node(tree: &Tree, vars: &VariableTable, id: NodeId, bond_failed: bool, out: &mut String) {
    let node = tree.node(id);
    let (fill, kind, value) = match node.payload() {
        Payload::Number(v) => (NUM_CELL, "NUM", v.to_string()),
        Payload::Variable(var) => (
            VAR_CELL,
            "VAR",
            vars.name(var).unwrap_or("invalid index").to_string(),
        ),
        Payload::Operator(op) => (OP_CELL, "OP", op.symbol().to_string()),
    };
    let fill = if bond_failed { BAD_CELL } else { fill };
    push(
        out,
        format_args!(
            "node{id} [fillcolor=\"{fill}\", label=<\
             <table border=\"0\" cellborder=\"1\" cellspacing=\"0\" cellpadding=\"4\">\
             <tr><td colspan=\"2\"><b>parent:</b> {}</td></tr>\
             <tr><td colspan=\"2\"><b>type:</b> {kind}</td></tr>\
             <tr><td colspan=\"2\"><b>value:</b> {}</td></tr>\
             <tr><td><b>left:</b> {}</td><td><b>right:</b> {}</td></tr>\
             </table>>];\n",
            link(node.parent()),
            escape(&value),
            link(node.left()),
            link(node.right()),
        ),
    );
    if bond_failed {
        if let Some(parent) = node.parent() {
            push(
                out,
                format_args!("node{id} -> node{parent} [color=\"{BAD_EDGE}\"]\n"),
            );
        }
    }
    for child in [node.left(), node.right()].into_iter().flatten() {
        if tree.node(child).parent() == Some(id) {
            push(
                out,
                format_args!(
                    "node{id} -> node{child} [color=\"{OK_EDGE}\", arrowtail=vee, dir=both]\n"
                ),
            );
            declare_node(tree, vars, child, false, out);
        } else {
            push(
                out,
                format_args!("node{id} -> node{child} [color=\"{BAD_EDGE}\"]\n"),
            );
            declare_node(tree, vars, child, true, out);
        }
    }
}

// one rank group per depth level keeps the drawing layered like the tree
fn declare_ranks(tree: &Tree, root: NodeId, out: &mut String) {
    let mut level: Vec<NodeId> = vec![root];
    while !level.is_empty() {
        out.push_str("{ rank = same; ");
        for id in &level {
            push(out, format_args!("node{id}; "));
        }
        out.push_str("}\n");
        level = level
            .iter()
            .flat_map(|id| {
                let node = tree.node(*id);
                [node.left(), node.right()]
            })
            .flatten()
            .collect();
    }
}

fn link(id: Option<NodeId>) -> String {
    match id {
        Some(id) => id.to_string(),
        None => "none".to_string(),
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn push(out: &mut String, args: std::fmt::Arguments) {
    // writing into a String cannot fail
    let _ = out.write_fmt(args);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parse::parse;

    #[test]
    fn t_nodes_and_edges() {
        let mut vars = VariableTable::new();
        let tree = parse("x*2+1", &mut vars).unwrap();
        let dot = write_dot(&tree, &vars).unwrap();
        assert!(dot.starts_with("digraph G {"));
        assert!(dot.ends_with("}\n"));
        // five nodes, four intact bonds, three rank rows
        assert_eq!(dot.matches("<b>parent:</b>").count(), 5);
        assert_eq!(dot.matches("dir=both").count(), 4);
        assert_eq!(dot.matches("rank = same").count(), 3);
        assert!(!dot.contains(BAD_EDGE));
        assert!(dot.contains("<b>value:</b> x"));
        assert!(dot.contains("<b>value:</b> +"));
    }

    #[test]
    fn t_bond_failure_is_marked() {
        let mut vars = VariableTable::new();
        let mut tree = parse("x+1", &mut vars).unwrap();
        let root = tree.root().unwrap();
        let left = tree.node(root).left().unwrap();
        let right = tree.node(root).right().unwrap();
        tree.set_parent(left, Some(right));
        let dot = write_dot(&tree, &vars).unwrap();
        assert!(dot.contains(BAD_EDGE));
        // the stray parent link of the broken child is drawn too
        assert!(dot.contains(&format!("node{left} -> node{right}")));
    }

    #[test]
    fn t_operator_symbols_are_escaped() {
        let mut vars = VariableTable::new();
        let tree = parse("1-2", &mut vars).unwrap();
        let dot = write_dot(&tree, &vars).unwrap();
        assert!(dot.contains("<b>value:</b> -"));
        let tree = parse("x", &mut vars).unwrap();
        assert!(write_dot(&tree, &vars).unwrap().contains("VAR"));
    }

    #[test]
    fn t_empty_tree() {
        let vars = VariableTable::new();
        let dot = write_dot(&Tree::new(), &vars).unwrap();
        assert!(dot.starts_with("digraph G {"));
        assert!(!dot.contains("label=<"));
        assert!(!dot.contains("rank = same"));
    }
}
