use crate::{
    error::Error,
    ops::{OpKind, float_equal},
    tree::{NodeId, Payload, Tree},
};

/**
Simplify `tree` in place by running constant folding and neutral element
elimination until the node count stops changing. Either pass can expose new
work for the other, hence the fixpoint loop. Every rewrite keeps the parent
links and the tracked node count consistent; the result is verified before
returning.
*/
pub fn optimize(tree: &mut Tree) -> Result<(), Error> {
    if tree.root().is_none() {
        return Ok(());
    }
    loop {
        let before = tree.node_count();
        if let Some(root) = tree.root() {
            fold_constants(tree, root);
        }
        if let Some(root) = tree.root() {
            eliminate_neutral(tree, root);
        }
        if tree.node_count() == before {
            break;
        }
    }
    tree.verify()
}

/// Post-order pass replacing every operator whose operands are all numbers
/// with the computed number.
fn fold_constants(tree: &mut Tree, id: NodeId) {
    let (left, right) = {
        let node = tree.node(id);
        (node.left(), node.right())
    };
    if let Some(left) = left {
        fold_constants(tree, left);
    }
    if let Some(right) = right {
        fold_constants(tree, right);
    }
    let node = *tree.node(id);
    let Payload::Operator(op) = node.payload() else {
        return;
    };
    match (node.left(), node.right()) {
        (Some(left), Some(right)) => {
            if let (Payload::Number(a), Payload::Number(b)) =
                (tree.node(left).payload(), tree.node(right).payload())
            {
                if is_root_exponent(tree, id) {
                    return;
                }
                tree.replace_with_number(id, op.apply(a, b));
            }
        }
        (None, Some(right)) => {
            if let Payload::Number(a) = tree.node(right).payload() {
                tree.replace_with_number(id, op.apply(a, f64::NAN));
            }
        }
        _ => {}
    }
}

// A division with a unit numerator sitting in the exponent slot of a pow
// node spells x^(1/n). Folding it would destroy the pattern the renderer
// recognizes as a root, so it stays.
fn is_root_exponent(tree: &Tree, id: NodeId) -> bool {
    let node = tree.node(id);
    if !matches!(node.payload(), Payload::Operator(OpKind::Div)) {
        return false;
    }
    let Some(left) = node.left() else {
        return false;
    };
    if !matches!(tree.node(left).payload(), Payload::Number(v) if float_equal(v, 1.0)) {
        return false;
    }
    let Some(parent) = node.parent() else {
        return false;
    };
    let pnode = tree.node(parent);
    matches!(pnode.payload(), Payload::Operator(OpKind::Pow)) && pnode.right() == Some(id)
}

/// Post-order pass applying the algebraic identities that drop a neutral
/// operand or collapse the node to a constant outright.
fn eliminate_neutral(tree: &mut Tree, id: NodeId) {
    if let Some(left) = tree.node(id).left() {
        eliminate_neutral(tree, left);
    }
    // the child slots are re-read; a child may have been replaced by its
    // own rewrite
    if let Some(right) = tree.node(id).right() {
        eliminate_neutral(tree, right);
    }
    let node = *tree.node(id);
    let Payload::Operator(op) = node.payload() else {
        return;
    };
    let (Some(left), Some(right)) = (node.left(), node.right()) else {
        return;
    };
    let lhs = as_number(tree, left);
    let rhs = as_number(tree, right);
    match op {
        OpKind::Mul => {
            if is(lhs, 0.0) || is(rhs, 0.0) {
                tree.replace_with_number(id, 0.0);
            } else if is(lhs, 1.0) {
                tree.replace_with_child(id, right);
            } else if is(rhs, 1.0) {
                tree.replace_with_child(id, left);
            }
        }
        OpKind::Div => {
            if is(lhs, 0.0) {
                tree.replace_with_number(id, 0.0);
            } else if is(rhs, 1.0) {
                tree.replace_with_child(id, left);
            }
        }
        OpKind::Add => {
            if is(lhs, 0.0) {
                tree.replace_with_child(id, right);
            } else if is(rhs, 0.0) {
                tree.replace_with_child(id, left);
            }
        }
        OpKind::Sub => {
            if is(rhs, 0.0) {
                tree.replace_with_child(id, left);
            }
        }
        OpKind::Pow => {
            if is(rhs, 0.0) {
                tree.replace_with_number(id, 1.0);
            } else if is(lhs, 1.0) {
                tree.replace_with_number(id, 1.0);
            } else if is(lhs, 0.0) {
                tree.replace_with_number(id, 0.0);
            } else if is(rhs, 1.0) {
                tree.replace_with_child(id, left);
            }
        }
        _ => {}
    }
}

fn as_number(tree: &Tree, id: NodeId) -> Option<f64> {
    match tree.node(id).payload() {
        Payload::Number(value) => Some(value),
        _ => None,
    }
}

fn is(value: Option<f64>, expected: f64) -> bool {
    matches!(value, Some(v) if float_equal(v, expected))
}
