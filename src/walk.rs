use crate::tree::{NodeId, Payload, Tree};
use std::ops::ControlFlow;

/// A traversal callback. Receives the tree, the node being visited and the
/// node's depth. Returning `Break` halts the whole traversal early.
pub type Hook<'a> = &'a mut dyn FnMut(&Tree, NodeId, u32) -> ControlFlow<()>;

/// Optional hooks for the three visiting orders. A hook that is absent is
/// simply skipped; any combination can be supplied in one traversal.
#[derive(Default)]
pub struct Hooks<'a> {
    pub preorder: Option<Hook<'a>>,
    pub inorder: Option<Hook<'a>>,
    pub postorder: Option<Hook<'a>>,
}

/// Walk the whole tree depth first. Returns true if a hook halted the
/// traversal early.
pub fn traverse(tree: &Tree, hooks: &mut Hooks) -> bool {
    match tree.root() {
        Some(root) => traverse_from(tree, root, hooks, 0).is_break(),
        None => false,
    }
}

/// Walk the subtree rooted at `id`. The recursion depth matches the nesting
/// depth of the expression.
pub fn traverse_from(
    tree: &Tree,
    id: NodeId,
    hooks: &mut Hooks,
    level: u32,
) -> ControlFlow<()> {
    let node = tree.node(id);
    let (left, right) = (node.left(), node.right());
    if let Some(hook) = hooks.preorder.as_mut() {
        hook(tree, id, level)?;
    }
    if let Some(left) = left {
        traverse_from(tree, left, hooks, level + 1)?;
    }
    if let Some(hook) = hooks.inorder.as_mut() {
        hook(tree, id, level)?;
    }
    if let Some(right) = right {
        traverse_from(tree, right, hooks, level + 1)?;
    }
    if let Some(hook) = hooks.postorder.as_mut() {
        hook(tree, id, level)?;
    }
    ControlFlow::Continue(())
}

/// True if the subtree rooted at `id` references the variable with the
/// given id anywhere.
pub fn contains_variable(tree: &Tree, id: NodeId, var: usize) -> bool {
    let mut check = |tree: &Tree, id: NodeId, _level: u32| -> ControlFlow<()> {
        match tree.node(id).payload() {
            Payload::Variable(found) if found == var => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        }
    };
    traverse_from(
        tree,
        id,
        &mut Hooks {
            inorder: Some(&mut check),
            ..Hooks::default()
        },
        0,
    )
    .is_break()
}
