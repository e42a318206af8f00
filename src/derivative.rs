use crate::{
    context::Context,
    error::Error,
    ops::{OpKind, float_equal},
    tree::{NodeId, Payload, Tree},
    walk::contains_variable,
};

/**
Compute the symbolic derivative of `tree` with respect to the variable
named `var`. The input tree is not modified; the result is a freshly built
tree that shares no nodes with the input. Subtrees of the input that appear
in the result are deep copies.

A variable that was never registered in the context's table cannot occur in
the tree, so the whole derivative short-circuits to the constant zero.

When the context carries a sink, every elementary step is rendered to it as
a numbered `d/dvar(before) = after` equation.
*/
pub fn differentiate(tree: &Tree, var: &str, ctx: &mut Context) -> Result<Tree, Error> {
    let Some(root) = tree.root() else {
        return Err(Error::InvalidArgument);
    };
    if ctx.has_sink() {
        ctx.write_heading(tree)?;
    }
    let Some(var_id) = ctx.vars.find(var) else {
        return Ok(Tree::constant(0.0));
    };
    let mut result = Tree::new();
    let derivative = diff_rec(tree, root, var, var_id, &mut result, ctx)?;
    result.attach_root(derivative)?;
    result.fix_parents();
    Ok(result)
}

fn diff_rec(
    src: &Tree,
    id: NodeId,
    var: &str,
    var_id: usize,
    dst: &mut Tree,
    ctx: &mut Context,
) -> Result<NodeId, Error> {
    let node = *src.node(id);
    let result = match node.payload() {
        Payload::Number(_) => num(dst, 0.0),
        Payload::Variable(v) if v == var_id => num(dst, 1.0),
        Payload::Variable(_) => num(dst, 0.0),
        Payload::Operator(op) => {
            let right = node.right().ok_or(Error::InvalidArgument)?;
            match op {
                OpKind::Add => {
                    let left = node.left().ok_or(Error::InvalidArgument)?;
                    let dl = diff_rec(src, left, var, var_id, dst, ctx)?;
                    let dr = diff_rec(src, right, var, var_id, dst, ctx)?;
                    op2(dst, OpKind::Add, dl, dr)
                }
                OpKind::Sub => {
                    let left = node.left().ok_or(Error::InvalidArgument)?;
                    let dl = diff_rec(src, left, var, var_id, dst, ctx)?;
                    let dr = diff_rec(src, right, var, var_id, dst, ctx)?;
                    op2(dst, OpKind::Sub, dl, dr)
                }
                OpKind::Mul => {
                    // L'R + LR'
                    let left = node.left().ok_or(Error::InvalidArgument)?;
                    let dl = diff_rec(src, left, var, var_id, dst, ctx)?;
                    let cr = dst.copy_from(src, right);
                    let first = op2(dst, OpKind::Mul, dl, cr);
                    let cl = dst.copy_from(src, left);
                    let dr = diff_rec(src, right, var, var_id, dst, ctx)?;
                    let second = op2(dst, OpKind::Mul, cl, dr);
                    op2(dst, OpKind::Add, first, second)
                }
                OpKind::Div => {
                    // (RL' - R'L) / R^2
                    let left = node.left().ok_or(Error::InvalidArgument)?;
                    let cr = dst.copy_from(src, right);
                    let dl = diff_rec(src, left, var, var_id, dst, ctx)?;
                    let first = op2(dst, OpKind::Mul, cr, dl);
                    let dr = diff_rec(src, right, var, var_id, dst, ctx)?;
                    let cl = dst.copy_from(src, left);
                    let second = op2(dst, OpKind::Mul, dr, cl);
                    let numerator = op2(dst, OpKind::Sub, first, second);
                    let cr2 = dst.copy_from(src, right);
                    let denominator = sq(dst, cr2);
                    op2(dst, OpKind::Div, numerator, denominator)
                }
                OpKind::Pow => {
                    let left = node.left().ok_or(Error::InvalidArgument)?;
                    power(src, id, left, right, var, var_id, dst, ctx)?
                }
                OpKind::Sin => {
                    let cr = dst.copy_from(src, right);
                    let outer = op1(dst, OpKind::Cos, cr);
                    chain(src, right, var, var_id, dst, ctx, outer)?
                }
                OpKind::Cos => {
                    let cr = dst.copy_from(src, right);
                    let sin = op1(dst, OpKind::Sin, cr);
                    let outer = neg(dst, sin);
                    chain(src, right, var, var_id, dst, ctx, outer)?
                }
                OpKind::Tan => {
                    let cr = dst.copy_from(src, right);
                    let cos = op1(dst, OpKind::Cos, cr);
                    let squared = sq(dst, cos);
                    let outer = inv(dst, squared);
                    chain(src, right, var, var_id, dst, ctx, outer)?
                }
                OpKind::Cot => {
                    let cr = dst.copy_from(src, right);
                    let sin = op1(dst, OpKind::Sin, cr);
                    let squared = sq(dst, sin);
                    let outer = neg_inv(dst, squared);
                    chain(src, right, var, var_id, dst, ctx, outer)?
                }
                OpKind::Log => {
                    // base in the left child; R' / (R ln L)
                    let left = node.left().ok_or(Error::InvalidArgument)?;
                    let cr = dst.copy_from(src, right);
                    let cl = dst.copy_from(src, left);
                    let ln = op1(dst, OpKind::Ln, cl);
                    let product = op2(dst, OpKind::Mul, cr, ln);
                    let outer = inv(dst, product);
                    chain(src, right, var, var_id, dst, ctx, outer)?
                }
                OpKind::Ln => {
                    let cr = dst.copy_from(src, right);
                    let outer = inv(dst, cr);
                    chain(src, right, var, var_id, dst, ctx, outer)?
                }
                OpKind::Sinh => {
                    let cr = dst.copy_from(src, right);
                    let outer = op1(dst, OpKind::Cosh, cr);
                    chain(src, right, var, var_id, dst, ctx, outer)?
                }
                OpKind::Cosh => {
                    let cr = dst.copy_from(src, right);
                    let outer = op1(dst, OpKind::Sinh, cr);
                    chain(src, right, var, var_id, dst, ctx, outer)?
                }
                OpKind::Tanh => {
                    let cr = dst.copy_from(src, right);
                    let cosh = op1(dst, OpKind::Cosh, cr);
                    let squared = sq(dst, cosh);
                    let outer = inv(dst, squared);
                    chain(src, right, var, var_id, dst, ctx, outer)?
                }
                OpKind::Coth => {
                    let cr = dst.copy_from(src, right);
                    let sinh = op1(dst, OpKind::Sinh, cr);
                    let squared = sq(dst, sinh);
                    let outer = neg_inv(dst, squared);
                    chain(src, right, var, var_id, dst, ctx, outer)?
                }
                OpKind::Asin => {
                    let outer = asin_denominator(src, right, dst);
                    let outer = inv(dst, outer);
                    chain(src, right, var, var_id, dst, ctx, outer)?
                }
                OpKind::Acos => {
                    let outer = asin_denominator(src, right, dst);
                    let outer = neg_inv(dst, outer);
                    chain(src, right, var, var_id, dst, ctx, outer)?
                }
                OpKind::Atan => {
                    let outer = atan_denominator(src, right, dst);
                    let outer = inv(dst, outer);
                    chain(src, right, var, var_id, dst, ctx, outer)?
                }
                OpKind::Acot => {
                    let outer = atan_denominator(src, right, dst);
                    let outer = neg_inv(dst, outer);
                    chain(src, right, var, var_id, dst, ctx, outer)?
                }
            }
        }
    };
    emit_step(ctx, var, src, id, dst, result)
}

/// The generalized power rule for `L^R`. The shape of the derivative
/// depends on which sides actually reference the variable, decided by a
/// tree search rather than a value check.
#[allow(clippy::too_many_arguments)]
fn power(
    src: &Tree,
    id: NodeId,
    left: NodeId,
    right: NodeId,
    var: &str,
    var_id: usize,
    dst: &mut Tree,
    ctx: &mut Context,
) -> Result<NodeId, Error> {
    let in_left = contains_variable(src, left, var_id);
    let in_right = contains_variable(src, right, var_id);
    if !in_left && !in_right {
        return Ok(num(dst, 0.0));
    }
    if in_left && !in_right {
        // R * L^(R-1) * L'
        let cr = dst.copy_from(src, right);
        let cl = dst.copy_from(src, left);
        let cr2 = dst.copy_from(src, right);
        let one = num(dst, 1.0);
        let decremented = op2(dst, OpKind::Sub, cr2, one);
        let pow = op2(dst, OpKind::Pow, cl, decremented);
        let outer = op2(dst, OpKind::Mul, cr, pow);
        let dl = diff_rec(src, left, var, var_id, dst, ctx)?;
        return Ok(op2(dst, OpKind::Mul, outer, dl));
    }
    if !in_left && in_right {
        // L^R * R', with the ln L factor dropped when the base is e
        let base_is_e = matches!(
            src.node(left).payload(),
            Payload::Number(v) if float_equal(v, std::f64::consts::E)
        );
        let copy = dst.copy_from(src, id);
        let outer = if base_is_e {
            copy
        } else {
            let cl = dst.copy_from(src, left);
            let ln = op1(dst, OpKind::Ln, cl);
            op2(dst, OpKind::Mul, copy, ln)
        };
        let dr = diff_rec(src, right, var, var_id, dst, ctx)?;
        return Ok(op2(dst, OpKind::Mul, outer, dr));
    }
    // both sides: L^R * d(R ln L), by logarithmic differentiation
    let mut scratch = Tree::new();
    let sr = scratch.copy_from(src, right);
    let sl = scratch.copy_from(src, left);
    let ln = scratch.alloc(Payload::Operator(OpKind::Ln), None, Some(sl));
    let product = scratch.alloc(Payload::Operator(OpKind::Mul), Some(sr), Some(ln));
    scratch.attach_root(product)?;
    scratch.fix_parents();
    let inner = diff_rec(&scratch, product, var, var_id, dst, ctx)?;
    let copy = dst.copy_from(src, id);
    Ok(op2(dst, OpKind::Mul, copy, inner))
}

// 1 - R^2 under a square root, shared by arcsin and arccos
fn asin_denominator(src: &Tree, right: NodeId, dst: &mut Tree) -> NodeId {
    let one = num(dst, 1.0);
    let cr = dst.copy_from(src, right);
    let squared = sq(dst, cr);
    let difference = op2(dst, OpKind::Sub, one, squared);
    sqrt(dst, difference)
}

// 1 + R^2, shared by arctan and arccot
fn atan_denominator(src: &Tree, right: NodeId, dst: &mut Tree) -> NodeId {
    let one = num(dst, 1.0);
    let cr = dst.copy_from(src, right);
    let squared = sq(dst, cr);
    op2(dst, OpKind::Add, one, squared)
}

// outer * R', the chain rule factor every named function ends with
fn chain(
    src: &Tree,
    right: NodeId,
    var: &str,
    var_id: usize,
    dst: &mut Tree,
    ctx: &mut Context,
    outer: NodeId,
) -> Result<NodeId, Error> {
    let dr = diff_rec(src, right, var, var_id, dst, ctx)?;
    Ok(op2(dst, OpKind::Mul, outer, dr))
}

fn num(dst: &mut Tree, value: f64) -> NodeId {
    dst.alloc(Payload::Number(value), None, None)
}

fn op1(dst: &mut Tree, op: OpKind, operand: NodeId) -> NodeId {
    dst.alloc(Payload::Operator(op), None, Some(operand))
}

fn op2(dst: &mut Tree, op: OpKind, left: NodeId, right: NodeId) -> NodeId {
    dst.alloc(Payload::Operator(op), Some(left), Some(right))
}

fn sq(dst: &mut Tree, base: NodeId) -> NodeId {
    let two = num(dst, 2.0);
    op2(dst, OpKind::Pow, base, two)
}

fn inv(dst: &mut Tree, denominator: NodeId) -> NodeId {
    let one = num(dst, 1.0);
    op2(dst, OpKind::Div, one, denominator)
}

fn neg_inv(dst: &mut Tree, denominator: NodeId) -> NodeId {
    let minus_one = num(dst, -1.0);
    op2(dst, OpKind::Div, minus_one, denominator)
}

fn neg(dst: &mut Tree, operand: NodeId) -> NodeId {
    let minus_one = num(dst, -1.0);
    op2(dst, OpKind::Mul, minus_one, operand)
}

// square roots are spelled pow(x, 1/2) so the renderer can recognize them
fn sqrt(dst: &mut Tree, operand: NodeId) -> NodeId {
    let one = num(dst, 1.0);
    let two = num(dst, 2.0);
    let half = op2(dst, OpKind::Div, one, two);
    op2(dst, OpKind::Pow, operand, half)
}

fn emit_step(
    ctx: &mut Context,
    var: &str,
    src: &Tree,
    before: NodeId,
    dst: &mut Tree,
    after: NodeId,
) -> Result<NodeId, Error> {
    if ctx.has_sink() {
        dst.fix_parents_from(after);
        ctx.write_step(var, (src, before), (&*dst, after))?;
    }
    Ok(after)
}
