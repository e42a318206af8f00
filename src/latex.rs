use crate::{
    error::Error,
    ops::{OpKind, float_equal},
    tree::{Node, NodeId, Payload, Tree},
    vars::VariableTable,
};
use std::io::Write;

// formulas wrap to a fresh line once this many characters of leaf content
// have been written since the last break
const MAX_CHARS_PER_LINE: usize = 54;

/// Render the whole tree as a line-wrapped TeX formula.
pub fn tex_formula(tree: &Tree, vars: &VariableTable) -> Result<String, Error> {
    match tree.root() {
        Some(root) => tex_fragment(tree, root, vars, false, false),
        None => Err(Error::EmptyTree),
    }
}

/// Render the subtree at `id`, optionally suppressing the outermost bracket
/// decision and line breaking.
pub fn tex_fragment(
    tree: &Tree,
    id: NodeId,
    vars: &VariableTable,
    suppress_brackets: bool,
    suppress_newline: bool,
) -> Result<String, Error> {
    let mut out = String::new();
    let mut written = 0usize;
    render(
        tree,
        id,
        vars,
        &mut out,
        &mut written,
        suppress_brackets,
        suppress_newline,
    )?;
    Ok(out)
}

#[allow(clippy::too_many_arguments)]
fn render(
    tree: &Tree,
    id: NodeId,
    vars: &VariableTable,
    out: &mut String,
    written: &mut usize,
    suppress_brackets: bool,
    suppress_newline: bool,
) -> Result<(), Error> {
    let node = *tree.node(id);
    // brackets are needed under a parent when this is a negative number,
    // when the parent is a named function, or when the parent binds
    // tighter than this operator
    let needs_brackets = match node.parent() {
        Some(parent) if !suppress_brackets => {
            let negative = matches!(node.payload(), Payload::Number(v) if v < 0.0);
            match tree.node(parent).payload() {
                Payload::Operator(parent_op) => {
                    negative
                        || parent_op.is_function()
                        || matches!(
                            node.payload(),
                            Payload::Operator(op) if parent_op.precedence() > op.precedence()
                        )
                }
                _ => negative,
            }
        }
        _ => false,
    };
    if needs_brackets {
        out.push('(');
        *written += 1;
    }
    let is_division = matches!(node.payload(), Payload::Operator(OpKind::Div));
    let is_log = matches!(node.payload(), Payload::Operator(OpKind::Log));
    if is_division {
        let (Some(left), Some(right)) = (node.left(), node.right()) else {
            return Err(Error::InvalidArgument);
        };
        out.push_str("\\frac{");
        render(tree, left, vars, out, written, true, true)?;
        out.push_str("}{");
        render(tree, right, vars, out, written, true, true)?;
        out.push('}');
    } else if is_log {
        let (Some(left), Some(right)) = (node.left(), node.right()) else {
            return Err(Error::InvalidArgument);
        };
        out.push_str("\\log_{");
        render(tree, left, vars, out, written, true, true)?;
        out.push('}');
        render(tree, right, vars, out, written, false, suppress_newline)?;
    } else if let Some((base, index)) = root_exponent(tree, &node) {
        match tree.node(index).payload() {
            Payload::Number(n) if float_equal(n, 2.0) => out.push_str("\\sqrt{"),
            _ => {
                out.push_str("\\sqrt[");
                render(tree, index, vars, out, written, true, true)?;
                out.push_str("]{");
            }
        }
        render(tree, base, vars, out, written, true, true)?;
        out.push('}');
    } else {
        let is_pow = matches!(node.payload(), Payload::Operator(OpKind::Pow));
        if let Some(left) = node.left() {
            if is_pow {
                out.push('{');
            }
            render(tree, left, vars, out, written, false, is_pow || suppress_newline)?;
            if is_pow {
                out.push('}');
            }
        }
        match node.payload() {
            Payload::Number(value) => {
                let text = value.to_string();
                *written += text.len();
                out.push_str(&text);
            }
            Payload::Variable(var) => {
                let name = vars
                    .name(var)
                    .ok_or_else(|| Error::UnknownVariable(format!("#{var}")))?;
                *written += name.len();
                out.push_str(name);
            }
            Payload::Operator(op) => {
                if op.is_function() {
                    out.push('\\');
                }
                *written += op.symbol().len();
                out.push_str(op.symbol());
            }
        }
        if let Some(right) = node.right() {
            if is_pow {
                out.push('{');
            }
            render(tree, right, vars, out, written, is_pow, is_pow || suppress_newline)?;
            if is_pow {
                out.push('}');
            }
        }
    }
    if needs_brackets {
        out.push(')');
        *written += 1;
    }
    if !suppress_newline && *written > MAX_CHARS_PER_LINE {
        out.push_str("\\\\\n");
        *written = 0;
    }
    Ok(())
}

// pow nodes whose exponent is a division with a unit numerator render as
// roots: x^(1/2) is \sqrt{x}, x^(1/n) is \sqrt[n]{x}
fn root_exponent(tree: &Tree, node: &Node) -> Option<(NodeId, NodeId)> {
    if !matches!(node.payload(), Payload::Operator(OpKind::Pow)) {
        return None;
    }
    let exponent = node.right()?;
    let exponent_node = tree.node(exponent);
    if !matches!(exponent_node.payload(), Payload::Operator(OpKind::Div)) {
        return None;
    }
    let numerator = exponent_node.left()?;
    if !matches!(tree.node(numerator).payload(), Payload::Number(v) if float_equal(v, 1.0)) {
        return None;
    }
    Some((node.left()?, exponent_node.right()?))
}

pub(crate) fn document_header(out: &mut dyn Write) -> std::io::Result<()> {
    write!(
        out,
        "\\documentclass{{article}}\
         \\usepackage{{amsmath}}\
         \\usepackage{{geometry}}\
         \\geometry{{a4paper, margin=1in}}\
         \\DeclareMathOperator{{\\arccot}}{{arccot}}\
         \\begin{{document}}\n"
    )
}

pub(crate) fn document_footer(out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "\\end{{document}}")
}

pub(crate) fn write_heading(out: &mut dyn Write, formula: &str) -> std::io::Result<()> {
    write!(
        out,
        "\\raggedright Differentiating:\\begin{{align*}}\n{formula}\n\\end{{align*}}\\\\\n"
    )
}

pub(crate) fn write_step(
    out: &mut dyn Write,
    step: u32,
    var: &str,
    before: &str,
    after: &str,
) -> std::io::Result<()> {
    write!(
        out,
        "\\raggedright({step}):\\begin{{align*}}\n\\frac{{d}}{{d{var}}}({before}) = {after}\n\\end{{align*}}\\\\\n"
    )
}
