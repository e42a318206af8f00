use crate::{
    error::Error,
    ops::OpKind,
    tree::{NodeId, Payload, Tree},
    vars::VariableTable,
};
use log::error;

const NIL: &str = "nil";
const SNIPPET_LEN: usize = 10;

/**
Read a tree from the parenthesized prefix literal format:

```text
(<number-or-operator-or-name> <child-or-nil> <child-or-nil>)
```

Absent children are spelled `nil`; trailing absent children may also be
omitted entirely, so `(x)` and `(x nil nil)` read the same. The number of
non-nil children must match the operator's arity exactly. Failures cite the
byte offset and a snippet of the offending input, and any partially built
nodes are released before returning.
*/
pub fn read_literal(text: &str, vars: &mut VariableTable) -> Result<Tree, Error> {
    let mut reader = Reader {
        text,
        buf: text.as_bytes(),
        pos: 0,
        vars,
        tree: Tree::new(),
    };
    let root = reader.node()?;
    reader.skip_whitespace();
    if reader.pos < reader.buf.len() {
        return Err(reader.error("trailing input after the root node"));
    }
    let mut tree = reader.tree;
    if let Some(root) = root {
        tree.attach_root(root)?;
    }
    Ok(tree)
}

/// Write a tree in the canonical literal form, with explicit `nil` child
/// slots.
pub fn write_literal(tree: &Tree, vars: &VariableTable) -> Result<String, Error> {
    let mut out = String::new();
    match tree.root() {
        Some(root) => write_node(tree, Some(root), vars, &mut out)?,
        None => out.push_str(NIL),
    }
    Ok(out)
}

fn write_node(
    tree: &Tree,
    id: Option<NodeId>,
    vars: &VariableTable,
    out: &mut String,
) -> Result<(), Error> {
    let Some(id) = id else {
        out.push_str(NIL);
        return Ok(());
    };
    let node = tree.node(id);
    out.push('(');
    match node.payload() {
        Payload::Number(value) => out.push_str(&value.to_string()),
        Payload::Variable(var) => match vars.name(var) {
            Some(name) => out.push_str(name),
            None => return Err(Error::UnknownVariable(format!("#{var}"))),
        },
        Payload::Operator(op) => out.push_str(op.symbol()),
    }
    out.push(' ');
    write_node(tree, node.left(), vars, out)?;
    out.push(' ');
    write_node(tree, node.right(), vars, out)?;
    out.push(')');
    Ok(())
}

/// Render a tree as a fully parenthesized infix formula.
pub fn write_infix(tree: &Tree, vars: &VariableTable) -> Result<String, Error> {
    let mut out = String::new();
    match tree.root() {
        Some(root) => infix_node(tree, root, vars, &mut out)?,
        None => return Err(Error::EmptyTree),
    }
    Ok(out)
}

fn infix_node(
    tree: &Tree,
    id: NodeId,
    vars: &VariableTable,
    out: &mut String,
) -> Result<(), Error> {
    let node = tree.node(id);
    match node.payload() {
        Payload::Number(value) => out.push_str(&value.to_string()),
        Payload::Variable(var) => match vars.name(var) {
            Some(name) => out.push_str(name),
            None => return Err(Error::UnknownVariable(format!("#{var}"))),
        },
        Payload::Operator(op) if op.is_function() => {
            out.push_str(op.symbol());
            out.push('(');
            if let Some(left) = node.left() {
                infix_node(tree, left, vars, out)?;
                out.push_str(", ");
            }
            match node.right() {
                Some(right) => infix_node(tree, right, vars, out)?,
                None => return Err(Error::InvalidArgument),
            }
            out.push(')');
        }
        Payload::Operator(op) => {
            let (Some(left), Some(right)) = (node.left(), node.right()) else {
                return Err(Error::InvalidArgument);
            };
            out.push('(');
            infix_node(tree, left, vars, out)?;
            out.push_str(op.symbol());
            infix_node(tree, right, vars, out)?;
            out.push(')');
        }
    }
    Ok(())
}

struct Reader<'a> {
    text: &'a str,
    buf: &'a [u8],
    pos: usize,
    vars: &'a mut VariableTable,
    tree: Tree,
}

impl<'a> Reader<'a> {
    fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.buf.get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn error(&self, message: &'static str) -> Error {
        let end = usize::min(self.pos + SNIPPET_LEN, self.text.len());
        let snippet = String::from_utf8_lossy(&self.buf[self.pos..end]).into_owned();
        error!(
            "failed to read a node at byte {}: {} (near {:?})",
            self.pos, message, snippet
        );
        Error::Syntax {
            offset: self.pos,
            message,
            snippet,
        }
    }

    fn node(&mut self) -> Result<Option<NodeId>, Error> {
        self.skip_whitespace();
        if self.text[self.pos..].starts_with(NIL) {
            self.pos += NIL.len();
            return Ok(None);
        }
        if self.peek() != Some(b'(') {
            return Err(self.error("illegal character at the start of a node"));
        }
        let node_start = self.pos;
        self.pos += 1;
        self.skip_whitespace();
        let payload = self.value()?;
        let mut left = self.child()?;
        let mut right = self.child()?;
        let expected = match payload {
            Payload::Operator(op) => op.arity(),
            _ => 0,
        };
        let found = left.is_some() as u8 + right.is_some() as u8;
        if expected != found {
            return Err(Error::ArityMismatch {
                offset: node_start,
                expected,
                found,
            });
        }
        // a unary operand always lives in the right slot
        if expected == 1 && left.is_some() {
            right = left.take();
        }
        self.skip_whitespace();
        if self.peek() != Some(b')') {
            return Err(self.error("missing closing parenthesis in a node"));
        }
        self.pos += 1;
        let id = self.tree.alloc(payload, left, right);
        if let Some(left) = left {
            self.tree.set_parent(left, Some(id));
        }
        if let Some(right) = right {
            self.tree.set_parent(right, Some(id));
        }
        Ok(Some(id))
    }

    fn child(&mut self) -> Result<Option<NodeId>, Error> {
        self.skip_whitespace();
        match self.peek() {
            Some(b')') | None => Ok(None),
            _ => self.node(),
        }
    }

    fn value(&mut self) -> Result<Payload, Error> {
        match self.peek() {
            Some(c) if c.is_ascii_digit() => Ok(Payload::Number(self.scan_number()?)),
            Some(b'-') if matches!(self.peek_at(1), Some(d) if d.is_ascii_digit()) => {
                Ok(Payload::Number(self.scan_number()?))
            }
            _ => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if !c.is_ascii_whitespace() && c != b'(' && c != b')')
                {
                    self.pos += 1;
                }
                if self.pos == start {
                    return Err(self.error("missing value in a node"));
                }
                let token = &self.text[start..self.pos];
                match OpKind::from_token(token) {
                    Some(op) => Ok(Payload::Operator(op)),
                    None => Ok(Payload::Variable(self.vars.register(token)?)),
                }
            }
        }
    }

    // the longest prefix that scans as a float, including decimal and
    // exponent forms
    fn scan_number(&mut self) -> Result<f64, Error> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'-') | Some(b'+')) {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some(b'.') {
            self.pos += 1;
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some(b'-') | Some(b'+')) {
                self.pos += 1;
            }
            if matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.pos += 1;
                }
            } else {
                self.pos = mark;
            }
        }
        self.text[start..self.pos]
            .parse::<f64>()
            .map_err(|_| self.error("no valid numeric value in a node"))
    }
}

impl std::fmt::Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Number(value) => write!(f, "Number({value})"),
            Payload::Variable(var) => write!(f, "Variable(#{var})"),
            Payload::Operator(op) => write!(f, "Operator({})", op.symbol()),
        }
    }
}

impl std::fmt::Display for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.root() {
            None => writeln!(f, "<empty tree>"),
            Some(root) => {
                writeln!(f)?;
                fmt_subtree(self, root, "", f)
            }
        }
    }
}

fn fmt_subtree(
    tree: &Tree,
    id: NodeId,
    prefix: &str,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    let node = tree.node(id);
    writeln!(f, "[{}] {}", id, node.payload())?;
    let children: Vec<NodeId> = [node.left(), node.right()].into_iter().flatten().collect();
    for (i, child) in children.iter().enumerate() {
        let last = i + 1 == children.len();
        write!(f, "{}{}", prefix, if last { " └── " } else { " ├── " })?;
        let extended = format!("{}{}", prefix, if last { "     " } else { " │   " });
        fmt_subtree(tree, *child, &extended, f)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ops::OpKind::*;

    #[test]
    fn t_read_leaf_forms() {
        let mut vars = VariableTable::new();
        let tree = read_literal("(5 nil nil)", &mut vars).unwrap();
        assert_eq!(
            tree.node(tree.root().unwrap()).payload(),
            Payload::Number(5.0)
        );
        let tree = read_literal("(x)", &mut vars).unwrap();
        assert_eq!(
            tree.node(tree.root().unwrap()).payload(),
            Payload::Variable(vars.find("x").unwrap())
        );
        let tree = read_literal("(-2.5e2 nil nil)", &mut vars).unwrap();
        assert_eq!(
            tree.node(tree.root().unwrap()).payload(),
            Payload::Number(-250.0)
        );
    }

    #[test]
    fn t_read_operator_forms() {
        let mut vars = VariableTable::new();
        let tree = read_literal("(* (x nil nil) (2 nil nil))", &mut vars).unwrap();
        tree.verify().unwrap();
        let root = tree.root().unwrap();
        assert_eq!(tree.node(root).payload(), Payload::Operator(Mul));
        assert_eq!(tree.node_count(), 3);
        // alias spelling, unary operand normalized into the right slot
        let tree = read_literal("(tg nil (x))", &mut vars).unwrap();
        let root = tree.root().unwrap();
        assert_eq!(tree.node(root).payload(), Payload::Operator(Tan));
        assert!(tree.node(root).left().is_none());
        assert!(tree.node(root).right().is_some());
        let tree = read_literal("(sin (x))", &mut vars).unwrap();
        let root = tree.root().unwrap();
        assert!(tree.node(root).left().is_none());
        assert!(tree.node(root).right().is_some());
    }

    #[test]
    fn t_round_trip() {
        let mut vars = VariableTable::new();
        for text in [
            "(+ (x nil nil) (1 nil nil))",
            "(* (sin nil (x nil nil)) (cos nil (y nil nil)))",
            "(log (2 nil nil) (^ (x nil nil) (2 nil nil)))",
            "(-3.5 nil nil)",
        ] {
            let tree = read_literal(text, &mut vars).unwrap();
            let written = write_literal(&tree, &vars).unwrap();
            let reread = read_literal(&written, &mut vars).unwrap();
            assert_eq!(write_literal(&reread, &vars).unwrap(), written);
        }
    }

    #[test]
    fn t_arity_mismatch() {
        let mut vars = VariableTable::new();
        assert!(matches!(
            read_literal("(+ (x nil nil) nil)", &mut vars),
            Err(Error::ArityMismatch {
                expected: 2,
                found: 1,
                ..
            })
        ));
        assert!(matches!(
            read_literal("(sin (x) (y))", &mut vars),
            Err(Error::ArityMismatch {
                expected: 1,
                found: 2,
                ..
            })
        ));
        assert!(matches!(
            read_literal("(5 (1 nil nil) nil)", &mut vars),
            Err(Error::ArityMismatch {
                expected: 0,
                found: 1,
                ..
            })
        ));
    }

    #[test]
    fn t_read_errors_cite_position() {
        let mut vars = VariableTable::new();
        match read_literal("(+ (1 nil nil) [2])", &mut vars) {
            Err(Error::Syntax {
                offset, snippet, ..
            }) => {
                assert_eq!(offset, 15);
                assert!(snippet.starts_with('['));
            }
            other => panic!("expected a syntax error, got {other:?}"),
        }
        assert!(matches!(
            read_literal("(+ (1 nil nil) (2 nil nil)", &mut vars),
            Err(Error::Syntax { .. })
        ));
        assert!(matches!(
            read_literal("(1 nil nil) junk", &mut vars),
            Err(Error::Syntax { .. })
        ));
    }

    #[test]
    fn t_nil_reads_as_empty_tree() {
        let mut vars = VariableTable::new();
        let tree = read_literal("nil", &mut vars).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.node_count(), 0);
    }

    #[test]
    fn t_infix_rendering() {
        let mut vars = VariableTable::new();
        let tree = read_literal("(+ (x) (* (2) (y)))", &mut vars).unwrap();
        assert_eq!(write_infix(&tree, &vars).unwrap(), "(x+(2*y))");
        let tree = read_literal("(log (2) (x))", &mut vars).unwrap();
        assert_eq!(write_infix(&tree, &vars).unwrap(), "log(2, x)");
    }

    #[test]
    fn t_display_dump() {
        let mut vars = VariableTable::new();
        let tree = read_literal("(+ (x) (* (2) (y)))", &mut vars).unwrap();
        let dump = format!("{tree}");
        assert!(dump.contains("Operator(+)"));
        assert!(dump.contains("Operator(*)"));
        assert!(dump.contains("Variable(#0)"));
        assert!(dump.contains("Number(2)"));
        assert!(dump.contains(" └── "));
        assert!(dump.contains(" ├── "));
    }
}
