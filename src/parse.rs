use crate::{
    error::Error,
    ops::OpKind,
    tree::{NodeId, Payload, Tree},
    vars::VariableTable,
};
use log::error;

const SNIPPET_LEN: usize = 10;

/**
Parse an infix formula into an expression tree, interning variable names
into `vars` as they are first encountered.

Grammar, with operators of the same precedence associating to the left:

```text
Expr    := Term (('+' | '-') Term)*
Term    := Factor (('*' | '/') Factor)*
Factor  := Primary ('^' Factor)?
Primary := '(' Expr ')' | name '(' Expr (',' Expr)? ')' | Variable | Number
Number  := '-'? digit+
```

Whitespace is skippable at every boundary. A failure reports the byte
offset, a reason and a snippet of the remaining input; no partial tree is
ever returned.
*/
pub fn parse(text: &str, vars: &mut VariableTable) -> Result<Tree, Error> {
    let mut parser = Parser {
        text,
        buf: text.as_bytes(),
        pos: 0,
        vars,
        tree: Tree::new(),
    };
    let root = parser.expression()?;
    parser.skip_whitespace();
    if parser.pos < parser.buf.len() {
        return Err(parser.syntax_error("illegal character at the end of the expression"));
    }
    let mut tree = parser.tree;
    tree.attach_root(root)?;
    tree.fix_parents();
    Ok(tree)
}

struct Parser<'a> {
    text: &'a str,
    buf: &'a [u8],
    pos: usize,
    vars: &'a mut VariableTable,
    tree: Tree,
}

impl<'a> Parser<'a> {
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

    fn syntax_error(&self, message: &'static str) -> Error {
        let end = usize::min(self.pos + SNIPPET_LEN, self.text.len());
        let snippet = String::from_utf8_lossy(&self.buf[self.pos..end]).into_owned();
        error!(
            "failed to parse the expression at byte {}: {} (near {:?})",
            self.pos, message, snippet
        );
        Error::Syntax {
            offset: self.pos,
            message,
            snippet,
        }
    }

    fn expression(&mut self) -> Result<NodeId, Error> {
        self.skip_whitespace();
        let mut value = self.term()?;
        loop {
            self.skip_whitespace();
            let op = match self.peek() {
                Some(b'+') => OpKind::Add,
                Some(b'-') => OpKind::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.term()?;
            value = self
                .tree
                .alloc(Payload::Operator(op), Some(value), Some(rhs));
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<NodeId, Error> {
        self.skip_whitespace();
        let mut value = self.factor()?;
        loop {
            self.skip_whitespace();
            let op = match self.peek() {
                Some(b'*') => OpKind::Mul,
                Some(b'/') => OpKind::Div,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.factor()?;
            value = self
                .tree
                .alloc(Payload::Operator(op), Some(value), Some(rhs));
        }
        Ok(value)
    }

    // Exponentiation associates to the right.
    fn factor(&mut self) -> Result<NodeId, Error> {
        self.skip_whitespace();
        let base = self.primary()?;
        self.skip_whitespace();
        if self.peek() == Some(b'^') {
            self.pos += 1;
            let exponent = self.factor()?;
            return Ok(self
                .tree
                .alloc(Payload::Operator(OpKind::Pow), Some(base), Some(exponent)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<NodeId, Error> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                let value = self.expression()?;
                self.skip_whitespace();
                if self.peek() != Some(b')') {
                    return Err(
                        self.syntax_error("illegal character at the end of a primary expression")
                    );
                }
                self.pos += 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() => self.number(),
            Some(b'-') if matches!(self.peek_at(1), Some(d) if d.is_ascii_digit()) => self.number(),
            Some(c) if is_name_start(c) => self.name(),
            _ => Err(self.syntax_error("illegal character at the start of a primary expression")),
        }
    }

    // Unsigned digit runs accumulated in base ten; a leading minus folds
    // into the literal.
    fn number(&mut self) -> Result<NodeId, Error> {
        let negative = self.peek() == Some(b'-');
        if negative {
            self.pos += 1;
        }
        let start = self.pos;
        let mut value = 0.0f64;
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            value = value * 10.0 + f64::from(c - b'0');
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.syntax_error("illegal character at the start of a number"));
        }
        if negative {
            value = -value;
        }
        Ok(self.tree.alloc(Payload::Number(value), None, None))
    }

    fn name(&mut self) -> Result<NodeId, Error> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if is_name_char(c)) {
            self.pos += 1;
        }
        let token = &self.text[start..self.pos];
        match OpKind::from_token(token) {
            Some(op) => self.call(op),
            None => {
                let id = self.vars.register(token)?;
                Ok(self.tree.alloc(Payload::Variable(id), None, None))
            }
        }
    }

    fn call(&mut self, op: OpKind) -> Result<NodeId, Error> {
        self.skip_whitespace();
        if self.peek() != Some(b'(') {
            return Err(self.syntax_error("expected '(' after a function name"));
        }
        self.pos += 1;
        let first = self.expression()?;
        let node = if op.arity() == 2 {
            self.skip_whitespace();
            if self.peek() != Some(b',') {
                return Err(self.syntax_error("expected ',' between function arguments"));
            }
            self.pos += 1;
            let second = self.expression()?;
            self.tree
                .alloc(Payload::Operator(op), Some(first), Some(second))
        } else {
            self.tree.alloc(Payload::Operator(op), None, Some(first))
        };
        self.skip_whitespace();
        if self.peek() != Some(b')') {
            return Err(self.syntax_error("expected ')' after function arguments"));
        }
        self.pos += 1;
        Ok(node)
    }
}

fn is_name_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'\\'
}

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'\\'
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::io::write_infix;

    fn parsed(text: &str) -> String {
        let mut vars = VariableTable::new();
        let tree = parse(text, &mut vars).unwrap();
        tree.verify().unwrap();
        write_infix(&tree, &vars).unwrap()
    }

    #[test]
    fn t_precedence() {
        assert_eq!(parsed("2+3*4"), "(2+(3*4))");
        assert_eq!(parsed("(2+3)*4"), "((2+3)*4)");
        assert_eq!(parsed("2*3+4"), "((2*3)+4)");
    }

    #[test]
    fn t_same_precedence_associates_left() {
        assert_eq!(parsed("1-2-3"), "((1-2)-3)");
        assert_eq!(parsed("24/4/2"), "((24/4)/2)");
        assert_eq!(parsed("1+2+3+4"), "(((1+2)+3)+4)");
    }

    #[test]
    fn t_power_associates_right() {
        assert_eq!(parsed("2^3^2"), "(2^(3^2))");
        assert_eq!(parsed("x^2*3"), "((x^2)*3)");
    }

    #[test]
    fn t_unary_minus_folds_into_the_literal() {
        assert_eq!(parsed("-5+x"), "(-5+x)");
        assert_eq!(parsed("x*-2"), "(x*-2)");
    }

    #[test]
    fn t_whitespace() {
        assert_eq!(parsed("  2 +\t3 * x "), "(2+(3*x))");
    }

    #[test]
    fn t_function_calls() {
        assert_eq!(parsed("sin(x)"), "sin(x)");
        assert_eq!(parsed("sin(x)*cos(x)"), "(sin(x)*cos(x))");
        assert_eq!(parsed("tg(x+1)"), "tan((x+1))");
        assert_eq!(parsed("log(2, x)"), "log(2, x)");
        assert_eq!(parsed("ln(x^2)"), "ln((x^2))");
    }

    #[test]
    fn t_variables_are_interned_once() {
        let mut vars = VariableTable::new();
        let tree = parse("alpha*alpha+beta", &mut vars).unwrap();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars.find("alpha"), Some(0));
        assert_eq!(vars.find("beta"), Some(1));
        assert_eq!(tree.node_count(), 5);
    }

    #[test]
    fn t_malformed_operator_position() {
        let mut vars = VariableTable::new();
        match parse("(3+*4)", &mut vars) {
            Err(Error::Syntax { offset, .. }) => assert_eq!(offset, 3),
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn t_trailing_garbage() {
        let mut vars = VariableTable::new();
        match parse("1+2)", &mut vars) {
            Err(Error::Syntax {
                offset, snippet, ..
            }) => {
                assert_eq!(offset, 3);
                assert_eq!(snippet, ")");
            }
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn t_unclosed_paren() {
        let mut vars = VariableTable::new();
        assert!(matches!(
            parse("(1+2", &mut vars),
            Err(Error::Syntax { offset: 4, .. })
        ));
    }

    #[test]
    fn t_missing_function_argument() {
        let mut vars = VariableTable::new();
        assert!(matches!(parse("sin()", &mut vars), Err(Error::Syntax { .. })));
        assert!(matches!(
            parse("log(2)", &mut vars),
            Err(Error::Syntax { .. })
        ));
    }

    #[test]
    fn t_empty_input() {
        let mut vars = VariableTable::new();
        assert!(matches!(parse("", &mut vars), Err(Error::Syntax { .. })));
        assert!(matches!(parse("   ", &mut vars), Err(Error::Syntax { .. })));
    }

    #[test]
    fn t_name_over_limit_is_rejected() {
        let mut vars = VariableTable::new();
        assert!(matches!(
            parse("extraordinarily_long_name+1", &mut vars),
            Err(Error::NameTooLong(_))
        ));
    }
}
