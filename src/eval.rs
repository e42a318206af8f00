use crate::{
    error::Error,
    tree::{NodeId, Payload, Tree},
    vars::VariableTable,
};

const SNIPPET_LEN: usize = 10;

/**
Evaluate an arithmetic formula directly from its text, without building a
tree. Supports the minimal grammar only: integer literals, `+ - * /` and
parentheses.
*/
pub fn evaluate(text: &str) -> Result<f64, Error> {
    let mut calc = Calculator {
        text,
        buf: text.as_bytes(),
        pos: 0,
    };
    let value = calc.expression()?;
    calc.skip_whitespace();
    if calc.pos < calc.buf.len() {
        return Err(calc.syntax_error("illegal character at the end of the expression"));
    }
    Ok(value)
}

struct Calculator<'a> {
    text: &'a str,
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Calculator<'a> {
    fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn syntax_error(&self, message: &'static str) -> Error {
        let end = usize::min(self.pos + SNIPPET_LEN, self.text.len());
        Error::Syntax {
            offset: self.pos,
            message,
            snippet: String::from_utf8_lossy(&self.buf[self.pos..end]).into_owned(),
        }
    }

    fn expression(&mut self) -> Result<f64, Error> {
        self.skip_whitespace();
        let mut value = self.term()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'+') => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some(b'-') => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, Error> {
        self.skip_whitespace();
        let mut value = self.primary()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'*') => {
                    self.pos += 1;
                    value *= self.primary()?;
                }
                Some(b'/') => {
                    self.pos += 1;
                    value /= self.primary()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn primary(&mut self) -> Result<f64, Error> {
        self.skip_whitespace();
        if self.peek() == Some(b'(') {
            self.pos += 1;
            let value = self.expression()?;
            self.skip_whitespace();
            if self.peek() != Some(b')') {
                return Err(
                    self.syntax_error("illegal character at the end of a primary expression")
                );
            }
            self.pos += 1;
            return Ok(value);
        }
        self.number()
    }

    fn number(&mut self) -> Result<f64, Error> {
        self.skip_whitespace();
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
        Ok(value)
    }
}

impl Tree {
    /// Evaluate the tree numerically with the variable values bound in
    /// `vars`. A variable that was never assigned a value is an error.
    pub fn eval(&self, vars: &VariableTable) -> Result<f64, Error> {
        match self.root() {
            Some(root) => self.eval_node(root, vars),
            None => Err(Error::EmptyTree),
        }
    }

    fn eval_node(&self, id: NodeId, vars: &VariableTable) -> Result<f64, Error> {
        let node = self.node(id);
        match node.payload() {
            Payload::Number(value) => Ok(value),
            Payload::Variable(var) => {
                let record = vars
                    .get(var)
                    .ok_or_else(|| Error::UnknownVariable(format!("#{var}")))?;
                if record.value().is_nan() {
                    return Err(Error::UnboundVariable(record.name().to_string()));
                }
                Ok(record.value())
            }
            Payload::Operator(op) => match (node.left(), node.right()) {
                (Some(left), Some(right)) => Ok(op.apply(
                    self.eval_node(left, vars)?,
                    self.eval_node(right, vars)?,
                )),
                (None, Some(right)) => Ok(op.apply(self.eval_node(right, vars)?, f64::NAN)),
                _ => Err(Error::InvalidArgument),
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{assert_float_eq, parse::parse};

    #[test]
    fn t_calculator() {
        assert_float_eq!(evaluate("2+3*4").unwrap(), 14.0);
        assert_float_eq!(evaluate("(2+3)*4").unwrap(), 20.0);
        assert_float_eq!(evaluate("100/4/5").unwrap(), 5.0);
        assert_float_eq!(evaluate(" 1 + 2 ").unwrap(), 3.0);
    }

    #[test]
    fn t_calculator_nested_scenario() {
        assert_float_eq!(evaluate("10*7-(5+6*7-(10-40*10))").unwrap(), -367.0);
    }

    #[test]
    fn t_calculator_rejects_garbage() {
        assert!(matches!(evaluate("2+"), Err(Error::Syntax { .. })));
        assert!(matches!(evaluate("(2+3"), Err(Error::Syntax { .. })));
        assert!(matches!(evaluate("2+3)"), Err(Error::Syntax { .. })));
    }

    #[test]
    fn t_tree_eval() {
        let mut vars = VariableTable::new();
        let tree = parse("x^2+sin(y)", &mut vars).unwrap();
        vars.set_value("x", 3.0).unwrap();
        vars.set_value("y", 0.0).unwrap();
        assert_float_eq!(tree.eval(&vars).unwrap(), 9.0);
        vars.set_value("y", std::f64::consts::FRAC_PI_2).unwrap();
        assert_float_eq!(tree.eval(&vars).unwrap(), 10.0);
    }

    #[test]
    fn t_tree_eval_log_base() {
        let mut vars = VariableTable::new();
        let tree = parse("log(2, x)", &mut vars).unwrap();
        vars.set_value("x", 8.0).unwrap();
        assert_float_eq!(tree.eval(&vars).unwrap(), 3.0, 1e-15);
    }

    #[test]
    fn t_unbound_variable() {
        let mut vars = VariableTable::new();
        let tree = parse("x+1", &mut vars).unwrap();
        assert_eq!(
            tree.eval(&vars),
            Err(Error::UnboundVariable("x".to_string()))
        );
    }

    #[test]
    fn t_empty_tree() {
        let vars = VariableTable::new();
        assert_eq!(Tree::new().eval(&vars), Err(Error::EmptyTree));
    }
}
