use crate::{
    error::Error,
    latex,
    tree::{NodeId, Tree},
    vars::VariableTable,
};
use std::io::Write;

/**
Holds everything that spans one parsing and differentiation session: the
variable table, and optionally a TeX sink that receives the rendered
derivation steps. The step counter lives here rather than in any global
state, so independent sessions number their output independently.
*/
pub struct Context {
    pub vars: VariableTable,
    sink: Option<Box<dyn Write>>,
    step_count: u32,
}

impl Context {
    pub fn new() -> Context {
        Context {
            vars: VariableTable::new(),
            sink: None,
            step_count: 0,
        }
    }

    /// Attach a TeX sink and write the document preamble to it. Attaching a
    /// second sink to a context that already has one is an error.
    pub fn attach_sink(&mut self, mut sink: Box<dyn Write>) -> Result<(), Error> {
        if self.sink.is_some() {
            return Err(Error::Reinitialization);
        }
        latex::document_header(sink.as_mut()).map_err(io_error)?;
        self.step_count = 0;
        self.sink = Some(sink);
        Ok(())
    }

    /// Write the document footer and release the sink. A context without a
    /// sink finishes trivially.
    pub fn finish(&mut self) -> Result<(), Error> {
        if let Some(mut sink) = self.sink.take() {
            latex::document_footer(sink.as_mut()).map_err(io_error)?;
            sink.flush().map_err(io_error)?;
        }
        Ok(())
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    pub(crate) fn write_heading(&mut self, tree: &Tree) -> Result<(), Error> {
        let formula = latex::tex_formula(tree, &self.vars)?;
        if let Some(sink) = self.sink.as_mut() {
            latex::write_heading(sink.as_mut(), &formula).map_err(io_error)?;
        }
        Ok(())
    }

    pub(crate) fn write_step(
        &mut self,
        var: &str,
        before: (&Tree, NodeId),
        after: (&Tree, NodeId),
    ) -> Result<(), Error> {
        let before_tex = latex::tex_fragment(before.0, before.1, &self.vars, true, true)?;
        let after_tex = latex::tex_fragment(after.0, after.1, &self.vars, false, true)?;
        self.step_count += 1;
        if let Some(sink) = self.sink.as_mut() {
            latex::write_step(sink.as_mut(), self.step_count, var, &before_tex, &after_tex)
                .map_err(io_error)?;
        }
        Ok(())
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

fn io_error(err: std::io::Error) -> Error {
    Error::Io(err.to_string())
}
