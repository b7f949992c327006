//! Console rendering for `show helper`

use std::io::{self, Write};

use netsh_helper_api::HelperId;

/// Indentation stops growing past this depth
pub const MAX_INDENT_DEPTH: usize = 10;

const HEADER: &str = "Helper GUID                             DLL Name          Command";
const RULE: &str = "--------------------------------------  ----------------  --------";

/// One formatted row: id, library short name, indented context name
pub fn format_row(id: &HelperId, dll_name: &str, depth: usize, context: &str) -> String {
    let indent = " ".repeat(depth.min(MAX_INDENT_DEPTH) * 2);
    format!("{id}  {dll_name:<16}  {indent}{context}")
}

/// Writes the helper table to an output stream
pub struct HelperTable<'a> {
    out: &'a mut dyn Write,
}

impl<'a> HelperTable<'a> {
    pub fn new(out: &'a mut dyn Write) -> Self {
        Self { out }
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        writeln!(self.out, "{HEADER}")?;
        writeln!(self.out, "{RULE}")
    }

    pub fn write_row(
        &mut self,
        id: &HelperId,
        dll_name: &str,
        depth: usize,
        context: &str,
    ) -> io::Result<()> {
        writeln!(self.out, "{}", format_row(id, dll_name, depth, context))
    }
}
