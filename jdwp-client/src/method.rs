// Method command set: line tables and variable tables

use crate::commands::{command_sets, method_commands};
use crate::connection::JdwpConnection;
use crate::protocol::{CommandPacket, JdwpResult};
use crate::reader::{read_i32, read_string, read_u32, read_u64};
use crate::types::{MethodId, ReferenceTypeId, Variable};
use bytes::BufMut;
use serde::{Deserialize, Serialize};

/// Maps one source line to its first bytecode index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineTableEntry {
    pub line_code_index: u64,
    pub line_number: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineTable {
    pub start: u64,
    pub end: u64,
    pub lines: Vec<LineTableEntry>,
}

impl LineTable {
    /// Source line active at a bytecode index: the entry with the largest
    /// code index not beyond it.
    pub fn line_at(&self, code_index: u64) -> Option<i32> {
        self.lines
            .iter()
            .filter(|e| e.line_code_index <= code_index)
            .max_by_key(|e| e.line_code_index)
            .map(|e| e.line_number)
    }

    /// First executable location on the given source line.
    pub fn index_of_line(&self, line: i32) -> Option<u64> {
        self.lines
            .iter()
            .find(|e| e.line_number == line)
            .map(|e| e.line_code_index)
    }
}

impl JdwpConnection {
    /// Method.LineTable.
    pub async fn get_line_table(
        &mut self,
        ref_type_id: ReferenceTypeId,
        method_id: MethodId,
    ) -> JdwpResult<LineTable> {
        let id = self.next_id();
        let mut packet =
            CommandPacket::new(id, command_sets::METHOD, method_commands::LINE_TABLE);
        packet.data.put_u64(ref_type_id);
        packet.data.put_u64(method_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        let start = read_u64(&mut data)?;
        let end = read_u64(&mut data)?;

        let count = read_i32(&mut data)?;
        let mut lines = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            lines.push(LineTableEntry {
                line_code_index: read_u64(&mut data)?,
                line_number: read_i32(&mut data)?,
            });
        }

        Ok(LineTable { start, end, lines })
    }

    /// Method.VariableTable: local variable slots with names and scopes.
    /// Fails with ABSENT_INFORMATION when compiled without `-g`.
    pub async fn get_variable_table(
        &mut self,
        ref_type_id: ReferenceTypeId,
        method_id: MethodId,
    ) -> JdwpResult<Vec<Variable>> {
        let id = self.next_id();
        let mut packet =
            CommandPacket::new(id, command_sets::METHOD, method_commands::VARIABLE_TABLE);
        packet.data.put_u64(ref_type_id);
        packet.data.put_u64(method_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        let _arg_count = read_i32(&mut data)?;

        let count = read_i32(&mut data)?;
        let mut variables = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            variables.push(Variable {
                code_index: read_u64(&mut data)?,
                name: read_string(&mut data)?,
                signature: read_string(&mut data)?,
                length: read_u32(&mut data)?,
                slot: read_u32(&mut data)?,
            });
        }

        Ok(variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LineTable {
        LineTable {
            start: 0,
            end: 30,
            lines: vec![
                LineTableEntry {
                    line_code_index: 0,
                    line_number: 10,
                },
                LineTableEntry {
                    line_code_index: 8,
                    line_number: 11,
                },
                LineTableEntry {
                    line_code_index: 20,
                    line_number: 13,
                },
            ],
        }
    }

    #[test]
    fn line_at_picks_the_closest_entry_at_or_before() {
        let t = table();
        assert_eq!(t.line_at(0), Some(10));
        assert_eq!(t.line_at(7), Some(10));
        assert_eq!(t.line_at(8), Some(11));
        assert_eq!(t.line_at(19), Some(11));
        assert_eq!(t.line_at(25), Some(13));
    }

    #[test]
    fn index_of_line_finds_first_location() {
        let t = table();
        assert_eq!(t.index_of_line(11), Some(8));
        assert_eq!(t.index_of_line(12), None);
    }
}
