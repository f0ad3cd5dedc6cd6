// ReferenceType command set: classes, interfaces, arrays

use crate::commands::{command_sets, modifiers, reference_type_commands};
use crate::connection::JdwpConnection;
use crate::protocol::{CommandPacket, JdwpResult};
use crate::reader::{read_i32, read_string, read_u64};
use crate::types::{signature_to_name, ClassLoaderId, FieldId, MethodId, ReferenceTypeId};
use bytes::BufMut;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodInfo {
    pub method_id: MethodId,
    pub name: String,
    pub signature: String,
    pub mod_bits: i32,
}

impl MethodInfo {
    pub fn is_static(&self) -> bool {
        self.mod_bits & modifiers::STATIC != 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInfo {
    pub field_id: FieldId,
    pub name: String,
    pub signature: String,
    pub mod_bits: i32,
}

impl FieldInfo {
    pub fn is_static(&self) -> bool {
        self.mod_bits & modifiers::STATIC != 0
    }

    /// Source-level name of the field's declared type.
    pub fn type_name(&self) -> String {
        signature_to_name(&self.signature)
    }
}

impl JdwpConnection {
    /// ReferenceType.Signature: JNI signature of a type.
    pub async fn get_signature(&mut self, ref_type_id: ReferenceTypeId) -> JdwpResult<String> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::REFERENCE_TYPE,
            reference_type_commands::SIGNATURE,
        );
        packet.data.put_u64(ref_type_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        read_string(&mut data)
    }

    /// Source-level name of a reference type (`java.util.List`, `int[]`).
    pub async fn get_type_name(&mut self, ref_type_id: ReferenceTypeId) -> JdwpResult<String> {
        let signature = self.get_signature(ref_type_id).await?;
        Ok(signature_to_name(&signature))
    }

    /// ReferenceType.ClassLoader: the loader that defined this type.
    /// Zero means the bootstrap loader.
    pub async fn get_class_loader(
        &mut self,
        ref_type_id: ReferenceTypeId,
    ) -> JdwpResult<ClassLoaderId> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::REFERENCE_TYPE,
            reference_type_commands::CLASS_LOADER,
        );
        packet.data.put_u64(ref_type_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        read_u64(&mut data)
    }

    /// ReferenceType.Methods: declared (not inherited) methods.
    pub async fn get_methods(&mut self, ref_type_id: ReferenceTypeId) -> JdwpResult<Vec<MethodInfo>> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::REFERENCE_TYPE,
            reference_type_commands::METHODS,
        );
        packet.data.put_u64(ref_type_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        let count = read_i32(&mut data)?;
        let mut methods = Vec::with_capacity(count.max(0) as usize);

        for _ in 0..count {
            methods.push(MethodInfo {
                method_id: read_u64(&mut data)?,
                name: read_string(&mut data)?,
                signature: read_string(&mut data)?,
                mod_bits: read_i32(&mut data)?,
            });
        }

        Ok(methods)
    }

    /// ReferenceType.Fields: declared (not inherited) fields.
    pub async fn get_fields(&mut self, ref_type_id: ReferenceTypeId) -> JdwpResult<Vec<FieldInfo>> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::REFERENCE_TYPE,
            reference_type_commands::FIELDS,
        );
        packet.data.put_u64(ref_type_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        let count = read_i32(&mut data)?;
        let mut fields = Vec::with_capacity(count.max(0) as usize);

        for _ in 0..count {
            fields.push(FieldInfo {
                field_id: read_u64(&mut data)?,
                name: read_string(&mut data)?,
                signature: read_string(&mut data)?,
                mod_bits: read_i32(&mut data)?,
            });
        }

        Ok(fields)
    }

    /// ReferenceType.SourceFile: fails with ABSENT_INFORMATION when the
    /// class was compiled without debug info.
    pub async fn get_source_file(&mut self, ref_type_id: ReferenceTypeId) -> JdwpResult<String> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::REFERENCE_TYPE,
            reference_type_commands::SOURCE_FILE,
        );
        packet.data.put_u64(ref_type_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        read_string(&mut data)
    }
}
