// StringReference and ClassObjectReference command sets

use crate::commands::{class_object_commands, command_sets, string_reference_commands};
use crate::connection::JdwpConnection;
use crate::protocol::{CommandPacket, JdwpResult};
use crate::reader::{read_string, read_u64, read_u8};
use crate::types::{ClassObjectId, ObjectId, ReferenceTypeId};
use bytes::BufMut;

impl JdwpConnection {
    /// StringReference.Value: contents of a remote String.
    pub async fn get_string_value(&mut self, string_id: ObjectId) -> JdwpResult<String> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::STRING_REFERENCE,
            string_reference_commands::VALUE,
        );
        packet.data.put_u64(string_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        read_string(&mut data)
    }

    /// ClassObjectReference.ReflectedType: the reference type mirrored by a
    /// `java.lang.Class` instance (e.g. the result of `defineClass`).
    pub async fn get_reflected_type(
        &mut self,
        class_object_id: ClassObjectId,
    ) -> JdwpResult<ReferenceTypeId> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::CLASS_OBJECT_REFERENCE,
            class_object_commands::REFLECTED_TYPE,
        );
        packet.data.put_u64(class_object_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        let _ref_type_tag = read_u8(&mut data)?;
        read_u64(&mut data)
    }
}
