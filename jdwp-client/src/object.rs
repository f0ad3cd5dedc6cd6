// ObjectReference command set: type lookup, field reads, instance invocation

use crate::classtype::InvokeResult;
use crate::commands::{command_sets, object_reference_commands};
use crate::connection::JdwpConnection;
use crate::protocol::{CommandPacket, JdwpResult};
use crate::reader::{read_i32, read_tagged_object, read_u64, read_u8, read_value};
use crate::types::{ClassId, FieldId, MethodId, ObjectId, ReferenceTypeId, ThreadId, Value};
use bytes::BufMut;

impl JdwpConnection {
    /// ObjectReference.ReferenceType: runtime type of an object.
    ///
    /// Fails with INVALID_OBJECT when the id no longer names a live object;
    /// callers use that as the staleness probe for cached ids.
    pub async fn get_object_reference_type(
        &mut self,
        object_id: ObjectId,
    ) -> JdwpResult<ReferenceTypeId> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::OBJECT_REFERENCE,
            object_reference_commands::REFERENCE_TYPE,
        );
        packet.data.put_u64(object_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        let _type_tag = read_u8(&mut data)?;
        read_u64(&mut data)
    }

    /// ObjectReference.GetValues: instance field values.
    pub async fn get_object_values(
        &mut self,
        object_id: ObjectId,
        field_ids: &[FieldId],
    ) -> JdwpResult<Vec<Value>> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::OBJECT_REFERENCE,
            object_reference_commands::GET_VALUES,
        );

        packet.data.put_u64(object_id);
        packet.data.put_i32(field_ids.len() as i32);
        for field_id in field_ids {
            packet.data.put_u64(*field_id);
        }

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        let count = read_i32(&mut data)?;
        let mut values = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            values.push(read_value(&mut data)?);
        }

        Ok(values)
    }

    /// ObjectReference.InvokeMethod: invoke an instance method.
    ///
    /// `class_id` is the type declaring the method (found by walking the
    /// superclass chain); the thread must be suspended by an event.
    #[allow(clippy::too_many_arguments)]
    pub async fn invoke_instance(
        &mut self,
        object_id: ObjectId,
        thread_id: ThreadId,
        class_id: ClassId,
        method_id: MethodId,
        args: &[Value],
        options: i32,
    ) -> JdwpResult<InvokeResult> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::OBJECT_REFERENCE,
            object_reference_commands::INVOKE_METHOD,
        );

        packet.data.put_u64(object_id);
        packet.data.put_u64(thread_id);
        packet.data.put_u64(class_id);
        packet.data.put_u64(method_id);
        packet.data.put_i32(args.len() as i32);
        for arg in args {
            arg.write(&mut packet.data);
        }
        packet.data.put_i32(options);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        let value = read_value(&mut data)?;
        let exception = read_tagged_object(&mut data)?;

        Ok(InvokeResult { value, exception })
    }
}
