// ClassType command set: superclass traversal and static invocation

use crate::commands::{class_type_commands, command_sets};
use crate::connection::JdwpConnection;
use crate::protocol::{CommandPacket, JdwpResult};
use crate::reader::{read_tagged_object, read_value};
use crate::types::{ClassId, MethodId, ObjectId, ThreadId, Value};
use bytes::BufMut;

/// Outcome of a remote method invocation: the returned value plus the
/// exception object thrown inside the target (zero when none was thrown).
#[derive(Debug, Clone)]
pub struct InvokeResult {
    pub value: Value,
    pub exception: ObjectId,
}

impl InvokeResult {
    pub fn threw(&self) -> bool {
        self.exception != 0
    }
}

impl JdwpConnection {
    /// ClassType.Superclass: zero for `java.lang.Object`.
    pub async fn get_superclass(&mut self, class_id: ClassId) -> JdwpResult<ClassId> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::CLASS_TYPE,
            class_type_commands::SUPERCLASS,
        );
        packet.data.put_u64(class_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        crate::reader::read_u64(&mut data)
    }

    /// ClassType.InvokeMethod: invoke a static method on the given thread.
    ///
    /// The thread must be suspended by an event; `options` is normally
    /// `invoke_options::SINGLE_THREADED` so no other target thread runs.
    pub async fn invoke_static(
        &mut self,
        class_id: ClassId,
        thread_id: ThreadId,
        method_id: MethodId,
        args: &[Value],
        options: i32,
    ) -> JdwpResult<InvokeResult> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::CLASS_TYPE,
            class_type_commands::INVOKE_METHOD,
        );

        packet.data.put_u64(class_id);
        packet.data.put_u64(thread_id);
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
