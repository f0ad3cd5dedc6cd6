// EventRequest command set: breakpoints and single-shot step requests

use crate::commands::{
    command_sets, event_kinds, event_request_commands, modifier_kinds,
};
use crate::connection::JdwpConnection;
use crate::protocol::{CommandPacket, JdwpResult};
use crate::reader::read_i32;
use crate::types::{MethodId, ReferenceTypeId, ThreadId};
use bytes::BufMut;

#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum SuspendPolicy {
    None = 0,
    EventThread = 1,
    All = 2,
}

impl JdwpConnection {
    /// EventRequest.Set for a breakpoint at a resolved location.
    /// Returns the request id assigned by the target.
    pub async fn set_breakpoint(
        &mut self,
        class_id: ReferenceTypeId,
        method_id: MethodId,
        bytecode_index: u64,
        suspend_policy: SuspendPolicy,
    ) -> JdwpResult<i32> {
        let id = self.next_id();
        let mut packet =
            CommandPacket::new(id, command_sets::EVENT_REQUEST, event_request_commands::SET);

        packet.data.put_u8(event_kinds::BREAKPOINT);
        packet.data.put_u8(suspend_policy as u8);

        // One modifier: LocationOnly
        packet.data.put_i32(1);
        packet.data.put_u8(modifier_kinds::LOCATION_ONLY);
        packet.data.put_u8(1); // type tag: class
        packet.data.put_u64(class_id);
        packet.data.put_u64(method_id);
        packet.data.put_u64(bytecode_index);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        read_i32(&mut data)
    }

    /// EventRequest.Set for a single-shot step on a suspended thread.
    ///
    /// Lifecycle: created -> enabled -> fired once (count filter 1) ->
    /// auto-disposed by the target.
    pub async fn set_step_request(
        &mut self,
        thread_id: ThreadId,
        size: i32,
        depth: i32,
        suspend_policy: SuspendPolicy,
    ) -> JdwpResult<i32> {
        let id = self.next_id();
        let mut packet =
            CommandPacket::new(id, command_sets::EVENT_REQUEST, event_request_commands::SET);

        packet.data.put_u8(event_kinds::SINGLE_STEP);
        packet.data.put_u8(suspend_policy as u8);

        packet.data.put_i32(2); // Step + Count
        packet.data.put_u8(modifier_kinds::STEP);
        packet.data.put_u64(thread_id);
        packet.data.put_i32(size);
        packet.data.put_i32(depth);
        packet.data.put_u8(modifier_kinds::COUNT);
        packet.data.put_i32(1);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        read_i32(&mut data)
    }

    /// EventRequest.Clear for a breakpoint request id.
    pub async fn clear_breakpoint(&mut self, request_id: i32) -> JdwpResult<()> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::EVENT_REQUEST,
            event_request_commands::CLEAR,
        );

        packet.data.put_u8(event_kinds::BREAKPOINT);
        packet.data.put_i32(request_id);

        self.send_command(packet).await?.check_error()
    }
}
