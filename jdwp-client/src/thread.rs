// ThreadReference command set

use crate::commands::{command_sets, thread_commands};
use crate::connection::JdwpConnection;
use crate::protocol::{CommandPacket, JdwpResult};
use crate::reader::{read_i32, read_location, read_string, read_u64};
use crate::types::{Frame, ThreadId, SUSPEND_STATUS_SUSPENDED};
use bytes::BufMut;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThreadStatus {
    pub thread_status: i32,
    pub suspend_status: i32,
}

impl ThreadStatus {
    pub fn is_suspended(&self) -> bool {
        self.suspend_status == SUSPEND_STATUS_SUSPENDED
    }
}

impl JdwpConnection {
    /// ThreadReference.Name.
    pub async fn get_thread_name(&mut self, thread_id: ThreadId) -> JdwpResult<String> {
        let id = self.next_id();
        let mut packet =
            CommandPacket::new(id, command_sets::THREAD_REFERENCE, thread_commands::NAME);
        packet.data.put_u64(thread_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        read_string(&mut data)
    }

    /// ThreadReference.Status: raw status code plus suspension flag.
    pub async fn get_thread_status(&mut self, thread_id: ThreadId) -> JdwpResult<ThreadStatus> {
        let id = self.next_id();
        let mut packet =
            CommandPacket::new(id, command_sets::THREAD_REFERENCE, thread_commands::STATUS);
        packet.data.put_u64(thread_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        Ok(ThreadStatus {
            thread_status: read_i32(&mut data)?,
            suspend_status: read_i32(&mut data)?,
        })
    }

    /// ThreadReference.FrameCount: requires the thread to be suspended.
    pub async fn get_frame_count(&mut self, thread_id: ThreadId) -> JdwpResult<i32> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::THREAD_REFERENCE,
            thread_commands::FRAME_COUNT,
        );
        packet.data.put_u64(thread_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        read_i32(&mut data)
    }

    /// ThreadReference.Frames. `length` of -1 fetches the whole stack.
    pub async fn get_frames(
        &mut self,
        thread_id: ThreadId,
        start_frame: i32,
        length: i32,
    ) -> JdwpResult<Vec<Frame>> {
        let id = self.next_id();
        let mut packet =
            CommandPacket::new(id, command_sets::THREAD_REFERENCE, thread_commands::FRAMES);
        packet.data.put_u64(thread_id);
        packet.data.put_i32(start_frame);
        packet.data.put_i32(length);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        let count = read_i32(&mut data)?;
        let mut frames = Vec::with_capacity(count.max(0) as usize);

        for _ in 0..count {
            let frame_id = read_u64(&mut data)?;
            let location = read_location(&mut data)?;
            frames.push(Frame { frame_id, location });
        }

        Ok(frames)
    }

    /// ThreadReference.Resume: decrements this thread's suspend count.
    pub async fn resume_thread(&mut self, thread_id: ThreadId) -> JdwpResult<()> {
        let id = self.next_id();
        let mut packet =
            CommandPacket::new(id, command_sets::THREAD_REFERENCE, thread_commands::RESUME);
        packet.data.put_u64(thread_id);

        self.send_command(packet).await?.check_error()
    }
}
