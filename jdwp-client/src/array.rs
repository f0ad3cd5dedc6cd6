// ArrayType and ArrayReference command sets

use crate::commands::{array_reference_commands, array_type_commands, command_sets};
use crate::connection::JdwpConnection;
use crate::protocol::{CommandPacket, JdwpResult};
use crate::reader::{read_i32, read_tagged_object, read_u8, read_untagged, read_value};
use crate::types::{tags, ArrayId, ReferenceTypeId, Value};
use bytes::BufMut;

fn is_primitive_tag(tag: u8) -> bool {
    !matches!(
        tag,
        tags::OBJECT
            | tags::STRING
            | tags::THREAD
            | tags::THREAD_GROUP
            | tags::CLASS_LOADER
            | tags::CLASS_OBJECT
            | tags::ARRAY
    )
}

impl JdwpConnection {
    /// ArrayType.NewInstance: allocate an array in the target.
    pub async fn new_array_instance(
        &mut self,
        array_type_id: ReferenceTypeId,
        length: i32,
    ) -> JdwpResult<ArrayId> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::ARRAY_TYPE,
            array_type_commands::NEW_INSTANCE,
        );
        packet.data.put_u64(array_type_id);
        packet.data.put_i32(length);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        read_tagged_object(&mut data)
    }

    /// ArrayReference.Length.
    pub async fn get_array_length(&mut self, array_id: ArrayId) -> JdwpResult<i32> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::ARRAY_REFERENCE,
            array_reference_commands::LENGTH,
        );
        packet.data.put_u64(array_id);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        read_i32(&mut data)
    }

    /// ArrayReference.GetValues: a slice of the array.
    ///
    /// The reply is an "array region": primitive regions carry untagged
    /// values sized by the region tag, object regions carry tagged values.
    pub async fn get_array_values(
        &mut self,
        array_id: ArrayId,
        first_index: i32,
        length: i32,
    ) -> JdwpResult<Vec<Value>> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::ARRAY_REFERENCE,
            array_reference_commands::GET_VALUES,
        );
        packet.data.put_u64(array_id);
        packet.data.put_i32(first_index);
        packet.data.put_i32(length);

        let reply = self.send_command(packet).await?;
        reply.check_error()?;

        let mut data = reply.data();
        let region_tag = read_u8(&mut data)?;
        let count = read_i32(&mut data)?;

        let mut values = Vec::with_capacity(count.max(0) as usize);
        if is_primitive_tag(region_tag) {
            for _ in 0..count {
                let value_data = read_untagged(region_tag, &mut data)?;
                values.push(Value {
                    tag: region_tag,
                    data: value_data,
                });
            }
        } else {
            for _ in 0..count {
                values.push(read_value(&mut data)?);
            }
        }

        Ok(values)
    }

    /// ArrayReference.SetValues for a `byte[]`: used to mirror bytecode
    /// into the target before defining a class.
    pub async fn set_byte_array_values(
        &mut self,
        array_id: ArrayId,
        first_index: i32,
        bytes: &[u8],
    ) -> JdwpResult<()> {
        let id = self.next_id();
        let mut packet = CommandPacket::new(
            id,
            command_sets::ARRAY_REFERENCE,
            array_reference_commands::SET_VALUES,
        );
        packet.data.put_u64(array_id);
        packet.data.put_i32(first_index);
        packet.data.put_i32(bytes.len() as i32);
        // Untagged byte values: one wire byte each
        packet.data.extend_from_slice(bytes);

        self.send_command(packet).await?.check_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_tags_are_untagged_in_regions() {
        assert!(is_primitive_tag(tags::BYTE));
        assert!(is_primitive_tag(tags::INT));
        assert!(is_primitive_tag(tags::BOOLEAN));
        assert!(!is_primitive_tag(tags::OBJECT));
        assert!(!is_primitive_tag(tags::STRING));
        assert!(!is_primitive_tag(tags::ARRAY));
    }
}
