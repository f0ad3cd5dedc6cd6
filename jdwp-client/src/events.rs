// JDWP composite event packets
//
// The VM pushes these without a request id of our own; the event loop parses
// and broadcasts them on a channel.

use crate::commands::event_kinds;
use crate::protocol::{JdwpError, JdwpResult};
use crate::reader::{read_i32, read_location, read_string, read_tagged_object, read_u64, read_u8};
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSet {
    pub suspend_policy: u8,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub request_id: i32,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventKind {
    VmStart {
        thread: ThreadId,
    },
    VmDeath,
    ThreadStart {
        thread: ThreadId,
    },
    ThreadDeath {
        thread: ThreadId,
    },
    ClassPrepare {
        thread: ThreadId,
        ref_type: ReferenceTypeId,
        signature: String,
        status: i32,
    },
    ClassUnload {
        signature: String,
    },
    Breakpoint {
        thread: ThreadId,
        location: Location,
    },
    Step {
        thread: ThreadId,
        location: Location,
    },
    Exception {
        thread: ThreadId,
        location: Location,
        exception: ObjectId,
        catch_location: Option<Location>,
    },
    MethodEntry {
        thread: ThreadId,
        location: Location,
    },
    MethodExit {
        thread: ThreadId,
        location: Location,
    },
}

/// Parse the body of an Event.Composite packet (after the 11-byte header).
pub fn parse_event_packet(mut buf: &[u8]) -> JdwpResult<EventSet> {
    let buf = &mut buf;
    let suspend_policy = read_u8(buf)?;
    let count = read_i32(buf)?;

    let mut events = Vec::with_capacity(count.max(0) as usize);
    for _ in 0..count {
        let kind_byte = read_u8(buf)?;
        let request_id = read_i32(buf)?;

        let kind = match kind_byte {
            event_kinds::VM_START => EventKind::VmStart {
                thread: read_u64(buf)?,
            },
            event_kinds::VM_DEATH => EventKind::VmDeath,
            event_kinds::THREAD_START => EventKind::ThreadStart {
                thread: read_u64(buf)?,
            },
            event_kinds::THREAD_DEATH => EventKind::ThreadDeath {
                thread: read_u64(buf)?,
            },
            event_kinds::CLASS_PREPARE => {
                let thread = read_u64(buf)?;
                let _ref_type_tag = read_u8(buf)?;
                let ref_type = read_u64(buf)?;
                let signature = read_string(buf)?;
                let status = read_i32(buf)?;
                EventKind::ClassPrepare {
                    thread,
                    ref_type,
                    signature,
                    status,
                }
            }
            event_kinds::CLASS_UNLOAD => EventKind::ClassUnload {
                signature: read_string(buf)?,
            },
            event_kinds::BREAKPOINT => EventKind::Breakpoint {
                thread: read_u64(buf)?,
                location: read_location(buf)?,
            },
            event_kinds::SINGLE_STEP => EventKind::Step {
                thread: read_u64(buf)?,
                location: read_location(buf)?,
            },
            event_kinds::EXCEPTION => {
                let thread = read_u64(buf)?;
                let location = read_location(buf)?;
                let exception = read_tagged_object(buf)?;
                let catch_location = read_location(buf)?;
                // A zero class id means the exception is uncaught
                let catch_location = if catch_location.class_id == 0 {
                    None
                } else {
                    Some(catch_location)
                };
                EventKind::Exception {
                    thread,
                    location,
                    exception,
                    catch_location,
                }
            }
            event_kinds::METHOD_ENTRY => EventKind::MethodEntry {
                thread: read_u64(buf)?,
                location: read_location(buf)?,
            },
            event_kinds::METHOD_EXIT => EventKind::MethodExit {
                thread: read_u64(buf)?,
                location: read_location(buf)?,
            },
            other => {
                // Unknown kinds cannot be skipped: their body length is
                // unknown, so the rest of the packet is unreadable.
                return Err(JdwpError::Protocol(format!(
                    "Unsupported event kind: {}",
                    other
                )));
            }
        };

        events.push(Event { request_id, kind });
    }

    Ok(EventSet {
        suspend_policy,
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BufMut;

    fn put_location(buf: &mut Vec<u8>, class_id: u64, method_id: u64, index: u64) {
        buf.put_u8(1);
        buf.put_u64(class_id);
        buf.put_u64(method_id);
        buf.put_u64(index);
    }

    #[test]
    fn parse_breakpoint_event() {
        let mut body = Vec::new();
        body.put_u8(2); // suspend all
        body.put_i32(1); // one event
        body.put_u8(event_kinds::BREAKPOINT);
        body.put_i32(17); // request id
        body.put_u64(0x99); // thread
        put_location(&mut body, 0x10, 0x20, 5);

        let set = parse_event_packet(&body).unwrap();
        assert_eq!(set.suspend_policy, 2);
        assert_eq!(set.events.len(), 1);
        assert_eq!(set.events[0].request_id, 17);
        match &set.events[0].kind {
            EventKind::Breakpoint { thread, location } => {
                assert_eq!(*thread, 0x99);
                assert_eq!(location.class_id, 0x10);
                assert_eq!(location.index, 5);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn parse_class_prepare_event() {
        let mut body = Vec::new();
        body.put_u8(0);
        body.put_i32(1);
        body.put_u8(event_kinds::CLASS_PREPARE);
        body.put_i32(3);
        body.put_u64(0x7); // thread
        body.put_u8(1); // refTypeTag
        body.put_u64(0x42);
        let sig = b"Ldemo/C;";
        body.put_u32(sig.len() as u32);
        body.extend_from_slice(sig);
        body.put_i32(7); // status

        let set = parse_event_packet(&body).unwrap();
        match &set.events[0].kind {
            EventKind::ClassPrepare {
                ref_type,
                signature,
                ..
            } => {
                assert_eq!(*ref_type, 0x42);
                assert_eq!(signature, "Ldemo/C;");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn uncaught_exception_has_no_catch_location() {
        let mut body = Vec::new();
        body.put_u8(1);
        body.put_i32(1);
        body.put_u8(event_kinds::EXCEPTION);
        body.put_i32(9);
        body.put_u64(0x5); // thread
        put_location(&mut body, 0x10, 0x20, 3); // throw site
        body.put_u8(b'L');
        body.put_u64(0xAB); // exception object
        put_location(&mut body, 0, 0, 0); // no catch site

        let set = parse_event_packet(&body).unwrap();
        match &set.events[0].kind {
            EventKind::Exception {
                exception,
                catch_location,
                ..
            } => {
                assert_eq!(*exception, 0xAB);
                assert!(catch_location.is_none());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
