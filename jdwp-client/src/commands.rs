// JDWP command set and command identifiers
//
// Only the sets this client speaks are listed. Numbers come straight from the
// protocol specification and must not be reordered.

pub mod command_sets {
    pub const VIRTUAL_MACHINE: u8 = 1;
    pub const REFERENCE_TYPE: u8 = 2;
    pub const CLASS_TYPE: u8 = 3;
    pub const ARRAY_TYPE: u8 = 4;
    pub const METHOD: u8 = 6;
    pub const OBJECT_REFERENCE: u8 = 9;
    pub const STRING_REFERENCE: u8 = 10;
    pub const THREAD_REFERENCE: u8 = 11;
    pub const ARRAY_REFERENCE: u8 = 13;
    pub const EVENT_REQUEST: u8 = 15;
    pub const STACK_FRAME: u8 = 16;
    pub const CLASS_OBJECT_REFERENCE: u8 = 17;
}

// VirtualMachine (set 1)
//
// Dispose (6) is intentionally not exposed by this client: the upstream
// multiplexing proxy interprets Dispose as killing the shared session.
pub mod vm_commands {
    pub const VERSION: u8 = 1;
    pub const CLASSES_BY_SIGNATURE: u8 = 2;
    pub const ALL_THREADS: u8 = 4;
    pub const ID_SIZES: u8 = 7;
    pub const SUSPEND: u8 = 8;
    pub const RESUME: u8 = 9;
    pub const CREATE_STRING: u8 = 11;
}

// ReferenceType (set 2)
pub mod reference_type_commands {
    pub const SIGNATURE: u8 = 1;
    pub const CLASS_LOADER: u8 = 2;
    pub const FIELDS: u8 = 4;
    pub const METHODS: u8 = 5;
    pub const SOURCE_FILE: u8 = 7;
}

// ClassType (set 3)
pub mod class_type_commands {
    pub const SUPERCLASS: u8 = 1;
    pub const INVOKE_METHOD: u8 = 3;
}

// ArrayType (set 4)
pub mod array_type_commands {
    pub const NEW_INSTANCE: u8 = 1;
}

// Method (set 6)
pub mod method_commands {
    pub const LINE_TABLE: u8 = 1;
    pub const VARIABLE_TABLE: u8 = 2;
}

// ObjectReference (set 9)
pub mod object_reference_commands {
    pub const REFERENCE_TYPE: u8 = 1;
    pub const GET_VALUES: u8 = 2;
    pub const INVOKE_METHOD: u8 = 6;
}

// StringReference (set 10)
pub mod string_reference_commands {
    pub const VALUE: u8 = 1;
}

// ThreadReference (set 11)
pub mod thread_commands {
    pub const NAME: u8 = 1;
    pub const RESUME: u8 = 3;
    pub const STATUS: u8 = 4;
    pub const FRAMES: u8 = 6;
    pub const FRAME_COUNT: u8 = 7;
}

// ArrayReference (set 13)
pub mod array_reference_commands {
    pub const LENGTH: u8 = 1;
    pub const GET_VALUES: u8 = 2;
    pub const SET_VALUES: u8 = 3;
}

// EventRequest (set 15)
pub mod event_request_commands {
    pub const SET: u8 = 1;
    pub const CLEAR: u8 = 2;
    pub const CLEAR_ALL_BREAKPOINTS: u8 = 3;
}

// StackFrame (set 16)
pub mod stack_frame_commands {
    pub const GET_VALUES: u8 = 1;
    pub const THIS_OBJECT: u8 = 3;
}

// ClassObjectReference (set 17)
pub mod class_object_commands {
    pub const REFLECTED_TYPE: u8 = 1;
}

// Event kinds (EventRequest.Set and composite event packets)
pub mod event_kinds {
    pub const SINGLE_STEP: u8 = 1;
    pub const BREAKPOINT: u8 = 2;
    pub const EXCEPTION: u8 = 4;
    pub const THREAD_START: u8 = 6;
    pub const THREAD_DEATH: u8 = 7;
    pub const CLASS_PREPARE: u8 = 8;
    pub const CLASS_UNLOAD: u8 = 9;
    pub const METHOD_ENTRY: u8 = 40;
    pub const METHOD_EXIT: u8 = 41;
    pub const VM_START: u8 = 90;
    pub const VM_DEATH: u8 = 99;
}

// EventRequest.Set modifier kinds
pub mod modifier_kinds {
    pub const COUNT: u8 = 1;
    pub const LOCATION_ONLY: u8 = 7;
    pub const STEP: u8 = 10;
}

// Step request granularity
pub mod step_sizes {
    pub const MIN: i32 = 0;
    pub const LINE: i32 = 1;
}

// Step request depth
pub mod step_depths {
    pub const INTO: i32 = 0;
    pub const OVER: i32 = 1;
    pub const OUT: i32 = 2;
}

// Method invocation options
pub mod invoke_options {
    /// Only the nominated thread runs while the invocation executes.
    pub const SINGLE_THREADED: i32 = 0x01;
}

// Access modifier bits (ReferenceType.Methods / Fields modBits)
pub mod modifiers {
    pub const STATIC: i32 = 0x0008;
}
