// Tool schema definitions
//
// The tool surface is the union of session, inspection, control, discovery,
// evaluation and watcher operations.

use crate::protocol::Tool;
use serde_json::json;

pub fn get_tools() -> Vec<Tool> {
    vec![
        Tool {
            name: "debug.attach".to_string(),
            description: "Attach to the JDWP proxy in front of the target JVM".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "host": {
                        "type": "string",
                        "description": "Proxy host",
                        "default": "localhost"
                    },
                    "port": {
                        "type": "integer",
                        "description": "Proxy ingress port (defaults to the configured proxy port)"
                    }
                }
            }),
        },
        Tool {
            name: "debug.detach".to_string(),
            description: "Detach locally. Never sends the protocol Dispose command, which \
                          would kill the proxy session for every client"
                .to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        Tool {
            name: "debug.get_version".to_string(),
            description: "Get target VM name and version information".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        Tool {
            name: "debug.list_threads".to_string(),
            description: "List all threads with status, suspension flag and frame count"
                .to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        Tool {
            name: "debug.get_stack".to_string(),
            description: "Get the call stack of a suspended thread".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "thread_id": {
                        "type": "integer",
                        "description": "Thread unique ID"
                    }
                },
                "required": ["thread_id"]
            }),
        },
        Tool {
            name: "debug.get_locals".to_string(),
            description: "Get visible local variables of a frame, rendered".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "thread_id": {
                        "type": "integer",
                        "description": "Thread unique ID"
                    },
                    "frame_index": {
                        "type": "integer",
                        "description": "Frame index (0 = current frame)",
                        "default": 0
                    }
                },
                "required": ["thread_id"]
            }),
        },
        Tool {
            name: "debug.get_fields".to_string(),
            description: "Get fields of a cached object by its ID (from debug.get_locals). \
                          Arrays and known collections get element views"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "object_id": {
                        "type": "integer",
                        "description": "Object unique ID"
                    }
                },
                "required": ["object_id"]
            }),
        },
        Tool {
            name: "debug.resume".to_string(),
            description: "Resume execution of all threads".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        Tool {
            name: "debug.step_over".to_string(),
            description: "Step over the current line on a suspended thread".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "thread_id": { "type": "integer", "description": "Thread unique ID" }
                },
                "required": ["thread_id"]
            }),
        },
        Tool {
            name: "debug.step_into".to_string(),
            description: "Step into method calls on a suspended thread".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "thread_id": { "type": "integer", "description": "Thread unique ID" }
                },
                "required": ["thread_id"]
            }),
        },
        Tool {
            name: "debug.step_out".to_string(),
            description: "Step out of the current method on a suspended thread".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "thread_id": { "type": "integer", "description": "Thread unique ID" }
                },
                "required": ["thread_id"]
            }),
        },
        Tool {
            name: "debug.set_breakpoint".to_string(),
            description: "Set a breakpoint at a line in a loaded class".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "class_name": {
                        "type": "string",
                        "description": "Fully qualified class name (e.g. 'demo.OrderService')"
                    },
                    "line": { "type": "integer", "description": "Line number" }
                },
                "required": ["class_name", "line"]
            }),
        },
        Tool {
            name: "debug.clear_breakpoint".to_string(),
            description: "Remove all breakpoints at a class:line location".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "class_name": {
                        "type": "string",
                        "description": "Fully qualified class name"
                    },
                    "line": { "type": "integer", "description": "Line number" }
                },
                "required": ["class_name", "line"]
            }),
        },
        Tool {
            name: "debug.list_breakpoints".to_string(),
            description: "List all breakpoints from all connected debugger clients (via the \
                          proxy)"
                .to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        Tool {
            name: "debug.clear_breakpoint_by_id".to_string(),
            description: "Clear a breakpoint by its request ID (from debug.list_breakpoints)"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "request_id": {
                        "type": "integer",
                        "description": "Breakpoint request ID"
                    }
                },
                "required": ["request_id"]
            }),
        },
        Tool {
            name: "debug.clear_all_breakpoints".to_string(),
            description: "Clear every breakpoint from every client".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        Tool {
            name: "debug.get_current_thread".to_string(),
            description: "Get the thread most recently paused at a breakpoint (via the proxy)"
                .to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        Tool {
            name: "debug.get_events".to_string(),
            description: "Get recent protocol events (breakpoints, steps, exceptions)"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "count": {
                        "type": "integer",
                        "description": "Number of recent events (default 20, max 100)",
                        "default": 20
                    }
                }
            }),
        },
        Tool {
            name: "debug.clear_events".to_string(),
            description: "Clear the event history".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        Tool {
            name: "debug.evaluate".to_string(),
            description: "Evaluate a Java expression in the context of a suspended frame. \
                          Compiles in-memory against the discovered classpath and runs \
                          inside the target VM"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "thread_id": {
                        "type": "integer",
                        "description": "Thread unique ID (must be suspended at a breakpoint)"
                    },
                    "frame_index": {
                        "type": "integer",
                        "description": "Frame index (0 = current frame)",
                        "default": 0
                    },
                    "expression": {
                        "type": "string",
                        "description": "Java expression (e.g. 'entity.getId()', 'items.size()')"
                    }
                },
                "required": ["thread_id", "expression"]
            }),
        },
        Tool {
            name: "debug.attach_watcher".to_string(),
            description: "Attach a watcher expression to a breakpoint. Returns the watcher ID"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "breakpoint_id": {
                        "type": "integer",
                        "description": "Breakpoint request ID (from debug.list_breakpoints)"
                    },
                    "label": {
                        "type": "string",
                        "description": "Descriptive label (e.g. 'Trace entity ID')"
                    },
                    "expression": {
                        "type": "string",
                        "description": "Java expression to evaluate when the breakpoint is hit"
                    }
                },
                "required": ["breakpoint_id", "label", "expression"]
            }),
        },
        Tool {
            name: "debug.detach_watcher".to_string(),
            description: "Detach a watcher by its ID".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "watcher_id": {
                        "type": "string",
                        "description": "Watcher ID returned by debug.attach_watcher"
                    }
                },
                "required": ["watcher_id"]
            }),
        },
        Tool {
            name: "debug.list_watchers_for_breakpoint".to_string(),
            description: "List watchers attached to one breakpoint".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "breakpoint_id": {
                        "type": "integer",
                        "description": "Breakpoint request ID"
                    }
                },
                "required": ["breakpoint_id"]
            }),
        },
        Tool {
            name: "debug.list_all_watchers".to_string(),
            description: "List all watchers across all breakpoints".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        Tool {
            name: "debug.clear_watchers_for_breakpoint".to_string(),
            description: "Remove every watcher attached to one breakpoint".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "breakpoint_id": {
                        "type": "integer",
                        "description": "Breakpoint request ID"
                    }
                },
                "required": ["breakpoint_id"]
            }),
        },
        Tool {
            name: "debug.clear_all_watchers".to_string(),
            description: "Remove every watcher".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        Tool {
            name: "debug.evaluate_watchers".to_string(),
            description: "Evaluate watchers on a suspended thread. Scope 'current_frame' \
                          (default) evaluates watchers of the breakpoint that caused the \
                          suspension; 'full_stack' scans every frame for matching breakpoints"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "thread_id": {
                        "type": "integer",
                        "description": "Thread unique ID"
                    },
                    "scope": {
                        "type": "string",
                        "enum": ["current_frame", "full_stack"],
                        "description": "Evaluation scope",
                        "default": "current_frame"
                    },
                    "breakpoint_id": {
                        "type": "integer",
                        "description": "Breakpoint ID that was hit (speeds up current_frame)"
                    }
                },
                "required": ["thread_id"]
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tool_names_are_unique_and_namespaced() {
        let tools = get_tools();
        let names: HashSet<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names.len(), tools.len());
        assert!(tools.iter().all(|t| t.name.starts_with("debug.")));
    }

    #[test]
    fn schemas_are_objects_with_required_lists_satisfied() {
        for tool in get_tools() {
            assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
            if let Some(required) = tool.input_schema.get("required") {
                let properties = tool.input_schema["properties"]
                    .as_object()
                    .unwrap_or_else(|| panic!("{} lacks properties", tool.name));
                for key in required.as_array().unwrap() {
                    assert!(
                        properties.contains_key(key.as_str().unwrap()),
                        "{} requires undeclared property {}",
                        tool.name,
                        key
                    );
                }
            }
        }
    }

    #[test]
    fn surface_covers_the_operation_union() {
        let names: Vec<String> = get_tools().into_iter().map(|t| t.name).collect();
        for expected in [
            "debug.attach",
            "debug.detach",
            "debug.evaluate",
            "debug.evaluate_watchers",
            "debug.get_current_thread",
            "debug.get_fields",
            "debug.set_breakpoint",
            "debug.clear_breakpoint",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
    }
}
