// Suspend the VM, walk every thread's top frames with their visible
// variables, then resume.
//
// cargo run --example stack_snapshot

use jdwp_client::stackframe::VariableSlot;
use jdwp_client::JdwpConnection;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("jdwp_client=info")
        .init();

    let mut conn = JdwpConnection::connect("localhost", 55005).await?;

    conn.suspend_all().await?;
    println!("VM suspended");

    let threads = conn.get_all_threads().await?;
    println!("{} threads\n", threads.len());

    for thread_id in threads.iter().take(8) {
        let name = conn.get_thread_name(*thread_id).await?;
        println!("Thread {} ({})", thread_id, name);

        let frames = match conn.get_frames(*thread_id, 0, 3).await {
            Ok(frames) => frames,
            Err(e) => {
                println!("  <frames unavailable: {}>\n", e);
                continue;
            }
        };

        for (i, frame) in frames.iter().enumerate() {
            let class_name = conn.get_type_name(frame.location.class_id).await?;
            println!("  Frame {}: {} @ index {}", i, class_name, frame.location.index);

            let Ok(table) = conn
                .get_variable_table(frame.location.class_id, frame.location.method_id)
                .await
            else {
                continue;
            };

            let visible: Vec<_> = table
                .iter()
                .filter(|v| v.visible_at(frame.location.index))
                .collect();
            if visible.is_empty() {
                continue;
            }

            let slots: Vec<VariableSlot> = visible
                .iter()
                .map(|v| VariableSlot {
                    slot: v.slot as i32,
                    sig_byte: v.signature.as_bytes()[0],
                })
                .collect();

            if let Ok(values) = conn.get_frame_values(*thread_id, frame.frame_id, &slots).await {
                for (var, value) in visible.iter().zip(values.iter()) {
                    println!("    {} = {:?}", var.name, value.data);
                }
            }
        }
        println!();
    }

    conn.resume_all().await?;
    println!("VM resumed");

    Ok(())
}
