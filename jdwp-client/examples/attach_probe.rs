// Attach to a JDWP endpoint and print VM information.
//
// Run a JVM with:
//   -agentlib:jdwp=transport=dt_socket,server=y,suspend=n,address=*:55005
// then: cargo run --example attach_probe

use jdwp_client::JdwpConnection;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("jdwp_client=info")
        .init();

    let host = std::env::var("JDWP_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port: u16 = std::env::var("JDWP_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(55005);

    let mut conn = JdwpConnection::connect(&host, port).await?;
    println!("Connected to {}:{}", host, port);

    let version = conn.get_version().await?;
    println!("VM: {}", version.vm_name);
    println!("Version: {}", version.vm_version);
    println!(
        "JDWP: {}.{}",
        version.jdwp_major, version.jdwp_minor
    );

    let sizes = conn.get_id_sizes().await?;
    println!(
        "ID sizes: object={} method={} frame={}",
        sizes.object_id_size, sizes.method_id_size, sizes.frame_id_size
    );

    let threads = conn.get_all_threads().await?;
    println!("Threads: {}", threads.len());

    Ok(())
}
