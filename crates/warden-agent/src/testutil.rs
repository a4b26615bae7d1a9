//! Shared helpers for tests that drive real child processes.

use std::time::Duration;

use crate::{
    instance::Instance,
    process::{LaunchSpec, ProcessHandle},
};

fn spawn(program: &str, args: &[&str], port: u16) -> Instance {
    let spec = LaunchSpec {
        program: program.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
        cwd: std::env::temp_dir(),
    };
    let (process, pump) = ProcessHandle::start(&spec).expect("spawn test child");
    Instance::new(port, process, pump)
}

/// `cat` echoes every console line back and never exits on its own.
pub async fn cat_instance(port: u16) -> Instance {
    spawn("cat", &[], port)
}

/// Shell loop that echoes lines until it reads the "stop" text, then exits.
pub async fn stoppable_instance(port: u16) -> Instance {
    spawn(
        "sh",
        &[
            "-c",
            r#"while read line; do [ "$line" = stop ] && exit 0; echo "$line"; done"#,
        ],
        port,
    )
}

/// Polls for process exit for a few seconds. Returns false on timeout.
pub async fn wait_until_dead(instance: &mut Instance) -> bool {
    for _ in 0..100 {
        if !instance.is_alive() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

/// Waits until the child has produced at least one readable console line.
pub async fn wait_for_ready_output(instance: &mut Instance) {
    for _ in 0..100 {
        if instance.pump.has_ready_output() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("no console output from test child");
}
