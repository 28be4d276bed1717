use std::process::{Child, Command, Stdio};

use proctree::{Collector, ProcessDataFlags};

fn spawn_long_lived_child() -> Child {
    #[cfg(windows)]
    let mut cmd = {
        let mut c = Command::new("powershell");
        c.args([
            "-NoProfile",
            "-NonInteractive",
            "-Command",
            "Start-Sleep -Seconds 30",
        ]);
        c
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut c = Command::new("sh");
        c.args(["-c", "sleep 30"]);
        c
    };

    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn child process")
}

#[test]
fn current_process_is_listed_with_every_flag() {
    let collector = Collector::new();
    let records = collector
        .list_processes(ProcessDataFlags::all())
        .expect("process table should open");

    let pid = std::process::id();
    let me = records
        .iter()
        .find(|r| r.pid == pid)
        .expect("current process should be listed");
    assert!(!me.name.is_empty());
    assert!(me.cpu_percent.is_none());
}

#[test]
fn spawned_child_is_a_descendant_of_this_process() {
    let mut child = spawn_long_lived_child();
    let child_pid = child.id();

    let collector = Collector::new();
    let subtree = collector
        .process_list(std::process::id(), ProcessDataFlags::NONE)
        .expect("process table should open");

    let _ = child.kill();
    let _ = child.wait();

    let subtree = subtree.expect("current process should be running");
    assert_eq!(subtree[0].pid, std::process::id());
    assert!(subtree.iter().any(|r| r.pid == child_pid));
}
