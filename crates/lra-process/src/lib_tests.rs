use super::*;
use tokio::io::AsyncWriteExt;

#[test]
fn test_failure_description_prefers_stderr() {
    let desc = failure_description("  Error: 429 Too Many Requests\n", None);
    assert_eq!(desc, "Error: 429 Too Many Requests");
}

#[test]
fn test_failure_description_without_stderr_signal() {
    assert_eq!(failure_description("", None), "Process terminated by signal");
}

#[test]
fn test_tail_chars_keeps_end() {
    let text = format!("{}END", "x".repeat(3000));
    let tail = tail_chars(&text, 10);
    assert!(tail.starts_with("..."));
    assert!(tail.ends_with("END"));
    assert_eq!(tail.chars().count(), 13);
}

#[test]
fn test_tail_chars_multibyte() {
    let text = "🔥".repeat(20);
    let tail = tail_chars(&text, 5);
    assert_eq!(tail, format!("...{}", "🔥".repeat(5)));
}

#[test]
fn test_check_tool_installed_missing() {
    let err = check_tool_installed("definitely-not-a-real-binary-xyz").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::BackendNotInstalled(name)) if name == "definitely-not-a-real-binary-xyz"
    ));
}

#[test]
fn test_check_tool_installed_sh() {
    assert!(check_tool_installed("sh").is_ok());
}

#[tokio::test]
async fn test_spawn_tool_pipes_stdio() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "read line; echo \"got $line\"; echo oops >&2; exit 3"]);
    let mut child = spawn_tool(cmd).unwrap();

    let mut stdin = child.stdin.take().unwrap();
    stdin.write_all(b"ping\n").await.unwrap();
    drop(stdin);

    let stderr = collect_stderr(child.stderr.take().unwrap());
    let mut stdout = BufReader::new(child.stdout.take().unwrap());
    let mut line = String::new();
    stdout.read_line(&mut line).await.unwrap();
    assert_eq!(line.trim_end(), "got ping");

    let status = child.wait().await.unwrap();
    let stderr = stderr.await.unwrap();
    assert_eq!(status.code(), Some(3));
    assert_eq!(failure_description(&stderr, Some(status)), "oops");
}

#[tokio::test]
async fn test_failure_description_exit_code() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "exit 7"]);
    let mut child = spawn_tool(cmd).unwrap();
    let status = child.wait().await.unwrap();
    assert_eq!(
        failure_description("", Some(status)),
        "Process exited with code 7"
    );
}

#[tokio::test]
async fn test_shutdown_child_kills_stuck_process() {
    let mut cmd = Command::new("sleep");
    cmd.arg("30");
    let child = spawn_tool(cmd).unwrap();
    shutdown_child(child, Duration::from_millis(50)).await.unwrap();
}

#[tokio::test]
async fn test_shutdown_child_after_stdin_close() {
    let mut child = spawn_tool(Command::new("cat")).unwrap();
    drop(child.stdin.take());
    shutdown_child(child, Duration::from_secs(5)).await.unwrap();
}

/// Gone or a zombie waiting for its new parent to reap it.
fn process_gone(pid: i32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.trim_start().chars().next())
            == Some('Z'),
        // SAFETY: signal 0 only checks that the pid exists.
        Err(_) => (unsafe { libc::kill(pid, 0) }) != 0,
    }
}

async fn wait_until_gone(pid: i32) -> bool {
    for _ in 0..100 {
        if process_gone(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

/// `sh` that starts a long `sleep` in the background and reports its pid.
async fn spawn_with_grandchild(script: &str) -> (ToolChild, i32) {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", script]);
    let mut child = spawn_tool(cmd).unwrap();
    let mut stdout = BufReader::new(child.stdout.take().unwrap());
    let mut line = String::new();
    stdout.read_line(&mut line).await.unwrap();
    (child, line.trim().parse().unwrap())
}

#[tokio::test]
async fn test_shutdown_child_kills_whole_group() {
    let (child, grandchild) = spawn_with_grandchild("sleep 300 & echo $!; wait").await;
    assert!(!process_gone(grandchild));

    shutdown_child(child, Duration::from_millis(100)).await.unwrap();
    assert!(
        wait_until_gone(grandchild).await,
        "grandchild {grandchild} survived shutdown_child"
    );
}

#[tokio::test]
async fn test_dropping_child_kills_whole_group() {
    let (child, grandchild) = spawn_with_grandchild("sleep 300 & echo $!; wait").await;
    drop(child);
    assert!(
        wait_until_gone(grandchild).await,
        "grandchild {grandchild} survived drop"
    );
}

#[tokio::test]
async fn test_clean_exit_still_sweeps_stragglers() {
    let (mut child, grandchild) = spawn_with_grandchild("sleep 300 & echo $!").await;
    drop(child.stdin.take());

    let status = shutdown_child(child, Duration::from_secs(5)).await.unwrap();
    assert!(status.success());
    assert!(
        wait_until_gone(grandchild).await,
        "background process {grandchild} outlived its leader"
    );
}
