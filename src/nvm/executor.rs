//! 外部命令执行（带超时）
//!
//! 命令一律以"程序 + 参数数组"的形式启动，不经过 shell 拼接，
//! 用户输入的版本号 / 包名不会被解释为 shell 语法。

use super::types::CommandResult;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// 默认超时：60 秒
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// 超时结束进程组后，等待管道读完的时间
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// 命令执行失败的原因
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("无法启动命令 `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("命令执行失败: `{command}` ({status})")]
    Exit {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("命令超时 ({}s): `{command}`", .timeout.as_secs())]
    Timeout {
        command: String,
        timeout: Duration,
        stderr: String,
    },
    #[error("等待命令 `{command}` 时出错: {source}")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },
}

impl ExecError {
    /// 子进程写出的标准错误（非零退出，或超时前已写出的部分）
    pub fn stderr(&self) -> Option<&str> {
        match self {
            ExecError::Exit { stderr, .. } | ExecError::Timeout { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// 成功执行后捕获的输出
#[derive(Debug, Clone)]
struct Captured {
    stdout: String,
    stderr: String,
}

impl From<Result<Captured, ExecError>> for CommandResult {
    fn from(result: Result<Captured, ExecError>) -> Self {
        match result {
            Ok(captured) => {
                // 部分工具在成功时也把提示信息写到 stderr
                if captured.stdout.is_empty() {
                    CommandResult::ok(captured.stderr)
                } else {
                    CommandResult::ok(captured.stdout)
                }
            }
            Err(e) => {
                let stderr = e.stderr().map(str::to_string);
                CommandResult::failed(e.to_string(), stderr)
            }
        }
    }
}

/// 外部命令执行器
///
/// 不持有任何可变状态，可以 `Clone` 后在多个任务中并发使用，
/// 每次调用各自启动一个子进程。
#[derive(Debug, Clone)]
pub struct Executor {
    timeout: Duration,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Executor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// 执行命令并把结果归一化为 `CommandResult`，永不返回错误
    pub async fn run<S: AsRef<str>>(&self, program: &str, args: &[S]) -> CommandResult {
        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
        let command_line = display_command(program, &args);
        log::debug!("执行命令: {}", command_line);

        let result = self.execute(program, &args, &command_line).await;
        match &result {
            Err(e @ ExecError::Timeout { .. }) => log::error!("{}", e),
            Err(e) => log::warn!("{}", e),
            Ok(_) => {}
        }
        CommandResult::from(result)
    }

    async fn execute(
        &self,
        program: &str,
        args: &[String],
        command_line: &str,
    ) -> Result<Captured, ExecError> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        isolate_process_group(&mut cmd);

        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            command: command_line.to_string(),
            source,
        })?;
        // wait 之后 child.id() 为 None，先记下进程组号
        let pid = child.id();

        let stdout_buf = Buffer::default();
        let stderr_buf = Buffer::default();
        let mut stdout_task = spawn_reader(child.stdout.take(), stdout_buf.clone());
        let mut stderr_task = spawn_reader(child.stderr.take(), stderr_buf.clone());

        // 超时同时覆盖进程退出和管道读完：孙进程可能继承管道一直不关
        let finished = tokio::time::timeout(self.timeout, async {
            let status = child.wait().await;
            if status.is_ok() {
                let _ = (&mut stdout_task).await;
                let _ = (&mut stderr_task).await;
            }
            status
        })
        .await;

        let status = match finished {
            Ok(Ok(status)) => status,
            Ok(Err(source)) => {
                stdout_task.abort();
                stderr_task.abort();
                return Err(ExecError::Wait {
                    command: command_line.to_string(),
                    source,
                });
            }
            Err(_) => {
                terminate(&mut child, pid).await;
                // 进程组已结束，给读取任务一点时间把剩余输出读完
                let _ = tokio::time::timeout(DRAIN_GRACE, async {
                    // 已读完的任务不能再次 await
                    for task in [&mut stdout_task, &mut stderr_task] {
                        if !task.is_finished() {
                            let _ = task.await;
                        }
                    }
                })
                .await;
                stdout_task.abort();
                stderr_task.abort();
                return Err(ExecError::Timeout {
                    command: command_line.to_string(),
                    timeout: self.timeout,
                    stderr: take_buffer(&stderr_buf),
                });
            }
        };

        let stdout = take_buffer(&stdout_buf);
        let stderr = take_buffer(&stderr_buf);

        if status.success() {
            Ok(Captured { stdout, stderr })
        } else {
            Err(ExecError::Exit {
                command: command_line.to_string(),
                status,
                stderr,
            })
        }
    }
}

type Buffer = Arc<Mutex<Vec<u8>>>;

/// 在后台持续读取管道，读到的内容随时写入共享缓冲
fn spawn_reader<R>(stream: Option<R>, buffer: Buffer) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(mut reader) = stream else {
            return;
        };
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => buffer
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(&chunk[..n]),
                Err(e) => {
                    log::warn!("读取子进程输出失败: {}", e);
                    break;
                }
            }
        }
    })
}

fn take_buffer(buffer: &Buffer) -> String {
    let bytes = std::mem::take(&mut *buffer.lock().unwrap_or_else(PoisonError::into_inner));
    String::from_utf8_lossy(&bytes).into_owned()
}

/// 创建独立进程组，超时时整组结束，不留下孙进程
#[cfg(unix)]
fn isolate_process_group(cmd: &mut Command) {
    unsafe {
        cmd.pre_exec(|| {
            libc::setpgid(0, 0);
            Ok(())
        });
    }
}

#[cfg(windows)]
fn isolate_process_group(cmd: &mut Command) {
    cmd.creation_flags(0x08000000); // CREATE_NO_WINDOW
}

#[cfg(not(any(unix, windows)))]
fn isolate_process_group(_cmd: &mut Command) {}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        unsafe {
            libc::kill(-(pid as i32), libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

/// 强制结束子进程（及其进程组）并回收
async fn terminate(child: &mut Child, pid: Option<u32>) {
    kill_process_group(pid);
    if matches!(child.try_wait(), Ok(Some(_))) {
        return;
    }
    if let Err(e) = child.kill().await {
        log::warn!("结束超时子进程失败: {}", e);
    }
}

fn display_command(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn success_returns_stdout() {
        let executor = Executor::default();
        let result = executor.run("sh", &["-c", "echo 18.17.0"]).await;
        assert!(result.success);
        assert_eq!(result.output.trim(), "18.17.0");
        assert_eq!(result.error, None);
    }

    #[tokio::test]
    async fn success_falls_back_to_stderr() {
        let executor = Executor::default();
        let result = executor.run("sh", &["-c", "echo 'Now using node' 1>&2"]).await;
        assert!(result.success);
        assert_eq!(result.output.trim(), "Now using node");
    }

    #[tokio::test]
    async fn non_zero_exit_captures_stderr() {
        let executor = Executor::default();
        let result = executor.run("sh", &["-c", "echo 'version not found' 1>&2; exit 3"]).await;
        assert!(!result.success);
        assert!(result.output.contains("命令执行失败"));
        assert_eq!(result.error.as_deref().map(str::trim), Some("version not found"));
    }

    #[tokio::test]
    async fn non_zero_exit_without_stderr_uses_message() {
        let executor = Executor::default();
        let result = executor.run("sh", &["-c", "exit 1"]).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some(result.output.as_str()));
    }

    #[tokio::test]
    async fn missing_program_is_a_failure() {
        let executor = Executor::default();
        let result = executor
            .run::<&str>("lian-nvm-definitely-not-a-command", &[])
            .await;
        assert!(!result.success);
        assert!(result.output.contains("无法启动命令"));
    }

    #[tokio::test]
    async fn arguments_are_not_shell_interpreted() {
        let executor = Executor::default();
        let result = executor.run("echo", &["18.17.0; echo injected"]).await;
        assert!(result.success);
        assert_eq!(result.output.trim(), "18.17.0; echo injected");
    }

    #[tokio::test]
    async fn timeout_kills_the_process() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let script = format!("echo $$ > {}; sleep 30", pid_file.display());

        let executor = Executor::new(Duration::from_millis(500));
        let result = executor.run("sh", &["-c", script.as_str()]).await;
        assert!(!result.success);
        assert!(result.output.contains("命令超时"));

        let pid: i32 = std::fs::read_to_string(&pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        let alive = unsafe { libc::kill(pid, 0) == 0 };
        assert!(!alive, "timed out process {} is still running", pid);
    }

    #[tokio::test]
    async fn timeout_covers_pipes_held_by_background_process() {
        let executor = Executor::new(Duration::from_secs(1));
        let started = std::time::Instant::now();
        let result = executor.run("sh", &["-c", "sleep 30 & echo done"]).await;
        let elapsed = started.elapsed();
        assert!(elapsed < Duration::from_secs(5), "run took {:?}", elapsed);
        assert!(!result.success);
        assert!(result.output.contains("命令超时"));
    }

    #[tokio::test]
    async fn timeout_keeps_partial_stderr() {
        let executor = Executor::new(Duration::from_secs(1));
        let result = executor.run("sh", &["-c", "echo partial >&2; sleep 30"]).await;
        assert!(!result.success);
        assert!(result.output.contains("命令超时"));
        assert_eq!(result.error.as_deref().map(str::trim), Some("partial"));
    }

    #[tokio::test]
    async fn timeout_without_stderr_uses_message() {
        let executor = Executor::new(Duration::from_millis(500));
        let result = executor.run("sh", &["-c", "sleep 30"]).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some(result.output.as_str()));
    }

    #[tokio::test]
    async fn concurrent_invocations_are_independent() {
        let executor = Executor::default();
        let (a, b) = tokio::join!(
            executor.run("sh", &["-c", "sleep 0.2; echo a"]),
            executor.run("sh", &["-c", "echo b"]),
        );
        assert_eq!(a.output.trim(), "a");
        assert_eq!(b.output.trim(), "b");
    }
}
