use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader},
    process::{ChildStderr, ChildStdin, ChildStdout},
    sync::mpsc,
    task::JoinHandle,
};

/// Line-oriented console access to one child process.
///
/// Reader tasks drain the child's stdout and stderr into a single channel,
/// so error output lands in the same stream as regular output and readiness
/// can be checked without blocking the supervisor tick.
#[derive(Debug)]
pub struct OutputPump {
    rx: mpsc::UnboundedReceiver<String>,
    stdin: Option<ChildStdin>,
    readers: Vec<JoinHandle<()>>,
}

impl OutputPump {
    pub fn new(
        stdin: Option<ChildStdin>,
        stdout: Option<ChildStdout>,
        stderr: Option<ChildStderr>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut readers = Vec::new();
        if let Some(out) = stdout {
            readers.push(tokio::spawn(read_lines(out, tx.clone())));
        }
        if let Some(err) = stderr {
            readers.push(tokio::spawn(read_lines(err, tx.clone())));
        }
        Self { rx, stdin, readers }
    }

    /// Whether at least one console line is ready to be read right now.
    pub fn has_ready_output(&self) -> bool {
        !self.rx.is_empty()
    }

    /// One buffered console line, or `None` when nothing is ready.
    pub fn read_line(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    /// Sends one line to the child's console, terminator appended, flushed
    /// immediately. Returns whether the write went through.
    pub async fn send(&mut self, line: &str) -> bool {
        let Some(stdin) = self.stdin.as_mut() else {
            return false;
        };

        let write = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await
        };
        match write.await {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(error = %err, "console write failed");
                false
            }
        }
    }

    /// Closes both sides. Pending buffered lines are discarded and further
    /// sends report failure.
    pub fn close(&mut self) {
        self.stdin = None;
        self.rx.close();
        for reader in self.readers.drain(..) {
            reader.abort();
        }
    }
}

async fn read_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).is_err() {
            break;
        }
    }
}
